//! Drowsiness Monitor - Main Entry Point

use monitor::{init_logging, run_replay, QuitSignal, Settings};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    init_logging(&settings.logging)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Press Ctrl-C to quit");

    let quit = QuitSignal::new();
    let on_ctrl_c = quit.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Quit requested");
                on_ctrl_c.trigger();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    // The frame loop blocks per frame (and for speech), keep it off the runtime
    let summary = tokio::task::spawn_blocking(move || run_replay(&settings, quit)).await??;

    if let monitor::LoopEnd::CaptureFailed(reason) = &summary.end {
        warn!("Capture ended with an error: {}", reason);
    }
    info!(
        "Processed {} frames ({} drowsy, {} asleep episodes)",
        summary.frames, summary.drowsy_episodes, summary.sleep_episodes
    );
    Ok(())
}
