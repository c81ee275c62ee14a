//! Alarm output devices

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::{AlarmBackend, AlarmConfig, AlertingError};

/// One beep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneProfile {
    pub frequency_hz: u32,
    pub duration: Duration,
}

/// Plays a single tone, blocking for its duration
pub trait ToneEmitter: Send + Sync {
    fn beep(&self, tone: &ToneProfile) -> Result<(), AlertingError>;
}

/// Speaks a sentence, blocking until it has been said
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), AlertingError>;
}

/// Build the tone and speech devices for a backend
pub fn for_backend(config: &AlarmConfig) -> (Arc<dyn ToneEmitter>, Arc<dyn SpeechSynthesizer>) {
    match config.backend {
        AlarmBackend::System => (
            Arc::new(SystemTone),
            Arc::new(SystemSpeech::new(config.speech_rate_wpm)),
        ),
        AlarmBackend::Silent => (Arc::new(SilentTone), Arc::new(SilentSpeech)),
    }
}

/// Tone through the platform's sound tooling
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTone;

impl SystemTone {
    #[cfg(target_os = "windows")]
    fn command(tone: &ToneProfile) -> Command {
        let mut cmd = Command::new("powershell");
        cmd.args([
            "-NoProfile".to_string(),
            "-Command".to_string(),
            format!("[console]::beep({},{})", tone.frequency_hz, tone.duration.as_millis()),
        ]);
        cmd
    }

    #[cfg(not(target_os = "windows"))]
    fn command(tone: &ToneProfile) -> Command {
        // sox
        let mut cmd = Command::new("play");
        cmd.args([
            "-nq".to_string(),
            "-t".to_string(),
            "alsa".to_string(),
            "synth".to_string(),
            format!("{}", tone.duration.as_secs_f64()),
            "sine".to_string(),
            tone.frequency_hz.to_string(),
        ]);
        cmd
    }
}

impl ToneEmitter for SystemTone {
    fn beep(&self, tone: &ToneProfile) -> Result<(), AlertingError> {
        run_quiet(Self::command(tone)).map_err(AlertingError::ToneDevice)
    }
}

/// Speech through the platform's text-to-speech tooling
#[derive(Debug, Clone, Copy)]
pub struct SystemSpeech {
    rate_wpm: u32,
}

impl SystemSpeech {
    pub fn new(rate_wpm: u32) -> Self {
        Self { rate_wpm }
    }

    #[cfg(target_os = "windows")]
    fn command(&self, text: &str) -> Command {
        // SAPI rate runs -10..10 with 0 at roughly 180 wpm
        let rate = ((self.rate_wpm as i64 - 180) / 18).clamp(-10, 10);
        let script = format!(
            "Add-Type -AssemblyName System.Speech; \
             $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
             $s.Rate = {}; $s.Speak('{}')",
            rate,
            text.replace('\'', "''")
        );
        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile".to_string(), "-Command".to_string(), script]);
        cmd
    }

    #[cfg(target_os = "macos")]
    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new("say");
        cmd.args(["-r".to_string(), self.rate_wpm.to_string(), text.to_string()]);
        cmd
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new("espeak");
        cmd.args(["-s".to_string(), self.rate_wpm.to_string(), text.to_string()]);
        cmd
    }
}

impl SpeechSynthesizer for SystemSpeech {
    fn speak(&self, text: &str) -> Result<(), AlertingError> {
        run_quiet(self.command(text)).map_err(AlertingError::Speech)
    }
}

/// Tone device that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentTone;

impl ToneEmitter for SilentTone {
    fn beep(&self, tone: &ToneProfile) -> Result<(), AlertingError> {
        debug!("beep {} Hz for {:?}", tone.frequency_hz, tone.duration);
        Ok(())
    }
}

/// Speech device that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSpeech;

impl SpeechSynthesizer for SilentSpeech {
    fn speak(&self, text: &str) -> Result<(), AlertingError> {
        debug!("speak: {}", text);
        Ok(())
    }
}

fn run_quiet(mut cmd: Command) -> Result<(), String> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| format!("{}: {}", program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("{} exited with {}", program, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_devices_succeed() {
        let config = AlarmConfig {
            backend: AlarmBackend::Silent,
            ..Default::default()
        };
        let (tone, speech) = for_backend(&config);
        assert!(tone.beep(&config.tone_profile()).is_ok());
        assert!(speech.speak("hello").is_ok());
    }

    #[test]
    fn test_missing_program_is_reported() {
        let err = run_quiet(Command::new("definitely-not-an-installed-alarm-tool")).unwrap_err();
        assert!(err.starts_with("definitely-not-an-installed-alarm-tool"));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_tone_command_line() {
        let tone = ToneProfile {
            frequency_hz: 2000,
            duration: Duration::from_millis(500),
        };
        let cmd = SystemTone::command(&tone);
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(cmd.get_program(), "play");
        assert_eq!(args, vec!["-nq", "-t", "alsa", "synth", "0.5", "sine", "2000"]);
    }
}
