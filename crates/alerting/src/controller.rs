//! Alarm Controller Implementation

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::device::{self, SpeechSynthesizer, ToneEmitter, ToneProfile};
use crate::{AlarmConfig, AlertingError};

/// One running alarm episode
struct AlarmSession {
    id: u64,
    stop: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// Owns at most one alarm session at a time.
///
/// `start_alarm` while a session runs is a no-op, not a restart. The session
/// slot is checked and filled under one lock, so concurrent starts spawn a
/// single tone worker. `stop_alarm` joins the worker before returning, so no
/// tone plays after it returns.
pub struct AlarmController {
    config: AlarmConfig,
    tone: Arc<dyn ToneEmitter>,
    speech: Arc<dyn SpeechSynthesizer>,
    session: Mutex<Option<AlarmSession>>,
    sessions_started: AtomicU64,
}

impl AlarmController {
    /// Create a controller with explicit output devices
    pub fn new(
        config: AlarmConfig,
        tone: Arc<dyn ToneEmitter>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        info!("Creating alarm controller with config: {:?}", config);
        Self {
            config,
            tone,
            speech,
            session: Mutex::new(None),
            sessions_started: AtomicU64::new(0),
        }
    }

    /// Create a controller using the devices named by `config.backend`
    pub fn from_config(config: AlarmConfig) -> Self {
        let (tone, speech) = device::for_backend(&config);
        Self::new(config, tone, speech)
    }

    /// Start the alarm and speak `message` once.
    ///
    /// Returns `Ok(false)` if a session was already active. Speech blocks the
    /// caller until it finishes. Device failures are logged and the session
    /// stays active.
    pub fn start_alarm(&self, message: &str) -> Result<bool, AlertingError> {
        let id = {
            let mut slot = self.lock_session();
            if let Some(session) = slot.as_ref() {
                debug!("Alarm session {} already active, ignoring start", session.id);
                return Ok(false);
            }

            let id = self.sessions_started.fetch_add(1, Ordering::AcqRel) + 1;
            let stop = Arc::new(AtomicBool::new(false));
            let worker = self.spawn_tone_worker(id, stop.clone()).map_err(|e| {
                self.sessions_started.fetch_sub(1, Ordering::AcqRel);
                e
            })?;

            *slot = Some(AlarmSession { id, stop, worker });
            id
        };

        info!("Alarm session {} started: {}", id, message);
        metrics::counter!("alarm_sessions_started").increment(1);

        if let Err(e) = self.speech.speak(message) {
            warn!("Alarm session {}: spoken notice failed: {}", id, e);
            metrics::counter!("alarm_device_failures").increment(1);
        }

        Ok(true)
    }

    /// Stop the running alarm and wait for the tone worker to exit.
    ///
    /// Returns `Ok(false)` without blocking when nothing is active. The slot
    /// stays locked until the worker has exited, so a concurrent start waits
    /// instead of spawning a second worker. The worker never takes the lock.
    pub fn stop_alarm(&self) -> Result<bool, AlertingError> {
        let mut slot = self.lock_session();
        let Some(session) = slot.take() else {
            return Ok(false);
        };

        session.stop.store(true, Ordering::Release);
        let joined = session.worker.join();
        drop(slot);

        if joined.is_err() {
            error!("Alarm session {} tone worker panicked", session.id);
            return Err(AlertingError::WorkerPanicked(session.id));
        }

        info!("Alarm session {} stopped", session.id);
        metrics::counter!("alarm_sessions_stopped").increment(1);
        Ok(true)
    }

    pub fn is_active(&self) -> bool {
        self.lock_session().is_some()
    }

    /// Id of the running session (ids start at 1)
    pub fn active_session(&self) -> Option<u64> {
        self.lock_session().as_ref().map(|s| s.id)
    }

    /// Number of sessions (and tone workers) ever started
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<AlarmSession>> {
        // The slot stays consistent even if a holder panicked
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_tone_worker(&self, id: u64, stop: Arc<AtomicBool>) -> Result<JoinHandle<()>, AlertingError> {
        let tone = self.tone.clone();
        let profile = self.config.tone_profile();
        let poll = self.config.poll_interval();

        thread::Builder::new()
            .name(format!("alarm-tone-{}", id))
            .spawn(move || run_tone_loop(id, tone.as_ref(), profile, poll, &stop))
            .map_err(AlertingError::Spawn)
    }
}

impl Drop for AlarmController {
    fn drop(&mut self) {
        if let Err(e) = self.stop_alarm() {
            error!("Failed to stop alarm on shutdown: {}", e);
        }
    }
}

fn run_tone_loop(
    id: u64,
    tone: &dyn ToneEmitter,
    profile: ToneProfile,
    poll: Duration,
    stop: &AtomicBool,
) {
    debug!("Alarm session {} tone worker running", id);
    let mut failures = 0u64;

    while !stop.load(Ordering::Acquire) {
        if let Err(e) = tone.beep(&profile) {
            failures += 1;
            metrics::counter!("alarm_device_failures").increment(1);
            if failures == 1 {
                warn!("Alarm session {}: tone failed: {}", id, e);
            } else {
                debug!("Alarm session {}: tone failed ({} times): {}", id, failures, e);
            }
        }
        thread::sleep(poll);
    }

    debug!("Alarm session {} tone worker exiting", id);
}
