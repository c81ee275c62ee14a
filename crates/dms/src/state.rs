//! Driver state tracking

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::DmsConfig;

/// Alert level of the monitored driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    #[default]
    Normal,
    Drowsy,
    Asleep,
}

impl AlertLevel {
    pub fn is_alert(self) -> bool {
        self != AlertLevel::Normal
    }

    /// On-screen banner text
    pub fn banner(self) -> Option<&'static str> {
        match self {
            AlertLevel::Normal => None,
            AlertLevel::Drowsy => Some("DROWSINESS ALERT!"),
            AlertLevel::Asleep => Some("SLEEP ALERT! WAKE UP!"),
        }
    }

    /// Sentence spoken once when the alarm starts
    pub fn spoken_notice(self) -> Option<&'static str> {
        match self {
            AlertLevel::Normal => None,
            AlertLevel::Drowsy => Some("Drowsiness detected. Please stay awake!"),
            AlertLevel::Asleep => Some("Sleep detected. Wake up immediately!"),
        }
    }
}

/// Alarm side effect requested by a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmCommand {
    /// Entered an alert level; start the alarm if none is running
    Start(AlertLevel),
    /// Returned to normal; stop the running alarm
    Stop,
}

/// Per-session detection state (one monitored driver)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionState {
    counter: u32,
    alert_level: AlertLevel,
}

impl DetectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consecutive low-openness frames
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn alert_level(&self) -> AlertLevel {
        self.alert_level
    }
}

/// Debounced eye-closure state machine.
///
/// Holds only thresholds; the [`DetectionState`] it advances is owned by the
/// caller so independent sessions never share counters.
#[derive(Debug, Clone)]
pub struct DrowsinessStateMachine {
    config: DmsConfig,
}

impl DrowsinessStateMachine {
    pub fn new(config: DmsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Advance `state` by one face reading.
    ///
    /// `None` openness (no readable eye) leaves the state untouched. Returns
    /// the alarm command for a level change, if any.
    pub fn update(&self, state: &mut DetectionState, openness: Option<f32>) -> Option<AlarmCommand> {
        let Some(openness) = openness else {
            trace!("Openness unknown, carrying state forward (counter {})", state.counter);
            return None;
        };

        if openness >= self.config.eye_ar_thresh {
            state.counter = 0;
            if state.alert_level.is_alert() {
                info!("Eyes reopened (EAR {:.2}), leaving {:?}", openness, state.alert_level);
                state.alert_level = AlertLevel::Normal;
                metrics::counter!("dms_alert_transitions").increment(1);
                return Some(AlarmCommand::Stop);
            }
            return None;
        }

        state.counter = state.counter.saturating_add(1);

        let next = if state.counter >= self.config.sleep_consec_frames {
            AlertLevel::Asleep
        } else if state.counter >= self.config.eye_ar_consec_frames {
            AlertLevel::Drowsy
        } else {
            state.alert_level
        };

        if next == state.alert_level {
            debug!("Low openness {:.2}, counter {}", openness, state.counter);
            return None;
        }

        info!(
            "Alert level {:?} -> {:?} after {} closed frames",
            state.alert_level, next, state.counter
        );
        state.alert_level = next;
        metrics::counter!("dms_alert_transitions").increment(1);
        Some(AlarmCommand::Start(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LOW: f32 = 0.10;
    const HIGH: f32 = 0.30;

    fn machine() -> DrowsinessStateMachine {
        DrowsinessStateMachine::new(DmsConfig::default())
    }

    #[test]
    fn test_drowsy_exactly_at_frame_20() {
        let machine = machine();
        let mut state = DetectionState::new();

        for frame in 1..20 {
            assert_eq!(machine.update(&mut state, Some(LOW)), None, "frame {}", frame);
            assert_eq!(state.alert_level(), AlertLevel::Normal);
        }

        let command = machine.update(&mut state, Some(LOW));
        assert_eq!(command, Some(AlarmCommand::Start(AlertLevel::Drowsy)));
        assert_eq!(state.counter(), 20);
        assert_eq!(state.alert_level(), AlertLevel::Drowsy);
    }

    #[test]
    fn test_asleep_at_frame_90_and_stays() {
        let machine = machine();
        let mut state = DetectionState::new();
        let mut commands = Vec::new();

        for frame in 1..=120 {
            if let Some(command) = machine.update(&mut state, Some(LOW)) {
                commands.push((frame, command));
            }
            if frame < 90 {
                assert_ne!(state.alert_level(), AlertLevel::Asleep);
            } else {
                assert_eq!(state.alert_level(), AlertLevel::Asleep);
            }
        }

        assert_eq!(
            commands,
            vec![
                (20, AlarmCommand::Start(AlertLevel::Drowsy)),
                (90, AlarmCommand::Start(AlertLevel::Asleep)),
            ]
        );
    }

    #[test]
    fn test_reopen_resets_and_stops_once() {
        let machine = machine();
        let mut state = DetectionState::new();
        for _ in 0..25 {
            machine.update(&mut state, Some(LOW));
        }
        assert_eq!(state.alert_level(), AlertLevel::Drowsy);

        assert_eq!(machine.update(&mut state, Some(HIGH)), Some(AlarmCommand::Stop));
        assert_eq!(state.counter(), 0);
        assert_eq!(state.alert_level(), AlertLevel::Normal);

        // Already normal: no second stop
        assert_eq!(machine.update(&mut state, Some(HIGH)), None);
    }

    #[test]
    fn test_threshold_value_counts_as_open() {
        let machine = machine();
        let mut state = DetectionState::new();
        machine.update(&mut state, Some(LOW));
        machine.update(&mut state, Some(0.25));
        assert_eq!(state.counter(), 0);
    }

    #[test]
    fn test_unknown_openness_carries_state() {
        let machine = machine();
        let mut state = DetectionState::new();
        for _ in 0..19 {
            machine.update(&mut state, Some(LOW));
        }
        let before = state.clone();
        assert_eq!(machine.update(&mut state, None), None);
        assert_eq!(state, before);

        // The run resumes where it left off
        assert_eq!(
            machine.update(&mut state, Some(LOW)),
            Some(AlarmCommand::Start(AlertLevel::Drowsy))
        );
    }

    #[test]
    fn test_rescaled_thresholds() {
        let machine = DrowsinessStateMachine::new(DmsConfig::default().for_fps(15));
        let mut state = DetectionState::new();
        let first = (1..=100)
            .find(|_| machine.update(&mut state, Some(LOW)).is_some())
            .unwrap();
        assert_eq!(first, 10);
    }

    #[test]
    fn test_messages() {
        assert_eq!(AlertLevel::Normal.banner(), None);
        assert_eq!(AlertLevel::Drowsy.banner(), Some("DROWSINESS ALERT!"));
        assert_eq!(
            AlertLevel::Asleep.spoken_notice(),
            Some("Sleep detected. Wake up immediately!")
        );
    }

    proptest! {
        #[test]
        fn prop_counter_tracks_trailing_closed_run(
            readings in prop::collection::vec(prop::option::of(0.0f32..0.5), 0..300)
        ) {
            let machine = machine();
            let mut state = DetectionState::new();
            let mut expected = 0u32;
            for reading in readings {
                let before = state.counter();
                machine.update(&mut state, reading);
                match reading {
                    None => prop_assert_eq!(state.counter(), before),
                    Some(v) if v < 0.25 => expected += 1,
                    Some(_) => expected = 0,
                }
                prop_assert_eq!(state.counter(), expected);

                let level = if expected >= 90 {
                    AlertLevel::Asleep
                } else if expected >= 20 {
                    AlertLevel::Drowsy
                } else {
                    AlertLevel::Normal
                };
                prop_assert_eq!(state.alert_level(), level);
            }
        }
    }
}
