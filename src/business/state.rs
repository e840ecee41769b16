//! Dictation session state machine with thread-safe transitions.
//!
//! Valid transitions:
//! - Idle -> Waiting (automation page still loading)
//! - Idle -> Recording (page ready, dictation started)
//! - Waiting -> Recording (page became ready)
//! - Waiting -> Idle (released early, cancelled, timed out, login needed)
//! - Recording -> Processing (stop or cancel requested)
//! - Processing -> Idle (lifecycle finished, whatever the outcome)

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictationState {
    /// No lifecycle in flight.
    Idle,
    /// Waiting for the automation page to load before starting.
    Waiting,
    /// The service is listening.
    Recording,
    /// Stopping, retrieving and pasting.
    Processing,
}

impl fmt::Display for DictationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictationState::Idle => write!(f, "IDLE"),
            DictationState::Waiting => write!(f, "WAITING"),
            DictationState::Recording => write!(f, "RECORDING"),
            DictationState::Processing => write!(f, "PROCESSING"),
        }
    }
}

impl DictationState {
    pub fn can_transition_to(&self, target: &DictationState) -> bool {
        matches!(
            (self, target),
            (DictationState::Idle, DictationState::Waiting)
                | (DictationState::Idle, DictationState::Recording)
                | (DictationState::Waiting, DictationState::Recording)
                | (DictationState::Waiting, DictationState::Idle)
                | (DictationState::Recording, DictationState::Processing)
                | (DictationState::Processing, DictationState::Idle)
        )
    }

    /// True while a lifecycle owns the session.
    pub fn is_active(&self) -> bool {
        !matches!(self, DictationState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid state transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: DictationState,
    pub to: DictationState,
}

/// Shared state cell. Transitions are validated and applied atomically.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<DictationState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DictationState::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DictationState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> DictationState {
        *self.lock()
    }

    pub fn transition(&self, target: DictationState) -> Result<(), TransitionError> {
        let mut state = self.lock();
        if state.can_transition_to(&target) {
            tracing::info!("Dictation state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(TransitionError {
                from: *state,
                to: target,
            })
        }
    }

    /// Move to `target` only if the current state is `expected`.
    pub fn transition_from(
        &self,
        expected: DictationState,
        target: DictationState,
    ) -> Result<(), TransitionError> {
        let mut state = self.lock();
        if *state == expected && state.can_transition_to(&target) {
            tracing::info!("Dictation state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(TransitionError {
                from: *state,
                to: target,
            })
        }
    }

    /// Force the state machine back to Idle (error recovery).
    pub fn reset(&self) {
        let mut state = self.lock();
        if *state != DictationState::Idle {
            tracing::warn!("Dictation state machine reset to IDLE from {}", *state);
            *state = DictationState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(DictationState::Idle.to_string(), "IDLE");
        assert_eq!(DictationState::Waiting.to_string(), "WAITING");
        assert_eq!(DictationState::Recording.to_string(), "RECORDING");
        assert_eq!(DictationState::Processing.to_string(), "PROCESSING");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(DictationState::Idle.can_transition_to(&DictationState::Waiting));
        assert!(DictationState::Idle.can_transition_to(&DictationState::Recording));
        assert!(DictationState::Waiting.can_transition_to(&DictationState::Recording));
        assert!(DictationState::Waiting.can_transition_to(&DictationState::Idle));
        assert!(DictationState::Recording.can_transition_to(&DictationState::Processing));
        assert!(DictationState::Processing.can_transition_to(&DictationState::Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        // A second recording cannot start from any non-idle state.
        assert!(!DictationState::Recording.can_transition_to(&DictationState::Recording));
        assert!(!DictationState::Processing.can_transition_to(&DictationState::Recording));
        assert!(!DictationState::Idle.can_transition_to(&DictationState::Processing));
        assert!(!DictationState::Recording.can_transition_to(&DictationState::Idle));
        assert!(!DictationState::Processing.can_transition_to(&DictationState::Waiting));
        assert!(!DictationState::Idle.can_transition_to(&DictationState::Idle));
    }

    #[test]
    fn test_state_machine_full_path() {
        let sm = StateMachine::new();
        assert_eq!(sm.current(), DictationState::Idle);
        sm.transition(DictationState::Waiting).unwrap();
        sm.transition(DictationState::Recording).unwrap();
        sm.transition(DictationState::Processing).unwrap();
        sm.transition(DictationState::Idle).unwrap();
        assert_eq!(sm.current(), DictationState::Idle);
    }

    #[test]
    fn test_transition_from_requires_expected_state() {
        let sm = StateMachine::new();
        let err = sm
            .transition_from(DictationState::Recording, DictationState::Processing)
            .unwrap_err();
        assert_eq!(err.from, DictationState::Idle);
        assert_eq!(sm.current(), DictationState::Idle);

        sm.transition(DictationState::Recording).unwrap();
        sm.transition_from(DictationState::Recording, DictationState::Processing)
            .unwrap();
        assert!(sm
            .transition_from(DictationState::Recording, DictationState::Processing)
            .is_err());
    }

    #[test]
    fn test_concurrent_starts_admit_one() {
        let sm = StateMachine::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sm = sm.clone();
                std::thread::spawn(move || sm.transition(DictationState::Recording).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(sm.current(), DictationState::Recording);
    }

    #[test]
    fn test_reset() {
        let sm = StateMachine::new();
        sm.transition(DictationState::Recording).unwrap();
        sm.reset();
        assert_eq!(sm.current(), DictationState::Idle);
    }
}
