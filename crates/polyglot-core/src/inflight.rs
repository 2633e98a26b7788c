//! At most one pending request per action.
//!
//! Triggering an action while a request for the same action is still pending
//! is rejected; different actions may overlap.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// User-triggered operations that issue a remote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Generate,
    Run,
    Analyze,
    Debug,
    Convert,
    Chat,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generate => "generate",
            Self::Run => "run",
            Self::Analyze => "analyze",
            Self::Debug => "debug",
            Self::Convert => "convert",
            Self::Chat => "chat",
        })
    }
}

/// Tracks which actions have a request pending.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    pending: Arc<Mutex<HashSet<Action>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `action` as pending.
    ///
    /// Returns `None` when a request for `action` is already pending. The
    /// returned token clears the mark when dropped.
    pub fn try_begin(&self, action: Action) -> Option<InFlightToken> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(action) {
            warn!(action = %action, "Request already in flight, rejecting");
            return None;
        }
        debug!(action = %action, "Request started");
        Some(InFlightToken { action, pending: Arc::clone(&self.pending) })
    }

    /// Whether a request for `action` is pending.
    pub fn is_pending(&self, action: Action) -> bool {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).contains(&action)
    }
}

/// Proof that a request for an action is pending.
#[derive(Debug)]
#[must_use = "the action is released as soon as the token is dropped"]
pub struct InFlightToken {
    action: Action,
    pending: Arc<Mutex<HashSet<Action>>>,
}

impl InFlightToken {
    pub fn action(&self) -> Action {
        self.action
    }
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.action);
        debug!(action = %self.action, "Request finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_trigger_rejected() {
        let inflight = InFlight::new();
        let token = inflight.try_begin(Action::Generate).unwrap();
        assert_eq!(token.action(), Action::Generate);
        assert!(inflight.try_begin(Action::Generate).is_none());
        assert!(inflight.is_pending(Action::Generate));
    }

    #[test]
    fn test_released_on_drop() {
        let inflight = InFlight::new();
        {
            let _token = inflight.try_begin(Action::Run).unwrap();
        }
        assert!(!inflight.is_pending(Action::Run));
        assert!(inflight.try_begin(Action::Run).is_some());
    }

    #[test]
    fn test_different_actions_overlap() {
        let inflight = InFlight::new();
        let _chat = inflight.try_begin(Action::Chat).unwrap();
        let _debug = inflight.try_begin(Action::Debug).unwrap();
        assert!(inflight.is_pending(Action::Chat));
        assert!(inflight.is_pending(Action::Debug));
    }

    #[test]
    fn test_clones_share_state() {
        let inflight = InFlight::new();
        let other = inflight.clone();
        let _token = inflight.try_begin(Action::Convert).unwrap();
        assert!(other.try_begin(Action::Convert).is_none());
    }
}
