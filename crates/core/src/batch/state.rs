//! Per-item lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where an item is in the pipeline.
///
/// ```text
/// Idle -> SessionReady -> Resolved -> Transferred -> Uploaded -> CleanedUp
///
/// SessionReady | Resolved            -> Skipped
/// Resolved | Transferred | Uploaded  -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Idle,
    SessionReady,
    Resolved,
    Transferred,
    Uploaded,
    CleanedUp,
    /// Recoverable failure while resolving.
    Skipped,
    /// Unrecoverable failure while transferring or uploading.
    Failed,
}

#[derive(Debug, Error)]
#[error("illegal item transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: ItemState,
    pub to: ItemState,
}

impl ItemState {
    pub fn can_advance_to(&self, next: ItemState) -> bool {
        use ItemState::*;
        matches!(
            (self, next),
            (Idle, SessionReady)
                | (SessionReady, Resolved)
                | (Resolved, Transferred)
                | (Transferred, Uploaded)
                | (Uploaded, CleanedUp)
                | (SessionReady | Resolved, Skipped)
                | (Resolved | Transferred | Uploaded, Failed)
        )
    }

    /// Moves to `next`, rejecting transitions outside the lifecycle.
    pub fn advance(self, next: ItemState) -> Result<ItemState, IllegalTransition> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CleanedUp | Self::Skipped | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SessionReady => "session_ready",
            Self::Resolved => "resolved",
            Self::Transferred => "transferred",
            Self::Uploaded => "uploaded",
            Self::CleanedUp => "cleaned_up",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage an item failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolve,
    Transfer,
    Upload,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Transfer => "transfer",
            Self::Upload => "upload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = ItemState::Idle;
        for next in [
            ItemState::SessionReady,
            ItemState::Resolved,
            ItemState::Transferred,
            ItemState::Uploaded,
            ItemState::CleanedUp,
        ] {
            state = state.advance(next).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_skip_only_before_transfer() {
        assert!(ItemState::SessionReady.can_advance_to(ItemState::Skipped));
        assert!(ItemState::Resolved.can_advance_to(ItemState::Skipped));
        assert!(!ItemState::Transferred.can_advance_to(ItemState::Skipped));
        assert!(!ItemState::Idle.can_advance_to(ItemState::Skipped));
    }

    #[test]
    fn test_fail_from_transfer_onwards() {
        assert!(ItemState::Resolved.can_advance_to(ItemState::Failed));
        assert!(ItemState::Transferred.can_advance_to(ItemState::Failed));
        assert!(ItemState::Uploaded.can_advance_to(ItemState::Failed));
        assert!(!ItemState::SessionReady.can_advance_to(ItemState::Failed));
        assert!(!ItemState::CleanedUp.can_advance_to(ItemState::Failed));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let err = ItemState::Idle.advance(ItemState::Uploaded).unwrap_err();
        assert_eq!(err.from, ItemState::Idle);
        assert!(ItemState::CleanedUp.advance(ItemState::Idle).is_err());
        assert!(ItemState::Skipped.advance(ItemState::Resolved).is_err());
        assert!(ItemState::Resolved.advance(ItemState::Resolved).is_err());
    }
}
