//! Session lifecycle state machine.
//!
//! Transitions return `Result` instead of panicking.

use crate::error::SessionError;

// ── SessionPhase ─────────────────────────────────────────────────

/// Lifecycle phase of a [`MirrorSession`](crate::MirrorSession).
///
/// ```text
///  Uninitialized ──► Initializing ──► Active ──► Stopping ──► Destroyed
/// ```
///
/// A construction that fails in `Initializing` never yields a session,
/// so no phase past it is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    /// Acquiring decoder, endpoint and advertiser.
    Initializing,
    /// Everything acquired; frames may flow.
    Active,
    /// Releasing resources.
    Stopping,
    /// Terminal.
    Destroyed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Active => write!(f, "Active"),
            Self::Stopping => write!(f, "Stopping"),
            Self::Destroyed => write!(f, "Destroyed"),
        }
    }
}

impl SessionPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, Self::Destroyed)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Uninitialized`.
    pub fn begin_initialize(&mut self) -> Result<(), SessionError> {
        match self {
            Self::Uninitialized => {
                *self = Self::Initializing;
                Ok(())
            }
            _ => Err(SessionError::InvalidTransition(
                "cannot initialize: not in Uninitialized state",
            )),
        }
    }

    /// Valid from: `Initializing`.
    pub fn activate(&mut self) -> Result<(), SessionError> {
        match self {
            Self::Initializing => {
                *self = Self::Active;
                Ok(())
            }
            _ => Err(SessionError::InvalidTransition(
                "cannot activate: not in Initializing state",
            )),
        }
    }

    /// Valid from: `Active`.
    pub fn begin_stop(&mut self) -> Result<(), SessionError> {
        match self {
            Self::Active => {
                *self = Self::Stopping;
                Ok(())
            }
            _ => Err(SessionError::InvalidTransition(
                "cannot stop: not in Active state",
            )),
        }
    }

    /// Valid from: `Stopping`.
    pub fn finish(&mut self) -> Result<(), SessionError> {
        match self {
            Self::Stopping => {
                *self = Self::Destroyed;
                Ok(())
            }
            _ => Err(SessionError::InvalidTransition(
                "cannot finish: not in Stopping state",
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
