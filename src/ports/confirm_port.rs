//! # Confirm Port
//!
//! The orchestrator hits one situation that may need a human decision
//! (a target table name combined with multiple sources). This port keeps
//! that interaction pluggable: a CLI wires in a real terminal prompt,
//! automated callers wire in [`DenyAll`] so a batch run can never block.

/// `ConfirmPort` answers yes/no questions.
pub trait ConfirmPort: Send + Sync {
    /// Presents `prompt` and returns whether the caller affirmed.
    ///
    /// Implementations must not block when no interactive channel is
    /// available; they answer `false` instead.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Policy for unattended callers: every question is answered no.
pub struct DenyAll;

impl ConfirmPort for DenyAll {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}
