//! Crate-level error type.
//!
//! Invalid player commands never surface here: commands return an
//! accepted/rejected boolean and leave the state untouched. `FlowError`
//! covers internal invariant violations only, the situations no caller can
//! reach through the public command surface.

use thiserror::Error;

use crate::state::machine::TransitionError;
use crate::state::minigame::MinigameError;

/// Internal invariant violations raised by the game flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A phase transition was driven out of order.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// Minigame resolution was misused.
    #[error(transparent)]
    Minigame(#[from] MinigameError),
}
