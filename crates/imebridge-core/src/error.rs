use thiserror::Error;

use crate::WindowHandle;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no input context registered for {0}")]
    HandleNotFound(WindowHandle),

    #[error("no focused input context")]
    NoFocusedContext,

    #[error("{0} already has a live input context")]
    HandleInUse(WindowHandle),

    #[error("input context for {0} is already borrowed")]
    ContextBusy(WindowHandle),

    #[error("input context is mutably borrowed; its handle cannot be read")]
    ContextBorrowed,

    #[error("host channel is closed")]
    ChannelClosed,

    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RouterError {
    /// Errors that are part of normal teardown races rather than bugs.
    pub fn is_expected_drop(&self) -> bool {
        matches!(self, Self::HandleNotFound(_) | Self::NoFocusedContext)
    }
}
