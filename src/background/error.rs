use crate::capture::error::CaptureError;
use crate::navigation::coordinator::TransitionError;
use crate::store::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum BackgroundError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("platform key must not be empty")]
    EmptyPlatform,

    /// Messages that only ever flow from the background to page contexts.
    #[error("'{0}' is not handled by the background service")]
    Unsupported(&'static str),

    #[error("background service has stopped")]
    Stopped,
}
