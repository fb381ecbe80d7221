use crate::store::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// A mandatory field was empty. Nothing has been persisted.
    #[error("validation error: {field} must not be empty")]
    Validation { field: &'static str },

    #[error("capture mode is off for this page")]
    CaptureDisabled,

    #[error("cannot derive a URL pattern from '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to access capture records: {0}")]
    Store(#[from] StoreError),
}
