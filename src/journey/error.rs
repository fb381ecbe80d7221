use std::path::PathBuf;

use crate::background::error::BackgroundError;

#[derive(Debug, thiserror::Error)]
pub enum JourneyError {
    #[error("failed to read journey script {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid journey script: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A page-level step ran before any `visit`.
    #[error("'{0}' needs a visited page")]
    NoPage(&'static str),

    #[error(transparent)]
    Background(#[from] BackgroundError),
}
