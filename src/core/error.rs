use thiserror::Error;

use super::types::Asset;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    /// A portfolio operation was called with an unusable combination of arguments.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Asset {0} is not tracked by this portfolio")]
    UnknownAsset(Asset),

    #[error("No asset provider registered for {0}")]
    MissingProvider(Asset),

    #[error("Invalid allocation: {message}")]
    InvalidAllocation { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to serialise results: {0}")]
    Report(#[from] serde_json::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SimError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_allocation(message: impl Into<String>) -> Self {
        Self::InvalidAllocation {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
