use thiserror::Error;

/// Top-level error type for the schedai runtime.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A required secret could not be found at startup. Fatal.
    #[error("{key} not found in secrets. Please configure it.")]
    ConfigurationMissing { key: String },

    /// The remote model call for one turn failed. Recoverable per turn.
    #[error("An error occurred while communicating with the AI: {description}")]
    RemoteCallFailed { description: String },

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChatError {
    pub fn configuration_missing(key: impl Into<String>) -> Self {
        ChatError::ConfigurationMissing { key: key.into() }
    }

    /// Wrap a remote failure, keeping the whole context chain in the description.
    pub fn remote(err: &anyhow::Error) -> Self {
        ChatError::RemoteCallFailed {
            description: format!("{err:#}"),
        }
    }

    /// Only configuration errors halt the process; everything else is per-turn.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChatError::ConfigurationMissing { .. } | ChatError::ConfigInvalid(_)
        )
    }
}
