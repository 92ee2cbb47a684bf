use thiserror::Error;

/// Main error type for tiercache operations
#[derive(Debug, Error)]
pub enum TierCacheError {
    #[error("Source of record unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Second tier storage error: {0}")]
    Storage(String),

    #[error("A simulation run is already in progress")]
    RunInProgress,
}

impl TierCacheError {
    /// Whether this error terminates the current simulation run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Deserialization(_) | Self::Storage(_))
    }
}

impl From<bincode::Error> for TierCacheError {
    fn from(err: bincode::Error) -> Self {
        Self::Deserialization(err.to_string())
    }
}

/// Result type alias for tiercache operations
pub type Result<T> = std::result::Result<T, TierCacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(TierCacheError::SourceUnavailable("db down".into()).is_fatal());
        assert!(TierCacheError::InvalidConfig("zero".into()).is_fatal());
        assert!(!TierCacheError::Deserialization("bad tag".into()).is_fatal());
        assert!(!TierCacheError::Storage("timeout".into()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = TierCacheError::SourceUnavailable("connection refused".into());
        assert_eq!(
            err.to_string(),
            "Source of record unavailable: connection refused"
        );
        assert_eq!(
            TierCacheError::RunInProgress.to_string(),
            "A simulation run is already in progress"
        );
    }
}
