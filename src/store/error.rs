use redis::RedisError;

/// Errors surfaced by the store access layer.
///
/// `Nil` and `TooManyProcessing` are not operational failures: the first is
/// the store's "no such key" sentinel and the second is a local admission
/// rejection that never reached the network. Callers implementing cache-miss
/// fallthrough should branch on [`StoreError::is_nil`] instead of matching on
/// the underlying protocol error.
#[derive(Debug)]
pub enum StoreError {
    /// The store answered with its "key absent" sentinel.
    Nil,
    /// Rejected by the admission gate before dispatch.
    TooManyProcessing,
    /// Invalid configuration. Fatal at startup.
    Config(String),
    /// Value (de)serialization failed in the cache layer.
    Codec(serde_json::Error),
    /// Store protocol error, propagated unchanged.
    Redis(RedisError),
}

impl StoreError {
    /// True only for the store's "key absent" sentinel.
    pub fn is_nil(&self) -> bool {
        matches!(self, StoreError::Nil)
    }

    /// True when the admission gate vetoed the operation.
    pub fn is_too_many_processing(&self) -> bool {
        matches!(self, StoreError::TooManyProcessing)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Nil => write!(f, "redis: nil"),
            StoreError::TooManyProcessing => write!(f, "redis: too many processing"),
            StoreError::Config(msg) => write!(f, "redis config: {}", msg),
            StoreError::Codec(err) => write!(f, "redis cache codec: {}", err),
            StoreError::Redis(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Redis(err) => Some(err),
            StoreError::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        StoreError::Redis(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::ErrorKind;

    #[test]
    fn test_nil_is_distinguishable() {
        assert!(StoreError::Nil.is_nil());
        assert!(!StoreError::TooManyProcessing.is_nil());

        let timeout = StoreError::Redis(RedisError::from((ErrorKind::IoError, "timed out")));
        assert!(!timeout.is_nil());

        let refused = StoreError::Redis(RedisError::from((
            ErrorKind::IoError,
            "connection refused",
        )));
        assert!(!refused.is_nil());
    }

    #[test]
    fn test_admission_rejection_is_typed() {
        let err = StoreError::TooManyProcessing;
        assert!(err.is_too_many_processing());
        assert!(!err.is_nil());
        assert!(!StoreError::Nil.is_too_many_processing());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(StoreError::Nil.to_string(), "redis: nil");
        assert_eq!(
            StoreError::TooManyProcessing.to_string(),
            "redis: too many processing"
        );
        assert_eq!(
            StoreError::Config("addrs is empty".to_string()).to_string(),
            "redis config: addrs is empty"
        );
    }
}
