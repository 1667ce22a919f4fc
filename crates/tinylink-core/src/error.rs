use thiserror::Error;

/// Errors related to the core value types.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("invalid code length {length}; expected {min}..={max}")]
    InvalidCodeLength { length: usize, min: usize, max: usize },
}

/// Errors returned by short code generators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Errors returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("code already exists: {0}")]
    Conflict(String),
    #[error("code not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("journal write failed: {0}")]
    Journal(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Errors surfaced by the link registry to its callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("code already exists: {0}")]
    DuplicateCode(String),
    #[error("gave up after {attempts} colliding code attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("code not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Storage(StorageError),
}

impl RegistryError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RetriesExhausted { .. }
                | Self::Storage(StorageError::Timeout(_) | StorageError::Unavailable(_))
        )
    }
}

impl From<CoreError> for RegistryError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidShortCode(message),
            length @ CoreError::InvalidCodeLength { .. } => {
                Self::InvalidShortCode(length.to_string())
            }
        }
    }
}

impl From<StorageError> for RegistryError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Conflict(code) => Self::DuplicateCode(code),
            StorageError::NotFound(code) => Self::NotFound(code),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_conflict_maps_to_duplicate_code() {
        let err = RegistryError::from(StorageError::Conflict("abc".to_string()));
        assert_eq!(err, RegistryError::DuplicateCode("abc".to_string()));
    }

    #[test]
    fn code_length_maps_to_invalid_short_code() {
        let err = RegistryError::from(CoreError::InvalidCodeLength {
            length: 2,
            min: 3,
            max: 32,
        });
        assert_eq!(
            err,
            RegistryError::InvalidShortCode("invalid code length 2; expected 3..=32".to_string())
        );
    }

    #[test]
    fn infrastructure_errors_are_carried_unchanged() {
        let original = StorageError::Unavailable("connection reset".to_string());
        let err = RegistryError::from(original.clone());
        assert_eq!(err, RegistryError::Storage(original));
    }

    #[test]
    fn transient_errors() {
        assert!(RegistryError::RetriesExhausted { attempts: 5 }.is_transient());
        assert!(RegistryError::Storage(StorageError::Timeout("get".into())).is_transient());
        assert!(!RegistryError::NotFound("abc".into()).is_transient());
        assert!(!RegistryError::InvalidUrl("ftp://x".into()).is_transient());
    }
}
