use thiserror::Error;

/// Errors that can occur across the persistence layer.
///
/// The variants form a provider-independent taxonomy: callers match on kinds
/// (or use the predicates below) and never need to know the underlying
/// provider's error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity_type} not found: {key}")]
    NotFound { entity_type: String, key: String },

    #[error("{entity_type} already exists: {key}")]
    AlreadyExists { entity_type: String, key: String },

    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("condition check failed for {operation} operation: {condition}")]
    ConditionFailed { operation: String, condition: String },

    #[error("no deserializer registered for entity type {0:?}")]
    UnregisteredType(String),

    #[error("no key patterns registered for type {0}")]
    UnregisteredIndexMap(String),

    #[error("duplicate registration: {0}")]
    DuplicateRegistration(String),

    #[error("key expansion failed: {0}")]
    KeyExpansion(String),

    #[error("query builder validation failed: {0}")]
    BuilderValidation(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("transient provider error: {0}")]
    TransientProvider(String),

    #[error("provider error: {0}")]
    FatalProvider(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// True for errors the provider designates as retryable (throttling,
    /// request limits, internal server errors).
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::TransientProvider(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    pub fn is_condition_failed(&self) -> bool {
        matches!(self, StoreError::ConditionFailed { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled)
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
