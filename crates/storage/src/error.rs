use tracegraph_core::Error as CoreError;
use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// A create hit an id that already exists
    #[error("{entity} '{id}' already exists")]
    IdentityConflict { entity: &'static str, id: String },

    /// The owning entity a write depends on does not exist
    #[error("Cannot write {entity} '{id}': {parent} '{parent_id}' does not exist")]
    MissingParent {
        entity: &'static str,
        id: String,
        parent: &'static str,
        parent_id: String,
    },

    /// A stored property could not be read back into its typed form
    #[error("Failed to decode {entity} '{id}' field '{field}': {reason}")]
    Decode {
        entity: &'static str,
        id: String,
        field: String,
        reason: String,
    },

    /// Session acquisition or execution failed for network/availability reasons
    #[error("Connection failed: {0}")]
    Connectivity(String),

    #[error("Operation timeout after {0}ms")]
    Timeout(u64),

    /// A write statement was issued through a read-scoped session
    #[error("Capability violation: {0}")]
    CapabilityViolation(String),

    /// Unique constraint rejected a write whose identity is not known here
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Batch size exceeded: requested {requested}, max {max}")]
    BatchSizeExceeded { requested: usize, max: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StorageError {
    pub fn decode(
        entity: &'static str,
        id: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Decode {
            entity,
            id: id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_parent(
        entity: &'static str,
        id: impl Into<String>,
        parent: &'static str,
        parent_id: impl Into<String>,
    ) -> Self {
        Self::MissingParent {
            entity,
            id: id.into(),
            parent,
            parent_id: parent_id.into(),
        }
    }

    /// Attaches the written identity to a raw constraint violation
    pub fn for_identity(self, entity: &'static str, id: impl Into<String>) -> Self {
        match self {
            Self::ConstraintViolation(_) => Self::IdentityConflict {
                entity,
                id: id.into(),
            },
            other => other,
        }
    }

    /// Whether the failure is worth retrying for an idempotent read
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

impl From<neo4rs::Error> for StorageError {
    fn from(err: neo4rs::Error) -> Self {
        let message = err.to_string();
        if message.contains("ConstraintValidationFailed") {
            return Self::ConstraintViolation(message);
        }

        let lowered = message.to_lowercase();
        let transient = [
            "transienterror",
            "connection",
            "io error",
            "broken pipe",
            "serviceunavailable",
            "pool",
        ];
        if transient.iter().any(|marker| lowered.contains(marker)) {
            Self::Connectivity(message)
        } else {
            Self::BackendError(message)
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidConfig(msg) => CoreError::config(msg),
            StorageError::InvalidInput(msg) => CoreError::invalid_input(msg),
            other => CoreError::storage(other.to_string()),
        }
    }
}
