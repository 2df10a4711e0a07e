use thiserror::Error;

/// Result type for tracegraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tracegraph operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Creates an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_kind() {
        assert_eq!(
            Error::config("fetch_size must be greater than 0").to_string(),
            "Configuration error: fetch_size must be greater than 0"
        );
        assert_eq!(
            Error::invalid_input("page size").to_string(),
            "Invalid input: page size"
        );
    }
}
