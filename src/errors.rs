/// Domain-specific error types for munchies
///
/// Only a handful of these ever reach a caller: validation failures on inbound
/// requests and `Unavailable` when the engine could not be constructed.
/// Provider and store problems are recovered locally wherever the ranking
/// pipeline allows it.

#[derive(Debug, thiserror::Error)]
pub enum MunchiesError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Recommendation engine is not available")]
    Unavailable,
}

impl From<std::io::Error> for MunchiesError {
    fn from(e: std::io::Error) -> Self {
        MunchiesError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for MunchiesError {
    fn from(e: serde_json::Error) -> Self {
        MunchiesError::Storage(format!("JSON error: {}", e))
    }
}

impl MunchiesError {
    /// Helper to create validation errors with field names
    ///
    /// Example:
    /// ```
    /// use munchies::errors::MunchiesError;
    /// let err = MunchiesError::validation("userId", "User id cannot be empty");
    /// ```
    pub fn validation(field: &str, message: &str) -> Self {
        MunchiesError::Validation {
            message: message.to_string(),
            field: Some(field.to_string()),
        }
    }

    /// HTTP-equivalent status code reported alongside structured tool errors.
    pub fn status_code(&self) -> u16 {
        match self {
            MunchiesError::Validation { .. } => 400,
            MunchiesError::Unavailable => 503,
            MunchiesError::Config(_) | MunchiesError::Internal(_) | MunchiesError::Storage(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_helper_sets_field() {
        match MunchiesError::validation("userId", "empty") {
            MunchiesError::Validation { message, field } => {
                assert_eq!(message, "empty");
                assert_eq!(field.as_deref(), Some("userId"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_maps_to_503() {
        assert_eq!(MunchiesError::Unavailable.status_code(), 503);
        assert_eq!(MunchiesError::Unavailable.to_string(), "Recommendation engine is not available");
    }
}
