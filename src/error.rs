use crate::repositories::user_repository::RepositoryError;
use thiserror::Error;

// Type alias for Result with our ProvisioningError
pub type Result<T> = std::result::Result<T, ProvisioningError>;

/// Input rejected before any storage is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password too weak (minimum 8 characters)")]
    WeakPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Full name must not be empty")]
    MissingFullName,
}

#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl ProvisioningError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ProvisioningError::Validation(_))
    }

    /// Process exit status for this failure: 2 for bad input, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_validation() {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_exit_with_two() {
        let err = ProvisioningError::from(ValidationError::WeakPassword);
        assert!(err.is_validation());
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "Validation error: Password too weak (minimum 8 characters)"
        );
    }

    #[test]
    fn test_storage_errors_exit_with_one() {
        assert_eq!(ProvisioningError::EmailTaken.exit_code(), 1);
        assert_eq!(ProvisioningError::Hashing("bad salt".into()).exit_code(), 1);

        let err = ProvisioningError::from(RepositoryError::NotFound);
        assert!(!err.is_validation());
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Storage error: User not found");
    }
}
