use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrumlineError>;

#[derive(Debug, Error)]
pub enum ScrumlineError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Issue not found: {0}")]
    IssueNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Sprint not found: {0}")]
    SprintNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("Invalid sprint status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Project key already in use: {0}")]
    DuplicateProjectKey(String),

    /// A storage failure surfaced while performing a service operation.
    #[error("Error {action}: {message}")]
    Persistence { action: String, message: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[cfg(feature = "sqlite-storage")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ScrumlineError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::IssueNotFound(_)
                | Self::ProjectNotFound(_)
                | Self::SprintNotFound(_)
                | Self::UserNotFound(_)
                | Self::OrganizationNotFound(_)
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Wraps unexpected failures with the action that was being performed.
    ///
    /// Authorization and lookup failures pass through untouched so callers
    /// can still match on them.
    pub fn during(self, action: &str) -> Self {
        if self.is_not_found()
            || self.is_unauthorized()
            || matches!(self, Self::Validation { .. } | Self::Persistence { .. })
        {
            return self;
        }
        Self::Persistence {
            action: action.to_string(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_during_wraps_storage_failures() {
        let err = ScrumlineError::StorageError("disk full".to_string()).during("updating issue");
        assert_eq!(
            err.to_string(),
            "Error updating issue: Storage error: disk full"
        );
    }

    #[test]
    fn test_during_keeps_lookup_and_auth_failures() {
        let err = ScrumlineError::IssueNotFound("x".to_string()).during("updating issue");
        assert!(err.is_not_found());

        let err = ScrumlineError::unauthorized("nope").during("updating issue");
        assert!(err.is_unauthorized());
    }
}
