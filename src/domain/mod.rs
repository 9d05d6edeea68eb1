pub mod board;
pub mod filter;
pub mod issue;
pub mod organization;
pub mod project;
pub mod sorting;
pub mod sprint;
pub mod user;

/// Declares a uuid-backed identifier newtype.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $error:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generates a fresh random identifier
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(value: uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::ScrumlineError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| crate::error::ScrumlineError::$error(s.to_string()))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use uuid_id;

pub use board::{Board, BoardConfig, Column};
pub use filter::BoardFilter;
pub use issue::{
    Issue, IssueDetails, IssueDraft, IssueId, IssuePriority, IssueStatus, IssueUpdate, NewIssue,
    ReorderEntry,
};
pub use organization::{ExternalUserId, Membership, OrgRole, Organization, OrganizationId};
pub use project::{NewProject, Project, ProjectId};
pub use sorting::{sort_for_board, sort_issues, SortField, SortOrder};
pub use sprint::{NewSprint, Sprint, SprintId, SprintStatus};
pub use user::{ExternalProfile, User, UserId};
