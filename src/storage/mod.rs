use crate::{
    config::{StorageBackend, StorageConfig},
    domain::{
        ExternalUserId, Issue, IssueDraft, IssueId, IssueUpdate, OrganizationId, Project,
        ProjectId, ReorderEntry, Sprint, SprintId, User, UserId,
    },
    error::Result,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod memory_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

pub use memory_storage::MemoryStorage;
#[cfg(feature = "sqlite-storage")]
pub use sqlite_storage::SqliteStorage;

/// Storage trait for persisting users, projects, sprints and issues
///
/// `load_*` methods fail with the matching `*NotFound` error; `find_*`
/// methods return `None` instead.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initializes the storage backend (schema setup)
    async fn initialize(&self) -> Result<()>;

    /// Releases the backend; later calls fail with a storage error
    async fn shutdown(&self) -> Result<()>;

    /// Finds a user by the auth service's identifier
    async fn find_user_by_external_id(&self, external_id: &ExternalUserId)
        -> Result<Option<User>>;

    /// Inserts a new user
    async fn save_user(&self, user: &User) -> Result<()>;

    /// Loads the users with the given ids, skipping unknown ids
    async fn list_users(&self, ids: &[UserId]) -> Result<Vec<User>>;

    /// Loads the users with the given external ids, skipping unknown ids
    async fn list_users_by_external_ids(&self, ids: &[ExternalUserId]) -> Result<Vec<User>>;

    /// Inserts a new project; the key must be unique within its organization
    async fn save_project(&self, project: &Project) -> Result<()>;

    async fn load_project(&self, id: &ProjectId) -> Result<Project>;

    /// Lists an organization's projects, newest first
    async fn list_projects(&self, org_id: &OrganizationId) -> Result<Vec<Project>>;

    /// Inserts or replaces a sprint
    async fn save_sprint(&self, sprint: &Sprint) -> Result<()>;

    async fn load_sprint(&self, id: &SprintId) -> Result<Sprint>;

    /// Lists a project's sprints by start date
    async fn list_sprints(&self, project_id: &ProjectId) -> Result<Vec<Sprint>>;

    /// Inserts a new issue at the bottom of its `(project, status)` column
    ///
    /// The order lookup and the insert happen in one critical section.
    async fn create_issue(&self, draft: IssueDraft) -> Result<Issue>;

    async fn load_issue(&self, id: &IssueId) -> Result<Issue>;

    /// Applies a status/priority update and returns the refreshed issue
    async fn update_issue(&self, id: &IssueId, update: &IssueUpdate) -> Result<Issue>;

    async fn delete_issue(&self, id: &IssueId) -> Result<()>;

    /// Lists a sprint's issues in board order (status, then order key)
    async fn list_issues_by_sprint(&self, sprint_id: &SprintId) -> Result<Vec<Issue>>;

    /// Lists issues reported by or assigned to the user within the
    /// organization's projects, most recently updated first
    async fn list_issues_for_user(
        &self,
        user_id: &UserId,
        org_id: &OrganizationId,
    ) -> Result<Vec<Issue>>;

    /// Applies a reorder batch atomically and returns the number of rows written
    ///
    /// Any unknown issue id aborts the whole batch with `IssueNotFound`.
    async fn apply_reorder(&self, batch: &[ReorderEntry]) -> Result<usize>;
}

/// Opens the backend selected by the configuration and prepares its schema
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        #[cfg(feature = "sqlite-storage")]
        StorageBackend::Sqlite => Arc::new(SqliteStorage::open(config)?),
        #[cfg(not(feature = "sqlite-storage"))]
        StorageBackend::Sqlite => {
            return Err(crate::error::ScrumlineError::ConfigError(
                "sqlite backend requires the `sqlite-storage` feature".to_string(),
            ))
        }
    };
    storage.initialize().await?;
    tracing::info!(backend = ?config.backend, "storage opened");
    Ok(storage)
}
