//! Request-level operations.
//!
//! Every operation re-reads the session from the [`AuthProvider`] and
//! re-derives its authorization; the services hold no state of their own.

use crate::{
    auth::{guard, AuthContext, AuthProvider},
    config::StorageConfig,
    domain::{ExternalUserId, Issue, IssueDetails, Project, ProjectId, User, UserId},
    error::{Result, ScrumlineError},
    storage::{self, Storage},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub mod issues;
pub mod organizations;
pub mod projects;
pub mod reorder;
pub mod sprints;
pub mod users;

pub use issues::IssueStore;
pub use organizations::OrganizationDirectory;
pub use projects::ProjectDirectory;
pub use reorder::ReorderCoordinator;
pub use sprints::SprintPlanner;
pub use users::UserDirectory;

/// Shared handles every service works against
#[derive(Clone)]
pub(crate) struct Context {
    storage: Arc<dyn Storage>,
    auth: Arc<dyn AuthProvider>,
}

impl Context {
    /// Signed-in user plus active organization, or `Unauthorized`
    async fn org_context(&self) -> Result<AuthContext> {
        let session = self.auth.active_session().await?;
        guard::require_org_context(&session).map_err(log_denial)
    }

    /// Signed-in user, or `Unauthorized`
    async fn signed_in(&self) -> Result<ExternalUserId> {
        let session = self.auth.active_session().await?;
        guard::require_user(&session).cloned().map_err(log_denial)
    }

    /// Local record of an external identity, or `UserNotFound`
    async fn local_user(&self, external_id: &ExternalUserId) -> Result<User> {
        self.storage
            .find_user_by_external_id(external_id)
            .await?
            .ok_or_else(|| ScrumlineError::UserNotFound(external_id.to_string()))
    }

    /// Loads a project and checks it belongs to the active organization
    async fn project_in_org(&self, project_id: &ProjectId, ctx: &AuthContext) -> Result<Project> {
        let project = self.storage.load_project(project_id).await?;
        guard::ensure_same_org(&project, &ctx.org_id).map_err(log_denial)?;
        Ok(project)
    }

    /// Resolves reporters, assignees and optionally projects for a batch of issues
    async fn resolve(&self, issues: Vec<Issue>, with_project: bool) -> Result<Vec<IssueDetails>> {
        let mut user_ids: Vec<UserId> = Vec::new();
        for issue in &issues {
            for id in std::iter::once(issue.reporter_id).chain(issue.assignee_id) {
                if !user_ids.contains(&id) {
                    user_ids.push(id);
                }
            }
        }
        let users: HashMap<UserId, User> = self
            .storage
            .list_users(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut projects: HashMap<ProjectId, Project> = HashMap::new();
        if with_project {
            for issue in &issues {
                if !projects.contains_key(&issue.project_id) {
                    let project = self.storage.load_project(&issue.project_id).await?;
                    projects.insert(project.id, project);
                }
            }
        }

        Ok(issues
            .into_iter()
            .map(|issue| IssueDetails {
                reporter: users.get(&issue.reporter_id).cloned(),
                assignee: issue.assignee_id.and_then(|id| users.get(&id).cloned()),
                project: projects.get(&issue.project_id).cloned(),
                issue,
            })
            .collect())
    }

    async fn resolve_one(&self, issue: Issue) -> Result<IssueDetails> {
        self.resolve(vec![issue], false)
            .await?
            .pop()
            .ok_or_else(|| {
                ScrumlineError::StorageError("issue vanished while resolving".to_string())
            })
    }
}

fn log_denial(err: ScrumlineError) -> ScrumlineError {
    if err.is_unauthorized() {
        warn!(error = %err, "request denied");
    }
    err
}

/// Entry point: one storage handle plus the auth provider of the current caller
///
/// Open it once with [`Tracker::connect`], hand out cheap clones (one per
/// request via [`Tracker::with_auth`]) and close it with
/// [`Tracker::shutdown`].
#[derive(Clone)]
pub struct Tracker {
    ctx: Context,
}

impl Tracker {
    pub fn new(storage: Arc<dyn Storage>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            ctx: Context { storage, auth },
        }
    }

    /// Opens the configured storage backend and runs its schema setup
    pub async fn connect(config: &StorageConfig, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let storage = storage::open(config).await?;
        Ok(Self::new(storage, auth))
    }

    /// Same storage, different caller
    pub fn with_auth(&self, auth: Arc<dyn AuthProvider>) -> Self {
        Self::new(self.ctx.storage.clone(), auth)
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.ctx.storage
    }

    pub fn issues(&self) -> IssueStore {
        IssueStore::new(self.ctx.clone())
    }

    pub fn reorder(&self) -> ReorderCoordinator {
        ReorderCoordinator::new(self.ctx.clone())
    }

    pub fn projects(&self) -> ProjectDirectory {
        ProjectDirectory::new(self.ctx.clone())
    }

    pub fn sprints(&self) -> SprintPlanner {
        SprintPlanner::new(self.ctx.clone())
    }

    pub fn organizations(&self) -> OrganizationDirectory {
        OrganizationDirectory::new(self.ctx.clone())
    }

    pub fn users(&self) -> UserDirectory {
        UserDirectory::new(self.ctx.clone())
    }

    /// Closes the storage backend; clones sharing it fail afterwards
    pub async fn shutdown(&self) -> Result<()> {
        self.ctx.storage.shutdown().await?;
        tracing::info!("storage closed");
        Ok(())
    }
}
