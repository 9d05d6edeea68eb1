use crate::{
    domain::{
        issue::next_order, sort_for_board, ExternalUserId, Issue, IssueDraft, IssueId,
        IssueUpdate, OrganizationId, Project, ProjectId, ReorderEntry, Sprint, SprintId, User,
        UserId,
    },
    error::{Result, ScrumlineError},
    storage::Storage,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    projects: HashMap<ProjectId, Project>,
    sprints: HashMap<SprintId, Sprint>,
    issues: HashMap<IssueId, Issue>,
}

impl Tables {
    fn issue(&self, id: &IssueId) -> Result<&Issue> {
        self.issues
            .get(id)
            .ok_or_else(|| ScrumlineError::IssueNotFound(id.to_string()))
    }
}

/// Ephemeral storage kept in process memory
///
/// All tables sit behind one mutex, so every method is its own critical
/// section. `None` after shutdown.
#[derive(Debug)]
pub struct MemoryStorage {
    tables: Mutex<Option<Tables>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Some(Tables::default())),
        }
    }

    async fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut guard = self.tables.lock().await;
        let tables = guard
            .as_mut()
            .ok_or_else(|| ScrumlineError::StorageError("storage has been shut down".to_string()))?;
        f(tables)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        self.with_tables(|_| Ok(())).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.tables.lock().await.take();
        Ok(())
    }

    async fn find_user_by_external_id(
        &self,
        external_id: &ExternalUserId,
    ) -> Result<Option<User>> {
        self.with_tables(|t| {
            Ok(t.users
                .values()
                .find(|u| &u.external_id == external_id)
                .cloned())
        })
        .await
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        self.with_tables(|t| {
            if t.users.values().any(|u| u.external_id == user.external_id) {
                return Err(ScrumlineError::StorageError(format!(
                    "user {} already exists",
                    user.external_id
                )));
            }
            t.users.insert(user.id, user.clone());
            Ok(())
        })
        .await
    }

    async fn list_users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        self.with_tables(|t| Ok(ids.iter().filter_map(|id| t.users.get(id).cloned()).collect()))
            .await
    }

    async fn list_users_by_external_ids(&self, ids: &[ExternalUserId]) -> Result<Vec<User>> {
        self.with_tables(|t| {
            let mut users: Vec<User> = t
                .users
                .values()
                .filter(|u| ids.contains(&u.external_id))
                .cloned()
                .collect();
            users.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(users)
        })
        .await
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        self.with_tables(|t| {
            let taken = t.projects.values().any(|p| {
                p.id != project.id
                    && p.organization_id == project.organization_id
                    && p.key == project.key
            });
            if taken {
                return Err(ScrumlineError::DuplicateProjectKey(project.key.clone()));
            }
            t.projects.insert(project.id, project.clone());
            Ok(())
        })
        .await
    }

    async fn load_project(&self, id: &ProjectId) -> Result<Project> {
        self.with_tables(|t| {
            t.projects
                .get(id)
                .cloned()
                .ok_or_else(|| ScrumlineError::ProjectNotFound(id.to_string()))
        })
        .await
    }

    async fn list_projects(&self, org_id: &OrganizationId) -> Result<Vec<Project>> {
        self.with_tables(|t| {
            let mut projects: Vec<Project> = t
                .projects
                .values()
                .filter(|p| &p.organization_id == org_id)
                .cloned()
                .collect();
            projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(projects)
        })
        .await
    }

    async fn save_sprint(&self, sprint: &Sprint) -> Result<()> {
        self.with_tables(|t| {
            t.sprints.insert(sprint.id, sprint.clone());
            Ok(())
        })
        .await
    }

    async fn load_sprint(&self, id: &SprintId) -> Result<Sprint> {
        self.with_tables(|t| {
            t.sprints
                .get(id)
                .cloned()
                .ok_or_else(|| ScrumlineError::SprintNotFound(id.to_string()))
        })
        .await
    }

    async fn list_sprints(&self, project_id: &ProjectId) -> Result<Vec<Sprint>> {
        self.with_tables(|t| {
            let mut sprints: Vec<Sprint> = t
                .sprints
                .values()
                .filter(|s| &s.project_id == project_id)
                .cloned()
                .collect();
            sprints.sort_by(|a, b| {
                a.start_date
                    .cmp(&b.start_date)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });
            Ok(sprints)
        })
        .await
    }

    async fn create_issue(&self, draft: IssueDraft) -> Result<Issue> {
        self.with_tables(|t| {
            let last = t
                .issues
                .values()
                .filter(|i| i.project_id == draft.project_id && i.status == draft.fields.status)
                .map(|i| i.order)
                .max();
            let issue = Issue::from_draft(draft, next_order(last));
            t.issues.insert(issue.id, issue.clone());
            Ok(issue)
        })
        .await
    }

    async fn load_issue(&self, id: &IssueId) -> Result<Issue> {
        self.with_tables(|t| t.issue(id).cloned()).await
    }

    async fn update_issue(&self, id: &IssueId, update: &IssueUpdate) -> Result<Issue> {
        self.with_tables(|t| {
            let issue = t
                .issues
                .get_mut(id)
                .ok_or_else(|| ScrumlineError::IssueNotFound(id.to_string()))?;
            issue.apply_update(update);
            Ok(issue.clone())
        })
        .await
    }

    async fn delete_issue(&self, id: &IssueId) -> Result<()> {
        self.with_tables(|t| {
            t.issues
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| ScrumlineError::IssueNotFound(id.to_string()))
        })
        .await
    }

    async fn list_issues_by_sprint(&self, sprint_id: &SprintId) -> Result<Vec<Issue>> {
        self.with_tables(|t| {
            let mut issues: Vec<Issue> = t
                .issues
                .values()
                .filter(|i| i.sprint_id.as_ref() == Some(sprint_id))
                .cloned()
                .collect();
            sort_for_board(&mut issues);
            Ok(issues)
        })
        .await
    }

    async fn list_issues_for_user(
        &self,
        user_id: &UserId,
        org_id: &OrganizationId,
    ) -> Result<Vec<Issue>> {
        self.with_tables(|t| {
            let mut issues: Vec<Issue> = t
                .issues
                .values()
                .filter(|i| i.involves(user_id))
                .filter(|i| {
                    t.projects
                        .get(&i.project_id)
                        .is_some_and(|p| &p.organization_id == org_id)
                })
                .cloned()
                .collect();
            issues.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(issues)
        })
        .await
    }

    async fn apply_reorder(&self, batch: &[ReorderEntry]) -> Result<usize> {
        self.with_tables(|t| {
            // Validate the whole batch before touching any row.
            for entry in batch {
                t.issue(&entry.issue_id)?;
            }
            for entry in batch {
                if let Some(issue) = t.issues.get_mut(&entry.issue_id) {
                    issue.apply_reorder(entry);
                }
            }
            Ok(batch.len())
        })
        .await
    }
}
