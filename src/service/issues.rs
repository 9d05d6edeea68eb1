use crate::{
    auth::guard,
    domain::{
        ExternalUserId, IssueDetails, IssueDraft, IssueId, IssueUpdate, NewIssue, ProjectId,
        SprintId,
    },
    error::{Result, ScrumlineError},
    service::{log_denial, Context},
};
use tracing::{debug, instrument};

/// The authoritative collection of issues
pub struct IssueStore {
    ctx: Context,
}

impl IssueStore {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Lists a sprint's issues in board order
    #[instrument(skip(self))]
    pub async fn list_for_sprint(&self, sprint_id: &SprintId) -> Result<Vec<IssueDetails>> {
        self.ctx.org_context().await?;
        let issues = self.ctx.storage.list_issues_by_sprint(sprint_id).await?;
        debug!(count = issues.len(), "listed sprint issues");
        self.ctx.resolve(issues, false).await
    }

    /// Creates an issue at the bottom of its status column, reported by the caller
    #[instrument(
        skip(self, new_issue),
        fields(title = %new_issue.title, status = %new_issue.status)
    )]
    pub async fn create(
        &self,
        project_id: &ProjectId,
        new_issue: NewIssue,
    ) -> Result<IssueDetails> {
        let ctx = self.ctx.org_context().await?;
        let reporter = self.ctx.local_user(&ctx.user_id).await?;

        let mut fields = new_issue;
        fields.title = fields.title.trim().to_string();
        if fields.title.is_empty() {
            return Err(ScrumlineError::validation("title", "cannot be empty"));
        }

        let project = self.ctx.project_in_org(project_id, &ctx).await?;
        if let Some(sprint_id) = &fields.sprint_id {
            let sprint = self.ctx.storage.load_sprint(sprint_id).await?;
            if sprint.project_id != project.id {
                return Err(ScrumlineError::SprintNotFound(sprint_id.to_string()));
            }
        }

        let issue = self
            .ctx
            .storage
            .create_issue(IssueDraft {
                project_id: project.id,
                reporter_id: reporter.id,
                fields,
            })
            .await
            .map_err(|e| e.during("creating issue"))?;
        debug!(issue_id = %issue.id, order = issue.order, "issue created");
        self.ctx.resolve_one(issue).await
    }

    /// Reads an issue back by id
    #[instrument(skip(self))]
    pub async fn get(&self, issue_id: &IssueId) -> Result<IssueDetails> {
        let ctx = self.ctx.org_context().await?;
        let issue = self.ctx.storage.load_issue(issue_id).await?;
        self.ctx.project_in_org(&issue.project_id, &ctx).await?;
        self.ctx.resolve_one(issue).await
    }

    /// Changes status and/or priority of an issue in the active organization
    #[instrument(skip(self))]
    pub async fn update(&self, issue_id: &IssueId, update: IssueUpdate) -> Result<IssueDetails> {
        let ctx = self.ctx.org_context().await?;
        let action = "updating issue";

        let issue = self
            .ctx
            .storage
            .load_issue(issue_id)
            .await
            .map_err(|e| e.during(action))?;
        self.ctx
            .project_in_org(&issue.project_id, &ctx)
            .await
            .map_err(|e| e.during(action))?;

        let updated = self
            .ctx
            .storage
            .update_issue(issue_id, &update)
            .await
            .map_err(|e| e.during(action))?;
        debug!(
            issue_id = %updated.id,
            status = %updated.status,
            priority = %updated.priority,
            "issue updated"
        );
        self.ctx.resolve_one(updated).await
    }

    /// Permanently deletes an issue; only its reporter or a project admin may
    #[instrument(skip(self))]
    pub async fn delete(&self, issue_id: &IssueId) -> Result<()> {
        let ctx = self.ctx.org_context().await?;
        let user = self.ctx.local_user(&ctx.user_id).await?;
        let issue = self.ctx.storage.load_issue(issue_id).await?;
        let project = self.ctx.storage.load_project(&issue.project_id).await?;

        if !guard::can_delete_issue(&issue, &project, &user.id) {
            return Err(log_denial(ScrumlineError::unauthorized(
                "you don't have permission to delete this issue",
            )));
        }

        self.ctx.storage.delete_issue(issue_id).await?;
        debug!(issue_id = %issue_id, "issue deleted");
        Ok(())
    }

    /// Issues reported by or assigned to a user within the active organization,
    /// most recently updated first
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: &ExternalUserId) -> Result<Vec<IssueDetails>> {
        let ctx = self.ctx.org_context().await?;
        let user = self.ctx.local_user(user_id).await?;
        let issues = self
            .ctx
            .storage
            .list_issues_for_user(&user.id, &ctx.org_id)
            .await?;
        debug!(count = issues.len(), "listed user issues");
        self.ctx.resolve(issues, true).await
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        IssuePriority, IssueStatus, IssueUpdate, NewIssue, NewSprint, ReorderEntry, Sprint,
    };
    use crate::error::ScrumlineError;
    use crate::service::fixtures::{world, World, ACME, GLOBEX};
    use chrono::{Duration, Utc};

    fn todo(title: &str) -> NewIssue {
        NewIssue::new(title, IssueStatus::Todo, IssuePriority::Medium)
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let w = world().await;
        let store = w.tracker.issues();

        let created = store
            .create(
                &w.project.id,
                NewIssue::new("Fix login", IssueStatus::InProgress, IssuePriority::High)
                    .with_description("Session cookie expires too early")
                    .in_sprint(w.sprint.id)
                    .assigned_to(w.dev.id),
            )
            .await
            .unwrap();

        let fetched = store.get(&created.issue.id).await.unwrap();
        assert_eq!(fetched.issue.title, "Fix login");
        assert_eq!(
            fetched.issue.description.as_deref(),
            Some("Session cookie expires too early")
        );
        assert_eq!(fetched.issue.status, IssueStatus::InProgress);
        assert_eq!(fetched.issue.priority, IssuePriority::High);
        assert_eq!(fetched.issue.reporter_id, w.admin.id);
        assert_eq!(fetched.reporter.as_ref().map(|u| u.id), Some(w.admin.id));
        assert_eq!(fetched.assignee.as_ref().map(|u| u.id), Some(w.dev.id));
        assert!(fetched.project.is_none());
    }

    #[tokio::test]
    async fn test_create_orders_increase_per_column() {
        let w = world().await;
        let store = w.tracker.issues();

        let mut orders = Vec::new();
        for title in ["one", "two", "three"] {
            orders.push(store.create(&w.project.id, todo(title)).await.unwrap().issue.order);
        }
        assert_eq!(orders, vec![0, 1, 2]);

        let done = store
            .create(
                &w.project.id,
                NewIssue::new("shipped", IssueStatus::Done, IssuePriority::Low),
            )
            .await
            .unwrap();
        assert_eq!(done.issue.order, 0);
    }

    #[tokio::test]
    async fn test_create_continues_after_gaps() {
        let w = world().await;
        let store = w.tracker.issues();
        let first = store.create(&w.project.id, todo("a")).await.unwrap();

        w.tracker
            .reorder()
            .apply(&[ReorderEntry::new(first.issue.id, IssueStatus::Todo, 10)])
            .await
            .unwrap();

        let next = store.create(&w.project.id, todo("b")).await.unwrap();
        assert_eq!(next.issue.order, 11);
    }

    #[tokio::test]
    async fn test_create_requires_org_context() {
        let w = world().await;
        w.sign_in_without_org("user_admin").await;

        let err = w
            .tracker
            .issues()
            .create(&w.project.id, todo("nope"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        w.sign_out().await;
        let err = w
            .tracker
            .issues()
            .list_for_sprint(&w.sprint.id)
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_create_requires_local_user() {
        let w = world().await;
        w.sign_in("user_new", ACME).await;

        let err = w
            .tracker
            .issues()
            .create(&w.project.id, todo("who am I"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrumlineError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_project_and_sprint() {
        let w = world().await;
        let store = w.tracker.issues();

        let err = store
            .create(&w.foreign_project.id, todo("sneaky"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        let other_sprint = Sprint::create(
            w.foreign_project.id,
            NewSprint {
                name: "Theirs".to_string(),
                start_date: Utc::now(),
                end_date: Utc::now() + Duration::days(7),
            },
        )
        .unwrap();
        w.tracker.storage().save_sprint(&other_sprint).await.unwrap();

        let err = store
            .create(&w.project.id, todo("misfiled").in_sprint(other_sprint.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrumlineError::SprintNotFound(_)));
    }

    async fn assert_unknown_assignee_is_stored(w: World) {
        let ghost = crate::domain::UserId::new();
        let created = w
            .tracker
            .issues()
            .create(&w.project.id, todo("for nobody").assigned_to(ghost))
            .await
            .unwrap();
        assert_eq!(created.issue.assignee_id, Some(ghost));
        assert!(created.assignee.is_none());

        let fetched = w.tracker.issues().get(&created.issue.id).await.unwrap();
        assert_eq!(fetched.issue.assignee_id, Some(ghost));
        assert!(fetched.assignee.is_none());
    }

    #[tokio::test]
    async fn test_create_trusts_assignee_in_memory() {
        assert_unknown_assignee_is_stored(world().await).await;
    }

    #[cfg(feature = "sqlite-storage")]
    #[tokio::test]
    async fn test_create_trusts_assignee_in_sqlite() {
        assert_unknown_assignee_is_stored(crate::service::fixtures::sqlite_world().await).await;
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let w = world().await;
        let err = w
            .tracker
            .issues()
            .create(&w.project.id, todo("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrumlineError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_list_for_sprint_in_board_order() {
        let w = world().await;
        let store = w.tracker.issues();

        let a = store
            .create(&w.project.id, todo("A").in_sprint(w.sprint.id))
            .await
            .unwrap();
        let b = store
            .create(&w.project.id, todo("B").in_sprint(w.sprint.id))
            .await
            .unwrap();
        let c = store
            .create(
                &w.project.id,
                NewIssue::new("C", IssueStatus::Done, IssuePriority::Medium).in_sprint(w.sprint.id),
            )
            .await
            .unwrap();
        store.create(&w.project.id, todo("backlog")).await.unwrap();

        w.tracker
            .reorder()
            .apply(&[
                ReorderEntry::new(a.issue.id, IssueStatus::Todo, 2),
                ReorderEntry::new(b.issue.id, IssueStatus::Todo, 0),
                ReorderEntry::new(c.issue.id, IssueStatus::Done, 1),
            ])
            .await
            .unwrap();

        let listed = store.list_for_sprint(&w.sprint.id).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|d| d.issue.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
        assert!(listed.iter().all(|d| d.reporter.is_some()));
    }

    #[tokio::test]
    async fn test_update_changes_status_and_priority() {
        let w = world().await;
        let store = w.tracker.issues();
        let created = store.create(&w.project.id, todo("triage")).await.unwrap();

        let updated = store
            .update(
                &created.issue.id,
                IssueUpdate {
                    status: Some(IssueStatus::InReview),
                    priority: Some(IssuePriority::Urgent),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.issue.status, IssueStatus::InReview);
        assert_eq!(updated.issue.priority, IssuePriority::Urgent);
        assert_eq!(updated.issue.order, created.issue.order);
        assert!(updated.issue.updated_at >= created.issue.updated_at);

        let partial = store
            .update(
                &created.issue.id,
                IssueUpdate {
                    priority: Some(IssuePriority::Low),
                    ..IssueUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(partial.issue.status, IssueStatus::InReview);
        assert_eq!(partial.issue.priority, IssuePriority::Low);
    }

    #[tokio::test]
    async fn test_update_unknown_issue() {
        let w = world().await;
        let err = w
            .tracker
            .issues()
            .update(&crate::domain::IssueId::new(), IssueUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScrumlineError::IssueNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_from_other_org_is_unauthorized() {
        let w = world().await;
        let created = w
            .tracker
            .issues()
            .create(&w.project.id, todo("private"))
            .await
            .unwrap();

        w.sign_in("user_outsider", GLOBEX).await;
        let err = w
            .tracker
            .issues()
            .update(
                &created.issue.id,
                IssueUpdate {
                    status: Some(IssueStatus::Done),
                    ..IssueUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        w.sign_in("user_admin", ACME).await;
        let unchanged = w.tracker.issues().get(&created.issue.id).await.unwrap();
        assert_eq!(unchanged.issue.status, IssueStatus::Todo);
    }

    #[tokio::test]
    async fn test_delete_by_reporter_or_project_admin_only() {
        let w = world().await;
        let store = w.tracker.issues();

        w.sign_in("user_dev", ACME).await;
        let first = store.create(&w.project.id, todo("dev 1")).await.unwrap();
        let second = store.create(&w.project.id, todo("dev 2")).await.unwrap();
        w.sign_in("user_admin", ACME).await;
        let admins = store.create(&w.project.id, todo("admin")).await.unwrap();

        // neither reporter nor project admin
        w.sign_in("user_dev", ACME).await;
        let err = store.delete(&admins.issue.id).await.unwrap_err();
        assert!(err.is_unauthorized());

        store.delete(&first.issue.id).await.unwrap();

        w.sign_in("user_admin", ACME).await;
        store.delete(&second.issue.id).await.unwrap();
        store.get(&admins.issue.id).await.unwrap();

        for deleted in [first.issue.id, second.issue.id] {
            let err = store.get(&deleted).await.unwrap_err();
            assert!(matches!(err, ScrumlineError::IssueNotFound(_)));
        }
    }

    #[tokio::test]
    async fn test_delete_unknown_issue_or_user() {
        let w = world().await;
        let store = w.tracker.issues();

        let err = store.delete(&crate::domain::IssueId::new()).await.unwrap_err();
        assert!(matches!(err, ScrumlineError::IssueNotFound(_)));

        let created = store.create(&w.project.id, todo("x")).await.unwrap();
        w.sign_in("user_new", ACME).await;
        let err = store.delete(&created.issue.id).await.unwrap_err();
        assert!(matches!(err, ScrumlineError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_for_user_scoped_to_org() {
        let w = world().await;
        let store = w.tracker.issues();

        let reported = store.create(&w.project.id, todo("reported")).await.unwrap();
        let assigned = store
            .create(&w.project.id, todo("assigned").assigned_to(w.dev.id))
            .await
            .unwrap();
        store
            .update(
                &reported.issue.id,
                IssueUpdate {
                    status: Some(IssueStatus::InProgress),
                    ..IssueUpdate::default()
                },
            )
            .await
            .unwrap();

        let mine = store.list_for_user(&w.admin.external_id).await.unwrap();
        let ids: Vec<_> = mine.iter().map(|d| d.issue.id).collect();
        assert_eq!(ids, vec![reported.issue.id, assigned.issue.id]);
        assert!(mine
            .iter()
            .all(|d| d.project.as_ref().map(|p| p.id) == Some(w.project.id)));

        let devs = store.list_for_user(&w.dev.external_id).await.unwrap();
        assert_eq!(devs.len(), 1);
        assert_eq!(devs[0].assignee.as_ref().map(|u| u.id), Some(w.dev.id));

        w.sign_in("user_outsider", GLOBEX).await;
        let elsewhere = store.list_for_user(&w.admin.external_id).await.unwrap();
        assert!(elsewhere.is_empty());
    }
}
