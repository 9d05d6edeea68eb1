use crate::{
    auth::guard,
    domain::{NewSprint, ProjectId, Sprint, SprintId, SprintStatus},
    error::Result,
    service::{log_denial, Context},
};
use chrono::Utc;
use tracing::{debug, instrument};

/// Sprint planning for the active organization's projects
pub struct SprintPlanner {
    ctx: Context,
}

impl SprintPlanner {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Plans a new sprint; only project admins may
    #[instrument(skip(self, new_sprint), fields(name = %new_sprint.name))]
    pub async fn create(&self, project_id: &ProjectId, new_sprint: NewSprint) -> Result<Sprint> {
        let ctx = self.ctx.org_context().await?;
        let project = self.ctx.project_in_org(project_id, &ctx).await?;
        let user = self.ctx.local_user(&ctx.user_id).await?;
        guard::ensure_project_admin(&project, &user.id).map_err(log_denial)?;

        let sprint = Sprint::create(project.id, new_sprint)?;
        self.ctx.storage.save_sprint(&sprint).await?;
        debug!(sprint_id = %sprint.id, "sprint created");
        Ok(sprint)
    }

    /// Lists a project's sprints by start date
    #[instrument(skip(self))]
    pub async fn list(&self, project_id: &ProjectId) -> Result<Vec<Sprint>> {
        let ctx = self.ctx.org_context().await?;
        self.ctx.project_in_org(project_id, &ctx).await?;
        self.ctx.storage.list_sprints(project_id).await
    }

    /// Starts or completes a sprint; only project admins may
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        sprint_id: &SprintId,
        status: SprintStatus,
    ) -> Result<Sprint> {
        let ctx = self.ctx.org_context().await?;
        let mut sprint = self.ctx.storage.load_sprint(sprint_id).await?;
        let project = self.ctx.project_in_org(&sprint.project_id, &ctx).await?;
        let user = self.ctx.local_user(&ctx.user_id).await?;
        guard::ensure_project_admin(&project, &user.id).map_err(log_denial)?;

        let from = sprint.status;
        sprint.transition_to(status, Utc::now())?;
        if sprint.status != from {
            self.ctx.storage.save_sprint(&sprint).await?;
            debug!(%from, to = %sprint.status, "sprint status changed");
        }
        Ok(sprint)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{NewSprint, SprintStatus};
    use crate::error::ScrumlineError;
    use crate::service::fixtures::{world, ACME};
    use chrono::{Duration, Utc};

    fn next_fortnight(name: &str) -> NewSprint {
        NewSprint {
            name: name.to_string(),
            start_date: Utc::now() + Duration::days(14),
            end_date: Utc::now() + Duration::days(28),
        }
    }

    #[tokio::test]
    async fn test_admin_plans_sprint() {
        let w = world().await;
        let planner = w.tracker.sprints();

        let sprint = planner
            .create(&w.project.id, next_fortnight("Sprint 2"))
            .await
            .unwrap();
        assert_eq!(sprint.status, SprintStatus::Planned);

        let listed = planner.list(&w.project.id).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![w.sprint.id, sprint.id]);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_plan() {
        let w = world().await;
        w.sign_in("user_dev", ACME).await;

        let err = w
            .tracker
            .sprints()
            .create(&w.project.id, next_fortnight("Mine"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_inverted_dates_rejected() {
        let w = world().await;
        let err = w
            .tracker
            .sprints()
            .create(
                &w.project.id,
                NewSprint {
                    name: "Backwards".to_string(),
                    start_date: Utc::now(),
                    end_date: Utc::now() - Duration::days(3),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScrumlineError::InvalidDateRange { .. }));
    }

    #[tokio::test]
    async fn test_foreign_project_sprints_hidden() {
        let w = world().await;
        let err = w
            .tracker
            .sprints()
            .list(&w.foreign_project.id)
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let w = world().await;
        let planner = w.tracker.sprints();

        let err = planner
            .update_status(&w.sprint.id, SprintStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrumlineError::InvalidStatusTransition { .. }));

        let active = planner
            .update_status(&w.sprint.id, SprintStatus::Active)
            .await
            .unwrap();
        assert_eq!(active.status, SprintStatus::Active);

        let done = planner
            .update_status(&w.sprint.id, SprintStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, SprintStatus::Completed);

        let stored = w.tracker.storage().load_sprint(&w.sprint.id).await.unwrap();
        assert_eq!(stored.status, SprintStatus::Completed);
    }

    #[tokio::test]
    async fn test_cannot_start_future_sprint() {
        let w = world().await;
        let planner = w.tracker.sprints();
        let later = planner
            .create(&w.project.id, next_fortnight("Later"))
            .await
            .unwrap();

        let err = planner
            .update_status(&later.id, SprintStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrumlineError::Validation { .. }));
    }
}
