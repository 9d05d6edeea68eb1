use crate::{
    auth::guard,
    domain::{NewProject, OrganizationId, Project, ProjectId},
    error::{Result, ScrumlineError},
    service::{log_denial, Context},
};
use tracing::{debug, instrument};

/// Projects of the active organization
pub struct ProjectDirectory {
    ctx: Context,
}

impl ProjectDirectory {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Creates a project in the active organization
    ///
    /// Only organization admins may create projects; the creator becomes the
    /// project's first admin.
    #[instrument(skip(self, new_project), fields(key = %new_project.key))]
    pub async fn create(&self, new_project: NewProject) -> Result<Project> {
        let session = self.ctx.auth.active_session().await?;
        let user_id = guard::require_user(&session).map_err(log_denial)?.clone();
        let org_id = session.org_id.clone().ok_or_else(|| {
            ScrumlineError::OrganizationNotFound("no organization id provided".to_string())
        })?;

        let role = self.ctx.auth.role(&org_id, &user_id).await?;
        guard::ensure_admin(role.as_ref()).map_err(log_denial)?;

        let creator = self.ctx.local_user(&user_id).await?;
        let project = Project::create(new_project, org_id, creator.id)?;
        self.ctx
            .storage
            .save_project(&project)
            .await
            .map_err(|e| match e {
                ScrumlineError::DuplicateProjectKey(_) => e,
                other => other.during("creating project"),
            })?;

        debug!(project_id = %project.id, "project created");
        Ok(project)
    }

    /// Loads a project of the active organization
    #[instrument(skip(self))]
    pub async fn get(&self, project_id: &ProjectId) -> Result<Project> {
        let ctx = self.ctx.org_context().await?;
        self.ctx.project_in_org(project_id, &ctx).await
    }

    /// Lists an organization's projects, newest first
    #[instrument(skip(self))]
    pub async fn list(&self, org_id: &OrganizationId) -> Result<Vec<Project>> {
        let user_id = self.ctx.signed_in().await?;
        self.ctx.local_user(&user_id).await?;
        let projects = self.ctx.storage.list_projects(org_id).await?;
        debug!(count = projects.len(), "listed projects");
        Ok(projects)
    }
}
