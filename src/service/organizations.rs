use crate::{
    domain::{ExternalUserId, Organization, OrganizationId, User},
    error::Result,
    service::Context,
};
use tracing::{debug, instrument};

/// Read access to organizations and their members
pub struct OrganizationDirectory {
    ctx: Context,
}

impl OrganizationDirectory {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Looks up an organization the caller belongs to
    ///
    /// Returns `None` when the slug is unknown or the caller is not a member.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let user_id = self.ctx.signed_in().await?;
        self.ctx.local_user(&user_id).await?;

        let Some(organization) = self.ctx.auth.organization_by_slug(slug).await? else {
            return Ok(None);
        };
        if self.ctx.auth.role(&organization.id, &user_id).await?.is_none() {
            debug!(org_id = %organization.id, "caller is not a member");
            return Ok(None);
        }
        Ok(Some(organization))
    }

    /// Local user records of an organization's members, sorted by name
    ///
    /// Members who never signed in to this application are skipped.
    #[instrument(skip(self))]
    pub async fn users(&self, org_id: &OrganizationId) -> Result<Vec<User>> {
        let user_id = self.ctx.signed_in().await?;
        self.ctx.local_user(&user_id).await?;

        let member_ids: Vec<ExternalUserId> = self
            .ctx
            .auth
            .list_members(org_id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        let users = self
            .ctx
            .storage
            .list_users_by_external_ids(&member_ids)
            .await?;
        debug!(members = member_ids.len(), users = users.len(), "resolved organization users");
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::OrganizationId;
    use crate::error::ScrumlineError;
    use crate::service::fixtures::{world, ACME, GLOBEX};

    #[tokio::test]
    async fn test_get_by_slug_for_members_only() {
        let w = world().await;
        let directory = w.tracker.organizations();

        let acme = directory.get_by_slug("acme").await.unwrap();
        assert_eq!(acme.map(|o| o.id), Some(OrganizationId::new(ACME)));

        assert!(directory.get_by_slug("globex").await.unwrap().is_none());
        assert!(directory.get_by_slug("initech").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_slug_requires_local_user() {
        let w = world().await;
        w.sign_in_without_org("user_new").await;
        let err = w
            .tracker
            .organizations()
            .get_by_slug("acme")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrumlineError::UserNotFound(_)));

        w.sign_out().await;
        let err = w
            .tracker
            .organizations()
            .get_by_slug("acme")
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_users_of_organization() {
        let w = world().await;
        let users = w
            .tracker
            .organizations()
            .users(&OrganizationId::new(ACME))
            .await
            .unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Ada Admin", "Dev Eloper"]);

        let theirs = w
            .tracker
            .organizations()
            .users(&OrganizationId::new(GLOBEX))
            .await
            .unwrap();
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].id, w.outsider.id);
    }
}
