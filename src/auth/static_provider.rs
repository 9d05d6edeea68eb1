use crate::{
    auth::{AuthProvider, Session},
    domain::{ExternalProfile, ExternalUserId, Membership, Organization, OrganizationId},
    error::Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Directory {
    session: Session,
    profiles: HashMap<ExternalUserId, ExternalProfile>,
    organizations: Vec<Organization>,
    members: HashMap<OrganizationId, Vec<Membership>>,
}

/// In-process auth provider backed by a fixed directory
///
/// Useful for tests and for embedding the core behind an already
/// authenticated transport. The session can be switched at runtime.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    directory: RwLock<Directory>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.directory.get_mut().session = session;
        self
    }

    pub fn with_organization(
        mut self,
        organization: Organization,
        members: Vec<Membership>,
    ) -> Self {
        let dir = self.directory.get_mut();
        dir.members.insert(organization.id.clone(), members);
        dir.organizations.push(organization);
        self
    }

    pub fn with_profile(mut self, profile: ExternalProfile) -> Self {
        self.directory
            .get_mut()
            .profiles
            .insert(profile.id.clone(), profile);
        self
    }

    /// Replaces the active session
    pub async fn set_session(&self, session: Session) {
        self.directory.write().await.session = session;
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn active_session(&self) -> Result<Session> {
        Ok(self.directory.read().await.session.clone())
    }

    async fn current_user(&self) -> Result<Option<ExternalProfile>> {
        let dir = self.directory.read().await;
        Ok(dir
            .session
            .user_id
            .as_ref()
            .and_then(|id| dir.profiles.get(id))
            .cloned())
    }

    async fn organization_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let dir = self.directory.read().await;
        Ok(dir.organizations.iter().find(|o| o.slug == slug).cloned())
    }

    async fn list_members(&self, org_id: &OrganizationId) -> Result<Vec<Membership>> {
        let dir = self.directory.read().await;
        Ok(dir.members.get(org_id).cloned().unwrap_or_default())
    }
}
