//! Seam to the external identity service.
//!
//! Sessions, organizations and memberships are owned by the auth service;
//! this crate only reads them through [`AuthProvider`].

use crate::{
    domain::{ExternalProfile, ExternalUserId, Membership, OrgRole, Organization, OrganizationId},
    error::Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod guard;
pub mod static_provider;

pub use guard::AuthContext;
pub use static_provider::StaticAuthProvider;

/// Per-request session as reported by the auth service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Option<ExternalUserId>,
    pub org_id: Option<OrganizationId>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(ExternalUserId::new(user_id)),
            org_id: None,
        }
    }

    pub fn in_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(OrganizationId::new(org_id));
        self
    }
}

/// Read access to the external auth service
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the session of the current request
    async fn active_session(&self) -> Result<Session>;

    /// Returns the full profile of the signed-in user, if any
    async fn current_user(&self) -> Result<Option<ExternalProfile>>;

    /// Looks up an organization by its slug
    async fn organization_by_slug(&self, slug: &str) -> Result<Option<Organization>>;

    /// Lists all memberships of an organization
    async fn list_members(&self, org_id: &OrganizationId) -> Result<Vec<Membership>>;

    /// Returns the user's role in the organization, or `None` for non-members
    async fn role(
        &self,
        org_id: &OrganizationId,
        user_id: &ExternalUserId,
    ) -> Result<Option<OrgRole>> {
        let members = self.list_members(org_id).await?;
        Ok(members
            .into_iter()
            .find(|m| &m.user_id == user_id)
            .map(|m| m.role))
    }
}
