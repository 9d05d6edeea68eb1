//! Identity types owned by the external auth service.
//!
//! Organizations, memberships and roles are never persisted here; they are
//! read through [`crate::auth::AuthProvider`] on every request.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an organization in the auth service (e.g. `org_2abc`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a user in the auth service (e.g. `user_2xyz`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalUserId(String);

impl ExternalUserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub slug: String,
    pub name: String,
}

impl Organization {
    pub fn new(id: impl Into<String>, slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: OrganizationId::new(id),
            slug: slug.into(),
            name: name.into(),
        }
    }
}

/// Role string attached to an organization membership
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrgRole {
    Admin,
    Member,
    Other(String),
}

impl OrgRole {
    const ADMIN: &'static str = "org:admin";
    const MEMBER: &'static str = "org:member";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => Self::ADMIN,
            Self::Member => Self::MEMBER,
            Self::Other(role) => role,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl From<String> for OrgRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            Self::ADMIN => Self::Admin,
            Self::MEMBER => Self::Member,
            _ => Self::Other(value),
        }
    }
}

impl From<OrgRole> for String {
    fn from(value: OrgRole) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's membership in an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: ExternalUserId,
    pub role: OrgRole,
}

impl Membership {
    pub fn new(user_id: impl Into<String>, role: OrgRole) -> Self {
        Self {
            user_id: ExternalUserId::new(user_id),
            role,
        }
    }
}
