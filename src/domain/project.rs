use crate::domain::{organization::OrganizationId, user::UserId, uuid_id};
use crate::error::{Result, ScrumlineError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

uuid_id!(
    /// Unique identifier for a project
    ProjectId,
    ProjectNotFound
);

/// Caller-supplied fields for a new project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A project owned by one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    pub organization_id: OrganizationId,
    pub admin_ids: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Validates and normalizes the new project's fields
    ///
    /// The key is trimmed and upper-cased; the creator becomes the first admin.
    pub fn create(
        fields: NewProject,
        organization_id: OrganizationId,
        creator: UserId,
    ) -> Result<Self> {
        let name = fields.name.trim().to_string();
        if name.is_empty() {
            return Err(ScrumlineError::validation("name", "cannot be empty"));
        }
        let key = fields.key.trim().to_uppercase();
        if key.is_empty() {
            return Err(ScrumlineError::validation("key", "cannot be empty"));
        }
        if !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ScrumlineError::validation(
                "key",
                "must contain only letters and digits",
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: ProjectId::new(),
            name,
            key,
            description: fields.description,
            organization_id,
            admin_ids: vec![creator],
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_admin(&self, user_id: &UserId) -> bool {
        self.admin_ids.contains(user_id)
    }
}
