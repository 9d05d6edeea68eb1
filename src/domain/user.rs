use crate::domain::{organization::ExternalUserId, uuid_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

uuid_id!(
    /// Local identifier of a user record
    UserId,
    UserNotFound
);

/// Profile data the auth service exposes for the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProfile {
    pub id: ExternalUserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_addresses: Vec<String>,
    pub image_url: Option<String>,
}

impl ExternalProfile {
    /// Full display name built from the first and last names
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        format!("{first} {last}").trim().to_string()
    }

    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses.first().map(String::as_str)
    }
}

/// Local mirror of an external identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub external_id: ExternalUserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(external_id: ExternalUserId, name: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            external_id,
            name,
            email,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}
