use crate::domain::{project::ProjectId, uuid_id};
use crate::error::{Result, ScrumlineError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

uuid_id!(
    /// Unique identifier for a sprint
    SprintId,
    SprintNotFound
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SprintStatus {
    Planned,
    Active,
    Completed,
}

impl SprintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
        }
    }

    /// Checks if a status transition is valid
    pub fn can_transition_to(&self, target: &SprintStatus) -> bool {
        match (self, target) {
            (Self::Planned, Self::Active) => true,
            (Self::Active, Self::Completed) => true,

            // Same status is always valid
            _ if self == target => true,

            _ => false,
        }
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planned => write!(f, "Planned"),
            Self::Active => write!(f, "Active"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}

impl std::str::FromStr for SprintStatus {
    type Err = ScrumlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PLANNED" => Ok(Self::Planned),
            "ACTIVE" => Ok(Self::Active),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(ScrumlineError::validation(
                "status",
                format!("unknown sprint status '{s}'"),
            )),
        }
    }
}

/// Caller-supplied fields for a new sprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSprint {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// A time-boxed grouping of issues within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    pub project_id: ProjectId,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SprintStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sprint {
    pub fn create(project_id: ProjectId, fields: NewSprint) -> Result<Self> {
        let name = fields.name.trim().to_string();
        if name.is_empty() {
            return Err(ScrumlineError::validation("name", "cannot be empty"));
        }
        if fields.start_date > fields.end_date {
            return Err(ScrumlineError::InvalidDateRange {
                start: fields.start_date.to_rfc3339(),
                end: fields.end_date.to_rfc3339(),
            });
        }

        let now = Utc::now();
        Ok(Self {
            id: SprintId::new(),
            project_id,
            name,
            start_date: fields.start_date,
            end_date: fields.end_date,
            status: SprintStatus::Planned,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }

    /// Moves the sprint to a new status as of `now`
    ///
    /// A sprint can only be activated while `now` falls inside its date range.
    pub fn transition_to(&mut self, target: SprintStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(&target) {
            return Err(ScrumlineError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        if target == self.status {
            return Ok(());
        }
        if target == SprintStatus::Active && !self.contains(now) {
            return Err(ScrumlineError::validation(
                "status",
                "cannot start a sprint outside its date range",
            ));
        }

        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}
