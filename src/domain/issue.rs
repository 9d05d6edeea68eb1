use crate::domain::{
    project::{Project, ProjectId},
    sprint::SprintId,
    user::{User, UserId},
    uuid_id,
};
use crate::error::ScrumlineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

uuid_id!(
    /// Unique identifier for an issue
    IssueId,
    IssueNotFound
);

/// Status column of an issue on the board
///
/// Declaration order is the board's column order and drives sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Todo,
    InProgress,
    InReview,
    Done,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 4] = [
        IssueStatus::Todo,
        IssueStatus::InProgress,
        IssueStatus::InReview,
        IssueStatus::Done,
    ];

    /// Wire name, as stored and serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::InReview => "IN_REVIEW",
            Self::Done => "DONE",
        }
    }

    /// Position of the status column on the board
    pub fn rank(&self) -> u8 {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::InReview => 2,
            Self::Done => 3,
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Todo => write!(f, "Todo"),
            Self::InProgress => write!(f, "In Progress"),
            Self::InReview => write!(f, "In Review"),
            Self::Done => write!(f, "Done"),
        }
    }
}

impl FromStr for IssueStatus {
    type Err = ScrumlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "TODO" => Ok(Self::Todo),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "IN_REVIEW" => Ok(Self::InReview),
            "DONE" => Ok(Self::Done),
            _ => Err(ScrumlineError::validation(
                "status",
                format!("unknown status '{s}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuePriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl IssuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for IssuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssuePriority {
    type Err = ScrumlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            _ => Err(ScrumlineError::validation(
                "priority",
                format!("unknown priority '{s}'"),
            )),
        }
    }
}

/// Order key for a new issue placed at the bottom of its column
pub fn next_order(last: Option<i64>) -> i64 {
    last.map_or(0, |order| order + 1)
}

/// Caller-supplied fields for a new issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
}

impl NewIssue {
    pub fn new(title: impl Into<String>, status: IssueStatus, priority: IssuePriority) -> Self {
        Self {
            title: title.into(),
            description: None,
            status,
            priority,
            sprint_id: None,
            assignee_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn in_sprint(mut self, sprint_id: SprintId) -> Self {
        self.sprint_id = Some(sprint_id);
        self
    }

    pub fn assigned_to(mut self, assignee_id: UserId) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }
}

/// A fully resolved insert request handed to storage
///
/// Storage assigns the id, the order key and the timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub project_id: ProjectId,
    pub reporter_id: UserId,
    pub fields: NewIssue,
}

/// Partial update accepted by the issue store
///
/// Only status and priority are mutable after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<IssuePriority>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none()
    }
}

/// One row of a reorder batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderEntry {
    pub issue_id: IssueId,
    pub status: IssueStatus,
    pub order: i64,
}

impl ReorderEntry {
    pub fn new(issue_id: IssueId, status: IssueStatus, order: i64) -> Self {
        Self {
            issue_id,
            status,
            order,
        }
    }
}

/// An issue on a project board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub project_id: ProjectId,
    pub sprint_id: Option<SprintId>,
    pub title: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub order: i64,
    pub reporter_id: UserId,
    pub assignee_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Builds the issue described by a draft at the given order key
    pub fn from_draft(draft: IssueDraft, order: i64) -> Self {
        let now = Utc::now();
        let fields = draft.fields;
        Self {
            id: IssueId::new(),
            project_id: draft.project_id,
            sprint_id: fields.sprint_id,
            title: fields.title,
            description: fields.description,
            status: fields.status,
            priority: fields.priority,
            order,
            reporter_id: draft.reporter_id,
            assignee_id: fields.assignee_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update, returning whether anything changed
    pub fn apply_update(&mut self, update: &IssueUpdate) -> bool {
        let mut changed = false;
        if let Some(status) = update.status {
            changed |= self.status != status;
            self.status = status;
        }
        if let Some(priority) = update.priority {
            changed |= self.priority != priority;
            self.priority = priority;
        }
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    pub fn apply_reorder(&mut self, entry: &ReorderEntry) {
        self.status = entry.status;
        self.order = entry.order;
        self.updated_at = Utc::now();
    }

    /// Whether the given user reported or is assigned to this issue
    pub fn involves(&self, user_id: &UserId) -> bool {
        &self.reporter_id == user_id || self.assignee_id.as_ref() == Some(user_id)
    }
}

/// An issue with its people (and optionally its project) resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDetails {
    #[serde(flatten)]
    pub issue: Issue,
    pub reporter: Option<User>,
    pub assignee: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
}

/// Builds a detached issue for unit tests
#[cfg(test)]
pub(crate) fn sample_issue(title: &str, status: IssueStatus, order: i64) -> Issue {
    let draft = IssueDraft {
        project_id: ProjectId::new(),
        reporter_id: UserId::new(),
        fields: NewIssue::new(title, status, IssuePriority::Medium),
    };
    Issue::from_draft(draft, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_order() {
        assert_eq!(next_order(None), 0);
        assert_eq!(next_order(Some(0)), 1);
        assert_eq!(next_order(Some(41)), 42);
    }

    #[test]
    fn test_status_column_order() {
        assert!(IssueStatus::Todo < IssueStatus::InProgress);
        assert!(IssueStatus::InProgress < IssueStatus::InReview);
        assert!(IssueStatus::InReview < IssueStatus::Done);
        assert_eq!(IssueStatus::Done.rank(), 3);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(IssueStatus::from_str("TODO").unwrap(), IssueStatus::Todo);
        assert_eq!(
            IssueStatus::from_str("in progress").unwrap(),
            IssueStatus::InProgress
        );
        assert_eq!(
            IssueStatus::from_str("in-review").unwrap(),
            IssueStatus::InReview
        );
        assert!(matches!(
            IssueStatus::from_str("BLOCKED"),
            Err(ScrumlineError::Validation { .. })
        ));
    }

    #[test]
    fn test_priority_parsing() {
        assert_eq!(
            IssuePriority::from_str("urgent").unwrap(),
            IssuePriority::Urgent
        );
        assert!(IssuePriority::from_str("critical").is_err());
        assert!(IssuePriority::Low < IssuePriority::Urgent);
    }

    #[test]
    fn test_status_serializes_as_wire_name() {
        let json = serde_json::to_string(&IssueStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        for status in IssueStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_apply_update_only_touches_given_fields() {
        let draft = IssueDraft {
            project_id: ProjectId::new(),
            reporter_id: UserId::new(),
            fields: NewIssue::new("Login page", IssueStatus::Todo, IssuePriority::Low),
        };
        let mut issue = Issue::from_draft(draft, 3);
        let before = issue.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        let changed = issue.apply_update(&IssueUpdate {
            priority: Some(IssuePriority::High),
            ..Default::default()
        });

        assert!(changed);
        assert_eq!(issue.status, IssueStatus::Todo);
        assert_eq!(issue.priority, IssuePriority::High);
        assert_eq!(issue.order, 3);
        assert!(issue.updated_at > before);

        assert!(!issue.apply_update(&IssueUpdate::default()));
    }

    #[test]
    fn test_involves_reporter_and_assignee() {
        let reporter = UserId::new();
        let assignee = UserId::new();
        let draft = IssueDraft {
            project_id: ProjectId::new(),
            reporter_id: reporter,
            fields: NewIssue::new("Task", IssueStatus::Todo, IssuePriority::Medium)
                .assigned_to(assignee),
        };
        let issue = Issue::from_draft(draft, 0);

        assert!(issue.involves(&reporter));
        assert!(issue.involves(&assignee));
        assert!(!issue.involves(&UserId::new()));
    }
}
