use crate::domain::issue::{Issue, IssuePriority};
use crate::domain::user::UserId;
use serde::{Deserialize, Serialize};

/// Board filter applied to the issues of a sprint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardFilter {
    /// Case-insensitive substring matched against the title
    #[serde(default)]
    pub search: String,
    /// Any-of assignee set; empty matches every issue
    #[serde(default)]
    pub assignees: Vec<UserId>,
    #[serde(default)]
    pub priority: Option<IssuePriority>,
}

impl BoardFilter {
    pub fn is_active(&self) -> bool {
        !self.search.is_empty() || !self.assignees.is_empty() || self.priority.is_some()
    }

    /// Adds the assignee to the selection, or removes it if already selected
    pub fn toggle_assignee(&mut self, assignee: UserId) {
        if let Some(pos) = self.assignees.iter().position(|id| *id == assignee) {
            self.assignees.remove(pos);
        } else {
            self.assignees.push(assignee);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        let search = self.search.to_lowercase();
        let title_matches = issue.title.to_lowercase().contains(&search);

        let assignee_matches = self.assignees.is_empty()
            || issue
                .assignee_id
                .as_ref()
                .is_some_and(|id| self.assignees.contains(id));

        let priority_matches = self.priority.map_or(true, |p| issue.priority == p);

        title_matches && assignee_matches && priority_matches
    }

    /// Returns the matching issues, preserving input order
    pub fn apply<'a>(&self, issues: &'a [Issue]) -> Vec<&'a Issue> {
        issues.iter().filter(|issue| self.matches(issue)).collect()
    }
}

/// Distinct assignees of the given issues, in first-seen order
pub fn assignee_candidates(issues: &[Issue]) -> Vec<UserId> {
    let mut seen = Vec::new();
    for id in issues.iter().filter_map(|issue| issue.assignee_id) {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}
