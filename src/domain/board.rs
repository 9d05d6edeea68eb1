use crate::domain::issue::{Issue, IssueId, IssueStatus, ReorderEntry};
use crate::domain::sorting::compare_board_position;
use crate::error::{Result, ScrumlineError};
use serde::{Deserialize, Serialize};

/// Configuration for a board column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    pub status: IssueStatus,
}

impl ColumnConfig {
    pub fn new(name: String, status: IssueStatus) -> Self {
        Self { name, status }
    }
}

/// Board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub name: String,
    pub columns: Vec<ColumnConfig>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            name: "Sprint Board".to_string(),
            columns: IssueStatus::ALL
                .iter()
                .map(|status| ColumnConfig::new(status.to_string(), *status))
                .collect(),
        }
    }
}

/// One status column with its issues in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub status: IssueStatus,
    pub issues: Vec<Issue>,
}

/// In-memory board view over a sprint's issues
///
/// Mirrors what the client holds while dragging cards; [`Board::move_issue`]
/// produces the reorder batch to submit afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Board {
    /// Groups issues into the configured columns, each sorted by order key
    ///
    /// Issues whose status has no configured column are dropped.
    pub fn from_issues(config: BoardConfig, issues: impl IntoIterator<Item = Issue>) -> Self {
        let mut columns: Vec<Column> = config
            .columns
            .into_iter()
            .map(|col| Column {
                name: col.name,
                status: col.status,
                issues: Vec::new(),
            })
            .collect();

        for issue in issues {
            if let Some(column) = columns.iter_mut().find(|c| c.status == issue.status) {
                column.issues.push(issue);
            }
        }
        for column in &mut columns {
            column.issues.sort_by(compare_board_position);
        }

        Self {
            name: config.name,
            columns,
        }
    }

    /// Gets the column for a status
    pub fn column(&self, status: IssueStatus) -> Option<&Column> {
        self.columns.iter().find(|col| col.status == status)
    }

    fn column_index(&self, status: IssueStatus) -> Option<usize> {
        self.columns.iter().position(|col| col.status == status)
    }

    pub fn find_issue(&self, id: &IssueId) -> Option<&Issue> {
        self.columns
            .iter()
            .flat_map(|col| col.issues.iter())
            .find(|issue| &issue.id == id)
    }

    /// Moves an issue to `to_index` within the `to_status` column.
    ///
    /// The index is clamped to the column length. Every affected column is
    /// renumbered `0..n`, and the returned batch carries one entry per issue
    /// in those columns so that the stored order keys end up gapless and
    /// free of duplicates.
    pub fn move_issue(
        &mut self,
        issue_id: &IssueId,
        to_status: IssueStatus,
        to_index: usize,
    ) -> Result<Vec<ReorderEntry>> {
        let target = self
            .column_index(to_status)
            .ok_or_else(|| ScrumlineError::validation("status", "no column for status"))?;

        let (source, position) = self
            .columns
            .iter()
            .enumerate()
            .find_map(|(ci, col)| {
                col.issues
                    .iter()
                    .position(|issue| &issue.id == issue_id)
                    .map(|pos| (ci, pos))
            })
            .ok_or_else(|| ScrumlineError::IssueNotFound(issue_id.to_string()))?;

        let mut issue = self.columns[source].issues.remove(position);
        issue.status = to_status;

        let dest = &mut self.columns[target].issues;
        let index = to_index.min(dest.len());
        dest.insert(index, issue);

        let mut batch = self.renumber(target);
        if source != target {
            batch.extend(self.renumber(source));
        }
        Ok(batch)
    }

    fn renumber(&mut self, column: usize) -> Vec<ReorderEntry> {
        let status = self.columns[column].status;
        self.columns[column]
            .issues
            .iter_mut()
            .enumerate()
            .map(|(order, issue)| {
                issue.order = order as i64;
                ReorderEntry::new(issue.id, status, issue.order)
            })
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::from_issues(BoardConfig::default(), Vec::new())
    }
}
