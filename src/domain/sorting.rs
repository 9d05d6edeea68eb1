use crate::domain::issue::Issue;
use std::cmp::Ordering;
use std::str::FromStr;

/// Fields available for sorting issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Status,
    Priority,
    Order,
    Created,
    Updated,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "status" => Ok(SortField::Status),
            "priority" => Ok(SortField::Priority),
            "order" => Ok(SortField::Order),
            "created" => Ok(SortField::Created),
            "updated" => Ok(SortField::Updated),
            _ => Err(format!(
                "Invalid sort field '{}'. Valid fields: id, title, status, priority, order, created, updated",
                s
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Ascending),
            "desc" => Ok(SortOrder::Descending),
            _ => Err(format!(
                "Invalid sort order '{}'. Valid orders: asc, desc",
                s
            )),
        }
    }
}

/// Sorts issues in-place by a single field.
///
/// The sort is stable, so issues comparing equal keep their relative order.
///
/// # Examples
/// ```
/// use scrumline_core::domain::sorting::{sort_issues, SortField, SortOrder};
/// use scrumline_core::domain::{Issue, IssueDraft, IssuePriority, IssueStatus, NewIssue, ProjectId, UserId};
///
/// let issue = |title: &str, order| {
///     Issue::from_draft(
///         IssueDraft {
///             project_id: ProjectId::new(),
///             reporter_id: UserId::new(),
///             fields: NewIssue::new(title, IssueStatus::Todo, IssuePriority::Low),
///         },
///         order,
///     )
/// };
/// let mut issues = vec![issue("C", 2), issue("A", 0), issue("B", 1)];
///
/// sort_issues(&mut issues, SortField::Title, SortOrder::Ascending);
/// assert_eq!(issues[0].title, "A");
/// ```
pub fn sort_issues(issues: &mut [Issue], field: SortField, order: SortOrder) {
    issues.sort_by(|a, b| {
        let cmp = match field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::Status => compare_status(a, b),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::Order => a.order.cmp(&b.order),
            SortField::Created => a.created_at.cmp(&b.created_at),
            SortField::Updated => a.updated_at.cmp(&b.updated_at),
        };

        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

/// Sorts issues into board order: status column first, then order key.
pub fn sort_for_board(issues: &mut [Issue]) {
    issues.sort_by(compare_board_position);
}

/// Compare issues by board position
///
/// Column order: Todo → In Progress → In Review → Done
pub fn compare_board_position(a: &Issue, b: &Issue) -> Ordering {
    compare_status(a, b).then_with(|| a.order.cmp(&b.order))
}

fn compare_status(a: &Issue, b: &Issue) -> Ordering {
    a.status.rank().cmp(&b.status.rank())
}
