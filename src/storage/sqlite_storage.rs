use crate::{
    config::StorageConfig,
    domain::{
        issue::next_order, sort_for_board, ExternalUserId, Issue, IssueDraft, IssueId,
        IssueUpdate, OrganizationId, Project, ProjectId, ReorderEntry, Sprint, SprintId, User,
        UserId,
    },
    error::{Result, ScrumlineError},
    storage::Storage,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{
    params, params_from_iter, types::Type, Connection, ErrorCode, OptionalExtension, Row,
    TransactionBehavior,
};
use std::{path::Path, str::FromStr, sync::Mutex, time::Duration};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    external_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    image_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    key TEXT NOT NULL,
    description TEXT,
    organization_id TEXT NOT NULL,
    admin_ids TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (organization_id, key)
);

CREATE TABLE IF NOT EXISTS sprints (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    sprint_id TEXT REFERENCES sprints(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    sort_order INTEGER NOT NULL,
    reporter_id TEXT NOT NULL REFERENCES users(id),
    assignee_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_issues_column ON issues (project_id, status, sort_order);
CREATE INDEX IF NOT EXISTS idx_issues_sprint ON issues (sprint_id);
"#;

const ISSUE_COLUMNS: &str = "id, project_id, sprint_id, title, description, status, priority, \
     sort_order, reporter_id, assignee_id, created_at, updated_at";

/// SQLite-based storage backend
///
/// The connection is closed and dropped on shutdown.
pub struct SqliteStorage {
    connection: Mutex<Option<Connection>>,
}

impl SqliteStorage {
    /// Opens the database described by the configuration
    ///
    /// Without a path an in-memory database is used.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let connection = match &config.path {
            Some(path) => Self::connect(path)?,
            None => Connection::open_in_memory()?,
        };
        connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn connect(path: &Path) -> Result<Connection> {
        let connection = Connection::open(path)?;
        connection.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Ok(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        connection.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            connection: Mutex::new(Some(connection)),
        })
    }

    fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| ScrumlineError::StorageError("connection lock poisoned".to_string()))?;
        let connection = guard
            .as_mut()
            .ok_or_else(|| ScrumlineError::StorageError("storage has been shut down".to_string()))?;
        f(connection)
    }
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ScrumlineError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = ScrumlineError>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        value
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: parse_column(row, 0)?,
        project_id: parse_column(row, 1)?,
        sprint_id: parse_optional_column(row, 2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: parse_column(row, 5)?,
        priority: parse_column(row, 6)?,
        order: row.get(7)?,
        reporter_id: parse_column(row, 8)?,
        assignee_id: parse_optional_column(row, 9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_column(row, 0)?,
        external_id: ExternalUserId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        email: row.get(3)?,
        image_url: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let admin_ids: String = row.get(5)?;
    Ok(Project {
        id: parse_column(row, 0)?,
        name: row.get(1)?,
        key: row.get(2)?,
        description: row.get(3)?,
        organization_id: OrganizationId::new(row.get::<_, String>(4)?),
        admin_ids: serde_json::from_str(&admin_ids)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn sprint_from_row(row: &Row<'_>) -> rusqlite::Result<Sprint> {
    Ok(Sprint {
        id: parse_column(row, 0)?,
        project_id: parse_column(row, 1)?,
        name: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        status: parse_column(row, 5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn select_issue(conn: &Connection, id: &IssueId) -> Result<Issue> {
    conn.query_row(
        &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
        params![id.to_string()],
        issue_from_row,
    )
    .optional()?
    .ok_or_else(|| ScrumlineError::IssueNotFound(id.to_string()))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
    }

    async fn shutdown(&self) -> Result<()> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| ScrumlineError::StorageError("connection lock poisoned".to_string()))?
            .take();
        if let Some(connection) = connection {
            connection.close().map_err(|(_, e)| ScrumlineError::from(e))?;
        }
        Ok(())
    }

    async fn find_user_by_external_id(
        &self,
        external_id: &ExternalUserId,
    ) -> Result<Option<User>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, external_id, name, email, image_url, created_at, updated_at
                     FROM users WHERE external_id = ?1",
                    params![external_id.as_str()],
                    user_from_row,
                )
                .optional()?)
        })
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (id, external_id, name, email, image_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id.to_string(),
                    user.external_id.as_str(),
                    user.name,
                    user.email,
                    user.image_url,
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    async fn list_users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT id, external_id, name, email, image_url, created_at, updated_at
                 FROM users WHERE id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let users = stmt
                .query_map(params_from_iter(ids.iter().map(|id| id.to_string())), user_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    async fn list_users_by_external_ids(&self, ids: &[ExternalUserId]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT id, external_id, name, email, image_url, created_at, updated_at
                 FROM users WHERE external_id IN ({}) ORDER BY name",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let users = stmt
                .query_map(params_from_iter(ids.iter().map(|id| id.as_str())), user_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        let admin_ids = serde_json::to_string(&project.admin_ids)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO projects
                     (id, name, key, description, organization_id, admin_ids, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    project.id.to_string(),
                    project.name,
                    project.key,
                    project.description,
                    project.organization_id.as_str(),
                    admin_ids,
                    project.created_at,
                    project.updated_at,
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    ScrumlineError::DuplicateProjectKey(project.key.clone())
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    async fn load_project(&self, id: &ProjectId) -> Result<Project> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, name, key, description, organization_id, admin_ids, created_at, updated_at
                 FROM projects WHERE id = ?1",
                params![id.to_string()],
                project_from_row,
            )
            .optional()?
            .ok_or_else(|| ScrumlineError::ProjectNotFound(id.to_string()))
        })
    }

    async fn list_projects(&self, org_id: &OrganizationId) -> Result<Vec<Project>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, key, description, organization_id, admin_ids, created_at, updated_at
                 FROM projects WHERE organization_id = ?1 ORDER BY created_at DESC",
            )?;
            let projects = stmt
                .query_map(params![org_id.as_str()], project_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(projects)
        })
    }

    async fn save_sprint(&self, sprint: &Sprint) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO sprints
                     (id, project_id, name, start_date, end_date, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     start_date = excluded.start_date,
                     end_date = excluded.end_date,
                     status = excluded.status,
                     updated_at = excluded.updated_at",
                params![
                    sprint.id.to_string(),
                    sprint.project_id.to_string(),
                    sprint.name,
                    sprint.start_date,
                    sprint.end_date,
                    sprint.status.as_str(),
                    sprint.created_at,
                    sprint.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    async fn load_sprint(&self, id: &SprintId) -> Result<Sprint> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, project_id, name, start_date, end_date, status, created_at, updated_at
                 FROM sprints WHERE id = ?1",
                params![id.to_string()],
                sprint_from_row,
            )
            .optional()?
            .ok_or_else(|| ScrumlineError::SprintNotFound(id.to_string()))
        })
    }

    async fn list_sprints(&self, project_id: &ProjectId) -> Result<Vec<Sprint>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, project_id, name, start_date, end_date, status, created_at, updated_at
                 FROM sprints WHERE project_id = ?1 ORDER BY start_date, created_at",
            )?;
            let sprints = stmt
                .query_map(params![project_id.to_string()], sprint_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(sprints)
        })
    }

    async fn create_issue(&self, draft: IssueDraft) -> Result<Issue> {
        self.with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let last: Option<i64> = tx.query_row(
                "SELECT MAX(sort_order) FROM issues WHERE project_id = ?1 AND status = ?2",
                params![draft.project_id.to_string(), draft.fields.status.as_str()],
                |row| row.get(0),
            )?;
            let issue = Issue::from_draft(draft, next_order(last));
            tx.execute(
                &format!(
                    "INSERT INTO issues ({ISSUE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    issue.id.to_string(),
                    issue.project_id.to_string(),
                    issue.sprint_id.map(|id| id.to_string()),
                    issue.title,
                    issue.description,
                    issue.status.as_str(),
                    issue.priority.as_str(),
                    issue.order,
                    issue.reporter_id.to_string(),
                    issue.assignee_id.map(|id| id.to_string()),
                    issue.created_at,
                    issue.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(issue)
        })
    }

    async fn load_issue(&self, id: &IssueId) -> Result<Issue> {
        self.with_connection(|conn| select_issue(conn, id))
    }

    async fn update_issue(&self, id: &IssueId, update: &IssueUpdate) -> Result<Issue> {
        self.with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut issue = select_issue(&tx, id)?;
            if issue.apply_update(update) {
                tx.execute(
                    "UPDATE issues SET status = ?1, priority = ?2, updated_at = ?3 WHERE id = ?4",
                    params![
                        issue.status.as_str(),
                        issue.priority.as_str(),
                        issue.updated_at,
                        id.to_string(),
                    ],
                )?;
            }
            tx.commit()?;
            Ok(issue)
        })
    }

    async fn delete_issue(&self, id: &IssueId) -> Result<()> {
        self.with_connection(|conn| {
            let deleted =
                conn.execute("DELETE FROM issues WHERE id = ?1", params![id.to_string()])?;
            if deleted == 0 {
                return Err(ScrumlineError::IssueNotFound(id.to_string()));
            }
            Ok(())
        })
    }

    async fn list_issues_by_sprint(&self, sprint_id: &SprintId) -> Result<Vec<Issue>> {
        let mut issues = self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ISSUE_COLUMNS} FROM issues WHERE sprint_id = ?1 ORDER BY sort_order"
            ))?;
            let issues = stmt
                .query_map(params![sprint_id.to_string()], issue_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(issues)
        })?;
        sort_for_board(&mut issues);
        Ok(issues)
    }

    async fn list_issues_for_user(
        &self,
        user_id: &UserId,
        org_id: &OrganizationId,
    ) -> Result<Vec<Issue>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.id, i.project_id, i.sprint_id, i.title, i.description, i.status,
                        i.priority, i.sort_order, i.reporter_id, i.assignee_id, i.created_at,
                        i.updated_at
                 FROM issues i
                 JOIN projects p ON p.id = i.project_id
                 WHERE (i.assignee_id = ?1 OR i.reporter_id = ?1) AND p.organization_id = ?2
                 ORDER BY i.updated_at DESC",
            )?;
            let issues = stmt
                .query_map(params![user_id.to_string(), org_id.as_str()], issue_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(issues)
        })
    }

    async fn apply_reorder(&self, batch: &[ReorderEntry]) -> Result<usize> {
        self.with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = Utc::now();
            {
                let mut stmt = tx.prepare(
                    "UPDATE issues SET status = ?1, sort_order = ?2, updated_at = ?3 WHERE id = ?4",
                )?;
                for entry in batch {
                    let updated = stmt.execute(params![
                        entry.status.as_str(),
                        entry.order,
                        now,
                        entry.issue_id.to_string(),
                    ])?;
                    if updated == 0 {
                        // Dropping the transaction rolls back the rows already written.
                        return Err(ScrumlineError::IssueNotFound(entry.issue_id.to_string()));
                    }
                }
            }
            tx.commit()?;
            Ok(batch.len())
        })
    }
}
