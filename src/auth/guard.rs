//! Authorization predicates shared by the services.
//!
//! Every check is derived from the current session and the stored project;
//! nothing is cached between calls.

use crate::auth::Session;
use crate::domain::{ExternalUserId, Issue, OrgRole, OrganizationId, Project, UserId};
use crate::error::{Result, ScrumlineError};

/// Signed-in user together with the active organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: ExternalUserId,
    pub org_id: OrganizationId,
}

pub fn require_user(session: &Session) -> Result<&ExternalUserId> {
    session
        .user_id
        .as_ref()
        .ok_or_else(|| ScrumlineError::unauthorized("no active session"))
}

pub fn require_org_context(session: &Session) -> Result<AuthContext> {
    let user_id = require_user(session)?.clone();
    let org_id = session
        .org_id
        .clone()
        .ok_or_else(|| ScrumlineError::unauthorized("no active organization"))?;
    Ok(AuthContext { user_id, org_id })
}

pub fn ensure_same_org(project: &Project, org_id: &OrganizationId) -> Result<()> {
    if &project.organization_id != org_id {
        return Err(ScrumlineError::unauthorized(format!(
            "project {} belongs to another organization",
            project.id
        )));
    }
    Ok(())
}

pub fn ensure_admin(role: Option<&OrgRole>) -> Result<()> {
    match role {
        Some(role) if role.is_admin() => Ok(()),
        _ => Err(ScrumlineError::unauthorized(
            "only organization admins can perform this action",
        )),
    }
}

pub fn ensure_project_admin(project: &Project, user_id: &UserId) -> Result<()> {
    if !project.is_admin(user_id) {
        return Err(ScrumlineError::unauthorized(format!(
            "not an admin of project {}",
            project.key
        )));
    }
    Ok(())
}

/// Reporter or project admin may delete an issue
pub fn can_delete_issue(issue: &Issue, project: &Project, user_id: &UserId) -> bool {
    &issue.reporter_id == user_id || project.is_admin(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{issue::sample_issue, IssueStatus, NewProject};

    fn project_in(org: &str, admin: UserId) -> Project {
        Project::create(
            NewProject::new("Web", "WEB"),
            OrganizationId::new(org),
            admin,
        )
        .unwrap()
    }

    #[test]
    fn test_require_user() {
        assert!(require_user(&Session::anonymous())
            .unwrap_err()
            .is_unauthorized());
        assert_eq!(
            require_user(&Session::signed_in("user_1")).unwrap().as_str(),
            "user_1"
        );
    }

    #[test]
    fn test_require_org_context() {
        let err = require_org_context(&Session::signed_in("user_1")).unwrap_err();
        assert!(err.is_unauthorized());

        let ctx = require_org_context(&Session::signed_in("user_1").in_org("org_1")).unwrap();
        assert_eq!(ctx.org_id.as_str(), "org_1");
        assert_eq!(ctx.user_id.as_str(), "user_1");
    }

    #[test]
    fn test_ensure_same_org() {
        let project = project_in("org_1", UserId::new());
        assert!(ensure_same_org(&project, &OrganizationId::new("org_1")).is_ok());
        assert!(ensure_same_org(&project, &OrganizationId::new("org_2"))
            .unwrap_err()
            .is_unauthorized());
    }

    #[test]
    fn test_ensure_admin() {
        assert!(ensure_admin(Some(&OrgRole::Admin)).is_ok());
        assert!(ensure_admin(Some(&OrgRole::Member)).is_err());
        assert!(ensure_admin(None).is_err());
    }

    #[test]
    fn test_can_delete_issue() {
        let admin = UserId::new();
        let project = project_in("org_1", admin);
        let issue = sample_issue("Bug", IssueStatus::Todo, 0);
        let reporter = issue.reporter_id;

        assert!(can_delete_issue(&issue, &project, &reporter));
        assert!(can_delete_issue(&issue, &project, &admin));
        assert!(!can_delete_issue(&issue, &project, &UserId::new()));
    }
}
