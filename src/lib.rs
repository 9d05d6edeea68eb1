//! # Scrumline Core
//!
//! Core business logic for the Scrumline issue tracker: organizations own
//! projects, projects own sprints and issues, and issues sit in ordered
//! status columns on a Kanban board.
//!
//! Identity and organization membership come from an external auth service
//! behind [`AuthProvider`]; persistence goes through [`Storage`]. The
//! [`Tracker`] ties both together and exposes the request-level operations.
//!
//! ```no_run
//! # async fn run() -> scrumline_core::Result<()> {
//! use std::sync::Arc;
//! use scrumline_core::{
//!     auth::Session, domain::OrganizationId, ScrumlineConfig, StaticAuthProvider, Tracker,
//! };
//!
//! let mut config = ScrumlineConfig::load_or_default(std::path::Path::new("."))?;
//! config.apply_env_overrides()?;
//! scrumline_core::logging::init(&config.logging)?;
//!
//! let auth = StaticAuthProvider::new().with_session(Session::signed_in("user_1").in_org("org_1"));
//! let tracker = Tracker::connect(&config.storage, Arc::new(auth)).await?;
//! let projects = tracker
//!     .projects()
//!     .list(&OrganizationId::new("org_1"))
//!     .await?;
//! println!("{} projects", projects.len());
//! tracker.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use auth::{AuthProvider, StaticAuthProvider};
pub use config::ScrumlineConfig;
pub use domain::{
    board::{Board, BoardConfig, Column},
    issue::{Issue, IssueDetails, IssueId, IssuePriority, IssueStatus, ReorderEntry},
};
pub use error::{Result, ScrumlineError};
pub use service::Tracker;
pub use storage::Storage;
