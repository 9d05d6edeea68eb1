use crate::{domain::ReorderEntry, error::Result, service::Context};
use tracing::{debug, instrument};

/// Applies drag-and-drop reorder batches
///
/// Only the session and the active organization are checked; entries are
/// not matched against the organization individually. Concurrent batches
/// are last-write-wins.
pub struct ReorderCoordinator {
    ctx: Context,
}

impl ReorderCoordinator {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Writes every entry's status and order in one atomic step
    ///
    /// Returns the number of issues written. An unknown id fails the whole
    /// batch with `IssueNotFound` and leaves every issue untouched.
    #[instrument(skip(self, batch), fields(entries = batch.len()))]
    pub async fn apply(&self, batch: &[ReorderEntry]) -> Result<usize> {
        self.ctx.org_context().await?;
        if batch.is_empty() {
            return Ok(0);
        }
        let written = self.ctx.storage.apply_reorder(batch).await?;
        debug!(written, "reorder batch applied");
        Ok(written)
    }
}
