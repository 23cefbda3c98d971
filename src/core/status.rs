//! Registry snapshots and batch outcomes.

use serde::Serialize;

use crate::error::SupervisorError;

/// Point-in-time view of the registry.
///
/// May go stale immediately: a process can exit right after the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Names believed running, sorted.
    pub running: Vec<String>,
    /// Every configured name, in configuration order.
    pub configured: Vec<String>,
}

/// Outcome of a best-effort batch (`start_all` / `stop_all`).
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Names processed successfully, in batch order.
    pub succeeded: Vec<String>,
    /// Names that failed with their error, in batch order.
    pub failed: Vec<(String, SupervisorError)>,
}

impl BatchReport {
    pub(crate) fn record(&mut self, name: String, res: Result<(), SupervisorError>) {
        match res {
            Ok(()) => self.succeeded.push(name),
            Err(e) => self.failed.push((name, e)),
        }
    }

    /// True if no item failed.
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Collapses the report into a single result.
    ///
    /// Returns [`SupervisorError::Batch`] listing every failed name and the
    /// message of the first failure.
    pub fn into_result(self) -> Result<(), SupervisorError> {
        let Some((_, first)) = self.failed.first() else {
            return Ok(());
        };
        let first = first.to_string();
        Err(SupervisorError::Batch {
            failed: self.failed.into_iter().map(|(name, _)| name).collect(),
            first,
        })
    }
}
