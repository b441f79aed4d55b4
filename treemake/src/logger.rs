//! Build event logging capability handed to nodes

use tracing::{debug, info};

/// Sink for per-node build events.
///
/// Only `log_clean` is required; the scheduler additionally reports
/// cache decisions through `log_action`.
pub trait Logger: Send + Sync {
    /// A stale artifact named `filename` was removed from the node directory.
    fn log_clean(&self, filename: &str);

    /// Something happened to `target`, e.g. `rebuild` or `isValid`.
    fn log_action(&self, action: &str, target: &str, info: &str) {
        let _ = (action, target, info);
    }
}

/// [`Logger`] backed by `tracing`, scoped to one node.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    scope: String,
}

impl TracingLogger {
    /// Logger whose events are tagged with `scope` (normally the node path)
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }
}

impl Logger for TracingLogger {
    fn log_clean(&self, filename: &str) {
        info!("[clean] {}/{}", self.scope, filename);
    }

    fn log_action(&self, action: &str, target: &str, info: &str) {
        if info.is_empty() {
            debug!("[{}] {}/{}", action, self.scope, target);
        } else {
            info!("[{}] {}/{} ({})", action, self.scope, target, info);
        }
    }
}
