//! Log level selection per store log category.
//!
//! The store emits through the `log` facade; the embedding application
//! picks the backend. [`LogDefinitions`] lets the configuration raise
//! or lower the level per category without touching the backend.

use log::Level;

/// Categories of log output the store produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogType {
    /// One line per dispatched action (`Dispatching: inc`).
    DispatchedActions,
    /// Per-dispatch duration summaries.
    PerformanceLog,
    /// DevTools bridge lifecycle and remote command handling.
    DevToolsStatus,
}

/// Per-category level overrides; unset categories use the caller's
/// fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDefinitions {
    pub dispatched_actions: Option<Level>,
    pub performance_log: Option<Level>,
    pub dev_tools_status: Option<Level>,
}

impl LogDefinitions {
    pub fn level(&self, log_type: LogType, fallback: Level) -> Level {
        let configured = match log_type {
            LogType::DispatchedActions => self.dispatched_actions,
            LogType::PerformanceLog => self.performance_log,
            LogType::DevToolsStatus => self.dev_tools_status,
        };
        configured.unwrap_or(fallback)
    }
}
