//! Error taxonomy for the store.
//!
//! Aborts are not errors: a middleware or reducer returning the abort
//! outcome resolves the dispatch successfully without publishing a state.
//! Everything in here rejects only the originating caller; the dispatch
//! queue keeps draining subsequent items.

use thiserror::Error;

/// Errors surfaced by registration, dispatch and the DevTools bridge.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The dispatch or pipe target could not be resolved in the action
    /// registry. Registration is re-checked when the item reaches the
    /// queue head, so this can also surface for an action unregistered
    /// after enqueue.
    #[error("tried to dispatch an unregistered action {0}")]
    UnregisteredAction(String),

    /// Registration-time contract violation, e.g. a reducer declaring
    /// zero parameters. The registry is left untouched.
    #[error("invalid reducer: {0}")]
    InvalidReducer(String),

    /// A reducer produced a state whose shape does not match the
    /// store's configured representation. Fatal for that dispatch.
    #[error("reducer for action {action} broke its contract: {reason}")]
    ReducerContract { action: String, reason: String },

    /// A remote command from the debugger lacked required arguments.
    #[error("missing arguments: {0}")]
    MissingArguments(String),

    /// A middleware failed and `propagate_error` is enabled. Without
    /// that setting the error is logged and the previous state is
    /// carried forward instead.
    #[error("middleware {middleware} failed")]
    Middleware {
        middleware: String,
        #[source]
        source: anyhow::Error,
    },

    /// A reducer returned an error while applying the transition.
    #[error("reducer for action {action} failed")]
    Reducer {
        action: String,
        #[source]
        source: anyhow::Error,
    },

    /// A JSON payload on the DevTools wire could not be parsed.
    #[error("malformed JSON payload")]
    MalformedPayload(#[from] serde_json::Error),

    /// The dispatch queue worker is gone; no further dispatches can be
    /// processed on this store.
    #[error("the dispatch queue is closed")]
    QueueClosed,
}
