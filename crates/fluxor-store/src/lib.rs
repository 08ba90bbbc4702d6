//! Reactive single-source-of-truth state container.
//!
//! Callers register named state-transition functions (actions),
//! dispatch them with parameters, and observe a stream of immutable
//! state snapshots. Dispatches are serialized by a queue so at most one
//! transition is ever in flight, and a two-phase middleware pipeline
//! can veto or transform each transition.
//!
//! # Architecture
//!
//! ```text
//! dispatch / pipe
//!       │
//!       ▼
//! ┌───────────────┐   one item at a time   ┌───────────────────────┐
//! │ DispatchQueue │ ─────────────────────► │ before middleware     │
//! └───────────────┘                        │ reducer chain         │
//!                                          │ after middleware      │
//!                                          │ history limiting      │
//!                                          └──────────┬────────────┘
//!                                                     ▼
//!                                    watch stream + dispatch events
//! ```
//!
//! # Example
//!
//! ```rust
//! use fluxor_store::{FnReducer, ReducerOutcome, Store, StoreOptions, StoreState};
//! use serde_json::Value;
//!
//! # async fn example() -> Result<(), fluxor_store::StoreError> {
//! #[derive(Clone)]
//! struct App { count: i64 }
//!
//! let store = Store::new(StoreOptions::new(App { count: 0 }));
//! store.register_action(
//!     "inc",
//!     FnReducer::new(1, |state: StoreState<App>, _params: &[Value]| {
//!         Ok(ReducerOutcome::Continue(
//!             state.update(|app| App { count: app.count + 1 }),
//!         ))
//!     }),
//! )?;
//!
//! store.dispatch("inc", vec![]).await?;
//! assert_eq!(store.current_state().present().count, 1);
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod errors;
pub mod history;
pub mod logging;
pub mod middleware;
pub mod perf;
mod queue;
pub mod state;
pub mod store;

pub use action::{
    ActionHandle, ActionSelector, CallingAction, FnReducer, PipedAction, Reducer, ReducerOutcome,
};
pub use errors::StoreError;
pub use history::{HistoryOptions, StateHistory};
pub use logging::{LogDefinitions, LogType};
pub use middleware::{
    BoxFuture, Middleware, MiddlewareHandle, MiddlewareOutcome, MiddlewarePlacement,
};
pub use perf::{EntryType, MonotonicPerformance, Performance, PerformanceEntry};
pub use state::StoreState;
pub use store::{
    DispatchEvent, Dispatcher, PerformanceMeasurement, PipedDispatch, Store, StoreOptions,
};
