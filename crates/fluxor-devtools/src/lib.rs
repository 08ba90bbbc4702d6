//! Time-travel debugger bridge for `fluxor-store`.
//!
//! Translates store-internal dispatch events into the external
//! debugger's message protocol and applies remote commands (action
//! replay, jump, commit, reset, rollback) back onto the store.
//!
//! The debugger itself is abstracted behind [`DevToolsConnector`]; the
//! bridge owns no transport. Wire everything up with [`setup`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fluxor_devtools::{setup, DevToolsConnector, DevToolsMessage, DevToolsOptions};
//! use fluxor_store::{LogDefinitions, Store, StoreOptions};
//! use tokio::sync::mpsc;
//!
//! # fn connector() -> Arc<dyn DevToolsConnector> { unimplemented!() }
//! # fn example() {
//! let store: Store<serde_json::Value> =
//!     Store::new(StoreOptions::new(serde_json::json!({ "count": 0 })));
//! let (tx, rx) = mpsc::unbounded_channel::<DevToolsMessage>();
//! let _bridge = setup(
//!     store.clone(),
//!     connector(),
//!     rx,
//!     DevToolsOptions::default(),
//!     LogDefinitions::default(),
//! );
//! # let _ = tx;
//! # }
//! ```

pub mod bridge;
pub mod protocol;

pub use bridge::{setup, DevToolsBridge, DevToolsConnector, DevToolsOptions};
pub use protocol::{ActionPayload, DevToolsMessage, DispatchPayload, OutboundAction};
