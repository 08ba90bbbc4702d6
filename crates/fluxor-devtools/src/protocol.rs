//! Wire types spoken with the external time-travel debugger.
//!
//! The shapes match the Redux DevTools extension protocol: inbound
//! messages are tagged by `type`, remote replay commands arrive as a
//! nested `DISPATCH` payload with the state snapshot serialized as a
//! JSON string alongside.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound message from the debugger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevToolsMessage {
    /// Replay a named action through the normal dispatch path.
    #[serde(rename = "ACTION")]
    Action { payload: ActionPayload },

    /// Time-travel commands operating on recorded snapshots.
    #[serde(rename = "DISPATCH")]
    Dispatch {
        payload: DispatchPayload,
        /// JSON-serialized state snapshot, where the command carries one.
        #[serde(default)]
        state: Option<String>,
    },
}

/// Payload of a remote `ACTION` message. The first argument is the
/// debugger's state placeholder; every following argument is a
/// JSON-encoded dispatch parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPayload {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// The `DISPATCH` command kinds the bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DispatchPayload {
    #[serde(rename = "JUMP_TO_STATE")]
    JumpToState,
    #[serde(rename = "JUMP_TO_ACTION")]
    JumpToAction,
    #[serde(rename = "COMMIT")]
    Commit,
    #[serde(rename = "RESET")]
    Reset,
    #[serde(rename = "ROLLBACK")]
    Rollback,
}

/// Outbound action descriptor mirrored alongside each published state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundAction {
    /// Combined action name (`"a->b"` for piped dispatches).
    #[serde(rename = "type")]
    pub kind: String,
    pub params: Vec<Value>,
}
