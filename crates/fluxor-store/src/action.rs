//! Action registration and lookup.
//!
//! A registered action couples a human-readable name with a reducer.
//! Registration hands back an opaque [`ActionHandle`]; all later
//! operations (dispatch, pipe, unregister) identify the action by that
//! handle or by name, never by function identity. Names need not be
//! unique; lookup by name resolves to the first match in registration
//! order.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::StoreError;
use crate::middleware::BoxFuture;
use crate::state::StoreState;

/// Result of one reducer application.
#[derive(Debug)]
pub enum ReducerOutcome<T> {
    /// Replace the candidate state for the rest of the chain.
    Continue(StoreState<T>),
    /// Abort the dispatch without publishing. Not an error: the
    /// caller's dispatch resolves successfully.
    Abort,
}

/// A named state-transition function.
///
/// Reducers receive the candidate state plus the parameters bound at
/// dispatch time and produce the successor state, the abort outcome, or
/// an error. They may suspend; the dispatch queue guarantees at most
/// one reducer chain is in flight per store.
pub trait Reducer<T>: Send + Sync {
    /// Declared parameter count, the incoming state included. A
    /// reducer declaring zero parameters is rejected at registration.
    fn arity(&self) -> usize;

    fn reduce<'a>(
        &'a self,
        state: StoreState<T>,
        params: &'a [Value],
    ) -> BoxFuture<'a, anyhow::Result<ReducerOutcome<T>>>;
}

/// Adapter turning a synchronous closure into a [`Reducer`].
pub struct FnReducer<F> {
    arity: usize,
    f: F,
}

impl<F> FnReducer<F> {
    pub fn new(arity: usize, f: F) -> Self {
        Self { arity, f }
    }
}

impl<T, F> Reducer<T> for FnReducer<F>
where
    T: Send + 'static,
    F: Fn(StoreState<T>, &[Value]) -> anyhow::Result<ReducerOutcome<T>> + Send + Sync,
{
    fn arity(&self) -> usize {
        self.arity
    }

    fn reduce<'a>(
        &'a self,
        state: StoreState<T>,
        params: &'a [Value],
    ) -> BoxFuture<'a, anyhow::Result<ReducerOutcome<T>>> {
        Box::pin(std::future::ready((self.f)(state, params)))
    }
}

/// Opaque handle identifying one action registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionHandle(pub(crate) u64);

impl fmt::Display for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

/// Dispatch/lookup target: either a handle or a registered name.
#[derive(Debug, Clone)]
pub enum ActionSelector {
    Handle(ActionHandle),
    Name(String),
}

impl fmt::Display for ActionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSelector::Handle(handle) => handle.fmt(f),
            ActionSelector::Name(name) => f.write_str(name),
        }
    }
}

impl From<ActionHandle> for ActionSelector {
    fn from(handle: ActionHandle) -> Self {
        ActionSelector::Handle(handle)
    }
}

impl From<&str> for ActionSelector {
    fn from(name: &str) -> Self {
        ActionSelector::Name(name.to_string())
    }
}

impl From<String> for ActionSelector {
    fn from(name: String) -> Self {
        ActionSelector::Name(name)
    }
}

/// Read-only descriptor of the dispatch in flight, handed to middleware
/// and log output. For a piped dispatch `name` is the combined
/// `"a->b"` form and `params` the concatenation of all bound params.
#[derive(Debug, Clone)]
pub struct CallingAction {
    pub name: String,
    pub params: Vec<Value>,
    pub piped_actions: Vec<PipedAction>,
}

/// One action of a piped dispatch, as seen by middleware.
#[derive(Debug, Clone)]
pub struct PipedAction {
    pub name: String,
    pub params: Vec<Value>,
}

/// A resolved action bound to its dispatch parameters, carried through
/// the queue.
pub(crate) struct DispatchAction<T> {
    pub id: ActionHandle,
    pub name: String,
    pub reducer: Arc<dyn Reducer<T>>,
    pub params: Vec<Value>,
}

pub(crate) struct ActionRegistration<T> {
    pub id: ActionHandle,
    pub name: String,
    pub reducer: Arc<dyn Reducer<T>>,
}

impl<T> Clone for ActionRegistration<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            reducer: Arc::clone(&self.reducer),
        }
    }
}

/// Registration-ordered action table.
pub(crate) struct ActionRegistry<T> {
    entries: Vec<ActionRegistration<T>>,
    next_id: u64,
}

impl<T> ActionRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        reducer: Arc<dyn Reducer<T>>,
    ) -> Result<ActionHandle, StoreError> {
        if reducer.arity() == 0 {
            return Err(StoreError::InvalidReducer(
                "a reducer must declare one or more parameters, where the first is the present state"
                    .to_string(),
            ));
        }
        let id = ActionHandle(self.next_id);
        self.next_id += 1;
        self.entries.push(ActionRegistration {
            id,
            name: name.to_string(),
            reducer,
        });
        Ok(id)
    }

    pub fn unregister(&mut self, handle: ActionHandle) {
        self.entries.retain(|e| e.id != handle);
    }

    pub fn contains(&self, handle: ActionHandle) -> bool {
        self.entries.iter().any(|e| e.id == handle)
    }

    pub fn resolve(&self, selector: &ActionSelector) -> Option<&ActionRegistration<T>> {
        match selector {
            ActionSelector::Handle(handle) => self.entries.iter().find(|e| e.id == *handle),
            ActionSelector::Name(name) => self.entries.iter().find(|e| e.name == *name),
        }
    }
}
