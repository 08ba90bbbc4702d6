//! Store orchestration: composes the action registry, middleware
//! pipeline, dispatch queue and history limiting around a single
//! current-value state stream.
//!
//! A dispatch moves through a fixed sequence once it reaches the queue
//! head:
//!
//! ```text
//! Queued → BeforeMiddleware → Reducing → AfterMiddleware
//!        → HistoryLimiting → Published
//! ```
//!
//! with two abort exits (middleware veto, reducer abort) and one
//! failure exit. Aborts resolve the caller successfully without
//! publishing; failures reject only that caller and the queue keeps
//! draining.

use std::sync::{Arc, Mutex};

use log::Level;
use serde_json::Value;
use strum::Display;
use tokio::sync::{broadcast, watch};

use crate::action::{
    ActionHandle, ActionRegistration, ActionRegistry, ActionSelector, CallingAction,
    DispatchAction, FnReducer, PipedAction, Reducer, ReducerOutcome,
};
use crate::errors::StoreError;
use crate::history::{self, HistoryOptions, StateHistory};
use crate::logging::{LogDefinitions, LogType};
use crate::middleware::{
    run_pipeline, Middleware, MiddlewareHandle, MiddlewarePlacement, MiddlewareRegistry,
    PipelineResult,
};
use crate::perf::{EntryType, MonotonicPerformance, Performance};
use crate::queue::DispatchQueue;
use crate::state::StoreState;

/// Which duration summary to emit after a published dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PerformanceMeasurement {
    /// One measure spanning dispatch start to publish.
    #[strum(serialize = "startEnd")]
    StartEnd,
    /// Every recorded marker, including per-reducer and per-middleware.
    #[strum(serialize = "all")]
    All,
}

/// Construction-time configuration. `initial_state` is the only
/// required piece; everything else defaults off.
#[derive(Debug, Clone)]
pub struct StoreOptions<T> {
    pub initial_state: T,
    pub history: Option<HistoryOptions>,
    pub log_dispatched_actions: bool,
    pub measure_performance: Option<PerformanceMeasurement>,
    pub propagate_error: bool,
    pub log_definitions: LogDefinitions,
}

impl<T> StoreOptions<T> {
    pub fn new(initial_state: T) -> Self {
        Self {
            initial_state,
            history: None,
            log_dispatched_actions: false,
            measure_performance: None,
            propagate_error: false,
            log_definitions: LogDefinitions::default(),
        }
    }
}

/// Mirrored on every successful publish; consumed by the DevTools
/// bridge and anyone else interested in the dispatch log.
#[derive(Debug, Clone)]
pub struct DispatchEvent<T> {
    /// Combined action name (`"a->b"` for piped dispatches).
    pub name: String,
    /// Concatenated parameters of all piped actions.
    pub params: Vec<Value>,
    /// The state that was published.
    pub state: StoreState<T>,
}

struct Settings {
    log_dispatched_actions: bool,
    measure_performance: Option<PerformanceMeasurement>,
    propagate_error: bool,
    log_definitions: LogDefinitions,
    history_limit: Option<usize>,
}

/// Shared internals: everything the queue worker needs to run a
/// dispatch. The queue is the sole writer of the state stream apart
/// from [`Store::reset_to_state`].
pub(crate) struct StoreCore<T> {
    settings: Settings,
    initial_state: StoreState<T>,
    state_tx: watch::Sender<StoreState<T>>,
    actions: Mutex<ActionRegistry<T>>,
    middlewares: Mutex<MiddlewareRegistry<T>>,
    performance: Arc<dyn Performance>,
    events_tx: broadcast::Sender<DispatchEvent<T>>,
}

impl<T: Clone + Send + Sync + 'static> StoreCore<T> {
    /// Entry point for the queue worker. Markers and measures are
    /// cleared after every dispatch regardless of outcome.
    pub(crate) async fn run_dispatch(
        &self,
        actions: Vec<DispatchAction<T>>,
    ) -> Result<(), StoreError> {
        let result = self.dispatch_steps(&actions).await;
        self.performance.clear_marks();
        self.performance.clear_measures();
        result
    }

    async fn dispatch_steps(&self, actions: &[DispatchAction<T>]) -> Result<(), StoreError> {
        // Registration is re-checked at execution time, not just at
        // enqueue time.
        {
            let registry = self.actions.lock().expect("action registry lock poisoned");
            if let Some(gone) = actions.iter().find(|a| !registry.contains(a.id)) {
                return Err(StoreError::UnregisteredAction(gone.name.clone()));
            }
        }

        self.performance.mark("dispatch-start");

        let calling_action = CallingAction {
            name: actions
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join("->"),
            params: actions
                .iter()
                .flat_map(|a| a.params.iter().cloned())
                .collect(),
            piped_actions: actions
                .iter()
                .map(|a| PipedAction {
                    name: a.name.clone(),
                    params: a.params.clone(),
                })
                .collect(),
        };

        if self.settings.log_dispatched_actions {
            log::log!(
                self.settings
                    .log_definitions
                    .level(LogType::DispatchedActions, Level::Info),
                "Dispatching: {}",
                calling_action.name
            );
        }

        let chain = self
            .middlewares
            .lock()
            .expect("middleware registry lock poisoned")
            .snapshot();
        let published = self.state_tx.borrow().clone();

        let before = run_pipeline(
            &chain,
            MiddlewarePlacement::Before,
            published.clone(),
            &published,
            &calling_action,
            self.settings.propagate_error,
            self.performance.as_ref(),
        )
        .await?;

        let mut result = match before {
            PipelineResult::Abort => return Ok(()),
            PipelineResult::Continue(state) => state,
        };

        let expects_history = self.initial_state.is_historied();
        for action in actions {
            let outcome = action
                .reducer
                .reduce(result, &action.params)
                .await
                .map_err(|e| StoreError::Reducer {
                    action: action.name.clone(),
                    source: e,
                })?;
            self.performance
                .mark(&format!("dispatch-after-reducer-{}", action.name));

            match outcome {
                ReducerOutcome::Abort => return Ok(()),
                ReducerOutcome::Continue(next) => {
                    if next.is_historied() != expects_history {
                        return Err(StoreError::ReducerContract {
                            action: action.name.clone(),
                            reason: "returned a state whose shape does not match the store's \
                                     configured representation"
                                .to_string(),
                        });
                    }
                    result = next;
                }
            }
        }

        let after = run_pipeline(
            &chain,
            MiddlewarePlacement::After,
            result,
            &published,
            &calling_action,
            self.settings.propagate_error,
            self.performance.as_ref(),
        )
        .await?;

        let mut resulting = match after {
            PipelineResult::Abort => return Ok(()),
            PipelineResult::Continue(state) => state,
        };

        if let Some(limit) = self.settings.history_limit {
            resulting = match resulting {
                StoreState::Historied(h) => StoreState::Historied(history::apply_limits(h, limit)),
                plain => plain,
            };
        }

        self.state_tx.send_replace(resulting.clone());
        self.performance.mark("dispatch-end");

        self.log_performance(&calling_action);

        let _ = self.events_tx.send(DispatchEvent {
            name: calling_action.name,
            params: calling_action.params,
            state: resulting,
        });

        Ok(())
    }

    fn log_performance(&self, calling_action: &CallingAction) {
        let level = self
            .settings
            .log_definitions
            .level(LogType::PerformanceLog, Level::Info);

        match self.settings.measure_performance {
            Some(PerformanceMeasurement::StartEnd) => {
                self.performance
                    .measure("startEndDispatchDuration", "dispatch-start", "dispatch-end");
                if let Some(measure) = self
                    .performance
                    .entries_by_name("startEndDispatchDuration")
                    .first()
                {
                    log::log!(
                        level,
                        "Total duration {:?} of dispatched action {}",
                        measure.duration,
                        calling_action.name
                    );
                }
            }
            Some(PerformanceMeasurement::All) => {
                let marks = self.performance.entries_by_type(EntryType::Mark);
                if let (Some(first), Some(last)) = (marks.first(), marks.last()) {
                    log::log!(
                        level,
                        "Total duration {:?} of dispatched action {} across {} marks",
                        last.start.saturating_sub(first.start),
                        calling_action.name,
                        marks.len()
                    );
                }
            }
            None => {}
        }
    }
}

/// The reactive state container.
///
/// Cheap to clone; all clones share the same state stream, registries
/// and dispatch queue. Must be created from within a tokio runtime
/// (construction spawns the queue worker).
pub struct Store<T> {
    core: Arc<StoreCore<T>>,
    queue: DispatchQueue<T>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            queue: self.queue.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    pub fn new(options: StoreOptions<T>) -> Self {
        Self::with_performance(options, Arc::new(MonotonicPerformance::new()))
    }

    /// Create a store with an injected clock/marker service.
    pub fn with_performance(options: StoreOptions<T>, performance: Arc<dyn Performance>) -> Self {
        let history = options.history.unwrap_or_default();
        let initial_state = if history.undoable {
            StoreState::Historied(StateHistory::new(options.initial_state))
        } else {
            StoreState::Plain(options.initial_state)
        };

        let (state_tx, _) = watch::channel(initial_state.clone());
        let (events_tx, _) = broadcast::channel(64);

        let core = Arc::new(StoreCore {
            settings: Settings {
                log_dispatched_actions: options.log_dispatched_actions,
                measure_performance: options.measure_performance,
                propagate_error: options.propagate_error,
                log_definitions: options.log_definitions,
                history_limit: if history.undoable { history.limit } else { None },
            },
            initial_state,
            state_tx,
            actions: Mutex::new(ActionRegistry::new()),
            middlewares: Mutex::new(MiddlewareRegistry::new()),
            performance,
            events_tx,
        });

        let queue = DispatchQueue::spawn(Arc::clone(&core));
        let store = Self { core, queue };
        if history.undoable {
            store.register_history_actions();
        }
        store
    }

    /// Built-in actions available on undoable stores.
    fn register_history_actions(&self) {
        let jump = FnReducer::new(2, |state: StoreState<T>, params: &[Value]| {
            let distance = params
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| anyhow::anyhow!("jump expects a signed integer distance"))?;
            Ok(match state {
                StoreState::Historied(h) => ReducerOutcome::Continue(StoreState::Historied(
                    history::jump(h, distance as isize),
                )),
                plain => ReducerOutcome::Continue(plain),
            })
        });
        // arity is non-zero, registration cannot fail
        let _ = self.register_action("jump", jump);
    }

    pub fn register_action(
        &self,
        name: &str,
        reducer: impl Reducer<T> + 'static,
    ) -> Result<ActionHandle, StoreError> {
        self.core
            .actions
            .lock()
            .expect("action registry lock poisoned")
            .register(name, Arc::new(reducer))
    }

    pub fn unregister_action(&self, handle: ActionHandle) {
        self.core
            .actions
            .lock()
            .expect("action registry lock poisoned")
            .unregister(handle);
    }

    pub fn is_action_registered(&self, selector: impl Into<ActionSelector>) -> bool {
        self.core
            .actions
            .lock()
            .expect("action registry lock poisoned")
            .resolve(&selector.into())
            .is_some()
    }

    pub fn register_middleware(
        &self,
        middleware: impl Middleware<T> + 'static,
        placement: MiddlewarePlacement,
        settings: Option<Value>,
    ) -> MiddlewareHandle {
        self.core
            .middlewares
            .lock()
            .expect("middleware registry lock poisoned")
            .register(Arc::new(middleware), placement, settings)
    }

    pub fn unregister_middleware(&self, handle: MiddlewareHandle) {
        self.core
            .middlewares
            .lock()
            .expect("middleware registry lock poisoned")
            .unregister(handle);
    }

    pub fn is_middleware_registered(&self, handle: MiddlewareHandle) -> bool {
        self.core
            .middlewares
            .lock()
            .expect("middleware registry lock poisoned")
            .is_registered(handle)
    }

    /// Subscribe to the state stream. The receiver immediately holds
    /// the current value and sees every subsequent publish.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<T>> {
        self.core.state_tx.subscribe()
    }

    /// Snapshot of the last published state.
    pub fn current_state(&self) -> StoreState<T> {
        self.core.state_tx.borrow().clone()
    }

    /// The state the store was constructed with (history-wrapped when
    /// undoable).
    pub fn initial_state(&self) -> StoreState<T> {
        self.core.initial_state.clone()
    }

    /// Subscribe to the mirrored dispatch log (one event per
    /// successful publish).
    pub fn subscribe_dispatches(&self) -> broadcast::Receiver<DispatchEvent<T>> {
        self.core.events_tx.subscribe()
    }

    /// Replace the stream's current value directly, bypassing the
    /// queue, middleware and reducers. A raw reset, not a transition.
    pub fn reset_to_state(&self, state: StoreState<T>) {
        self.core.state_tx.send_replace(state);
    }

    /// Queue one action for application. Resolves once the transition
    /// published, aborted, or failed; aborts resolve successfully.
    pub async fn dispatch(
        &self,
        selector: impl Into<ActionSelector>,
        params: Vec<Value>,
    ) -> Result<(), StoreError> {
        let selector = selector.into();
        let action = self
            .lookup(&selector)
            .ok_or_else(|| StoreError::UnregisteredAction(selector.to_string()))?;
        self.queue
            .enqueue(vec![DispatchAction {
                id: action.id,
                name: action.name,
                reducer: action.reducer,
                params,
            }])
            .await
    }

    /// Start a piped dispatch: all piped actions apply in sequence as
    /// one atomic queue item with a single combined calling-action
    /// name. Resolution failures surface here, before anything is
    /// enqueued.
    pub fn pipe(
        &self,
        selector: impl Into<ActionSelector>,
        params: Vec<Value>,
    ) -> Result<PipedDispatch<'_, T>, StoreError> {
        PipedDispatch {
            store: self,
            actions: Vec::new(),
        }
        .pipe(selector, params)
    }

    /// A cheap cloneable handle for fire-and-forget dispatching, e.g.
    /// from UI callbacks that cannot await.
    pub fn dispatcher(&self) -> Dispatcher<T> {
        Dispatcher {
            store: self.clone(),
        }
    }

    fn lookup(&self, selector: &ActionSelector) -> Option<ActionRegistration<T>> {
        self.core
            .actions
            .lock()
            .expect("action registry lock poisoned")
            .resolve(selector)
            .cloned()
    }
}

/// Builder for a multi-action atomic dispatch.
pub struct PipedDispatch<'a, T> {
    store: &'a Store<T>,
    actions: Vec<DispatchAction<T>>,
}

impl<T> std::fmt::Debug for PipedDispatch<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipedDispatch")
            .field(
                "actions",
                &self.actions.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<'a, T: Clone + Send + Sync + 'static> PipedDispatch<'a, T> {
    /// Append another action to the pipe. Fails immediately when the
    /// target is not registered.
    pub fn pipe(
        mut self,
        selector: impl Into<ActionSelector>,
        params: Vec<Value>,
    ) -> Result<Self, StoreError> {
        let selector = selector.into();
        let action = self
            .store
            .lookup(&selector)
            .ok_or_else(|| StoreError::UnregisteredAction(selector.to_string()))?;
        self.actions.push(DispatchAction {
            id: action.id,
            name: action.name,
            reducer: action.reducer,
            params,
        });
        Ok(self)
    }

    /// Enqueue the pipe as a single queue item and await completion.
    pub async fn dispatch(self) -> Result<(), StoreError> {
        self.store.queue.enqueue(self.actions).await
    }
}

/// Fire-and-forget dispatch handle bound to one store.
///
/// The explicit-dependency replacement for ambient store lookup:
/// helpers that need to dispatch receive a `Dispatcher` instead of
/// reaching for a global container.
pub struct Dispatcher<T> {
    store: Store<T>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Dispatcher<T> {
    /// Dispatch without awaiting completion; failures are logged.
    pub fn dispatch(&self, selector: impl Into<ActionSelector>, params: Vec<Value>) {
        let store = self.store.clone();
        let selector = selector.into();
        tokio::spawn(async move {
            let label = selector.to_string();
            if let Err(e) = store.dispatch(selector, params).await {
                log::error!("dispatcher: failed to dispatch {label}: {e}");
            }
        });
    }
}
