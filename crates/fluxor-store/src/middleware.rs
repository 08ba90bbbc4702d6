//! Two-phase middleware pipeline.
//!
//! Middleware intercepts a dispatch either before the reducer chain
//! (over the last published state) or after it (over the chain's
//! result). The chain is an ordered fold with an explicit outcome per
//! step, so early exit and the error-vs-abort distinction never rely on
//! panics or sentinel values:
//!
//! ```text
//! Before chain → reducers → After chain → publish
//! ```
//!
//! Each step yields [`MiddlewareOutcome::Continue`] with a replacement
//! state, [`MiddlewareOutcome::Unchanged`] to carry the accumulator
//! forward, or [`MiddlewareOutcome::Abort`] to veto the whole dispatch.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use strum::Display;

use crate::action::CallingAction;
use crate::errors::StoreError;
use crate::perf::Performance;
use crate::state::StoreState;

/// BoxFuture type alias for async middleware and reducer handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where in the dispatch a middleware runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MiddlewarePlacement {
    /// Before the reducer chain, over the last published state.
    Before,
    /// After the reducer chain, over the candidate state.
    After,
}

/// Result of a single middleware invocation.
pub enum MiddlewareOutcome<T> {
    /// Replace the accumulated state for the remaining steps.
    Continue(StoreState<T>),
    /// Keep the accumulated state as-is.
    Unchanged,
    /// Veto the dispatch: nothing is published, the caller's dispatch
    /// still resolves successfully.
    Abort,
}

/// An interceptor around the reducer chain.
///
/// Implementations receive the accumulated candidate state, the latest
/// published state, their own registration settings and a descriptor of
/// the calling action. They run strictly in registration order, one at
/// a time.
pub trait Middleware<T>: Send + Sync {
    /// Name used in log output and timing markers.
    fn name(&self) -> &str;

    fn invoke<'a>(
        &'a self,
        state: StoreState<T>,
        published: &'a StoreState<T>,
        settings: Option<&'a Value>,
        action: &'a CallingAction,
    ) -> BoxFuture<'a, anyhow::Result<MiddlewareOutcome<T>>>;
}

/// Opaque handle identifying one middleware registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiddlewareHandle(pub(crate) u64);

pub(crate) struct MiddlewareRegistration<T> {
    pub id: MiddlewareHandle,
    pub middleware: Arc<dyn Middleware<T>>,
    pub placement: MiddlewarePlacement,
    pub settings: Option<Value>,
}

impl<T> Clone for MiddlewareRegistration<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            middleware: Arc::clone(&self.middleware),
            placement: self.placement,
            settings: self.settings.clone(),
        }
    }
}

/// Registration-ordered list of middleware records.
pub(crate) struct MiddlewareRegistry<T> {
    entries: Vec<MiddlewareRegistration<T>>,
    next_id: u64,
}

impl<T> MiddlewareRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub fn register(
        &mut self,
        middleware: Arc<dyn Middleware<T>>,
        placement: MiddlewarePlacement,
        settings: Option<Value>,
    ) -> MiddlewareHandle {
        let id = MiddlewareHandle(self.next_id);
        self.next_id += 1;
        self.entries.push(MiddlewareRegistration {
            id,
            middleware,
            placement,
            settings,
        });
        id
    }

    pub fn unregister(&mut self, handle: MiddlewareHandle) {
        self.entries.retain(|e| e.id != handle);
    }

    pub fn is_registered(&self, handle: MiddlewareHandle) -> bool {
        self.entries.iter().any(|e| e.id == handle)
    }

    /// Snapshot of the chain, taken before the dispatch suspends so the
    /// registry lock is never held across an await point.
    pub fn snapshot(&self) -> Vec<MiddlewareRegistration<T>> {
        self.entries.clone()
    }
}

/// Outcome of a whole pipeline run.
pub(crate) enum PipelineResult<T> {
    Continue(StoreState<T>),
    Abort,
}

/// Fold the chain entries matching `placement` over `state`.
///
/// A failing middleware is logged and skipped (the accumulator carries
/// forward) unless `propagate_error` is set, in which case the error
/// surfaces to the dispatch caller. A timing marker is recorded per
/// middleware regardless of its outcome.
pub(crate) async fn run_pipeline<T: Clone + Send + Sync>(
    chain: &[MiddlewareRegistration<T>],
    placement: MiddlewarePlacement,
    mut state: StoreState<T>,
    published: &StoreState<T>,
    action: &CallingAction,
    propagate_error: bool,
    performance: &dyn Performance,
) -> Result<PipelineResult<T>, StoreError> {
    for entry in chain.iter().filter(|e| e.placement == placement) {
        let result = entry
            .middleware
            .invoke(state.clone(), published, entry.settings.as_ref(), action)
            .await;
        performance.mark(&format!(
            "dispatch-{placement}-{}",
            entry.middleware.name()
        ));

        match result {
            Ok(MiddlewareOutcome::Continue(next)) => state = next,
            Ok(MiddlewareOutcome::Unchanged) => {}
            Ok(MiddlewareOutcome::Abort) => return Ok(PipelineResult::Abort),
            Err(e) => {
                if propagate_error {
                    return Err(StoreError::Middleware {
                        middleware: entry.middleware.name().to_string(),
                        source: e,
                    });
                }
                log::warn!(
                    "middleware {} failed, carrying previous state forward: {e:#}",
                    entry.middleware.name()
                );
            }
        }
    }
    Ok(PipelineResult::Continue(state))
}
