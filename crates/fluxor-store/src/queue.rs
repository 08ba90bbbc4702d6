//! Serialized dispatch queue.
//!
//! All dispatches funnel through an unbounded channel drained by a
//! single worker task, so at most one state transition is ever in
//! flight per store and items apply strictly in enqueue order. Each
//! item resolves its caller through a oneshot before the next item
//! starts; a failing item rejects only its own caller and the worker
//! keeps draining.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::action::DispatchAction;
use crate::errors::StoreError;
use crate::store::StoreCore;

pub(crate) struct QueueItem<T> {
    pub actions: Vec<DispatchAction<T>>,
    pub done: oneshot::Sender<Result<(), StoreError>>,
}

/// Sending half of the queue. Cheap to clone; the worker stops once
/// every sender is dropped.
pub(crate) struct DispatchQueue<T> {
    tx: mpsc::UnboundedSender<QueueItem<T>>,
}

impl<T> Clone for DispatchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> DispatchQueue<T> {
    /// Spawn the worker task draining items against `core`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(core: Arc<StoreCore<T>>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueueItem<T>>();
        tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                let result = core.run_dispatch(item.actions).await;
                // The caller may have dropped its future; the queue
                // drains regardless.
                let _ = item.done.send(result);
            }
            log::debug!("dispatch queue closed, worker stopping");
        });
        Self { tx }
    }

    /// Enqueue one atomic unit of actions and await its completion.
    pub async fn enqueue(&self, actions: Vec<DispatchAction<T>>) -> Result<(), StoreError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(QueueItem {
                actions,
                done: done_tx,
            })
            .map_err(|_| StoreError::QueueClosed)?;
        done_rx.await.map_err(|_| StoreError::QueueClosed)?
    }
}
