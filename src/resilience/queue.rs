//! FIFO queue running async jobs one at a time against owned state.
//!
//! A single worker task owns the state and drains an unbounded channel.
//! `enqueue` pushes synchronously, so the position of a job is fixed when
//! `enqueue` is called, not when its future is first polled. A failed job
//! only affects its own result; the worker moves on to the next one.

use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::{mpsc, oneshot};

use crate::blockchain::types::{BluzelleError, BluzelleResult};

type Job<S> = Box<dyn for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, ()> + Send>;

fn into_job<S, F>(f: F) -> Job<S>
where
    F: for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, ()> + Send + 'static,
{
    Box::new(f)
}

/// Handle to a serial worker. Cloning shares the same worker.
pub struct SerialQueue<S> {
    tx: mpsc::UnboundedSender<Job<S>>,
}

impl<S> Clone for SerialQueue<S> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<S: Send + 'static> SerialQueue<S> {
    /// Spawn the worker on the current Tokio runtime.
    ///
    /// The worker stops once every handle has been dropped.
    pub fn spawn(state: S) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job<S>>();

        tokio::spawn(async move {
            let mut state = state;
            while let Some(job) = rx.recv().await {
                job(&mut state).await;
            }
            tracing::debug!("Serial queue worker stopped");
        });

        Self { tx }
    }

    /// Schedule `op` after every job enqueued before it.
    pub fn enqueue<T, F>(&self, op: F) -> impl Future<Output = BluzelleResult<T>> + Send + 'static
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, T> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job = into_job(move |state: &mut S| {
            async move {
                let output = op(state).await;
                // caller may have stopped waiting
                let _ = done_tx.send(output);
            }
            .boxed()
        });
        let accepted = self.tx.send(job).is_ok();

        async move {
            if !accepted {
                return Err(BluzelleError::QueueClosed);
            }
            done_rx.await.map_err(|_| BluzelleError::QueueClosed)
        }
    }

    /// Whether the worker has stopped accepting jobs.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
