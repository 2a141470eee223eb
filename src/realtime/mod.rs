//! Push subscriptions.
//!
//! ARCHITECTURE
//! ============
//! Every push source (auth-state events, realtime row inserts) is exposed as
//! a [`Subscription<T>`]: a receiver fed by one background task. Closing or
//! dropping the subscription aborts that task, which is the only teardown
//! the caller has to think about.
//!
//! Reconnection belongs to the hosted service; a subscription whose source
//! goes away simply ends (`recv` returns `None`).

pub mod phoenix;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

const SUBSCRIPTION_BUFFER: usize = 64;

/// A stream of events from one topic.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    task: Option<JoinHandle<()>>,
    stop: Option<oneshot::Sender<()>>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Create a subscription with its feeding sender. The caller attaches the
    /// producer task with [`Subscription::with_task`] when there is one.
    #[must_use]
    pub fn channel() -> (mpsc::Sender<T>, Self) {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        (tx, Self { rx, task: None, stop: None })
    }

    /// Attach the producer task so it is aborted on close.
    #[must_use]
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Ask the producer to stop through `stop` instead of aborting it.
    #[must_use]
    pub fn with_stop(mut self, stop: oneshot::Sender<()>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Forward a broadcast receiver. Lagged events are skipped.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn from_broadcast(mut source: broadcast::Receiver<T>) -> Self
    where
        T: Clone,
    {
        let (tx, sub) = Self::channel();
        let task = tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscription lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        sub.with_task(task)
    }

    /// Wait for the next event. `None` once the source has ended or the
    /// subscription was closed.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Stop receiving and tear down the producer.
    pub fn close(&mut self) {
        self.rx.close();
        self.stop_producer();
    }
}

impl<T> Subscription<T> {
    fn stop_producer(&mut self) {
        if let Some(stop) = self.stop.take() {
            if stop.send(()).is_ok() {
                // Detached; it exits after its own cleanup.
                self.task.take();
                return;
            }
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.stop_producer();
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
