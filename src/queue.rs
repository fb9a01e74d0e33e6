//! Shared, finite work queue
//!
//! A producer task feeds units of work into a bounded channel and closes it
//! after the last unit. Workers claim units through a shared receiver, so
//! each unit is handed to exactly one worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Multi-consumer view over a closed-after-fill channel
#[derive(Debug)]
pub struct WorkQueue<T> {
    receiver: Arc<Mutex<mpsc::Receiver<T>>>,
    claimed: Arc<AtomicUsize>,
    total: usize,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: Arc::clone(&self.receiver),
            claimed: Arc::clone(&self.claimed),
            total: self.total,
        }
    }
}

impl<T: Send + 'static> WorkQueue<T> {
    /// Spawn a producer that enqueues `units` and then closes the queue
    pub fn spawn<I>(units: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator + Send + 'static,
    {
        let units = units.into_iter();
        let total = units.len();
        let (tx, rx) = mpsc::channel(capacity.max(1));

        tokio::spawn(async move {
            for unit in units {
                if tx.send(unit).await.is_err() {
                    // every worker is gone
                    break;
                }
            }
        });

        Self {
            receiver: Arc::new(Mutex::new(rx)),
            claimed: Arc::new(AtomicUsize::new(0)),
            total,
        }
    }

    /// Claim the next unit; `None` once the queue is drained and closed
    pub async fn next(&self) -> Option<T> {
        let unit = self.receiver.lock().await.recv().await;
        if unit.is_some() {
            self.claimed.fetch_add(1, Ordering::Relaxed);
        }
        unit
    }

    /// Number of units enqueued
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of units claimed so far
    pub fn claimed(&self) -> usize {
        self.claimed.load(Ordering::Relaxed)
    }
}
