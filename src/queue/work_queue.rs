//! Shared work queue for the worker pools
//!
//! Every item is handed to at most one worker. Claimed items are tracked until
//! their [`Claim`] is dropped, which lets [`WorkQueue::join`] wait for all work
//! to be finished rather than merely handed out.

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// A FIFO of pending work items shared between workers
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    /// Items queued or claimed but not yet marked done
    pending: AtomicUsize,
    idle: Notify,
}

impl<T> WorkQueue<T> {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    /// Appends an item to the back of the queue
    pub fn push(&self, item: T) {
        let mut items = self.lock();
        self.pending.fetch_add(1, Ordering::SeqCst);
        items.push_back(item);
    }

    /// Removes the front item and hands it to the caller exclusively
    ///
    /// Returns None when nothing is left to claim. The claim counts as pending
    /// until it is dropped.
    pub fn claim(self: &Arc<Self>) -> Option<Claim<T>> {
        let item = self.lock().pop_front()?;
        Some(Claim {
            queue: Arc::clone(self),
            item,
        })
    }

    /// Number of unclaimed items
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if there is nothing left to claim
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of items queued or in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Removes every unclaimed item, leaving in-flight claims untouched
    pub fn drain(&self) -> Vec<T> {
        let drained: Vec<T> = self.lock().drain(..).collect();
        if !drained.is_empty() {
            self.complete(drained.len());
        }
        drained
    }

    /// Waits until every item pushed so far has been claimed and finished
    pub async fn join(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn complete(&self, count: usize) {
        if self.pending.fetch_sub(count, Ordering::SeqCst) == count {
            self.idle.notify_waiters();
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for WorkQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: VecDeque<T> = iter.into_iter().collect();
        Self {
            pending: AtomicUsize::new(items.len()),
            items: Mutex::new(items),
            idle: Notify::new(),
        }
    }
}

/// An item claimed from a [`WorkQueue`]
///
/// Dropping the claim marks the item done, including when the worker bails
/// out early or panics.
#[derive(Debug)]
pub struct Claim<T> {
    queue: Arc<WorkQueue<T>>,
    item: T,
}

impl<T> Deref for Claim<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T> Drop for Claim<T> {
    fn drop(&mut self) {
        self.queue.complete(1);
    }
}
