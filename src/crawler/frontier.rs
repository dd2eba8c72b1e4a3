//! The crawl frontier: pending work plus the set of URLs already claimed
//!
//! The frontier is shared by every worker of a crawl. It hands out
//! [`WorkLease`]s; while any lease is alive, an empty queue does not mean the
//! crawl is over, because the lease holder may still enqueue children. Only
//! when the queue is empty and no lease is outstanding is the crawl drained,
//! and every waiting worker is released.
//!
//! The visited check and the drained decision are made under the same lock.

use crate::state::WorkItem;
use crate::url::normalize;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<WorkItem>,
    visited: HashSet<String>,
    in_flight: usize,
}

/// Work queue with de-duplication and a depth bound
#[derive(Debug)]
pub struct Frontier {
    max_depth: u32,
    state: Mutex<FrontierState>,
    changed: Notify,
    cancel: CancellationToken,
}

/// A dequeued work item
///
/// Dropping the lease marks the item as finished.
#[derive(Debug)]
pub struct WorkLease<'a> {
    frontier: &'a Frontier,
    item: WorkItem,
}

impl WorkLease<'_> {
    pub fn item(&self) -> &WorkItem {
        &self.item
    }
}

impl Drop for WorkLease<'_> {
    fn drop(&mut self) {
        self.frontier.finish();
    }
}

impl Frontier {
    pub fn new(max_depth: u32, cancel: CancellationToken) -> Self {
        Self {
            max_depth,
            state: Mutex::new(FrontierState::default()),
            changed: Notify::new(),
            cancel,
        }
    }

    /// Adds `item` unless its URL was already claimed or it is too deep
    ///
    /// # Returns
    ///
    /// `true` if this call claimed the URL. Of several concurrent callers with
    /// the same normalized URL, exactly one gets `true`.
    pub fn try_enqueue(&self, item: WorkItem) -> bool {
        if item.depth() > self.max_depth || self.cancel.is_cancelled() {
            return false;
        }

        let key = normalize(item.url()).to_string();
        {
            let mut state = self.lock();
            if !state.visited.insert(key) {
                return false;
            }
            tracing::trace!("Enqueued {} at depth {}", item.url(), item.depth());
            state.queue.push_back(item);
        }

        self.changed.notify_waiters();
        true
    }

    /// Waits for the next work item
    ///
    /// # Returns
    ///
    /// * `Some(lease)` - The next item to process
    /// * `None` - The crawl is drained or cancelled
    pub async fn dequeue(&self) -> Option<WorkLease<'_>> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a concurrent change is not missed
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if self.cancel.is_cancelled() {
                    return None;
                }
                if let Some(item) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(WorkLease {
                        frontier: self,
                        item,
                    });
                }
                if state.in_flight == 0 {
                    return None;
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.cancel.cancelled() => return None,
            }
        }
    }

    /// Number of distinct URLs ever accepted
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Number of items waiting to be dequeued
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    fn finish(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0 && state.queue.is_empty()
        };

        if drained {
            tracing::debug!("Frontier drained");
            self.changed.notify_waiters();
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // The state is consistent after every statement, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
