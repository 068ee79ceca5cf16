//! De-duplicating, rate-limited work queue.
//!
//! Semantics:
//!
//! - A key waiting in the queue is never queued twice.
//! - A key being processed is never handed to a second worker. Adding it
//!   while it is processed marks it dirty, and [`WorkQueue::done`] puts it
//!   back.
//! - Failed keys come back after an exponential, capped delay.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::trace;

/// Exponential backoff curve for failed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    #[must_use]
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay after `failures` consecutive failures.
    ///
    /// `min(base * 2^(failures - 1), max)`; zero failures yields zero.
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        let Some(exponent) = failures.checked_sub(1) else {
            return Duration::ZERO;
        };
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(5), Duration::from_secs(30))
    }
}

struct State<K> {
    queue: VecDeque<K>,
    dirty: HashSet<K>,
    processing: HashSet<K>,
    failures: HashMap<K, u32>,
    shutting_down: bool,
}

impl<K> Default for State<K> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            dirty: HashSet::new(),
            processing: HashSet::new(),
            failures: HashMap::new(),
            shutting_down: false,
        }
    }
}

struct Inner<K> {
    state: Mutex<State<K>>,
    notify: Notify,
    backoff: Backoff,
}

/// Work queue shared by a controller's workers. Cloning is cheap.
pub struct WorkQueue<K> {
    inner: Arc<Inner<K>>,
}

impl<K> Clone for WorkQueue<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Default for WorkQueue<K>
where
    K: Clone + Eq + Hash + std::fmt::Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + std::fmt::Debug + Send + Sync + 'static,
{
    /// Create an empty queue.
    #[must_use]
    pub fn new(backoff: Backoff) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                notify: Notify::new(),
                backoff,
            }),
        }
    }

    /// Queue `key`, unless it is already waiting.
    pub async fn add(&self, key: K) {
        let mut state = self.inner.state.lock().await;
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            trace!(?key, "Key in flight, deferring");
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Wait for the next key. Returns `None` once the queue is shut down.
    ///
    /// The caller must hand the key back with [`WorkQueue::done`].
    pub async fn get(&self) -> Option<K> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.inner.state.lock().await;
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    if !state.queue.is_empty() {
                        self.inner.notify.notify_one();
                    }
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Mark `key` as no longer processed, re-queueing it if it was added
    /// in the meantime.
    pub async fn done(&self, key: &K) {
        let mut state = self.inner.state.lock().await;
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.clone());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Queue `key` once `delay` has passed.
    pub async fn add_after(&self, key: K, delay: Duration) {
        if delay.is_zero() {
            self.add(key).await;
            return;
        }
        if self.is_shut_down().await {
            return;
        }
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key).await;
        });
    }

    /// Record a failure for `key` and queue it after its backoff delay.
    pub async fn add_rate_limited(&self, key: K) {
        let delay = {
            let mut state = self.inner.state.lock().await;
            let failures = state.failures.entry(key.clone()).or_insert(0);
            *failures = failures.saturating_add(1);
            self.inner.backoff.delay(*failures)
        };
        trace!(?key, ?delay, "Backing off");
        self.add_after(key, delay).await;
    }

    /// Clear the failure history of `key`.
    pub async fn forget(&self, key: &K) {
        self.inner.state.lock().await.failures.remove(key);
    }

    /// Consecutive failures recorded for `key`.
    pub async fn failures(&self, key: &K) -> u32 {
        self.inner
            .state
            .lock()
            .await
            .failures
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Number of keys waiting to be processed.
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop handing out keys. Waiting workers receive `None`.
    pub async fn shut_down(&self) {
        let mut state = self.inner.state.lock().await;
        state.shutting_down = true;
        state.queue.clear();
        drop(state);
        self.inner.notify.notify_waiters();
    }

    pub async fn is_shut_down(&self) -> bool {
        self.inner.state.lock().await.shutting_down
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn queue() -> WorkQueue<&'static str> {
        WorkQueue::new(Backoff::new(
            Duration::from_millis(10),
            Duration::from_millis(100),
        ))
    }

    #[test]
    fn test_backoff_curve() {
        let backoff = Backoff::new(Duration::from_millis(5), Duration::from_millis(100));
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_millis(5));
        assert_eq!(backoff.delay(2), Duration::from_millis(10));
        assert_eq!(backoff.delay(4), Duration::from_millis(40));
        assert_eq!(backoff.delay(6), Duration::from_millis(100));
        assert_eq!(backoff.delay(200), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_pending_keys_are_deduplicated() {
        let queue = queue();
        queue.add("a").await;
        queue.add("b").await;
        queue.add("a").await;

        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.get().await, Some("a"));
        assert_eq!(queue.get().await, Some("b"));
    }

    #[tokio::test]
    async fn test_key_in_flight_is_not_handed_out_twice() {
        let queue = queue();
        queue.add("a").await;
        let key = queue.get().await.unwrap();

        queue.add("a").await;
        assert!(queue.is_empty().await);

        queue.done(&key).await;
        assert_eq!(queue.len().await, 1);
        assert_eq!(queue.get().await, Some("a"));
    }

    #[tokio::test]
    async fn test_done_without_new_add_does_not_requeue() {
        let queue = queue();
        queue.add("a").await;
        let key = queue.get().await.unwrap();
        queue.done(&key).await;
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiting_workers() {
        let queue = queue();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;

        queue.shut_down().await;
        assert_eq!(waiter.await.unwrap(), None);

        queue.add("late").await;
        assert_eq!(queue.get().await, None);
    }

    #[tokio::test]
    async fn test_waiting_worker_receives_new_key() {
        let queue = queue();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;

        queue.add("a").await;
        assert_eq!(waiter.await.unwrap(), Some("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_keys_back_off() {
        let queue = queue();
        queue.add_rate_limited("a").await;
        queue.add_rate_limited("a").await;
        assert_eq!(queue.failures(&"a").await, 2);
        assert!(queue.is_empty().await);

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(queue.get().await, Some("a"));

        queue.forget(&"a").await;
        assert_eq!(queue.failures(&"a").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_after_waits_for_delay() {
        let queue = queue();
        queue.add_after("a", Duration::from_millis(50)).await;

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(queue.is_empty().await);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(queue.len().await, 1);
    }
}
