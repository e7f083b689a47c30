//! Sequence-guarded asynchronous resource.
//!
//! A [`Resource`] owns the state of one asynchronous fetch: pending,
//! resolved, or errored. It re-runs its producer when the dependency value
//! changes or when a refetch was requested, and publishes every committed
//! state on a `tokio::sync::watch` channel.
//!
//! # Ordering
//!
//! Each invocation takes a sequence number when it **starts**. When it
//! finishes, its result is committed only if no other invocation has started
//! since. An earlier invocation that resolves after a later one is dropped:
//! the visible state always belongs to the last-started invocation, whatever
//! the completion order. Nothing is cancelled on the network side; stale
//! results are simply discarded at commit time.
//!
//! ```rust,no_run
//! use activetigger_client::resource::{Outcome, Resource};
//!
//! # async fn example() {
//! let projects: Resource<String, Vec<String>> = Resource::new();
//! let outcome = projects
//!     .sync("ada".to_string(), |_user| async { Ok(vec!["tweets".to_string()]) })
//!     .await;
//! assert_eq!(outcome, Outcome::Committed);
//! assert_eq!(projects.value(), Some(vec!["tweets".to_string()]));
//! # }
//! ```

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

use crate::error::ApiError;

/// Visible state of a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState<T> {
    Pending,
    Resolved(T),
    Errored(ApiError),
}

/// What happened to one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result became the visible state.
    Committed,
    /// A later invocation started first; the result was discarded.
    Stale,
    /// Dependencies were unchanged and no refetch was requested; the
    /// producer did not run.
    Unchanged,
}

struct Tracking<D> {
    deps: Option<D>,
    started: u64,
    settled: u64,
    trigger: bool,
    trigger_seen: bool,
}

pub struct Resource<D, T> {
    tracking: Mutex<Tracking<D>>,
    state: watch::Sender<ResourceState<T>>,
}

impl<D, T> Default for Resource<D, T>
where
    D: Clone + PartialEq,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D, T> Resource<D, T>
where
    D: Clone + PartialEq,
    T: Clone,
{
    pub fn new() -> Self {
        let (state, _) = watch::channel(ResourceState::Pending);
        Self {
            tracking: Mutex::new(Tracking {
                deps: None,
                started: 0,
                settled: 0,
                trigger: false,
                trigger_seen: false,
            }),
            state,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tracking<D>> {
        self.tracking.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `producer` unconditionally.
    pub async fn load<F, Fut>(&self, producer: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let ticket = {
            let mut tracking = self.lock();
            tracking.started += 1;
            tracking.started
        };
        let result = producer().await;
        self.commit(ticket, result)
    }

    /// Runs `producer` on the first call, when `deps` differs from the
    /// dependencies of the last started invocation, or after
    /// [`refetch`](Resource::refetch).
    pub async fn sync<F, Fut>(&self, deps: D, producer: F) -> Outcome
    where
        F: FnOnce(D) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let ticket = {
            let mut tracking = self.lock();
            let changed = tracking.deps.as_ref() != Some(&deps);
            let forced = tracking.trigger != tracking.trigger_seen;
            if !changed && !forced {
                return Outcome::Unchanged;
            }
            tracking.deps = Some(deps.clone());
            tracking.trigger_seen = tracking.trigger;
            tracking.started += 1;
            tracking.started
        };
        let result = producer(deps).await;
        self.commit(ticket, result)
    }

    /// Toggles the fetch trigger so the next [`sync`](Resource::sync) runs
    /// even with unchanged dependencies.
    pub fn refetch(&self) {
        let mut tracking = self.lock();
        tracking.trigger = !tracking.trigger;
    }

    fn commit(&self, ticket: u64, result: Result<T, ApiError>) -> Outcome {
        let mut tracking = self.lock();
        if tracking.started != ticket {
            tracing::debug!(ticket, latest = tracking.started, "discarding stale result");
            return Outcome::Stale;
        }
        tracking.settled = ticket;
        let next = match result {
            Ok(value) => ResourceState::Resolved(value),
            Err(err) => ResourceState::Errored(err),
        };
        self.state.send_replace(next);
        Outcome::Committed
    }

    pub fn state(&self) -> ResourceState<T> {
        self.state.borrow().clone()
    }

    /// The resolved value, or `None` while pending or after an error.
    pub fn value(&self) -> Option<T> {
        match &*self.state.borrow() {
            ResourceState::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<ApiError> {
        match &*self.state.borrow() {
            ResourceState::Errored(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// An invocation has started and the latest one has not settled yet.
    pub fn is_loading(&self) -> bool {
        let tracking = self.lock();
        tracking.started > tracking.settled
    }

    /// Receiver notified on every committed state.
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn last_started_wins_when_it_finishes_first() {
        let res: Resource<u32, &'static str> = Resource::new();
        let (tx_first, rx_first) = oneshot::channel::<&'static str>();
        let (tx_second, rx_second) = oneshot::channel::<&'static str>();

        let first = res.sync(1, |_| async move { Ok(rx_first.await.unwrap()) });
        let second = res.sync(2, |_| async move { Ok(rx_second.await.unwrap()) });
        let driver = async move {
            tx_second.send("second").unwrap();
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            tx_first.send("first").unwrap();
        };

        let (a, b, ()) = tokio::join!(first, second, driver);
        assert_eq!(a, Outcome::Stale);
        assert_eq!(b, Outcome::Committed);
        assert_eq!(res.value(), Some("second"));
        assert!(!res.is_loading());
    }

    #[tokio::test]
    async fn last_started_wins_when_it_finishes_last() {
        let res: Resource<u32, &'static str> = Resource::new();
        let (tx_first, rx_first) = oneshot::channel::<&'static str>();
        let (tx_second, rx_second) = oneshot::channel::<&'static str>();

        let first = res.sync(1, |_| async move { Ok(rx_first.await.unwrap()) });
        let second = res.sync(2, |_| async move { Ok(rx_second.await.unwrap()) });
        let driver = async move {
            tx_first.send("first").unwrap();
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            tx_second.send("second").unwrap();
        };

        let (a, b, ()) = tokio::join!(first, second, driver);
        // join! polls `second` before the driver runs, so it has started by
        // the time `first` resolves.
        assert_eq!(a, Outcome::Stale);
        assert_eq!(b, Outcome::Committed);
        assert_eq!(res.value(), Some("second"));
    }

    #[tokio::test]
    async fn unchanged_deps_skip_the_producer() {
        let res: Resource<String, u32> = Resource::new();
        let mut calls = 0;

        assert_eq!(
            res.sync("p1".to_string(), |_| {
                calls += 1;
                async { Ok(1) }
            })
            .await,
            Outcome::Committed
        );
        assert_eq!(
            res.sync("p1".to_string(), |_| {
                calls += 1;
                async { Ok(2) }
            })
            .await,
            Outcome::Unchanged
        );
        assert_eq!(calls, 1);
        assert_eq!(res.value(), Some(1));
    }

    #[tokio::test]
    async fn refetch_forces_a_rerun() {
        let res: Resource<String, u32> = Resource::new();
        res.sync("p1".to_string(), |_| async { Ok(1) }).await;
        res.refetch();
        let outcome = res.sync("p1".to_string(), |_| async { Ok(2) }).await;
        assert_eq!(outcome, Outcome::Committed);
        assert_eq!(res.value(), Some(2));

        // The trigger is consumed.
        let outcome = res.sync("p1".to_string(), |_| async { Ok(3) }).await;
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[tokio::test]
    async fn errors_collapse_value_to_none() {
        let res: Resource<(), u32> = Resource::new();
        assert_eq!(res.state(), ResourceState::Pending);
        res.load(|| async { Err(ApiError::Network("refused".to_string())) })
            .await;
        assert_eq!(res.value(), None);
        assert_eq!(res.error(), Some(ApiError::Network("refused".to_string())));
    }

    #[tokio::test]
    async fn subscribers_see_commits() {
        let res: Resource<(), u32> = Resource::new();
        let mut rx = res.subscribe();
        res.load(|| async { Ok(7) }).await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ResourceState::Resolved(7));
    }
}
