use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::fetch::LoadError;

type Slot<T> = Option<Result<Arc<T>, LoadError>>;

enum CellState<T> {
    Empty,
    Loading(watch::Receiver<Slot<T>>),
    Ready(Arc<T>),
}

/// One lazily-loaded, session-lifetime cache slot.
///
/// At most one underlying load runs at any time: concurrent callers during
/// an in-flight load all resolve to the same eventual result instead of
/// issuing duplicate fetches. The load runs on a spawned task, so a caller
/// that is cancelled mid-await never tears down the shared request for the
/// others. A failed load resets the slot to empty, which is what makes a
/// later call retry instead of replaying a stale rejection. Entries never
/// expire within a session.
pub struct CoalescedCell<T> {
    state: Arc<Mutex<CellState<T>>>,
}

impl<T: Send + Sync + 'static> CoalescedCell<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CellState::Empty)),
        }
    }

    /// Already-resolved value, if any. Never triggers a load.
    pub fn peek(&self) -> Option<Arc<T>> {
        match &*self.state.lock() {
            CellState::Ready(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Resolve the cached value, running `load` if this is the first call
    /// (or the previous attempt failed).
    pub async fn get_or_load<F>(&self, load: F) -> Result<Arc<T>, LoadError>
    where
        F: Future<Output = Result<T, LoadError>> + Send + 'static,
    {
        let mut rx = {
            let mut state = self.state.lock();
            match &*state {
                CellState::Ready(v) => return Ok(v.clone()),
                CellState::Loading(rx) => rx.clone(),
                CellState::Empty => {
                    let (tx, rx) = watch::channel(None);
                    *state = CellState::Loading(rx.clone());

                    let shared = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let result = load.await.map(Arc::new);
                        {
                            let mut state = shared.lock();
                            *state = match &result {
                                Ok(v) => CellState::Ready(v.clone()),
                                Err(_) => CellState::Empty,
                            };
                        }
                        let _ = tx.send(Some(result));
                    });

                    rx
                }
            }
        };

        loop {
            if let Some(result) = rx.borrow_and_update().clone() {
                return result;
            }
            if rx.changed().await.is_err() {
                // Loader task died without reporting; leave retry possible.
                let mut state = self.state.lock();
                if matches!(&*state, CellState::Loading(_)) {
                    *state = CellState::Empty;
                }
                return Err(LoadError::new("loader task dropped before completion"));
            }
        }
    }
}

impl<T: Send + Sync + 'static> Default for CoalescedCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::CoalescedCell;
    use crate::fetch::LoadError;

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let cell: CoalescedCell<u32> = CoalescedCell::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let load = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42u32)
        };

        let (a, b) = tokio::join!(
            cell.get_or_load(load(calls.clone())),
            cell.get_or_load(load(calls.clone())),
        );

        assert_eq!(*a.expect("a"), 42);
        assert_eq!(*b.expect("b"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_clears_in_flight_state_for_retry() {
        let cell: CoalescedCell<u32> = CoalescedCell::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let load = |calls: Arc<AtomicUsize>| async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LoadError::new("boom"))
            } else {
                Ok(7u32)
            }
        };

        let first = cell.get_or_load(load(calls.clone())).await;
        assert!(first.is_err());
        assert!(cell.peek().is_none());

        let second = cell.get_or_load(load(calls.clone())).await;
        assert_eq!(*second.expect("second"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn peek_returns_resolved_value_without_loading() {
        let cell: CoalescedCell<String> = CoalescedCell::new();
        assert!(cell.peek().is_none());

        cell.get_or_load(async { Ok("hi".to_string()) })
            .await
            .expect("load");

        assert_eq!(cell.peek().as_deref().map(String::as_str), Some("hi"));
    }

    #[tokio::test]
    async fn resolved_value_is_served_without_reloading() {
        let cell: CoalescedCell<u32> = CoalescedCell::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let v = cell
                .get_or_load(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1u32)
                })
                .await
                .expect("load");
            assert_eq!(*v, 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
