use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Mutex, MutexGuard, PoisonError},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};

/// A shared, not yet finished or finished computation
pub type Flight<V> = Shared<BoxFuture<'static, V>>;

/// Runs at most one computation per key
///
/// The first caller for a key starts the computation, everyone else - concurrent or later - awaits
/// the same shared future and receives a clone of its output.
/// Outputs are kept for the lifetime of the cache, failures included.
pub struct SingleFlight<K, V> {
    flights: Mutex<HashMap<K, Flight<V>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Copy,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        SingleFlight {
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the flight for `key`, starting it with `start` if there is none yet
    ///
    /// `start` only creates the future, it is not polled before the returned flight is awaited.
    pub fn run<F, Fut>(&self, key: K, start: F) -> Flight<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        self.lock()
            .entry(key)
            .or_insert_with(|| start().boxed().shared())
            .clone()
    }

    /// Returns true if a flight for `key` was started
    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    /// Returns the output for `key` if its flight already finished
    pub fn peek(&self, key: &K) -> Option<V> {
        self.lock().get(key).and_then(|flight| flight.peek().cloned())
    }

    /// Drops all flights, finished or not
    pub fn clear(&self) {
        let flights = std::mem::take(&mut *self.lock());
        drop(flights);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Flight<V>>> {
        // The map stays consistent even if a holder panicked
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Copy,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use futures::future::join_all;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_execution() {
        let cache = SingleFlight::<u8, u32>::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let flights = (0..5).map(|_| {
            let runs = runs.clone();
            cache.run(1, move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                42
            })
        });
        let results = join_all(flights).await;

        assert_eq!(results, vec![42; 5]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(&1), Some(42));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache = SingleFlight::<u8, &'static str>::new();

        let a = cache.run(1, || async { "a" });
        let b = cache.run(2, || async { "b" });
        assert!(cache.contains(&1));
        assert!(!cache.contains(&3));
        assert!(cache.peek(&1).is_none());

        assert_eq!(a.await, "a");
        assert_eq!(b.await, "b");
        // A finished flight is not started again
        assert_eq!(cache.run(1, || async { "again" }).await, "a");
        assert_eq!(cache.len(), 2);
    }
}
