//! Per-key single-flight.
//!
//! At most one computation runs per [`CacheKey`] at a time. Callers that
//! arrive while it is running await the same result instead of starting
//! their own. Results are not retained once the flight lands.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::cache::CacheKey;

/// Whether the caller ran the computation or joined one already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    Leader,
    Follower,
}

pub struct InFlight<V> {
    flights: Mutex<HashMap<CacheKey, Arc<OnceCell<V>>>>,
}

impl<V> Default for InFlight<V> {
    fn default() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> InFlight<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `compute` for `key` unless a flight for `key` is already running,
    /// in which case wait for that flight's value.
    ///
    /// If the leader is cancelled mid-flight, one of the waiters takes over.
    pub async fn run<F, Fut>(&self, key: CacheKey, compute: F) -> (V, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut flights = self.flights.lock().await;
            Arc::clone(
                flights
                    .entry(key)
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let mut role = FlightRole::Follower;
        let value = cell
            .get_or_init(|| {
                role = FlightRole::Leader;
                compute()
            })
            .await
            .clone();

        let mut flights = self.flights.lock().await;
        if flights
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &cell))
        {
            flights.remove(&key);
        }

        (value, role)
    }

    /// Number of keys with a flight currently registered.
    pub async fn pending(&self) -> usize {
        self.flights.lock().await.len()
    }
}
