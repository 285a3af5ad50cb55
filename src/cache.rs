//! Read-through cache with time-to-live expiry
//!
//! `TtlCache` memoizes an expensive, fallible per-key lookup. Entries carry
//! their insertion time and a background thread sweeps out entries older
//! than the configured TTL.
//!
//! The loader runs while the map lock is held. A slow loader for one key
//! therefore blocks every other `get`/`set` and the sweep until it returns,
//! but a missing key is never loaded twice by racing callers.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often the sweep thread looks for expired entries
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(250);

type Loader<K, V, E> = Box<dyn Fn(&K) -> Result<V, E> + Send + Sync>;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match ttl {
            Some(ttl) => now.saturating_duration_since(self.inserted_at) > ttl,
            None => false,
        }
    }
}

/// State shared between the cache handle and its sweep thread
struct Shared<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Option<Duration>,
}

impl<K, V> Shared<K, V> {
    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        // A panicking loader must not take the whole cache down with it
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sweep_expired(&self, now: Instant) -> usize {
        if self.ttl.is_none() {
            return 0;
        }

        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
        before - entries.len()
    }
}

struct Sweeper {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct TtlCache<K, V, E> {
    shared: Arc<Shared<K, V>>,
    loader: Loader<K, V, E>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<K, V, E> TtlCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Create a cache and start its sweep thread.
    ///
    /// With `ttl = None` entries never expire.
    pub fn new<F>(ttl: Option<Duration>, loader: F) -> Self
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        Self::with_sweep_interval(ttl, DEFAULT_SWEEP_INTERVAL, loader)
    }

    pub fn with_sweep_interval<F>(ttl: Option<Duration>, interval: Duration, loader: F) -> Self
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            entries: Mutex::new(HashMap::new()),
            ttl,
        });
        let sweeper = start_sweep_thread(Arc::clone(&shared), interval);

        Self {
            shared,
            loader: Box::new(loader),
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Return the cached value for `key`, loading and storing it on a miss.
    ///
    /// Loader errors are returned as-is and leave no entry behind.
    pub fn get(&self, key: &K) -> Result<V, E> {
        let mut entries = self.shared.lock();

        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(self.shared.ttl, Instant::now()) {
                return Ok(entry.value.clone());
            }
        }

        let value = (self.loader)(key)?;
        entries.insert(key.clone(), CacheEntry::new(value.clone()));
        Ok(value)
    }

    /// Store `value` under `key` with a fresh timestamp, replacing any entry
    pub fn set(&self, key: K, value: V) {
        self.shared.lock().insert(key, CacheEntry::new(value));
    }

    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }
}

impl<K, V, E> TtlCache<K, V, E> {
    /// Stop the sweep thread and drop every entry.
    ///
    /// Blocks until an in-flight sweep cycle has finished. Calling it again
    /// is a no-op.
    pub fn shutdown(&self) {
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(sweeper) = sweeper {
            // The thread may already be gone if it panicked; either way join it
            let _ = sweeper.stop.send(());
            if sweeper.handle.join().is_err() {
                log::warn!("TTL cache sweep thread panicked");
            }
        }

        self.shared.lock().clear();
    }
}

impl<K, V, E> Drop for TtlCache<K, V, E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn start_sweep_thread<K, V>(shared: Arc<Shared<K, V>>, interval: Duration) -> Sweeper
where
    K: Send + 'static,
    V: Send + 'static,
{
    let (stop, stop_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        log::debug!("TTL cache sweep thread started");

        loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let removed = shared.sweep_expired(Instant::now());
                    if removed > 0 {
                        log::trace!("TTL cache evicted {} expired entries", removed);
                    }
                }
                // Stop requested, or the cache handle is gone
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        log::debug!("TTL cache sweep thread stopped");
    });

    Sweeper { stop, handle }
}
