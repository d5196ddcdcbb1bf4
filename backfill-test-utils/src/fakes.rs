//! In-memory fakes of the remote source and cache capabilities.
//!
//! These are plain implementations of the capability traits that record how
//! they were called and can be told to fail, so tests check the lookup's real
//! control flow instead of stubbing it.

use async_trait::async_trait;
use backfill_core::{Cache, CacheError, CachedValue, RemoteError, RemoteSource, Timestamp};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

use crate::FAKE_REMOTE_NAME;

type Respond<K, V> = dyn Fn(&K, u64) -> Result<V, RemoteError> + Send + Sync;

// ============================================================================
// FAKE REMOTE SOURCE
// ============================================================================

/// Fake remote source driven by a response function.
///
/// The function receives the key and the zero-based index of the call.
pub struct FakeRemoteSource<K, V> {
    respond: Box<Respond<K, V>>,
    calls: AtomicU64,
    fetched_keys: Mutex<Vec<K>>,
    gate: Option<Arc<Barrier>>,
}

impl<K, V> FakeRemoteSource<K, V> {
    pub fn from_fn<F>(respond: F) -> Self
    where
        F: Fn(&K, u64) -> Result<V, RemoteError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicU64::new(0),
            fetched_keys: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Always return `value`.
    pub fn constant(value: V) -> Self
    where
        K: 'static,
        V: Clone + Send + Sync + 'static,
    {
        Self::from_fn(move |_, _| Ok(value.clone()))
    }

    /// Return `values` in order, cycling once exhausted.
    ///
    /// An empty sequence makes every call fail.
    pub fn sequence(values: Vec<V>) -> Self
    where
        K: 'static,
        V: Clone + Send + Sync + 'static,
    {
        Self::from_fn(move |_, call| {
            if values.is_empty() {
                return Err(RemoteError::unavailable(FAKE_REMOTE_NAME, "empty sequence"));
            }
            Ok(values[(call % values.len() as u64) as usize].clone())
        })
    }

    /// Serve values from a map; keys without a value are unavailable.
    pub fn from_map(values: HashMap<K, V>) -> Self
    where
        K: Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Self::from_fn(move |key, _| {
            values.get(key).cloned().ok_or_else(|| {
                RemoteError::unavailable(FAKE_REMOTE_NAME, format!("no value for {:?}", key))
            })
        })
    }

    /// Make every fetch wait on `gate` before responding.
    ///
    /// With a barrier sized to N, N fetches are guaranteed to be in flight at
    /// the same time.
    pub fn with_gate(mut self, gate: Arc<Barrier>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of fetches made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Keys fetched so far, in call order.
    pub fn fetched_keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.fetched_keys
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

#[async_trait]
impl<K, V> RemoteSource<K, V> for FakeRemoteSource<K, V>
where
    K: Clone + Send + Sync,
    V: Send,
{
    async fn fetch(&self, key: &K) -> Result<V, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetched_keys
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(key.clone());

        if let Some(gate) = &self.gate {
            gate.wait().await;
        }

        (self.respond)(key, call)
    }
}

// ============================================================================
// FAKE CACHE
// ============================================================================

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

/// Fake cache backed by a map, with call counters and failure injection.
pub struct FakeCache<K, V> {
    entries: Mutex<HashMap<K, CachedValue<V>>>,
    writes: Mutex<Vec<(K, V)>>,
    get_calls: AtomicU64,
    put_calls: AtomicU64,
    invalidate_calls: AtomicU64,
    read_failure: Mutex<Option<CacheError>>,
    write_failure: Mutex<Option<CacheError>>,
}

impl<K, V> Default for FakeCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            get_calls: AtomicU64::new(0),
            put_calls: AtomicU64::new(0),
            invalidate_calls: AtomicU64::new(0),
            read_failure: Mutex::new(None),
            write_failure: Mutex::new(None),
        }
    }
}

impl<K, V> FakeCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry stamped with the current time. Seeding is not counted
    /// as a write.
    pub fn with_value(self, key: K, value: V) -> Self {
        self.with_entry(key, value, chrono::Utc::now())
    }

    /// Seed an entry with an explicit timestamp.
    pub fn with_entry(self, key: K, value: V, cached_at: Timestamp) -> Self {
        lock(&self.entries).insert(key, CachedValue::new(value, cached_at));
        self
    }

    /// Make every `get` fail.
    pub fn failing_reads(self) -> Self {
        self.set_fail_reads(true);
        self
    }

    /// Make every `get` fail with `error`.
    pub fn failing_reads_with(self, error: CacheError) -> Self {
        *lock(&self.read_failure) = Some(error);
        self
    }

    /// Make every `put` fail.
    pub fn failing_writes(self) -> Self {
        self.set_fail_writes(true);
        self
    }

    /// Make every `put` fail with `error`.
    pub fn failing_writes_with(self, error: CacheError) -> Self {
        *lock(&self.write_failure) = Some(error);
        self
    }

    /// Toggle read failures; enabling injects a generic unavailable error.
    pub fn set_fail_reads(&self, fail: bool) {
        *lock(&self.read_failure) =
            fail.then(|| CacheError::unavailable("injected read failure"));
    }

    /// Toggle write failures; enabling injects a generic unavailable error.
    pub fn set_fail_writes(&self, fail: bool) {
        *lock(&self.write_failure) =
            fail.then(|| CacheError::unavailable("injected write failure"));
    }

    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `put` attempts, failed ones included.
    pub fn put_calls(&self) -> u64 {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn invalidate_calls(&self) -> u64 {
        self.invalidate_calls.load(Ordering::SeqCst)
    }

    /// Successful writes, in order.
    pub fn writes(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.writes
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    /// Read the stored value without counting a `get`.
    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.entries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .get(key)
            .map(|entry| entry.value.clone())
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for FakeCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<CachedValue<V>>, CacheError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.read_failure).clone() {
            return Err(error);
        }
        let entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: K, value: V, cached_at: Timestamp) -> Result<(), CacheError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.write_failure).clone() {
            return Err(error);
        }
        // Hold the entry lock while logging so the write log order matches
        // the order entries were replaced.
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        self.writes
            .lock()
            .map_err(|_| CacheError::LockPoisoned)?
            .push((key.clone(), value.clone()));
        entries.insert(key, CachedValue::new(value, cached_at));
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<bool, CacheError> {
        self.invalidate_calls.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries.remove(key).is_some())
    }
}
