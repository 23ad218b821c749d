//! Redis-backed provider with server-side LRU.
//!
//! Redis has no bounded-LRU primitive for a subset of keys, so one is built
//! from a hash and a sorted set driven by atomic scripts (see [`backend`]).
//! Recency follows client clocks: clients with skewed clocks sharing one
//! database may order touches slightly out of wall-clock order.

mod backend;

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;

pub use backend::{
    LruBackend, RedisBackend, CONNECT_TIMEOUT, DATA_KEY, KEY_PREFIX, LRU_KEY, OPERATION_TIMEOUT,
};

use crate::cache::{Cache, CacheLogger, EvictionListener};
use crate::config::ProviderConfig;
use crate::error::Result;

/// Registry name of the Redis provider.
pub const REDIS_PROVIDER: &str = "redis";

// == Redis Cache ==
/// LRU-with-TTL cache stored in Redis.
///
/// Operations never fail from the caller's point of view: a backend error is
/// logged and answered with a miss, `false` or `0`. Eviction listeners get
/// the evicted key with no value.
pub struct RedisCache<B = RedisBackend> {
    backend: B,
    capacity: usize,
    ttl_ms: u64,
    on_evict: Option<Arc<dyn EvictionListener>>,
    logger: Arc<dyn CacheLogger>,
}

impl RedisCache {
    /// Registry constructor. Connects eagerly.
    pub fn construct(config: ProviderConfig) -> Result<Arc<dyn Cache>> {
        config.validate()?;
        let backend = RedisBackend::connect(&config.redis)?;
        Ok(Arc::new(Self::with_backend(backend, config)))
    }
}

impl<B: LruBackend> RedisCache<B> {
    /// Builds the provider over an already connected backend.
    pub fn with_backend(backend: B, config: ProviderConfig) -> Self {
        let ttl_ms = if config.ttl.is_zero() {
            0
        } else {
            (config.ttl.as_millis() as u64).max(1)
        };
        Self {
            backend,
            capacity: config.capacity,
            ttl_ms,
            on_evict: config.on_evict,
            logger: config.logger,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn report(&self, operation: &'static str, key: Option<&str>, err: &(dyn Error + 'static)) {
        self.logger.operation_failed(operation, key, err);
    }
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

impl<B: LruBackend> Cache for RedisCache<B> {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.read_and_touch(now_micros(), key) {
            Ok(value) => value,
            Err(err) => {
                self.report("get", Some(key), &err);
                None
            }
        }
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        let evicted = match self.backend.write_and_evict(
            &value,
            now_micros(),
            key,
            self.capacity,
            self.ttl_ms,
        ) {
            Ok(evicted) => evicted,
            Err(err) => {
                self.report("set", Some(key), &err);
                return;
            }
        };

        if let Some(listener) = &self.on_evict {
            for member in &evicted {
                listener.on_evict(member, None);
            }
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.backend.exists(key).unwrap_or_else(|err| {
            self.report("contains", Some(key), &err);
            false
        })
    }

    fn len(&self) -> usize {
        self.backend.count().unwrap_or_else(|err| {
            self.report("len", None, &err);
            0
        })
    }

    fn close(&self) -> Result<()> {
        self.backend.close();
        Ok(())
    }
}

impl<B: fmt::Debug> fmt::Debug for RedisCache<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("backend", &self.backend)
            .field("capacity", &self.capacity)
            .field("ttl_ms", &self.ttl_ms)
            .field("has_listener", &self.on_evict.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use parking_lot::Mutex;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    // == Script Double ==
    /// In-memory stand-in honouring the script contract. Score ties break by
    /// submission order.
    #[derive(Default)]
    struct ScriptDouble {
        state: Mutex<DoubleState>,
        failing: AtomicBool,
        closed: AtomicBool,
    }

    #[derive(Default)]
    struct DoubleState {
        data: HashMap<String, (Vec<u8>, Option<Instant>)>,
        scores: HashMap<String, (i64, u64)>,
        index: BTreeSet<((i64, u64), String)>,
        seq: u64,
    }

    impl DoubleState {
        fn live(&self, member: &str) -> Option<&Vec<u8>> {
            match self.data.get(member) {
                Some((value, Some(deadline))) if Instant::now() < *deadline => Some(value),
                Some((value, None)) => Some(value),
                _ => None,
            }
        }

        fn score(&mut self, member: &str, now: i64) {
            self.seq += 1;
            let score = (now, self.seq);
            if let Some(old) = self.scores.insert(member.to_string(), score) {
                self.index.remove(&(old, member.to_string()));
            }
            self.index.insert((score, member.to_string()));
        }
    }

    impl ScriptDouble {
        fn check(&self) -> Result<()> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(CacheError::Closed);
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(redis::RedisError::from((redis::ErrorKind::IoError, "connection reset")).into());
            }
            Ok(())
        }

        fn index_len(&self) -> usize {
            self.state.lock().index.len()
        }
    }

    impl LruBackend for ScriptDouble {
        fn read_and_touch(&self, now_micros: i64, member: &str) -> Result<Option<Vec<u8>>> {
            self.check()?;
            let mut state = self.state.lock();
            let value = state.live(member).cloned();
            if value.is_some() {
                state.score(member, now_micros);
            }
            Ok(value)
        }

        fn write_and_evict(
            &self,
            value: &[u8],
            now_micros: i64,
            member: &str,
            capacity: usize,
            ttl_ms: u64,
        ) -> Result<Vec<String>> {
            self.check()?;
            let mut state = self.state.lock();
            let deadline = (ttl_ms > 0).then(|| Instant::now() + Duration::from_millis(ttl_ms));
            state.data.insert(member.to_string(), (value.to_vec(), deadline));
            state.score(member, now_micros);

            let mut evicted = Vec::new();
            while state.index.len() > capacity {
                let Some((_, popped)) = state.index.pop_first() else {
                    break;
                };
                state.scores.remove(&popped);
                state.data.remove(&popped);
                evicted.push(popped);
            }
            Ok(evicted)
        }

        fn exists(&self, member: &str) -> Result<bool> {
            self.check()?;
            Ok(self.state.lock().live(member).is_some())
        }

        fn count(&self) -> Result<usize> {
            self.check()?;
            let state = self.state.lock();
            Ok(state.data.keys().filter(|k| state.live(k).is_some()).count())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        failures: Mutex<Vec<(&'static str, Option<String>)>>,
    }

    impl CacheLogger for RecordingLogger {
        fn operation_failed(&self, operation: &'static str, key: Option<&str>, _err: &(dyn Error + 'static)) {
            self.failures.lock().push((operation, key.map(str::to_string)));
        }
    }

    type Evictions = Arc<Mutex<Vec<(String, Option<Vec<u8>>)>>>;

    fn build(capacity: usize, ttl: Duration) -> (RedisCache<ScriptDouble>, Evictions, Arc<RecordingLogger>) {
        let evictions: Evictions = Arc::new(Mutex::new(Vec::new()));
        let sink = evictions.clone();
        let logger = Arc::new(RecordingLogger::default());
        let config = ProviderConfig::new(capacity, ttl)
            .with_logger(logger.clone())
            .with_listener(Arc::new(move |key: &str, value: Option<&[u8]>| {
                sink.lock().push((key.to_string(), value.map(<[u8]>::to_vec)));
            }));
        (RedisCache::with_backend(ScriptDouble::default(), config), evictions, logger)
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_get_never_written_is_quiet_miss() {
        let (cache, _, logger) = build(4, HOUR);

        assert_eq!(cache.get("missing"), None);
        assert!(logger.failures.lock().is_empty());
    }

    #[test]
    fn test_set_then_get_returns_exact_value() {
        let (cache, _, _) = build(4, HOUR);

        cache.set("k", b"\x00binary\xff".to_vec());

        assert_eq!(cache.get("k"), Some(b"\x00binary\xff".to_vec()));
        assert!(cache.contains("k"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overflow_evicts_least_recent_without_value() {
        let (cache, evictions, _) = build(3, HOUR);

        for key in ["a", "b", "c", "d"] {
            cache.set(key, key.as_bytes().to_vec());
        }

        assert_eq!(*evictions.lock(), vec![("a".to_string(), None)]);
        assert!(!cache.contains("a"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_get_touch_protects_key() {
        let (cache, evictions, _) = build(2, HOUR);

        cache.set("k1", b"1".to_vec());
        cache.set("k2", b"2".to_vec());
        cache.get("k1");
        cache.set("k3", b"3".to_vec());

        assert_eq!(*evictions.lock(), vec![("k2".to_string(), None)]);
        assert!(cache.contains("k1"));
    }

    #[test]
    fn test_overwrite_keeps_len() {
        let (cache, evictions, _) = build(2, HOUR);

        cache.set("k", b"v1".to_vec());
        cache.set("k", b"v2".to_vec());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), Some(b"v2".to_vec()));
        assert!(evictions.lock().is_empty());
    }

    #[test]
    fn test_stale_index_entries_heal_on_next_eviction() {
        let (cache, evictions, _) = build(2, Duration::from_millis(30));

        cache.set("old1", b"1".to_vec());
        cache.set("old2", b"2".to_vec());
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.backend().index_len(), 2);

        cache.set("fresh", b"3".to_vec());

        assert_eq!(cache.backend().index_len(), 2);
        assert_eq!(evictions.lock()[0].0, "old1");
        assert_eq!(cache.get("fresh"), Some(b"3".to_vec()));
    }

    #[test]
    fn test_backend_failures_degrade_to_defaults() {
        let (cache, evictions, logger) = build(2, HOUR);
        cache.set("k", b"v".to_vec());
        cache.backend().failing.store(true, Ordering::SeqCst);

        assert_eq!(cache.get("k"), None);
        cache.set("k2", b"v".to_vec());
        assert!(!cache.contains("k"));
        assert_eq!(cache.len(), 0);

        assert!(evictions.lock().is_empty());
        assert_eq!(
            *logger.failures.lock(),
            vec![
                ("get", Some("k".to_string())),
                ("set", Some("k2".to_string())),
                ("contains", Some("k".to_string())),
                ("len", None),
            ]
        );
    }

    #[test]
    fn test_close_releases_backend_and_is_idempotent() {
        let (cache, _, logger) = build(2, HOUR);
        cache.set("k", b"v".to_vec());

        assert!(cache.close().is_ok());
        assert!(cache.close().is_ok());
        assert!(cache.backend().closed.load(Ordering::SeqCst));

        assert_eq!(cache.get("k"), None);
        assert_eq!(logger.failures.lock().len(), 1);
    }

    #[test]
    fn test_shared_instance_under_concurrent_callers() {
        const THREADS: usize = 8;
        const KEYS_PER_THREAD: usize = 200;
        const CAPACITY: usize = 64;

        let evictions = Arc::new(AtomicUsize::new(0));
        let counter = evictions.clone();
        let config = ProviderConfig::new(CAPACITY, HOUR).with_listener(Arc::new(
            move |_: &str, value: Option<&[u8]>| {
                assert!(value.is_none());
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));
        let cache = Arc::new(RedisCache::with_backend(ScriptDouble::default(), config));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..KEYS_PER_THREAD {
                        let key = format!("t{t}-k{i}");
                        cache.set(&key, key.as_bytes().to_vec());
                        if let Some(value) = cache.get(&key) {
                            assert_eq!(value, key.as_bytes());
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let len = cache.len();
        assert!(len <= CAPACITY);
        assert_eq!(cache.backend().index_len(), len);
        assert_eq!(evictions.load(Ordering::SeqCst), THREADS * KEYS_PER_THREAD - len);
    }

    #[test]
    fn test_sub_millisecond_ttl_still_expires() {
        let (cache, _, _) = build(2, Duration::from_micros(10));
        assert_eq!(cache.ttl_ms, 1);

        let (cache, _, _) = build(2, Duration::ZERO);
        assert_eq!(cache.ttl_ms, 0);
    }
}
