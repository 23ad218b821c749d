//! Redis script layer.
//!
//! Entries live in one hash (`field = key`, per-field expiry) and one sorted
//! set (`member = key`, `score = last touch in microseconds`). Two Lua scripts
//! keep the pair consistent, each in a single round trip.

use std::fmt;
use std::time::Duration;

use parking_lot::RwLock;
use r2d2::{CustomizeConnection, Pool, PooledConnection};
use redis::{Client, Commands, ConnectionInfo, IntoConnectionInfo, Script};
use tracing::{debug, info};

use crate::config::RedisSettings;
use crate::error::{CacheError, Result};

// Expands to the prefix literal; `concat!` accepts only literals.
macro_rules! key_prefix {
    () => {
        "lru_providers:"
    };
}

/// Prefix shared by every instance of this backend in one database.
pub const KEY_PREFIX: &str = key_prefix!();
/// Hash holding the values.
pub const DATA_KEY: &str = concat!(key_prefix!(), "data");
/// Sorted set ordering keys by last touch.
pub const LRU_KEY: &str = concat!(key_prefix!(), "lru");

/// Bound on every round trip after construction.
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(2);
/// Bound on the construction-time health check.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const POOL_SIZE: u32 = 8;

// KEYS: data, lru. ARGV: now_micros, member.
const READ_AND_TOUCH: &str = r"
local value = redis.call('HGET', KEYS[1], ARGV[2])
if value then
  redis.call('ZADD', KEYS[2], ARGV[1], ARGV[2])
end
return value
";

// KEYS: data, lru. ARGV: value, now_micros, member, capacity, ttl_ms.
// HPEXPIRE needs Redis 7.4; on older servers the pcall fails and the field
// simply never expires.
const WRITE_AND_EVICT: &str = r"
redis.call('HSET', KEYS[1], ARGV[3], ARGV[1])
local ttl = tonumber(ARGV[5])
if ttl > 0 then
  pcall(redis.call, 'HPEXPIRE', KEYS[1], ttl, 'FIELDS', 1, ARGV[3])
end
redis.call('ZADD', KEYS[2], ARGV[2], ARGV[3])
local capacity = tonumber(ARGV[4])
local evicted = {}
while redis.call('ZCARD', KEYS[2]) > capacity do
  local popped = redis.call('ZPOPMIN', KEYS[2])
  local member = popped[1]
  redis.call('HDEL', KEYS[1], member)
  table.insert(evicted, member)
end
return evicted
";

// == LRU Backend ==
/// The server-side operations the Redis provider is built on.
///
/// Each method is one atomic round trip. Errors are returned as-is; the
/// provider decides how to degrade.
pub trait LruBackend: Send + Sync {
    /// Fetches `member` and, if present, moves it to the most recent end.
    fn read_and_touch(&self, now_micros: i64, member: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `member`, then pops least recent members until at most
    /// `capacity` remain. Returns the popped members. `ttl_ms == 0` disables
    /// expiry.
    fn write_and_evict(
        &self,
        value: &[u8],
        now_micros: i64,
        member: &str,
        capacity: usize,
        ttl_ms: u64,
    ) -> Result<Vec<String>>;

    /// Whether `member` has a live value. No recency update.
    fn exists(&self, member: &str) -> Result<bool>;

    /// Number of live values.
    fn count(&self) -> Result<usize>;

    /// Releases connections. Later calls fail with [`CacheError::Closed`].
    fn close(&self);
}

// == Redis Backend ==
pub struct RedisBackend {
    address: String,
    pool: RwLock<Option<Pool<Client>>>,
    read_and_touch: Script,
    write_and_evict: Script,
}

impl RedisBackend {
    /// Opens a pool and verifies the server answers `PING`.
    pub fn connect(settings: &RedisSettings) -> Result<Self> {
        let address = settings.address.clone();
        let connect_err = |source: Box<dyn std::error::Error + Send + Sync>| CacheError::Connect {
            address: address.clone(),
            source,
        };

        let client = Client::open(connection_info(settings).map_err(|e| connect_err(e.into()))?)
            .map_err(|e| connect_err(e.into()))?;

        let pool = Pool::builder()
            .max_size(POOL_SIZE)
            .min_idle(Some(1))
            .connection_timeout(CONNECT_TIMEOUT)
            .connection_customizer(Box::new(OperationTimeouts(OPERATION_TIMEOUT)))
            .build(client)
            .map_err(|e| connect_err(e.into()))?;

        let mut conn = pool
            .get_timeout(CONNECT_TIMEOUT)
            .map_err(|e| connect_err(e.into()))?;
        let pong: String = redis::cmd("PING")
            .query(&mut *conn)
            .map_err(|e| connect_err(e.into()))?;
        drop(conn);

        info!(address = %settings.address, db = settings.db, reply = %pong, "connected to redis");

        Ok(Self {
            address: settings.address.clone(),
            pool: RwLock::new(Some(pool)),
            read_and_touch: Script::new(READ_AND_TOUCH),
            write_and_evict: Script::new(WRITE_AND_EVICT),
        })
    }

    fn conn(&self) -> Result<PooledConnection<Client>> {
        let pool = self.pool.read().clone().ok_or(CacheError::Closed)?;
        Ok(pool.get_timeout(OPERATION_TIMEOUT)?)
    }
}

impl LruBackend for RedisBackend {
    fn read_and_touch(&self, now_micros: i64, member: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn()?;
        let value = self
            .read_and_touch
            .key(DATA_KEY)
            .key(LRU_KEY)
            .arg(now_micros)
            .arg(member)
            .invoke(&mut *conn)?;
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
        let mut conn = self.conn()?;
        let evicted = self
            .write_and_evict
            .key(DATA_KEY)
            .key(LRU_KEY)
            .arg(value)
            .arg(now_micros)
            .arg(member)
            .arg(capacity)
            .arg(ttl_ms)
            .invoke(&mut *conn)?;
        Ok(evicted)
    }

    fn exists(&self, member: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        Ok(conn.hexists(DATA_KEY, member)?)
    }

    fn count(&self) -> Result<usize> {
        let mut conn = self.conn()?;
        Ok(conn.hlen(DATA_KEY)?)
    }

    fn close(&self) {
        if self.pool.write().take().is_some() {
            debug!(address = %self.address, "redis pool released");
        }
    }
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("address", &self.address)
            .field("open", &self.pool.read().is_some())
            .finish()
    }
}

/// Applies the per-operation bound to every pooled connection.
#[derive(Debug)]
struct OperationTimeouts(Duration);

impl CustomizeConnection<redis::Connection, redis::RedisError> for OperationTimeouts {
    fn on_acquire(&self, conn: &mut redis::Connection) -> std::result::Result<(), redis::RedisError> {
        conn.set_read_timeout(Some(self.0))?;
        conn.set_write_timeout(Some(self.0))
    }
}

fn connection_info(settings: &RedisSettings) -> redis::RedisResult<ConnectionInfo> {
    let mut info = if settings.address.contains("://") {
        settings.address.as_str().into_connection_info()?
    } else {
        format!("redis://{}", settings.address).into_connection_info()?
    };
    if settings.password.is_some() {
        info.redis.password = settings.password.clone();
    }
    if settings.db != 0 {
        info.redis.db = settings.db;
    }
    Ok(info)
}
