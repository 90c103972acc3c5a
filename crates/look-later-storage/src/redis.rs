use crate::substrate::{entry_size, CasOutcome, Substrate, Versioned, DEFAULT_QUOTA_BYTES};
use async_trait::async_trait;
use look_later_core::{Result, StoreError};
use redis::Script;
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Versioned, quota-checked write.
///
/// KEYS: entry hash, per-key size hash, namespace byte total.
/// ARGV: expected version (`*` for unconditional, empty for "never written"),
/// JSON value, unprefixed key, entry size, quota.
/// Returns `{1, version}`, `{-1, 0}` when stale, or `{-2, required}` when the
/// write would exceed the quota.
const WRITE_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], 'version')
if ARGV[1] ~= '*' and not ((current == false and ARGV[1] == '') or current == ARGV[1]) then
  return {-1, 0}
end
local old = tonumber(redis.call('HGET', KEYS[2], ARGV[3]) or '0')
local total = tonumber(redis.call('GET', KEYS[3]) or '0')
local required = total - old + tonumber(ARGV[4])
if required > tonumber(ARGV[5]) then
  return {-2, required}
end
redis.call('HSET', KEYS[1], 'value', ARGV[2])
local version = redis.call('HINCRBY', KEYS[1], 'version', 1)
redis.call('HSET', KEYS[2], ARGV[3], ARGV[4])
redis.call('SET', KEYS[3], required)
return {1, version}
"#;

const UNCONDITIONAL: &str = "*";
const SIZES_KEY: &str = "__sizes";
const TOTAL_KEY: &str = "__total";

/// A Redis-backed implementation of [`Substrate`].
///
/// Each key is a hash `{value, version}` under a configurable prefix. Entry
/// sizes and the namespace total are kept beside them, so a write checks the
/// quota and its version in one Lua script.
#[derive(Debug, Clone)]
pub struct RedisSubstrate {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
    quota_bytes: u64,
    write_script: Script,
}

fn map_redis_error(operation: &str, err: redis::RedisError, read: bool) -> StoreError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        StoreError::Timeout(message)
    } else if read {
        StoreError::Read(message)
    } else {
        StoreError::Write(message)
    }
}

impl RedisSubstrate {
    /// Creates a Redis substrate with the `ll:` key prefix and the browser's
    /// default quota.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, "ll:")
    }

    /// Creates a Redis substrate with a custom key prefix.
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
            write_script: Script::new(WRITE_SCRIPT),
        }
    }

    /// Overrides the quota ceiling.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Opens a multiplexed connection to `url` and wraps it.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Read(format!("invalid redis url '{url}': {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e, true))?;
        Ok(Self::new(conn))
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Runs [`WRITE_SCRIPT`] for `key`, returning the script's status pair.
    async fn write(&self, key: &str, expected: &str, json: String) -> Result<(i64, i64)> {
        let size = entry_size(key, &json);
        let mut conn = self.conn.clone();
        self.write_script
            .key(self.redis_key(key))
            .key(self.redis_key(SIZES_KEY))
            .key(self.redis_key(TOTAL_KEY))
            .arg(expected)
            .arg(json)
            .arg(key)
            .arg(size)
            .arg(self.quota_bytes)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(key, error = %e, "Redis error on write");
                map_redis_error("failed to write value to Redis", e, false)
            })
    }

    fn quota_exceeded(&self, key: &str, required: i64) -> StoreError {
        warn!(key, required, quota = self.quota_bytes, "write exceeds storage quota");
        StoreError::Write(format!(
            "quota exceeded: {required} of {} bytes",
            self.quota_bytes
        ))
    }

    fn encode(key: &str, value: &Value) -> Result<String> {
        serde_json::to_string(value).map_err(|e| {
            StoreError::Write(format!("failed to serialize value for '{key}': {e}"))
        })
    }
}

#[async_trait]
impl Substrate for RedisSubstrate {
    async fn get(&self, key: &str) -> Result<Option<Versioned<Value>>> {
        let redis_key = self.redis_key(key);
        trace!(key, "reading from Redis substrate");

        let mut conn = self.conn.clone();
        let (json, version): (Option<String>, Option<u64>) = redis::cmd("HMGET")
            .arg(&redis_key)
            .arg("value")
            .arg("version")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(key, error = %e, "Redis error on get");
                map_redis_error("failed to fetch value from Redis", e, true)
            })?;

        let (Some(json), Some(version)) = (json, version) else {
            return Ok(None);
        };

        let value = serde_json::from_str(&json).map_err(|e| {
            warn!(key, error = %e, "failed to deserialize stored value");
            StoreError::InvalidData(format!("invalid value stored under '{key}': {e}"))
        })?;
        Ok(Some(Versioned { value, version }))
    }

    async fn set(&self, key: &str, value: Value) -> Result<u64> {
        let json = Self::encode(key, &value)?;

        match self.write(key, UNCONDITIONAL, json).await? {
            (-2, required) => Err(self.quota_exceeded(key, required)),
            (_, version) => {
                debug!(key, version, "stored value in Redis");
                Ok(version as u64)
            }
        }
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: Value,
    ) -> Result<CasOutcome> {
        let json = Self::encode(key, &value)?;
        let expected_arg = expected.map(|v| v.to_string()).unwrap_or_default();

        match self.write(key, &expected_arg, json).await? {
            (-1, _) => {
                trace!(key, ?expected, "stale compare-and-set");
                Ok(CasOutcome::Stale)
            }
            (-2, required) => Err(self.quota_exceeded(key, required)),
            (_, version) => {
                debug!(key, version, "stored value in Redis");
                Ok(CasOutcome::Applied {
                    version: version as u64,
                })
            }
        }
    }

    async fn bytes_in_use(&self, keys: Option<&[&str]>) -> Result<u64> {
        let mut conn = self.conn.clone();
        let used: u64 = match keys {
            Some([]) => 0,
            Some(keys) => {
                let sizes: Vec<Option<u64>> = redis::cmd("HMGET")
                    .arg(self.redis_key(SIZES_KEY))
                    .arg(keys)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| map_redis_error("failed to measure values", e, true))?;
                sizes.into_iter().flatten().sum()
            }
            None => {
                let total: Option<u64> = redis::cmd("GET")
                    .arg(self.redis_key(TOTAL_KEY))
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| map_redis_error("failed to measure values", e, true))?;
                total.unwrap_or_default()
            }
        };
        Ok(used)
    }

    fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }
}

