//! Redis-backed store adapters for multi-instance deployments.
//!
//! All cross-instance coordination happens through these keys:
//!
//! - `quota:{identity}:{d|m}:{window}` - fixed-window counters, INCR +
//!   EXPIREAT at the window end
//! - `ent:{identity}` - entitlement hash, extended server-side with a Lua
//!   script so concurrent grants never lose an extension
//! - `webhook:event:{event_id}` - dedup records, SET NX with the retention
//!   TTL

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};

use crate::domain::entitlement::EntitlementRecord;
use crate::domain::foundation::{Identity, Timestamp};
use crate::ports::{
    CounterStore, EntitlementRepository, InsertOutcome, StoreError, WebhookEventRecord,
    WebhookEventRepository,
};

fn unavailable(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// Fixed-window counters over INCR + EXPIREAT.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: MultiplexedConnection,
}

impl RedisCounterStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, expires_at: Timestamp) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();

        let count: i64 = conn.incr(key, 1_i64).await.map_err(unavailable)?;

        // Absolute expiry at the window end, set only when the counter is
        // created, so a counter never drifts past its own boundary.
        if count == 1 {
            conn.expire_at::<_, ()>(key, expires_at.as_unix_secs() as i64)
                .await
                .map_err(unavailable)?;
        }

        Ok(count.max(0) as u64)
    }

    async fn get(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let count: Option<i64> = conn.get(key).await.map_err(unavailable)?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

/// Extends the expiry server-side: `max(current, now) + days`, one round
/// trip, no read-then-write gap between concurrent grants.
const EXTEND_SCRIPT: &str = r#"
local now = tonumber(ARGV[1])
local extend_secs = tonumber(ARGV[2])
local base = now
local current = redis.call('HGET', KEYS[1], 'expires_at')
if current and tonumber(current) > now then
    base = tonumber(current)
end
local expires_at = base + extend_secs
redis.call('HSET', KEYS[1], 'expires_at', expires_at, 'event_id', ARGV[3])
return expires_at
"#;

const SECS_PER_DAY: u64 = 86_400;

/// Entitlement records stored as small hashes.
#[derive(Clone)]
pub struct RedisEntitlementRepository {
    conn: MultiplexedConnection,
    extend_script: Script,
}

impl RedisEntitlementRepository {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            extend_script: Script::new(EXTEND_SCRIPT),
        }
    }

    fn key(identity: &Identity) -> String {
        format!("ent:{}", identity.as_str())
    }
}

#[async_trait]
impl EntitlementRepository for RedisEntitlementRepository {
    async fn find(&self, identity: &Identity) -> Result<Option<EntitlementRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let fields: Vec<Option<String>> = conn
            .hget(Self::key(identity), &["expires_at", "event_id"])
            .await
            .map_err(unavailable)?;

        let (expires_at, event_id) = match fields.as_slice() {
            [Some(expires_at), Some(event_id)] => (expires_at.clone(), event_id.clone()),
            [None, None] => return Ok(None),
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "partial entitlement hash for {identity}"
                )))
            }
        };

        let expires_at: u64 = expires_at.parse().map_err(|_| {
            StoreError::Corrupt(format!("non-numeric entitlement expiry for {identity}"))
        })?;
        let expires_at = Timestamp::try_from_unix_secs(expires_at).ok_or_else(|| {
            StoreError::Corrupt(format!("out-of-range entitlement expiry for {identity}"))
        })?;

        Ok(Some(EntitlementRecord {
            expires_at,
            granted_by_event_id: event_id,
        }))
    }

    async fn extend(
        &self,
        identity: &Identity,
        days: u32,
        event_id: &str,
        now: Timestamp,
    ) -> Result<EntitlementRecord, StoreError> {
        let mut conn = self.conn.clone();
        let expires_at: u64 = self
            .extend_script
            .key(Self::key(identity))
            .arg(now.as_unix_secs())
            .arg(u64::from(days) * SECS_PER_DAY)
            .arg(event_id)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        let expires_at = Timestamp::try_from_unix_secs(expires_at).ok_or_else(|| {
            StoreError::Corrupt(format!("out-of-range entitlement expiry for {identity}"))
        })?;

        Ok(EntitlementRecord {
            expires_at,
            granted_by_event_id: event_id.to_string(),
        })
    }

    async fn revoke(
        &self,
        identity: &Identity,
        event_id: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // Single HSET, atomic on its own.
        conn.hset_multiple::<_, _, _, ()>(
            Self::key(identity),
            &[
                ("expires_at", now.as_unix_secs().to_string()),
                ("event_id", event_id.to_string()),
            ],
        )
        .await
        .map_err(unavailable)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisEntitlementRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEntitlementRepository")
            .finish_non_exhaustive()
    }
}

/// Swaps the stored record only if it is byte-identical to the value the
/// caller read, so concurrent claimants of one stale record cannot both
/// win. The values compared are always this adapter's own serializations.
const CLAIM_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
    return 1
end
return 0
"#;

/// Webhook dedup records as JSON values with the retention TTL.
#[derive(Clone)]
pub struct RedisWebhookEventRepository {
    conn: MultiplexedConnection,
    retention_secs: u64,
    claim_script: Script,
}

impl RedisWebhookEventRepository {
    pub fn new(conn: MultiplexedConnection, retention_secs: u64) -> Self {
        Self {
            conn,
            retention_secs,
            claim_script: Script::new(CLAIM_SCRIPT),
        }
    }

    fn key(event_id: &str) -> String {
        format!("webhook:event:{event_id}")
    }
}

#[async_trait]
impl WebhookEventRepository for RedisWebhookEventRepository {
    async fn find(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(Self::key(event_id)).await.map_err(unavailable)?;

        match json {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
                StoreError::Corrupt(format!("webhook record for '{event_id}': {e}"))
            }),
        }
    }

    async fn insert_pending(
        &self,
        record: WebhookEventRecord,
    ) -> Result<InsertOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(&record)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // SET NX: existence check and write in one atomic command.
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::key(&record.event_id))
            .arg(json)
            .arg("NX")
            .arg("EX")
            .arg(self.retention_secs)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(match reply {
            Some(_) => InsertOutcome::Inserted,
            None => InsertOutcome::AlreadyExists,
        })
    }

    async fn claim_pending(
        &self,
        expected: &WebhookEventRecord,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        if expected.applied {
            return Ok(false);
        }
        let mut conn = self.conn.clone();

        let current = serde_json::to_string(expected)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let mut stamped = expected.clone();
        stamped.received_at = now;
        let stamped = serde_json::to_string(&stamped)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let claimed: i64 = self
            .claim_script
            .key(Self::key(&expected.event_id))
            .arg(current)
            .arg(stamped)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(claimed == 1)
    }

    async fn mark_applied(&self, event_id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = Self::key(event_id);

        let json: Option<String> = conn.get(&key).await.map_err(unavailable)?;
        let mut record: WebhookEventRecord = match json {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                StoreError::Corrupt(format!("webhook record for '{event_id}': {e}"))
            })?,
            None => {
                return Err(StoreError::Corrupt(format!(
                    "mark_applied for unrecorded event '{event_id}'"
                )))
            }
        };
        record.applied = true;

        let json = serde_json::to_string(&record)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // KEEPTTL preserves the retention window set at insert time. Only
        // the attempt that owns the apply writes here, and the write is
        // idempotent, so read-then-set is safe.
        redis::cmd("SET")
            .arg(&key)
            .arg(json)
            .arg("KEEPTTL")
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(())
    }
}

impl std::fmt::Debug for RedisWebhookEventRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisWebhookEventRepository")
            .field("retention_secs", &self.retention_secs)
            .finish_non_exhaustive()
    }
}
