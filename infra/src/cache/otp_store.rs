//! Redis-backed OTP store
//!
//! Each record is one hash at `prefix:namespace:id` whose key expiry is the
//! record's TTL. Mutations that depend on the remaining lifetime read PTTL
//! in the same transaction, and the attempts counter is only ever changed
//! with HINCRBY so concurrent checks never share a count.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::Script;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use og_core::domain::{Otp, OtpEvent, MAX_TTL};
use og_core::errors::{StoreError, StoreResult};
use og_core::repositories::{record_key, OtpStore};
use og_shared::RedisConfig;

use crate::cache::{EventPublisher, RedisClient};
use crate::InfrastructureError;

/// Overwrite a record unless a live one is locked
///
/// ARGV[1] is the expiry in milliseconds, the rest are field/value pairs.
/// Returns `{written, pttl, fields}` where `written` is 0 for a locked record.
static SET_UNLESS_LOCKED: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
if redis.call('HEXISTS', KEYS[1], 'otp') == 1 then
    local counters = redis.call('HMGET', KEYS[1], 'attempts', 'max_attempts')
    local attempts = tonumber(counters[1]) or 0
    local max_attempts = tonumber(counters[2]) or 0
    if attempts >= max_attempts then
        return {0, redis.call('PTTL', KEYS[1]), redis.call('HGETALL', KEYS[1])}
    end
end
redis.call('HSET', KEYS[1], unpack(ARGV, 2))
redis.call('HINCRBY', KEYS[1], 'attempts', 1)
redis.call('PEXPIRE', KEYS[1], ARGV[1])
return {1, redis.call('PTTL', KEYS[1]), redis.call('HGETALL', KEYS[1])}
",
    )
});

/// Increment attempts only for a live record, returning `{pttl, fields}`
static CHECK_INCREMENT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
if redis.call('HEXISTS', KEYS[1], 'otp') == 0 then
    return false
end
redis.call('HINCRBY', KEYS[1], 'attempts', 1)
return {redis.call('PTTL', KEYS[1]), redis.call('HGETALL', KEYS[1])}
",
    )
});

/// Set one field of a live record; returns 0 when the record is gone
static SET_IF_EXISTS: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
if redis.call('HEXISTS', KEYS[1], 'otp') == 0 then
    return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
return 1
",
    )
});

/// `OtpStore` over a Redis hash per record
pub struct RedisOtpStore {
    client: RedisClient,
    publisher: Arc<dyn EventPublisher>,
    prefix: String,
    publish_key: Option<String>,
}

impl RedisOtpStore {
    /// Create a store over an already connected client
    pub fn new(client: RedisClient, config: &RedisConfig) -> Self {
        let publisher = Arc::new(client.clone());
        Self::with_publisher(client, config, publisher)
    }

    /// Create a store that sends events through `publisher`
    pub fn with_publisher(
        client: RedisClient,
        config: &RedisConfig,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            client,
            publisher,
            prefix: config.key_prefix.clone(),
            publish_key: config.publish_key.clone().filter(|k| !k.is_empty()),
        }
    }

    /// Connect to Redis and create the store
    pub async fn connect(config: &RedisConfig) -> Result<Self, InfrastructureError> {
        let client = RedisClient::new(config).await?;
        Ok(Self::new(client, config))
    }

    fn key(&self, namespace: &str, id: &str) -> String {
        record_key(&self.prefix, namespace, id)
    }

    async fn publish(&self, event: &OtpEvent) -> Result<(), InfrastructureError> {
        let Some(channel) = &self.publish_key else {
            return Ok(());
        };
        let payload = serde_json::to_string(event)
            .map_err(|e| InfrastructureError::Config(format!("event encoding: {}", e)))?;
        self.publisher.publish(channel, &payload).await?;
        Ok(())
    }

    async fn set_field_if_exists(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.client.connection();
        let updated: i64 = self
            .client
            .run(
                SET_IF_EXISTS
                    .key(key)
                    .arg(field)
                    .arg(value)
                    .invoke_async(&mut conn),
            )
            .await?;

        if updated == 0 {
            return Err(StoreError::NotExist);
        }
        Ok(())
    }
}

/// Hash fields written by `set`
fn record_fields(otp: &Otp) -> Vec<(&'static str, String)> {
    vec![
        ("namespace", otp.namespace.clone()),
        ("id", otp.id.clone()),
        ("to", otp.to.clone()),
        ("channel_description", otp.channel_description.clone()),
        ("address_description", otp.address_description.clone()),
        ("extra", otp.extra.clone()),
        ("provider", otp.provider.clone()),
        ("otp", otp.otp.clone()),
        ("max_attempts", otp.max_attempts.to_string()),
        ("attempts", "0".to_string()),
        ("closed", "0".to_string()),
    ]
}

/// Script arguments for `set`: the expiry followed by flattened fields
fn set_args(ttl_ms: u64, otp: &Otp) -> Vec<String> {
    let fields = record_fields(otp);
    let mut args = Vec::with_capacity(1 + fields.len() * 2);
    args.push(ttl_ms.to_string());
    for (field, value) in fields {
        args.push(field.to_string());
        args.push(value);
    }
    args
}

/// Record lifetime in whole milliseconds, at least 1
fn ttl_millis(ttl: Duration) -> StoreResult<u64> {
    if ttl > MAX_TTL {
        return Err(StoreError::InvalidTtl(ttl));
    }
    let ms = u64::try_from(ttl.as_millis()).map_err(|_| StoreError::InvalidTtl(ttl))?;
    Ok(ms.max(1))
}

/// Pair up a flat `HGETALL` reply
fn pairs_to_map(flat: Vec<String>) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        map.insert(field, value);
    }
    map
}

/// PTTL reply to a remaining lifetime; negative replies carry no expiry
fn pttl_to_duration(pttl: i64) -> Duration {
    if pttl > 0 {
        Duration::from_millis(pttl as u64)
    } else {
        Duration::ZERO
    }
}

fn parse_u32(fields: &HashMap<String, String>, name: &str) -> StoreResult<u32> {
    match fields.get(name) {
        None => Ok(0),
        Some(raw) => raw
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("field `{}` is not a number: {:?}", name, raw))),
    }
}

/// Decode a record hash
///
/// A hash without an `otp` field is treated as absent, which also covers
/// keys that expired between commands.
pub(crate) fn parse_record(
    namespace: &str,
    id: &str,
    mut fields: HashMap<String, String>,
    pttl: i64,
) -> StoreResult<Otp> {
    let otp = match fields.remove("otp") {
        Some(otp) if !otp.is_empty() => otp,
        _ => return Err(StoreError::NotExist),
    };

    let max_attempts = parse_u32(&fields, "max_attempts")?;
    let attempts = parse_u32(&fields, "attempts")?;
    let closed = matches!(
        fields.get("closed").map(String::as_str),
        Some("1") | Some("true")
    );

    let mut take = |name: &str| fields.remove(name).unwrap_or_default();

    Ok(Otp {
        namespace: namespace.to_string(),
        id: id.to_string(),
        to: take("to"),
        channel_description: take("channel_description"),
        address_description: take("address_description"),
        extra: take("extra"),
        provider: take("provider"),
        otp,
        max_attempts,
        attempts,
        closed,
        ttl: pttl_to_duration(pttl),
    })
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn set(&self, namespace: &str, id: &str, otp: Otp) -> StoreResult<Otp> {
        let key = self.key(namespace, id);

        let mut record = otp;
        record.namespace = namespace.to_string();
        record.id = id.to_string();
        let ttl_ms = ttl_millis(record.ttl)?;

        let mut conn = self.client.connection();
        let (written, pttl, flat): (i64, i64, Vec<String>) = self
            .client
            .run(
                SET_UNLESS_LOCKED
                    .key(&key)
                    .arg(set_args(ttl_ms, &record))
                    .invoke_async(&mut conn),
            )
            .await?;
        let stored = parse_record(namespace, id, pairs_to_map(flat), pttl)?;

        if written == 0 {
            debug!(namespace = namespace, id = id, "Refused to overwrite locked OTP record");
            return Err(StoreError::Locked(Box::new(stored)));
        }

        debug!(namespace = namespace, id = id, ttl_ms = ttl_ms, "Stored OTP record");
        Ok(stored)
    }

    async fn check(&self, namespace: &str, id: &str, increment: bool) -> StoreResult<Otp> {
        let key = self.key(namespace, id);
        let mut conn = self.client.connection();

        if !increment {
            let mut pipe = redis::pipe();
            pipe.atomic().hgetall(&key).cmd("PTTL").arg(&key);
            let (fields, pttl): (HashMap<String, String>, i64) =
                self.client.run(pipe.query_async(&mut conn)).await?;
            return parse_record(namespace, id, fields, pttl);
        }

        let reply: Option<(i64, Vec<String>)> = self
            .client
            .run(CHECK_INCREMENT.key(&key).invoke_async(&mut conn))
            .await?;
        let (pttl, flat) = reply.ok_or(StoreError::NotExist)?;
        let otp = parse_record(namespace, id, pairs_to_map(flat), pttl)?;

        self.publish(&OtpEvent::check(&otp)).await?;
        Ok(otp)
    }

    async fn set_address(&self, namespace: &str, id: &str, address: &str) -> StoreResult<()> {
        let key = self.key(namespace, id);
        self.set_field_if_exists(&key, "to", address).await
    }

    async fn close(&self, namespace: &str, id: &str) -> StoreResult<()> {
        let key = self.key(namespace, id);
        self.set_field_if_exists(&key, "closed", "1").await?;

        if let Err(e) = self.publish(&OtpEvent::close(namespace, id)).await {
            warn!(namespace = namespace, id = id, error = %e, "Failed to publish close event");
        }
        Ok(())
    }

    async fn delete(&self, namespace: &str, id: &str) -> StoreResult<()> {
        let key = self.key(namespace, id);
        let mut conn = self.client.connection();
        let _: i64 = self
            .client
            .run(redis::cmd("DEL").arg(&key).query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        match self.client.health_check().await? {
            true => Ok(()),
            false => Err(StoreError::Unavailable("unexpected PING reply".to_string())),
        }
    }
}
