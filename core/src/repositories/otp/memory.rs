//! Process-local `OtpStore` for development and tests.
//!
//! Every operation takes the map lock, so per-key mutations are trivially
//! serialized. Expiry uses tokio's clock, which lets tests drive it with
//! `tokio::time::pause`/`advance`.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;

use crate::domain::entities::{Otp, MAX_TTL};
use crate::domain::events::OtpEvent;
use crate::errors::{StoreError, StoreResult};

use super::r#trait::{record_key, OtpStore};

const EVENT_CAPACITY: usize = 256;

/// Expired entries are swept from the map once every this many `set`s
const SWEEP_INTERVAL: u64 = 64;

struct Entry {
    otp: Otp,
    expires_at: Instant,
}

/// In-memory store keyed by `prefix:namespace:id`
pub struct InMemoryOtpStore {
    prefix: String,
    records: Mutex<Records>,
    events: broadcast::Sender<OtpEvent>,
}

#[derive(Default)]
struct Records {
    entries: HashMap<String, Entry>,
    sets: u64,
}

impl Records {
    /// Drop every expired entry, including ones nobody reads again
    fn sweep(&mut self, now: Instant) {
        self.entries.retain(|_, e| e.expires_at > now);
    }
}

impl InMemoryOtpStore {
    /// Create an empty store using the default `OTP` key prefix
    pub fn new() -> Self {
        Self::with_prefix("OTP")
    }

    /// Create an empty store with a custom key prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            prefix: prefix.into(),
            records: Mutex::new(Records::default()),
            events,
        }
    }

    /// Subscribe to `check` and `close` events
    pub fn subscribe(&self) -> broadcast::Receiver<OtpEvent> {
        self.events.subscribe()
    }

    /// Number of live (unexpired) records
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let records = self.records.lock().await;
        records.entries.values().filter(|e| e.expires_at > now).count()
    }

    /// Entries held in the map, expired ones included
    pub(crate) async fn stored_len(&self) -> usize {
        self.records.lock().await.entries.len()
    }

    /// Whether the store holds no live records
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn key(&self, namespace: &str, id: &str) -> String {
        record_key(&self.prefix, namespace, id)
    }

    fn publish(&self, event: OtpEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

impl Default for InMemoryOtpStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Look up a live entry, evicting it if it has expired
fn live_entry<'a>(
    records: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> StoreResult<&'a mut Entry> {
    let expired = match records.get(key) {
        Some(entry) => entry.expires_at <= now,
        None => return Err(StoreError::NotExist),
    };
    if expired {
        records.remove(key);
        return Err(StoreError::NotExist);
    }
    records.get_mut(key).ok_or(StoreError::NotExist)
}

fn snapshot(entry: &Entry, now: Instant) -> Otp {
    let mut otp = entry.otp.clone();
    otp.ttl = entry.expires_at.saturating_duration_since(now);
    otp
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn set(&self, namespace: &str, id: &str, otp: Otp) -> StoreResult<Otp> {
        let now = Instant::now();
        let key = self.key(namespace, id);

        if otp.ttl > MAX_TTL {
            return Err(StoreError::InvalidTtl(otp.ttl));
        }
        let expires_at = now
            .checked_add(otp.ttl)
            .ok_or(StoreError::InvalidTtl(otp.ttl))?;

        let mut records = self.records.lock().await;

        records.sets += 1;
        if records.sets % SWEEP_INTERVAL == 0 {
            records.sweep(now);
        }

        // The lock test shares the guard with the write, so a concurrent
        // check cannot lock the record in between.
        if let Ok(existing) = live_entry(&mut records.entries, &key, now) {
            if existing.otp.is_locked() {
                return Err(StoreError::Locked(Box::new(snapshot(existing, now))));
            }
        }

        let mut record = otp;
        record.namespace = namespace.to_string();
        record.id = id.to_string();
        record.closed = false;
        record.attempts = 1;

        let entry = Entry {
            expires_at,
            otp: record,
        };
        let out = snapshot(&entry, now);

        records.entries.insert(key, entry);
        Ok(out)
    }

    async fn check(&self, namespace: &str, id: &str, increment: bool) -> StoreResult<Otp> {
        let now = Instant::now();
        let key = self.key(namespace, id);

        let out = {
            let mut records = self.records.lock().await;
            let entry = live_entry(&mut records.entries, &key, now)?;
            if increment {
                entry.otp.attempts += 1;
            }
            snapshot(entry, now)
        };

        if increment {
            self.publish(OtpEvent::check(&out));
        }
        Ok(out)
    }

    async fn set_address(&self, namespace: &str, id: &str, address: &str) -> StoreResult<()> {
        let now = Instant::now();
        let key = self.key(namespace, id);

        let mut records = self.records.lock().await;
        let entry = live_entry(&mut records.entries, &key, now)?;
        entry.otp.to = address.to_string();
        Ok(())
    }

    async fn close(&self, namespace: &str, id: &str) -> StoreResult<()> {
        let now = Instant::now();
        let key = self.key(namespace, id);

        {
            let mut records = self.records.lock().await;
            let entry = live_entry(&mut records.entries, &key, now)?;
            entry.otp.closed = true;
        }

        self.publish(OtpEvent::close(namespace, id));
        Ok(())
    }

    async fn delete(&self, namespace: &str, id: &str) -> StoreResult<()> {
        let key = self.key(namespace, id);
        self.records.lock().await.entries.remove(&key);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
