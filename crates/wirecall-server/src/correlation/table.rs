use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

/// Composite key of a server-initiated call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    pub client_id: String,
    pub id: String,
}

impl CallKey {
    pub fn new(client_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            id: id.into(),
        }
    }
}

type ExpireFn<V> = Box<dyn FnOnce(V) + Send + Sync>;

struct Slot<V> {
    value: V,
    expires_at: Instant,
    on_expire: ExpireFn<V>,
}

/// Key -> value map where every entry carries a deadline.
///
/// Every exit path goes through a single `DashMap::remove`, so an entry is
/// handed out at most once: to `take`, to `delete` (dropped), or to its
/// `on_expire` callback. Callbacks run after the shard lock is released.
pub struct CorrelationTable<K, V> {
    entries: DashMap<K, Slot<V>>,
    timeout: Duration,
    sweep_interval: Duration,
}

impl<K, V> CorrelationTable<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Sweep interval is half the timeout (at least 1ms).
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            timeout,
            sweep_interval: (timeout / 2).max(Duration::from_millis(1)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Insert with `expiry = now + timeout`.
    ///
    /// Returns false (and stores nothing) when the key is already pending.
    pub fn add(
        &self,
        key: K,
        value: V,
        on_expire: impl FnOnce(V) + Send + Sync + 'static,
    ) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                tracing::debug!(
                    key = ?slot.key(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "pending call registered"
                );
                slot.insert(Slot {
                    value,
                    expires_at: Instant::now() + self.timeout,
                    on_expire: Box::new(on_expire),
                });
                true
            }
        }
    }

    /// Deadline of a pending entry; `refresh` pushes it to `now + timeout`.
    pub fn get(&self, key: &K, refresh: bool) -> Option<Instant> {
        let mut slot = self.entries.get_mut(key)?;
        if refresh {
            slot.expires_at = Instant::now() + self.timeout;
        }
        Some(slot.expires_at)
    }

    /// Lookup-and-remove. The expiry callback is discarded.
    pub fn take(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, slot)| slot.value)
    }

    /// Remove without resolving.
    pub fn delete(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expire everything past its deadline.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let due: Vec<K> = self
            .entries
            .iter()
            .filter(|e| e.expires_at <= now)
            .map(|e| e.key().clone())
            .collect();

        let mut n = 0;
        for key in due {
            // re-checked: the entry may have been refreshed or taken meanwhile
            if let Some((key, slot)) = self.entries.remove_if(&key, |_, s| s.expires_at <= now) {
                tracing::debug!(?key, "pending call expired");
                (slot.on_expire)(slot.value);
                n += 1;
            }
        }
        n
    }

    /// Expire every entry regardless of deadline (connection teardown).
    pub fn expire_all(&self) -> usize {
        let keys: Vec<K> = self.entries.iter().map(|e| e.key().clone()).collect();
        let mut n = 0;
        for key in keys {
            if let Some((_, slot)) = self.entries.remove(&key) {
                (slot.on_expire)(slot.value);
                n += 1;
            }
        }
        n
    }

    /// Periodic sweep task. Holds only a weak reference, so it ends by itself
    /// once the table is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let every = self.sweep_interval;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            tick.tick().await;
            loop {
                tick.tick().await;
                let Some(table) = weak.upgrade() else {
                    break;
                };
                let n = table.sweep();
                if n > 0 {
                    tracing::debug!(expired = n, remaining = table.len(), "correlation sweep");
                }
            }
        })
    }
}
