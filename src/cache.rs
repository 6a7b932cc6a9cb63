//! Time-bounded cache for query results.
//!
//! Entries expire after a fixed TTL. When the cache is full, expired
//! entries are dropped first, then half of what remains.
//!
//! Every invalidation bumps a generation counter. A value loaded while an
//! invalidation happened is returned to its caller but never stored.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted: Instant,
}

struct Slots<K, V> {
    entries: HashMap<K, Entry<V>>,
    generation: u64,
}

impl<K, V> Slots<K, V> {
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

pub struct TtlCache<K, V> {
    slots: Mutex<Slots<K, V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                generation: 0,
            }),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots<K, V>> {
        // a poisoned map only ever holds stale values
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a fresh value, dropping the entry if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut slots = self.lock();
        let entries = &mut slots.entries;
        match entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.store(&mut self.lock(), key, value);
    }

    fn store(&self, slots: &mut Slots<K, V>, key: K, value: V) {
        let entries = &mut slots.entries;

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, e| e.inserted.elapsed() < ttl);

            if entries.len() >= self.max_entries {
                let evict: Vec<K> = entries
                    .keys()
                    .take((self.max_entries / 2).max(1))
                    .cloned()
                    .collect();
                for k in evict {
                    entries.remove(&k);
                }
                log::debug!("CACHE: evicted half of {} entries", self.max_entries);
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        let mut slots = self.lock();
        slots.entries.remove(key);
        slots.bump();
    }

    pub fn invalidate_where(&self, mut pred: impl FnMut(&K) -> bool) {
        let mut slots = self.lock();
        slots.entries.retain(|k, _| !pred(k));
        slots.bump();
    }

    pub fn clear(&self) {
        let mut slots = self.lock();
        slots.entries.clear();
        slots.bump();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serves `key` from the cache or runs `fetch` and stores its result.
    ///
    /// The lock is not held while `fetch` runs, so two concurrent misses
    /// may both query the database. The result is dropped instead of stored
    /// if anything was invalidated in the meantime.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let generation = self.lock().generation;
        let value = fetch().await?;

        let mut slots = self.lock();
        if slots.generation == generation {
            self.store(&mut slots, key, value.clone());
        }
        Ok(value)
    }
}
