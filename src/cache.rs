//! Session-scoped memoization of provider lookups.
//!
//! Every key owns its own slot guarded by an async mutex, so concurrent
//! lookups of the same key share one provider call while different keys
//! proceed in parallel. Failed fetches are never stored and drop their
//! slot; expired slots are swept whenever a new key is added.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rand::RngExt;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::Result;

/// Memoization key: the lookup input plus an optional date for
/// historical lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub input: String,
    pub date: Option<NaiveDate>,
}

impl MemoKey {
    #[must_use]
    pub fn current(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            date: None,
        }
    }

    #[must_use]
    pub fn historical(input: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            input: input.into(),
            date: Some(date),
        }
    }
}

impl fmt::Display for MemoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date {
            Some(date) => write!(f, "{}@{}", self.input, date),
            None => f.write_str(&self.input),
        }
    }
}

struct StoredEntry<T> {
    value: T,
    expires_at: Instant,
}

type Slot<T> = Arc<Mutex<Option<StoredEntry<T>>>>;

pub struct MemoCache<T> {
    slots: RwLock<HashMap<MemoKey, Slot<T>>>,
}

impl<T: Clone + Send> MemoCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    async fn slot(&self, key: &MemoKey) -> Slot<T> {
        if let Some(slot) = self.slots.read().await.get(key) {
            return slot.clone();
        }
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get(key) {
            return slot.clone();
        }
        sweep_expired(&mut slots);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Drop `slot` from the table if it is still the one stored for `key`
    async fn discard(&self, key: &MemoKey, slot: &Slot<T>) {
        let mut slots = self.slots.write().await;
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
    }

    /// Return the fresh value for `key`, or run `fetch` and memoize its
    /// result for roughly `ttl`.
    #[tracing::instrument(name = "memoized", level = "debug", skip(self, key, fetch), fields(key = %key))]
    pub async fn get_or_try_insert_with<F, Fut>(
        &self,
        key: MemoKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let slot = self.slot(&key).await;
        let mut entry = slot.lock().await;

        if let Some(stored) = entry.as_ref() {
            if Instant::now() < stored.expires_at {
                tracing::debug!("Key found and still fresh");
                return Ok(stored.value.clone());
            }
            tracing::debug!("Key found but expired");
        } else {
            tracing::debug!("Key not found");
        }

        let value = match fetch().await {
            Ok(value) => value,
            Err(err) => {
                if entry.is_none() {
                    self.discard(&key, &slot).await;
                }
                return Err(err);
            }
        };
        *entry = Some(StoredEntry {
            value: value.clone(),
            expires_at: Instant::now() + jittered(ttl),
        });
        Ok(value)
    }

    /// Fresh value for `key`, if any
    pub async fn get(&self, key: &MemoKey) -> Option<T> {
        let slot = self.slots.read().await.get(key)?.clone();
        let entry = slot.lock().await;
        entry
            .as_ref()
            .filter(|stored| Instant::now() < stored.expires_at)
            .map(|stored| stored.value.clone())
    }

    /// Drop every memoized value
    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    /// Number of keys currently tracked
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<T: Clone + Send> Default for MemoCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove slots whose value has expired. Slots that are empty or busy
/// belong to a lookup in progress and are kept.
fn sweep_expired<T>(slots: &mut HashMap<MemoKey, Slot<T>>) {
    let now = Instant::now();
    slots.retain(|_, slot| match slot.try_lock() {
        Ok(entry) => entry.as_ref().is_none_or(|stored| now < stored.expires_at),
        Err(_) => true,
    });
}

/// Spread expiries by +-10% so entries filled together do not all lapse
/// in the same instant.
fn jittered(ttl: Duration) -> Duration {
    let jitter: f64 = rand::rng().random_range(0.9..1.1);
    ttl.mul_f64(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AqiError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_second_lookup_is_served_from_memo() {
        let cache = MemoCache::new();
        let calls = AtomicUsize::new(0);
        let key = MemoKey::current("aqi:zip:90001");

        for _ in 0..2 {
            let value = cache
                .get_or_try_insert_with(key.clone(), HOUR, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42u32)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&key).await, Some(42));
    }

    #[tokio::test]
    async fn test_errors_are_not_memoized() {
        let cache: MemoCache<u32> = MemoCache::new();
        let key = MemoKey::current("aqi:zip:95814");

        let first = cache
            .get_or_try_insert_with(key.clone(), HOUR, || async {
                Err(AqiError::not_found("ZIP 95814"))
            })
            .await;
        assert!(first.is_err());
        assert_eq!(cache.get(&key).await, None);

        let second = cache
            .get_or_try_insert_with(key.clone(), HOUR, || async { Ok(88) })
            .await
            .unwrap();
        assert_eq!(second, 88);
    }

    #[tokio::test]
    async fn test_failed_lookups_leave_no_slot() {
        let cache: MemoCache<u32> = MemoCache::new();

        for n in 0..50 {
            let key = MemoKey::current(format!("aqi:coord:{n}"));
            let result = cache
                .get_or_try_insert_with(key, HOUR, || async {
                    Err(AqiError::not_found("nowhere"))
                })
                .await;
            assert!(result.is_err());
        }

        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_slots_are_swept_on_insert() {
        let cache = MemoCache::new();

        cache
            .get_or_try_insert_with(MemoKey::current("aqi:zip:90001"), Duration::ZERO, || async {
                Ok(1u32)
            })
            .await
            .unwrap();
        cache
            .get_or_try_insert_with(MemoKey::current("aqi:zip:95814"), HOUR, || async { Ok(2u32) })
            .await
            .unwrap();

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&MemoKey::current("aqi:zip:95814")).await, Some(2));
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let cache = MemoCache::new();
        let calls = AtomicUsize::new(0);
        let key = MemoKey::current("aqi:zip:93701");

        for _ in 0..2 {
            cache
                .get_or_try_insert_with(key.clone(), Duration::ZERO, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(155u32)
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_historical_keys_are_distinct() {
        let cache = MemoCache::new();
        let day_one = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let day_two = NaiveDate::from_ymd_opt(2024, 8, 2).unwrap();

        cache
            .get_or_try_insert_with(MemoKey::historical("aqi:zip:90001", day_one), HOUR, || async {
                Ok(10u32)
            })
            .await
            .unwrap();
        cache
            .get_or_try_insert_with(MemoKey::historical("aqi:zip:90001", day_two), HOUR, || async {
                Ok(20u32)
            })
            .await
            .unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(
            cache.get(&MemoKey::historical("aqi:zip:90001", day_one)).await,
            Some(10)
        );
        assert_eq!(cache.get(&MemoKey::current("aqi:zip:90001")).await, None);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let cache = Arc::new(MemoCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            async move {
                cache
                    .get_or_try_insert_with(MemoKey::current("aqi:zip:90001"), HOUR, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(42u32)
                    })
                    .await
            }
        });

        let results = futures::future::join_all(tasks).await;
        assert!(results.iter().all(|r| matches!(r, Ok(42))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
