//! 带 TTL 的过期映射，基于时间轮实现
//! TTL'd expiring map backed by the timing wheel
//!
//! 映射的外边界是线程安全的（内部互斥锁保护键到句柄的映射）；
//! 时间轮本身仍遵守单任务所有权规则。过期触发发生在时间轮 actor
//! 的任务上，并在移除映射条目前重新获取同一把锁，以避免与并发的
//! `insert` 竞争同一个键。
//!
//! The map's outer boundary is thread-safe (an internal mutex guards the
//! key-to-handle mapping); the wheel itself keeps its single-task
//! ownership rule. Expiry firing happens on the wheel actor's task and
//! re-acquires the same mutex before removing the map entry, so it cannot
//! race a concurrent `insert` of the same key.

use crate::config::WheelConfig;
use crate::wheel::{ExpiryEntry, ExpiryHandle, WheelHandle, WheelStats, spawn_wheel};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{trace, warn};

/// Invoked with the evicted pair when a key's TTL elapses. Never invoked
/// for explicit [`erase`](ExpiringMap::erase) or for a silently replaced
/// entry.
/// 键的 TTL 到期时以被驱逐的键值对调用。显式
/// [`erase`](ExpiringMap::erase) 或被静默替换的条目不会调用。
pub type EvictionCallback<K, V> = Box<dyn FnOnce(K, V) + Send>;

struct MapEntry<K, V> {
    value: V,
    /// Distinguishes the live arming of a key from stale wheel entries
    /// left behind by replace/erase.
    /// 区分键的当前装载与替换/擦除遗留在时间轮中的陈旧条目。
    generation: u64,
    on_evict: Option<EvictionCallback<K, V>>,
    handle: Option<ExpiryHandle>,
}

struct MapInner<K, V> {
    entries: HashMap<K, MapEntry<K, V>>,
    next_generation: u64,
}

/// A hash map whose entries can expire after a per-key TTL, firing an
/// optional eviction callback.
///
/// TTL is always relative to the *last* insert of the key; re-inserting a
/// live key replaces its wheel entry silently (the old arming never fires
/// its eviction callback). Safe to call from any thread. Dropping the map
/// discards all entries without firing evictions.
///
/// 条目可按每键 TTL 过期并触发可选驱逐回调的哈希映射。
///
/// TTL 始终相对于该键*最后一次* insert；重新插入一个存活的键会静默
/// 替换其时间轮条目（旧装载绝不触发其驱逐回调）。任意线程调用均安全。
/// 丢弃映射会丢弃所有条目且不触发驱逐。
pub struct ExpiringMap<K, V> {
    inner: Arc<Mutex<MapInner<K, V>>>,
    wheel: WheelHandle,
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    /// Creates a map and spawns its owning wheel actor.
    /// 创建映射并启动其所属的时间轮 actor。
    pub fn new(config: WheelConfig) -> Self {
        config.validate();
        let inner = Arc::new(Mutex::new(MapInner {
            entries: HashMap::new(),
            next_generation: 0,
        }));
        let wheel = spawn_wheel(config);
        Self { inner, wheel }
    }

    /// Inserts or overwrites `key`. A zero `ttl` means the entry never
    /// expires. Replacing a live key disarms the previous wheel entry
    /// first, so the old arming is silently inert (its eviction callback
    /// is dropped, never invoked).
    ///
    /// 插入或覆盖 `key`。`ttl` 为零表示永不过期。替换存活的键会先撤防
    /// 之前的时间轮条目，使旧装载静默失效（其驱逐回调被丢弃，绝不调用）。
    pub fn insert(
        &self,
        key: K,
        value: V,
        ttl: Duration,
        on_evict: Option<EvictionCallback<K, V>>,
    ) {
        let generation = {
            let mut inner = self.lock_inner();
            let generation = inner.next_generation;
            inner.next_generation += 1;
            generation
        };

        let handle = if ttl > Duration::ZERO {
            Some(self.make_expiry_entry(key.clone(), generation))
        } else {
            None
        };

        let old = {
            let mut inner = self.lock_inner();
            inner.entries.insert(
                key,
                MapEntry {
                    value,
                    generation,
                    on_evict,
                    handle: handle.clone(),
                },
            )
        };

        if let Some(old) = old {
            // Silent replace: the superseded arming must never evict.
            // 静默替换：被取代的装载绝不触发驱逐。
            if let Some(old_handle) = old.handle {
                old_handle.disarm();
            }
            trace!("Replaced live map entry");
        }

        if let Some(handle) = handle {
            if self.wheel.insert(ttl, handle).is_err() {
                warn!("Wheel actor gone, entry inserted without expiry");
            }
        }
    }

    /// Existence check; does not refresh the TTL.
    /// 存在性检查；不刷新 TTL。
    pub fn contains(&self, key: &K) -> bool {
        self.lock_inner().entries.contains_key(key)
    }

    /// Returns a clone of the stored value; does not refresh the TTL.
    /// Callers needing sliding expiry must re-insert.
    /// 返回所存值的克隆；不刷新 TTL。需要滑动过期的调用方必须重新插入。
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.lock_inner()
            .entries
            .get(key)
            .map(|entry| entry.value.clone())
    }

    /// Applies `f` to the stored value in place under the map lock.
    /// Does not alter the TTL.
    /// 在映射锁保护下对所存值就地应用 `f`。不改变 TTL。
    pub fn modify<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.lock_inner()
            .entries
            .get_mut(key)
            .map(|entry| f(&mut entry.value))
    }

    /// Removes `key` immediately, without invoking its eviction callback.
    /// Erasing an absent key is a no-op. Returns whether a key was removed.
    /// 立即移除 `key`，不调用其驱逐回调。擦除不存在的键为空操作。
    /// 返回是否移除了键。
    pub fn erase(&self, key: &K) -> bool {
        let removed = self.lock_inner().entries.remove(key);
        match removed {
            Some(entry) => {
                if let Some(handle) = entry.handle {
                    handle.disarm();
                }
                true
            }
            None => false,
        }
    }

    /// Number of live entries.
    /// 存活条目数。
    pub fn len(&self) -> usize {
        self.lock_inner().entries.len()
    }

    /// Whether the map holds no entries.
    /// 映射是否为空。
    pub fn is_empty(&self) -> bool {
        self.lock_inner().entries.is_empty()
    }

    /// Snapshot of the backing wheel's state.
    /// 底层时间轮的状态快照。
    pub async fn wheel_stats(&self) -> crate::error::Result<WheelStats> {
        self.wheel.stats().await
    }

    /// Builds the expiry entry for `key`. The action re-enters the map
    /// through a weak reference and a generation check, so firing for a
    /// key that was concurrently erased or replaced is a no-op.
    ///
    /// 为 `key` 构建过期条目。动作通过弱引用与代数检查重入映射，
    /// 因此对已被并发擦除或替换的键触发时是空操作。
    fn make_expiry_entry(&self, key: K, expected: u64) -> ExpiryHandle {
        let weak: Weak<Mutex<MapInner<K, V>>> = Arc::downgrade(&self.inner);

        ExpiryEntry::new(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                trace!("Map gone before expiry fired");
                return;
            };

            let evicted = {
                let mut guard = match inner.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                match guard.entries.get(&key) {
                    Some(entry) if entry.generation == expected => {
                        guard.entries.remove(&key).map(|entry| (entry.value, entry.on_evict))
                    }
                    _ => {
                        // Stale arming: the key was replaced or erased.
                        // 陈旧装载：键已被替换或擦除。
                        trace!("Stale expiry fired, ignoring");
                        None
                    }
                }
            };

            // The user callback runs outside the map lock so it may
            // re-enter the map freely.
            // 用户回调在映射锁之外执行，可自由重入映射。
            if let Some((value, Some(on_evict))) = evicted {
                on_evict(key, value);
            }
        }))
    }

    fn lock_inner(&self) -> MutexGuard<'_, MapInner<K, V>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> WheelConfig {
        WheelConfig {
            tick_interval: Duration::from_millis(100),
            buckets_per_wheel: 16,
            max_timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn insert_and_lookup_without_ttl() {
        let map: ExpiringMap<String, u32> = ExpiringMap::new(test_config());
        map.insert("a".into(), 1, Duration::ZERO, None);
        map.insert("b".into(), 2, Duration::ZERO, None);

        assert!(map.contains(&"a".into()));
        assert_eq!(map.get(&"b".into()), Some(2));
        assert_eq!(map.get(&"c".into()), None);
        assert_eq!(map.len(), 2);
    }

    #[tokio::test]
    async fn modify_mutates_in_place() {
        let map: ExpiringMap<&'static str, Vec<u32>> = ExpiringMap::new(test_config());
        map.insert("k", vec![1], Duration::ZERO, None);

        let len = map.modify(&"k", |v| {
            v.push(2);
            v.len()
        });
        assert_eq!(len, Some(2));
        assert_eq!(map.get(&"k"), Some(vec![1, 2]));
        assert_eq!(map.modify(&"missing", |_| ()), None);
    }

    #[tokio::test]
    async fn erase_is_idempotent_and_silent() {
        let map: ExpiringMap<&'static str, u32> = ExpiringMap::new(test_config());
        let evicted = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let e = evicted.clone();
        map.insert(
            "k",
            7,
            Duration::from_secs(5),
            Some(Box::new(move |_, _| {
                e.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })),
        );

        assert!(map.erase(&"k"));
        assert!(!map.erase(&"k"));
        assert!(!map.erase(&"never-existed"));
        assert_eq!(evicted.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn overwrite_keeps_latest_value() {
        let map: ExpiringMap<&'static str, u32> = ExpiringMap::new(test_config());
        map.insert("k", 1, Duration::ZERO, None);
        map.insert("k", 2, Duration::from_secs(10), None);
        assert_eq!(map.get(&"k"), Some(2));
        assert_eq!(map.len(), 1);
    }
}
