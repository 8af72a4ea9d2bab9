//! TTL 기반 인메모리 캐시.
//!
//! 엔트리마다 저장 시각과 TTL을 가지며, `저장 후 경과 시간 > TTL`이면
//! 논리적으로 없는 것으로 취급합니다. 만료 엔트리는 조회 시점에 제거됩니다
//! (별도 타이머 없음).
//!
//! 갱신 실패 시 만료된 값이라도 돌려주는 stale 폴백을 위해 두 가지 읽기
//! 경로를 제공합니다:
//! - [`TtlCache::lookup`]: 만료를 검사하고, 만료 엔트리는 제거하면서 그 값을 함께 반환
//! - [`TtlCache::get_stale`]: 만료를 무시하는 무조건 읽기

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// 캐시 엔트리.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

/// 만료 검사 조회 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    /// 유효한 값
    Fresh(V),
    /// 만료되어 방금 제거된 값
    Expired(V),
    /// 엔트리 없음
    Missing,
}

impl<V> Lookup<V> {
    /// 유효한 값만 꺼냅니다.
    pub fn fresh(self) -> Option<V> {
        match self {
            Lookup::Fresh(value) => Some(value),
            _ => None,
        }
    }
}

/// 캐시 통계 스냅샷.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// 물리적으로 저장된 엔트리 수 (만료 포함)
    pub size: usize,
    /// 최대 엔트리 수
    pub max_size: usize,
}

/// TTL 캐시.
///
/// 새 키를 넣을 때 용량이 가득 차 있으면 가장 오래 전에 저장된 엔트리를
/// 하나 제거합니다. 기존 키 덮어쓰기는 제거를 일으키지 않습니다.
///
/// # Example
///
/// ```
/// use coinscope_client::cache::TtlCache;
/// use std::time::Duration;
///
/// let cache = TtlCache::new(100);
/// cache.set("btc", 100u32, Duration::from_secs(5));
/// assert_eq!(cache.get("btc"), Some(100));
/// ```
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    max_size: usize,
}

impl<V: Clone> TtlCache<V> {
    /// 새 캐시 생성. `max_size`는 최소 1입니다.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_size: max_size.max(1),
        }
    }

    /// 값 저장. 같은 키의 기존 엔트리는 덮어쓰고 TTL 타이머도 다시 시작합니다.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let mut entries = self.entries.lock().unwrap();

        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone());

            if let Some(oldest) = oldest {
                tracing::debug!(evicted = %oldest, max_size = self.max_size, "Cache full, evicting oldest entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// 만료를 검사하며 조회합니다. 만료 엔트리는 제거됩니다.
    pub fn lookup(&self, key: &str) -> Lookup<V> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();

        let expired = match entries.get(key) {
            None => return Lookup::Missing,
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            entries
                .remove(key)
                .map_or(Lookup::Missing, |entry| Lookup::Expired(entry.value))
        } else {
            entries
                .get(key)
                .map_or(Lookup::Missing, |entry| Lookup::Fresh(entry.value.clone()))
        }
    }

    /// 만료 여부를 판별하되 엔트리를 제거하지 않습니다.
    ///
    /// 오케스트레이터가 사용합니다. 갱신이 실패하면 만료 값이 stale 폴백으로 남아 있어야 합니다.
    pub fn peek(&self, key: &str) -> Lookup<V> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            None => Lookup::Missing,
            Some(entry) if entry.is_expired(Instant::now()) => Lookup::Expired(entry.value.clone()),
            Some(entry) => Lookup::Fresh(entry.value.clone()),
        }
    }

    /// 유효한 값 조회. 만료 엔트리는 제거되고 `None`을 반환합니다.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lookup(key).fresh()
    }

    /// 만료를 무시하고 조회합니다 (stale 폴백용). 엔트리를 제거하지 않습니다.
    pub fn get_stale(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|entry| entry.value.clone())
    }
}

impl<V> TtlCache<V> {
    /// 유효한 엔트리 존재 여부. `get`과 마찬가지로 만료 엔트리를 제거합니다.
    pub fn has(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();

        let expired = match entries.get(key) {
            None => return false,
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            entries.remove(key);
        }
        !expired
    }

    /// 모든 엔트리 제거.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// 물리적으로 저장된 엔트리 수 (아직 제거되지 않은 만료 엔트리 포함).
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// 통계 스냅샷.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
        }
    }
}
