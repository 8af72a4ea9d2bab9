//! 진행 중인 요청 중복 제거.
//!
//! 같은 키로 동시에 들어온 요청은 하나의 작업을 공유하고, 모든 호출자가
//! 같은 결과(성공이든 실패든)를 받습니다. 작업은 별도 태스크에서 실행되므로
//! 기다리던 호출자가 모두 취소되어도 끝까지 진행되고, 끝나는 즉시 키가
//! 해제됩니다. 실패 결과는 캐시되지 않습니다.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::Instrument;

type InFlight<T> = Shared<BoxFuture<'static, T>>;
type Registry<T> = Arc<Mutex<HashMap<String, InFlight<T>>>>;

/// 태스크가 끝나면(정상 종료, 패닉, 런타임 종료 모두) 키를 해제합니다.
struct SettleGuard<T>
where
    T: Clone + Send + Sync + 'static,
{
    registry: Registry<T>,
    key: String,
}

impl<T> Drop for SettleGuard<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.registry.lock() {
            in_flight.remove(&self.key);
        }
    }
}

/// 키 단위 요청 중복 제거기.
pub struct RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    in_flight: Registry<T>,
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `key`로 진행 중인 작업이 있으면 합류하고, 없으면 `operation`을 시작합니다.
    ///
    /// `operation`은 새 작업을 시작할 때만 호출되며 tokio 런타임 안에서 호출해야 합니다.
    pub async fn deduplicate<F, Fut>(&self, key: &str, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap();

            if let Some(existing) = in_flight.get(key) {
                tracing::debug!(key, "Joining in-flight request");
                existing.clone()
            } else {
                let guard = SettleGuard {
                    registry: Arc::clone(&self.in_flight),
                    key: key.to_string(),
                };
                let task = operation();

                // 레지스트리 잠금을 쥔 채 spawn하므로 태스크의 키 해제는 등록 이후에만 일어남
                let handle = tokio::spawn(
                    async move {
                        let _guard = guard;
                        task.await
                    }
                    .in_current_span(),
                );

                let shared = async move {
                    match handle.await {
                        Ok(output) => output,
                        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                        // 런타임 종료로 취소된 경우. 대기자도 런타임과 함께 정리됨
                        Err(_) => futures::future::pending().await,
                    }
                }
                .boxed()
                .shared();

                in_flight.insert(key.to_string(), shared.clone());
                shared
            }
        };

        shared.await
    }

    /// 진행 중인 키 수.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    /// 해당 키의 작업이 진행 중인지 확인.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().unwrap().contains_key(key)
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
