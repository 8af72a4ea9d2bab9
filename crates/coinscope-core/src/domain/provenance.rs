//! 데이터 출처 태깅.
//!
//! 복구 단계(실시간 → 만료 캐시 → 합성 데이터 → 에러)를 거친 결과가
//! 어느 단계에서 나왔는지 호출자가 데이터 모양으로 추측하지 않고
//! 분기할 수 있도록 결과에 출처를 붙입니다.

use serde::{Deserialize, Serialize};

/// 데이터 출처.
///
/// 순서는 열화 정도를 나타냅니다 (`Fresh` < `Stale` < `Synthetic`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// 제공자에서 받았거나 유효한 캐시에서 읽은 데이터
    Fresh,
    /// 갱신 실패로 만료된 캐시에서 읽은 데이터
    Stale,
    /// 실제 데이터가 없어 클라이언트에서 만든 자리표시 데이터
    Synthetic,
}

impl Provenance {
    /// UI에 "제한된/오프라인 데이터" 표시가 필요한지 여부.
    pub fn is_degraded(self) -> bool {
        self != Provenance::Fresh
    }

    /// 여러 출처를 합칠 때 더 열화된 쪽을 택합니다.
    pub fn combine(self, other: Provenance) -> Provenance {
        self.max(other)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Fresh => write!(f, "fresh"),
            Provenance::Stale => write!(f, "stale"),
            Provenance::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// 출처가 붙은 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    /// 데이터
    pub data: T,
    /// 출처
    pub provenance: Provenance,
}

impl<T> Sourced<T> {
    pub fn new(data: T, provenance: Provenance) -> Self {
        Self { data, provenance }
    }

    pub fn fresh(data: T) -> Self {
        Self::new(data, Provenance::Fresh)
    }

    pub fn stale(data: T) -> Self {
        Self::new(data, Provenance::Stale)
    }

    pub fn synthetic(data: T) -> Self {
        Self::new(data, Provenance::Synthetic)
    }

    /// 합성 데이터 여부.
    pub fn is_synthetic(&self) -> bool {
        self.provenance == Provenance::Synthetic
    }

    /// 출처를 유지한 채 데이터를 변환합니다.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Sourced<U> {
        Sourced {
            data: f(self.data),
            provenance: self.provenance,
        }
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}
