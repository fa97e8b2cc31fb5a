//! 누적 통계 (count, min, max, sum).
//!
//! 원시 샘플을 그대로 누적하므로 상위 롤업도 평균의 평균이 아닌
//! 전체 샘플 기준 통계가 된다.

use opmetrics_core::models::metric::StatSnapshot;

/// 누적 통계 셀
///
/// 소유 셀(`InvocationCell`)의 락 안에서만 `record`된다.
/// 동시 호출 안전성과 스냅샷 일관성은 소유 셀이 보장한다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatAccumulator {
    count: u64,
    min: i64,
    max: i64,
    sum: i64,
}

impl StatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 샘플 하나 기록
    pub fn record(&mut self, value: i64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum = self.sum.saturating_add(value);
    }

    /// 다른 누적 통계를 합친다. 원시 합계 기준이라 평균의 평균이 되지 않는다.
    pub fn merge(&mut self, other: &StatAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count += other.count;
        self.sum = self.sum.saturating_add(other.sum);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// 현재 통계 스냅샷. 샘플이 없으면 전부 0.
    pub fn snapshot(&self) -> StatSnapshot {
        if self.count == 0 {
            return StatSnapshot::default();
        }

        StatSnapshot {
            count: self.count,
            min: self.min,
            max: self.max,
            average: self.sum as f64 / self.count as f64,
        }
    }
}
