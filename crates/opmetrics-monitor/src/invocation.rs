//! 라이브 호출 메트릭 셀.
//!
//! operation 하나(또는 인스턴스 전체)의 대기열 게이지와 누적 통계 네 개.
//! 셀마다 락 하나로 보호되어 같은 셀에 대한 갱신은 선형화되고,
//! 스냅샷은 네 통계를 한 시점 기준으로 복사한다.
//!
//! 인스턴스 롤업(`InstanceRollup`)은 셀 여러 개로 나뉜 스트라이프 구조다.
//! operation마다 스트라이프 하나가 배정되어 서로 다른 operation의 이벤트는
//! 인스턴스 쪽에서도 대부분 다른 락을 잡는다. 스냅샷은 스트라이프의
//! 원시 누적값을 합쳐 만든다.

use opmetrics_core::models::event::{InvocationEvent, Role};
use opmetrics_core::models::metric::{InstanceMetric, OperationMetric};
use parking_lot::Mutex;

use crate::stat::StatAccumulator;

/// 셀 내부 상태 (락 안에서만 접근)
#[derive(Debug, Clone, Copy, Default)]
struct CellState {
    wait_in_queue: i64,
    life_time_in_queue: StatAccumulator,
    execution_time: StatAccumulator,
    producer_latency: StatAccumulator,
    consumer_latency: StatAccumulator,
}

impl CellState {
    fn apply(&mut self, event: &InvocationEvent) {
        match event {
            InvocationEvent::Started { .. } => {
                self.wait_in_queue += 1;
            }
            InvocationEvent::StartProcessing { wait_nanos, .. } => {
                // 짝 없는 StartProcessing이면 음수가 될 수 있음 (데이터 품질 신호)
                self.wait_in_queue -= 1;
                self.life_time_in_queue.record(*wait_nanos);
            }
            InvocationEvent::Finished {
                role,
                execution_nanos,
                latency_nanos,
                ..
            } => {
                self.execution_time.record(*execution_nanos);
                match role {
                    Role::Producer => self.producer_latency.record(*latency_nanos),
                    Role::Consumer => self.consumer_latency.record(*latency_nanos),
                }
            }
        }
    }

    fn merge(&mut self, other: &CellState) {
        self.wait_in_queue += other.wait_in_queue;
        self.life_time_in_queue.merge(&other.life_time_in_queue);
        self.execution_time.merge(&other.execution_time);
        self.producer_latency.merge(&other.producer_latency);
        self.consumer_latency.merge(&other.consumer_latency);
    }

    fn to_operation_metric(self) -> OperationMetric {
        OperationMetric {
            wait_in_queue: self.wait_in_queue,
            life_time_in_queue: self.life_time_in_queue.snapshot(),
            execution_time: self.execution_time.snapshot(),
            producer_latency: self.producer_latency.snapshot(),
            consumer_latency: self.consumer_latency.snapshot(),
        }
    }
}

/// 라이브 메트릭 셀
#[derive(Debug, Default)]
pub struct InvocationCell {
    state: Mutex<CellState>,
    /// 인스턴스 롤업에서 이 셀의 이벤트가 들어갈 스트라이프
    stripe: usize,
}

impl InvocationCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stripe(stripe: usize) -> Self {
        Self {
            state: Mutex::default(),
            stripe,
        }
    }

    pub fn stripe(&self) -> usize {
        self.stripe
    }

    /// 이벤트 반영 (검증은 호출자 몫)
    pub fn apply(&self, event: &InvocationEvent) {
        self.state.lock().apply(event);
    }

    /// 현재 대기열 게이지
    pub fn wait_in_queue(&self) -> i64 {
        self.state.lock().wait_in_queue
    }

    /// operation 메트릭 스냅샷
    pub fn snapshot(&self) -> OperationMetric {
        // 락은 상태 복사 동안만 잡는다
        let state = *self.state.lock();
        state.to_operation_metric()
    }
}

/// 인스턴스 롤업 스트라이프 수
pub const INSTANCE_STRIPES: usize = 16;

/// 인스턴스 전체 롤업 (스트라이프 셀 묶음)
#[derive(Debug)]
pub struct InstanceRollup {
    stripes: Vec<InvocationCell>,
}

impl Default for InstanceRollup {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceRollup {
    pub fn new() -> Self {
        Self {
            stripes: (0..INSTANCE_STRIPES).map(InvocationCell::with_stripe).collect(),
        }
    }

    /// 이벤트 반영. 범위를 넘는 스트라이프 번호는 나머지로 접는다.
    pub fn apply(&self, stripe: usize, event: &InvocationEvent) {
        self.stripes[stripe % self.stripes.len()].apply(event);
    }

    /// 인스턴스 메트릭 스냅샷 (system_metric은 0, DataSource가 병합)
    ///
    /// 스트라이프마다 자기 락 안에서 복사하므로 스트라이프 단위로 일관적이다.
    pub fn snapshot(&self) -> InstanceMetric {
        let mut total = CellState::default();
        for stripe in &self.stripes {
            let state = *stripe.state.lock();
            total.merge(&state);
        }

        let metric = total.to_operation_metric();
        InstanceMetric {
            wait_in_queue: metric.wait_in_queue,
            life_time_in_queue: metric.life_time_in_queue,
            execution_time: metric.execution_time,
            producer_latency: metric.producer_latency,
            consumer_latency: metric.consumer_latency,
            system_metric: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> InvocationEvent {
        InvocationEvent::Started {
            operation_id: "op".to_string(),
            timestamp_nanos: 0,
        }
    }

    fn processing(wait: i64) -> InvocationEvent {
        InvocationEvent::StartProcessing {
            operation_id: "op".to_string(),
            role: Role::Producer,
            timestamp_nanos: 0,
            wait_nanos: wait,
        }
    }

    fn finished(role: Role, exec: i64, latency: i64) -> InvocationEvent {
        InvocationEvent::Finished {
            operation_id: "op".to_string(),
            role,
            timestamp_nanos: 0,
            execution_nanos: exec,
            latency_nanos: latency,
        }
    }

    #[test]
    fn gauge_follows_started_minus_processing() {
        let cell = InvocationCell::new();
        cell.apply(&started());
        cell.apply(&started());
        cell.apply(&started());
        cell.apply(&processing(10));

        assert_eq!(cell.wait_in_queue(), 2);
        assert_eq!(cell.snapshot().life_time_in_queue.count, 1);
    }

    #[test]
    fn unmatched_processing_makes_gauge_negative() {
        let cell = InvocationCell::new();
        cell.apply(&processing(10));
        assert_eq!(cell.wait_in_queue(), -1);
    }

    #[test]
    fn producer_finish_never_touches_consumer_latency() {
        let cell = InvocationCell::new();
        cell.apply(&finished(Role::Producer, 200, 300));

        let metric = cell.snapshot();
        assert_eq!(metric.execution_time.count, 1);
        assert_eq!(metric.producer_latency.max, 300);
        assert_eq!(metric.consumer_latency.count, 0);
    }

    #[test]
    fn consumer_finish_never_touches_producer_latency() {
        let cell = InvocationCell::new();
        cell.apply(&finished(Role::Consumer, 50, 80));

        let metric = cell.snapshot();
        assert_eq!(metric.consumer_latency.min, 80);
        assert_eq!(metric.producer_latency.count, 0);
    }

    #[test]
    fn finish_without_processing_still_records() {
        let cell = InvocationCell::new();
        cell.apply(&finished(Role::Producer, 200, 300));

        let metric = cell.snapshot();
        assert_eq!(metric.wait_in_queue, 0);
        assert_eq!(metric.execution_time.average, 200.0);
    }

    #[test]
    fn rollup_merges_stripes_from_raw_samples() {
        let rollup = InstanceRollup::new();
        rollup.apply(0, &started());
        rollup.apply(3, &started());
        rollup.apply(3, &processing(100));
        rollup.apply(0, &finished(Role::Producer, 100, 300));
        rollup.apply(3, &finished(Role::Producer, 200, 500));
        rollup.apply(3, &finished(Role::Producer, 300, 700));

        let metric = rollup.snapshot();
        assert_eq!(metric.wait_in_queue, 1);
        assert_eq!(metric.execution_time.count, 3);
        assert_eq!(metric.execution_time.min, 100);
        assert_eq!(metric.execution_time.max, 300);
        // 스트라이프 평균(100, 250)의 평균이 아니라 전체 평균
        assert_eq!(metric.execution_time.average, 200.0);
        assert_eq!(metric.producer_latency.average, 500.0);
        assert_eq!(metric.system_metric, Default::default());
    }

    #[test]
    fn rollup_folds_out_of_range_stripe() {
        let rollup = InstanceRollup::new();
        rollup.apply(INSTANCE_STRIPES + 2, &started());
        assert_eq!(rollup.snapshot().wait_in_queue, 1);
        assert_eq!(rollup.stripes[2].wait_in_queue(), 1);
    }

    #[test]
    fn empty_rollup_is_zero() {
        let metric = InstanceRollup::new().snapshot();
        assert_eq!(metric, InstanceMetric::default());
    }
}
