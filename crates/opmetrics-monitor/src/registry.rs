//! 레지스트리 모니터.
//!
//! operation id → 라이브 셀 매핑과 인스턴스 셀 하나를 소유한다.
//! 모든 이벤트는 인스턴스 셀(전체 롤업)과 해당 operation 셀에 반영되고,
//! `snapshot()`은 라이브 상태의 독립 복사본을 만든다.
//!
//! 락 구조:
//! - 매핑: `RwLock`: 기존 operation 조회는 읽기 락, 새 operation 추가만 쓰기 락
//! - 셀: 셀마다 `Mutex`: 서로 다른 operation은 같은 락을 다투지 않음
//! - 인스턴스: `InstanceRollup` 스트라이프. operation 등록 순서대로 스트라이프를
//!   돌려 배정하므로 프로세스 전체가 한 락에 몰리지 않는다

use chrono::Utc;
use opmetrics_core::models::event::InvocationEvent;
use opmetrics_core::models::metric::RegistryMetric;
use opmetrics_core::ports::listener::InvocationListener;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::invocation::{InstanceRollup, InvocationCell, INSTANCE_STRIPES};

/// 레지스트리 모니터: `InvocationListener` 포트 구현
#[derive(Debug, Default)]
pub struct RegistryMonitor {
    /// 인스턴스 전체 롤업
    instance: InstanceRollup,
    /// operation id → 셀 (첫 이벤트에서 생성)
    operations: RwLock<HashMap<String, Arc<InvocationCell>>>,
    /// 검증 실패로 버린 이벤트 수
    dropped_events: AtomicU64,
}

impl RegistryMonitor {
    /// 빈 모니터 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 이벤트 하나 반영
    ///
    /// 잘못된 이벤트는 로그 후 버리며 상태를 바꾸지 않는다.
    /// 에러를 호출자에게 전파하지 않는다.
    pub fn on_event(&self, event: &InvocationEvent) {
        if let Err(e) = event.validate() {
            let dropped = self.dropped_events.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("이벤트 드롭 ({}): {e}, 누적 드롭 {dropped}건", event.kind());
            return;
        }

        let cell = self.operation_cell(event.operation_id());
        self.instance.apply(cell.stripe(), event);
        cell.apply(event);
    }

    /// operation 셀 조회, 없으면 생성
    fn operation_cell(&self, operation_id: &str) -> Arc<InvocationCell> {
        if let Some(cell) = self.operations.read().get(operation_id) {
            return Arc::clone(cell);
        }

        let mut operations = self.operations.write();
        let stripe = operations.len() % INSTANCE_STRIPES;
        let cell = operations
            .entry(operation_id.to_string())
            .or_insert_with(|| {
                debug!("새 operation 등록: {operation_id}");
                Arc::new(InvocationCell::with_stripe(stripe))
            });
        Arc::clone(cell)
    }

    /// 현재 상태의 독립 복사본
    ///
    /// 셀 단위로 일관적이며, 서로 다른 operation 사이의 시점 일관성은 보장하지 않는다.
    /// 인스턴스의 `system_metric`은 0으로 채워진다.
    pub fn snapshot(&self) -> RegistryMetric {
        let taken_at = Utc::now();

        // 매핑 락은 셀 목록 복사 동안만 유지
        let cells: Vec<(String, Arc<InvocationCell>)> = self
            .operations
            .read()
            .iter()
            .map(|(id, cell)| (id.clone(), Arc::clone(cell)))
            .collect();

        let instance_metric = self.instance.snapshot();
        let invocation_metrics: BTreeMap<_, _> = cells
            .into_iter()
            .map(|(id, cell)| (id, cell.snapshot()))
            .collect();

        RegistryMetric {
            taken_at,
            instance_metric,
            invocation_metrics,
            system_sample_stale: false,
        }
    }

    /// 추적 중인 operation 수
    pub fn operation_count(&self) -> usize {
        self.operations.read().len()
    }

    /// 검증 실패로 버린 이벤트 수
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

impl InvocationListener for RegistryMonitor {
    fn on_event(&self, event: &InvocationEvent) {
        RegistryMonitor::on_event(self, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opmetrics_core::models::event::Role;

    const MS: i64 = 1_000_000;

    fn lifecycle(monitor: &RegistryMonitor, op: &str, wait: i64, exec: i64, latency: i64) {
        monitor.on_event(&InvocationEvent::Started {
            operation_id: op.to_string(),
            timestamp_nanos: 0,
        });
        monitor.on_event(&InvocationEvent::StartProcessing {
            operation_id: op.to_string(),
            role: Role::Producer,
            timestamp_nanos: 1,
            wait_nanos: wait,
        });
        monitor.on_event(&InvocationEvent::Finished {
            operation_id: op.to_string(),
            role: Role::Producer,
            timestamp_nanos: 2,
            execution_nanos: exec,
            latency_nanos: latency,
        });
    }

    #[test]
    fn operations_are_created_lazily() {
        let monitor = RegistryMonitor::new();
        assert_eq!(monitor.operation_count(), 0);
        assert!(monitor.snapshot().invocation_metrics.is_empty());

        lifecycle(&monitor, "fun1", MS, MS, MS);
        assert_eq!(monitor.operation_count(), 1);
    }

    #[test]
    fn instance_aggregates_raw_samples() {
        let monitor = RegistryMonitor::new();
        // 평균의 평균이면 (150 + 500) / 2 = 325가 나와야 함
        lifecycle(&monitor, "a", 100 * MS, 0, 0);
        lifecycle(&monitor, "a", 200 * MS, 0, 0);
        lifecycle(&monitor, "b", 500 * MS, 0, 0);
        lifecycle(&monitor, "a", 150 * MS, 0, 0);

        let snapshot = monitor.snapshot();
        let a = snapshot.invocation_metric("a").unwrap();
        assert_eq!(a.life_time_in_queue.average, 150.0 * MS as f64);

        let instance = &snapshot.instance_metric.life_time_in_queue;
        assert_eq!(instance.count, 4);
        assert_eq!(instance.min, 100 * MS);
        assert_eq!(instance.max, 500 * MS);
        assert_eq!(instance.average, 237.5 * MS as f64);
    }

    #[test]
    fn operations_spread_over_instance_stripes() {
        let monitor = RegistryMonitor::new();
        let ops: Vec<String> = (0..INSTANCE_STRIPES + 4).map(|i| format!("op{i}")).collect();
        for (i, op) in ops.iter().enumerate() {
            lifecycle(&monitor, op, (i as i64 + 1) * MS, MS, MS);
        }

        let stripes: std::collections::HashSet<usize> = ops[..INSTANCE_STRIPES]
            .iter()
            .map(|op| monitor.operation_cell(op).stripe())
            .collect();
        assert_eq!(stripes.len(), INSTANCE_STRIPES);
        // 스트라이프가 한 바퀴 돈 뒤에는 다시 0부터
        assert_eq!(monitor.operation_cell(&ops[INSTANCE_STRIPES]).stripe(), 0);

        let n = ops.len() as i64;
        let instance = monitor.snapshot().instance_metric.life_time_in_queue;
        assert_eq!(instance.count, n as u64);
        assert_eq!(instance.min, MS);
        assert_eq!(instance.max, n * MS);
        assert_eq!(instance.average, ((n + 1) * MS) as f64 / 2.0);
    }

    #[test]
    fn instance_gauge_is_sum_of_operations() {
        let monitor = RegistryMonitor::new();
        for op in ["a", "a", "b", "c", "c", "c"] {
            monitor.on_event(&InvocationEvent::Started {
                operation_id: op.to_string(),
                timestamp_nanos: 0,
            });
        }
        monitor.on_event(&InvocationEvent::StartProcessing {
            operation_id: "c".to_string(),
            role: Role::Consumer,
            timestamp_nanos: 0,
            wait_nanos: 5,
        });

        let snapshot = monitor.snapshot();
        let sum: i64 = snapshot
            .invocation_metrics
            .values()
            .map(|m| m.wait_in_queue)
            .sum();
        assert_eq!(snapshot.invocation_metric("c").unwrap().wait_in_queue, 2);
        assert_eq!(snapshot.instance_metric.wait_in_queue, sum);
        assert_eq!(sum, 5);
    }

    #[test]
    fn invalid_event_is_dropped_without_side_effects() {
        let monitor = RegistryMonitor::new();
        monitor.on_event(&InvocationEvent::Finished {
            operation_id: "fun1".to_string(),
            role: Role::Producer,
            timestamp_nanos: 0,
            execution_nanos: -5,
            latency_nanos: 10,
        });
        monitor.on_event(&InvocationEvent::Started {
            operation_id: String::new(),
            timestamp_nanos: 0,
        });

        assert_eq!(monitor.dropped_events(), 2);
        assert_eq!(monitor.operation_count(), 0);
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.instance_metric.execution_time.count, 0);
        assert_eq!(snapshot.instance_metric.wait_in_queue, 0);
    }

    #[test]
    fn snapshot_is_independent_of_live_state() {
        let monitor = RegistryMonitor::new();
        lifecycle(&monitor, "fun1", MS, 2 * MS, 3 * MS);
        let before = monitor.snapshot();

        lifecycle(&monitor, "fun1", 10 * MS, 20 * MS, 30 * MS);
        lifecycle(&monitor, "fun2", MS, MS, MS);

        assert_eq!(before.invocation_metrics.len(), 1);
        assert_eq!(
            before.invocation_metric("fun1").unwrap().execution_time.count,
            1
        );
        assert_eq!(monitor.snapshot().invocation_metrics.len(), 2);
    }

    #[test]
    fn listener_port_dispatches_to_monitor() {
        let monitor = Arc::new(RegistryMonitor::new());
        let listener: Arc<dyn InvocationListener> = monitor.clone();
        listener.on_event(&InvocationEvent::Started {
            operation_id: "fun1".to_string(),
            timestamp_nanos: 0,
        });

        assert_eq!(
            monitor.snapshot().invocation_metric("fun1").unwrap().wait_in_queue,
            1
        );
    }

    #[test]
    fn concurrent_producers_keep_gauge_arithmetic() {
        let monitor = Arc::new(RegistryMonitor::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let monitor = Arc::clone(&monitor);
                std::thread::spawn(move || {
                    let op = format!("op{}", t % 3);
                    for i in 0..1_000 {
                        monitor.on_event(&InvocationEvent::Started {
                            operation_id: op.clone(),
                            timestamp_nanos: i,
                        });
                        // 4번에 1번은 대기열에 남겨둔다
                        if i % 4 != 0 {
                            monitor.on_event(&InvocationEvent::StartProcessing {
                                operation_id: op.clone(),
                                role: Role::Producer,
                                timestamp_nanos: i,
                                wait_nanos: i,
                            });
                        }
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.instance_metric.wait_in_queue, 8 * 250);
        assert_eq!(snapshot.instance_metric.life_time_in_queue.count, 8 * 750);
        let per_op: i64 = snapshot
            .invocation_metrics
            .values()
            .map(|m| m.wait_in_queue)
            .sum();
        assert_eq!(per_op, 8 * 250);
    }
}
