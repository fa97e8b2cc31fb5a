//! 호출 메트릭 스냅샷 모델.
//!
//! 집계 엔진의 라이브 상태를 특정 시점에 복사한 불변 값들.
//! 라이브 상태에 대한 역참조가 없으므로 발행 레이어에 무기한 넘겨도 안전하다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::system::SystemMetric;

/// 누적 통계 스냅샷 (나노초)
///
/// 샘플이 없으면 모든 값이 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    /// 기록된 샘플 수
    pub count: u64,
    pub min: i64,
    pub max: i64,
    /// 실수 나눗셈 평균 (sum / count)
    pub average: f64,
}

/// operation 하나의 메트릭
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationMetric {
    /// 대기열에 있으나 아직 처리되지 않은 호출 수 (Started − StartProcessing)
    pub wait_in_queue: i64,
    /// 대기열 체류 시간
    pub life_time_in_queue: StatSnapshot,
    /// 처리 시간
    pub execution_time: StatSnapshot,
    /// Producer 지연
    pub producer_latency: StatSnapshot,
    /// Consumer 지연
    pub consumer_latency: StatSnapshot,
}

/// 프로세스 전체 메트릭
///
/// 모든 operation의 원시 샘플을 합친 통계 + 시스템 리소스 샘플.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetric {
    pub wait_in_queue: i64,
    pub life_time_in_queue: StatSnapshot,
    pub execution_time: StatSnapshot,
    pub producer_latency: StatSnapshot,
    pub consumer_latency: StatSnapshot,
    /// 시스템 리소스 샘플 (DataSource가 틱마다 병합)
    pub system_metric: SystemMetric,
}

/// 한 윈도우의 레지스트리 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryMetric {
    /// 스냅샷 시각
    pub taken_at: DateTime<Utc>,
    pub instance_metric: InstanceMetric,
    /// operation id → 메트릭
    pub invocation_metrics: BTreeMap<String, OperationMetric>,
    /// 시스템 샘플링이 실패해 이전 샘플(또는 0)을 재사용했는지 여부
    #[serde(default)]
    pub system_sample_stale: bool,
}

impl RegistryMetric {
    /// operation id로 메트릭 조회
    pub fn invocation_metric(&self, operation_id: &str) -> Option<&OperationMetric> {
        self.invocation_metrics.get(operation_id)
    }

    /// 시스템 샘플 병합
    pub fn with_system_metric(mut self, system_metric: SystemMetric, stale: bool) -> Self {
        self.instance_metric.system_metric = system_metric;
        self.system_sample_stale = stale;
        self
    }
}
