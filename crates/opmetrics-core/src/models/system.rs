//! 시스템 리소스 메트릭 모델.
//!
//! CPU 부하, 실행 중인 스레드, 힙/비힙 메모리 사용량을 표현.
//! 메모리 값은 바이트 단위.

use serde::{Deserialize, Serialize};

/// 메모리 영역 사용량
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// 시작 시점 크기
    pub init: i64,
    /// 현재 사용량
    pub used: i64,
    /// 확보(commit)된 크기
    pub committed: i64,
    /// 최대 크기
    pub max: i64,
}

/// 시스템 리소스 샘플
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetric {
    /// CPU 부하 비율 (보통 0.0 ~ 1.0, 클램프하지 않음)
    pub cpu_load: f64,
    /// 실행 중인 스레드 수
    pub cpu_running_threads: i64,
    /// 힙 메모리
    pub heap: MemoryUsage,
    /// 비힙 메모리
    pub non_heap: MemoryUsage,
}
