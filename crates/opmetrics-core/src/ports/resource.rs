//! 시스템 리소스 샘플링 포트.
//!
//! 구현: `opmetrics-monitor` crate (sysinfo 기반)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::system::SystemMetric;

/// 시스템 리소스 제공자 (CPU 부하, 스레드, 메모리)
#[async_trait]
pub trait SystemResourceProvider: Send + Sync {
    /// 현재 시스템 리소스 샘플 수집
    async fn sample(&self) -> Result<SystemMetric, CoreError>;
}
