//! # opmetrics-monitor
//!
//! 호출 메트릭 집계 엔진.
//! 호출 생명주기 이벤트를 operation별/인스턴스별 누적 통계로 롤업하고,
//! 시점 일관 스냅샷을 만든다. sysinfo 기반 시스템 리소스 어댑터 포함.

pub mod invocation;
pub mod pump;
pub mod registry;
pub mod stat;
pub mod system;
