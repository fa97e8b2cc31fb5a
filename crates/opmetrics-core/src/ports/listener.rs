//! 호출 이벤트 수신 포트.
//!
//! 구현: `opmetrics-monitor` crate (`RegistryMonitor`)

use crate::models::event::InvocationEvent;

/// 호출 이벤트 수신자
///
/// 호출 경로(hot path)에서 직접 불리므로 블로킹/패닉/에러 전파를 하지 않는다.
pub trait InvocationListener: Send + Sync {
    /// 이벤트 하나 반영 (fire-and-forget)
    fn on_event(&self, event: &InvocationEvent);
}
