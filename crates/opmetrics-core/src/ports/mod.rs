//! 포트 인터페이스.
//!
//! 집계 엔진과 외부 협력자(이벤트 소스, 시스템 리소스 샘플러) 사이의 경계.

pub mod listener;
pub mod resource;
