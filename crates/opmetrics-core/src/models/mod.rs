//! opmetrics 도메인 모델.
//!
//! 이벤트 소스, 집계 엔진, 발행 레이어가 공유하는 데이터 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod event;
pub mod metric;
pub mod system;
