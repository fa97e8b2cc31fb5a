//! # opmetrics-publish
//!
//! 라이브 집계 상태와 읽기 쪽을 분리하는 윈도우 스냅샷 스케줄러.
//!
//! - [`data_source`]: 주기 틱마다 스냅샷을 만들어 히스토리에 쌓는 `DataSource`
//! - [`history`]: 최신순 bounded 히스토리와 읽기 핸들

pub mod data_source;
pub mod history;
