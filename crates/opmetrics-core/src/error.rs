//! opmetrics 핵심 에러 타입.
//!
//! 어댑터 crate는 `CoreError`를 그대로 반환하거나 `#[from] CoreError`로 래핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 이벤트 검증, 윈도우 조회, 시스템 샘플링, 설정 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 구조적으로 잘못된 호출 이벤트 (알 수 없는 role, 빈 operation id, 음수 시간)
    #[error("잘못된 이벤트: {0}")]
    InvalidEvent(String),

    /// 아직 수집되지 않은 윈도우 조회
    #[error("윈도우 범위 초과: index={index}, 보유 윈도우={available}")]
    OutOfRange {
        /// 요청한 윈도우 인덱스 (0 = 최신)
        index: usize,
        /// 현재 보유 중인 스냅샷 수
        available: usize,
    },

    /// 시스템 리소스 샘플링 실패 (타임아웃 포함)
    #[error("시스템 샘플링 실패: {0}")]
    SampleFailure(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}
