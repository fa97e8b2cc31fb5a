//! 호출 이벤트 모델.
//!
//! 요청 파이프라인이 호출 하나의 생명주기(대기열 진입 → 처리 시작 → 완료)마다
//! 발행하는 이벤트를 정의한다. 모든 시간 값은 나노초 단위.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// 호출 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// 이 인스턴스가 서버로서 operation을 실행
    Producer,
    /// 이 인스턴스가 클라이언트로서 operation을 호출
    Consumer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Producer => write!(f, "PRODUCER"),
            Role::Consumer => write!(f, "CONSUMER"),
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRODUCER" => Ok(Role::Producer),
            "CONSUMER" => Ok(Role::Consumer),
            other => Err(CoreError::InvalidEvent(format!("알 수 없는 role: {other}"))),
        }
    }
}

/// 호출 생명주기 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InvocationEvent {
    /// 호출이 대기열에 들어감
    Started {
        operation_id: String,
        timestamp_nanos: i64,
    },
    /// 호출이 대기열을 떠나 처리 시작
    StartProcessing {
        operation_id: String,
        role: Role,
        timestamp_nanos: i64,
        /// 대기열에 머문 시간
        wait_nanos: i64,
    },
    /// 호출 완료
    Finished {
        operation_id: String,
        role: Role,
        timestamp_nanos: i64,
        /// 순수 처리 시간
        execution_nanos: i64,
        /// role 관점의 종단 간 지연
        latency_nanos: i64,
    },
}

impl InvocationEvent {
    /// 이벤트가 가리키는 operation id
    pub fn operation_id(&self) -> &str {
        match self {
            InvocationEvent::Started { operation_id, .. }
            | InvocationEvent::StartProcessing { operation_id, .. }
            | InvocationEvent::Finished { operation_id, .. } => operation_id,
        }
    }

    /// 이벤트 발생 시각 (나노초)
    pub fn timestamp_nanos(&self) -> i64 {
        match self {
            InvocationEvent::Started {
                timestamp_nanos, ..
            }
            | InvocationEvent::StartProcessing {
                timestamp_nanos, ..
            }
            | InvocationEvent::Finished {
                timestamp_nanos, ..
            } => *timestamp_nanos,
        }
    }

    /// 이벤트 종류 이름 (로그용)
    pub fn kind(&self) -> &'static str {
        match self {
            InvocationEvent::Started { .. } => "started",
            InvocationEvent::StartProcessing { .. } => "start_processing",
            InvocationEvent::Finished { .. } => "finished",
        }
    }

    /// 구조적 유효성 검증
    ///
    /// 빈 operation id, 음수 시간 값은 `InvalidEvent`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.operation_id().trim().is_empty() {
            return Err(CoreError::InvalidEvent(format!(
                "{} 이벤트에 operation id가 없음",
                self.kind()
            )));
        }

        let negative = match self {
            InvocationEvent::Started { .. } => None,
            InvocationEvent::StartProcessing { wait_nanos, .. } => {
                (*wait_nanos < 0).then_some(("wait_nanos", *wait_nanos))
            }
            InvocationEvent::Finished {
                execution_nanos,
                latency_nanos,
                ..
            } => {
                if *execution_nanos < 0 {
                    Some(("execution_nanos", *execution_nanos))
                } else if *latency_nanos < 0 {
                    Some(("latency_nanos", *latency_nanos))
                } else {
                    None
                }
            }
        };

        if let Some((field, value)) = negative {
            return Err(CoreError::InvalidEvent(format!(
                "{}: {field}={value} (음수)",
                self.operation_id()
            )));
        }

        Ok(())
    }
}
