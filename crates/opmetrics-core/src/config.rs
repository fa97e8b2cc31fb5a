//! 애플리케이션 설정 구조체.
//!
//! 윈도우 주기, 히스토리 크기, 샘플링 타임아웃, 이벤트 채널, 리포트 설정 등
//! 런타임 설정을 정의한다. `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// 보관 가능한 최대 윈도우 수
pub const MAX_HISTORY_CAPACITY: usize = 100_000;

/// 이벤트 채널 최대 용량
pub const MAX_CHANNEL_CAPACITY: usize = 1 << 20;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 메트릭 윈도우 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 이벤트 수신 설정
    #[serde(default)]
    pub events: EventConfig,
    /// 리포트(로그 출력) 설정
    #[serde(default)]
    pub report: ReportConfig,
}

// ============================================================
// 메트릭 윈도우 설정
// ============================================================

/// 메트릭 윈도우 설정: DataSource 틱 주기와 히스토리 크기
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// 윈도우(스냅샷) 주기 (밀리초, 0 불가)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// 보관할 최근 윈도우 수 (0 불가)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// 시스템 리소스 샘플링 타임아웃 (밀리초)
    #[serde(default = "default_sample_timeout_ms")]
    pub sample_timeout_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            history_capacity: default_history_capacity(),
            sample_timeout_ms: default_sample_timeout_ms(),
        }
    }
}

impl MetricsConfig {
    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.tick_interval_ms == 0 {
            return Err(CoreError::Config(
                "tick_interval_ms는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(CoreError::Config(
                "history_capacity는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(CoreError::Config(format!(
                "history_capacity는 {MAX_HISTORY_CAPACITY} 이하여야 합니다: {}",
                self.history_capacity
            )));
        }
        Ok(())
    }

    /// 윈도우 주기를 Duration으로 반환
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// 샘플링 타임아웃을 Duration으로 반환
    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }
}

// ============================================================
// 이벤트 수신 설정
// ============================================================

/// 이벤트 수신 설정: 이벤트 소스와 모니터 사이의 bounded 채널
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConfig {
    /// 채널 용량 (가득 차면 이벤트 드롭)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

// ============================================================
// 리포트 설정
// ============================================================

/// 리포트 설정: 최신 윈도우 요약 로그
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// 요약 로그 활성화
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// N 윈도우마다 한 번 출력
    #[serde(default = "default_log_every_windows")]
    pub log_every_windows: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_every_windows: default_log_every_windows(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            metrics: MetricsConfig::default(),
            events: EventConfig::default(),
            report: ReportConfig::default(),
        }
    }

    /// 전체 설정 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        self.metrics.validate()?;
        if self.events.channel_capacity == 0 {
            return Err(CoreError::Config(
                "channel_capacity는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.events.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(CoreError::Config(format!(
                "channel_capacity는 {MAX_CHANNEL_CAPACITY} 이하여야 합니다: {}",
                self.events.channel_capacity
            )));
        }
        Ok(())
    }

    /// 윈도우 주기를 Duration으로 반환
    pub fn tick_interval(&self) -> Duration {
        self.metrics.tick_interval()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    5_000
}
fn default_history_capacity() -> usize {
    60
}
fn default_sample_timeout_ms() -> u64 {
    1_000
}
fn default_channel_capacity() -> usize {
    4_096
}
fn default_log_every_windows() -> u32 {
    1
}
