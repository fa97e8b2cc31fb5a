//! # opmetrics-app
//!
//! opmetrics 바이너리 진입점.
//! 설정 로드, 어댑터 와이어링, 라이프사이클 관리, 윈도우 리포트.

mod lifecycle;
mod reporter;
mod workload;

use anyhow::{anyhow, Result};
use clap::Parser;
use directories::ProjectDirs;
use opmetrics_core::config_manager::{ConfigManager, CONFIG_FILE_NAME};
use opmetrics_core::ports::resource::SystemResourceProvider;
use opmetrics_monitor::pump::EventPump;
use opmetrics_monitor::registry::RegistryMonitor;
use opmetrics_monitor::system::SysInfoResourceProvider;
use opmetrics_publish::data_source::DataSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;

/// 호출 메트릭 집계 엔진
///
/// 호출 이벤트를 operation/인스턴스 단위 윈도우 통계로 집계한다.
#[derive(Parser, Debug)]
#[command(name = "opmetrics")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 윈도우 주기 (밀리초), 설정 파일 값보다 우선
    #[arg(long)]
    tick_interval: Option<u64>,

    /// 보관할 윈도우 수, 설정 파일 값보다 우선
    #[arg(long)]
    history: Option<usize>,

    /// 합성 부하로 데모 실행
    #[arg(long, short = 'd')]
    demo: bool,
}

/// 설정 파일 경로 결정 (CLI 인자 또는 플랫폼별 기본 경로)
///
/// # 플랫폼별 기본 경로:
/// - macOS: `~/Library/Application Support/io.opmetrics.opmetrics/config.json`
/// - Windows: `%APPDATA%\opmetrics\opmetrics\config\config.json`
/// - Linux: `~/.config/opmetrics/config.json`
fn resolve_config_path(config: Option<&Path>) -> PathBuf {
    config
        .map(Path::to_path_buf)
        .or_else(|| {
            ProjectDirs::from("io", "opmetrics", "opmetrics")
                .map(|p| p.config_dir().join(CONFIG_FILE_NAME))
        })
        .unwrap_or_else(|| PathBuf::from(".").join(CONFIG_FILE_NAME))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // tracing 초기화
    let log_filter = format!(
        "opmetrics={},opmetrics_app={},opmetrics_core={},opmetrics_monitor={},opmetrics_publish={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("opmetrics 시작");

    // 설정 로드 + CLI 오버라이드
    let config_path = resolve_config_path(args.config.as_deref());
    let manager = ConfigManager::with_path(config_path)
        .map_err(|e| anyhow!("설정 로드 실패: {}", e))?;
    let mut config = manager.get();
    if let Some(tick_interval) = args.tick_interval {
        config.metrics.tick_interval_ms = tick_interval;
    }
    if let Some(history) = args.history {
        config.metrics.history_capacity = history;
    }
    config
        .validate()
        .map_err(|e| anyhow!("설정 검증 실패: {}", e))?;

    info!(
        "설정: {} (윈도우 {}ms, 히스토리 {}, 채널 {})",
        manager.config_path().display(),
        config.metrics.tick_interval_ms,
        config.metrics.history_capacity,
        config.events.channel_capacity
    );

    // ── 어댑터 생성 (DI 와이어링) ──
    let lifecycle = LifecycleManager::new();
    let monitor = Arc::new(RegistryMonitor::new());
    let provider: Arc<dyn SystemResourceProvider> = Arc::new(
        SysInfoResourceProvider::new().map_err(|e| anyhow!("시스템 샘플러 생성 실패: {}", e))?,
    );
    let data_source = DataSource::start(monitor.clone(), provider, &config.metrics)
        .map_err(|e| anyhow!("DataSource 시작 실패: {}", e))?;
    let (publisher, pump_handle) = EventPump::spawn(
        monitor.clone(),
        config.events.channel_capacity,
        lifecycle.subscribe(),
    );

    let mut tasks = Vec::new();
    if config.report.enabled {
        tasks.push(tokio::spawn(reporter::run(
            data_source.history(),
            data_source.tick_interval(),
            config.report.log_every_windows,
            lifecycle.subscribe(),
        )));
    }
    if args.demo {
        info!("데모 부하 시작");
        tasks.extend(workload::spawn(publisher.clone(), lifecycle.subscribe()));
    }

    // 종료 대기
    lifecycle.wait_for_signal().await;

    for task in tasks {
        if let Err(e) = task.await {
            warn!("태스크 비정상 종료: {e}");
        }
    }

    let dropped_in_channel = publisher.dropped();
    drop(publisher);
    match pump_handle.await {
        Ok(forwarded) => info!(
            "이벤트 전달 {forwarded}건, 채널 드롭 {dropped_in_channel}건, 검증 드롭 {}건",
            monitor.dropped_events()
        ),
        Err(e) => warn!("이벤트 펌프 비정상 종료: {e}"),
    }

    let history = data_source.shutdown().await;
    info!("opmetrics 종료: 보유 윈도우 {}개", history.len());

    Ok(())
}
