//! 윈도우 리포트 루프.
//!
//! 새 윈도우가 생길 때마다(N개마다 한 번) 요약 한 줄을 `info`로,
//! 전체 스냅샷 JSON을 `debug`로 남긴다.

use chrono::{DateTime, Utc};
use opmetrics_core::models::metric::RegistryMetric;
use opmetrics_publish::history::HistoryReader;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// 윈도우 요약 한 줄
pub fn summarize(metric: &RegistryMetric) -> String {
    let instance = &metric.instance_metric;
    format!(
        "윈도우 {}: operation {}개, 대기열 {}, 처리 평균 {:.2}ms (최대 {:.2}ms), Producer 지연 평균 {:.2}ms, Consumer 지연 평균 {:.2}ms, 부하 {:.2}{}",
        metric.taken_at.format("%H:%M:%S"),
        metric.invocation_metrics.len(),
        instance.wait_in_queue,
        instance.execution_time.average / NANOS_PER_MILLI,
        instance.execution_time.max as f64 / NANOS_PER_MILLI,
        instance.producer_latency.average / NANOS_PER_MILLI,
        instance.consumer_latency.average / NANOS_PER_MILLI,
        instance.system_metric.cpu_load,
        if metric.system_sample_stale {
            " (이전 샘플)"
        } else {
            ""
        },
    )
}

fn report(metric: &RegistryMetric) {
    info!("{}", summarize(metric));
    match serde_json::to_string(metric) {
        Ok(json) => debug!("윈도우 스냅샷: {json}"),
        Err(e) => warn!("윈도우 직렬화 실패: {e}"),
    }
}

/// 리포트 루프 실행 (종료 신호까지)
pub async fn run(
    history: HistoryReader,
    tick_interval: Duration,
    log_every_windows: u32,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let every = log_every_windows.max(1);
    let mut interval = tokio::time::interval_at(Instant::now() + tick_interval, tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_seen: Option<DateTime<Utc>> = None;
    let mut new_windows: u32 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(latest) = history.latest() else {
                    continue;
                };
                if last_seen == Some(latest.taken_at) {
                    continue;
                }
                last_seen = Some(latest.taken_at);
                new_windows += 1;
                if new_windows % every == 0 {
                    report(&latest);
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("리포트 루프 종료");
}
