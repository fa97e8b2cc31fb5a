//! 윈도우 스냅샷 스케줄러.
//!
//! 주기 틱마다 `RegistryMonitor` 스냅샷에 시스템 리소스 샘플을 병합해
//! 최신순 bounded 히스토리에 넣는다. 틱 태스크는 하나이고 순차 실행이라
//! 자기 자신과 겹치지 않으며, 늦어진 틱은 건너뛴다(`MissedTickBehavior::Skip`).
//!
//! 샘플링 실패/타임아웃 시에도 틱은 진행된다. 마지막 정상 샘플(없으면 0)을
//! 재사용하고 `system_sample_stale`로 표시한다.

use opmetrics_core::config::MetricsConfig;
use opmetrics_core::error::CoreError;
use opmetrics_core::models::metric::RegistryMetric;
use opmetrics_core::models::system::SystemMetric;
use opmetrics_core::ports::resource::SystemResourceProvider;
use opmetrics_monitor::registry::RegistryMonitor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::history::{History, HistoryReader};

/// 틱 하나의 작업 (틱 태스크가 단독 소유)
struct Collector {
    monitor: Arc<RegistryMonitor>,
    provider: Arc<dyn SystemResourceProvider>,
    history: History,
    /// 0이면 타임아웃 없음
    sample_timeout: Duration,
    last_good_sample: Option<SystemMetric>,
}

impl Collector {
    /// 제공자 호출은 별도 태스크에서 돈다. 제공자가 패닉해도 틱 태스크는
    /// 살아남고 `SampleFailure`로 처리된다.
    async fn sample(&self) -> Result<SystemMetric, CoreError> {
        let provider = Arc::clone(&self.provider);
        let mut task = tokio::spawn(async move { provider.sample().await });

        let joined = if self.sample_timeout.is_zero() {
            (&mut task).await
        } else {
            match tokio::time::timeout(self.sample_timeout, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return Err(CoreError::SampleFailure(format!(
                        "샘플링 타임아웃: {}ms 초과",
                        self.sample_timeout.as_millis()
                    )));
                }
            }
        };

        match joined {
            Ok(result) => result,
            Err(e) => Err(CoreError::SampleFailure(format!("샘플링 태스크 실패: {e}"))),
        }
    }

    /// 스냅샷 + 샘플 병합 + 히스토리 추가
    async fn tick(&mut self) -> Arc<RegistryMetric> {
        let snapshot = self.monitor.snapshot();

        let (system_metric, stale) = match self.sample().await {
            Ok(sample) => {
                self.last_good_sample = Some(sample);
                (sample, false)
            }
            Err(e) => {
                let fallback = self.last_good_sample.unwrap_or_default();
                warn!(
                    "시스템 샘플 실패, {} 샘플 재사용: {e}",
                    if self.last_good_sample.is_some() {
                        "이전"
                    } else {
                        "0"
                    }
                );
                (fallback, true)
            }
        };

        let metric = Arc::new(snapshot.with_system_metric(system_metric, stale));
        let evicted = self.history.push_front(Arc::clone(&metric));

        debug!(
            "윈도우 수집: operation {}개, 대기열 {}, 오래된 윈도우 제거={}",
            metric.invocation_metrics.len(),
            metric.instance_metric.wait_in_queue,
            evicted
        );

        metric
    }
}

/// 윈도우 스냅샷 스케줄러
///
/// `start`로 생성하면 틱 태스크가 바로 돌기 시작한다.
/// 첫 스냅샷은 한 주기가 지난 뒤에 생긴다.
#[derive(Debug)]
pub struct DataSource {
    reader: HistoryReader,
    tick_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl DataSource {
    /// 설정 검증 후 틱 태스크 시작
    ///
    /// tokio 런타임 안에서 호출해야 한다.
    pub fn start(
        monitor: Arc<RegistryMonitor>,
        provider: Arc<dyn SystemResourceProvider>,
        config: &MetricsConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::Internal(format!("tokio 런타임 없음: {e}")))?;

        let tick_interval = config.tick_interval();
        let history = History::new(config.history_capacity);
        let reader = history.reader();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let mut collector = Collector {
            monitor,
            provider,
            history,
            sample_timeout: config.sample_timeout(),
            last_good_sample: None,
        };

        info!(
            "DataSource 시작: 주기={}ms, 히스토리={}",
            tick_interval.as_millis(),
            config.history_capacity
        );

        let task = runtime.spawn(async move {
            let mut interval =
                tokio::time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        collector.tick().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("DataSource 틱 태스크 종료");
        });

        Ok(Self {
            reader,
            tick_interval,
            shutdown_tx,
            task: Some(task),
        })
    }

    /// 윈도우 조회 (0 = 최신). 아직 없는 윈도우면 `OutOfRange`.
    pub fn get_metric(&self, window_index: usize) -> Result<Arc<RegistryMetric>, CoreError> {
        self.reader.get_metric(window_index)
    }

    /// 최신 윈도우 (없으면 None)
    pub fn latest(&self) -> Option<Arc<RegistryMetric>> {
        self.reader.latest()
    }

    /// 보유 중인 윈도우 수
    pub fn window_count(&self) -> usize {
        self.reader.len()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// 발행 레이어용 읽기 핸들
    pub fn history(&self) -> HistoryReader {
        self.reader.clone()
    }

    /// 틱 태스크 정지. 히스토리는 마지막 상태로 남는다.
    pub async fn shutdown(mut self) -> HistoryReader {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("DataSource 틱 태스크 비정상 종료: {e}");
            }
        }
        self.reader.clone()
    }
}

impl Drop for DataSource {
    fn drop(&mut self) {
        // shutdown()을 거치지 않은 경우에도 틱 태스크를 멈춘다
        let _ = self.shutdown_tx.send(true);
    }
}
