//! 시스템 리소스 샘플러.
//!
//! `SystemResourceProvider` 포트 구현. sysinfo 기반 부하/스레드/메모리 수집.
//!
//! 필드 매핑:
//! - `cpu_load`: 1분 load average
//! - `cpu_running_threads`: 현재 프로세스 스레드 수 (플랫폼이 제공하지 않으면 가용 병렬도)
//! - `heap`: 현재 프로세스 메모리: init=생성 시 RSS, used=RSS, committed=가상 메모리, max=전체 메모리
//! - `non_heap`: 스왑: used/committed=사용 중 스왑, max=전체 스왑

use async_trait::async_trait;
use opmetrics_core::error::CoreError;
use opmetrics_core::models::system::{MemoryUsage, SystemMetric};
use opmetrics_core::ports::resource::SystemResourceProvider;
use std::sync::{Arc, Mutex};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

/// sysinfo 기반 시스템 리소스 제공자: `SystemResourceProvider` 포트 구현
pub struct SysInfoResourceProvider {
    sys: Arc<Mutex<System>>,
    pid: Pid,
    /// 생성 시점 RSS (바이트)
    initial_rss: u64,
}

impl SysInfoResourceProvider {
    /// 새 리소스 제공자 생성
    pub fn new() -> Result<Self, CoreError> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| CoreError::SampleFailure(format!("현재 PID 조회 실패: {e}")))?;

        let mut sys = System::new();
        sys.refresh_memory();
        refresh_process(&mut sys, pid);
        let initial_rss = sys.process(pid).map(|p| p.memory()).unwrap_or(0);

        Ok(Self {
            sys: Arc::new(Mutex::new(sys)),
            pid,
            initial_rss,
        })
    }
}

fn refresh_process(sys: &mut System, pid: Pid) {
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory().with_tasks(),
    );
}

/// u64 → i64 (넘치면 i64::MAX)
fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// 블로킹 수집 본체 (`spawn_blocking` 스레드에서 실행)
fn read_metric(sys: &Mutex<System>, pid: Pid, initial_rss: u64) -> Result<SystemMetric, CoreError> {
    let mut sys = sys
        .lock()
        .map_err(|e| CoreError::SampleFailure(format!("시스템 잠금 실패: {e}")))?;
    sys.refresh_memory();
    refresh_process(&mut sys, pid);

    let process = sys
        .process(pid)
        .ok_or_else(|| CoreError::SampleFailure(format!("프로세스 정보 없음: pid={pid}")))?;

    let cpu_running_threads = match process.tasks() {
        Some(tasks) if !tasks.is_empty() => tasks.len(),
        _ => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    };

    let heap = MemoryUsage {
        init: to_i64(initial_rss),
        used: to_i64(process.memory()),
        committed: to_i64(process.virtual_memory()),
        max: to_i64(sys.total_memory()),
    };

    let used_swap = to_i64(sys.used_swap());
    let non_heap = MemoryUsage {
        init: 0,
        used: used_swap,
        committed: used_swap,
        max: to_i64(sys.total_swap()),
    };

    Ok(SystemMetric {
        cpu_load: System::load_average().one,
        cpu_running_threads: cpu_running_threads as i64,
        heap,
        non_heap,
    })
}

#[async_trait]
impl SystemResourceProvider for SysInfoResourceProvider {
    /// sysinfo 갱신은 블로킹 호출이라 `spawn_blocking`에서 돌린다.
    /// 호출 쪽 타임아웃이 이 대기를 끊을 수 있다.
    async fn sample(&self) -> Result<SystemMetric, CoreError> {
        let sys = Arc::clone(&self.sys);
        let pid = self.pid;
        let initial_rss = self.initial_rss;

        let metric = tokio::task::spawn_blocking(move || read_metric(&sys, pid, initial_rss))
            .await
            .map_err(|e| CoreError::SampleFailure(format!("샘플링 스레드 실패: {e}")))??;

        debug!(
            "시스템 샘플: load {:.2}, 스레드 {}, RSS {}MB",
            metric.cpu_load,
            metric.cpu_running_threads,
            metric.heap.used / 1_048_576
        );

        Ok(metric)
    }
}
