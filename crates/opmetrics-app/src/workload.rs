//! 데모용 합성 부하.
//!
//! 몇 개의 operation 이름으로 Started → StartProcessing → Finished 생명주기를
//! 반복 발행한다. 시간 값은 카운터에서 유도한 결정적 패턴.

use opmetrics_core::models::event::{InvocationEvent, Role};
use opmetrics_monitor::pump::EventPublisher;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// (operation, role, 기본 처리 시간 ms)
const DEMO_OPERATIONS: &[(&str, Role, i64)] = &[
    ("user.get", Role::Producer, 3),
    ("user.update", Role::Producer, 12),
    ("order.create", Role::Producer, 25),
    ("inventory.check", Role::Consumer, 8),
];

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// 생명주기 한 번의 이벤트 3개
pub fn lifecycle_events(
    operation_id: &str,
    role: Role,
    base_exec_ms: i64,
    round: u64,
) -> [InvocationEvent; 3] {
    // 0..=9 반복 패턴으로 값을 흔든다
    let jitter = (round.wrapping_mul(7) % 10) as i64;
    let wait = (1 + jitter) * NANOS_PER_MILLI;
    let execution = (base_exec_ms + jitter) * NANOS_PER_MILLI;
    let latency = wait + execution + 2 * NANOS_PER_MILLI;
    let start = now_nanos();

    [
        InvocationEvent::Started {
            operation_id: operation_id.to_string(),
            timestamp_nanos: start,
        },
        InvocationEvent::StartProcessing {
            operation_id: operation_id.to_string(),
            role,
            timestamp_nanos: start + wait,
            wait_nanos: wait,
        },
        InvocationEvent::Finished {
            operation_id: operation_id.to_string(),
            role,
            timestamp_nanos: start + latency,
            execution_nanos: execution,
            latency_nanos: latency,
        },
    ]
}

/// operation마다 발행 태스크 하나씩 시작
pub fn spawn(
    publisher: EventPublisher,
    shutdown_rx: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    DEMO_OPERATIONS
        .iter()
        .map(|&(operation_id, role, base_exec_ms)| {
            let publisher = publisher.clone();
            let mut shutdown_rx = shutdown_rx.clone();
            let pause = Duration::from_millis(50 + base_exec_ms as u64);

            tokio::spawn(async move {
                let mut round: u64 = 0;
                let mut interval = tokio::time::interval(pause);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            for event in lifecycle_events(operation_id, role, base_exec_ms, round) {
                                publisher.publish(event);
                            }
                            round += 1;
                        }
                        changed = shutdown_rx.changed() => {
                            if changed.is_err() || *shutdown_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
                debug!("데모 부하 종료: {operation_id}, {round}회");
            })
        })
        .collect()
}
