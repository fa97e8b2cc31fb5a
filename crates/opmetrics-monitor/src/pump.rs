//! 이벤트 펌프.
//!
//! 이벤트 소스(호출 스레드)와 모니터 사이의 bounded `mpsc` 채널.
//! 발행은 `try_send`라 호출 경로를 막지 않으며, 채널이 가득 차면 이벤트를 버린다.
//! 소비 태스크가 하나뿐이므로 같은 operation의 이벤트 순서가 유지된다.

use opmetrics_core::models::event::InvocationEvent;
use opmetrics_core::ports::listener::InvocationListener;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 이벤트 발행 핸들 (복제해서 호출 스레드마다 보유)
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<InvocationEvent>,
    /// 채널 포화/종료로 버린 이벤트 수
    dropped: Arc<AtomicU64>,
}

impl EventPublisher {
    /// 이벤트 발행 (논블로킹). 채널에 들어가면 true.
    pub fn publish(&self, event: InvocationEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    "이벤트 채널 포화, 드롭: {} ({}), 누적 {dropped}건",
                    event.operation_id(),
                    event.kind()
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("이벤트 채널 종료됨, 드롭: {}", event.operation_id());
                false
            }
        }
    }

    /// 버린 이벤트 수
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl InvocationListener for EventPublisher {
    fn on_event(&self, event: &InvocationEvent) {
        self.publish(event.clone());
    }
}

/// 이벤트 펌프: 채널 소비 태스크 생성기
pub struct EventPump;

impl EventPump {
    /// 채널과 소비 태스크 생성
    ///
    /// 종료 신호를 받으면 이미 큐에 들어온 이벤트를 모두 전달한 뒤 끝난다.
    /// 태스크는 전달한 이벤트 수를 반환한다.
    pub fn spawn(
        listener: Arc<dyn InvocationListener>,
        capacity: usize,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> (EventPublisher, JoinHandle<u64>) {
        let (tx, mut rx) = mpsc::channel::<InvocationEvent>(capacity.max(1));
        let publisher = EventPublisher {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };

        let handle = tokio::spawn(async move {
            let mut forwarded: u64 = 0;

            loop {
                tokio::select! {
                    maybe_event = rx.recv() => match maybe_event {
                        Some(event) => {
                            listener.on_event(&event);
                            forwarded += 1;
                        }
                        // 모든 발행 핸들이 사라짐
                        None => break,
                    },
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            rx.close();
                            while let Some(event) = rx.recv().await {
                                listener.on_event(&event);
                                forwarded += 1;
                            }
                            break;
                        }
                    }
                }
            }

            info!("이벤트 펌프 종료: 전달 {forwarded}건");
            forwarded
        });

        (publisher, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryMonitor;

    fn started(op: &str) -> InvocationEvent {
        InvocationEvent::Started {
            operation_id: op.to_string(),
            timestamp_nanos: 0,
        }
    }

    #[tokio::test]
    async fn forwards_events_to_monitor() {
        let monitor = Arc::new(RegistryMonitor::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (publisher, handle) = EventPump::spawn(monitor.clone(), 16, shutdown_rx);

        assert!(publisher.publish(started("fun1")));
        assert!(publisher.publish(started("fun1")));

        shutdown_tx.send(true).unwrap();
        let forwarded = handle.await.unwrap();

        assert_eq!(forwarded, 2);
        assert_eq!(
            monitor.snapshot().invocation_metric("fun1").unwrap().wait_in_queue,
            2
        );
    }

    #[tokio::test]
    async fn full_channel_drops_without_blocking() {
        let monitor = Arc::new(RegistryMonitor::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (publisher, handle) = EventPump::spawn(monitor.clone(), 2, shutdown_rx);

        // current_thread 런타임: await 전까지 소비 태스크가 돌지 않음
        assert!(publisher.publish(started("a")));
        assert!(publisher.publish(started("a")));
        assert!(!publisher.publish(started("a")));
        assert_eq!(publisher.dropped(), 1);

        shutdown_tx.send(true).unwrap();
        assert_eq!(handle.await.unwrap(), 2);
        assert_eq!(monitor.snapshot().instance_metric.wait_in_queue, 2);
    }

    #[tokio::test]
    async fn publish_after_shutdown_is_dropped() {
        let monitor = Arc::new(RegistryMonitor::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (publisher, handle) = EventPump::spawn(monitor.clone(), 4, shutdown_rx);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(!publisher.publish(started("late")));
        assert_eq!(publisher.dropped(), 1);
        assert_eq!(monitor.operation_count(), 0);
    }

    #[tokio::test]
    async fn publisher_as_listener() {
        let monitor = Arc::new(RegistryMonitor::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (publisher, handle) = EventPump::spawn(monitor.clone(), 4, shutdown_rx);

        let listener: Arc<dyn InvocationListener> = Arc::new(publisher.clone());
        listener.on_event(&started("fun1"));

        // 발행 핸들이 모두 사라지면 펌프도 끝난다
        drop(listener);
        drop(publisher);
        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(monitor.operation_count(), 1);
    }
}
