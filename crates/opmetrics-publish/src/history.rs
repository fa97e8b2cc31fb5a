//! 윈도우 히스토리.
//!
//! 최신 스냅샷이 앞(인덱스 0)에 오는 bounded 버퍼.
//! 쓰기는 DataSource 틱 태스크만 하고, 읽기는 `Arc` 복제 동안만 락을 잡는다.

use opmetrics_core::error::CoreError;
use opmetrics_core::models::metric::RegistryMetric;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// 생성 시 미리 잡아 두는 최대 슬롯 수. 나머지는 쌓이면서 늘어난다.
const PREALLOCATED_SLOTS: usize = 64;

/// 히스토리 버퍼 (쓰기 쪽)
#[derive(Debug)]
pub(crate) struct History {
    entries: Arc<RwLock<VecDeque<Arc<RegistryMetric>>>>,
    capacity: usize,
}

impl History {
    pub(crate) fn new(capacity: usize) -> Self {
        let entries = VecDeque::with_capacity(capacity.min(PREALLOCATED_SLOTS));
        Self {
            entries: Arc::new(RwLock::new(entries)),
            capacity,
        }
    }

    /// 맨 앞에 추가, 용량 초과 시 가장 오래된 항목 제거. 제거 여부 반환.
    pub(crate) fn push_front(&self, metric: Arc<RegistryMetric>) -> bool {
        let mut entries = self.entries.write();
        entries.push_front(metric);
        if entries.len() > self.capacity {
            entries.pop_back();
            true
        } else {
            false
        }
    }

    pub(crate) fn reader(&self) -> HistoryReader {
        HistoryReader {
            entries: Arc::clone(&self.entries),
        }
    }
}

/// 히스토리 읽기 핸들
///
/// 복제 비용이 싸고, DataSource가 종료된 뒤에도 마지막 내용을 읽을 수 있다.
#[derive(Debug, Clone)]
pub struct HistoryReader {
    entries: Arc<RwLock<VecDeque<Arc<RegistryMetric>>>>,
}

impl HistoryReader {
    /// 윈도우 조회 (0 = 최신)
    pub fn get_metric(&self, window_index: usize) -> Result<Arc<RegistryMetric>, CoreError> {
        let entries = self.entries.read();
        entries
            .get(window_index)
            .cloned()
            .ok_or_else(|| CoreError::OutOfRange {
                index: window_index,
                available: entries.len(),
            })
    }

    /// 최신 윈도우
    pub fn latest(&self) -> Option<Arc<RegistryMetric>> {
        self.entries.read().front().cloned()
    }

    /// 보유 중인 윈도우 수
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
