//! In-memory sink, bounded, oldest events dropped first

use super::ObservabilitySink;
use crate::domain::call::SessionEvent;
use crate::domain::shared::error::CallError;
use crate::domain::shared::value_objects::CallId;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory event sink
#[derive(Clone)]
pub struct MemorySink {
    events: Arc<RwLock<VecDeque<SessionEvent>>>,
    max_events: usize,
}

impl MemorySink {
    /// Sink keeping at most `max_events` events
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(VecDeque::new())),
            max_events,
        }
    }

    /// Recorded events, oldest first
    pub async fn events(&self) -> Vec<SessionEvent> {
        self.events.read().await.iter().cloned().collect()
    }

    /// Events concerning one call
    pub async fn events_for(&self, call_id: CallId) -> Vec<SessionEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.call_id() == Some(call_id))
            .cloned()
            .collect()
    }

    /// Non-fatal per-call failures
    pub async fn failures(&self) -> Vec<CallError> {
        self.events
            .read()
            .await
            .iter()
            .filter_map(|event| match event {
                SessionEvent::CallFailure(failure) => Some(failure.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded events of `event_type`, e.g. `"call.answered"`
    pub async fn count(&self, event_type: &str) -> usize {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.event_type() == event_type)
            .count()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl ObservabilitySink for MemorySink {
    async fn record(&self, event: SessionEvent) {
        let mut events = self.events.write().await;
        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::error::EngineError;

    #[tokio::test]
    async fn test_bounded() {
        let sink = MemorySink::new(2);
        for status in [180, 183, 200] {
            sink.record(SessionEvent::CallAnswered {
                call_id: CallId::new(1),
                status,
            })
            .await;
        }

        let events = sink.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            SessionEvent::CallAnswered {
                call_id: CallId::new(1),
                status: 183
            }
        );
    }

    #[test]
    fn test_clones_share_events() {
        let sink = MemorySink::default();
        let clone = sink.clone();
        tokio_test::block_on(async {
            clone.record(SessionEvent::SessionShutdown).await;
            assert_eq!(sink.count("session.shutdown").await, 1);
        });
    }

    #[tokio::test]
    async fn test_filters() {
        let sink = MemorySink::default();
        sink.record(SessionEvent::CallAnswered {
            call_id: CallId::new(1),
            status: 200,
        })
        .await;
        sink.record(SessionEvent::CallFailure(CallError::AnswerFailure {
            call_id: CallId::new(2),
            source: EngineError::NotFound("call#2".to_string()),
        }))
        .await;

        assert_eq!(sink.events_for(CallId::new(2)).await.len(), 1);
        assert_eq!(sink.failures().await.len(), 1);
        assert_eq!(sink.count("call.answered").await, 1);
        assert_eq!(sink.events().await.len(), 2);
    }
}
