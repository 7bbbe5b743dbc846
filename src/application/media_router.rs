//! Media router - patches active call audio to the sound device

use super::context::SessionContext;
use crate::domain::call::{CallInfo, MediaState, SessionEvent};
use crate::domain::shared::error::{CallError, EngineError};
use crate::domain::shared::value_objects::{CallId, SlotId};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum MediaAction {
    /// Both directed links were requested
    Patched { call_slot: SlotId, device_slot: SlotId },
    /// Media is not active; nothing was connected
    Unrouted(MediaState),
}

/// Outcome of one media state change
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRouting {
    pub info: CallInfo,
    pub action: MediaAction,
    /// Connect requests the engine refused
    pub failures: Vec<CallError>,
}

pub struct MediaRouter {
    ctx: SessionContext,
}

impl MediaRouter {
    /// Router over the session's engine and sink
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// React to a media state change of `call_id`.
    ///
    /// With media active, the call's slot is connected to the device and the
    /// device to the call's slot; the second link is requested even when the
    /// first fails. `media.patched` is recorded only if a link was made.
    /// Any other media state leaves the bridge alone.
    pub async fn on_media_state_changed(&self, call_id: CallId) -> Result<MediaRouting, CallError> {
        let info = self
            .ctx
            .engine
            .call_info(call_id)
            .await
            .map_err(|source| CallError::InfoUnavailable { call_id, source })?;

        if !info.media_state.is_active() {
            debug!("Media for {} is {}", call_id, info.media_state);
            self.ctx
                .sink
                .record(SessionEvent::MediaUnrouted {
                    call_id,
                    media_state: info.media_state,
                })
                .await;
            return Ok(MediaRouting {
                action: MediaAction::Unrouted(info.media_state),
                info,
                failures: Vec::new(),
            });
        }

        let call_slot = info.active_slot().ok_or_else(|| CallError::InfoUnavailable {
            call_id,
            source: EngineError::Internal(format!("Active media without a slot on {}", call_id)),
        })?;
        let device_slot = self.ctx.device_slot;

        let mut failures = Vec::new();
        for (from, to) in [(call_slot, device_slot), (device_slot, call_slot)] {
            if let Err(source) = self.ctx.engine.connect_slot(from, to).await {
                failures.push(CallError::MediaConnectFailure {
                    call_id,
                    from,
                    to,
                    source,
                });
            }
        }

        // Patched means at least one direction carries audio
        if failures.len() < 2 {
            self.ctx
                .sink
                .record(SessionEvent::MediaPatched {
                    call_id,
                    call_slot,
                    device_slot,
                })
                .await;
        } else {
            debug!("No link made for {}", call_id);
        }
        Ok(MediaRouting {
            info,
            action: MediaAction::Patched {
                call_slot,
                device_slot,
            },
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::SignalingState;
    use crate::infrastructure::engine::MockSignalingEngine;
    use crate::infrastructure::observability::MemorySink;
    use mockall::predicate::eq;
    use std::sync::Arc;

    fn engine_reporting(media_state: MediaState, slot: Option<SlotId>) -> MockSignalingEngine {
        let mut engine = MockSignalingEngine::new();
        engine.expect_call_info().returning(move |call_id| {
            Ok(CallInfo::new(call_id, "sip:bob@example.com", SignalingState::Confirmed)
                .with_media(media_state, slot))
        });
        engine
    }

    fn router(engine: MockSignalingEngine, sink: &MemorySink) -> MediaRouter {
        MediaRouter::new(SessionContext::new(
            Arc::new(engine),
            Arc::new(sink.clone()),
            SlotId::SOUND_DEVICE,
        ))
    }

    #[tokio::test]
    async fn test_active_media_connects_both_directions() {
        let mut engine = engine_reporting(MediaState::Active, Some(SlotId::new(3)));
        engine
            .expect_connect_slot()
            .with(eq(SlotId::new(3)), eq(SlotId::new(0)))
            .times(1)
            .returning(|_, _| Ok(()));
        engine
            .expect_connect_slot()
            .with(eq(SlotId::new(0)), eq(SlotId::new(3)))
            .times(1)
            .returning(|_, _| Ok(()));
        let sink = MemorySink::default();

        let routing = router(engine, &sink)
            .on_media_state_changed(CallId::new(7))
            .await
            .unwrap();
        assert_eq!(
            routing.action,
            MediaAction::Patched {
                call_slot: SlotId::new(3),
                device_slot: SlotId::new(0)
            }
        );
        assert!(routing.failures.is_empty());
        assert_eq!(sink.count("media.patched").await, 1);
    }

    #[tokio::test]
    async fn test_inactive_media_connects_nothing() {
        for state in [MediaState::None, MediaState::Inactive, MediaState::Error] {
            // Any connect_slot call would panic
            let engine = engine_reporting(state, None);
            let sink = MemorySink::default();

            let routing = router(engine, &sink)
                .on_media_state_changed(CallId::new(7))
                .await
                .unwrap();
            assert_eq!(routing.action, MediaAction::Unrouted(state));
        }
    }

    #[tokio::test]
    async fn test_connect_failure_is_collected() {
        let mut engine = engine_reporting(MediaState::Active, Some(SlotId::new(4)));
        engine
            .expect_connect_slot()
            .times(2)
            .returning(|from, _| {
                if from == SlotId::new(4) {
                    Err(EngineError::NotFound(format!("No such slot: {}", from)))
                } else {
                    Ok(())
                }
            });
        let sink = MemorySink::default();

        let routing = router(engine, &sink)
            .on_media_state_changed(CallId::new(7))
            .await
            .unwrap();
        assert_eq!(routing.failures.len(), 1);
        assert!(matches!(
            &routing.failures[0],
            CallError::MediaConnectFailure { from, to, .. }
                if *from == SlotId::new(4) && *to == SlotId::SOUND_DEVICE
        ));
        assert_eq!(sink.count("media.patched").await, 1);
    }

    #[tokio::test]
    async fn test_no_patched_event_when_both_links_fail() {
        let mut engine = engine_reporting(MediaState::Active, Some(SlotId::new(4)));
        engine
            .expect_connect_slot()
            .times(2)
            .returning(|from, to| Err(EngineError::NotFound(format!("{} -> {}", from, to))));
        let sink = MemorySink::default();

        let routing = router(engine, &sink)
            .on_media_state_changed(CallId::new(7))
            .await
            .unwrap();
        assert_eq!(routing.failures.len(), 2);
        assert_eq!(sink.count("media.patched").await, 0);
    }
}
