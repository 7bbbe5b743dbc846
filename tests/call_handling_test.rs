//! Inbound call handling: auto-answer, state tracking and media routing,
//! driven through the local engine's network side.

mod common;

use autoanswer::domain::call::{MediaState, SignalingState};
use autoanswer::domain::shared::value_objects::{CallId, SlotId};
use autoanswer::infrastructure::engine::{EngineCall, SignalingEngine};
use autoanswer::{CallError, EngineError};
use common::Harness;

const BOB: &str = "\"Bob\" <sip:bob@example.com>";

#[tokio::test]
async fn test_incoming_call_is_answered_once_with_200() {
    let harness = Harness::new();
    let handle = harness.start().await;
    let call_id = CallId::new(7);

    harness
        .driver
        .incoming_call_with_id(call_id, BOB)
        .await
        .unwrap();
    harness.driver.settle().await;

    assert_eq!(harness.engine.answers_for(call_id).await, vec![200]);

    // The engine never hands out the same call twice
    let duplicate = harness.driver.incoming_call_with_id(call_id, BOB).await;
    assert!(matches!(duplicate, Err(EngineError::InvalidArgument(_))));
    harness.driver.settle().await;
    assert_eq!(harness.engine.answers_for(call_id).await, vec![200]);

    let record = handle.call(call_id).await.expect("Call should be tracked");
    assert_eq!(record.remote_party(), BOB);
    assert_eq!(record.state(), SignalingState::Connecting);
    assert_eq!(record.last_status(), Some(200));
    assert_eq!(harness.sink.count("call.answered").await, 1);
}

#[tokio::test]
async fn test_every_call_gets_exactly_one_answer() {
    let harness = Harness::new();
    let _handle = harness.start().await;

    let mut ids = Vec::new();
    for n in 0..5 {
        let remote = format!("sip:caller{}@example.com", n);
        ids.push(harness.driver.incoming_call(&remote).await.unwrap());
    }
    harness.driver.settle().await;

    for call_id in ids {
        assert_eq!(harness.engine.answers_for(call_id).await, vec![200]);
    }
}

#[tokio::test]
async fn test_active_media_is_patched_both_ways() {
    let harness = Harness::new();
    let handle = harness.start().await;
    let call_id = CallId::new(7);

    harness.driver.incoming_call_with_id(call_id, BOB).await.unwrap();
    harness.driver.settle().await;
    harness
        .driver
        .set_call_state(call_id, SignalingState::Confirmed)
        .await
        .unwrap();
    harness
        .driver
        .activate_media_on(call_id, SlotId::new(3))
        .await
        .unwrap();
    harness.driver.settle().await;

    let requests = harness.engine.connect_requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests.contains(&(SlotId::new(3), SlotId::new(0))));
    assert!(requests.contains(&(SlotId::new(0), SlotId::new(3))));

    let mut links = harness.engine.bridge_links().await;
    links.sort();
    assert_eq!(
        links,
        vec![(SlotId::new(0), SlotId::new(3)), (SlotId::new(3), SlotId::new(0))]
    );

    let record = handle.call(call_id).await.unwrap();
    assert_eq!(record.media_state(), MediaState::Active);
    assert_eq!(record.audio_slot(), Some(SlotId::new(3)));
}

#[tokio::test]
async fn test_inactive_media_connects_nothing() {
    let harness = Harness::new();
    let handle = harness.start().await;
    let call_id = harness.driver.incoming_call(BOB).await.unwrap();

    for state in [MediaState::None, MediaState::Inactive, MediaState::Error] {
        harness
            .driver
            .set_media_state(call_id, state)
            .await
            .unwrap();
    }
    harness.driver.settle().await;

    assert!(harness.engine.connect_requests().await.is_empty());
    assert_eq!(harness.sink.count("media.unrouted").await, 3);
    assert_eq!(
        handle.call(call_id).await.unwrap().media_state(),
        MediaState::Error
    );
}

#[tokio::test]
async fn test_media_going_inactive_drops_links_without_new_connects() {
    let harness = Harness::new();
    let _handle = harness.start().await;
    let call_id = harness.driver.incoming_call(BOB).await.unwrap();

    let slot = harness.driver.activate_media_on(call_id, SlotId::new(2)).await.unwrap();
    harness.driver.settle().await;
    assert_eq!(harness.engine.bridge_links().await.len(), 2);

    // Hold: media goes inactive, then comes back on the same slot
    harness
        .driver
        .set_media_state(call_id, MediaState::Inactive)
        .await
        .unwrap();
    harness.driver.settle().await;
    assert!(harness.engine.bridge_links().await.is_empty());
    assert_eq!(harness.engine.connect_requests().await.len(), 2);

    harness
        .driver
        .set_media_state(call_id, MediaState::Active)
        .await
        .unwrap();
    harness.driver.settle().await;
    let requests = harness.engine.connect_requests().await;
    assert_eq!(requests.len(), 4);
    assert!(requests[2..].contains(&(slot, SlotId::SOUND_DEVICE)));
    assert!(requests[2..].contains(&(SlotId::SOUND_DEVICE, slot)));
}

#[tokio::test]
async fn test_tracker_mirrors_last_reported_state() {
    let harness = Harness::new();
    let handle = harness.start().await;
    let call_id = harness.driver.incoming_call(BOB).await.unwrap();
    harness.driver.settle().await;

    let script = [
        SignalingState::Confirmed,
        SignalingState::Confirmed,
        SignalingState::Disconnected,
    ];
    for state in script {
        harness.driver.set_call_state(call_id, state).await.unwrap();
        harness.driver.settle().await;

        let reported = harness.engine.call_info(call_id).await.unwrap();
        let record = handle.call(call_id).await.unwrap();
        assert_eq!(record.state(), reported.state);
        assert_eq!(record.state_text(), reported.state_text);
    }

    let record = handle.call(call_id).await.unwrap();
    assert!(record.is_terminal());
    assert!(record.ended_at().is_some());
    assert!(handle.calls().await.iter().all(|record| record.is_terminal()));
}

#[tokio::test]
async fn test_remote_hangup_releases_media() {
    let harness = Harness::new();
    let handle = harness.start().await;
    let call_id = harness.driver.incoming_call(BOB).await.unwrap();
    harness
        .driver
        .activate_media_on(call_id, SlotId::new(4))
        .await
        .unwrap();
    harness.driver.settle().await;

    harness.driver.remote_hangup(call_id).await.unwrap();
    harness.driver.settle().await;

    assert!(harness.engine.bridge_links().await.is_empty());
    let record = handle.call(call_id).await.unwrap();
    assert_eq!(record.state(), SignalingState::Disconnected);
    assert_eq!(record.audio_slot(), None);
    assert_eq!(record.media_state(), MediaState::None);
}

#[tokio::test]
async fn test_hangup_all() {
    let harness = Harness::new();
    let handle = harness.start().await;

    let first = harness.driver.incoming_call(BOB).await.unwrap();
    let second = harness
        .driver
        .incoming_call("sip:carol@example.com")
        .await
        .unwrap();
    harness.driver.settle().await;
    harness
        .driver
        .set_call_state(first, SignalingState::Confirmed)
        .await
        .unwrap();
    let ended = harness
        .driver
        .incoming_call("sip:dave@example.com")
        .await
        .unwrap();
    harness.driver.settle().await;
    harness.driver.remote_hangup(ended).await.unwrap();
    harness.driver.settle().await;

    assert_eq!(handle.hangup_all().await.unwrap(), 2);
    harness.driver.settle().await;

    let hangups: Vec<CallId> = harness
        .engine
        .journal()
        .await
        .into_iter()
        .filter_map(|call| match call {
            EngineCall::HangupCall { call_id } => Some(call_id),
            _ => None,
        })
        .collect();
    assert_eq!(hangups, vec![first, second]);
    assert!(handle.calls().await.iter().all(|record| record.is_terminal()));
    assert_eq!(handle.hangup_all().await.unwrap(), 0);
}

#[tokio::test]
async fn test_answer_failure_does_not_affect_other_calls() {
    let harness = Harness::new();
    let handle = harness.start().await;

    // The caller gives up before the answer goes out
    let doomed = harness.driver.incoming_call(BOB).await.unwrap();
    harness.driver.remote_hangup(doomed).await.unwrap();
    let other = harness
        .driver
        .incoming_call("sip:carol@example.com")
        .await
        .unwrap();
    harness.driver.settle().await;

    let failures = harness.sink.failures().await;
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        &failures[0],
        CallError::AnswerFailure { call_id, .. } if *call_id == doomed
    ));

    assert_eq!(harness.engine.answers_for(other).await, vec![200]);
    assert_eq!(
        handle.call(other).await.unwrap().state(),
        SignalingState::Connecting
    );
    assert!(handle.call(doomed).await.unwrap().is_terminal());
    assert_eq!(handle.agent_state().await, autoanswer::domain::AgentState::Started);
}

#[tokio::test]
async fn test_slot_conflict_leaves_existing_patch_alone() {
    let harness = Harness::new();
    let handle = harness.start().await;

    let first = harness.driver.incoming_call(BOB).await.unwrap();
    let second = harness
        .driver
        .incoming_call("sip:carol@example.com")
        .await
        .unwrap();
    harness.driver.settle().await;

    harness
        .driver
        .activate_media_on(first, SlotId::new(5))
        .await
        .unwrap();
    let taken = harness.driver.activate_media_on(second, SlotId::new(5)).await;
    assert!(matches!(taken, Err(EngineError::InvalidArgument(_))));
    harness.driver.settle().await;

    assert!(harness.sink.failures().await.is_empty());
    assert_eq!(
        handle.call(first).await.unwrap().audio_slot(),
        Some(SlotId::new(5))
    );
    assert_eq!(handle.call(second).await.unwrap().audio_slot(), None);
}

#[tokio::test]
async fn test_failed_slot_move_keeps_current_patch() {
    let harness = Harness::new();
    let handle = harness.start().await;

    let first = harness.driver.incoming_call(BOB).await.unwrap();
    let second = harness
        .driver
        .incoming_call("sip:carol@example.com")
        .await
        .unwrap();
    harness.driver.settle().await;
    harness
        .driver
        .activate_media_on(first, SlotId::new(5))
        .await
        .unwrap();
    harness
        .driver
        .activate_media_on(second, SlotId::new(6))
        .await
        .unwrap();
    harness.driver.settle().await;

    // Moving the second call onto the first call's slot is refused
    let moved = harness.driver.activate_media_on(second, SlotId::new(5)).await;
    assert!(matches!(moved, Err(EngineError::InvalidArgument(_))));
    harness.driver.settle().await;

    let info = harness.engine.call_info(second).await.unwrap();
    assert_eq!(info.media_state, MediaState::Active);
    assert_eq!(info.audio_slot, Some(SlotId::new(6)));
    let links = harness.engine.bridge_links().await;
    assert!(links.contains(&(SlotId::new(6), SlotId::SOUND_DEVICE)));
    assert!(links.contains(&(SlotId::SOUND_DEVICE, SlotId::new(6))));
    assert_eq!(links.len(), 4);

    // Re-reporting active media routes the kept slot without failures
    harness
        .driver
        .set_media_state(second, MediaState::Active)
        .await
        .unwrap();
    harness.driver.settle().await;
    assert!(harness.sink.failures().await.is_empty());
    assert_eq!(
        handle.call(second).await.unwrap().audio_slot(),
        Some(SlotId::new(6))
    );
}

#[tokio::test]
async fn test_events_after_shutdown_are_not_dispatched() {
    let harness = Harness::new();
    let handle = harness.start().await;
    handle.shutdown().await.unwrap();

    let result = harness.driver.incoming_call(BOB).await;
    assert!(matches!(result, Err(EngineError::InvalidState(_))));
    harness.driver.settle().await;
    assert!(harness.engine.journal().await.is_empty());
    assert_eq!(harness.sink.count("session.shutdown").await, 1);
    assert!(harness.sink.failures().await.is_empty());
}
