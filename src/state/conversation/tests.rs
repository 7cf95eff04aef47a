use super::*;
use crate::api::{MockChunk, MockReply, MockTransport};
use crate::config::{ConfigStore, MemoryStorage, Settings, SettingsStorage, SETTINGS_KEY};
use crate::error::ChatError;
use crate::types::{MessageStatus, Role};
use bytes::Bytes;
use futures::stream;
use std::sync::Arc;
use std::time::Duration;

const API_KEY: &str = "sk-test-key";

fn configured_settings() -> Settings {
    Settings {
        api_key: API_KEY.to_string(),
        ..Settings::default()
    }
}

fn manager_with(
    settings: Settings,
    replies: Vec<MockReply>,
) -> (ConversationManager, MockTransport, MemoryStorage) {
    let transport = MockTransport::new(replies);
    let storage = MemoryStorage::new();
    let store = ConfigStore::new(storage.clone());
    store.save(&settings).expect("seed settings");
    let manager = ConversationManager::new(Arc::new(transport.clone()), store);
    (manager, transport, storage)
}

fn configured_manager(replies: Vec<MockReply>) -> (ConversationManager, MockTransport) {
    let (manager, transport, _) = manager_with(configured_settings(), replies);
    (manager, transport)
}

fn assistant_content(manager: &ConversationManager) -> String {
    manager
        .messages()
        .last()
        .filter(|message| message.role() == Role::Assistant)
        .map(|message| message.content().to_string())
        .expect("last entry should be the assistant reply")
}

#[tokio::test]
async fn test_submit_appends_user_and_placeholder_before_any_io() {
    let (mut manager, transport) = configured_manager(vec![MockReply::text_chunks(&["ok"])]);

    let target = manager.submit("  Hello  ").expect("submit accepted");

    let messages = manager.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[0].content(), "Hello");
    assert_eq!(messages[1].role(), Role::Assistant);
    assert_eq!(messages[1].id(), target);
    assert!(messages[1].content().is_empty());
    assert_eq!(messages[1].status(), MessageStatus::Pending);
    assert_eq!(manager.phase(), Phase::Sending);
    assert!(manager.is_in_flight());
    assert_eq!(transport.send_count(), 0, "spawned session has not run yet");
}

#[tokio::test]
async fn test_streamed_chunks_settle_into_one_reply() {
    let (mut manager, transport) =
        configured_manager(vec![MockReply::text_chunks(&["Hi", " there", "!"])]);

    manager.submit("Hello").expect("submit accepted");
    manager.settle().await;

    assert_eq!(assistant_content(&manager), "Hi there!");
    assert_eq!(manager.phase(), Phase::Settled);
    assert!(!manager.is_in_flight());
    assert_eq!(
        manager.messages().last().map(|m| m.status()),
        Some(MessageStatus::Complete)
    );
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn test_request_envelope_reflects_current_settings() {
    let (mut manager, transport) = configured_manager(vec![MockReply::text_chunks(&["ok"])]);

    manager.submit("  What is Rust?\n").expect("submit accepted");
    manager.settle().await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_message, "What is Rust?");
    assert_eq!(requests[0].api_key, API_KEY);
    assert_eq!(requests[0].model, Settings::default().model);
    assert_eq!(
        requests[0].developer_message,
        Settings::default().developer_message
    );
}

#[tokio::test]
async fn test_http_error_replaces_placeholder_with_notice() {
    let (mut manager, _transport) = configured_manager(vec![MockReply::Status(500)]);

    manager.submit("Hello").expect("submit accepted");
    manager.settle().await;

    assert_eq!(manager.messages().len(), 2);
    assert_eq!(assistant_content(&manager), TRANSPORT_ERROR_NOTICE);
    assert_eq!(
        manager.messages().last().map(|m| m.status()),
        Some(MessageStatus::Failed)
    );
    assert_eq!(manager.phase(), Phase::Idle);
    assert!(!manager.is_in_flight());
}

#[tokio::test]
async fn test_network_failure_is_converted_to_notice() {
    let (mut manager, _transport) = configured_manager(vec![MockReply::NetworkFailure]);

    manager.submit("Hello").expect("submit accepted");
    manager.settle().await;

    assert_eq!(assistant_content(&manager), TRANSPORT_ERROR_NOTICE);
    assert_eq!(manager.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_partial_output() {
    let (mut manager, _transport) = configured_manager(vec![MockReply::Stream(vec![
        MockChunk::Data(Bytes::from_static(b"The answer is")),
        MockChunk::ReadError("connection reset by peer".to_string()),
    ])]);

    manager.submit("Hello").expect("submit accepted");
    manager.settle().await;

    let content = assistant_content(&manager);
    assert!(content.starts_with("The answer is"));
    assert!(content.ends_with(STREAM_ERROR_NOTICE));
    assert_ne!(content, TRANSPORT_ERROR_NOTICE);
    assert_eq!(
        manager.messages().last().map(|m| m.status()),
        Some(MessageStatus::Failed)
    );
    assert_eq!(manager.phase(), Phase::Idle);
    assert!(!manager.is_in_flight());
}

#[tokio::test]
async fn test_submit_rejected_without_api_key() {
    let (mut manager, transport, _) = manager_with(
        Settings::default(),
        vec![MockReply::text_chunks(&["never"])],
    );

    assert_eq!(manager.submit("Hello"), Err(SubmitRejected::MissingApiKey));
    tokio::task::yield_now().await;

    assert!(manager.messages().is_empty());
    assert_eq!(transport.send_count(), 0);
    assert_eq!(manager.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_blank_input_is_ignored() {
    let (mut manager, transport) = configured_manager(vec![]);

    assert_eq!(manager.submit(""), Err(SubmitRejected::EmptyMessage));
    assert_eq!(manager.submit(" \n\t "), Err(SubmitRejected::EmptyMessage));
    tokio::task::yield_now().await;

    assert!(manager.messages().is_empty());
    assert_eq!(transport.send_count(), 0);
}

#[tokio::test]
async fn test_second_submit_while_in_flight_is_rejected() {
    let (mut manager, transport) = configured_manager(vec![
        MockReply::text_chunks(&["first"]),
        MockReply::text_chunks(&["second"]),
    ]);

    manager.submit("one").expect("first submit accepted");
    assert_eq!(manager.submit("two"), Err(SubmitRejected::InFlight));
    assert_eq!(manager.messages().len(), 2);

    manager.settle().await;
    assert_eq!(transport.send_count(), 1);
    assert_eq!(transport.requests()[0].user_message, "one");
    assert_eq!(assistant_content(&manager), "first");
}

#[tokio::test]
async fn test_next_submit_allowed_after_settle() {
    let (mut manager, transport) = configured_manager(vec![
        MockReply::Status(502),
        MockReply::text_chunks(&["recovered"]),
    ]);

    manager.submit("one").expect("first submit accepted");
    manager.settle().await;
    manager.submit("two").expect("second submit accepted");
    manager.settle().await;

    assert_eq!(manager.messages().len(), 4);
    assert_eq!(manager.messages()[1].content(), TRANSPORT_ERROR_NOTICE);
    assert_eq!(manager.messages()[3].content(), "recovered");
    assert_eq!(transport.send_count(), 2);
}

#[tokio::test]
async fn test_first_fragment_moves_to_streaming() {
    let (mut manager, _transport) = configured_manager(vec![MockReply::Stream(vec![
        MockChunk::Data(Bytes::from_static(b"partial")),
        MockChunk::Stall,
    ])]);

    manager.submit("Hello").expect("submit accepted");
    let event = manager.next_event().await.expect("fragment event");
    manager.apply(event);

    assert_eq!(manager.phase(), Phase::Streaming);
    assert_eq!(assistant_content(&manager), "partial");
    assert_eq!(
        manager.messages().last().map(|m| m.status()),
        Some(MessageStatus::Streaming)
    );
    assert!(manager.is_in_flight());
}

#[tokio::test]
async fn test_split_multibyte_characters_reassemble() {
    let reply = "naïve café 🌍 done";
    let bytes = reply.as_bytes().to_vec();
    let chunks: Vec<Vec<u8>> = bytes.chunks(3).map(<[u8]>::to_vec).collect();
    let (mut manager, _transport) = configured_manager(vec![MockReply::byte_chunks(chunks)]);

    manager.submit("Hello").expect("submit accepted");
    manager.settle().await;

    assert_eq!(assistant_content(&manager), reply);
    assert!(!assistant_content(&manager).contains('\u{FFFD}'));
}

#[tokio::test]
async fn test_pump_concatenates_for_every_split_point() {
    let reply = "Grüße 👋🏽 from Zürich";
    let bytes = reply.as_bytes();

    for split in 1..bytes.len() {
        let chunks: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ];
        let mut fragments = Vec::new();
        pump_stream(stream::iter(chunks), |fragment| fragments.push(fragment))
            .await
            .expect("pump should finish");

        assert_eq!(fragments.concat(), reply, "split at byte {split}");
        assert!(fragments.iter().all(|fragment| !fragment.is_empty()));
    }
}

#[tokio::test]
async fn test_pump_reports_read_errors_after_delivering_fragments() {
    let chunks: Vec<Result<Bytes, ChatError>> = vec![
        Ok(Bytes::from_static(b"abc")),
        Err(ChatError::Transport("reset".to_string())),
        Ok(Bytes::from_static(b"never")),
    ];
    let mut fragments = Vec::new();
    let result = pump_stream(stream::iter(chunks), |fragment| fragments.push(fragment)).await;

    assert_eq!(fragments, vec!["abc".to_string()]);
    assert!(matches!(result, Err(ChatError::StreamRead(_))));
}

#[tokio::test]
async fn test_clear_twice_leaves_empty_transcript() {
    let (mut manager, _transport) = configured_manager(vec![MockReply::text_chunks(&["hi"])]);
    manager.submit("Hello").expect("submit accepted");
    manager.settle().await;

    manager.clear();
    assert!(manager.messages().is_empty());
    manager.clear();
    assert!(manager.messages().is_empty());
    assert_eq!(manager.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_clear_cancels_in_flight_session() {
    let (mut manager, transport) = configured_manager(vec![MockReply::Stream(vec![
        MockChunk::Data(Bytes::from_static(b"stale ")),
        MockChunk::Stall,
    ])]);

    manager.submit("first").expect("submit accepted");
    let event = manager.next_event().await.expect("fragment event");
    manager.apply(event);

    manager.clear();
    assert!(manager.messages().is_empty());
    assert!(!manager.is_in_flight());
    assert_eq!(manager.phase(), Phase::Idle);

    transport.push_reply(MockReply::text_chunks(&["fresh"]));
    manager.submit("second").expect("submit accepted after clear");
    manager.settle().await;

    assert_eq!(manager.messages().len(), 2);
    assert_eq!(assistant_content(&manager), "fresh");
    assert_eq!(manager.phase(), Phase::Settled);
}

#[tokio::test]
async fn test_events_from_stale_sessions_are_dropped() {
    let (mut manager, _transport) = configured_manager(vec![MockReply::Stream(vec![
        MockChunk::Stall,
    ])]);
    manager.submit("Hello").expect("submit accepted");

    manager.apply(SessionEvent::Fragment {
        session_id: 999,
        text: "intruder".to_string(),
    });
    manager.apply(SessionEvent::Completed { session_id: 999 });

    assert!(assistant_content(&manager).is_empty());
    assert!(manager.is_in_flight());
    assert_eq!(manager.phase(), Phase::Sending);
}

#[tokio::test]
async fn test_config_saved_persists_and_rechecks_health() {
    let (mut manager, transport, storage) =
        manager_with(configured_settings(), vec![MockReply::text_chunks(&["hi"])]);
    manager.submit("Hello").expect("submit accepted");
    manager.settle().await;
    transport.set_healthy(false);

    let updated = Settings {
        api_key: "sk-rotated".to_string(),
        model: "gpt-4o-mini".to_string(),
        developer_message: "Only answer in haiku.".to_string(),
    };
    manager
        .on_config_saved(updated.clone())
        .expect("settings saved");

    assert_eq!(manager.settings(), &updated);
    assert_eq!(ConfigStore::new(storage.clone()).load(), updated);
    assert!(storage.get(SETTINGS_KEY).expect("read").is_some());

    assert_eq!(manager.next_health().await, Some(false));
    assert!(!manager.is_connected());
    assert_eq!(transport.health_checks(), 1);
    assert_eq!(manager.messages().len(), 2, "transcript untouched");
}

#[tokio::test]
async fn test_hanging_health_check_does_not_block_chat() {
    let (manager, transport, _) = manager_with(
        configured_settings(),
        vec![MockReply::text_chunks(&["still ", "here"])],
    );
    let mut manager = manager.with_health_timeout(Duration::from_millis(50));
    transport.stall_health(true);

    manager
        .on_config_saved(Settings {
            model: "gpt-4.1-mini".to_string(),
            ..configured_settings()
        })
        .expect("settings saved");
    manager.submit("Hello").expect("submit accepted while probe is pending");
    tokio::time::timeout(Duration::from_secs(2), manager.settle())
        .await
        .expect("reply settles while the probe hangs");
    assert_eq!(assistant_content(&manager), "still here");
    assert_eq!(manager.phase(), Phase::Settled);

    let healthy = tokio::time::timeout(Duration::from_secs(2), manager.next_health())
        .await
        .expect("probe is bounded by the health timeout");
    assert_eq!(healthy, Some(false));
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn test_refresh_health_times_out_as_unhealthy() {
    let (manager, transport, _) = manager_with(configured_settings(), vec![]);
    let mut manager = manager.with_health_timeout(Duration::from_millis(50));
    transport.stall_health(true);
    let mut updates = manager.subscribe();

    let healthy = tokio::time::timeout(Duration::from_secs(2), manager.refresh_health())
        .await
        .expect("inline probe is bounded");

    assert!(!healthy);
    assert_eq!(
        updates.try_recv().ok(),
        Some(ConversationUpdate::ConnectionChanged(false))
    );
}

#[tokio::test]
async fn test_settings_with_blank_model_are_refused() {
    let (mut manager, transport, storage) = manager_with(configured_settings(), vec![]);

    let result = manager.on_config_saved(Settings {
        model: "  ".to_string(),
        ..configured_settings()
    });

    assert!(matches!(result, Err(ChatError::Config(_))));
    assert_eq!(manager.settings(), &configured_settings());
    assert_eq!(ConfigStore::new(storage).load(), configured_settings());
    assert_eq!(manager.apply_pending_health(), None);
    assert_eq!(transport.health_checks(), 0);
}

#[tokio::test]
async fn test_manager_loads_persisted_settings_on_start() {
    let (manager, _transport, _) = manager_with(configured_settings(), vec![]);
    assert_eq!(manager.settings(), &configured_settings());
    assert!(manager.is_connected());
}

#[tokio::test]
async fn test_updates_are_pushed_in_order() {
    let (mut manager, _transport) = configured_manager(vec![MockReply::text_chunks(&["Hi", "!"])]);
    let mut updates = manager.subscribe();

    let target = manager.submit("Hello").expect("submit accepted");
    manager.settle().await;

    let mut received = Vec::new();
    while let Ok(update) = updates.try_recv() {
        received.push(update);
    }

    assert!(matches!(
        &received[0],
        ConversationUpdate::MessageAppended(message) if message.role() == Role::User
    ));
    assert!(matches!(
        &received[1],
        ConversationUpdate::MessageAppended(message) if message.id() == target
    ));
    assert_eq!(
        received[2..].to_vec(),
        vec![
            ConversationUpdate::PhaseChanged(Phase::Sending),
            ConversationUpdate::PhaseChanged(Phase::Streaming),
            ConversationUpdate::Fragment {
                id: target,
                text: "Hi".to_string()
            },
            ConversationUpdate::Fragment {
                id: target,
                text: "!".to_string()
            },
            ConversationUpdate::MessageFinalized {
                id: target,
                status: MessageStatus::Complete
            },
            ConversationUpdate::PhaseChanged(Phase::Settled),
        ]
    );
}
