//! LinkedIn channel driver tests (spec §4.12).

use std::sync::Arc;

use agency_os::channels::linkedin::LinkedinDriver;
use agency_os::channels::test_mode::TestModeState;
use agency_os::channels::{ChannelDriver, ChannelKind, OutboundContent, SendOutcome};
use agency_os::types::ids::ResourceId;
use agency_os::types::resource::{Resource, ResourceHealth, ResourceType};
use chrono::Utc;

fn make_resource() -> Resource {
    let now = Utc::now();
    Resource {
        id: ResourceId::new(),
        resource_type: ResourceType::LinkedinSeat,
        provider_id: "seat-1".to_owned(),
        health: ResourceHealth::Healthy,
        last_used_at: None,
        usage_count: 0,
        daily_cap: 17,
        leased_to: None,
        warming_since: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

#[tokio::test]
async fn send_reports_permanent_error_once_test_mode_daily_cap_is_exhausted() {
    let test_mode = Arc::new(TestModeState::default());
    test_mode.set_enabled(true);
    test_mode.set_daily_cap(0);
    let driver = LinkedinDriver::new(reqwest::Client::new(), test_mode);

    let resource = make_resource();
    let content = OutboundContent {
        subject: None,
        body: "note".to_owned(),
        in_reply_to: None,
        personalization_refs: vec![],
    };

    let outcome = driver
        .send(&resource, "https://linkedin.com/in/lead", &content)
        .await
        .expect("send should not error");

    assert!(matches!(outcome, SendOutcome::PermanentErr { .. }));
}

#[tokio::test]
async fn ingest_parses_a_message_received_event() {
    let driver = LinkedinDriver::new(reqwest::Client::new(), Arc::new(TestModeState::default()));
    let payload = serde_json::json!({
        "event": "message_received",
        "conversation_urn": "urn:conv:1",
        "message_urn": "urn:msg:1",
        "from": "urn:li:person:123",
        "text": "thanks for reaching out",
    });

    let message = driver
        .ingest(&payload)
        .await
        .expect("ingest should succeed")
        .expect("message_received event should produce a message");

    assert_eq!(message.channel, ChannelKind::LinkedIn);
    assert_eq!(message.provider_thread_ref, "urn:conv:1");
    assert_eq!(message.body, "thanks for reaching out");
}

#[tokio::test]
async fn ingest_falls_back_to_from_when_conversation_urn_missing() {
    let driver = LinkedinDriver::new(reqwest::Client::new(), Arc::new(TestModeState::default()));
    let payload = serde_json::json!({
        "event": "connection_accepted",
        "from": "urn:li:person:123",
    });

    let message = driver
        .ingest(&payload)
        .await
        .expect("ingest should succeed")
        .expect("connection_accepted event should produce a message");

    assert_eq!(message.provider_thread_ref, "urn:li:person:123");
}

#[tokio::test]
async fn ingest_ignores_unrelated_events() {
    let driver = LinkedinDriver::new(reqwest::Client::new(), Arc::new(TestModeState::default()));
    let payload = serde_json::json!({ "event": "profile_viewed" });

    let message = driver.ingest(&payload).await.expect("ingest should succeed");
    assert!(message.is_none());
}
