//! Email channel driver tests (spec §4.12).

use std::sync::Arc;

use agency_os::channels::test_mode::TestModeState;
use agency_os::channels::{ChannelDriver, ChannelKind, OutboundContent, SendOutcome};
use agency_os::channels::email::EmailDriver;
use agency_os::types::resource::{Resource, ResourceHealth, ResourceType};
use agency_os::types::ids::ResourceId;
use chrono::Utc;

fn make_resource() -> Resource {
    let now = Utc::now();
    Resource {
        id: ResourceId::new(),
        resource_type: ResourceType::EmailDomain,
        provider_id: "mail.example.com".to_owned(),
        health: ResourceHealth::Healthy,
        last_used_at: None,
        usage_count: 0,
        daily_cap: 50,
        leased_to: None,
        warming_since: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn driver() -> EmailDriver {
    EmailDriver::new(reqwest::Client::new(), Arc::new(TestModeState::default()))
}

#[tokio::test]
async fn send_reports_permanent_error_once_test_mode_daily_cap_is_exhausted() {
    let test_mode = Arc::new(TestModeState::default());
    test_mode.set_enabled(true);
    test_mode.set_daily_cap(0);
    let driver = EmailDriver::new(reqwest::Client::new(), test_mode);

    let resource = make_resource();
    let content = OutboundContent {
        subject: Some("hi".to_owned()),
        body: "body".to_owned(),
        in_reply_to: None,
        personalization_refs: vec![],
    };

    let outcome = driver
        .send(&resource, "lead@example.com", &content)
        .await
        .expect("send should not error");

    assert!(matches!(outcome, SendOutcome::PermanentErr { .. }));
}

#[tokio::test]
async fn ingest_parses_a_reply_event() {
    let driver = driver();
    let payload = serde_json::json!({
        "event": "reply",
        "message_id": "msg-123",
        "in_reply_to": "thread-1",
        "from": "lead@example.com",
        "text": "sounds good",
    });

    let message = driver
        .ingest(&payload)
        .await
        .expect("ingest should succeed")
        .expect("reply event should produce a message");

    assert_eq!(message.channel, ChannelKind::Email);
    assert_eq!(message.from_address, "lead@example.com");
    assert_eq!(message.body, "sounds good");
    assert_eq!(message.provider_thread_ref, "thread-1");
}

#[tokio::test]
async fn ingest_ignores_non_reply_events() {
    let driver = driver();
    let payload = serde_json::json!({ "event": "delivered", "message_id": "msg-123" });

    let message = driver.ingest(&payload).await.expect("ingest should succeed");
    assert!(message.is_none());
}

#[tokio::test]
async fn ingest_rejects_a_reply_missing_from() {
    let driver = driver();
    let payload = serde_json::json!({ "event": "reply", "text": "hi" });

    let result = driver.ingest(&payload).await;
    assert!(result.is_err());
}
