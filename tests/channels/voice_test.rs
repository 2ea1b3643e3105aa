//! Voice channel driver tests (spec §4.12).

use std::sync::Arc;

use agency_os::channels::test_mode::TestModeState;
use agency_os::channels::voice::VoiceDriver;
use agency_os::channels::{ChannelDriver, ChannelKind, OutboundContent, SendOutcome};
use agency_os::types::ids::ResourceId;
use agency_os::types::resource::{Resource, ResourceHealth, ResourceType};
use chrono::Utc;

fn make_resource() -> Resource {
    let now = Utc::now();
    Resource {
        id: ResourceId::new(),
        resource_type: ResourceType::PhoneNumberVoice,
        provider_id: "+15550100".to_owned(),
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

#[tokio::test]
async fn send_reports_permanent_error_once_test_mode_daily_cap_is_exhausted() {
    let test_mode = Arc::new(TestModeState::default());
    test_mode.set_enabled(true);
    test_mode.set_daily_cap(0);
    let driver = VoiceDriver::new(reqwest::Client::new(), test_mode);

    let resource = make_resource();
    let content = OutboundContent {
        subject: None,
        body: "call plan".to_owned(),
        in_reply_to: None,
        personalization_refs: vec![],
    };

    let outcome = driver
        .send(&resource, "+15550101", &content)
        .await
        .expect("send should not error");

    assert!(matches!(outcome, SendOutcome::PermanentErr { .. }));
}

#[tokio::test]
async fn ingest_parses_a_completed_call_with_transcript() {
    let driver = VoiceDriver::new(reqwest::Client::new(), Arc::new(TestModeState::default()));
    let payload = serde_json::json!({
        "event": "call_completed",
        "call_sid": "CA123",
        "from": "+15550101",
        "transcript": "not interested",
    });

    let message = driver
        .ingest(&payload)
        .await
        .expect("ingest should succeed")
        .expect("completed call with transcript should produce a message");

    assert_eq!(message.channel, ChannelKind::Voice);
    assert_eq!(message.body, "not interested");
}

#[tokio::test]
async fn ingest_ignores_a_completed_call_with_no_transcript() {
    let driver = VoiceDriver::new(reqwest::Client::new(), Arc::new(TestModeState::default()));
    let payload = serde_json::json!({
        "event": "call_completed",
        "call_sid": "CA123",
        "from": "+15550101",
    });

    let result = driver.ingest(&payload).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn ingest_ignores_non_completion_events() {
    let driver = VoiceDriver::new(reqwest::Client::new(), Arc::new(TestModeState::default()));
    let payload = serde_json::json!({ "event": "call_ringing" });

    let message = driver.ingest(&payload).await.expect("ingest should succeed");
    assert!(message.is_none());
}
