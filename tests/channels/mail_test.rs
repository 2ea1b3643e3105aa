//! Physical mail channel driver tests (spec §4.12).

use std::sync::Arc;

use agency_os::channels::mail::MailDriver;
use agency_os::channels::test_mode::TestModeState;
use agency_os::channels::{ChannelDriver, OutboundContent, SendOutcome};
use agency_os::types::ids::ResourceId;
use agency_os::types::resource::{Resource, ResourceHealth, ResourceType};
use chrono::Utc;

fn make_resource() -> Resource {
    let now = Utc::now();
    Resource {
        id: ResourceId::new(),
        resource_type: ResourceType::MailSender,
        provider_id: "sender-1".to_owned(),
        health: ResourceHealth::Healthy,
        last_used_at: None,
        usage_count: 0,
        daily_cap: 1000,
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
    let driver = MailDriver::new(reqwest::Client::new(), test_mode);

    let resource = make_resource();
    let content = OutboundContent {
        subject: None,
        body: "letter body".to_owned(),
        in_reply_to: None,
        personalization_refs: vec![],
    };

    let outcome = driver
        .send(&resource, "123 Main St", &content)
        .await
        .expect("send should not error");

    assert!(matches!(outcome, SendOutcome::PermanentErr { .. }));
}

#[tokio::test]
async fn ingest_always_returns_no_message() {
    let driver = MailDriver::new(reqwest::Client::new(), Arc::new(TestModeState::default()));
    let payload = serde_json::json!({ "anything": "at-all" });

    let message = driver.ingest(&payload).await.expect("ingest should succeed");
    assert!(message.is_none());
}
