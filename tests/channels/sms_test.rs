//! SMS channel driver tests (spec §4.12). `send` always performs a
//! do-not-call registry lookup before the test-mode redirect check, so it
//! has no network-free path; only `ingest` is exercised here.

use std::sync::Arc;

use agency_os::channels::sms::SmsDriver;
use agency_os::channels::test_mode::TestModeState;
use agency_os::channels::{ChannelDriver, ChannelKind};

fn driver() -> SmsDriver {
    SmsDriver::new(reqwest::Client::new(), Arc::new(TestModeState::default()))
}

#[tokio::test]
async fn ingest_parses_an_inbound_message() {
    let driver = driver();
    let payload = serde_json::json!({
        "event": "inbound_message",
        "message_sid": "SM123",
        "from": "+15550101",
        "body": "stop",
    });

    let message = driver
        .ingest(&payload)
        .await
        .expect("ingest should succeed")
        .expect("inbound_message event should produce a message");

    assert_eq!(message.channel, ChannelKind::Sms);
    assert_eq!(message.body, "stop");
    assert_eq!(message.provider_thread_ref, "+15550101");
}

#[tokio::test]
async fn ingest_ignores_non_inbound_events() {
    let driver = driver();
    let payload = serde_json::json!({ "event": "delivered", "message_sid": "SM123" });

    let message = driver.ingest(&payload).await.expect("ingest should succeed");
    assert!(message.is_none());
}

#[tokio::test]
async fn ingest_rejects_an_inbound_message_missing_from() {
    let driver = driver();
    let payload = serde_json::json!({ "event": "inbound_message", "body": "hi" });

    let result = driver.ingest(&payload).await;
    assert!(result.is_err());
}
