//! Suppression Index integration tests (spec §4.1).

use crate::common;

use agency_os::engines::suppression::{SuppressionCheck, SuppressionIndex};
use agency_os::types::ids::TenantId;
use agency_os::types::suppression::{SuppressionKey, SuppressionReason, SuppressionScope};

#[tokio::test]
async fn clear_when_no_entry_exists() {
    let db = common::test_pool().await;
    let index = SuppressionIndex::new(db);
    let tenant = TenantId::new();

    let check = index.is_suppressed(tenant, SuppressionKey::Email, "nobody@example.com").await;
    assert_eq!(check, SuppressionCheck::Clear);
}

#[tokio::test]
async fn global_suppression_blocks_every_tenant() {
    let db = common::test_pool().await;
    let index = SuppressionIndex::new(db);
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();

    index
        .suppress(
            None,
            SuppressionScope::Global,
            SuppressionKey::Email,
            "blocked@example.com",
            SuppressionReason::DoNotContact,
        )
        .await
        .expect("suppress should succeed");

    for tenant in [tenant_a, tenant_b] {
        let check = index.is_suppressed(tenant, SuppressionKey::Email, "blocked@example.com").await;
        assert_eq!(
            check,
            SuppressionCheck::Blocked {
                scope: SuppressionScope::Global,
                reason: SuppressionReason::DoNotContact
            }
        );
    }
}

#[tokio::test]
async fn tenant_suppression_does_not_leak_to_other_tenants() {
    let db = common::test_pool().await;
    let index = SuppressionIndex::new(db);
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();

    index
        .suppress(
            Some(tenant_a),
            SuppressionScope::Tenant,
            SuppressionKey::Email,
            "existing@example.com",
            SuppressionReason::ExistingCustomer,
        )
        .await
        .expect("suppress should succeed");

    let blocked = index.is_suppressed(tenant_a, SuppressionKey::Email, "existing@example.com").await;
    assert_eq!(
        blocked,
        SuppressionCheck::Blocked {
            scope: SuppressionScope::Tenant,
            reason: SuppressionReason::ExistingCustomer
        }
    );

    let clear = index.is_suppressed(tenant_b, SuppressionKey::Email, "existing@example.com").await;
    assert_eq!(clear, SuppressionCheck::Clear);
}

#[tokio::test]
async fn suppress_is_idempotent_on_scope_key_value() {
    let db = common::test_pool().await;
    let index = SuppressionIndex::new(db);
    let tenant = TenantId::new();

    for _ in 0..3 {
        index
            .suppress(
                None,
                SuppressionScope::Global,
                SuppressionKey::Domain,
                "spammy.example",
                SuppressionReason::SpamComplaint,
            )
            .await
            .expect("repeated suppress should not fail");
    }

    let check = index.is_suppressed(tenant, SuppressionKey::Domain, "spammy.example").await;
    assert_eq!(
        check,
        SuppressionCheck::Blocked {
            scope: SuppressionScope::Global,
            reason: SuppressionReason::SpamComplaint
        }
    );
}
