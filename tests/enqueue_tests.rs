//! End-to-end enqueue scenarios (spec §8 scenario 1, P1).

mod common;

use test_context::test_context;

use queuedesk_core::engine::{EnqueueRequest, LineItem, UserType};
use queuedesk_core::kernel::identity::{Principal, Role};
use queuedesk_core::store::{Gender, Preference};

use common::TestHarness;

#[test_context(TestHarness)]
#[tokio::test]
async fn three_any_preference_haircuts_spread_across_two_helpers(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let service_id = common::create_service(&ctx.pool, business_id, 30).await.unwrap();
    let h1 = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();
    let h2 = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();
    assert!(h1 < h2, "helpers are created in id order so the tiebreak is deterministic");

    let user_id = common::create_registered_user(&ctx.pool, None).await.unwrap();
    let principal = Principal { user_id, role: Role::Customer, business_id: None };

    let items = vec![
        LineItem { service_id, gender: Gender::Male, preference: Preference::Any, helper_id: None },
        LineItem { service_id, gender: Gender::Male, preference: Preference::Any, helper_id: None },
        LineItem { service_id, gender: Gender::Male, preference: Preference::Any, helper_id: None },
    ];

    let entries = ctx
        .engine
        .enqueue(EnqueueRequest {
            business_id,
            principal,
            user_type: UserType::Normal,
            manual_id: None,
            items,
        })
        .await
        .expect("enqueue should succeed");

    // The `Any` minimizer re-queries each helper's lane length live within
    // this same transaction, so the first item's insert is visible to the
    // second item's pick, and so on: h1 (0 vs 0, tiebreak to the lower id),
    // then h2 (h1 now at 1 vs h2 at 0), then back to h1 (both at 1, tiebreak
    // to the lower id again).
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].helper_id, h1);
    assert_eq!(entries[0].current_position, 1);
    assert_eq!(entries[0].est_wait, 0);

    assert_eq!(entries[1].helper_id, h2);
    assert_eq!(entries[1].current_position, 1);
    assert_eq!(entries[1].est_wait, 0);

    assert_eq!(entries[2].helper_id, h1);
    assert_eq!(entries[2].current_position, 2);
    assert_eq!(entries[2].est_wait, 30);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn enqueue_rejects_empty_item_list(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let user_id = common::create_registered_user(&ctx.pool, None).await.unwrap();
    let principal = Principal { user_id, role: Role::Customer, business_id: None };

    let err = ctx
        .engine
        .enqueue(EnqueueRequest {
            business_id,
            principal,
            user_type: UserType::Normal,
            manual_id: None,
            items: vec![],
        })
        .await
        .unwrap_err();

    assert!(matches!(err, queuedesk_core::common::errors::EngineError::InvalidArgument(_)));
}
