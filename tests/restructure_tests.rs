//! FCFS Balancer and break/resume scenarios (spec §8 scenarios 3, 4; P1, P6).

mod common;

use test_context::test_context;

use queuedesk_core::engine::{BreakScope, EnqueueRequest, LineItem, UserType};
use queuedesk_core::kernel::identity::{Principal, Role};
use queuedesk_core::store::{Gender, Preference, QueueStatus};

use common::TestHarness;

async fn enqueue_n(
    ctx: &TestHarness,
    business_id: queuedesk_core::common::BusinessId,
    service_id: queuedesk_core::common::ServiceId,
    n: usize,
) -> Vec<queuedesk_core::store::QueueEntry> {
    let user_id = common::create_registered_user(&ctx.pool, Some("ExponentPushToken[demo]")).await.unwrap();
    let principal = Principal { user_id, role: Role::Customer, business_id: None };
    let items = (0..n)
        .map(|_| LineItem { service_id, gender: Gender::Male, preference: Preference::Any, helper_id: None })
        .collect();
    ctx.engine
        .enqueue(EnqueueRequest { business_id, principal, user_type: UserType::Normal, manual_id: None, items })
        .await
        .expect("enqueue should succeed")
}

#[test_context(TestHarness)]
#[tokio::test]
async fn restructure_preserves_a_held_entrys_position_and_is_idempotent(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let service_id = common::create_service(&ctx.pool, business_id, 30).await.unwrap();
    let helper_id = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();

    let entries = enqueue_n(ctx, business_id, service_id, 5).await;
    let owner = Principal {
        user_id: queuedesk_core::common::UserId::from_uuid(helper_id.into_uuid()),
        role: Role::OwnerOrHelper,
        business_id: Some(business_id),
    };

    let held_id = entries.iter().find(|e| e.current_position == 3).unwrap().id;
    {
        let mut conn = ctx.pool.acquire().await.unwrap();
        queuedesk_core::engine::actions::apply_action(
            &mut conn,
            held_id,
            queuedesk_core::engine::Action::Hold,
            &owner,
            300,
            chrono::Utc::now(),
        )
        .await
        .expect("hold should succeed");
    }

    let t0 = ctx.now() - chrono::Duration::hours(1);
    let t1 = ctx.now() + chrono::Duration::hours(24);
    let outcome = ctx.engine.restructure(business_id, t0, t1).await.expect("restructure should succeed");
    assert_eq!(outcome.updated_count, 0, "positions already match FCFS order, nothing should change");

    let mut conn = ctx.pool.acquire().await.unwrap();
    let held = queuedesk_core::store::queue_entry::find_entry(&mut conn, held_id).await.unwrap();
    assert_eq!(held.status, QueueStatus::Hold);
    assert_eq!(held.current_position, 3);

    let second = ctx.engine.restructure(business_id, t0, t1).await.expect("restructure should succeed");
    assert_eq!(second.updated_count, 0, "restructure is idempotent (P6)");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn helper_scoped_break_reassigns_flexible_entries_to_the_remaining_helper(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let service_id = common::create_service(&ctx.pool, business_id, 30).await.unwrap();
    let h1 = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();
    let h2 = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();

    // Three entries land on H1 since it starts with the smaller bucket.
    let entries = enqueue_n(ctx, business_id, service_id, 3).await;
    assert!(entries.iter().all(|e| e.helper_id == h1));

    ctx.engine.set_break(business_id, BreakScope::Helper(h1)).await.expect("set_break should succeed");

    let mut conn = ctx.pool.acquire().await.unwrap();
    let h2_queue = queuedesk_core::store::queue_entry::find_lane(&mut conn, business_id, h2).await.unwrap();
    let mut positions: Vec<i32> = h2_queue.iter().map(|e| e.current_position).collect();
    positions.sort();
    assert_eq!(positions, vec![1, 2, 3], "helper-scoped break always restructures (spec §4.4)");
    assert!(h2_queue.iter().all(|e| e.history.iter().any(|h| h.newly_assigned_helper_id == Some(h2))));

    let h1_queue = queuedesk_core::store::queue_entry::find_lane(&mut conn, business_id, h1).await.unwrap();
    assert!(h1_queue.is_empty());

    assert!(!ctx.notifier.sent().is_empty(), "affected normal users should be notified of the reassignment");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn business_wide_break_does_not_restructure(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let service_id = common::create_service(&ctx.pool, business_id, 30).await.unwrap();
    let h1 = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();

    let entries = enqueue_n(ctx, business_id, service_id, 2).await;
    ctx.engine.set_break(business_id, BreakScope::Business).await.expect("set_break should succeed");

    let mut conn = ctx.pool.acquire().await.unwrap();
    let lane = queuedesk_core::store::queue_entry::find_lane(&mut conn, business_id, h1).await.unwrap();
    let mut positions: Vec<i32> = lane.iter().map(|e| e.current_position).collect();
    positions.sort();
    assert_eq!(positions, vec![1, 2], "business-wide break never restructures (spec §4.4)");
    assert_eq!(lane.len(), entries.len());
}
