//! Action state machine scenarios (spec §8 scenarios 2, 5, 6; P3, P4, P5, P7).

mod common;

use test_context::test_context;

use queuedesk_core::common::errors::EngineError;
use queuedesk_core::engine::{Action, EnqueueRequest, LineItem, UserType};
use queuedesk_core::kernel::identity::{Principal, Role};
use queuedesk_core::store::{Gender, Preference, QueueStatus};

use common::TestHarness;

async fn enqueue_n(
    ctx: &TestHarness,
    business_id: queuedesk_core::common::BusinessId,
    service_id: queuedesk_core::common::ServiceId,
    n: usize,
) -> Vec<queuedesk_core::store::QueueEntry> {
    let user_id = common::create_registered_user(&ctx.pool, None).await.unwrap();
    let principal = Principal { user_id, role: Role::Customer, business_id: None };
    let items = (0..n)
        .map(|_| LineItem { service_id, gender: Gender::Male, preference: Preference::Any, helper_id: None })
        .collect();
    ctx.engine
        .enqueue(EnqueueRequest { business_id, principal, user_type: UserType::Normal, manual_id: None, items })
        .await
        .expect("enqueue should succeed")
}

/// A `Principal` for a participating helper: the token's `user_id`
/// doubles as the `helper_id` it authorizes against (spec §3's `Helper`
/// has no separate owner/helper distinction).
fn owner_principal(
    business_id: queuedesk_core::common::BusinessId,
    helper_id: queuedesk_core::common::HelperId,
) -> Principal {
    Principal {
        user_id: queuedesk_core::common::UserId::from_uuid(helper_id.into_uuid()),
        role: Role::OwnerOrHelper,
        business_id: Some(business_id),
    }
}

/// Exercises `skip`/`undo` through the public `QueueEngine::apply_action`
/// path real HTTP clients use, including its triggered restructure (spec
/// §4.2 "after any action that changes memberships or positions... the
/// engine triggers a restructure"). §4.3 Step 6 sorts Flexible entries
/// within a bucket by `current_position`, not `joiningTime`, precisely so
/// this restructure preserves rather than reverses a manual skip (spec §8
/// Scenario 2: skip at position 2 of 5 leaves `(1, 3, 2, 4, 5)`).
#[test_context(TestHarness)]
#[tokio::test]
async fn skip_swaps_positions_and_undo_restores_them(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let service_id = common::create_service(&ctx.pool, business_id, 30).await.unwrap();
    let helper_id = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();

    let entries = enqueue_n(ctx, business_id, service_id, 5).await;
    let owner = owner_principal(business_id, helper_id);

    let position_2 = entries.iter().find(|e| e.current_position == 2).unwrap().id;
    ctx.engine.apply_action(position_2, Action::Skip, owner.clone()).await.expect("skip should succeed");

    let mut conn = ctx.pool.acquire().await.unwrap();
    let lane = queuedesk_core::store::queue_entry::find_lane(&mut conn, business_id, entries[0].helper_id)
        .await
        .unwrap();
    let mut positions: Vec<i32> = lane.iter().map(|e| e.current_position).collect();
    positions.sort();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);

    let swapped = lane.iter().find(|e| e.id == position_2).unwrap();
    assert_eq!(swapped.current_position, 3);
    assert_eq!(swapped.est_wait, 60);
    let partner = lane.iter().find(|e| e.current_position == 2).unwrap();
    assert_eq!(partner.est_wait, 30);

    ctx.engine.apply_action(position_2, Action::Undo, owner).await.expect("undo should succeed");
    let restored = queuedesk_core::store::queue_entry::find_entry(&mut conn, position_2).await.unwrap();
    assert_eq!(restored.current_position, 2);
    assert_eq!(restored.est_wait, 30);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn next_completes_head_and_restructure_promotes_the_rest(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let service_id = common::create_service(&ctx.pool, business_id, 30).await.unwrap();
    let helper_id = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();

    let entries = enqueue_n(ctx, business_id, service_id, 2).await;
    let owner = owner_principal(business_id, helper_id);
    let head = entries.iter().find(|e| e.current_position == 1).unwrap().id;

    let completed = ctx.engine.apply_action(head, Action::Next, owner).await.expect("next should succeed");
    assert_eq!(completed.status, QueueStatus::Completed);

    let mut conn = ctx.pool.acquire().await.unwrap();
    let remaining = queuedesk_core::store::queue_entry::find_entry(&mut conn, entries[1].id).await.unwrap();
    assert_eq!(remaining.current_position, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn next_on_a_non_head_entry_is_rejected(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let service_id = common::create_service(&ctx.pool, business_id, 30).await.unwrap();
    let helper_id = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();

    let entries = enqueue_n(ctx, business_id, service_id, 2).await;
    let owner = owner_principal(business_id, helper_id);
    let tail = entries.iter().find(|e| e.current_position == 2).unwrap().id;

    let err = ctx.engine.apply_action(tail, Action::Next, owner).await.unwrap_err();
    assert!(matches!(err, EngineError::FailedPrecondition(_)));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn a_customer_may_only_remove_their_own_entry(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let service_id = common::create_service(&ctx.pool, business_id, 30).await.unwrap();
    common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();

    let user_id = common::create_registered_user(&ctx.pool, None).await.unwrap();
    let principal = Principal { user_id, role: Role::Customer, business_id: None };
    let entries = ctx
        .engine
        .enqueue(EnqueueRequest {
            business_id,
            principal: principal.clone(),
            user_type: UserType::Normal,
            manual_id: None,
            items: vec![LineItem { service_id, gender: Gender::Male, preference: Preference::Any, helper_id: None }],
        })
        .await
        .unwrap();
    let entry_id = entries[0].id;

    let err = ctx.engine.apply_action(entry_id, Action::Hold, principal.clone()).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let removed = ctx.engine.apply_action(entry_id, Action::Remove, principal).await.expect("remove should succeed");
    assert_eq!(removed.status, QueueStatus::Removed);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn terminal_entries_never_transition_again(ctx: &TestHarness) {
    let business_id = common::create_business(&ctx.pool).await.unwrap();
    let service_id = common::create_service(&ctx.pool, business_id, 30).await.unwrap();
    let helper_id = common::create_helper(&ctx.pool, business_id, &[service_id], true).await.unwrap();

    let entries = enqueue_n(ctx, business_id, service_id, 1).await;
    let owner = owner_principal(business_id, helper_id);
    let entry_id = entries[0].id;

    ctx.engine.apply_action(entry_id, Action::Remove, owner.clone()).await.expect("remove should succeed");
    let err = ctx.engine.apply_action(entry_id, Action::Hold, owner).await.unwrap_err();
    assert!(matches!(err, EngineError::FailedPrecondition(_)));
}
