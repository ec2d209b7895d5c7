//! Read projections (spec §4.5). These are plain snapshot reads outside
//! any write transaction (spec §5 "Reads outside transactions use
//! snapshot semantics and may observe briefly-stale positions").

use chrono::{DateTime, Duration, Utc};
use sqlx::PgConnection;

use crate::common::errors::EngineError;
use crate::common::{BusinessId, HelperId, UserId};
use crate::store;
use crate::store::{HistoryEvent, HistorySource, QueueEntry};

pub struct HelperQueue {
    pub entries: Vec<QueueEntry>,
    pub in_queue_count: usize,
    pub hold_count: usize,
    pub skipped_count: usize,
}

pub async fn helper_queue(
    conn: &mut PgConnection,
    helper_id: HelperId,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
) -> Result<HelperQueue, EngineError> {
    let entries = store::queue_entry::find_helper_queue(conn, helper_id, t0, t1).await?;
    let in_queue_count = entries
        .iter()
        .filter(|e| e.status == crate::store::QueueStatus::InQueue)
        .count();
    let hold_count = entries
        .iter()
        .filter(|e| e.status == crate::store::QueueStatus::Hold)
        .count();
    let skipped_count = entries
        .iter()
        .filter(|e| e.status == crate::store::QueueStatus::Skipped)
        .count();
    Ok(HelperQueue {
        entries,
        in_queue_count,
        hold_count,
        skipped_count,
    })
}

pub struct HelperWaitTime {
    pub helper_id: HelperId,
    pub service_id: crate::common::ServiceId,
    pub queue_length: i64,
    pub estimated_wait: i64,
}

/// `(queueLength, estimatedWait = queueLength · duration)` per active
/// helper per supported service (spec §4.5 "Helper wait times").
pub async fn helper_wait_times(
    conn: &mut PgConnection,
    business_id: BusinessId,
) -> Result<Vec<HelperWaitTime>, EngineError> {
    let business = store::business::find_business(conn, business_id).await?;
    let services = store::service::find_services_by_business(conn, business_id).await?;
    let durations: std::collections::HashMap<_, _> =
        services.iter().map(|s| (s.id, s.duration_minutes as i64)).collect();

    let mut out = Vec::new();
    for helper in business.active_helpers() {
        let lengths = store::helper_wait_times::queue_lengths_by_service(conn, helper.helper_id).await?;
        for length in lengths {
            let duration = durations.get(&length.service_id).copied().unwrap_or(0);
            out.push(HelperWaitTime {
                helper_id: helper.helper_id,
                service_id: length.service_id,
                queue_length: length.queue_length,
                estimated_wait: length.queue_length * duration,
            });
        }
    }
    Ok(out)
}

/// Vendor-sourced history within the undo window across a helper's live
/// entries, excluding `undo` itself, newest first, capped at `limit`
/// (spec §4.5 "Recent helper actions").
pub async fn recent_helper_actions(
    conn: &mut PgConnection,
    helper_id: HelperId,
    undo_window_seconds: i64,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<HistoryEvent>, EngineError> {
    let entries = store::queue_entry::find_live_entries_for_helper(conn, helper_id).await?;
    let window = Duration::seconds(undo_window_seconds);

    let mut events: Vec<HistoryEvent> = entries
        .into_iter()
        .flat_map(|e| e.history)
        .filter(|event| {
            event.source == HistorySource::Vendor
                && event.action != crate::store::HistoryAction::Undo
                && now.signed_duration_since(event.at) <= window
        })
        .collect();
    events.sort_by(|a, b| b.at.cmp(&a.at));
    events.truncate(limit.min(10));
    Ok(events)
}

pub async fn user_queue_history(
    conn: &mut PgConnection,
    user_id: UserId,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, EngineError> {
    Ok(store::queue_entry::find_entries_for_user(conn, user_id, t0, t1).await?)
}

pub async fn business_queue_history(
    conn: &mut PgConnection,
    business_id: BusinessId,
    helper_id: Option<HelperId>,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, EngineError> {
    Ok(store::queue_entry::find_entries_for_business(conn, business_id, helper_id, t0, t1).await?)
}
