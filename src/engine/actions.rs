//! The per-entry action state machine and its undo (spec §4.2).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgConnection;

use crate::common::errors::EngineError;
use crate::common::{HelperId, QueueEntryId};
use crate::kernel::identity::{Principal, Role};
use crate::store;
use crate::store::{CustomerRef, HistoryAction, HistoryEvent, HistorySource, QueueEntry, QueueStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Skip,
    Hold,
    Unhold,
    Remove,
    Next,
    AddTime { added_time: i32 },
    Undo,
}

/// Whether `principal` is an owner or an `accepted ∧ active` helper of
/// `business_id`. A `Helper` record has no separate owner/helper
/// distinction (spec §3), so an `OwnerOrHelper` token is authorized by
/// holding a matching, participating `Helper` row in the scoped
/// business — the token's `user_id` doubles as that row's `helper_id`.
async fn is_participating_owner_or_helper(
    conn: &mut PgConnection,
    business_id: crate::common::BusinessId,
    principal: &Principal,
) -> Result<bool, EngineError> {
    if principal.role != Role::OwnerOrHelper || principal.business_id != Some(business_id) {
        return Ok(false);
    }
    let business = store::business::find_business(conn, business_id).await?;
    let helper_id = HelperId::from_uuid(principal.user_id.into_uuid());
    Ok(business.helper(helper_id).map(|h| h.participates()).unwrap_or(false))
}

/// Spec §4.2 "Authorization rules (enforced first)": a registered-user
/// principal may only apply `remove` and only to their own entry; an
/// owner or an `accepted ∧ active` helper of the entry's business may
/// apply any action.
async fn check_authorization(
    conn: &mut PgConnection,
    entry: &QueueEntry,
    action: Action,
    principal: &Principal,
) -> Result<(), EngineError> {
    match principal.role {
        Role::Customer => {
            let owns = matches!(entry.user_ref, CustomerRef::Registered(uid) if uid == principal.user_id);
            if !owns {
                return Err(EngineError::Forbidden("not the owner of this entry".into()));
            }
            if action != Action::Remove {
                return Err(EngineError::Forbidden(
                    "a customer principal may only apply `remove`".into(),
                ));
            }
            Ok(())
        }
        Role::OwnerOrHelper => {
            if !is_participating_owner_or_helper(conn, entry.business_id, principal).await? {
                return Err(EngineError::Forbidden(
                    "not an accepted, active helper of this entry's business".into(),
                ));
            }
            Ok(())
        }
    }
}

/// Authorization for `updateRating`: the registered-user customer who
/// owns the entry, or an owner/participating helper of its business
/// (spec §3 "post-service `rating` and `notes` fill-in").
pub async fn authorize_rating(
    conn: &mut PgConnection,
    entry: &QueueEntry,
    principal: &Principal,
) -> Result<(), EngineError> {
    match principal.role {
        Role::Customer => {
            let owns = matches!(entry.user_ref, CustomerRef::Registered(uid) if uid == principal.user_id);
            if !owns {
                return Err(EngineError::Forbidden("not the owner of this entry".into()));
            }
            Ok(())
        }
        Role::OwnerOrHelper => {
            if !is_participating_owner_or_helper(conn, entry.business_id, principal).await? {
                return Err(EngineError::Forbidden(
                    "not an accepted, active helper of this entry's business".into(),
                ));
            }
            Ok(())
        }
    }
}

async fn service_duration(conn: &mut PgConnection, service_id: crate::common::ServiceId) -> Result<i32, EngineError> {
    Ok(store::service::find_service(conn, service_id).await?.duration_minutes)
}

fn push_event(entry: &mut QueueEntry, event: HistoryEvent) {
    entry.history.push(event);
}

/// Applies one state-transition action to a queue entry, persisting the
/// result in the caller's transaction (spec §4.2 `applyAction`). The
/// caller is responsible for triggering the §4.3 restructure afterward,
/// on a separate transaction, once this one commits.
pub async fn apply_action(
    conn: &mut PgConnection,
    entry_id: QueueEntryId,
    action: Action,
    principal: &Principal,
    undo_window_seconds: i64,
    now: DateTime<Utc>,
) -> Result<QueueEntry, EngineError> {
    let mut entry = store::queue_entry::find_entry(conn, entry_id).await?;
    check_authorization(conn, &entry, action, principal).await?;

    match action {
        Action::Skip => apply_skip(conn, &mut entry, now).await?,
        Action::Hold => apply_hold(&mut entry, now)?,
        Action::Unhold => apply_unhold(&mut entry, now)?,
        Action::Remove => apply_remove(&mut entry, now)?,
        Action::Next => apply_next(&mut entry, now)?,
        Action::AddTime { added_time } => apply_add_time(&mut entry, added_time, now)?,
        Action::Undo => return apply_undo(conn, entry_id, undo_window_seconds, now).await,
    }

    store::queue_entry::save_entry(conn, &entry).await?;
    Ok(entry)
}

async fn apply_skip(conn: &mut PgConnection, entry: &mut QueueEntry, now: DateTime<Utc>) -> Result<(), EngineError> {
    if entry.status != QueueStatus::InQueue {
        return Err(EngineError::FailedPrecondition(
            "skip requires status=in_queue".into(),
        ));
    }
    let lane = store::queue_entry::find_lane(conn, entry.business_id, entry.helper_id).await?;
    let mut next = lane
        .into_iter()
        .filter(|e| {
            e.id != entry.id && e.status == QueueStatus::InQueue && e.current_position > entry.current_position
        })
        .collect::<Vec<_>>();
    next.sort_by_key(|e| e.current_position);
    let mut partner = next.into_iter().next().ok_or_else(|| {
        EngineError::FailedPrecondition("no next in_queue entry to skip ahead of".into())
    })?;

    let prev_position = entry.current_position;
    let new_position = partner.current_position;
    std::mem::swap(&mut entry.current_position, &mut partner.current_position);

    let entry_duration = service_duration(conn, entry.service_id).await?;
    let partner_duration = service_duration(conn, partner.service_id).await?;
    entry.recompute_est_wait(entry_duration, now);
    partner.recompute_est_wait(partner_duration, now);

    push_event(
        entry,
        HistoryEvent {
            action: HistoryAction::Skip,
            source: HistorySource::Vendor,
            at: now,
            prev_position: Some(prev_position),
            new_position: Some(new_position),
            added_time: None,
            est_wait: Some(entry.est_wait),
            newly_assigned_helper_id: None,
        },
    );
    store::queue_entry::save_entry(conn, &partner).await?;
    Ok(())
}

fn apply_hold(entry: &mut QueueEntry, now: DateTime<Utc>) -> Result<(), EngineError> {
    if entry.status != QueueStatus::InQueue {
        return Err(EngineError::FailedPrecondition("hold requires status=in_queue".into()));
    }
    entry.status = QueueStatus::Hold;
    push_event(
        entry,
        HistoryEvent {
            action: HistoryAction::Hold,
            source: HistorySource::Vendor,
            at: now,
            prev_position: Some(entry.current_position),
            new_position: Some(entry.current_position),
            added_time: None,
            est_wait: Some(entry.est_wait),
            newly_assigned_helper_id: None,
        },
    );
    Ok(())
}

fn apply_unhold(entry: &mut QueueEntry, now: DateTime<Utc>) -> Result<(), EngineError> {
    if entry.status != QueueStatus::Hold {
        return Err(EngineError::FailedPrecondition("unhold requires status=hold".into()));
    }
    entry.status = QueueStatus::InQueue;
    push_event(
        entry,
        HistoryEvent {
            action: HistoryAction::Unhold,
            source: HistorySource::Vendor,
            at: now,
            prev_position: Some(entry.current_position),
            new_position: Some(entry.current_position),
            added_time: None,
            est_wait: Some(entry.est_wait),
            newly_assigned_helper_id: None,
        },
    );
    Ok(())
}

fn apply_remove(entry: &mut QueueEntry, now: DateTime<Utc>) -> Result<(), EngineError> {
    if entry.status.is_terminal() {
        return Err(EngineError::FailedPrecondition(
            "entry is already terminal".into(),
        ));
    }
    entry.status = QueueStatus::Removed;
    push_event(
        entry,
        HistoryEvent {
            action: HistoryAction::Remove,
            source: HistorySource::Vendor,
            at: now,
            prev_position: Some(entry.current_position),
            new_position: None,
            added_time: None,
            est_wait: None,
            newly_assigned_helper_id: None,
        },
    );
    Ok(())
}

fn apply_next(entry: &mut QueueEntry, now: DateTime<Utc>) -> Result<(), EngineError> {
    if entry.status != QueueStatus::InQueue || entry.current_position != 1 {
        return Err(EngineError::FailedPrecondition(
            "next requires status=in_queue and currentPosition=1".into(),
        ));
    }
    entry.status = QueueStatus::Completed;
    push_event(
        entry,
        HistoryEvent {
            action: HistoryAction::Next,
            source: HistorySource::Vendor,
            at: now,
            prev_position: Some(1),
            new_position: None,
            added_time: None,
            est_wait: None,
            newly_assigned_helper_id: None,
        },
    );
    Ok(())
}

fn apply_add_time(entry: &mut QueueEntry, added_time: i32, now: DateTime<Utc>) -> Result<(), EngineError> {
    if added_time <= 0 {
        return Err(EngineError::InvalidArgument("addedTime must be > 0".into()));
    }
    if !matches!(
        entry.status,
        QueueStatus::InQueue | QueueStatus::Hold | QueueStatus::Skipped
    ) {
        return Err(EngineError::FailedPrecondition(
            "add_time requires status in {in_queue, hold, skipped}".into(),
        ));
    }
    entry.added_time_overlay += added_time;
    entry.est_wait += added_time;
    entry.est_service_start_time = entry.est_service_start_time + ChronoDuration::minutes(added_time as i64);
    push_event(
        entry,
        HistoryEvent {
            action: HistoryAction::AddTime,
            source: HistorySource::Vendor,
            at: now,
            prev_position: None,
            new_position: None,
            added_time: Some(added_time),
            est_wait: Some(entry.est_wait),
            newly_assigned_helper_id: None,
        },
    );
    Ok(())
}

async fn apply_undo(
    conn: &mut PgConnection,
    entry_id: QueueEntryId,
    undo_window_seconds: i64,
    now: DateTime<Utc>,
) -> Result<QueueEntry, EngineError> {
    let mut entry = store::queue_entry::find_entry(conn, entry_id).await?;

    let target = entry
        .history
        .iter()
        .rev()
        .find(|event| {
            event.source == HistorySource::Vendor
                && event.action != HistoryAction::Undo
                && now.signed_duration_since(event.at) <= ChronoDuration::seconds(undo_window_seconds)
        })
        .cloned()
        .ok_or_else(|| {
            EngineError::InvalidArgument("no undoable vendor action within the undo window".into())
        })?;

    match target.action {
        HistoryAction::Skip => {
            let prev_position = target.prev_position.ok_or_else(|| {
                EngineError::Internal("skip event missing prevPosition".into())
            })?;
            let lane = store::queue_entry::find_lane(conn, entry.business_id, entry.helper_id).await?;
            let mut counterpart = lane
                .into_iter()
                .find(|e| e.id != entry.id && e.current_position == prev_position)
                .ok_or_else(|| {
                    EngineError::FailedPrecondition(
                        "counterpart entry no longer occupies the recorded position".into(),
                    )
                })?;
            let new_position = target.new_position.ok_or_else(|| {
                EngineError::Internal("skip event missing newPosition".into())
            })?;
            entry.current_position = prev_position;
            counterpart.current_position = new_position;
            let entry_duration = service_duration(conn, entry.service_id).await?;
            let counterpart_duration = service_duration(conn, counterpart.service_id).await?;
            entry.recompute_est_wait(entry_duration, now);
            counterpart.recompute_est_wait(counterpart_duration, now);
            store::queue_entry::save_entry(conn, &counterpart).await?;
        }
        HistoryAction::Hold => entry.status = QueueStatus::InQueue,
        HistoryAction::Unhold => entry.status = QueueStatus::Hold,
        HistoryAction::Remove => entry.status = QueueStatus::InQueue,
        HistoryAction::Next => entry.status = QueueStatus::InQueue,
        HistoryAction::AddTime => {
            let added_time = target.added_time.ok_or_else(|| {
                EngineError::Internal("add_time event missing addedTime".into())
            })?;
            entry.added_time_overlay -= added_time;
            entry.est_wait -= added_time;
            entry.est_service_start_time =
                entry.est_service_start_time - ChronoDuration::minutes(added_time as i64);
        }
        HistoryAction::Edit | HistoryAction::Undo => {
            return Err(EngineError::InvalidArgument(
                "the last vendor action is not undoable".into(),
            ));
        }
    }

    push_event(
        &mut entry,
        HistoryEvent {
            action: HistoryAction::Undo,
            source: HistorySource::Vendor,
            at: now,
            prev_position: target.new_position,
            new_position: target.prev_position,
            added_time: target.added_time,
            est_wait: Some(entry.est_wait),
            newly_assigned_helper_id: None,
        },
    );
    store::queue_entry::save_entry(conn, &entry).await?;
    Ok(entry)
}
