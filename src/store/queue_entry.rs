//! Queue entry persistence (spec §3 "Queue entry", §6 persistence:
//! "The `HistoryEvent` list is an append-only array inside each queue entry").

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Row};

use super::error::{map_fetch_error, StoreError};
use super::models::{CustomerRef, Gender, HistoryEvent, Preference, QueueEntry, QueueStatus};
use crate::common::{BusinessId, HelperId, ManualCustomerId, QueueEntryId, ServiceId, UserId};

fn row_to_entry(row: sqlx::postgres::PgRow) -> Result<QueueEntry, sqlx::Error> {
    let user_ref = match row.try_get::<Option<UserId>, _>("user_id")? {
        Some(user_id) => CustomerRef::Registered(user_id),
        None => CustomerRef::Manual(row.try_get::<ManualCustomerId, _>("manual_customer_id")?),
    };
    let history: sqlx::types::Json<Vec<HistoryEvent>> = row.try_get("history")?;

    Ok(QueueEntry {
        id: row.try_get("id")?,
        business_id: row.try_get("business_id")?,
        helper_id: row.try_get("helper_id")?,
        user_ref,
        service_id: row.try_get("service_id")?,
        gender: row.try_get("gender")?,
        preference: row.try_get("preference")?,
        joining_position: row.try_get("joining_position")?,
        current_position: row.try_get("current_position")?,
        joining_time: row.try_get("joining_time")?,
        est_service_start_time: row.try_get("est_service_start_time")?,
        est_wait: row.try_get("est_wait")?,
        added_time_overlay: row.try_get("added_time_overlay")?,
        status: row.try_get("status")?,
        total: row.try_get("total")?,
        rating: row.try_get("rating")?,
        notes: row.try_get("notes")?,
        history: history.0,
        created_at: row.try_get("created_at")?,
    })
}

const SELECT_COLUMNS: &str = "id, business_id, helper_id, user_id, manual_customer_id, \
     service_id, gender, preference, joining_position, current_position, joining_time, \
     est_service_start_time, est_wait, added_time_overlay, status, total, rating, notes, \
     history, created_at";

pub async fn find_entry(
    conn: &mut PgConnection,
    id: QueueEntryId,
) -> Result<QueueEntry, StoreError> {
    let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM queue_entries WHERE id = $1"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_fetch_error("queue entry"))?;
    row_to_entry(row).map_err(StoreError::from)
}

/// Counts current entries `(business_id, helper_id, status ∈ {in_queue,hold,skipped})`
/// (spec §4.1, used to assign `joiningPosition`).
pub async fn count_lane(
    conn: &mut PgConnection,
    business_id: BusinessId,
    helper_id: HelperId,
) -> Result<i64, StoreError> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM queue_entries
         WHERE business_id = $1 AND helper_id = $2
           AND status IN ('in_queue', 'hold', 'skipped')",
    )
    .bind(business_id)
    .bind(helper_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.try_get::<i64, _>("n")?)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_entry(
    conn: &mut PgConnection,
    business_id: BusinessId,
    helper_id: HelperId,
    user_ref: CustomerRef,
    service_id: ServiceId,
    gender: Gender,
    preference: Preference,
    joining_position: i32,
    est_wait: i32,
    total: f64,
    now: DateTime<Utc>,
) -> Result<QueueEntry, StoreError> {
    let id = QueueEntryId::new();
    let (user_id, manual_customer_id): (Option<UserId>, Option<ManualCustomerId>) = match user_ref
    {
        CustomerRef::Registered(u) => (Some(u), None),
        CustomerRef::Manual(m) => (None, Some(m)),
    };
    let est_service_start_time = now + chrono::Duration::minutes(est_wait as i64);
    let history: Vec<HistoryEvent> = Vec::new();

    let row = sqlx::query(&format!(
        "INSERT INTO queue_entries (
            id, business_id, helper_id, user_id, manual_customer_id, service_id, gender,
            preference, joining_position, current_position, joining_time,
            est_service_start_time, est_wait, added_time_overlay, status, total, rating,
            notes, history, created_at
         ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10, $11, $12, 0, 'in_queue', $13, NULL,
            NULL, $14, $10
         ) RETURNING {SELECT_COLUMNS}"
    ))
    .bind(id)
    .bind(business_id)
    .bind(helper_id)
    .bind(user_id)
    .bind(manual_customer_id)
    .bind(service_id)
    .bind(gender)
    .bind(preference)
    .bind(joining_position)
    .bind(now)
    .bind(est_service_start_time)
    .bind(est_wait)
    .bind(total)
    .bind(sqlx::types::Json(history))
    .fetch_one(&mut *conn)
    .await?;

    row_to_entry(row).map_err(StoreError::from)
}

/// Persists the mutable fields of an entry after an action or restructure step,
/// appending `new_history` to the log (spec §4.2/§4.3).
pub async fn save_entry(
    conn: &mut PgConnection,
    entry: &QueueEntry,
) -> Result<(), StoreError> {
    let (user_id, manual_customer_id): (Option<UserId>, Option<ManualCustomerId>) =
        match entry.user_ref {
            CustomerRef::Registered(u) => (Some(u), None),
            CustomerRef::Manual(m) => (None, Some(m)),
        };

    let result = sqlx::query(
        "UPDATE queue_entries SET
            helper_id = $2, user_id = $3, manual_customer_id = $4,
            current_position = $5, est_service_start_time = $6, est_wait = $7,
            added_time_overlay = $8, status = $9, total = $10, rating = $11,
            notes = $12, history = $13
         WHERE id = $1",
    )
    .bind(entry.id)
    .bind(entry.helper_id)
    .bind(user_id)
    .bind(manual_customer_id)
    .bind(entry.current_position)
    .bind(entry.est_service_start_time)
    .bind(entry.est_wait)
    .bind(entry.added_time_overlay)
    .bind(entry.status)
    .bind(entry.total)
    .bind(entry.rating)
    .bind(&entry.notes)
    .bind(sqlx::types::Json(&entry.history))
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("queue entry"));
    }
    Ok(())
}

/// Loads every live lane entry for a business within `[t0, t1]`, ordered by
/// `joiningTime` ascending (spec §4.3 Step 2, FCFS).
pub async fn find_live_entries_in_window(
    conn: &mut PgConnection,
    business_id: BusinessId,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM queue_entries
         WHERE business_id = $1 AND status IN ('in_queue', 'hold', 'skipped')
           AND created_at BETWEEN $2 AND $3
         ORDER BY joining_time ASC"
    ))
    .bind(business_id)
    .bind(t0)
    .bind(t1)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter()
        .map(|r| row_to_entry(r).map_err(StoreError::from))
        .collect()
}

/// All live entries of one `(business, helper)` lane, ordered by position
/// (spec §4.2 `skip`'s "next entry in same lane").
pub async fn find_lane(
    conn: &mut PgConnection,
    business_id: BusinessId,
    helper_id: HelperId,
) -> Result<Vec<QueueEntry>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM queue_entries
         WHERE business_id = $1 AND helper_id = $2 AND status IN ('in_queue', 'hold', 'skipped')
         ORDER BY current_position ASC"
    ))
    .bind(business_id)
    .bind(helper_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter()
        .map(|r| row_to_entry(r).map_err(StoreError::from))
        .collect()
}

/// Every live entry of a business, with no time-window restriction — used
/// to notify all affected customers on a business-wide break (spec §4.4).
pub async fn find_live_entries_for_business(
    conn: &mut PgConnection,
    business_id: BusinessId,
) -> Result<Vec<QueueEntry>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM queue_entries
         WHERE business_id = $1 AND status IN ('in_queue', 'hold', 'skipped')"
    ))
    .bind(business_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter()
        .map(|r| row_to_entry(r).map_err(StoreError::from))
        .collect()
}

/// Helper-queue projection (spec §4.5): live entries for one helper, sorted
/// by `(currentPosition asc, joiningTime asc)`.
pub async fn find_helper_queue(
    conn: &mut PgConnection,
    helper_id: HelperId,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM queue_entries
         WHERE helper_id = $1 AND status IN ('in_queue', 'hold', 'skipped')
           AND created_at BETWEEN $2 AND $3
         ORDER BY current_position ASC, joining_time ASC"
    ))
    .bind(helper_id)
    .bind(t0)
    .bind(t1)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter()
        .map(|r| row_to_entry(r).map_err(StoreError::from))
        .collect()
}

/// Full history read for a principal (`userQueueHistory`).
pub async fn find_entries_for_user(
    conn: &mut PgConnection,
    user_id: UserId,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM queue_entries
         WHERE user_id = $1 AND created_at BETWEEN $2 AND $3
         ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .bind(t0)
    .bind(t1)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter()
        .map(|r| row_to_entry(r).map_err(StoreError::from))
        .collect()
}

/// Full history read for a business, optionally filtered by helper (`businessQueueHistory`).
pub async fn find_entries_for_business(
    conn: &mut PgConnection,
    business_id: BusinessId,
    helper_id: Option<HelperId>,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, StoreError> {
    let rows = match helper_id {
        Some(helper_id) => {
            sqlx::query(&format!(
                "SELECT {SELECT_COLUMNS} FROM queue_entries
                 WHERE business_id = $1 AND helper_id = $2 AND created_at BETWEEN $3 AND $4
                 ORDER BY created_at DESC"
            ))
            .bind(business_id)
            .bind(helper_id)
            .bind(t0)
            .bind(t1)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {SELECT_COLUMNS} FROM queue_entries
                 WHERE business_id = $1 AND created_at BETWEEN $2 AND $3
                 ORDER BY created_at DESC"
            ))
            .bind(business_id)
            .bind(t0)
            .bind(t1)
            .fetch_all(&mut *conn)
            .await?
        }
    };
    rows.into_iter()
        .map(|r| row_to_entry(r).map_err(StoreError::from))
        .collect()
}

/// Updates rating/notes on a completed entry that has no rating yet
/// (`updateRating`, spec §6).
pub async fn set_rating(
    conn: &mut PgConnection,
    id: QueueEntryId,
    rating: i16,
    notes: Option<String>,
) -> Result<QueueEntry, StoreError> {
    let row = sqlx::query(&format!(
        "UPDATE queue_entries SET rating = $2, notes = COALESCE($3, notes)
         WHERE id = $1 AND status = 'completed' AND rating IS NULL
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(id)
    .bind(rating)
    .bind(notes)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| StoreError::not_found("completed queue entry without a rating"))?;
    row_to_entry(row).map_err(StoreError::from)
}

/// Recent vendor-sourced history, for `helperRecentActions` (spec §4.5).
pub async fn find_live_entries_for_helper(
    conn: &mut PgConnection,
    helper_id: HelperId,
) -> Result<Vec<QueueEntry>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM queue_entries
         WHERE helper_id = $1 AND status IN ('in_queue', 'hold', 'skipped')"
    ))
    .bind(helper_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter()
        .map(|r| row_to_entry(r).map_err(StoreError::from))
        .collect()
}
