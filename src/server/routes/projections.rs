use axum::extract::{Extension, Path};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::common::errors::EngineError;
use crate::common::{BusinessId, HelperId};
use crate::engine::projections;
use crate::kernel::identity::Principal;
use crate::server::app::AppState;
use crate::server::dto::{QueueEntryOut, TimeWindow};
use crate::server::extract::QueryParams;
use crate::server::response::ApiResponse;
use crate::store::HistoryEvent;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelperQueueQuery {
    pub helper_id: HelperId,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperQueueOut {
    pub entries: Vec<QueueEntryOut>,
    pub in_queue_count: usize,
    pub hold_count: usize,
    pub skipped_count: usize,
}

/// `helperQueue` (spec §6 / §4.5), owner/helper only.
pub async fn helper_queue_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<HelperQueueQuery>,
) -> Result<Json<ApiResponse<HelperQueueOut>>, EngineError> {
    let mut conn = state.deps.store.pool().acquire().await.map_err(crate::store::StoreError::from)?;
    let business_id = crate::store::business::find_helper_business_id(&mut conn, query.helper_id).await?;
    crate::engine::enqueue::require_owner_or_helper(&principal, business_id)?;
    let queue = projections::helper_queue(&mut conn, query.helper_id, query.start_time, query.end_time).await?;
    Ok(Json(ApiResponse::ok(HelperQueueOut {
        entries: queue.entries.iter().map(QueueEntryOut::from).collect(),
        in_queue_count: queue.in_queue_count,
        hold_count: queue.hold_count,
        skipped_count: queue.skipped_count,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusinessIdQuery {
    pub business_id: BusinessId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperWaitTimeOut {
    pub helper_id: HelperId,
    pub service_id: crate::common::ServiceId,
    pub queue_length: i64,
    pub estimated_wait: i64,
}

/// `helperWaitTimes` (spec §6 / §4.5), owner/helper only.
pub async fn helper_wait_times_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<BusinessIdQuery>,
) -> Result<Json<ApiResponse<Vec<HelperWaitTimeOut>>>, EngineError> {
    crate::engine::enqueue::require_owner_or_helper(&principal, query.business_id)?;
    let mut conn = state.deps.store.pool().acquire().await.map_err(crate::store::StoreError::from)?;
    let waits = projections::helper_wait_times(&mut conn, query.business_id).await?;
    let out = waits
        .into_iter()
        .map(|w| HelperWaitTimeOut {
            helper_id: w.helper_id,
            service_id: w.service_id,
            queue_length: w.queue_length,
            estimated_wait: w.estimated_wait,
        })
        .collect();
    Ok(Json(ApiResponse::ok(out)))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// `helperRecentActions` (spec §6 / §4.5), capped at 10 regardless of the
/// requested limit. Owner/helper only.
pub async fn helper_recent_actions_handler(
    Extension(state): Extension<AppState>,
    Path(helper_id): Path<HelperId>,
    principal: Principal,
    QueryParams(query): QueryParams<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryEvent>>>, EngineError> {
    let mut conn = state.deps.store.pool().acquire().await.map_err(crate::store::StoreError::from)?;
    let business_id = crate::store::business::find_helper_business_id(&mut conn, helper_id).await?;
    crate::engine::enqueue::require_owner_or_helper(&principal, business_id)?;
    let now = state.deps.clock.now();
    let events = projections::recent_helper_actions(
        &mut conn,
        helper_id,
        state.deps.config.undo_window_seconds,
        now,
        query.limit,
    )
    .await?;
    Ok(Json(ApiResponse::ok(events)))
}

/// `userQueueHistory` (spec §6): always scoped to the calling principal.
pub async fn user_queue_history_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    QueryParams(window): QueryParams<TimeWindow>,
) -> Result<Json<ApiResponse<Vec<QueueEntryOut>>>, EngineError> {
    let mut conn = state.deps.store.pool().acquire().await.map_err(crate::store::StoreError::from)?;
    let entries = projections::user_queue_history(&mut conn, principal.user_id, window.start_time, window.end_time).await?;
    Ok(Json(ApiResponse::ok(entries.iter().map(QueueEntryOut::from).collect())))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusinessHistoryQuery {
    pub business_id: BusinessId,
    pub helper_id: Option<HelperId>,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
}

/// `businessQueueHistory` (spec §6), owner/helper only.
pub async fn business_queue_history_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<BusinessHistoryQuery>,
) -> Result<Json<ApiResponse<Vec<QueueEntryOut>>>, EngineError> {
    crate::engine::enqueue::require_owner_or_helper(&principal, query.business_id)?;
    let mut conn = state.deps.store.pool().acquire().await.map_err(crate::store::StoreError::from)?;
    let entries = projections::business_queue_history(
        &mut conn,
        query.business_id,
        query.helper_id,
        query.start_time,
        query.end_time,
    )
    .await?;
    Ok(Json(ApiResponse::ok(entries.iter().map(QueueEntryOut::from).collect())))
}
