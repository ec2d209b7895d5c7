use axum::extract::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::errors::EngineError;
use crate::common::BusinessId;
use crate::kernel::identity::Principal;
use crate::server::app::AppState;
use crate::server::extract::JsonBody;
use crate::server::response::ApiResponse;

/// `TimeWindow`'s fields inlined rather than `#[serde(flatten)]`'d in:
/// serde rejects `flatten` combined with `deny_unknown_fields` on the
/// same struct, and every inbound DTO must reject unknown fields.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestructureDto {
    pub business_id: BusinessId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestructureOut {
    pub updated_count: i64,
    pub notifications_sent: i64,
    pub active_helpers: i64,
    pub total_queues: i64,
}

/// `restructure` (spec §6): the FCFS Balancer, owner/helper-triggered.
pub async fn restructure_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    JsonBody(body): JsonBody<RestructureDto>,
) -> Result<Json<ApiResponse<RestructureOut>>, EngineError> {
    crate::engine::enqueue::require_owner_or_helper(&principal, body.business_id)?;
    let outcome = state
        .engine
        .restructure(body.business_id, body.start_time, body.end_time)
        .await?;
    Ok(Json(ApiResponse::ok(RestructureOut {
        updated_count: outcome.updated_count,
        notifications_sent: outcome.notifications_sent,
        active_helpers: outcome.active_helpers,
        total_queues: outcome.total_queues,
    })))
}
