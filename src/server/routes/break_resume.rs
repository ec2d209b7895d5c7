use axum::extract::Extension;
use axum::Json;
use serde::Deserialize;

use crate::common::errors::EngineError;
use crate::common::{BusinessId, HelperId};
use crate::engine::BreakScope;
use crate::kernel::identity::Principal;
use crate::server::app::AppState;
use crate::server::extract::JsonBody;
use crate::server::response::ApiResponse;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakResumeDto {
    pub business_id: BusinessId,
    pub helper_id: Option<HelperId>,
    /// Accepted per spec §6's `setBreak`/`resumeBreak` contract but not
    /// modeled in the scheduling state — a break has no expiry the engine
    /// itself enforces (a resume call ends it).
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

fn scope_of(dto: &BreakResumeDto) -> BreakScope {
    match dto.helper_id {
        Some(helper_id) => BreakScope::Helper(helper_id),
        None => BreakScope::Business,
    }
}

/// `setBreak` (spec §6 / §4.4).
pub async fn set_break_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    JsonBody(body): JsonBody<BreakResumeDto>,
) -> Result<Json<ApiResponse<()>>, EngineError> {
    crate::engine::enqueue::require_owner_or_helper(&principal, body.business_id)?;
    state.engine.set_break(body.business_id, scope_of(&body)).await?;
    Ok(Json(ApiResponse::ok(())))
}

/// `resumeBreak` (spec §6 / §4.4).
pub async fn resume_break_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    JsonBody(body): JsonBody<BreakResumeDto>,
) -> Result<Json<ApiResponse<()>>, EngineError> {
    crate::engine::enqueue::require_owner_or_helper(&principal, body.business_id)?;
    state.engine.resume_break(body.business_id, scope_of(&body)).await?;
    Ok(Json(ApiResponse::ok(())))
}
