use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;

use crate::common::errors::EngineError;
use crate::common::QueueEntryId;
use crate::engine::Action;
use crate::kernel::identity::Principal;
use crate::server::app::AppState;
use crate::server::dto::QueueEntryOut;
use crate::server::extract::JsonBody;
use crate::server::response::ApiResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", tag = "action", deny_unknown_fields)]
pub enum ActionDto {
    Skip,
    Hold,
    Unhold,
    Remove,
    Next,
    AddTime { added_time: i32 },
    Undo,
}

impl From<ActionDto> for Action {
    fn from(dto: ActionDto) -> Self {
        match dto {
            ActionDto::Skip => Action::Skip,
            ActionDto::Hold => Action::Hold,
            ActionDto::Unhold => Action::Unhold,
            ActionDto::Remove => Action::Remove,
            ActionDto::Next => Action::Next,
            ActionDto::AddTime { added_time } => Action::AddTime { added_time },
            ActionDto::Undo => Action::Undo,
        }
    }
}

/// `queueAction` (spec §6): apply one state-transition action to a queue entry.
pub async fn queue_action_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<QueueEntryId>,
    principal: Principal,
    JsonBody(body): JsonBody<ActionDto>,
) -> Result<Json<ApiResponse<QueueEntryOut>>, EngineError> {
    let entry = state.engine.apply_action(id, body.into(), principal).await?;
    Ok(Json(ApiResponse::ok(QueueEntryOut::from(entry))))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRatingDto {
    pub rating: i16,
    pub notes: Option<String>,
}

/// `updateRating` (spec §6): rate a completed entry, only once.
pub async fn update_rating_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<QueueEntryId>,
    principal: Principal,
    JsonBody(body): JsonBody<UpdateRatingDto>,
) -> Result<Json<ApiResponse<QueueEntryOut>>, EngineError> {
    if !(0..=5).contains(&body.rating) {
        return Err(EngineError::InvalidArgument("rating must be 0..5".into()));
    }
    let mut conn = state.deps.store.pool().acquire().await.map_err(crate::store::StoreError::from)?;
    let existing = crate::store::queue_entry::find_entry(&mut conn, id).await?;
    crate::engine::actions::authorize_rating(&mut conn, &existing, &principal).await?;
    let entry = crate::store::queue_entry::set_rating(&mut conn, id, body.rating, body.notes).await?;
    Ok(Json(ApiResponse::ok(QueueEntryOut::from(entry))))
}
