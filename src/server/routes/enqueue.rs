use axum::extract::Extension;
use axum::Json;

use crate::common::errors::EngineError;
use crate::engine::{EnqueueRequest, LineItem, UserType};
use crate::kernel::identity::Principal;
use crate::server::app::AppState;
use crate::server::dto::{EnqueueDto, QueueEntryOut, UserTypeDto};
use crate::server::extract::JsonBody;
use crate::server::response::ApiResponse;

pub async fn enqueue_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    JsonBody(body): JsonBody<EnqueueDto>,
) -> Result<Json<ApiResponse<Vec<QueueEntryOut>>>, EngineError> {
    let request = EnqueueRequest {
        business_id: body.business_id,
        principal,
        user_type: match body.user_type {
            UserTypeDto::Normal => UserType::Normal,
            UserTypeDto::Manual => UserType::Manual,
        },
        manual_id: body.manual_id,
        items: body
            .services
            .into_iter()
            .map(|item| LineItem {
                service_id: item.service_id,
                gender: item.gender,
                preference: item.preference,
                helper_id: item.helper_id,
            })
            .collect(),
    };

    let entries = state.engine.enqueue(request).await?;
    let out: Vec<QueueEntryOut> = entries.iter().map(QueueEntryOut::from).collect();
    Ok(Json(ApiResponse::ok(out)))
}
