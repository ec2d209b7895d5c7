use axum::extract::Extension;
use axum::Json;
use serde::Deserialize;

use crate::common::errors::EngineError;
use crate::common::BusinessId;
use crate::kernel::identity::Principal;
use crate::server::app::AppState;
use crate::server::extract::{JsonBody, QueryParams};
use crate::server::response::ApiResponse;
use crate::store::{Gender, ManualCustomer, StoreError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddManualCustomerDto {
    pub business_id: BusinessId,
    pub name: String,
    pub phone: String,
    pub gender: Gender,
}

/// `manualUser.add` (spec §6).
pub async fn add_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    JsonBody(body): JsonBody<AddManualCustomerDto>,
) -> Result<Json<ApiResponse<ManualCustomer>>, EngineError> {
    crate::engine::enqueue::require_owner_or_helper(&principal, body.business_id)?;
    let mut conn = state.deps.store.pool().acquire().await.map_err(StoreError::from)?;
    let customer = crate::store::manual_customer::insert_manual_customer(
        &mut conn,
        body.business_id,
        &body.name,
        &body.phone,
        body.gender,
    )
    .await?;
    Ok(Json(ApiResponse::ok(customer)))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchManualCustomerQuery {
    pub business_id: BusinessId,
    pub query: String,
}

/// `manualUser.search` (spec §6).
pub async fn search_handler(
    Extension(state): Extension<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<SearchManualCustomerQuery>,
) -> Result<Json<ApiResponse<Vec<ManualCustomer>>>, EngineError> {
    crate::engine::enqueue::require_owner_or_helper(&principal, query.business_id)?;
    let mut conn = state.deps.store.pool().acquire().await.map_err(StoreError::from)?;
    let customers =
        crate::store::manual_customer::search_manual_customers(&mut conn, query.business_id, &query.query).await?;
    Ok(Json(ApiResponse::ok(customers)))
}
