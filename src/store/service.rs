//! Service persistence (spec §3 "Service").

use sqlx::PgConnection;

use super::error::{map_fetch_error, StoreError};
use super::models::Service;
use crate::common::{BusinessId, ServiceId};

pub async fn find_service(
    conn: &mut PgConnection,
    id: ServiceId,
) -> Result<Service, StoreError> {
    sqlx::query_as::<_, Service>(
        "SELECT id, business_id, name, duration_minutes, price, allowed_genders, deleted
         FROM services WHERE id = $1",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_fetch_error("service"))
}

pub async fn find_services_by_business(
    conn: &mut PgConnection,
    business_id: BusinessId,
) -> Result<Vec<Service>, StoreError> {
    let rows = sqlx::query_as::<_, Service>(
        "SELECT id, business_id, name, duration_minutes, price, allowed_genders, deleted
         FROM services WHERE business_id = $1 AND deleted = false",
    )
    .bind(business_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
