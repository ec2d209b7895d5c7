//! Business + Helper persistence (helpers are a sub-collection of a business,
//! spec §2.1).

use sqlx::{PgConnection, PgExecutor};

use super::error::{map_fetch_error, StoreError};
use super::models::{Business, Helper, HelperStatus};
use crate::common::{BusinessId, HelperId, ServiceId};

#[derive(sqlx::FromRow)]
struct BusinessRow {
    id: BusinessId,
    active: bool,
    timezone: String,
    deleted: bool,
    suspended: bool,
}

#[derive(sqlx::FromRow)]
struct HelperRow {
    helper_id: HelperId,
    business_id: BusinessId,
    status: HelperStatus,
    active: bool,
    services: Vec<ServiceId>,
}

impl From<HelperRow> for Helper {
    fn from(row: HelperRow) -> Self {
        Helper {
            helper_id: row.helper_id,
            business_id: row.business_id,
            status: row.status,
            active: row.active,
            services: row.services,
        }
    }
}

/// Loads a business with its helpers, for use inside a transaction (spec §5
/// "every write-path operation ... executes inside a single Store transaction
/// that covers every entity it reads-then-writes").
pub async fn find_business(
    conn: &mut PgConnection,
    id: BusinessId,
) -> Result<Business, StoreError> {
    let row: BusinessRow = sqlx::query_as(
        "SELECT id, active, timezone, deleted, suspended FROM businesses WHERE id = $1",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_fetch_error("business"))?;

    let helper_rows: Vec<HelperRow> = sqlx::query_as(
        "SELECT helper_id, business_id, status, active, services
         FROM helpers WHERE business_id = $1 AND status != 'removed'",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Business {
        id: row.id,
        active: row.active,
        timezone: row.timezone,
        deleted: row.deleted,
        suspended: row.suspended,
        helpers: helper_rows.into_iter().map(Helper::from).collect(),
    })
}

pub async fn set_business_active<'e, E: PgExecutor<'e>>(
    exec: E,
    id: BusinessId,
    active: bool,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE businesses SET active = $2 WHERE id = $1")
        .bind(id)
        .bind(active)
        .execute(exec)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("business"));
    }
    Ok(())
}

/// Looks up the business a helper belongs to, for routes that are only
/// given a `helperId` and must still scope authorization to a business.
pub async fn find_helper_business_id<'e, E: PgExecutor<'e>>(
    exec: E,
    helper_id: HelperId,
) -> Result<BusinessId, StoreError> {
    let row: (BusinessId,) = sqlx::query_as("SELECT business_id FROM helpers WHERE helper_id = $1")
        .bind(helper_id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| StoreError::not_found("helper"))?;
    Ok(row.0)
}

pub async fn set_helper_active<'e, E: PgExecutor<'e>>(
    exec: E,
    business_id: BusinessId,
    helper_id: HelperId,
    active: bool,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE helpers SET active = $3 WHERE business_id = $1 AND helper_id = $2",
    )
    .bind(business_id)
    .bind(helper_id)
    .bind(active)
    .execute(exec)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("helper"));
    }
    Ok(())
}
