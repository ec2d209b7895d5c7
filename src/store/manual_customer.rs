//! Manual (walk-in) customer persistence (spec §3, §6 `manualUser.*`).

use sqlx::PgConnection;

use super::error::{map_fetch_error, StoreError};
use super::models::{Gender, ManualCustomer};
use crate::common::{BusinessId, ManualCustomerId};

pub async fn find_manual_customer(
    conn: &mut PgConnection,
    id: ManualCustomerId,
) -> Result<ManualCustomer, StoreError> {
    sqlx::query_as::<_, ManualCustomer>(
        "SELECT id, business_id, name, phone, gender FROM manual_customers WHERE id = $1",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_fetch_error("manual customer"))
}

pub async fn insert_manual_customer(
    conn: &mut PgConnection,
    business_id: BusinessId,
    name: &str,
    phone: &str,
    gender: Gender,
) -> Result<ManualCustomer, StoreError> {
    let id = ManualCustomerId::new();
    sqlx::query_as::<_, ManualCustomer>(
        "INSERT INTO manual_customers (id, business_id, name, phone, gender)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, business_id, name, phone, gender",
    )
    .bind(id)
    .bind(business_id)
    .bind(name)
    .bind(phone)
    .bind(gender)
    .fetch_one(&mut *conn)
    .await
    .map_err(StoreError::from)
}

/// Search manual customers of a business by name/phone substring (`manualUser.search`).
pub async fn search_manual_customers(
    conn: &mut PgConnection,
    business_id: BusinessId,
    query: &str,
) -> Result<Vec<ManualCustomer>, StoreError> {
    let like = format!("%{query}%");
    let rows = sqlx::query_as::<_, ManualCustomer>(
        "SELECT id, business_id, name, phone, gender FROM manual_customers
         WHERE business_id = $1 AND (name ILIKE $2 OR phone ILIKE $2)
         ORDER BY name ASC",
    )
    .bind(business_id)
    .bind(like)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
