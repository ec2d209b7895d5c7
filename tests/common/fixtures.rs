//! Test fixtures for creating businesses, helpers, services, and customers.

use anyhow::Result;
use sqlx::PgPool;

use queuedesk_core::common::{BusinessId, HelperId, ManualCustomerId, ServiceId, UserId};
use queuedesk_core::store::{Gender, HelperStatus};

pub async fn create_business(pool: &PgPool) -> Result<BusinessId> {
    let id = BusinessId::new();
    sqlx::query("INSERT INTO businesses (id, active, timezone, deleted, suspended) VALUES ($1, true, 'America/Chicago', false, false)")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(id)
}

pub async fn create_service(pool: &PgPool, business_id: BusinessId, duration_minutes: i32) -> Result<ServiceId> {
    let id = ServiceId::new();
    sqlx::query(
        "INSERT INTO services (id, business_id, name, duration_minutes, price, allowed_genders, deleted)
         VALUES ($1, $2, 'Haircut', $3, 30.0, $4, false)",
    )
    .bind(id)
    .bind(business_id)
    .bind(duration_minutes)
    .bind(vec![Gender::Male, Gender::Female, Gender::Child])
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn create_helper(
    pool: &PgPool,
    business_id: BusinessId,
    services: &[ServiceId],
    active: bool,
) -> Result<HelperId> {
    let id = HelperId::new();
    sqlx::query(
        "INSERT INTO helpers (helper_id, business_id, status, active, services)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(business_id)
    .bind(HelperStatus::Accepted)
    .bind(active)
    .bind(services)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn create_registered_user(pool: &PgPool, push_token: Option<&str>) -> Result<UserId> {
    let id = UserId::new();
    sqlx::query(
        "INSERT INTO registered_users (id, push_token, receive_notifications, gender, active, deleted, suspended)
         VALUES ($1, $2, true, 'male', true, false, false)",
    )
    .bind(id)
    .bind(push_token)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn create_manual_customer(pool: &PgPool, business_id: BusinessId) -> Result<ManualCustomerId> {
    let id = ManualCustomerId::new();
    sqlx::query("INSERT INTO manual_customers (id, business_id, name, phone, gender) VALUES ($1, $2, 'Walk-in', '555-0100', 'male')")
        .bind(id)
        .bind(business_id)
        .execute(pool)
        .await?;
    Ok(id)
}
