//! seed_demo — creates a demo business with two helpers and a handful of
//! services, for manually exercising the HTTP surface. Not part of the
//! core engine; prints a bearer token ready to paste into requests.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use queuedesk_core::common::{BusinessId, HelperId, ServiceId, UserId};
use queuedesk_core::kernel::identity::{Principal, Role};
use queuedesk_core::kernel::JwtIdentityService;
use queuedesk_core::store::{Gender, HelperStatus};
use queuedesk_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.store_uri)
        .await
        .context("failed to connect to database")?;

    println!("connected to database");

    let business_id = BusinessId::new();
    sqlx::query("INSERT INTO businesses (id, active, timezone, deleted, suspended) VALUES ($1, true, $2, false, false)")
        .bind(business_id)
        .bind("America/Chicago")
        .execute(&pool)
        .await
        .context("failed to insert demo business")?;
    println!("created business {business_id}");

    let mut service_ids = Vec::new();
    for (name, duration_minutes, price) in [("Haircut", 30, 35.0), ("Beard trim", 15, 15.0), ("Shave", 20, 20.0)] {
        let service_id = ServiceId::new();
        sqlx::query(
            "INSERT INTO services (id, business_id, name, duration_minutes, price, allowed_genders, deleted)
             VALUES ($1, $2, $3, $4, $5, $6, false)",
        )
        .bind(service_id)
        .bind(business_id)
        .bind(name)
        .bind(duration_minutes)
        .bind(price)
        .bind(vec![Gender::Male, Gender::Female, Gender::Child])
        .execute(&pool)
        .await
        .context("failed to insert demo service")?;
        println!("  created service {name} ({service_id})");
        service_ids.push(service_id);
    }

    let mut helper_ids = Vec::new();
    for label in ["Alex", "Sam"] {
        let helper_id = HelperId::new();
        sqlx::query(
            "INSERT INTO helpers (helper_id, business_id, status, active, services)
             VALUES ($1, $2, $3, true, $4)",
        )
        .bind(helper_id)
        .bind(business_id)
        .bind(HelperStatus::Accepted)
        .bind(&service_ids)
        .execute(&pool)
        .await
        .context("failed to insert demo helper")?;
        println!("  created helper {label} ({helper_id})");
        helper_ids.push(helper_id);
    }

    let identity = JwtIdentityService::new(&config.session_secret, config.token_ttl_seconds);
    let owner = Principal {
        user_id: UserId::new(),
        role: Role::OwnerOrHelper,
        business_id: Some(business_id),
    };
    let token = identity.issue(&owner).context("failed to issue demo token")?;

    println!("\nseed complete");
    println!("  business_id: {business_id}");
    println!("  helper_ids:  {helper_ids:?}");
    println!("  service_ids: {service_ids:?}");
    println!("  owner bearer token: {token}");

    Ok(())
}
