//! Registered-user push profile, projected from the external identity
//! service (spec §1). The engine never authenticates users itself; it
//! only reads the push/notification-relevant fields cached here.

use sqlx::PgConnection;

use super::error::{map_fetch_error, StoreError};
use super::models::RegisteredUser;
use crate::common::UserId;

pub async fn find_registered_user(
    conn: &mut PgConnection,
    id: UserId,
) -> Result<RegisteredUser, StoreError> {
    sqlx::query_as::<_, RegisteredUser>(
        "SELECT id, push_token, receive_notifications, gender, active, deleted, suspended
         FROM registered_users WHERE id = $1",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_fetch_error("user"))
}
