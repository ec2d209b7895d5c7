//! Break and resume (spec §4.4). Both scopes mutate a scheduling flag and
//! rely on the caller to trigger a restructure afterward.

use sqlx::PgConnection;

use crate::common::errors::EngineError;
use crate::common::{BusinessId, HelperId};
use crate::store;

#[derive(Debug, Clone, Copy)]
pub enum BreakScope {
    Business,
    Helper(HelperId),
}

/// Sets the business-wide or helper-scoped `active` flag to `false`
/// (spec §4.4 "Break"). Returns the scope so the caller can decide the
/// restructure window.
pub async fn set_break(
    conn: &mut PgConnection,
    business_id: BusinessId,
    scope: BreakScope,
) -> Result<(), EngineError> {
    apply_scope(conn, business_id, scope, false).await
}

/// The inverse of [`set_break`] (spec §4.4 "Resume").
pub async fn resume_break(
    conn: &mut PgConnection,
    business_id: BusinessId,
    scope: BreakScope,
) -> Result<(), EngineError> {
    apply_scope(conn, business_id, scope, true).await
}

async fn apply_scope(
    conn: &mut PgConnection,
    business_id: BusinessId,
    scope: BreakScope,
    active: bool,
) -> Result<(), EngineError> {
    match scope {
        BreakScope::Business => {
            store::business::set_business_active(&mut *conn, business_id, active).await?
        }
        BreakScope::Helper(helper_id) => {
            store::business::set_helper_active(&mut *conn, business_id, helper_id, active).await?
        }
    }
    Ok(())
}
