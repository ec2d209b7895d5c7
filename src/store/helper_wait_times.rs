//! Per-helper/per-service wait-time projection (spec §4.5 "Helper wait times").

use sqlx::{PgConnection, Row};

use super::error::StoreError;
use crate::common::{HelperId, ServiceId};

pub struct ServiceQueueLength {
    pub service_id: ServiceId,
    pub queue_length: i64,
}

/// For one helper, the current live queue length grouped by service. The
/// caller multiplies by each service's `duration` to get `estimatedWait`.
pub async fn queue_lengths_by_service(
    conn: &mut PgConnection,
    helper_id: HelperId,
) -> Result<Vec<ServiceQueueLength>, StoreError> {
    let rows = sqlx::query(
        "SELECT service_id, COUNT(*) AS queue_length FROM queue_entries
         WHERE helper_id = $1 AND status IN ('in_queue', 'hold', 'skipped')
         GROUP BY service_id",
    )
    .bind(helper_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ServiceQueueLength {
            service_id: row.get("service_id"),
            queue_length: row.get("queue_length"),
        })
        .collect())
}
