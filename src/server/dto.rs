//! Shared request/response shapes for the HTTP layer (spec §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{BusinessId, HelperId, ManualCustomerId, QueueEntryId, ServiceId};
use crate::store::{Gender, Preference, QueueEntry};

/// A `[startTime, endTime]` query window, required by every time-scoped
/// read projection (spec §4.5).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineItemDto {
    pub service_id: ServiceId,
    pub gender: Gender,
    pub preference: Preference,
    pub helper_id: Option<HelperId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserTypeDto {
    Normal,
    Manual,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnqueueDto {
    pub business_id: BusinessId,
    pub user_type: UserTypeDto,
    pub manual_id: Option<ManualCustomerId>,
    pub services: Vec<LineItemDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryOut {
    pub id: QueueEntryId,
    pub business_id: BusinessId,
    pub helper_id: HelperId,
    pub service_id: ServiceId,
    pub gender: Gender,
    pub preference: Preference,
    pub joining_position: i32,
    pub current_position: i32,
    pub joining_time: DateTime<Utc>,
    pub est_service_start_time: DateTime<Utc>,
    pub est_wait: i32,
    pub status: crate::store::QueueStatus,
    pub total: f64,
    pub rating: Option<i16>,
    pub notes: Option<String>,
}

impl From<&QueueEntry> for QueueEntryOut {
    fn from(e: &QueueEntry) -> Self {
        Self {
            id: e.id,
            business_id: e.business_id,
            helper_id: e.helper_id,
            service_id: e.service_id,
            gender: e.gender,
            preference: e.preference,
            joining_position: e.joining_position,
            current_position: e.current_position,
            joining_time: e.joining_time,
            est_service_start_time: e.est_service_start_time,
            est_wait: e.est_wait,
            status: e.status,
            total: e.total,
            rating: e.rating,
            notes: e.notes.clone(),
        }
    }
}

impl From<QueueEntry> for QueueEntryOut {
    fn from(e: QueueEntry) -> Self {
        Self::from(&e)
    }
}
