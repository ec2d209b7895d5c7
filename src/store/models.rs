//! The data model of spec §3, expressed as plain structs with explicit
//! ids — no cyclic owned references (spec §9 "Cyclic references").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::common::{BusinessId, HelperId, ManualCustomerId, QueueEntryId, ServiceId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum HelperStatus {
    Pending,
    Accepted,
    Rejected,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum Preference {
    Any,
    Specific,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum QueueStatus {
    InQueue,
    Hold,
    Skipped,
    Completed,
    Removed,
}

impl QueueStatus {
    /// Statuses that occupy a position in a lane (spec §3 I1, GLOSSARY "Lane").
    pub fn is_live(self) -> bool {
        matches!(
            self,
            QueueStatus::InQueue | QueueStatus::Hold | QueueStatus::Skipped
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Removed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum HistoryAction {
    Skip,
    Hold,
    Unhold,
    Remove,
    Next,
    AddTime,
    Edit,
    Undo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum HistorySource {
    User,
    Vendor,
}

/// An entry in a queue entry's append-only history log (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub action: HistoryAction,
    pub source: HistorySource,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_position: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_position: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_time: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_wait: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newly_assigned_helper_id: Option<HelperId>,
}

/// A helper embedded in a [`Business`] (spec §3 "Helper (embedded in Business)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Helper {
    pub helper_id: HelperId,
    pub business_id: BusinessId,
    pub status: HelperStatus,
    pub active: bool,
    pub services: Vec<ServiceId>,
}

impl Helper {
    /// Only helpers with `status=accepted ∧ active=true` participate in scheduling (spec §3).
    pub fn participates(&self) -> bool {
        self.status == HelperStatus::Accepted && self.active
    }

    pub fn capable_of(&self, service_id: ServiceId) -> bool {
        self.services.contains(&service_id)
    }
}

/// A business with its helpers loaded by value (no cyclic references).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub active: bool,
    pub timezone: String,
    pub deleted: bool,
    pub suspended: bool,
    pub helpers: Vec<Helper>,
}

impl Business {
    pub fn active_helpers(&self) -> impl Iterator<Item = &Helper> {
        self.helpers.iter().filter(|h| h.participates())
    }

    pub fn helper(&self, id: HelperId) -> Option<&Helper> {
        self.helpers.iter().find(|h| h.helper_id == id)
    }
}

/// A service offered by a business (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: ServiceId,
    pub business_id: BusinessId,
    pub name: String,
    pub duration_minutes: i32,
    pub price: f64,
    pub allowed_genders: Vec<Gender>,
    pub deleted: bool,
}

/// A registered user's push-notification profile, as projected into the
/// Store from the external identity service (spec §1 "identity service").
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegisteredUser {
    pub id: UserId,
    pub push_token: Option<String>,
    pub receive_notifications: bool,
    pub gender: Gender,
    pub active: bool,
    pub deleted: bool,
    pub suspended: bool,
}

/// A manual (walk-in) customer, created directly by the business (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ManualCustomer {
    pub id: ManualCustomerId,
    pub business_id: BusinessId,
    pub name: String,
    pub phone: String,
    pub gender: Gender,
}

/// Either side of the `userRef` union on a queue entry (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerRef {
    Registered(UserId),
    Manual(ManualCustomerId),
}

/// The core record of the engine (spec §3 "Queue entry").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub business_id: BusinessId,
    pub helper_id: HelperId,
    pub user_ref: CustomerRef,
    pub service_id: ServiceId,
    pub gender: Gender,
    pub preference: Preference,
    pub joining_position: i32,
    pub current_position: i32,
    pub joining_time: DateTime<Utc>,
    pub est_service_start_time: DateTime<Utc>,
    /// Minutes, includes cumulative `add_time` overlays (spec §3 I3, SPEC_FULL §C.2).
    pub est_wait: i32,
    /// Sum of `add_time` overlays applied so far; preserved across
    /// restructure/skip/hold (SPEC_FULL §C.2).
    pub added_time_overlay: i32,
    pub status: QueueStatus,
    pub total: f64,
    pub rating: Option<i16>,
    pub notes: Option<String>,
    pub history: Vec<HistoryEvent>,
    pub created_at: DateTime<Utc>,
}

impl QueueEntry {
    /// `estWait = (currentPosition − 1) · duration + Σ addedTime overlays` (spec §3 I3 / P2).
    pub fn recompute_est_wait(&mut self, duration_minutes: i32, now: DateTime<Utc>) {
        self.est_wait = (self.current_position - 1) * duration_minutes + self.added_time_overlay;
        self.est_service_start_time = now + chrono::Duration::minutes(self.est_wait as i64);
    }
}
