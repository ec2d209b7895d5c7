//! Enqueue (spec §4.1).

use chrono::Utc;
use sqlx::PgConnection;

use crate::common::errors::EngineError;
use crate::common::{BusinessId, HelperId, ManualCustomerId, ServiceId};
use crate::kernel::identity::{Principal, Role};
use crate::store;
use crate::store::{CustomerRef, Gender, Preference, QueueEntry};

/// One requested line item of an enqueue call (spec §4.1 "a non-empty list
/// of line items `{serviceId, gender, preference, helperId?}`").
#[derive(Debug, Clone)]
pub struct LineItem {
    pub service_id: ServiceId,
    pub gender: Gender,
    pub preference: Preference,
    pub helper_id: Option<HelperId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserType {
    Normal,
    Manual,
}

#[derive(Clone)]
pub struct EnqueueRequest {
    pub business_id: BusinessId,
    pub principal: Principal,
    pub user_type: UserType,
    pub manual_id: Option<ManualCustomerId>,
    pub items: Vec<LineItem>,
}

/// Validates preconditions and inserts every requested line item inside
/// the caller's transaction, returning the created entries in request
/// order. Any failure aborts the whole batch (spec §4.1 "executes one
/// transaction that either creates every requested entry or none").
pub async fn enqueue(
    conn: &mut PgConnection,
    request: EnqueueRequest,
) -> Result<Vec<QueueEntry>, EngineError> {
    if request.items.is_empty() {
        return Err(EngineError::InvalidArgument(
            "enqueue requires at least one line item".into(),
        ));
    }

    let business = store::business::find_business(conn, request.business_id).await?;
    if business.deleted || business.suspended {
        return Err(EngineError::NotFound("business".into()));
    }
    if !business.active {
        return Err(EngineError::FailedPrecondition(
            "business is not accepting customers (on break)".into(),
        ));
    }

    let customer_ref = match request.user_type {
        UserType::Normal => {
            if request.manual_id.is_some() {
                return Err(EngineError::InvalidArgument(
                    "manualId must be absent for a normal enqueue".into(),
                ));
            }
            let user = store::registered_user::find_registered_user(conn, request.principal.user_id)
                .await?;
            if user.deleted || user.suspended || !user.active {
                return Err(EngineError::FailedPrecondition(
                    "user is not active".into(),
                ));
            }
            CustomerRef::Registered(user.id)
        }
        UserType::Manual => {
            let manual_id = request.manual_id.ok_or_else(|| {
                EngineError::InvalidArgument("manualId is required for a manual enqueue".into())
            })?;
            let manual = store::manual_customer::find_manual_customer(conn, manual_id).await?;
            if manual.business_id != request.business_id {
                return Err(EngineError::InvalidArgument(
                    "manualId does not belong to this business".into(),
                ));
            }
            CustomerRef::Manual(manual.id)
        }
    };

    let now = Utc::now();
    let mut created = Vec::with_capacity(request.items.len());

    for item in &request.items {
        let service = store::service::find_service(conn, item.service_id).await?;
        if service.deleted || service.business_id != request.business_id {
            return Err(EngineError::NotFound("service".into()));
        }
        if !service.allowed_genders.contains(&item.gender) {
            return Err(EngineError::InvalidArgument(format!(
                "service {} does not serve the requested gender",
                service.name
            )));
        }

        let helper_id = match item.preference {
            Preference::Specific => {
                let helper_id = item.helper_id.ok_or_else(|| {
                    EngineError::InvalidArgument(
                        "helperId is required when preference=SPECIFIC".into(),
                    )
                })?;
                let helper = business.helper(helper_id).ok_or_else(|| {
                    EngineError::NotFound("helper".into())
                })?;
                if !helper.participates() || !helper.capable_of(service.id) {
                    return Err(EngineError::FailedPrecondition(
                        "requested helper is not available for this service".into(),
                    ));
                }
                helper_id
            }
            Preference::Any => {
                let mut capable: Vec<HelperId> = business
                    .active_helpers()
                    .filter(|h| h.capable_of(service.id))
                    .map(|h| h.helper_id)
                    .collect();
                capable.sort();
                if capable.is_empty() {
                    return Err(EngineError::FailedPrecondition(
                        "no active helper can perform this service".into(),
                    ));
                }
                let mut best: Option<(HelperId, i64)> = None;
                for helper_id in capable {
                    let len = store::queue_entry::count_lane(conn, request.business_id, helper_id)
                        .await?;
                    best = Some(match best {
                        Some((_, best_len)) if best_len <= len => best.unwrap(),
                        _ => (helper_id, len),
                    });
                }
                best.expect("capable list is non-empty").0
            }
        };

        let k = store::queue_entry::count_lane(conn, request.business_id, helper_id).await?;
        let est_wait = k as i32 * service.duration_minutes;

        let entry = store::queue_entry::insert_entry(
            conn,
            request.business_id,
            helper_id,
            customer_ref,
            service.id,
            item.gender,
            item.preference,
            k as i32 + 1,
            est_wait,
            service.price,
            now,
        )
        .await?;
        created.push(entry);
    }

    Ok(created)
}

/// Authorization for owner/helper-initiated operations scoped to a
/// single business (setBreak/resumeBreak, manual-customer management,
/// the read projections, etc.): the principal must hold an
/// `OwnerOrHelper` token scoped to exactly this business (spec §4.2's
/// authorization rule generalizes to every business-scoped operation,
/// not just `applyAction`).
pub fn require_owner_or_helper(principal: &Principal, business_id: BusinessId) -> Result<(), EngineError> {
    match principal.role {
        Role::OwnerOrHelper => {
            if principal.business_id == Some(business_id) {
                Ok(())
            } else {
                Err(EngineError::Forbidden(
                    "not an owner or helper of this business".into(),
                ))
            }
        }
        Role::Customer => Err(EngineError::Forbidden(
            "this operation requires owner or helper access".into(),
        )),
    }
}
