//! The queue scheduling and mutation engine (spec §1 "the hard part of
//! this repository"): enqueue, the action state machine, the FCFS
//! Balancer, break/resume, and read projections, all running under the
//! Store's per-business mutex + transaction discipline (spec §5).

pub mod actions;
pub mod break_resume;
pub mod enqueue;
pub mod notifications;
pub mod projections;
pub mod restructure;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::common::errors::EngineError;
use crate::common::{BusinessId, QueueEntryId, ServiceId, UserId};
use crate::kernel::identity::Principal;
use crate::kernel::notifier::NotificationIntent;
use crate::kernel::EngineDeps;
use crate::store;
use crate::store::{CustomerRef, QueueEntry, RegisteredUser, StoreError};

pub use actions::Action;
pub use break_resume::BreakScope;
pub use enqueue::{EnqueueRequest, LineItem, UserType};

/// Output of `restructure`, shaped per spec §6's endpoint contract.
#[derive(Debug, Clone, Copy)]
pub struct RestructureOutcome {
    pub updated_count: i64,
    pub notifications_sent: i64,
    pub active_helpers: i64,
    pub total_queues: i64,
}

/// What a single `restructure` attempt settled on, before post-commit
/// notifications go out (kept outside the retry loop, since they must
/// not be sent more than once per successful attempt).
enum RestructurePhase {
    Inactive,
    NoActiveHelpers(Vec<QueueEntry>),
    Restructured {
        updated_count: i64,
        active_helpers: i64,
        deltas: Vec<restructure::RestructureChange>,
    },
}

/// Spec §7 `Conflict`: the number of times a business-scoped write is
/// retried before a concurrent writer is surfaced as 409.
const MAX_CONFLICT_ATTEMPTS: u32 = 3;

/// Runs `op` up to [`MAX_CONFLICT_ATTEMPTS`] times, retrying only on
/// `EngineError::Conflict` (a Postgres serialization failure or deadlock
/// surfaced through `StoreError::Conflict`, spec §7 "surfaced as retry by
/// the engine up to 3 attempts before returning 409"). Any other error,
/// or a `Conflict` on the final attempt, is returned to the caller.
async fn retry_on_conflict<T, F, Fut>(mut op: F) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, EngineError>>,
{
    for attempt in 1..MAX_CONFLICT_ATTEMPTS {
        match op().await {
            Err(EngineError::Conflict) => {
                tracing::warn!(attempt, "retrying write after conflicting writer");
            }
            other => return other,
        }
    }
    op().await
}

/// The engine value parameterized on Store/Clock/Notifier (spec §9
/// "Global singletons... Replace with an engine value parameterized on
/// these three dependencies; each worker receives the engine by
/// reference").
#[derive(Clone)]
pub struct QueueEngine {
    deps: EngineDeps,
}

impl QueueEngine {
    pub fn new(deps: EngineDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &EngineDeps {
        &self.deps
    }

    /// Loads the `RegisteredUser` row for every distinct user id in
    /// `ids`, silently skipping ones that no longer resolve (deleted
    /// account, never existed) — a missing profile just means "no push".
    async fn load_registered_users(
        &self,
        ids: impl IntoIterator<Item = UserId>,
    ) -> Result<HashMap<UserId, RegisteredUser>, EngineError> {
        let mut conn = self.deps.store.pool().acquire().await.map_err(StoreError::from)?;
        let mut out = HashMap::new();
        for id in ids {
            if out.contains_key(&id) {
                continue;
            }
            if let Ok(user) = store::registered_user::find_registered_user(&mut conn, id).await {
                out.insert(id, user);
            }
        }
        Ok(out)
    }

    async fn send(&self, notifications: Vec<NotificationIntent>) -> i64 {
        let count = notifications.len() as i64;
        self.deps.notifier.send_batch(notifications).await;
        count
    }

    /// Spec §4.1.
    pub async fn enqueue(&self, request: EnqueueRequest) -> Result<Vec<QueueEntry>, EngineError> {
        let business_id = request.business_id;
        retry_on_conflict(|| {
            let request = request.clone();
            async move {
                let (guard, mut tx) =
                    self.deps.store.begin_for_business(business_id).await.map_err(EngineError::from)?;
                let result = enqueue::enqueue(&mut tx, request).await;
                match result {
                    Ok(entries) => {
                        tx.commit().await.map_err(StoreError::from)?;
                        drop(guard);
                        Ok(entries)
                    }
                    Err(err) => {
                        let _ = tx.rollback().await;
                        drop(guard);
                        Err(err)
                    }
                }
            }
        })
        .await
    }

    /// Spec §4.2 `applyAction`, followed by the triggered restructure for
    /// every action except `undo` (spec §4.2 "After any action that
    /// changes memberships or positions ... the engine triggers a
    /// restructure").
    pub async fn apply_action(
        &self,
        entry_id: QueueEntryId,
        action: Action,
        principal: Principal,
    ) -> Result<QueueEntry, EngineError> {
        let business_id = {
            let mut conn = self.deps.store.pool().acquire().await.map_err(StoreError::from)?;
            store::queue_entry::find_entry(&mut conn, entry_id).await?.business_id
        };

        let now = self.deps.clock.now();
        let updated = retry_on_conflict(|| {
            let principal = principal.clone();
            async move {
                let (guard, mut tx) =
                    self.deps.store.begin_for_business(business_id).await.map_err(EngineError::from)?;
                let result = actions::apply_action(
                    &mut tx,
                    entry_id,
                    action,
                    &principal,
                    self.deps.config.undo_window_seconds,
                    now,
                )
                .await;

                match result {
                    Ok(entry) => {
                        tx.commit().await.map_err(StoreError::from)?;
                        drop(guard);
                        Ok(entry)
                    }
                    Err(err) => {
                        let _ = tx.rollback().await;
                        drop(guard);
                        Err(err)
                    }
                }
            }
        })
        .await?;

        if !matches!(action, Action::Undo) {
            let horizon = chrono::Duration::seconds(self.deps.config.restructure_horizon_seconds);
            self.restructure(business_id, now, now + horizon).await?;
        }

        Ok(updated)
    }

    /// Spec §4.3, the FCFS Balancer.
    pub async fn restructure(
        &self,
        business_id: BusinessId,
        t0: DateTime<Utc>,
        t1: DateTime<Utc>,
    ) -> Result<RestructureOutcome, EngineError> {
        let now = self.deps.clock.now();

        let phase = retry_on_conflict(|| async move {
            let (guard, mut tx) =
                self.deps.store.begin_for_business(business_id).await.map_err(EngineError::from)?;

            let business = match store::business::find_business(&mut tx, business_id).await {
                Ok(b) => b,
                Err(err) => {
                    let _ = tx.rollback().await;
                    drop(guard);
                    return Err(err.into());
                }
            };

            if !business.active {
                let _ = tx.rollback().await;
                drop(guard);
                return Ok(RestructurePhase::Inactive);
            }

            let active_helpers: Vec<_> = business.active_helpers().cloned().collect();

            if active_helpers.is_empty() {
                let entries =
                    match store::queue_entry::find_live_entries_in_window(&mut tx, business_id, t0, t1).await {
                        Ok(e) => e,
                        Err(err) => {
                            let _ = tx.rollback().await;
                            drop(guard);
                            return Err(err.into());
                        }
                    };
                tx.commit().await.map_err(StoreError::from)?;
                drop(guard);
                return Ok(RestructurePhase::NoActiveHelpers(entries));
            }

            let entries = match store::queue_entry::find_live_entries_in_window(&mut tx, business_id, t0, t1).await {
                Ok(e) => e,
                Err(err) => {
                    let _ = tx.rollback().await;
                    drop(guard);
                    return Err(err.into());
                }
            };

            let mut durations: HashMap<ServiceId, i32> = HashMap::new();
            for entry in &entries {
                if durations.contains_key(&entry.service_id) {
                    continue;
                }
                match store::service::find_service(&mut tx, entry.service_id).await {
                    Ok(service) => {
                        durations.insert(entry.service_id, service.duration_minutes);
                    }
                    Err(err) => {
                        let _ = tx.rollback().await;
                        drop(guard);
                        return Err(err.into());
                    }
                }
            }

            let changes = restructure::compute_restructure(&active_helpers, entries, &durations, now);

            for (entry, _delta) in &changes {
                if let Err(err) = store::queue_entry::save_entry(&mut tx, entry).await {
                    let _ = tx.rollback().await;
                    drop(guard);
                    return Err(err.into());
                }
            }

            let updated_count = changes.len() as i64;
            tx.commit().await.map_err(StoreError::from)?;
            drop(guard);

            let deltas: Vec<restructure::RestructureChange> = changes.into_iter().map(|(_, d)| d).collect();
            Ok(RestructurePhase::Restructured {
                updated_count,
                active_helpers: active_helpers.len() as i64,
                deltas,
            })
        })
        .await?;

        match phase {
            RestructurePhase::Inactive => Ok(RestructureOutcome {
                updated_count: 0,
                notifications_sent: 0,
                active_helpers: 0,
                total_queues: 0,
            }),
            RestructurePhase::NoActiveHelpers(entries) => {
                let pairs: Vec<(QueueEntryId, UserId)> = entries
                    .iter()
                    .filter_map(|e| match e.user_ref {
                        CustomerRef::Registered(uid) => Some((e.id, uid)),
                        CustomerRef::Manual(_) => None,
                    })
                    .collect();
                let users = self.load_registered_users(pairs.iter().map(|(_, u)| *u)).await?;
                let notifications = notifications::paused_notifications(&pairs, &users);
                let sent = self.send(notifications).await;
                Ok(RestructureOutcome {
                    updated_count: 0,
                    notifications_sent: sent,
                    active_helpers: 0,
                    total_queues: 0,
                })
            }
            RestructurePhase::Restructured { updated_count, active_helpers, deltas } => {
                let user_ids = deltas.iter().filter_map(|d| match d.user_ref {
                    CustomerRef::Registered(uid) => Some(uid),
                    CustomerRef::Manual(_) => None,
                });
                let users = self.load_registered_users(user_ids).await?;
                let notifications = notifications::material_change_notifications(
                    &deltas,
                    &users,
                    self.deps.config.material_wait_delta_minutes,
                );
                let sent = self.send(notifications).await;
                Ok(RestructureOutcome {
                    updated_count,
                    notifications_sent: sent,
                    active_helpers,
                    total_queues: active_helpers,
                })
            }
        }
    }

    /// Spec §4.4 "Break". Business-wide break does not restructure
    /// (there is nowhere to migrate entries to); helper-scoped break
    /// does, so Flexible entries in that lane can migrate.
    pub async fn set_break(&self, business_id: BusinessId, scope: BreakScope) -> Result<(), EngineError> {
        self.apply_break_or_resume(business_id, scope, false).await
    }

    /// Spec §4.4 "Resume" — "always restructures after flipping the flag".
    pub async fn resume_break(&self, business_id: BusinessId, scope: BreakScope) -> Result<(), EngineError> {
        self.apply_break_or_resume(business_id, scope, true).await
    }

    async fn apply_break_or_resume(
        &self,
        business_id: BusinessId,
        scope: BreakScope,
        resuming: bool,
    ) -> Result<(), EngineError> {
        let now = self.deps.clock.now();

        let entries = retry_on_conflict(|| async move {
            let (guard, mut tx) =
                self.deps.store.begin_for_business(business_id).await.map_err(EngineError::from)?;

            let entries = match scope {
                BreakScope::Business => {
                    store::queue_entry::find_live_entries_for_business(&mut tx, business_id).await
                }
                BreakScope::Helper(helper_id) => {
                    store::queue_entry::find_lane(&mut tx, business_id, helper_id).await
                }
            };
            let entries = match entries {
                Ok(e) => e,
                Err(err) => {
                    let _ = tx.rollback().await;
                    drop(guard);
                    return Err(err.into());
                }
            };

            let apply_result = if resuming {
                break_resume::resume_break(&mut tx, business_id, scope).await
            } else {
                break_resume::set_break(&mut tx, business_id, scope).await
            };
            if let Err(err) = apply_result {
                let _ = tx.rollback().await;
                drop(guard);
                return Err(err);
            }

            tx.commit().await.map_err(StoreError::from)?;
            drop(guard);
            Ok(entries)
        })
        .await?;

        let pairs: Vec<(QueueEntryId, UserId)> = entries
            .iter()
            .filter_map(|e| match e.user_ref {
                CustomerRef::Registered(uid) => Some((e.id, uid)),
                CustomerRef::Manual(_) => None,
            })
            .collect();
        let users = self.load_registered_users(pairs.iter().map(|(_, u)| *u)).await?;
        let helper_scoped = matches!(scope, BreakScope::Helper(_));
        let notifications =
            notifications::break_resume_notifications(&pairs, &users, !resuming, helper_scoped);
        self.send(notifications).await;

        let should_restructure = resuming || helper_scoped;
        if should_restructure {
            let horizon = chrono::Duration::seconds(self.deps.config.restructure_horizon_seconds);
            self.restructure(business_id, now, now + horizon).await?;
        }

        Ok(())
    }
}
