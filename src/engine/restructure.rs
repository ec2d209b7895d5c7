//! The FCFS Balancer (spec §4.3). The bucket-assignment algorithm is pure
//! (no I/O) so it can be exercised directly in tests; [`crate::engine`]
//! wraps it with the Store reads/writes and notification fan-out.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::common::{HelperId, QueueEntryId, ServiceId};
use crate::store::{CustomerRef, Helper, HistoryAction, HistoryEvent, HistorySource, Preference, QueueEntry, QueueStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Head,
    Specific,
    Hold,
    Flexible,
}

/// A before/after snapshot for one entry that the restructure actually
/// changed — used both to persist the write and to decide whether the
/// change is "material" enough to notify (spec §4.3 Step 7/8).
#[derive(Debug, Clone)]
pub struct RestructureChange {
    pub entry_id: QueueEntryId,
    pub user_ref: CustomerRef,
    pub old_helper_id: HelperId,
    pub new_helper_id: HelperId,
    pub old_position: i32,
    pub new_position: i32,
    pub old_est_wait: i32,
    pub new_est_wait: i32,
    pub is_hold: bool,
}

/// Runs the balancer over `entries` (already filtered to the restructure
/// window and to live statuses, per spec §4.3 Step 2), producing the
/// updated entries ready to persist plus the deltas for notification.
pub fn compute_restructure(
    active_helpers: &[Helper],
    mut entries: Vec<QueueEntry>,
    durations: &HashMap<ServiceId, i32>,
    now: DateTime<Utc>,
) -> Vec<(QueueEntry, RestructureChange)> {
    entries.sort_by_key(|e| e.joining_time);

    let active_ids: Vec<HelperId> = active_helpers.iter().map(|h| h.helper_id).collect();

    let mut groups: HashMap<ServiceId, Vec<QueueEntry>> = HashMap::new();
    for entry in entries {
        groups.entry(entry.service_id).or_default().push(entry);
    }

    let mut buckets: HashMap<HelperId, Vec<(QueueEntry, Bucket)>> = HashMap::new();
    for helper_id in &active_ids {
        buckets.entry(*helper_id).or_default();
    }

    let mut service_ids: Vec<ServiceId> = groups.keys().copied().collect();
    service_ids.sort();

    for service_id in service_ids {
        let group = groups.remove(&service_id).expect("key from groups.keys()");
        let mut capable: Vec<HelperId> = active_helpers
            .iter()
            .filter(|h| h.capable_of(service_id))
            .map(|h| h.helper_id)
            .collect();
        capable.sort();
        if capable.is_empty() {
            // spec §4.3 Step 3: "If empty, skip the group" — these entries
            // are left untouched, not reassigned.
            continue;
        }

        let mut heads = Vec::new();
        let mut specifics = Vec::new();
        let mut holds = Vec::new();
        let mut flexibles = Vec::new();

        for entry in group {
            if entry.current_position == 1 && entry.status == QueueStatus::InQueue {
                heads.push(entry);
            } else if entry.preference == Preference::Specific && capable.contains(&entry.helper_id) {
                specifics.push(entry);
            } else if entry.status == QueueStatus::Hold {
                holds.push(entry);
            } else {
                flexibles.push(entry);
            }
        }

        for entry in heads {
            let target = if capable.contains(&entry.helper_id) {
                entry.helper_id
            } else {
                capable[0]
            };
            buckets.entry(target).or_default().push((entry, Bucket::Head));
        }
        for entry in specifics {
            let target = entry.helper_id;
            buckets.entry(target).or_default().push((entry, Bucket::Specific));
        }
        for entry in holds {
            let target = if capable.contains(&entry.helper_id) {
                entry.helper_id
            } else {
                capable[0]
            };
            buckets.entry(target).or_default().push((entry, Bucket::Hold));
        }
        // Flexibles are inserted in FCFS order, each to the smallest bucket
        // at the time of its own placement (spec §4.3 Step 5d).
        for entry in flexibles {
            let target = *capable
                .iter()
                .min_by_key(|hid| (buckets.get(*hid).map(|v| v.len()).unwrap_or(0), **hid))
                .expect("capable is non-empty");
            buckets.entry(target).or_default().push((entry, Bucket::Flexible));
        }
    }

    let mut changes = Vec::new();

    for (helper_id, mut bucket_entries) in buckets {
        // Head first, then by currentPosition rather than raw joiningTime:
        // a manual `skip` changes currentPosition without changing
        // joiningTime, and Step 6 must not silently revert that swap on
        // the restructure every action triggers (spec §8 Scenario 2).
        bucket_entries.sort_by(|(a, a_bucket), (b, b_bucket)| {
            match (*a_bucket == Bucket::Head, *b_bucket == Bucket::Head) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => a.current_position.cmp(&b.current_position),
            }
        });

        for (position, (mut entry, _bucket)) in bucket_entries.into_iter().enumerate() {
            let new_position = position as i32 + 1;
            let old_position = entry.current_position;
            let old_helper_id = entry.helper_id;
            let old_est_wait = entry.est_wait;
            let duration = *durations
                .get(&entry.service_id)
                .expect("duration loaded for every service in the window");

            entry.current_position = new_position;
            entry.helper_id = helper_id;
            entry.recompute_est_wait(duration, now);

            let changed = old_position != new_position
                || old_helper_id != helper_id
                || old_est_wait != entry.est_wait;
            if !changed {
                continue;
            }

            entry.history.push(HistoryEvent {
                action: HistoryAction::Edit,
                source: HistorySource::Vendor,
                at: now,
                prev_position: Some(old_position),
                new_position: Some(new_position),
                added_time: None,
                est_wait: Some(entry.est_wait),
                newly_assigned_helper_id: if old_helper_id != helper_id {
                    Some(helper_id)
                } else {
                    None
                },
            });

            let change = RestructureChange {
                entry_id: entry.id,
                user_ref: entry.user_ref,
                old_helper_id,
                new_helper_id: helper_id,
                old_position,
                new_position,
                old_est_wait,
                new_est_wait: entry.est_wait,
                is_hold: entry.status == QueueStatus::Hold,
            };
            changes.push((entry, change));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BusinessId, HelperId, ServiceId, UserId};
    use crate::store::{Gender, HelperStatus};
    use chrono::Duration;

    fn helper(id: HelperId, business_id: BusinessId, services: Vec<ServiceId>) -> Helper {
        Helper {
            helper_id: id,
            business_id,
            status: HelperStatus::Accepted,
            active: true,
            services,
        }
    }

    fn entry(
        id: QueueEntryId,
        business_id: BusinessId,
        helper_id: HelperId,
        service_id: ServiceId,
        position: i32,
        status: QueueStatus,
        preference: Preference,
        joining_time: DateTime<Utc>,
    ) -> QueueEntry {
        QueueEntry {
            id,
            business_id,
            helper_id,
            user_ref: CustomerRef::Registered(UserId::new()),
            service_id,
            gender: Gender::Male,
            preference,
            joining_position: position,
            current_position: position,
            joining_time,
            est_service_start_time: joining_time,
            est_wait: (position - 1) * 30,
            added_time_overlay: 0,
            status,
            total: 20.0,
            rating: None,
            notes: None,
            history: Vec::new(),
            created_at: joining_time,
        }
    }

    #[test]
    fn flexible_entries_spread_across_helpers_on_rebalance() {
        let business_id = BusinessId::new();
        let service_id = ServiceId::new();
        let h1 = HelperId::new();
        let h2 = HelperId::new();
        let helpers = vec![
            helper(h1, business_id, vec![service_id]),
            helper(h2, business_id, vec![service_id]),
        ];
        let now = Utc::now();
        let mut durations = HashMap::new();
        durations.insert(service_id, 30);

        // Three flexible entries all currently on h1; h2 is empty.
        let entries = vec![
            entry(
                QueueEntryId::new(),
                business_id,
                h1,
                service_id,
                1,
                QueueStatus::InQueue,
                Preference::Any,
                now,
            ),
            entry(
                QueueEntryId::new(),
                business_id,
                h1,
                service_id,
                2,
                QueueStatus::InQueue,
                Preference::Any,
                now + Duration::seconds(1),
            ),
            entry(
                QueueEntryId::new(),
                business_id,
                h1,
                service_id,
                3,
                QueueStatus::InQueue,
                Preference::Any,
                now + Duration::seconds(2),
            ),
        ];

        let changes = compute_restructure(&helpers, entries, &durations, now);
        // Head stays on h1; the second and third entries are flexible and
        // should spread: one stays (bucket smallest), one migrates to h2.
        let on_h1 = changes.iter().filter(|(e, _)| e.helper_id == h1).count();
        let on_h2 = changes.iter().filter(|(e, _)| e.helper_id == h2).count();
        assert_eq!(on_h1 + on_h2, changes.len());
        assert!(on_h2 >= 1, "at least one flexible entry should migrate to the empty helper");
    }

    #[test]
    fn idempotent_on_second_run() {
        let business_id = BusinessId::new();
        let service_id = ServiceId::new();
        let h1 = HelperId::new();
        let helpers = vec![helper(h1, business_id, vec![service_id])];
        let now = Utc::now();
        let mut durations = HashMap::new();
        durations.insert(service_id, 30);

        let entries = vec![entry(
            QueueEntryId::new(),
            business_id,
            h1,
            service_id,
            1,
            QueueStatus::InQueue,
            Preference::Any,
            now,
        )];

        let first_pass = compute_restructure(&helpers, entries, &durations, now);
        assert!(first_pass.is_empty(), "a single head entry already at position 1 needs no update");
    }

    #[test]
    fn hold_retains_its_position() {
        let business_id = BusinessId::new();
        let service_id = ServiceId::new();
        let h1 = HelperId::new();
        let helpers = vec![helper(h1, business_id, vec![service_id])];
        let now = Utc::now();
        let mut durations = HashMap::new();
        durations.insert(service_id, 30);

        let mut head = entry(
            QueueEntryId::new(),
            business_id,
            h1,
            service_id,
            1,
            QueueStatus::InQueue,
            Preference::Any,
            now,
        );
        head.joining_time = now;
        let mut held = entry(
            QueueEntryId::new(),
            business_id,
            h1,
            service_id,
            2,
            QueueStatus::Hold,
            Preference::Any,
            now + Duration::seconds(1),
        );
        held.joining_time = now + Duration::seconds(1);

        let changes = compute_restructure(&helpers, vec![head, held], &durations, now);
        assert!(changes.is_empty(), "head at 1 and hold at 2 are already stable");
    }
}
