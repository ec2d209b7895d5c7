//! Notification-intent construction (spec §4.3 Step 8, §4.4). Building
//! the batch is pure; `crate::kernel::notifier` owns delivery.

use serde_json::json;

use crate::common::QueueEntryId;
use crate::engine::restructure::RestructureChange;
use crate::kernel::notifier::NotificationIntent;
use crate::store::{CustomerRef, RegisteredUser};

fn pushable(user: &RegisteredUser) -> Option<&str> {
    if user.receive_notifications {
        user.push_token.as_deref()
    } else {
        None
    }
}

/// Builds one notification per normal user whose entry had a **material
/// change** (spec §4.3 Step 8 / GLOSSARY "Material change").
pub fn material_change_notifications(
    changes: &[RestructureChange],
    users: &std::collections::HashMap<crate::common::UserId, RegisteredUser>,
    material_wait_delta_minutes: i64,
) -> Vec<NotificationIntent> {
    let mut out = Vec::new();
    for change in changes {
        let CustomerRef::Registered(user_id) = change.user_ref else {
            continue;
        };
        let material = change.old_position != change.new_position
            || change.old_helper_id != change.new_helper_id
            || (change.old_est_wait - change.new_est_wait).unsigned_abs() as i64
                >= material_wait_delta_minutes;
        if !material {
            continue;
        }
        let Some(user) = users.get(&user_id) else {
            continue;
        };
        let Some(push_token) = pushable(user) else {
            continue;
        };

        let body = if change.is_hold {
            format!("On HOLD at position {}. ETA: {} mins", change.new_position, change.new_est_wait)
        } else {
            let mut body = format!(
                "Position: {} → {}. ETA: {} mins",
                change.old_position, change.new_position, change.new_est_wait
            );
            if change.old_helper_id != change.new_helper_id {
                body.push_str(" Helper reassigned.");
            }
            body
        };

        out.push(NotificationIntent {
            push_token: push_token.to_string(),
            title: "Queue update".to_string(),
            body,
            data: json!({
                "type": "queue_update",
                "queueEntryId": change.entry_id,
                "position": change.new_position,
                "estWait": change.new_est_wait,
            }),
        });
    }
    out
}

/// The "queue paused" notification sent when a restructure finds no
/// active helpers (spec §4.3 Step 1).
pub fn paused_notifications(
    entry_ids_and_users: &[(QueueEntryId, crate::common::UserId)],
    users: &std::collections::HashMap<crate::common::UserId, RegisteredUser>,
) -> Vec<NotificationIntent> {
    entry_ids_and_users
        .iter()
        .filter_map(|(entry_id, user_id)| {
            let user = users.get(user_id)?;
            let push_token = pushable(user)?;
            Some(NotificationIntent {
                push_token: push_token.to_string(),
                title: "Queue paused".to_string(),
                body: "This business is temporarily not accepting customers.".to_string(),
                data: json!({ "type": "queue_paused", "queueEntryId": entry_id }),
            })
        })
        .collect()
}

/// Notifications sent directly on break/resume, before any restructure
/// runs (spec §4.4: "notify every normal user with a live entry").
pub fn break_resume_notifications(
    entry_ids_and_users: &[(QueueEntryId, crate::common::UserId)],
    users: &std::collections::HashMap<crate::common::UserId, RegisteredUser>,
    on_break: bool,
    helper_scoped: bool,
) -> Vec<NotificationIntent> {
    let (title, body) = match (on_break, helper_scoped) {
        (true, true) => ("Helper on break", "Your assigned helper just went on break; your spot may be reassigned."),
        (true, false) => ("Queue paused", "This business just went on break."),
        (false, true) => ("Helper back", "Your assigned helper is back from break."),
        (false, false) => ("Queue resumed", "This business is accepting customers again."),
    };
    entry_ids_and_users
        .iter()
        .filter_map(|(entry_id, user_id)| {
            let user = users.get(user_id)?;
            let push_token = pushable(user)?;
            Some(NotificationIntent {
                push_token: push_token.to_string(),
                title: title.to_string(),
                body: body.to_string(),
                data: json!({ "type": "break_resume", "queueEntryId": entry_id }),
            })
        })
        .collect()
}
