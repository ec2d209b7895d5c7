//! Typed ID definitions for every queue-domain entity.
//!
//! Compile-time type safety: a `HelperId` cannot be passed where a
//! `QueueEntryId` is expected, even though both are UUIDs underneath.

pub use super::id::{Id, V4, V7};

/// Marker type for Business entities.
pub struct Business;
/// Marker type for Helper records (embedded in a Business).
pub struct Helper;
/// Marker type for Service entities.
pub struct Service;
/// Marker type for registered-user customer principals.
pub struct User;
/// Marker type for manual (walk-in) customer records.
pub struct ManualCustomer;
/// Marker type for queue entries.
pub struct QueueEntry;

/// Typed ID for Business entities.
pub type BusinessId = Id<Business>;
/// Typed ID for Helper entities.
pub type HelperId = Id<Helper>;
/// Typed ID for Service entities.
pub type ServiceId = Id<Service>;
/// Typed ID for registered users.
pub type UserId = Id<User>;
/// Typed ID for manual customers.
pub type ManualCustomerId = Id<ManualCustomer>;
/// Typed ID for queue entries.
pub type QueueEntryId = Id<QueueEntry>;
