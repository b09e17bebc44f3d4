//! Subscription Domain
//!
//! The aggregate that owns the phase schedule and the billing cursor,
//! its status lifecycle, the domain events it records, and the snapshot
//! types it persists through.
//!
//! # Module Structure
//!
//! - `aggregate` - The Subscription aggregate root
//! - `status` - Status state machine
//! - `events` - Domain events
//! - `snapshot` - Stored wire representation

mod aggregate;
mod events;
mod snapshot;
mod status;

pub use aggregate::Subscription;
pub use events::SubscriptionEvent;
pub use snapshot::{PhaseSnapshot, SubscriptionSnapshot};
pub use status::SubscriptionStatus;
