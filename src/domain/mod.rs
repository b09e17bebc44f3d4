//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `billing` - Intervals, periods, phases, and calendar alignment
//! - `subscription` - Subscription aggregate, status lifecycle, snapshots
//! - `payment` - Payment hand-off entity and gateway status lifecycle

pub mod billing;
pub mod foundation;
pub mod payment;
pub mod subscription;
