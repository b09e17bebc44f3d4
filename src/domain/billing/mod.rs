//! Billing cycle module.
//!
//! The calendar math of recurring payments: intervals, alignment rules,
//! periods, and subscription phases.
//!
//! # Module Structure
//!
//! - `interval` - Interval duration value object and boundary sequences
//! - `alignment` - BillingFrequency and AlignmentRule date resolution
//! - `period` - Period value object and payment hand-off
//! - `phase` - Phase entity with cursor-parametric period math

mod alignment;
mod interval;
mod period;
mod phase;

pub use alignment::{AlignmentRule, BillingFrequency};
pub use interval::{DateSequence, Interval};
pub use period::Period;
pub use phase::Phase;
