//! Cadence Billing - Subscription Billing-Cycle Engine
//!
//! This crate implements the schedule model behind recurring payments:
//! phases stepped by calendar intervals, a shared next-payment-date
//! cursor, mid-cycle alignment with proration, and retry-aware renewal
//! decisions. It is a library consumed by a surrounding payment plugin;
//! gateways and storage plug in through the port traits.

pub mod domain;
pub mod ports;
