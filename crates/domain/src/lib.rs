//! # tripwire-domain
//!
//! Pure domain model for the tripwire scenario runtime.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, wall-clock time
//! - Parse **schedule descriptors** from informal duration strings (`"2 seconds"`, `"hour"`)
//! - Parse **time windows** (`HH:MM` bounds) and **day sets** (`"weekday"`, `["saturday", …]`)
//! - Validate **scenario options** (`suppress_for`, `only`)
//! - Provide the **deferred matcher** ([`expect`]) used to gate scenario branches
//! - Describe **devices** as named bags of attribute values
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never hold runtime state (timers, subscriptions, registries).
//! Everything stateful lives in the `app` crate.

pub mod error;
pub mod id;
pub mod time;

pub mod calendar;
pub mod device;
pub mod expect;
pub mod options;
pub mod schedule;
pub mod value;
