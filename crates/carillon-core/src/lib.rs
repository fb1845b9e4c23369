//! Carillon Core - Bell Scheduling Engine
//!
//! This crate provides the scheduling logic for the Carillon bell daemon:
//! - Clock: adjustable wall clock shared by all time decisions
//! - Cron: 6-field cron expression parsing and next-occurrence search
//! - Scheduler: the wait/fire run loop owning the entry set
//! - Reconcile: applying live edits of the schedule file as a minimal delta
//! - Timesync: SNTP queries that correct the clock offset
//!
//! The scheduler schedules its own maintenance: reconciliation and time
//! sync are ordinary entries registered on the same run loop they serve.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod cron;
pub mod reconcile;
pub mod scheduler;
pub mod timesync;

pub use clock::Clock;
pub use cron::{CronExpr, ParseError};
pub use reconcile::Reconciler;
pub use scheduler::{EntryId, EntrySnapshot, Job, Scheduler};
pub use timesync::TimeSync;
