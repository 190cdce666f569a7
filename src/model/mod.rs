//! Core data model for the service queue.
//!
//! - `business.rs` - Business and its embedded helper list
//! - `service.rs` - Service catalog records and gender sets
//! - `customer.rs` - Registered users and manual customers
//! - `entry.rs` - Queue entries, statuses, and the history log

mod business;
mod customer;
mod entry;
mod service;

pub use business::{Business, Helper, HelperStatus};
pub use customer::{ManualCustomer, UserRecord, UserRef};
pub use entry::{
    ActionSource, EntryStatus, HistoryAction, HistoryEvent, Preference, QueueEntry,
};
pub use service::{Gender, Service};
