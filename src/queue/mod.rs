//! Queue engine - scheduling, per-entry actions with undo, and the FCFS
//! balancer.
//!
//! ## Module Organization
//!
//! - `engine.rs` - Core Engine struct, dependencies, per-business locks
//! - `validation.rs` - Input validation
//! - `lane.rs` - Lane ordering and ETA arithmetic
//!
//! ### Write operations
//!
//! - `enqueue.rs` - Atomic multi-item enqueue with helper selection
//! - `actions.rs` - Per-entry action state machine
//! - `undo.rs` - Undo of recent vendor actions
//! - `restructure.rs` - FCFS rebalancing across helpers
//! - `breaks.rs` - Business-wide and helper-scoped break/resume
//! - `manual.rs` - Manual customer management
//! - `rating.rs` - Post-service rating and notes
//!
//! ### Read projections
//!
//! - `projections.rs` - Helper queue, wait times, recent actions, history

mod engine;
mod lane;
mod validation;

mod actions;
mod breaks;
mod enqueue;
mod manual;
mod rating;
mod restructure;
mod undo;

mod projections;

#[cfg(test)]
mod tests;

pub(crate) use lane::durations_for_business;

pub use actions::{ActionRequest, QueueAction};
pub use breaks::BreakRequest;
pub use engine::{Engine, EngineSettings};
pub use enqueue::{EnqueueRequest, LineItem, UserType};
pub use manual::{ManualCustomerRequest, ManualSearchQuery};
pub use projections::{
    HelperQueueItem, HelperQueueView, HelperWaitTime, QueueCounts, RecentAction,
};
pub use restructure::RestructureReport;
