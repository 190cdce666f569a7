//! Input validation for engine operations.
//!
//! Shape checks happen before any lock is taken; referential checks
//! (does the business exist, is the helper capable) happen inside the
//! transaction.

use crate::error::{Error, Result};

/// Upper bound on line items per enqueue call.
pub const MAX_LINE_ITEMS: usize = 20;

/// Recent-action projections never return more than this many events.
pub const MAX_RECENT_ACTIONS: usize = 10;

pub fn validate_line_item_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(Error::InvalidArgument(
            "at least one service is required".to_string(),
        ));
    }
    if count > MAX_LINE_ITEMS {
        return Err(Error::InvalidArgument(format!(
            "too many services in one request (max {})",
            MAX_LINE_ITEMS
        )));
    }
    Ok(())
}

pub fn validate_window(t0: u64, t1: u64) -> Result<()> {
    if t1 < t0 {
        return Err(Error::InvalidArgument(
            "endTime must not precede startTime".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_rating(rating: u8) -> Result<()> {
    if rating > 5 {
        return Err(Error::InvalidArgument(
            "rating must be between 0 and 5".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_added_time(added_time: Option<u32>) -> Result<u32> {
    match added_time {
        Some(t) if t > 0 => Ok(t),
        _ => Err(Error::InvalidArgument(
            "addedTime must be a positive number of minutes".to_string(),
        )),
    }
}

pub fn validate_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Clamp a requested limit to the projection maximum.
pub fn clamp_recent_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(MAX_RECENT_ACTIONS)
        .min(MAX_RECENT_ACTIONS)
        .max(1)
}
