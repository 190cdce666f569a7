//! Lane ordering and ETA arithmetic.
//!
//! A lane is the ordered list of live entries for one (business, helper)
//! pair. Positions are dense (`1..=N`); the estimated wait of an entry is
//!
//! ```text
//! estWait = (position - 1) * service.duration
//!         + sum of added_time overlays at positions <= position
//! ```
//!
//! so a delay added ahead of a customer pushes everyone behind as well.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::error::Result;
use crate::model::{EntryStatus, QueueEntry};

pub const MINUTE_MS: u64 = 60_000;

/// Duration lookup for the services referenced by a business's entries.
/// Includes soft-deleted services: duration is immutable for the
/// lifetime of any entry that references it.
pub fn durations_for_business(
    conn: &Connection,
    business_id: &str,
) -> Result<HashMap<String, u32>> {
    let mut stmt =
        conn.prepare("SELECT id, duration_minutes FROM services WHERE business_id = ?1")?;
    let rows = stmt.query_map([business_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u32))
    })?;
    let mut map = HashMap::new();
    for row in rows {
        let (id, duration) = row?;
        map.insert(id, duration);
    }
    Ok(map)
}

/// Assign dense positions `1..=N` following the slice order.
pub fn renumber(lane: &mut [QueueEntry]) {
    for (idx, entry) in lane.iter_mut().enumerate() {
        entry.current_position = idx as u32 + 1;
    }
}

/// Recompute `est_wait` and `est_service_start_time` for every entry in
/// a lane already ordered by position. Unknown services contribute a
/// zero duration rather than failing the whole lane.
pub fn apply_etas(lane: &mut [QueueEntry], durations: &HashMap<String, u32>, now_ms: u64) {
    let mut overlay_sum: u32 = 0;
    for entry in lane.iter_mut() {
        overlay_sum += entry.added_time;
        let duration = durations.get(&entry.service_id).copied().unwrap_or(0);
        entry.est_wait = (entry.current_position - 1) * duration + overlay_sum;
        entry.est_service_start_time = now_ms + entry.est_wait as u64 * MINUTE_MS;
    }
}

/// Estimated wait for a hypothetical entry joining at the back of an
/// existing lane.
pub fn est_wait_for_join(lane: &[QueueEntry], queue_length: u32, duration: u32) -> u32 {
    let overlay_sum: u32 = lane.iter().map(|e| e.added_time).sum();
    queue_length * duration + overlay_sum
}

/// Index of the next entry with `status = in_queue` strictly behind
/// `position`, if any. The lane must be ordered by position.
pub fn next_in_queue(lane: &[QueueEntry], position: u32) -> Option<usize> {
    lane.iter().position(|e| {
        e.status == EntryStatus::InQueue && e.current_position > position
    })
}

/// Index of the entry currently holding `position`.
pub fn at_position(lane: &[QueueEntry], position: u32) -> Option<usize> {
    lane.iter().position(|e| e.current_position == position)
}
