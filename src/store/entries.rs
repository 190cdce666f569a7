//! Queue entries and lane queries.
//!
//! A lane is the set of live entries for one (business, helper) pair;
//! live means `status IN (in_queue, hold, skipped)`.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::model::{EntryStatus, Gender, Preference, QueueEntry, UserRef};

const LIVE: &str = "('in_queue', 'hold', 'skipped')";

/// Largest timestamp SQLite can hold as an integer. Window bounds are
/// clamped so an open-ended `u64::MAX` query does not wrap negative.
const MAX_TIME: u64 = i64::MAX as u64;

#[inline]
fn clamp(t: u64) -> i64 {
    t.min(MAX_TIME) as i64
}

fn row_to_entry(row: &Row) -> rusqlite::Result<QueueEntry> {
    let user_type: String = row.get("user_type")?;
    let user_id: String = row.get("user_id")?;
    let user_ref = if user_type == "manual" {
        UserRef::manual(user_id)
    } else {
        UserRef::registered(user_id)
    };

    let gender: String = row.get("gender")?;
    let preference: String = row.get("preference")?;
    let status: String = row.get("status")?;
    let history_json: String = row.get("history")?;

    Ok(QueueEntry {
        id: row.get("id")?,
        business_id: row.get("business_id")?,
        helper_id: row.get("helper_id")?,
        user_ref,
        service_id: row.get("service_id")?,
        gender: Gender::parse(&gender).unwrap_or(Gender::Male),
        preference: Preference::parse(&preference).unwrap_or(Preference::Any),
        joining_position: row.get::<_, i64>("joining_position")? as u32,
        current_position: row.get::<_, i64>("current_position")? as u32,
        joining_time: row.get::<_, i64>("joining_time")? as u64,
        created_at: row.get::<_, i64>("created_at")? as u64,
        est_service_start_time: row.get::<_, i64>("est_service_start_time")? as u64,
        est_wait: row.get::<_, i64>("est_wait")? as u32,
        added_time: row.get::<_, i64>("added_time")? as u32,
        status: EntryStatus::parse(&status).unwrap_or(EntryStatus::Removed),
        total: row.get("total")?,
        rating: row.get::<_, Option<i64>>("rating")?.map(|r| r as u8),
        notes: row.get("notes")?,
        history: serde_json::from_str(&history_json).unwrap_or_default(),
    })
}

pub fn insert(conn: &Connection, entry: &QueueEntry) -> Result<()> {
    let history = serde_json::to_string(&entry.history)?;
    conn.execute(
        "INSERT INTO queue_entries
             (id, business_id, helper_id, user_type, user_id, service_id, gender,
              preference, joining_position, current_position, joining_time,
              created_at, est_service_start_time, est_wait, added_time, status,
              total, rating, notes, history)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            entry.id,
            entry.business_id,
            entry.helper_id,
            entry.user_ref.kind_str(),
            entry.user_ref.id(),
            entry.service_id,
            entry.gender.as_str(),
            entry.preference.as_str(),
            entry.joining_position as i64,
            entry.current_position as i64,
            entry.joining_time as i64,
            entry.created_at as i64,
            entry.est_service_start_time as i64,
            entry.est_wait as i64,
            entry.added_time as i64,
            entry.status.as_str(),
            entry.total,
            entry.rating.map(|r| r as i64),
            entry.notes,
            history,
        ],
    )?;
    Ok(())
}

/// Rewrite every mutable field of an entry. `joining_position`,
/// `joining_time`, and identity columns are never touched.
pub fn update(conn: &Connection, entry: &QueueEntry) -> Result<()> {
    let history = serde_json::to_string(&entry.history)?;
    let changed = conn.execute(
        "UPDATE queue_entries SET
             helper_id = ?2,
             current_position = ?3,
             est_service_start_time = ?4,
             est_wait = ?5,
             added_time = ?6,
             status = ?7,
             rating = ?8,
             notes = ?9,
             history = ?10
         WHERE id = ?1",
        params![
            entry.id,
            entry.helper_id,
            entry.current_position as i64,
            entry.est_service_start_time as i64,
            entry.est_wait as i64,
            entry.added_time as i64,
            entry.status.as_str(),
            entry.rating.map(|r| r as i64),
            entry.notes,
            history,
        ],
    )?;
    if changed == 0 {
        return Err(Error::NotFound(format!("queue entry {} not found", entry.id)));
    }
    Ok(())
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<QueueEntry>> {
    let entry = conn
        .query_row(
            "SELECT * FROM queue_entries WHERE id = ?1",
            params![id],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

pub fn require(conn: &Connection, id: &str) -> Result<QueueEntry> {
    get(conn, id)?.ok_or_else(|| Error::NotFound(format!("queue entry {} not found", id)))
}

fn collect<I>(rows: I) -> Result<Vec<QueueEntry>>
where
    I: Iterator<Item = rusqlite::Result<QueueEntry>>,
{
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Live entries of one lane, ordered by current position.
pub fn live_lane(conn: &Connection, business_id: &str, helper_id: &str) -> Result<Vec<QueueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM queue_entries
         WHERE business_id = ?1 AND helper_id = ?2 AND status IN {}
         ORDER BY current_position ASC",
        LIVE
    ))?;
    let rows = stmt.query_map(params![business_id, helper_id], row_to_entry)?;
    collect(rows)
}

/// Number of live entries in a lane.
pub fn live_count(conn: &Connection, business_id: &str, helper_id: &str) -> Result<u32> {
    let count: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM queue_entries
             WHERE business_id = ?1 AND helper_id = ?2 AND status IN {}",
            LIVE
        ),
        params![business_id, helper_id],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

/// All live entries of a business created in `[t0, t1]`, FCFS order.
pub fn live_for_business_window(
    conn: &Connection,
    business_id: &str,
    t0: u64,
    t1: u64,
) -> Result<Vec<QueueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM queue_entries
         WHERE business_id = ?1 AND status IN {}
           AND created_at >= ?2 AND created_at <= ?3
         ORDER BY joining_time ASC",
        LIVE
    ))?;
    let rows = stmt.query_map(params![business_id, clamp(t0), clamp(t1)], row_to_entry)?;
    collect(rows)
}

/// All live entries of a business regardless of window.
pub fn live_for_business(conn: &Connection, business_id: &str) -> Result<Vec<QueueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM queue_entries
         WHERE business_id = ?1 AND status IN {}
         ORDER BY joining_time ASC",
        LIVE
    ))?;
    let rows = stmt.query_map(params![business_id], row_to_entry)?;
    collect(rows)
}

/// Live entries for one helper created in `[t0, t1]`, ordered by
/// position then joining time (the helper queue projection).
pub fn live_for_helper_window(
    conn: &Connection,
    helper_id: &str,
    t0: u64,
    t1: u64,
) -> Result<Vec<QueueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM queue_entries
         WHERE helper_id = ?1 AND status IN {}
           AND created_at >= ?2 AND created_at <= ?3
         ORDER BY current_position ASC, joining_time ASC",
        LIVE
    ))?;
    let rows = stmt.query_map(params![helper_id, clamp(t0), clamp(t1)], row_to_entry)?;
    collect(rows)
}

/// All entries (any status) for one customer in a time window, newest
/// first.
pub fn for_user_window(
    conn: &Connection,
    user_ref: &UserRef,
    t0: u64,
    t1: u64,
) -> Result<Vec<QueueEntry>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM queue_entries
         WHERE user_type = ?1 AND user_id = ?2
           AND created_at >= ?3 AND created_at <= ?4
         ORDER BY joining_time DESC",
    )?;
    let rows = stmt.query_map(
        params![user_ref.kind_str(), user_ref.id(), clamp(t0), clamp(t1)],
        row_to_entry,
    )?;
    collect(rows)
}

/// All entries (any status) for a business in a time window, optionally
/// narrowed to one helper, newest first.
pub fn for_business_window(
    conn: &Connection,
    business_id: &str,
    t0: u64,
    t1: u64,
    helper_id: Option<&str>,
) -> Result<Vec<QueueEntry>> {
    match helper_id {
        Some(h) => {
            let mut stmt = conn.prepare(
                "SELECT * FROM queue_entries
                 WHERE business_id = ?1 AND helper_id = ?2
                   AND created_at >= ?3 AND created_at <= ?4
                 ORDER BY joining_time DESC",
            )?;
            let rows = stmt.query_map(
                params![business_id, h, clamp(t0), clamp(t1)],
                row_to_entry,
            )?;
            collect(rows)
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT * FROM queue_entries
                 WHERE business_id = ?1
                   AND created_at >= ?2 AND created_at <= ?3
                 ORDER BY joining_time DESC",
            )?;
            let rows = stmt.query_map(params![business_id, clamp(t0), clamp(t1)], row_to_entry)?;
            collect(rows)
        }
    }
}
