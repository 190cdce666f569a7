//! Business documents. The helper list is embedded in the business row
//! as a JSON array; callers mutate it through the whole document.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::model::Business;

fn row_to_business(row: &Row) -> rusqlite::Result<Business> {
    let helpers_json: String = row.get("helpers")?;
    Ok(Business {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        active: row.get::<_, i64>("active")? != 0,
        timezone: row.get("timezone")?,
        deleted: row.get::<_, i64>("deleted")? != 0,
        suspended: row.get::<_, i64>("suspended")? != 0,
        helpers: serde_json::from_str(&helpers_json).unwrap_or_default(),
    })
}

/// Insert or replace a business document.
pub fn put(conn: &Connection, business: &Business) -> Result<()> {
    let helpers = serde_json::to_string(&business.helpers)?;
    conn.execute(
        "INSERT OR REPLACE INTO businesses
             (id, owner_id, active, timezone, deleted, suspended, helpers)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            business.id,
            business.owner_id,
            business.active as i64,
            business.timezone,
            business.deleted as i64,
            business.suspended as i64,
            helpers,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Business>> {
    let business = conn
        .query_row(
            "SELECT * FROM businesses WHERE id = ?1",
            params![id],
            row_to_business,
        )
        .optional()?;
    Ok(business)
}

/// Load a business, failing with NotFound when missing or soft-deleted.
pub fn require(conn: &Connection, id: &str) -> Result<Business> {
    match get(conn, id)? {
        Some(b) if !b.deleted => Ok(b),
        _ => Err(Error::NotFound(format!("business {} not found", id))),
    }
}

/// Find the business whose helper list contains `helper_id`. Helper
/// lists are embedded documents, so this scans the (small) business
/// collection and filters in process.
pub fn find_by_helper(conn: &Connection, helper_id: &str) -> Result<Option<Business>> {
    let mut stmt = conn.prepare("SELECT * FROM businesses WHERE deleted = 0")?;
    let rows = stmt.query_map([], row_to_business)?;
    for row in rows {
        let business = row?;
        if business.helper(helper_id).is_some() {
            return Ok(Some(business));
        }
    }
    Ok(None)
}
