//! Service catalog records.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::model::Service;

fn row_to_service(row: &Row) -> rusqlite::Result<Service> {
    let genders_json: String = row.get("allowed_genders")?;
    Ok(Service {
        id: row.get("id")?,
        business_id: row.get("business_id")?,
        name: row.get("name")?,
        duration_minutes: row.get::<_, i64>("duration_minutes")? as u32,
        price: row.get("price")?,
        allowed_genders: serde_json::from_str(&genders_json).unwrap_or_default(),
        deleted: row.get::<_, i64>("deleted")? != 0,
    })
}

pub fn put(conn: &Connection, service: &Service) -> Result<()> {
    let genders = serde_json::to_string(&service.allowed_genders)?;
    conn.execute(
        "INSERT OR REPLACE INTO services
             (id, business_id, name, duration_minutes, price, allowed_genders, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            service.id,
            service.business_id,
            service.name,
            service.duration_minutes as i64,
            service.price,
            genders,
            service.deleted as i64,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT * FROM services WHERE id = ?1",
            params![id],
            row_to_service,
        )
        .optional()?;
    Ok(service)
}

/// Load a service for a business, failing with NotFound when missing,
/// soft-deleted, or belonging to another business.
pub fn require_for_business(conn: &Connection, id: &str, business_id: &str) -> Result<Service> {
    match get(conn, id)? {
        Some(s) if !s.deleted && s.business_id == business_id => Ok(s),
        _ => Err(Error::NotFound(format!("service {} not found", id))),
    }
}

/// All non-deleted services of a business.
pub fn for_business(conn: &Connection, business_id: &str) -> Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM services WHERE business_id = ?1 AND deleted = 0 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![business_id], row_to_service)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
