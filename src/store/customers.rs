//! Registered users and manual customers.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::model::{Gender, ManualCustomer, UserRecord};

fn row_to_user(row: &Row) -> rusqlite::Result<UserRecord> {
    let gender: String = row.get("gender")?;
    Ok(UserRecord {
        id: row.get("id")?,
        push_token: row.get("push_token")?,
        receive_notifications: row.get::<_, i64>("receive_notifications")? != 0,
        gender: Gender::parse(&gender).unwrap_or(Gender::Male),
        active: row.get::<_, i64>("active")? != 0,
        deleted: row.get::<_, i64>("deleted")? != 0,
        suspended: row.get::<_, i64>("suspended")? != 0,
    })
}

fn row_to_manual(row: &Row) -> rusqlite::Result<ManualCustomer> {
    let gender: String = row.get("gender")?;
    Ok(ManualCustomer {
        id: row.get("id")?,
        business_id: row.get("business_id")?,
        name: row.get("name")?,
        phone: row.get("phone")?,
        gender: Gender::parse(&gender).unwrap_or(Gender::Male),
    })
}

pub fn put_user(conn: &Connection, user: &UserRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO users
             (id, push_token, receive_notifications, gender, active, deleted, suspended)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.push_token,
            user.receive_notifications as i64,
            user.gender.as_str(),
            user.active as i64,
            user.deleted as i64,
            user.suspended as i64,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> Result<Option<UserRecord>> {
    let user = conn
        .query_row("SELECT * FROM users WHERE id = ?1", params![id], row_to_user)
        .optional()?;
    Ok(user)
}

/// Load a registered user eligible to join a queue.
pub fn require_active_user(conn: &Connection, id: &str) -> Result<UserRecord> {
    match get_user(conn, id)? {
        Some(u) if u.active && !u.deleted && !u.suspended => Ok(u),
        Some(_) => Err(Error::FailedPrecondition(format!(
            "user {} is not eligible to join a queue",
            id
        ))),
        None => Err(Error::NotFound(format!("user {} not found", id))),
    }
}

pub fn put_manual(conn: &Connection, customer: &ManualCustomer) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO manual_customers (id, business_id, name, phone, gender)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            customer.id,
            customer.business_id,
            customer.name,
            customer.phone,
            customer.gender.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_manual(conn: &Connection, id: &str) -> Result<Option<ManualCustomer>> {
    let customer = conn
        .query_row(
            "SELECT * FROM manual_customers WHERE id = ?1",
            params![id],
            row_to_manual,
        )
        .optional()?;
    Ok(customer)
}

/// Load a manual customer belonging to the given business.
pub fn require_manual_for_business(
    conn: &Connection,
    id: &str,
    business_id: &str,
) -> Result<ManualCustomer> {
    match get_manual(conn, id)? {
        Some(m) if m.business_id == business_id => Ok(m),
        _ => Err(Error::NotFound(format!("manual customer {} not found", id))),
    }
}

/// Search manual customers of a business by name and/or phone prefix.
pub fn search_manual(
    conn: &Connection,
    business_id: &str,
    name: Option<&str>,
    phone: Option<&str>,
) -> Result<Vec<ManualCustomer>> {
    let name_pat = name.map(|n| format!("{}%", n)).unwrap_or_else(|| "%".into());
    let phone_pat = phone
        .map(|p| format!("{}%", p))
        .unwrap_or_else(|| "%".into());

    let mut stmt = conn.prepare(
        "SELECT * FROM manual_customers
         WHERE business_id = ?1 AND name LIKE ?2 AND phone LIKE ?3
         ORDER BY name LIMIT 50",
    )?;
    let rows = stmt.query_map(params![business_id, name_pat, phone_pat], row_to_manual)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
