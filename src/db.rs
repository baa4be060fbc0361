//! Durable order storage
//!
//! Two backends share the same record format: a single JSON file holding the
//! whole collection, and a SQLite database.

mod json_file;
mod schema;

pub use json_file::JsonFileStore;
pub use schema::*;

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed order data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid status in store: {0}")]
    InvalidStatus(String),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe SQLite order database
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Append one order at the end of the history
    pub fn append_order(&self, order: &Order) -> DbResult<()> {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO orders (user_id, full_name, username, article, size, color, city, delivery,
                                 photo_file_id, contact, status, admin_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                order.user_id,
                order.full_name,
                order.username,
                order.article,
                order.size,
                order.color,
                order.city,
                order.delivery,
                order.photo_file_id,
                order.contact,
                order.status.as_str(),
                order.admin_message,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Apply a status change to every matching record, returning how many moved
    pub fn update_status(&self, change: &StatusChange) -> DbResult<usize> {
        if !change.is_valid() {
            return Ok(0);
        }
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        let changed = conn.execute(
            "UPDATE orders
             SET status = ?1, admin_message = COALESCE(?2, admin_message)
             WHERE user_id = ?3 AND status = ?4",
            params![
                change.to.as_str(),
                change.admin_message,
                change.owner,
                change.from.as_str(),
            ],
        )?;
        Ok(changed)
    }

    /// Orders owned by `owner` or filed under `handle`, oldest first
    pub fn orders_for(&self, owner: UserId, handle: Option<&str>) -> DbResult<Vec<Order>> {
        let handle = handle.filter(|h| !h.is_empty());
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT user_id, full_name, username, article, size, color, city, delivery,
                    photo_file_id, contact, status, admin_message
             FROM orders
             WHERE user_id = ?1 OR (?2 IS NOT NULL AND username = ?2)
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![owner, handle], |row| Ok(read_order(row)))?;
        let mut orders = Vec::new();
        for row in rows {
            orders.push(row??);
        }
        Ok(orders)
    }

    /// Whether `owner` has ever submitted an order
    pub fn has_orders(&self, owner: UserId) -> DbResult<bool> {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE user_id = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn read_order(row: &Row<'_>) -> DbResult<Order> {
    let status: String = row.get(10)?;
    Ok(Order {
        user_id: row.get(0)?,
        full_name: row.get(1)?,
        username: row.get(2)?,
        article: row.get(3)?,
        size: row.get(4)?,
        color: row.get(5)?,
        city: row.get(6)?,
        delivery: row.get(7)?,
        photo_file_id: row.get(8)?,
        contact: row.get(9)?,
        status: status.parse().map_err(DbError::InvalidStatus)?,
        admin_message: row.get(11)?,
    })
}
