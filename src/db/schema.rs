//! Order record types and the SQLite schema

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable numeric identity of a customer or administrator (Telegram chat id)
pub type UserId = i64;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS orders (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    full_name TEXT NOT NULL,
    username TEXT NOT NULL,
    article TEXT NOT NULL,
    size TEXT NOT NULL,
    color TEXT NOT NULL,
    city TEXT NOT NULL,
    delivery TEXT NOT NULL,
    photo_file_id TEXT,
    contact TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    admin_message TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_owner_status ON orders(user_id, status);
CREATE INDEX IF NOT EXISTS idx_orders_username ON orders(username);
";

/// Lifecycle status of an order
///
/// `pending -> {price_sent, rejected}`, `price_sent -> {confirmed, declined}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    PriceSent,
    Confirmed,
    Declined,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PriceSent => "price_sent",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Declined => "declined",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (
                OrderStatus::Pending,
                OrderStatus::PriceSent | OrderStatus::Rejected
            ) | (
                OrderStatus::PriceSent,
                OrderStatus::Confirmed | OrderStatus::Declined
            )
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "price_sent" => Ok(OrderStatus::PriceSent),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "declined" => Ok(OrderStatus::Declined),
            "rejected" => Ok(OrderStatus::Rejected),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// One customer submission
///
/// Optional fields are omitted from the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Order {
    pub user_id: UserId,
    pub full_name: String,
    pub username: String,
    pub article: String,
    pub size: String,
    pub color: String,
    pub city: String,
    pub delivery: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_file_id: Option<String>,
    pub contact: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_message: Option<String>,
}

impl Order {
    /// Whether this record belongs to `owner`, either by id or by a non-empty handle
    pub fn is_owned_by(&self, owner: UserId, handle: Option<&str>) -> bool {
        if self.user_id == owner {
            return true;
        }
        match handle {
            Some(h) if !h.is_empty() => self.username == h,
            _ => false,
        }
    }
}

/// A status move applied to every record of `owner` currently in `from`
///
/// Records are keyed by owner, not by an order identifier, so concurrent
/// orders of one owner in the same status move together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub owner: UserId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub admin_message: Option<String>,
}

impl StatusChange {
    pub fn new(owner: UserId, from: OrderStatus, to: OrderStatus) -> Self {
        Self {
            owner,
            from,
            to,
            admin_message: None,
        }
    }

    pub fn with_admin_message(mut self, message: impl Into<String>) -> Self {
        self.admin_message = Some(message.into());
        self
    }

    /// Whether the move follows the status state machine
    pub fn is_valid(&self) -> bool {
        self.from.can_transition_to(self.to)
    }

    /// Apply to one record; returns true when the record changed
    pub fn apply(&self, order: &mut Order) -> bool {
        if !self.is_valid() || order.user_id != self.owner || order.status != self.from {
            return false;
        }
        order.status = self.to;
        if let Some(message) = &self.admin_message {
            order.admin_message = Some(message.clone());
        }
        true
    }
}
