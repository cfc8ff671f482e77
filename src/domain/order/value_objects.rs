use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::money::Money;
use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Lifecycle state of an order header, stored as its snake_case label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "confirmado")]
    Confirmed,
    #[serde(rename = "em_preparacao")]
    Preparing,
    #[serde(rename = "a_caminho")]
    OutForDelivery,
    #[serde(rename = "entregue")]
    Delivered,
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pendente",
            OrderStatus::Confirmed => "confirmado",
            OrderStatus::Preparing => "em_preparacao",
            OrderStatus::OutForDelivery => "a_caminho",
            OrderStatus::Delivered => "entregue",
            OrderStatus::Cancelled => "cancelado",
        }
    }

    pub fn allowed_values() -> String {
        Self::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidStatus(s.to_string()))
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Human-readable order code: `FD-YYYYMMDD-NNNN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCode(String);

impl OrderCode {
    pub const PREFIX: &'static str = "FD";

    /// Builds a code for `now` with a pseudo-random suffix in [1000, 9999].
    /// Suffixes can repeat; callers check for collisions.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = 1000 + (Uuid::new_v4().as_u128() % 9000) as u32;
        Self::from_parts(now, suffix)
    }

    pub fn from_parts(now: DateTime<Utc>, suffix: u32) -> Self {
        Self(format!("{}-{}-{}", Self::PREFIX, now.format("%Y%m%d"), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Restaurant data the workflow needs; owned by the restaurant CRUD service.
#[derive(Debug, Clone, PartialEq)]
pub struct Restaurant {
    pub id: i64,
    pub delivery_fee: Option<Money>,
    pub active: bool,
}

/// An available dish with its current catalog price.
#[derive(Debug, Clone, PartialEq)]
pub struct Dish {
    pub id: i64,
    pub restaurant_id: i64,
    pub price: Money,
}

/// A requested line item as it arrives in a create/update body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(rename = "prato_id")]
    pub dish_id: i64,
    #[serde(rename = "quantidade", default = "default_quantity")]
    pub quantity: i32,
    #[serde(rename = "observacoes_item", default)]
    pub notes: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

/// Empty notes are stored as NULL.
pub fn non_empty(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.is_empty())
}

/// A validated line item with its price snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedLine {
    #[serde(rename = "prato_id")]
    pub dish_id: i64,
    #[serde(rename = "quantidade")]
    pub quantity: i32,
    #[serde(rename = "preco_unitario")]
    pub unit_price: Money,
    #[serde(rename = "subtotal_item")]
    pub line_subtotal: Money,
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
}

// ============================================================================
// Unit Tests
// ============================================================================
