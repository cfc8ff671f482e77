use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::money::Money;
use crate::store::OrderStore;
use super::errors::OrderError;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Read Model
// ============================================================================
//
// Header rows joined with customer/restaurant names, plus line items joined
// with dish details. Prices on line items are the snapshots taken when the
// items were written; the dish catalog is never consulted for them.
//
// ============================================================================

/// Maximum rows returned by `list`.
pub const LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: i64,
    #[serde(rename = "cliente_id")]
    #[sqlx(rename = "cliente_id")]
    pub customer_id: i64,
    #[serde(rename = "restaurante_id")]
    #[sqlx(rename = "restaurante_id")]
    pub restaurant_id: i64,
    #[serde(rename = "morada_entrega_id")]
    #[sqlx(rename = "morada_entrega_id")]
    pub delivery_address_id: i64,
    #[serde(rename = "codigo_pedido")]
    #[sqlx(rename = "codigo_pedido")]
    pub code: String,
    #[sqlx(rename = "subtotal_cents")]
    pub subtotal: Money,
    #[serde(rename = "taxa_entrega")]
    #[sqlx(rename = "taxa_entrega_cents")]
    pub delivery_fee: Money,
    #[sqlx(rename = "total_cents")]
    pub total: Money,
    #[serde(rename = "metodo_pagamento")]
    #[sqlx(rename = "metodo_pagamento")]
    pub payment_method: String,
    #[serde(rename = "estado")]
    #[sqlx(rename = "estado", try_from = "String")]
    pub status: OrderStatus,
    #[serde(rename = "observacoes")]
    #[sqlx(rename = "observacoes")]
    pub notes: Option<String>,
    #[serde(rename = "data_hora")]
    #[sqlx(rename = "data_hora")]
    pub ordered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "cliente_nome")]
    #[sqlx(rename = "cliente_nome")]
    pub customer_name: String,
    #[serde(rename = "restaurante_nome")]
    #[sqlx(rename = "restaurante_nome")]
    pub restaurant_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderLineView {
    pub id: i64,
    #[serde(rename = "pedido_id")]
    #[sqlx(rename = "pedido_id")]
    pub order_id: i64,
    #[serde(rename = "prato_id")]
    #[sqlx(rename = "prato_id")]
    pub dish_id: i64,
    #[serde(rename = "quantidade")]
    #[sqlx(rename = "quantidade")]
    pub quantity: i32,
    #[serde(rename = "preco_unitario")]
    #[sqlx(rename = "preco_unitario_cents")]
    pub unit_price: Money,
    #[serde(rename = "subtotal_item")]
    #[sqlx(rename = "subtotal_item_cents")]
    pub line_subtotal: Money,
    #[serde(rename = "observacoes")]
    #[sqlx(rename = "observacoes")]
    pub notes: Option<String>,
    #[serde(rename = "prato_nome")]
    #[sqlx(rename = "prato_nome")]
    pub dish_name: String,
    #[serde(rename = "prato_descricao")]
    #[sqlx(rename = "prato_descricao")]
    pub dish_description: Option<String>,
}

/// An order header with its line items nested under `pratos`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub header: OrderSummary,
    #[serde(rename = "pratos")]
    pub items: Vec<OrderLineView>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    /// Parses the raw `estado` query value; blank means no filter.
    pub fn from_query(status: Option<&str>) -> Result<Self, OrderError> {
        let status = match status.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse()?),
        };
        Ok(Self { status })
    }
}

pub struct OrderQueries {
    store: Arc<dyn OrderStore>,
}

impl OrderQueries {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Header plus line items, or `None` when the order does not exist.
    pub async fn get_by_id(&self, order_id: i64) -> Result<Option<OrderView>, OrderError> {
        let Some(header) = self.store.find_order(order_id).await? else {
            tracing::debug!(order_id, "Order not found");
            return Ok(None);
        };

        let items = self.store.order_lines(order_id).await?;
        tracing::debug!(order_id, item_count = items.len(), "Loaded order");

        Ok(Some(OrderView { header, items }))
    }

    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderSummary>, OrderError> {
        let orders = self.store.list_orders(filter, LIST_LIMIT).await?;
        tracing::debug!(
            status = ?filter.status,
            count = orders.len(),
            "Listed orders"
        );
        Ok(orders)
    }
}
