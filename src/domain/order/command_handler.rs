use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::store::{OrderStore, StoreError};
use super::commands::{CreateOrder, OrderPatch};
use super::errors::{OrderError, Reference};
use super::pricing::{order_total, price_line, validate_items, PricedItems, DEFAULT_DELIVERY_FEE};
use super::queries::OrderSummary;
use super::update_plan::{
    field_patch_plan, items_replacement_plan, restaurant_switch_plan, LineChange,
    NewOrderRecord, OrderUpdatePlan, PatchFields, UpdateBranch,
};
use super::value_objects::{non_empty, OrderCode, OrderItem, OrderStatus, Restaurant};

/// How many codes to try before giving up on a collision streak.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Request → Lookups → Write Plan → Store (one transaction)
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOrderResult {
    pub success: bool,
    pub message: String,
    pub id: i64,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "pratos")]
    pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOrderResult {
    pub success: bool,
    pub message: String,
    #[serde(skip)]
    pub branch: UpdateBranch,
    #[serde(rename = "pratos_atualizados", skip_serializing_if = "Option::is_none")]
    pub items_replaced: Option<usize>,
    #[serde(rename = "restaurante_atualizado", skip_serializing_if = "Option::is_none")]
    pub restaurant_changed: Option<bool>,
}

pub struct OrderCommandHandler {
    store: Arc<dyn OrderStore>,
}

impl OrderCommandHandler {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Validates references, prices the items and inserts header + lines.
    pub async fn create(&self, command: CreateOrder) -> Result<CreateOrderResult, OrderError> {
        if !self.store.customer_exists(command.customer_id).await? {
            return Err(OrderError::ReferenceNotFound {
                entity: Reference::Customer,
                id: command.customer_id,
            });
        }

        let restaurant = self
            .store
            .find_restaurant(command.restaurant_id, false)
            .await?
            .ok_or(OrderError::ReferenceNotFound {
                entity: Reference::Restaurant,
                id: command.restaurant_id,
            })?;

        if !self.store.delivery_address_exists(command.delivery_address_id).await? {
            return Err(OrderError::ReferenceNotFound {
                entity: Reference::DeliveryAddress,
                id: command.delivery_address_id,
            });
        }

        validate_items(&command.items)?;

        let code = self.allocate_code().await?;
        let priced = self.price_items(&command.items, restaurant.id).await?;

        let delivery_fee = command
            .delivery_fee
            .or(restaurant.delivery_fee)
            .unwrap_or(DEFAULT_DELIVERY_FEE);
        let total = order_total(priced.subtotal, delivery_fee)?;
        let item_count = priced.len();

        let mut record = NewOrderRecord {
            customer_id: command.customer_id,
            restaurant_id: restaurant.id,
            delivery_address_id: command.delivery_address_id,
            code,
            subtotal: priced.subtotal,
            delivery_fee,
            total,
            payment_method: command.payment_method,
            status: OrderStatus::Pending,
            notes: non_empty(command.notes),
            lines: priced.lines,
        };

        let order_id = self.insert_with_fresh_codes(&mut record).await?;

        tracing::info!(
            order_id,
            code = %record.code,
            restaurant_id = restaurant.id,
            item_count,
            subtotal = %record.subtotal,
            total = %record.total,
            "Order created"
        );

        Ok(CreateOrderResult {
            success: true,
            message: "Order created successfully".to_string(),
            id: order_id,
            code: record.code.as_str().to_string(),
            item_count,
        })
    }

    /// Applies a partial update following the first matching branch:
    /// restaurant switch, item replacement, or plain field patch.
    pub async fn update(
        &self,
        order_id: i64,
        patch: OrderPatch,
    ) -> Result<UpdateOrderResult, OrderError> {
        let existing = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if patch.is_empty() {
            return Err(OrderError::NoFieldsToUpdate);
        }
        let fields = PatchFields::from_patch(&patch)?;

        let switched_to = match patch.restaurant_id {
            Some(id) if id != existing.restaurant_id => Some(self.active_restaurant(id).await?),
            _ => None,
        };

        let plan = match (switched_to, patch.items) {
            (Some(restaurant), None) => restaurant_switch_plan(&fields, &restaurant)?,
            (switched_to, Some(items)) => {
                self.plan_item_replacement(&existing, &fields, switched_to, &items)
                    .await?
            }
            (None, None) => field_patch_plan(&existing, &fields)?,
        };

        self.apply(order_id, &plan).await?;

        let result = match &plan.lines {
            LineChange::Clear => UpdateOrderResult {
                success: true,
                message: "Order updated successfully. Previous items were removed because the restaurant changed."
                    .to_string(),
                branch: plan.branch,
                items_replaced: None,
                restaurant_changed: Some(true),
            },
            LineChange::Replace(lines) => UpdateOrderResult {
                success: true,
                message: "Order updated successfully".to_string(),
                branch: plan.branch,
                items_replaced: Some(lines.len()),
                restaurant_changed: None,
            },
            LineChange::Keep => UpdateOrderResult {
                success: true,
                message: "Order updated successfully".to_string(),
                branch: plan.branch,
                items_replaced: None,
                restaurant_changed: None,
            },
        };

        Ok(result)
    }

    /// Deletes the header; line items go with it through the cascade.
    pub async fn delete(&self, order_id: i64) -> Result<(), OrderError> {
        if self.store.find_order(order_id).await?.is_none() {
            return Err(OrderError::OrderNotFound(order_id));
        }

        if !self.store.delete_order(order_id).await? {
            return Err(OrderError::OrderNotFound(order_id));
        }

        tracing::info!(order_id, "Order deleted");
        Ok(())
    }

    async fn plan_item_replacement(
        &self,
        existing: &OrderSummary,
        fields: &PatchFields,
        switched_to: Option<Restaurant>,
        items: &[OrderItem],
    ) -> Result<OrderUpdatePlan, OrderError> {
        validate_items(items)?;

        let restaurant = match switched_to {
            Some(restaurant) => restaurant,
            None => self.active_restaurant(existing.restaurant_id).await?,
        };

        let priced = self.price_items(items, restaurant.id).await?;
        let switched = (restaurant.id != existing.restaurant_id).then_some(&restaurant);

        items_replacement_plan(existing, fields, switched, priced)
    }

    async fn apply(&self, order_id: i64, plan: &OrderUpdatePlan) -> Result<(), OrderError> {
        if !self.store.apply_update(order_id, plan).await? {
            // Deleted between the read and the write; the store rolled back.
            return Err(OrderError::OrderNotFound(order_id));
        }

        tracing::info!(
            order_id,
            branch = plan.branch.as_str(),
            subtotal = ?plan.header.subtotal.map(|m| m.to_string()),
            total = ?plan.header.total.map(|m| m.to_string()),
            "Order updated"
        );
        Ok(())
    }

    async fn active_restaurant(&self, restaurant_id: i64) -> Result<Restaurant, OrderError> {
        self.store
            .find_restaurant(restaurant_id, true)
            .await?
            .ok_or(OrderError::RestaurantUnavailable(restaurant_id))
    }

    async fn price_items(
        &self,
        items: &[OrderItem],
        restaurant_id: i64,
    ) -> Result<PricedItems, OrderError> {
        let mut priced = PricedItems::default();
        for item in items {
            let dish = self.store.find_available_dish(item.dish_id).await?;
            priced.push(price_line(item, dish.as_ref(), restaurant_id)?)?;
        }
        Ok(priced)
    }

    async fn allocate_code(&self) -> Result<OrderCode, OrderError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = OrderCode::generate(Utc::now());
            if !self.store.order_code_exists(&code).await? {
                return Ok(code);
            }
            tracing::warn!(attempt, code = %code, "Order code collision, regenerating");
        }
        Err(OrderError::CodeGenerationExhausted(MAX_CODE_ATTEMPTS))
    }

    /// Inserts the record, drawing a new code whenever a concurrent insert
    /// took the current one after the existence check.
    async fn insert_with_fresh_codes(
        &self,
        record: &mut NewOrderRecord,
    ) -> Result<i64, OrderError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            match self.store.insert_order(record).await {
                Ok(order_id) => return Ok(order_id),
                Err(StoreError::DuplicateCode) => {
                    tracing::warn!(
                        attempt,
                        code = %record.code,
                        "Order code taken at insert, regenerating"
                    );
                    record.code = self.allocate_code().await?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(OrderError::CodeGenerationExhausted(MAX_CODE_ATTEMPTS))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
