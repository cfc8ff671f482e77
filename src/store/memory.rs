use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::domain::money::Money;
use crate::domain::order::{
    Dish, LineChange, NewOrderRecord, OrderCode, OrderFilter, OrderLineView, OrderStatus,
    OrderSummary, OrderUpdatePlan, PricedLine, Restaurant,
};
use super::{OrderStore, StoreError, StoreResult};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// Mirrors the Postgres store's semantics for the test suite: joins, the
// cascade on delete, the unique order code, list ordering and all-or-nothing
// writes. Timestamps come from a logical clock so ordering is deterministic.
//
// ============================================================================

const EPOCH_SECS: i64 = 1_767_225_600;

#[derive(Debug, Clone)]
struct RestaurantRow {
    name: String,
    restaurant: Restaurant,
}

#[derive(Debug, Clone)]
struct DishRow {
    dish: Dish,
    name: String,
    description: Option<String>,
    available: bool,
}

#[derive(Debug, Clone)]
struct HeaderRow {
    customer_id: i64,
    restaurant_id: i64,
    delivery_address_id: i64,
    code: String,
    subtotal: Money,
    delivery_fee: Money,
    total: Money,
    payment_method: String,
    status: OrderStatus,
    notes: Option<String>,
    ordered_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LineRow {
    id: i64,
    order_id: i64,
    line: PricedLine,
}

#[derive(Debug, Default)]
struct State {
    customers: BTreeMap<i64, String>,
    addresses: BTreeSet<i64>,
    restaurants: BTreeMap<i64, RestaurantRow>,
    dishes: BTreeMap<i64, DishRow>,
    orders: BTreeMap<i64, HeaderRow>,
    lines: Vec<LineRow>,
    next_order_id: i64,
    next_line_id: i64,
    clock: i64,
    writes: u64,
    fail_writes: bool,
    colliding_inserts: u32,
    vanish_after_find: Option<i64>,
}

impl State {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        Utc.timestamp_opt(EPOCH_SECS + self.clock, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    fn summary(&self, id: i64, row: &HeaderRow) -> OrderSummary {
        OrderSummary {
            id,
            customer_id: row.customer_id,
            restaurant_id: row.restaurant_id,
            delivery_address_id: row.delivery_address_id,
            code: row.code.clone(),
            subtotal: row.subtotal,
            delivery_fee: row.delivery_fee,
            total: row.total,
            payment_method: row.payment_method.clone(),
            status: row.status,
            notes: row.notes.clone(),
            ordered_at: row.ordered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            customer_name: self.customers.get(&row.customer_id).cloned().unwrap_or_default(),
            restaurant_name: self
                .restaurants
                .get(&row.restaurant_id)
                .map(|r| r.name.clone())
                .unwrap_or_default(),
        }
    }

    fn check_lines(&self, lines: &[PricedLine]) -> StoreResult<()> {
        for line in lines {
            if !self.dishes.contains_key(&line.dish_id) {
                return Err(StoreError::Integrity(format!("unknown dish {}", line.dish_id)));
            }
        }
        Ok(())
    }

    fn insert_lines(&mut self, order_id: i64, lines: &[PricedLine]) {
        for line in lines {
            self.next_line_id += 1;
            self.lines.push(LineRow {
                id: self.next_line_id,
                order_id,
                line: line.clone(),
            });
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    state: Mutex<State>,
}

impl InMemoryOrderStore {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_customer(&self, id: i64, name: &str) {
        self.state().customers.insert(id, name.to_string());
    }

    pub fn add_address(&self, id: i64) {
        self.state().addresses.insert(id);
    }

    pub fn add_restaurant(&self, id: i64, name: &str, delivery_fee: Option<Money>, active: bool) {
        self.state().restaurants.insert(
            id,
            RestaurantRow {
                name: name.to_string(),
                restaurant: Restaurant { id, delivery_fee, active },
            },
        );
    }

    pub fn add_dish(&self, id: i64, restaurant_id: i64, name: &str, price: Money, available: bool) {
        self.state().dishes.insert(
            id,
            DishRow {
                dish: Dish { id, restaurant_id, price },
                name: name.to_string(),
                description: Some(format!("{name} da casa")),
                available,
            },
        );
    }

    /// Changes a catalog price; existing line items keep their snapshot.
    pub fn set_dish_price(&self, id: i64, price: Money) {
        if let Some(row) = self.state().dishes.get_mut(&id) {
            row.dish.price = price;
        }
    }

    /// Makes every subsequent write fail before touching any row.
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Makes the next `count` inserts hit the unique code constraint, as if
    /// a concurrent request had taken the code first.
    pub fn collide_on_insert(&self, count: u32) {
        self.state().colliding_inserts = count;
    }

    /// The next `find_order` for `order_id` returns the order and then
    /// removes it, as a concurrent delete would. Not counted as a write.
    pub fn vanish_after_find(&self, order_id: i64) {
        self.state().vanish_after_find = Some(order_id);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.state().writes
    }

    pub fn line_count(&self, order_id: i64) -> usize {
        self.state().lines.iter().filter(|l| l.order_id == order_id).count()
    }

    pub fn total_line_count(&self) -> usize {
        self.state().lines.len()
    }

    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn customer_exists(&self, customer_id: i64) -> StoreResult<bool> {
        Ok(self.state().customers.contains_key(&customer_id))
    }

    async fn delivery_address_exists(&self, address_id: i64) -> StoreResult<bool> {
        Ok(self.state().addresses.contains(&address_id))
    }

    async fn find_restaurant(
        &self,
        restaurant_id: i64,
        only_active: bool,
    ) -> StoreResult<Option<Restaurant>> {
        Ok(self
            .state()
            .restaurants
            .get(&restaurant_id)
            .map(|row| row.restaurant.clone())
            .filter(|r| r.active || !only_active))
    }

    async fn find_available_dish(&self, dish_id: i64) -> StoreResult<Option<Dish>> {
        Ok(self
            .state()
            .dishes
            .get(&dish_id)
            .filter(|row| row.available)
            .map(|row| row.dish.clone()))
    }

    async fn order_code_exists(&self, code: &OrderCode) -> StoreResult<bool> {
        Ok(self.state().orders.values().any(|o| o.code == code.as_str()))
    }

    async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderSummary>> {
        let mut state = self.state();
        let found = state.orders.get(&order_id).map(|row| state.summary(order_id, row));
        if state.vanish_after_find == Some(order_id) {
            state.vanish_after_find = None;
            state.orders.remove(&order_id);
            state.lines.retain(|l| l.order_id != order_id);
        }
        Ok(found)
    }

    async fn order_lines(&self, order_id: i64) -> StoreResult<Vec<OrderLineView>> {
        let state = self.state();
        let mut lines: Vec<OrderLineView> = state
            .lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .map(|l| {
                let dish = state.dishes.get(&l.line.dish_id);
                OrderLineView {
                    id: l.id,
                    order_id,
                    dish_id: l.line.dish_id,
                    quantity: l.line.quantity,
                    unit_price: l.line.unit_price,
                    line_subtotal: l.line.line_subtotal,
                    notes: l.line.notes.clone(),
                    dish_name: dish.map(|d| d.name.clone()).unwrap_or_default(),
                    dish_description: dish.and_then(|d| d.description.clone()),
                }
            })
            .collect();
        lines.sort_by_key(|l| l.id);
        Ok(lines)
    }

    async fn list_orders(&self, filter: &OrderFilter, limit: i64) -> StoreResult<Vec<OrderSummary>> {
        let state = self.state();
        let mut orders: Vec<OrderSummary> = state
            .orders
            .iter()
            .filter(|(_, row)| filter.status.map_or(true, |s| row.status == s))
            .map(|(id, row)| state.summary(*id, row))
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.updated_at.cmp(&a.updated_at))
                .then(b.ordered_at.cmp(&a.ordered_at))
        });
        orders.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(orders)
    }

    async fn insert_order(&self, record: &NewOrderRecord) -> StoreResult<i64> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(StoreError::Integrity("injected write failure".into()));
        }
        if state.colliding_inserts > 0 {
            state.colliding_inserts -= 1;
            return Err(StoreError::DuplicateCode);
        }
        if state.orders.values().any(|o| o.code == record.code.as_str()) {
            return Err(StoreError::DuplicateCode);
        }
        state.check_lines(&record.lines)?;

        let now = state.tick();
        state.next_order_id += 1;
        let order_id = state.next_order_id;
        state.orders.insert(
            order_id,
            HeaderRow {
                customer_id: record.customer_id,
                restaurant_id: record.restaurant_id,
                delivery_address_id: record.delivery_address_id,
                code: record.code.as_str().to_string(),
                subtotal: record.subtotal,
                delivery_fee: record.delivery_fee,
                total: record.total,
                payment_method: record.payment_method.clone(),
                status: record.status,
                notes: record.notes.clone(),
                ordered_at: now,
                created_at: now,
                updated_at: now,
            },
        );
        state.insert_lines(order_id, &record.lines);
        state.writes += 1;

        Ok(order_id)
    }

    async fn apply_update(&self, order_id: i64, plan: &OrderUpdatePlan) -> StoreResult<bool> {
        let mut state = self.state();
        if !state.orders.contains_key(&order_id) {
            return Ok(false);
        }
        if state.fail_writes {
            return Err(StoreError::Integrity("injected write failure".into()));
        }
        if let LineChange::Replace(lines) = &plan.lines {
            state.check_lines(lines)?;
        }

        match &plan.lines {
            LineChange::Keep => {}
            LineChange::Clear => state.lines.retain(|l| l.order_id != order_id),
            LineChange::Replace(lines) => {
                state.lines.retain(|l| l.order_id != order_id);
                state.insert_lines(order_id, lines);
            }
        }

        let now = state.tick();
        let header = &plan.header;
        if let Some(row) = state.orders.get_mut(&order_id) {
            if let Some(id) = header.restaurant_id {
                row.restaurant_id = id;
            }
            if let Some(status) = header.status {
                row.status = status;
            }
            if let Some(notes) = &header.notes {
                row.notes = notes.clone();
            }
            if let Some(subtotal) = header.subtotal {
                row.subtotal = subtotal;
            }
            if let Some(fee) = header.delivery_fee {
                row.delivery_fee = fee;
            }
            if let Some(total) = header.total {
                row.total = total;
            }
            if let Some(method) = &header.payment_method {
                row.payment_method = method.clone();
            }
            row.updated_at = now;
        }
        state.writes += 1;

        Ok(true)
    }

    async fn delete_order(&self, order_id: i64) -> StoreResult<bool> {
        let mut state = self.state();
        if state.orders.remove(&order_id).is_none() {
            return Ok(false);
        }
        state.lines.retain(|l| l.order_id != order_id);
        state.writes += 1;
        Ok(true)
    }
}
