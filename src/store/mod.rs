// ============================================================================
// Persistence Gateway
// ============================================================================
//
// `OrderStore` is the only way the order workflow touches storage. Reads are
// single lookups; the two multi-statement writes (`insert_order` and
// `apply_update`) each run in one transaction.
//
// ============================================================================

mod postgres;

#[cfg(test)]
pub(crate) mod memory;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::domain::order::{
    Dish, NewOrderRecord, OrderCode, OrderFilter, OrderLineView, OrderSummary, OrderUpdatePlan,
    Restaurant,
};

pub use postgres::PgOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("order code already taken")]
    DuplicateCode,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Round trip to the backing database.
    async fn ping(&self) -> StoreResult<()>;

    async fn customer_exists(&self, customer_id: i64) -> StoreResult<bool>;

    async fn delivery_address_exists(&self, address_id: i64) -> StoreResult<bool>;

    /// With `only_active`, inactive restaurants read as missing.
    async fn find_restaurant(
        &self,
        restaurant_id: i64,
        only_active: bool,
    ) -> StoreResult<Option<Restaurant>>;

    /// Unavailable dishes read as missing.
    async fn find_available_dish(&self, dish_id: i64) -> StoreResult<Option<Dish>>;

    async fn order_code_exists(&self, code: &OrderCode) -> StoreResult<bool>;

    async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderSummary>>;

    /// Line items ordered by line-item id.
    async fn order_lines(&self, order_id: i64) -> StoreResult<Vec<OrderLineView>>;

    /// Newest first: created_at, then updated_at, then data_hora, all descending.
    async fn list_orders(&self, filter: &OrderFilter, limit: i64) -> StoreResult<Vec<OrderSummary>>;

    /// Inserts header and line items atomically, returning the new order id.
    /// Fails with `StoreError::DuplicateCode` when the code is already taken.
    async fn insert_order(&self, record: &NewOrderRecord) -> StoreResult<i64>;

    /// Applies a plan atomically. Returns `false`, with nothing written,
    /// when the order no longer exists.
    async fn apply_update(&self, order_id: i64, plan: &OrderUpdatePlan) -> StoreResult<bool>;

    /// Deletes the header (line items cascade). Returns `false` if absent.
    async fn delete_order(&self, order_id: i64) -> StoreResult<bool>;
}
