use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::config::DatabaseConfig;
use crate::domain::money::Money;
use crate::domain::order::{
    Dish, HeaderChanges, LineChange, NewOrderRecord, OrderCode, OrderFilter, OrderLineView,
    OrderSummary, OrderUpdatePlan, PricedLine, Restaurant,
};
use crate::utils::{retry_with_backoff, RetryConfig};
use super::{OrderStore, StoreError, StoreResult};

// ============================================================================
// Postgres Order Store
// ============================================================================
//
// Every value reaches the database as a bound parameter. Multi-statement
// writes run in a transaction; an early return drops the transaction, which
// rolls it back.
//
// ============================================================================

const SCHEMA_SQL: &str = include_str!("../../migrations/0001_schema.sql");

const ORDER_CODE_CONSTRAINT: &str = "pedidos_codigo_pedido_key";

const ORDER_SELECT: &str = "\
SELECT p.id, p.cliente_id, p.restaurante_id, p.morada_entrega_id, p.codigo_pedido,
       p.subtotal_cents, p.taxa_entrega_cents, p.total_cents, p.metodo_pagamento,
       p.estado, p.observacoes, p.data_hora, p.created_at, p.updated_at,
       c.nome AS cliente_nome, r.nome AS restaurante_nome
FROM pedidos p
INNER JOIN clientes c ON p.cliente_id = c.id
INNER JOIN restaurantes r ON p.restaurante_id = r.id";

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the pool, waiting for the database to come up.
    pub async fn connect(config: &DatabaseConfig, retry: RetryConfig) -> anyhow::Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let pool = retry_with_backoff("database connect", retry, |_attempt| {
            let options = options.clone();
            async move {
                PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect_with(options)
                    .await
            }
        })
        .await?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            max_connections = config.max_connections,
            "Connected to Postgres"
        );

        Ok(Self::new(pool))
    }

    /// Creates the tables if they are missing.
    pub async fn apply_schema(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        tracing::info!("Database schema applied");
        Ok(())
    }
}

fn order_list_query(filter: &OrderFilter, limit: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(ORDER_SELECT);
    if let Some(status) = filter.status {
        qb.push(" WHERE p.estado = ").push_bind(status.as_str());
    }
    qb.push(" ORDER BY p.created_at DESC, p.updated_at DESC, p.data_hora DESC LIMIT ")
        .push_bind(limit);
    qb
}

// A concurrent insert can take the code between the existence check and
// this write; the caller retries with a fresh code.
fn map_code_conflict(err: sqlx::Error) -> StoreError {
    let duplicate_code = err.as_database_error().is_some_and(|db| {
        db.is_unique_violation() && db.constraint() == Some(ORDER_CODE_CONSTRAINT)
    });
    if duplicate_code {
        StoreError::DuplicateCode
    } else {
        StoreError::Database(err)
    }
}

// A short insert means the transaction must not commit.
async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    lines: &[PricedLine],
) -> StoreResult<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let inserted = lines_insert_query(order_id, lines)
        .build()
        .execute(&mut **tx)
        .await?
        .rows_affected();
    if inserted != lines.len() as u64 {
        return Err(StoreError::Integrity(format!(
            "inserted {inserted} of {} line items for order {order_id}",
            lines.len()
        )));
    }
    Ok(())
}

fn lines_insert_query(order_id: i64, lines: &[PricedLine]) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new(
        "INSERT INTO pedidos_pratos \
         (pedido_id, prato_id, quantidade, preco_unitario_cents, subtotal_item_cents, observacoes) ",
    );
    qb.push_values(lines, |mut row, line| {
        row.push_bind(order_id)
            .push_bind(line.dish_id)
            .push_bind(line.quantity)
            .push_bind(line.unit_price)
            .push_bind(line.line_subtotal)
            .push_bind(line.notes.as_deref());
    });
    qb
}

/// `UPDATE pedidos` touching only the columns present in `header`.
fn header_update_query(order_id: i64, header: &HeaderChanges) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE pedidos SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(restaurant_id) = header.restaurant_id {
            set.push("restaurante_id = ").push_bind_unseparated(restaurant_id);
        }
        if let Some(status) = header.status {
            set.push("estado = ").push_bind_unseparated(status.as_str());
        }
        if let Some(notes) = &header.notes {
            set.push("observacoes = ").push_bind_unseparated(notes.clone());
        }
        if let Some(subtotal) = header.subtotal {
            set.push("subtotal_cents = ").push_bind_unseparated(subtotal);
        }
        if let Some(fee) = header.delivery_fee {
            set.push("taxa_entrega_cents = ").push_bind_unseparated(fee);
        }
        if let Some(total) = header.total {
            set.push("total_cents = ").push_bind_unseparated(total);
        }
        if let Some(method) = &header.payment_method {
            set.push("metodo_pagamento = ").push_bind_unseparated(method.clone());
        }
        set.push("updated_at = NOW()");
    }
    qb.push(" WHERE id = ").push_bind(order_id);
    qb
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn customer_exists(&self, customer_id: i64) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM clientes WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn delivery_address_exists(&self, address_id: i64) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM moradas_entrega WHERE id = $1")
            .bind(address_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn find_restaurant(
        &self,
        restaurant_id: i64,
        only_active: bool,
    ) -> StoreResult<Option<Restaurant>> {
        let row: Option<(i64, Option<Money>, bool)> = sqlx::query_as(
            "SELECT id, taxa_entrega_cents, ativo FROM restaurantes \
             WHERE id = $1 AND (ativo = TRUE OR $2 = FALSE)",
        )
        .bind(restaurant_id)
        .bind(only_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, delivery_fee, active)| Restaurant { id, delivery_fee, active }))
    }

    async fn find_available_dish(&self, dish_id: i64) -> StoreResult<Option<Dish>> {
        let row: Option<(i64, i64, Money)> = sqlx::query_as(
            "SELECT id, restaurante_id, preco_cents FROM pratos WHERE id = $1 AND disponivel = TRUE",
        )
        .bind(dish_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, restaurant_id, price)| Dish { id, restaurant_id, price }))
    }

    async fn order_code_exists(&self, code: &OrderCode) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM pedidos WHERE codigo_pedido = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderSummary>> {
        let order = sqlx::query_as::<_, OrderSummary>(&format!("{ORDER_SELECT} WHERE p.id = $1"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn order_lines(&self, order_id: i64) -> StoreResult<Vec<OrderLineView>> {
        let lines = sqlx::query_as::<_, OrderLineView>(
            "SELECT pp.id, pp.pedido_id, pp.prato_id, pp.quantidade, pp.preco_unitario_cents,
                    pp.subtotal_item_cents, pp.observacoes,
                    pr.nome AS prato_nome, pr.descricao AS prato_descricao
             FROM pedidos_pratos pp
             INNER JOIN pratos pr ON pp.prato_id = pr.id
             WHERE pp.pedido_id = $1
             ORDER BY pp.id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(order_id, count = lines.len(), "Loaded order lines");
        Ok(lines)
    }

    async fn list_orders(&self, filter: &OrderFilter, limit: i64) -> StoreResult<Vec<OrderSummary>> {
        let orders = order_list_query(filter, limit)
            .build_query_as::<OrderSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    async fn insert_order(&self, record: &NewOrderRecord) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;

        let (order_id,): (i64,) = sqlx::query_as(
            "INSERT INTO pedidos
                (cliente_id, restaurante_id, morada_entrega_id, codigo_pedido,
                 subtotal_cents, taxa_entrega_cents, total_cents, metodo_pagamento, estado, observacoes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING id",
        )
        .bind(record.customer_id)
        .bind(record.restaurant_id)
        .bind(record.delivery_address_id)
        .bind(record.code.as_str())
        .bind(record.subtotal)
        .bind(record.delivery_fee)
        .bind(record.total)
        .bind(&record.payment_method)
        .bind(record.status.as_str())
        .bind(record.notes.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_code_conflict)?;

        insert_lines(&mut tx, order_id, &record.lines).await?;

        tx.commit().await?;

        tracing::debug!(order_id, lines = record.lines.len(), "Inserted order in one transaction");
        Ok(order_id)
    }

    async fn apply_update(&self, order_id: i64, plan: &OrderUpdatePlan) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(i64,)> = sqlx::query_as("SELECT id FROM pedidos WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(false);
        }

        match &plan.lines {
            LineChange::Keep => {}
            LineChange::Clear => {
                sqlx::query("DELETE FROM pedidos_pratos WHERE pedido_id = $1")
                    .bind(order_id)
                    .execute(&mut *tx)
                    .await?;
            }
            LineChange::Replace(lines) => {
                sqlx::query("DELETE FROM pedidos_pratos WHERE pedido_id = $1")
                    .bind(order_id)
                    .execute(&mut *tx)
                    .await?;
                insert_lines(&mut tx, order_id, lines).await?;
            }
        }

        header_update_query(order_id, &plan.header)
            .build()
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_order(&self, order_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM pedidos WHERE id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
