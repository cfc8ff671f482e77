use chrono::{TimeZone, Utc};

use crate::domain::money::Money;
use crate::domain::order::{NewOrderRecord, OrderCode, OrderStatus, PricedLine};
use super::memory::InMemoryOrderStore;
use super::OrderStore;

/// Catalog used across the workflow tests.
///
/// | restaurant | name           | fee  | active |
/// |------------|----------------|------|--------|
/// | 1          | Tasca do Porto | 2.50 | yes    |
/// | 2          | Sushi Lab      | 3.00 | yes    |
/// | 3          | Casa Fechada   | 1.50 | no     |
/// | 4          | Sem Taxa       | none | yes    |
///
/// Dishes: 1 Francesinha 9.99 (r1), 2 Caldo verde 3.00 (r1), 3 Nigiri 5.50 (r2),
/// 4 Bacalhau 12.00 (r1, unavailable), 5 Bifana 4.00 (r4), 6 Prego 6.00 (r3).
pub fn seeded_store() -> InMemoryOrderStore {
    let store = InMemoryOrderStore::default();

    store.add_customer(1, "Ana Silva");
    store.add_customer(2, "Bruno Costa");
    store.add_address(1);
    store.add_address(2);

    store.add_restaurant(1, "Tasca do Porto", Some(Money::from_cents(250)), true);
    store.add_restaurant(2, "Sushi Lab", Some(Money::from_cents(300)), true);
    store.add_restaurant(3, "Casa Fechada", Some(Money::from_cents(150)), false);
    store.add_restaurant(4, "Sem Taxa", None, true);

    store.add_dish(1, 1, "Francesinha", Money::from_cents(999), true);
    store.add_dish(2, 1, "Caldo verde", Money::from_cents(300), true);
    store.add_dish(3, 2, "Nigiri", Money::from_cents(550), true);
    store.add_dish(4, 1, "Bacalhau", Money::from_cents(1200), false);
    store.add_dish(5, 4, "Bifana", Money::from_cents(400), true);
    store.add_dish(6, 3, "Prego", Money::from_cents(600), true);

    store
}

/// Inserts an order for customer 1 at the restaurant of the first dish,
/// priced from the catalog with the restaurant's stored fee.
pub async fn seed_order(
    store: &InMemoryOrderStore,
    status: OrderStatus,
    items: &[(i64, i32)],
) -> i64 {
    let mut lines = Vec::new();
    let mut restaurant_id = 1;
    for &(dish_id, quantity) in items {
        let dish = store
            .find_available_dish(dish_id)
            .await
            .unwrap()
            .expect("seed dish must exist");
        restaurant_id = dish.restaurant_id;
        lines.push(PricedLine {
            dish_id,
            quantity,
            unit_price: dish.price,
            line_subtotal: dish.price.checked_mul(quantity).unwrap(),
            notes: None,
        });
    }

    let restaurant = store
        .find_restaurant(restaurant_id, false)
        .await
        .unwrap()
        .expect("seed restaurant must exist");
    let subtotal = lines
        .iter()
        .try_fold(Money::ZERO, |acc, l| acc.checked_add(l.line_subtotal))
        .unwrap();
    let delivery_fee = restaurant.delivery_fee.unwrap_or(Money::ZERO);

    let day = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
    let code = OrderCode::from_parts(day, 1000 + store.order_count() as u32);

    store
        .insert_order(&NewOrderRecord {
            customer_id: 1,
            restaurant_id,
            delivery_address_id: 1,
            code,
            subtotal,
            delivery_fee,
            total: subtotal.checked_add(delivery_fee).unwrap(),
            payment_method: "cartao".to_string(),
            status,
            notes: None,
            lines,
        })
        .await
        .unwrap()
}
