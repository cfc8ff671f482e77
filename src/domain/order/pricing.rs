use std::collections::HashSet;

use crate::domain::money::Money;
use super::errors::OrderError;
use super::value_objects::{non_empty, Dish, OrderItem, PricedLine};

/// Fee charged when neither the request nor the restaurant supplies one.
pub const DEFAULT_DELIVERY_FEE: Money = Money::from_cents(250);

/// Shape checks that need no lookups: non-empty, positive quantities,
/// each dish at most once (line items are keyed by order and dish).
pub fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(OrderError::InvalidQuantity(item.quantity));
        }
        if !seen.insert(item.dish_id) {
            return Err(OrderError::DuplicateDish(item.dish_id));
        }
    }

    Ok(())
}

/// Prices one requested item against the dish found in the catalog.
/// `dish` is `None` when the dish is missing or unavailable.
pub fn price_line(
    item: &OrderItem,
    dish: Option<&Dish>,
    restaurant_id: i64,
) -> Result<PricedLine, OrderError> {
    let dish = dish.ok_or(OrderError::DishUnavailable(item.dish_id))?;

    if dish.restaurant_id != restaurant_id {
        return Err(OrderError::DishRestaurantMismatch {
            dish_id: item.dish_id,
            restaurant_id,
        });
    }

    Ok(PricedLine {
        dish_id: item.dish_id,
        quantity: item.quantity,
        unit_price: dish.price,
        line_subtotal: dish.price.checked_mul(item.quantity)?,
        notes: non_empty(item.notes.clone()),
    })
}

/// Line items accumulated in request order with their running subtotal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricedItems {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
}

impl PricedItems {
    pub fn push(&mut self, line: PricedLine) -> Result<(), OrderError> {
        self.subtotal = self.subtotal.checked_add(line.line_subtotal)?;
        self.lines.push(line);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

pub fn order_total(subtotal: Money, delivery_fee: Money) -> Result<Money, OrderError> {
    Ok(subtotal.checked_add(delivery_fee)?)
}
