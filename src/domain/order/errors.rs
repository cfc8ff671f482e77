use std::fmt;

use crate::domain::money::MoneyError;
use crate::store::StoreError;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Workflow Errors
// ============================================================================

/// Entities an order points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Customer,
    Restaurant,
    DeliveryAddress,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reference::Customer => "Customer",
            Reference::Restaurant => "Restaurant",
            Reference::DeliveryAddress => "Delivery address",
        })
    }
}

/// Coarse classification used for HTTP status mapping and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidReference,
    Validation,
    Unexpected,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidReference => "invalid_reference",
            ErrorKind::Validation => "validation",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found")]
    OrderNotFound(i64),

    #[error("{entity} with ID {id} not found")]
    ReferenceNotFound { entity: Reference, id: i64 },

    #[error("Dish with ID {0} not found or unavailable")]
    DishUnavailable(i64),

    #[error("Order must contain at least one item")]
    EmptyItems,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Dish {0} appears more than once in the item list")]
    DuplicateDish(i64),

    #[error("Dish {dish_id} does not belong to restaurant {restaurant_id}")]
    DishRestaurantMismatch { dish_id: i64, restaurant_id: i64 },

    #[error("Restaurant with ID {0} not found or inactive")]
    RestaurantUnavailable(i64),

    #[error("No fields provided for update")]
    NoFieldsToUpdate,

    #[error("Invalid status '{0}'. Allowed values: {allowed}", allowed = OrderStatus::allowed_values())]
    InvalidStatus(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    #[error("Could not generate a unique order code after {0} attempts")]
    CodeGenerationExhausted(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::OrderNotFound(_) => ErrorKind::NotFound,
            OrderError::ReferenceNotFound { .. } | OrderError::DishUnavailable(_) => {
                ErrorKind::InvalidReference
            }
            OrderError::Store(_) => ErrorKind::Unexpected,
            _ => ErrorKind::Validation,
        }
    }
}
