// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// `money` holds the currency type every amount goes through; `order` holds
// the order workflow built on top of it.
//
// ============================================================================

pub mod money;
pub mod order;
