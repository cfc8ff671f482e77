// ============================================================================
// Order Domain - Order Workflow Business Logic
// ============================================================================
//
// This module contains ALL order-workflow code:
// - Value objects (OrderStatus, OrderCode, OrderItem, PricedLine)
// - Commands (CreateOrder, OrderPatch)
// - Errors (OrderError and its HTTP-facing kind)
// - Pricing (item validation, line pricing, totals)
// - Write plans (NewOrderRecord, OrderUpdatePlan)
// - Command Handler (create, update, delete)
// - Queries (get by id, list)
//
// Storage lives behind `crate::store::OrderStore`.
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod errors;
pub mod pricing;
pub mod update_plan;
pub mod command_handler;
pub mod queries;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use update_plan::*;
pub use command_handler::*;
pub use queries::*;
