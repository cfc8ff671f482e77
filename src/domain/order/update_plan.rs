use crate::domain::money::Money;
use super::commands::OrderPatch;
use super::errors::OrderError;
use super::pricing::{order_total, PricedItems};
use super::queries::OrderSummary;
use super::value_objects::{non_empty, OrderCode, OrderStatus, PricedLine, Restaurant};

// ============================================================================
// Write Plans
// ============================================================================
//
// The command handler does every lookup and computation up front and hands
// the store a finished plan. The store applies a plan inside one
// transaction, so either all of it lands or none of it does.
//
// ============================================================================

/// Header and line items for a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderRecord {
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub delivery_address_id: i64,
    pub code: OrderCode,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub payment_method: String,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub lines: Vec<PricedLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateBranch {
    RestaurantSwitched,
    ItemsReplaced,
    FieldsPatched,
}

impl UpdateBranch {
    pub const fn as_str(self) -> &'static str {
        match self {
            UpdateBranch::RestaurantSwitched => "restaurant_switched",
            UpdateBranch::ItemsReplaced => "items_replaced",
            UpdateBranch::FieldsPatched => "fields_patched",
        }
    }
}

/// What happens to the existing line items.
#[derive(Debug, Clone, PartialEq)]
pub enum LineChange {
    Keep,
    Clear,
    Replace(Vec<PricedLine>),
}

/// Header columns to write. Only `Some` fields are touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderChanges {
    pub restaurant_id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub notes: Option<Option<String>>,
    pub subtotal: Option<Money>,
    pub delivery_fee: Option<Money>,
    pub total: Option<Money>,
    pub payment_method: Option<String>,
}

impl HeaderChanges {
    pub fn is_empty(&self) -> bool {
        *self == HeaderChanges::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdatePlan {
    pub branch: UpdateBranch,
    pub lines: LineChange,
    pub header: HeaderChanges,
}

/// Patch fields shared by every branch, with the status already parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchFields {
    pub status: Option<OrderStatus>,
    pub notes: Option<Option<String>>,
    pub payment_method: Option<String>,
    pub subtotal: Option<Money>,
    pub delivery_fee: Option<Money>,
}

impl PatchFields {
    pub fn from_patch(patch: &OrderPatch) -> Result<Self, OrderError> {
        let status = patch.status.as_deref().map(str::parse).transpose()?;
        Ok(Self {
            status,
            notes: patch.notes.clone().map(non_empty),
            payment_method: patch.payment_method.clone(),
            subtotal: patch.subtotal,
            delivery_fee: patch.delivery_fee,
        })
    }

    fn apply_descriptive(&self, header: &mut HeaderChanges) {
        header.status = self.status;
        header.notes = self.notes.clone();
        header.payment_method = self.payment_method.clone();
    }
}

/// Restaurant changed without a new item list: the old items reference
/// another restaurant's dishes, so they are dropped and the subtotal resets.
pub fn restaurant_switch_plan(
    fields: &PatchFields,
    restaurant: &Restaurant,
) -> Result<OrderUpdatePlan, OrderError> {
    let subtotal = Money::ZERO;
    let delivery_fee = fields
        .delivery_fee
        .unwrap_or_else(|| restaurant.delivery_fee.unwrap_or(Money::ZERO));

    let mut header = HeaderChanges {
        restaurant_id: Some(restaurant.id),
        subtotal: Some(subtotal),
        delivery_fee: Some(delivery_fee),
        total: Some(order_total(subtotal, delivery_fee)?),
        ..HeaderChanges::default()
    };
    fields.apply_descriptive(&mut header);

    Ok(OrderUpdatePlan {
        branch: UpdateBranch::RestaurantSwitched,
        lines: LineChange::Clear,
        header,
    })
}

/// New item list, priced against the effective restaurant. `switched_to`
/// is set when the patch also moves the order to another restaurant.
pub fn items_replacement_plan(
    existing: &OrderSummary,
    fields: &PatchFields,
    switched_to: Option<&Restaurant>,
    priced: PricedItems,
) -> Result<OrderUpdatePlan, OrderError> {
    let delivery_fee = match (fields.delivery_fee, switched_to) {
        (Some(explicit), _) => explicit,
        (None, Some(restaurant)) => restaurant.delivery_fee.unwrap_or(Money::ZERO),
        (None, None) => existing.delivery_fee,
    };

    let mut header = HeaderChanges {
        subtotal: Some(priced.subtotal),
        total: Some(order_total(priced.subtotal, delivery_fee)?),
        restaurant_id: switched_to.map(|r| r.id),
        delivery_fee: (fields.delivery_fee.is_some() || switched_to.is_some())
            .then_some(delivery_fee),
        ..HeaderChanges::default()
    };
    fields.apply_descriptive(&mut header);

    Ok(OrderUpdatePlan {
        branch: UpdateBranch::ItemsReplaced,
        lines: LineChange::Replace(priced.lines),
        header,
    })
}

/// Plain field patch. Touching subtotal or fee recomputes the total from
/// the supplied value and the stored counterpart.
pub fn field_patch_plan(
    existing: &OrderSummary,
    fields: &PatchFields,
) -> Result<OrderUpdatePlan, OrderError> {
    let mut header = HeaderChanges::default();
    fields.apply_descriptive(&mut header);

    if fields.subtotal.is_some() || fields.delivery_fee.is_some() {
        let subtotal = fields.subtotal.unwrap_or(existing.subtotal);
        let delivery_fee = fields.delivery_fee.unwrap_or(existing.delivery_fee);
        header.subtotal = fields.subtotal;
        header.delivery_fee = fields.delivery_fee;
        header.total = Some(order_total(subtotal, delivery_fee)?);
    }

    if header.is_empty() {
        return Err(OrderError::NoFieldsToUpdate);
    }

    Ok(OrderUpdatePlan {
        branch: UpdateBranch::FieldsPatched,
        lines: LineChange::Keep,
        header,
    })
}
