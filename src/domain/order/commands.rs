use serde::{Deserialize, Deserializer};

use crate::domain::money::Money;
use super::value_objects::OrderItem;

// ============================================================================
// Order Commands - request bodies for create and update
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    #[serde(rename = "cliente_id")]
    pub customer_id: i64,
    #[serde(rename = "restaurante_id")]
    pub restaurant_id: i64,
    #[serde(rename = "morada_entrega_id")]
    pub delivery_address_id: i64,
    #[serde(rename = "metodo_pagamento")]
    pub payment_method: String,
    #[serde(rename = "observacoes", default)]
    pub notes: Option<String>,
    /// An explicit `null` counts as supplied and rounds to zero.
    #[serde(rename = "taxa_entrega", default, deserialize_with = "present")]
    pub delivery_fee: Option<Money>,
    /// Absent and empty lists are both rejected by the workflow.
    #[serde(rename = "pratos", default)]
    pub items: Vec<OrderItem>,
}

/// Partial update. `None` means "not supplied". A field sent as `null`
/// is supplied: `Some(None)` clears the notes, and amounts read as zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPatch {
    #[serde(rename = "estado", default)]
    pub status: Option<String>,
    #[serde(rename = "observacoes", default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub subtotal: Option<Money>,
    #[serde(rename = "taxa_entrega", default, deserialize_with = "present")]
    pub delivery_fee: Option<Money>,
    #[serde(rename = "metodo_pagamento", default)]
    pub payment_method: Option<String>,
    #[serde(rename = "restaurante_id", default)]
    pub restaurant_id: Option<i64>,
    #[serde(rename = "pratos", default)]
    pub items: Option<Vec<OrderItem>>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.notes.is_none()
            && self.subtotal.is_none()
            && self.delivery_fee.is_none()
            && self.payment_method.is_none()
            && self.restaurant_id.is_none()
            && self.items.is_none()
    }
}

// A field that is present (even as null) deserializes to Some.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_parses_portuguese_fields() {
        let body = r#"{
            "cliente_id": 1, "restaurante_id": 2, "morada_entrega_id": 3,
            "metodo_pagamento": "mbway", "taxa_entrega": "1.999",
            "pratos": [{"prato_id": 10, "quantidade": 2}]
        }"#;
        let cmd: CreateOrder = serde_json::from_str(body).unwrap();
        assert_eq!(cmd.customer_id, 1);
        assert_eq!(cmd.delivery_fee, Some(Money::from_cents(200)));
        assert_eq!(cmd.items.len(), 1);
        assert!(cmd.notes.is_none());
    }

    #[test]
    fn test_create_order_without_items_parses_to_empty_list() {
        let body = r#"{"cliente_id": 1, "restaurante_id": 2, "morada_entrega_id": 3, "metodo_pagamento": "cash"}"#;
        let cmd: CreateOrder = serde_json::from_str(body).unwrap();
        assert!(cmd.items.is_empty());
    }

    #[test]
    fn test_patch_distinguishes_absent_and_null_notes() {
        let patch: OrderPatch = serde_json::from_str(r#"{"estado": "confirmado"}"#).unwrap();
        assert_eq!(patch.notes, None);

        let patch: OrderPatch = serde_json::from_str(r#"{"observacoes": null}"#).unwrap();
        assert_eq!(patch.notes, Some(None));

        let patch: OrderPatch = serde_json::from_str(r#"{"observacoes": "ring twice"}"#).unwrap();
        assert_eq!(patch.notes, Some(Some("ring twice".to_string())));
    }

    #[test]
    fn test_empty_patch() {
        let patch: OrderPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());

        let patch: OrderPatch = serde_json::from_str(r#"{"pratos": []}"#).unwrap();
        assert!(!patch.is_empty());
        assert_eq!(patch.items.map(|i| i.len()), Some(0));
    }

    #[test]
    fn test_null_amounts_count_as_supplied() {
        let body = r#"{"cliente_id": 1, "restaurante_id": 2, "morada_entrega_id": 3,
            "metodo_pagamento": "cash", "taxa_entrega": null}"#;
        let cmd: CreateOrder = serde_json::from_str(body).unwrap();
        assert_eq!(cmd.delivery_fee, Some(Money::ZERO));

        let patch: OrderPatch =
            serde_json::from_str(r#"{"subtotal": null, "taxa_entrega": null}"#).unwrap();
        assert_eq!(patch.subtotal, Some(Money::ZERO));
        assert_eq!(patch.delivery_fee, Some(Money::ZERO));
        assert!(!patch.is_empty());

        let patch: OrderPatch = serde_json::from_str(r#"{"estado": "entregue"}"#).unwrap();
        assert_eq!(patch.delivery_fee, None);
    }

    #[test]
    fn test_out_of_range_amount_is_rejected() {
        let err = serde_json::from_str::<OrderPatch>(r#"{"subtotal": 1e17}"#).unwrap_err();
        assert!(err.to_string().contains("Amount out of range"));
    }
}
