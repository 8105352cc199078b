//! The invoice data model: what the vision model is asked to return.
//!
//! ## Why `Option<Value>` fields instead of typed numbers?
//!
//! The model's JSON is best-effort. `grand_total` may arrive as `1234.56`,
//! `"1,234.56"`, or be missing entirely; a phone number may be a string or a
//! bare integer. Typing these fields as `f64`/`String` would reject records a
//! human would happily accept. Every leaf is therefore an
//! `Option<serde_json::Value>` and construction goes through
//! [`Invoice::from_value`], which looks each key up with fall-back-to-`None`
//! semantics. Only top-level JSON syntax errors can fail a document; missing,
//! extra, or oddly-typed keys never do.

use serde_json::Value;

/// Product-name labels that identify shipping/packaging charge lines.
///
/// When the model lists these inside `items` they duplicate the dedicated
/// `shipping_handling_charges` sub-record and are excluded from item-level
/// flattening. Matching is exact, against the raw (un-normalised) name.
pub const RESERVED_ITEM_LABELS: [&str; 2] = [
    "Shipping And Handling Charges",
    "Shipping And Packaging Charges",
];

/// One extracted invoice: top-level scalars plus nested sub-records.
///
/// Constructed fresh per document via [`Invoice::from_value`]; never
/// persisted between documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invoice {
    pub seller_name: Option<Value>,
    pub seller_gstin: Option<Value>,
    pub invoice_number: Option<Value>,
    pub order_id: Option<Value>,
    pub order_date: Option<Value>,
    pub invoice_date: Option<Value>,
    pub pan: Option<Value>,
    pub grand_total: Option<Value>,
    pub selling_website: Option<Value>,
    pub bill_to_address: Option<Address>,
    pub ship_to_address: Option<Address>,
    pub shipping_handling_charges: Option<ChargeBreakdown>,
    pub items: Vec<LineItem>,
}

/// A billing or shipping address block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub name: Option<Value>,
    pub full_address: Option<Value>,
    pub phone: Option<Value>,
}

/// The eight-field charge breakdown shared by the shipping sub-record and
/// every line item: quantity, amounts, and the three GST tax components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChargeBreakdown {
    pub qty: Option<Value>,
    pub gross_amount: Option<Value>,
    pub discounts_coupons: Option<Value>,
    pub taxable_value: Option<Value>,
    pub sgst_utgst_amount: Option<Value>,
    pub cgst_amount: Option<Value>,
    pub igst_amount: Option<Value>,
    pub total_amount: Option<Value>,
}

/// One line item: product identity plus its charge breakdown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItem {
    pub product_name: Option<Value>,
    /// Flipkart Serial Number.
    pub fsn: Option<Value>,
    /// HSN (goods) or SAC (services) tax classification code.
    pub hsn_sac: Option<Value>,
    pub qty: Option<Value>,
    pub gross_amount: Option<Value>,
    pub discounts_coupons: Option<Value>,
    pub taxable_value: Option<Value>,
    pub sgst_utgst_amount: Option<Value>,
    pub cgst_amount: Option<Value>,
    pub igst_amount: Option<Value>,
    /// Read from the JSON key `total_item_amount`.
    pub total_amount: Option<Value>,
}

/// Fetch `key` from a JSON object, mapping both "absent" and "null" to `None`.
fn field(value: &Value, key: &str) -> Option<Value> {
    match value.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.clone()),
    }
}

impl Invoice {
    /// Build an invoice from an already-parsed JSON value.
    ///
    /// Tolerant by construction: every lookup defaults to `None`, unknown
    /// keys are ignored, and a non-array `items` is treated as empty.
    pub fn from_value(value: &Value) -> Self {
        Self {
            seller_name: field(value, "seller_name"),
            seller_gstin: field(value, "seller_gstin"),
            invoice_number: field(value, "invoice_number"),
            order_id: field(value, "order_id"),
            order_date: field(value, "order_date"),
            invoice_date: field(value, "invoice_date"),
            pan: field(value, "pan"),
            grand_total: field(value, "grand_total"),
            selling_website: field(value, "selling_website"),
            bill_to_address: sub_record(value, "bill_to_address").map(Address::from_value),
            ship_to_address: sub_record(value, "ship_to_address").map(Address::from_value),
            shipping_handling_charges: sub_record(value, "shipping_handling_charges")
                .map(ChargeBreakdown::from_value),
            items: value
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(LineItem::from_value).collect())
                .unwrap_or_default(),
        }
    }
}

/// Fetch a nested sub-record, treating null the same as absent.
fn sub_record<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

impl Address {
    pub fn from_value(value: &Value) -> Self {
        Self {
            name: field(value, "name"),
            full_address: field(value, "full_address"),
            phone: field(value, "phone"),
        }
    }
}

impl ChargeBreakdown {
    pub fn from_value(value: &Value) -> Self {
        Self {
            qty: field(value, "qty"),
            gross_amount: field(value, "gross_amount"),
            discounts_coupons: field(value, "discounts_coupons"),
            taxable_value: field(value, "taxable_value"),
            sgst_utgst_amount: field(value, "sgst_utgst_amount"),
            cgst_amount: field(value, "cgst_amount"),
            igst_amount: field(value, "igst_amount"),
            total_amount: field(value, "total_amount"),
        }
    }
}

impl LineItem {
    pub fn from_value(value: &Value) -> Self {
        Self {
            product_name: field(value, "product_name"),
            fsn: field(value, "fsn"),
            hsn_sac: field(value, "hsn_sac"),
            qty: field(value, "qty"),
            gross_amount: field(value, "gross_amount"),
            discounts_coupons: field(value, "discounts_coupons"),
            taxable_value: field(value, "taxable_value"),
            sgst_utgst_amount: field(value, "sgst_utgst_amount"),
            cgst_amount: field(value, "cgst_amount"),
            igst_amount: field(value, "igst_amount"),
            total_amount: field(value, "total_item_amount"),
        }
    }

    /// True when this item is one of the reserved shipping/packaging labels
    /// and must not be flattened as a sellable product.
    pub fn is_reserved_charge(&self) -> bool {
        matches!(
            self.product_name.as_ref().and_then(Value::as_str),
            Some(name) if RESERVED_ITEM_LABELS.contains(&name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_tolerates_empty_object() {
        let inv = Invoice::from_value(&json!({}));
        assert!(inv.seller_name.is_none());
        assert!(inv.bill_to_address.is_none());
        assert!(inv.items.is_empty());
    }

    #[test]
    fn from_value_maps_null_to_none() {
        let inv = Invoice::from_value(&json!({
            "seller_name": null,
            "bill_to_address": null,
            "items": null,
        }));
        assert!(inv.seller_name.is_none());
        assert!(inv.bill_to_address.is_none());
        assert!(inv.items.is_empty());
    }

    #[test]
    fn from_value_keeps_mixed_scalar_types() {
        let inv = Invoice::from_value(&json!({
            "seller_name": "Acme Retail",
            "grand_total": 1234.56,
            "invoice_number": 99,
        }));
        assert_eq!(inv.seller_name, Some(json!("Acme Retail")));
        assert_eq!(inv.grand_total, Some(json!(1234.56)));
        assert_eq!(inv.invoice_number, Some(json!(99)));
    }

    #[test]
    fn from_value_ignores_unknown_keys() {
        let inv = Invoice::from_value(&json!({
            "seller_name": "Acme",
            "confidence": 0.93,
            "notes": ["extra", "stuff"],
        }));
        assert_eq!(inv.seller_name, Some(json!("Acme")));
    }

    #[test]
    fn non_array_items_treated_as_empty() {
        let inv = Invoice::from_value(&json!({"items": "none"}));
        assert!(inv.items.is_empty());
    }

    #[test]
    fn item_total_read_from_total_item_amount() {
        let item = LineItem::from_value(&json!({
            "product_name": "Widget",
            "total_item_amount": 499,
            "total_amount": 999,
        }));
        assert_eq!(item.total_amount, Some(json!(499)));
    }

    #[test]
    fn reserved_labels_detected_exactly() {
        let shipping = LineItem::from_value(&json!({
            "product_name": "Shipping And Handling Charges"
        }));
        assert!(shipping.is_reserved_charge());

        let packaging = LineItem::from_value(&json!({
            "product_name": "Shipping And Packaging Charges"
        }));
        assert!(packaging.is_reserved_charge());

        // Case and whitespace differences do not match.
        let similar = LineItem::from_value(&json!({
            "product_name": "shipping and handling charges"
        }));
        assert!(!similar.is_reserved_charge());

        let missing = LineItem::from_value(&json!({}));
        assert!(!missing.is_reserved_charge());
    }
}
