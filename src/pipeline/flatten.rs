//! Flattening: expand one invoice into CSV-ready rows, one per line item.
//!
//! The business rules live here and nowhere else:
//!
//! - Invoice-level fields (scalars, both addresses, the shipping breakdown)
//!   form a base mapping shared verbatim by every row of the invoice.
//! - Address names/full addresses and product names are whitespace-normalised
//!   (any run of whitespace, including newlines, collapses to one space);
//!   phones and all amounts pass through untouched.
//! - Items whose product name is one of the reserved shipping/packaging
//!   labels are dropped — those charges are already captured by the
//!   dedicated `shipping_*` columns.
//! - An invoice with no remaining items still emits one base-only row, so
//!   shipping-only invoices appear in the export.
//!
//! Row count is always `max(1, non-excluded items)` and row order mirrors
//! item order in the source record.

use crate::invoice::{Invoice, LineItem};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// One CSV-ready row: column name → JSON value (`Null` renders as an empty
/// cell). `BTreeMap` keeps per-row key order deterministic.
pub type Row = BTreeMap<String, Value>;

static WS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse any run of whitespace (including newlines) to a single space and
/// trim the ends. Idempotent.
pub fn normalize_whitespace(text: &str) -> String {
    WS_RUN.replace_all(text, " ").trim().to_string()
}

/// Normalise an optional JSON value into a whitespace-clean string value.
///
/// Absent input stays null. Non-string scalars are stringified first, so a
/// numeric name survives as text rather than failing.
fn normalized(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(s)) => Value::String(normalize_whitespace(s)),
        Some(other) => Value::String(normalize_whitespace(&other.to_string())),
    }
}

/// Pass a value through unmodified, mapping absence to null.
fn passthrough(value: Option<&Value>) -> Value {
    value.cloned().unwrap_or(Value::Null)
}

/// Expand one invoice into flat rows.
///
/// Every base column is present in every row — absent fields map to null,
/// not to a missing key — so the final CSV header is stable regardless of
/// which fields a particular model response filled in. Each returned row is
/// an independent copy; mutating one never affects its siblings.
pub fn flatten_invoice(invoice: &Invoice) -> Vec<Row> {
    let mut base = Row::new();

    base.insert("seller_name".into(), passthrough(invoice.seller_name.as_ref()));
    base.insert("seller_gstin".into(), passthrough(invoice.seller_gstin.as_ref()));
    base.insert("invoice_number".into(), passthrough(invoice.invoice_number.as_ref()));
    base.insert("order_id".into(), passthrough(invoice.order_id.as_ref()));
    base.insert("order_date".into(), passthrough(invoice.order_date.as_ref()));
    base.insert("invoice_date".into(), passthrough(invoice.invoice_date.as_ref()));
    base.insert("pan".into(), passthrough(invoice.pan.as_ref()));
    base.insert("grand_total".into(), passthrough(invoice.grand_total.as_ref()));
    base.insert("selling_website".into(), passthrough(invoice.selling_website.as_ref()));

    let bill = invoice.bill_to_address.as_ref();
    base.insert("bill_to_name".into(), normalized(bill.and_then(|a| a.name.as_ref())));
    base.insert(
        "bill_to_full_address".into(),
        normalized(bill.and_then(|a| a.full_address.as_ref())),
    );
    base.insert("bill_to_phone".into(), passthrough(bill.and_then(|a| a.phone.as_ref())));

    let ship = invoice.ship_to_address.as_ref();
    base.insert("ship_to_name".into(), normalized(ship.and_then(|a| a.name.as_ref())));
    base.insert(
        "ship_to_full_address".into(),
        normalized(ship.and_then(|a| a.full_address.as_ref())),
    );
    base.insert("ship_to_phone".into(), passthrough(ship.and_then(|a| a.phone.as_ref())));

    let shipping = invoice.shipping_handling_charges.as_ref();
    base.insert("shipping_qty".into(), passthrough(shipping.and_then(|c| c.qty.as_ref())));
    base.insert(
        "shipping_gross_amount".into(),
        passthrough(shipping.and_then(|c| c.gross_amount.as_ref())),
    );
    base.insert(
        "shipping_discounts_coupons".into(),
        passthrough(shipping.and_then(|c| c.discounts_coupons.as_ref())),
    );
    base.insert(
        "shipping_taxable_value".into(),
        passthrough(shipping.and_then(|c| c.taxable_value.as_ref())),
    );
    base.insert(
        "shipping_sgst_utgst_amount".into(),
        passthrough(shipping.and_then(|c| c.sgst_utgst_amount.as_ref())),
    );
    base.insert(
        "shipping_cgst_amount".into(),
        passthrough(shipping.and_then(|c| c.cgst_amount.as_ref())),
    );
    base.insert(
        "shipping_igst_amount".into(),
        passthrough(shipping.and_then(|c| c.igst_amount.as_ref())),
    );
    base.insert(
        "shipping_total_amount".into(),
        passthrough(shipping.and_then(|c| c.total_amount.as_ref())),
    );

    let product_items: Vec<&LineItem> = invoice
        .items
        .iter()
        .filter(|item| !item.is_reserved_charge())
        .collect();

    if product_items.is_empty() {
        // Shipping-only invoices still produce one row of invoice-level data.
        return vec![base];
    }

    product_items
        .into_iter()
        .map(|item| {
            let mut row = base.clone();
            row.insert("item_product_name".into(), normalized(item.product_name.as_ref()));
            row.insert("item_fsn".into(), passthrough(item.fsn.as_ref()));
            row.insert("item_hsn_sac".into(), passthrough(item.hsn_sac.as_ref()));
            row.insert("item_qty".into(), passthrough(item.qty.as_ref()));
            row.insert("item_gross_amount".into(), passthrough(item.gross_amount.as_ref()));
            row.insert(
                "item_discounts_coupons".into(),
                passthrough(item.discounts_coupons.as_ref()),
            );
            row.insert("item_taxable_value".into(), passthrough(item.taxable_value.as_ref()));
            row.insert(
                "item_sgst_utgst_amount".into(),
                passthrough(item.sgst_utgst_amount.as_ref()),
            );
            row.insert("item_cgst_amount".into(), passthrough(item.cgst_amount.as_ref()));
            row.insert("item_igst_amount".into(), passthrough(item.igst_amount.as_ref()));
            row.insert("item_total_amount".into(), passthrough(item.total_amount.as_ref()));
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice(value: serde_json::Value) -> Invoice {
        Invoice::from_value(&value)
    }

    #[test]
    fn normalize_collapses_runs_and_trims() {
        assert_eq!(normalize_whitespace("  Acme\n Retail\t Ltd  "), "Acme Retail Ltd");
        assert_eq!(normalize_whitespace("plain"), "plain");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_whitespace("a \n b\t\tc");
        assert_eq!(normalize_whitespace(&once), once);
    }

    #[test]
    fn normalized_absent_is_null() {
        assert_eq!(normalized(None), Value::Null);
        assert_eq!(normalized(Some(&Value::Null)), Value::Null);
    }

    #[test]
    fn normalized_stringifies_non_strings() {
        assert_eq!(normalized(Some(&json!(42))), json!("42"));
    }

    #[test]
    fn single_item_invoice_yields_one_row() {
        let rows = flatten_invoice(&invoice(json!({
            "seller_name": "Acme",
            "items": [{"product_name": "Widget", "qty": 2}],
        })));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["seller_name"], json!("Acme"));
        assert_eq!(rows[0]["item_product_name"], json!("Widget"));
        assert_eq!(rows[0]["item_qty"], json!(2));
    }

    #[test]
    fn itemless_invoice_yields_one_base_row() {
        let rows = flatten_invoice(&invoice(json!({"seller_name": "Acme"})));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["seller_name"], json!("Acme"));
        assert!(!rows[0].contains_key("item_product_name"));
        // Absent base fields are present as null, not missing.
        assert_eq!(rows[0]["grand_total"], Value::Null);
        assert_eq!(rows[0]["shipping_qty"], Value::Null);
    }

    #[test]
    fn reserved_labels_are_excluded() {
        let rows = flatten_invoice(&invoice(json!({
            "seller_name": "Acme",
            "items": [
                {"product_name": "Shipping And Handling Charges", "qty": 1},
                {"product_name": "Shipping And Packaging Charges", "qty": 1},
            ],
        })));
        // Both items excluded, so exactly one base-only row remains.
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].contains_key("item_product_name"));
    }

    #[test]
    fn reserved_label_among_products_is_skipped() {
        let rows = flatten_invoice(&invoice(json!({
            "items": [
                {"product_name": "Widget"},
                {"product_name": "Shipping And Handling Charges"},
                {"product_name": "Gadget"},
            ],
        })));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["item_product_name"], json!("Widget"));
        assert_eq!(rows[1]["item_product_name"], json!("Gadget"));
    }

    #[test]
    fn rows_share_invoice_level_columns() {
        let rows = flatten_invoice(&invoice(json!({
            "seller_name": "Acme",
            "grand_total": 700,
            "shipping_handling_charges": {"qty": 1, "total_amount": 40},
            "items": [
                {"product_name": "A", "total_item_amount": 300},
                {"product_name": "B", "total_item_amount": 360},
            ],
        })));
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row["seller_name"], json!("Acme"));
            assert_eq!(row["grand_total"], json!(700));
            assert_eq!(row["shipping_total_amount"], json!(40));
        }
        assert_eq!(rows[0]["item_total_amount"], json!(300));
        assert_eq!(rows[1]["item_total_amount"], json!(360));
    }

    #[test]
    fn rows_are_independent_copies() {
        let rows = flatten_invoice(&invoice(json!({
            "seller_name": "Acme",
            "items": [{"product_name": "A"}, {"product_name": "B"}],
        })));
        let mut rows = rows;
        rows[0].insert("item_qty".into(), json!(99));
        assert_eq!(rows[1]["item_qty"], Value::Null);
        assert_eq!(rows[1]["seller_name"], json!("Acme"));
    }

    #[test]
    fn address_fields_normalized_phone_passthrough() {
        let rows = flatten_invoice(&invoice(json!({
            "bill_to_address": {
                "name": " Jane \n Doe ",
                "full_address": "12  Main Rd\nPune\t411001",
                "phone": " 98765 43210 ",
            },
        })));
        assert_eq!(rows[0]["bill_to_name"], json!("Jane Doe"));
        assert_eq!(rows[0]["bill_to_full_address"], json!("12 Main Rd Pune 411001"));
        // Phone is untouched, surrounding whitespace and all.
        assert_eq!(rows[0]["bill_to_phone"], json!(" 98765 43210 "));
    }

    #[test]
    fn product_name_normalized() {
        let rows = flatten_invoice(&invoice(json!({
            "items": [{"product_name": "Cotton\n  Bath Towel "}],
        })));
        assert_eq!(rows[0]["item_product_name"], json!("Cotton Bath Towel"));
    }

    #[test]
    fn row_count_matches_non_excluded_items() {
        let items: Vec<_> = (0..5).map(|i| json!({"product_name": format!("P{i}")})).collect();
        let rows = flatten_invoice(&invoice(json!({"items": items})));
        assert_eq!(rows.len(), 5);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row["item_product_name"], json!(format!("P{i}")));
        }
    }

    #[test]
    fn regrouping_rows_recovers_item_count_and_shared_fields() {
        let source = json!({
            "invoice_number": "INV-7",
            "seller_name": "Acme",
            "items": [
                {"product_name": "A"},
                {"product_name": "B"},
                {"product_name": "C"},
            ],
        });
        let rows = flatten_invoice(&invoice(source));

        let grouped: Vec<&Row> = rows
            .iter()
            .filter(|r| r["invoice_number"] == json!("INV-7"))
            .collect();
        assert_eq!(grouped.len(), 3);
        assert!(grouped.iter().all(|r| r["seller_name"] == json!("Acme")));
    }
}
