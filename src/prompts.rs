//! The default extraction instruction sent to the vision model.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the schema the model is asked to
//!    return requires editing exactly one place, next to the field names the
//!    flattener consumes.
//!
//! 2. **Testability** — unit tests can assert the prompt names every key the
//!    data model reads, catching schema drift without a live model call.
//!
//! Callers can override this via [`crate::config::ExtractionConfig::prompt`];
//! the constant here is used only when no override is provided.

/// Default instruction for extracting invoice fields as JSON.
///
/// All pages of one document are attached to the same request so the model
/// can pair line items on later pages with header fields from the first.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are an expert invoice-data extractor. The attached images are the pages of ONE retail invoice, in order. Extract the fields below and return them as a single JSON object.

Rules:

1. FIELDS
   - seller_name, seller_gstin, invoice_number, order_id, order_date,
     invoice_date, pan, grand_total, selling_website
   - bill_to_address and ship_to_address: objects with name, full_address, phone
   - shipping_handling_charges: object with qty, gross_amount,
     discounts_coupons, taxable_value, sgst_utgst_amount, cgst_amount,
     igst_amount, total_amount
   - items: array of objects, one per product line, each with product_name,
     fsn, hsn_sac, qty, gross_amount, discounts_coupons, taxable_value,
     sgst_utgst_amount, cgst_amount, igst_amount, total_item_amount

2. VALUES
   - Copy text exactly as printed; do not invent or infer values
   - Use JSON null for any field that is not present on the invoice
   - Amounts are numbers without currency symbols where possible
   - Line items may continue on later pages; include them all, in order

3. SHIPPING
   - Report shipping and packaging charges ONLY under
     shipping_handling_charges, never as an entry in items

4. OUTPUT FORMAT
   - Output ONLY the JSON object
   - Do NOT wrap the JSON in ```json fences
   - Do NOT add commentary or explanations"#;
