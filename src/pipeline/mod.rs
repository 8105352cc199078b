//! The per-document extraction pipeline.
//!
//! Each stage is a small module with a single entry point, run strictly in
//! sequence by [`crate::process`]:
//!
//! ```text
//! PDF
//!  │
//!  ├─ render    rasterise pages to JPEGs on disk (pdfium, spawn_blocking)
//!  ├─ extract   one vision-model call: instruction + all page images
//!  ├─ parse     strip markdown fences, decode JSON, build the Invoice
//!  └─ flatten   expand the invoice into CSV-ready rows, one per item
//! ```
//!
//! Every stage returns a [`crate::error::DocumentError`] on failure; none of
//! them can abort the run.

pub mod extract;
pub mod flatten;
pub mod parse;
pub mod render;
