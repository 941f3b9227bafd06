//! erp-service: document numbering and totals for the cinnamon ERP.
//!
//! Purchase invoices, sales invoices and payrolls are finalized immediately
//! before every write: a number is issued on the first save and all aggregate
//! fields are recomputed from the line items.

pub mod config;
pub mod models;
pub mod services;
pub mod startup;
