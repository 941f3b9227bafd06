//! Services module for erp-service.

pub mod database;
pub mod finalize;
pub mod metrics;
pub mod sequence;

pub use database::ErpDb;
pub use finalize::finalize;
pub use metrics::{get_metrics, init_metrics};
pub use sequence::{SequenceSource, SequenceStrategy};
