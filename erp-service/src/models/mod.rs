//! Domain models for erp-service.

mod document_number;
mod payroll;
mod purchase_invoice;
mod sales_invoice;
mod totals;
pub mod validation;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

pub use document_number::{DocumentKind, DocumentNumber, DocumentNumberError, SEQUENCE_WIDTH};
pub use payroll::{
    PayComponent, PaymentDetails, Payroll, PayrollItem, PayrollItemStatus, PayrollStatus,
};
pub use purchase_invoice::{
    default_cutting_rate, PurchaseInvoice, PurchaseInvoiceItem, PurchaseInvoiceStatus,
};
pub use sales_invoice::{
    CustomerSnapshot, LineDiscountMode, PaymentStatus, SalesInvoice, SalesInvoiceItem,
    SalesInvoiceStatus,
};
pub use totals::TotalsError;

/// Switches applied when aggregate fields are recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalsPolicy {
    pub sales_line_discount: LineDiscountMode,
}

/// A business document that is numbered once and re-totalled on every save.
///
/// Line items are the source of truth; aggregate fields are only ever written
/// by `recalculate_totals`.
pub trait ErpDocument {
    const KIND: DocumentKind;

    /// Assigned number, if any. An empty string counts as unassigned.
    fn document_number(&self) -> Option<&str>;

    fn assign_document_number(&mut self, number: &DocumentNumber);

    /// Drop a number that was issued for a write that did not happen.
    fn clear_document_number(&mut self);

    /// Recompute every aggregate field. On error no field is changed.
    fn recalculate_totals(&mut self, policy: &TotalsPolicy) -> Result<(), TotalsError>;

    fn id(&self) -> Option<ObjectId>;

    fn set_id(&mut self, id: ObjectId);

    /// Record a save at `now`. Unsaved documents also take it as their creation time.
    fn touch(&mut self, now: DateTime<Utc>);
}

/// `Option<DateTime<Utc>>` stored as a BSON datetime.
pub(crate) mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => bson::DateTime::from_chrono(*dt).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}

fn non_empty(number: &Option<String>) -> Option<&str> {
    number.as_deref().filter(|n| !n.is_empty())
}
