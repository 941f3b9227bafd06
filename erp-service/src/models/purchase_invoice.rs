//! Purchase invoice model: raw cinnamon bought from cutting contractors.

use super::totals::{self, TotalsError};
use super::validation::non_negative;
use super::{non_empty, DocumentKind, DocumentNumber, ErpDocument, TotalsPolicy};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Cutting rate per kg used when the invoice does not specify one.
pub fn default_cutting_rate() -> Decimal {
    Decimal::from(250)
}

/// Purchase invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseInvoiceStatus {
    #[default]
    Draft,
    Confirmed,
    Paid,
    Cancelled,
}

impl PurchaseInvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseInvoiceStatus::Draft => "draft",
            PurchaseInvoiceStatus::Confirmed => "confirmed",
            PurchaseInvoiceStatus::Paid => "paid",
            PurchaseInvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: PurchaseInvoiceStatus) -> bool {
        use PurchaseInvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Confirmed) | (Confirmed, Paid) | (Draft, Cancelled) | (Confirmed, Cancelled)
        )
    }
}

/// One graded lot of cinnamon weighed in from a contractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PurchaseInvoiceItem {
    pub grade_id: ObjectId,
    #[validate(custom(function = "non_negative"))]
    pub total_weight: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub deduct_weight1: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub deduct_weight2: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub net_weight: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub rate: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub amount: Decimal,
}

impl PurchaseInvoiceItem {
    /// Build a line with `net_weight` and `amount` derived from the weights and rate.
    pub fn new(
        grade_id: ObjectId,
        total_weight: Decimal,
        deduct_weight1: Decimal,
        deduct_weight2: Decimal,
        rate: Decimal,
    ) -> Result<Self, TotalsError> {
        let net_weight = totals::sub(total_weight, deduct_weight1, "net_weight")?;
        let net_weight = totals::sub(net_weight, deduct_weight2, "net_weight")?;
        Ok(Self {
            grade_id,
            total_weight,
            deduct_weight1,
            deduct_weight2,
            net_weight,
            rate,
            amount: totals::mul(net_weight, rate, "amount")?,
        })
    }
}

/// Purchase invoice document.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchaseInvoice {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    pub contractor_id: ObjectId,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    #[validate(nested)]
    pub items: Vec<PurchaseInvoiceItem>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default = "default_cutting_rate")]
    #[validate(custom(function = "non_negative"))]
    pub cutting_rate: Decimal,
    #[serde(default)]
    pub total_net_weight: Decimal,
    #[serde(default)]
    pub cutting_charges: Decimal,
    #[serde(default)]
    pub advance_payments: Vec<ObjectId>,
    #[serde(default)]
    #[validate(custom(function = "non_negative"))]
    pub total_advance: Decimal,
    #[serde(default)]
    pub final_amount: Decimal,
    #[serde(default)]
    pub status: PurchaseInvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl PurchaseInvoice {
    /// New draft invoice at the default cutting rate with no advances.
    pub fn new(contractor_id: ObjectId, date: DateTime<Utc>, items: Vec<PurchaseInvoiceItem>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            invoice_number: None,
            contractor_id,
            date,
            items,
            total_amount: Decimal::ZERO,
            cutting_rate: default_cutting_rate(),
            total_net_weight: Decimal::ZERO,
            cutting_charges: Decimal::ZERO,
            advance_payments: Vec::new(),
            total_advance: Decimal::ZERO,
            final_amount: Decimal::ZERO,
            status: PurchaseInvoiceStatus::Draft,
            notes: None,
            created_utc: now,
            updated_utc: now,
        }
    }
}

impl ErpDocument for PurchaseInvoice {
    const KIND: DocumentKind = DocumentKind::PurchaseInvoice;

    fn document_number(&self) -> Option<&str> {
        non_empty(&self.invoice_number)
    }

    fn assign_document_number(&mut self, number: &DocumentNumber) {
        self.invoice_number = Some(number.to_string());
    }

    fn clear_document_number(&mut self) {
        self.invoice_number = None;
    }

    /// Line `net_weight`/`amount` are taken as stored; only invoice totals are derived.
    /// The final amount is not clamped and goes negative when charges and
    /// advances exceed the purchase value.
    fn recalculate_totals(&mut self, _policy: &TotalsPolicy) -> Result<(), TotalsError> {
        let total_net_weight =
            totals::sum(self.items.iter().map(|item| item.net_weight), "total_net_weight")?;
        let total_amount = totals::sum(self.items.iter().map(|item| item.amount), "total_amount")?;
        let cutting_charges = totals::mul(total_net_weight, self.cutting_rate, "cutting_charges")?;
        let final_amount = totals::sub(total_amount, cutting_charges, "final_amount")?;
        let final_amount = totals::sub(final_amount, self.total_advance, "final_amount")?;

        self.total_net_weight = total_net_weight;
        self.total_amount = total_amount;
        self.cutting_charges = cutting_charges;
        self.final_amount = final_amount;
        Ok(())
    }

    fn id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if self.id.is_none() {
            self.created_utc = now;
        }
        self.updated_utc = now;
    }
}
