//! Sales invoice model.

use super::totals::{self, TotalsError};
use super::validation::non_negative;
use super::{non_empty, DocumentKind, DocumentNumber, ErpDocument, TotalsPolicy};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// How per-line discounts enter the invoice subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineDiscountMode {
    /// Line discounts are recorded but not subtracted.
    #[default]
    Ignore,
    /// Each line contributes `sub_total - discount`.
    Apply,
}

impl LineDiscountMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineDiscountMode::Ignore => "ignore",
            LineDiscountMode::Apply => "apply",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "apply" => LineDiscountMode::Apply,
            _ => LineDiscountMode::Ignore,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesInvoiceStatus {
    #[default]
    Draft,
    Confirmed,
    Cancelled,
}

impl SalesInvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesInvoiceStatus::Draft => "draft",
            SalesInvoiceStatus::Confirmed => "confirmed",
            SalesInvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: SalesInvoiceStatus) -> bool {
        matches!(
            (self, next),
            (SalesInvoiceStatus::Draft, SalesInvoiceStatus::Confirmed)
                | (SalesInvoiceStatus::Draft, SalesInvoiceStatus::Cancelled)
        )
    }
}

/// Customer details copied onto the invoice at the time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CustomerSnapshot {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SalesInvoiceItem {
    pub product_id: ObjectId,
    #[validate(custom(function = "non_negative"))]
    pub quantity: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub unit_price: Decimal,
    #[serde(default)]
    #[validate(custom(function = "non_negative"))]
    pub discount: Decimal,
    pub sub_total: Decimal,
}

impl SalesInvoiceItem {
    /// Build a line with `sub_total = quantity * unit_price`.
    pub fn new(
        product_id: ObjectId,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Result<Self, TotalsError> {
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            sub_total: totals::mul(quantity, unit_price, "sub_total")?,
        })
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    /// Amount this line adds to the invoice subtotal.
    pub fn contribution(&self, mode: LineDiscountMode) -> Result<Decimal, TotalsError> {
        match mode {
            LineDiscountMode::Ignore => Ok(self.sub_total),
            LineDiscountMode::Apply => totals::sub(self.sub_total, self.discount, "sub_total"),
        }
    }
}

/// Sales invoice document.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SalesInvoice {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    #[validate(nested)]
    pub customer: CustomerSnapshot,
    #[validate(nested)]
    pub items: Vec<SalesInvoiceItem>,
    #[serde(default)]
    pub sub_total: Decimal,
    /// Flat amount taken off the subtotal.
    #[serde(default)]
    #[validate(custom(function = "non_negative"))]
    pub discount: Decimal,
    /// Percentage applied after the discount.
    #[serde(default)]
    #[validate(custom(function = "non_negative"))]
    pub tax: Decimal,
    #[serde(default)]
    pub total: Decimal,
    pub payment_method: String,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status: SalesInvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl SalesInvoice {
    pub fn new(
        date: DateTime<Utc>,
        customer: CustomerSnapshot,
        items: Vec<SalesInvoiceItem>,
        payment_method: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            invoice_number: None,
            date,
            customer,
            items,
            sub_total: Decimal::ZERO,
            discount: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            payment_method: payment_method.into(),
            payment_status: PaymentStatus::Pending,
            status: SalesInvoiceStatus::Draft,
            notes: None,
            created_utc: now,
            updated_utc: now,
        }
    }
}

impl ErpDocument for SalesInvoice {
    const KIND: DocumentKind = DocumentKind::SalesInvoice;

    fn document_number(&self) -> Option<&str> {
        non_empty(&self.invoice_number)
    }

    fn assign_document_number(&mut self, number: &DocumentNumber) {
        self.invoice_number = Some(number.to_string());
    }

    fn clear_document_number(&mut self) {
        self.invoice_number = None;
    }

    /// Discount comes off first; tax is a percentage of what remains.
    fn recalculate_totals(&mut self, policy: &TotalsPolicy) -> Result<(), TotalsError> {
        let contributions = self
            .items
            .iter()
            .map(|item| item.contribution(policy.sales_line_discount))
            .collect::<Result<Vec<_>, _>>()?;
        let sub_total = totals::sum(contributions, "sub_total")?;

        let mut total = sub_total;
        if !self.discount.is_zero() {
            total = totals::sub(total, self.discount, "total")?;
        }
        if !self.tax.is_zero() {
            let tax = totals::mul(total, self.tax, "total")?;
            let tax = totals::div(tax, Decimal::ONE_HUNDRED, "total")?;
            total = totals::add(total, tax, "total")?;
        }

        self.sub_total = sub_total;
        self.total = total;
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn customer() -> CustomerSnapshot {
        CustomerSnapshot {
            name: "Ceylon Spice Traders".to_string(),
            address: Some("12 Galle Road, Colombo".to_string()),
            phone: None,
            email: Some("orders@ceylonspice.example".to_string()),
        }
    }

    fn line(quantity: Decimal, unit_price: Decimal) -> SalesInvoiceItem {
        SalesInvoiceItem::new(ObjectId::new(), quantity, unit_price).unwrap()
    }

    fn invoice(items: Vec<SalesInvoiceItem>) -> SalesInvoice {
        SalesInvoice::new(Utc::now(), customer(), items, "cash")
    }

    #[test]
    fn line_sub_total_is_quantity_times_price() {
        assert_eq!(line(dec!(4), dec!(12.50)).sub_total, dec!(50));
    }

    #[test]
    fn tax_is_applied_after_discount() {
        let mut inv = invoice(vec![line(dec!(1), dec!(100))]);
        inv.discount = dec!(10);
        inv.tax = dec!(10);

        inv.recalculate_totals(&TotalsPolicy::default()).unwrap();

        assert_eq!(inv.sub_total, dec!(100));
        assert_eq!(inv.total, dec!(99));
    }

    #[test]
    fn discount_and_tax_scenario() {
        let mut inv = invoice(vec![line(dec!(2), dec!(60)), line(dec!(1), dec!(80))]);
        inv.discount = dec!(20);
        inv.tax = dec!(5);

        inv.recalculate_totals(&TotalsPolicy::default()).unwrap();

        assert_eq!(inv.sub_total, dec!(200));
        assert_eq!(inv.total, dec!(189));
    }

    #[test]
    fn no_discount_or_tax_leaves_subtotal() {
        let mut inv = invoice(vec![line(dec!(3), dec!(25))]);
        inv.recalculate_totals(&TotalsPolicy::default()).unwrap();
        assert_eq!(inv.total, dec!(75));
    }

    #[test]
    fn empty_invoice_totals_are_zero() {
        let mut inv = invoice(vec![]);
        inv.discount = dec!(0);
        inv.tax = dec!(8);
        inv.recalculate_totals(&TotalsPolicy::default()).unwrap();

        assert_eq!(inv.sub_total, Decimal::ZERO);
        assert_eq!(inv.total, Decimal::ZERO);
    }

    #[test]
    fn line_discount_ignored_by_default() {
        let mut inv = invoice(vec![line(dec!(1), dec!(100)).with_discount(dec!(15))]);
        inv.recalculate_totals(&TotalsPolicy::default()).unwrap();
        assert_eq!(inv.sub_total, dec!(100));
    }

    #[test]
    fn line_discount_applied_when_enabled() {
        let mut inv = invoice(vec![
            line(dec!(1), dec!(100)).with_discount(dec!(15)),
            line(dec!(2), dec!(10)),
        ]);
        inv.tax = dec!(10);
        let policy = TotalsPolicy {
            sales_line_discount: LineDiscountMode::Apply,
        };

        inv.recalculate_totals(&policy).unwrap();

        assert_eq!(inv.sub_total, dec!(105));
        assert_eq!(inv.total, dec!(115.5));
    }

    #[test]
    fn overflowing_tax_is_an_error() {
        let mut inv = invoice(vec![line(dec!(1), Decimal::MAX)]);
        inv.recalculate_totals(&TotalsPolicy::default()).unwrap();
        assert_eq!(inv.total, Decimal::MAX);

        inv.tax = dec!(50);
        assert!(inv.validate().is_ok());
        let err = inv.recalculate_totals(&TotalsPolicy::default()).unwrap_err();

        assert_eq!(err, TotalsError::Overflow("total"));
        assert_eq!(inv.total, Decimal::MAX);
    }

    #[test]
    fn line_discount_mode_parsing() {
        assert_eq!(LineDiscountMode::from_string("apply"), LineDiscountMode::Apply);
        assert_eq!(LineDiscountMode::from_string("ignore"), LineDiscountMode::Ignore);
        assert_eq!(LineDiscountMode::from_string(""), LineDiscountMode::Ignore);
    }

    #[test]
    fn validation_rejects_bad_input() {
        let mut inv = invoice(vec![line(dec!(1), dec!(10))]);
        assert!(inv.validate().is_ok());

        inv.customer.name.clear();
        assert!(inv.validate().is_err());

        let mut inv = invoice(vec![line(dec!(-1), dec!(10))]);
        assert!(inv.validate().is_err());
        inv.items.clear();
        inv.tax = dec!(-2);
        assert!(inv.validate().is_err());
    }

    #[test]
    fn status_transitions() {
        use SalesInvoiceStatus::*;
        assert!(Draft.can_transition_to(Confirmed));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
    }
}
