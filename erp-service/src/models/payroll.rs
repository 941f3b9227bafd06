//! Monthly payroll model.

use super::totals::{self, TotalsError};
use super::validation::non_negative;
use super::{non_empty, DocumentKind, DocumentNumber, ErpDocument, TotalsPolicy};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayrollStatus {
    #[default]
    Draft,
    Processing,
    Approved,
    Completed,
}

impl PayrollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayrollStatus::Draft => "draft",
            PayrollStatus::Processing => "processing",
            PayrollStatus::Approved => "approved",
            PayrollStatus::Completed => "completed",
        }
    }

    pub fn can_transition_to(&self, next: PayrollStatus) -> bool {
        use PayrollStatus::*;
        matches!(
            (self, next),
            (Draft, Processing) | (Processing, Approved) | (Approved, Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayrollItemStatus {
    #[default]
    Pending,
    Approved,
    Paid,
}

impl PayrollItemStatus {
    pub fn can_transition_to(&self, next: PayrollItemStatus) -> bool {
        use PayrollItemStatus::*;
        matches!((self, next), (Pending, Approved) | (Approved, Paid))
    }
}

/// A named earning or deduction on a payslip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PayComponent {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(custom(function = "non_negative"))]
    pub amount: Decimal,
}

impl PayComponent {
    pub fn new(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub paid_utc: Option<DateTime<Utc>>,
}

/// One employee's pay for the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PayrollItem {
    pub employee_id: ObjectId,
    #[validate(custom(function = "non_negative"))]
    pub basic_salary: Decimal,
    #[serde(default)]
    #[validate(nested)]
    pub earnings: Vec<PayComponent>,
    #[serde(default)]
    #[validate(nested)]
    pub deductions: Vec<PayComponent>,
    #[validate(custom(function = "non_negative"))]
    pub gross_salary: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub net_salary: Decimal,
    #[serde(default)]
    pub status: PayrollItemStatus,
    #[serde(default)]
    pub payment: PaymentDetails,
}

impl PayrollItem {
    /// Build an item with `gross = basic + earnings` and `net = gross - deductions`.
    pub fn new(
        employee_id: ObjectId,
        basic_salary: Decimal,
        earnings: Vec<PayComponent>,
        deductions: Vec<PayComponent>,
    ) -> Result<Self, TotalsError> {
        let earned = totals::sum(earnings.iter().map(|e| e.amount), "gross_salary")?;
        let gross_salary = totals::add(basic_salary, earned, "gross_salary")?;
        let deducted = totals::sum(deductions.iter().map(|d| d.amount), "net_salary")?;
        let net_salary = totals::sub(gross_salary, deducted, "net_salary")?;
        Ok(Self {
            employee_id,
            basic_salary,
            earnings,
            deductions,
            gross_salary,
            net_salary,
            status: PayrollItemStatus::Pending,
            payment: PaymentDetails::default(),
        })
    }

    pub fn total_deductions(&self) -> Result<Decimal, TotalsError> {
        totals::sum(self.deductions.iter().map(|d| d.amount), "total_deductions")
    }
}

fn validate_period(payroll: &Payroll) -> Result<(), ValidationError> {
    if payroll.period_end < payroll.period_start {
        return Err(ValidationError::new("period_end_before_start"));
    }
    Ok(())
}

/// Payroll run for one month.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_period"))]
pub struct Payroll {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payroll_id: Option<String>,
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
    pub year: i32,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub period_start: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub period_end: DateTime<Utc>,
    #[validate(nested)]
    pub items: Vec<PayrollItem>,
    #[serde(default)]
    pub total_basic_salary: Decimal,
    #[serde(default)]
    pub total_gross_salary: Decimal,
    #[serde(default)]
    pub total_deductions: Decimal,
    #[serde(default)]
    pub total_net_salary: Decimal,
    #[serde(default)]
    pub status: PayrollStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl Payroll {
    pub fn new(
        month: u32,
        year: i32,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        items: Vec<PayrollItem>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            payroll_id: None,
            month,
            year,
            period_start,
            period_end,
            items,
            total_basic_salary: Decimal::ZERO,
            total_gross_salary: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            total_net_salary: Decimal::ZERO,
            status: PayrollStatus::Draft,
            approved_by: None,
            notes: None,
            created_utc: now,
            updated_utc: now,
        }
    }
}

impl ErpDocument for Payroll {
    const KIND: DocumentKind = DocumentKind::Payroll;

    fn document_number(&self) -> Option<&str> {
        non_empty(&self.payroll_id)
    }

    fn assign_document_number(&mut self, number: &DocumentNumber) {
        self.payroll_id = Some(number.to_string());
    }

    fn clear_document_number(&mut self) {
        self.payroll_id = None;
    }

    /// Item gross and net salaries are trusted as stored.
    fn recalculate_totals(&mut self, _policy: &TotalsPolicy) -> Result<(), TotalsError> {
        let total_basic_salary =
            totals::sum(self.items.iter().map(|item| item.basic_salary), "total_basic_salary")?;
        let total_gross_salary =
            totals::sum(self.items.iter().map(|item| item.gross_salary), "total_gross_salary")?;
        let per_item_deductions = self
            .items
            .iter()
            .map(PayrollItem::total_deductions)
            .collect::<Result<Vec<_>, _>>()?;
        let total_deductions = totals::sum(per_item_deductions, "total_deductions")?;
        let total_net_salary =
            totals::sum(self.items.iter().map(|item| item.net_salary), "total_net_salary")?;

        self.total_basic_salary = total_basic_salary;
        self.total_gross_salary = total_gross_salary;
        self.total_deductions = total_deductions;
        self.total_net_salary = total_net_salary;
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
