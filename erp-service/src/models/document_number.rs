//! Human-readable document numbers.
//!
//! A number is a three-letter prefix, the two-digit year and month it was
//! issued in, and a sequence zero-padded to at least four digits, e.g.
//! `PUR24060001`.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minimum width of the sequence segment.
pub const SEQUENCE_WIDTH: usize = 4;

/// Document types that receive generated numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Payroll,
    PurchaseInvoice,
    SalesInvoice,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Payroll,
        DocumentKind::PurchaseInvoice,
        DocumentKind::SalesInvoice,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Payroll => "PAY",
            DocumentKind::PurchaseInvoice => "PUR",
            DocumentKind::SalesInvoice => "SAL",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Payroll => "payroll",
            DocumentKind::PurchaseInvoice => "purchase_invoice",
            DocumentKind::SalesInvoice => "sales_invoice",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentNumberError {
    #[error("document number is too short")]
    TooShort,
    #[error("unknown document prefix '{0}'")]
    UnknownPrefix(String),
    #[error("document number must end in digits")]
    NotNumeric,
    #[error("month {0} is out of range")]
    InvalidMonth(u32),
}

/// A parsed or freshly issued document number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentNumber {
    pub kind: DocumentKind,
    /// Two-digit year, 0..=99.
    pub year: u32,
    pub month: u32,
    pub sequence: u64,
}

impl DocumentNumber {
    /// Number issued at `at` with the given sequence.
    pub fn new(kind: DocumentKind, at: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            kind,
            year: at.year().rem_euclid(100) as u32,
            month: at.month(),
            sequence,
        }
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:02}{:02}{:0width$}",
            self.kind.prefix(),
            self.year,
            self.month,
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

impl FromStr for DocumentNumber {
    type Err = DocumentNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() || s.len() < 3 + 2 + 2 + SEQUENCE_WIDTH {
            return Err(DocumentNumberError::TooShort);
        }

        let (prefix, digits) = s.split_at(3);
        let kind = DocumentKind::from_prefix(prefix)
            .ok_or_else(|| DocumentNumberError::UnknownPrefix(prefix.to_string()))?;

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DocumentNumberError::NotNumeric);
        }

        let parse = |part: &str| part.parse::<u64>().map_err(|_| DocumentNumberError::NotNumeric);
        let year = parse(&digits[..2])? as u32;
        let month = parse(&digits[2..4])? as u32;
        let sequence = parse(&digits[4..])?;

        if !(1..=12).contains(&month) {
            return Err(DocumentNumberError::InvalidMonth(month));
        }

        Ok(Self {
            kind,
            year,
            month,
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn june_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn formats_each_prefix() {
        let at = june_2024();
        assert_eq!(
            DocumentNumber::new(DocumentKind::Payroll, at, 1).to_string(),
            "PAY24060001"
        );
        assert_eq!(
            DocumentNumber::new(DocumentKind::PurchaseInvoice, at, 1).to_string(),
            "PUR24060001"
        );
        assert_eq!(
            DocumentNumber::new(DocumentKind::SalesInvoice, at, 1).to_string(),
            "SAL24060001"
        );
    }

    #[test]
    fn pads_month_and_sequence() {
        let at = Utc.with_ymd_and_hms(2031, 1, 2, 0, 0, 0).unwrap();
        let number = DocumentNumber::new(DocumentKind::SalesInvoice, at, 42);
        assert_eq!(number.to_string(), "SAL31010042");
    }

    #[test]
    fn sequence_grows_past_four_digits() {
        let number = DocumentNumber::new(DocumentKind::Payroll, june_2024(), 12345);
        assert_eq!(number.to_string(), "PAY240612345");
    }

    #[test]
    fn year_segment_uses_last_two_digits() {
        let at = Utc.with_ymd_and_hms(2100, 12, 31, 23, 59, 59).unwrap();
        let number = DocumentNumber::new(DocumentKind::PurchaseInvoice, at, 7);
        assert_eq!(number.to_string(), "PUR00120007");
    }

    #[test]
    fn parses_what_it_formats() {
        let number: DocumentNumber = "PUR24060093".parse().unwrap();
        assert_eq!(number.kind, DocumentKind::PurchaseInvoice);
        assert_eq!(number.year, 24);
        assert_eq!(number.month, 6);
        assert_eq!(number.sequence, 93);
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_eq!(
            "PUR2406001".parse::<DocumentNumber>(),
            Err(DocumentNumberError::TooShort)
        );
        assert_eq!(
            "INV24060001".parse::<DocumentNumber>(),
            Err(DocumentNumberError::UnknownPrefix("INV".to_string()))
        );
        assert_eq!(
            "SAL2406000A".parse::<DocumentNumber>(),
            Err(DocumentNumberError::NotNumeric)
        );
        assert_eq!(
            "PAY24130001".parse::<DocumentNumber>(),
            Err(DocumentNumberError::InvalidMonth(13))
        );
    }
}
