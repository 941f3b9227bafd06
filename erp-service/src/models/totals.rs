//! Overflow-checked money arithmetic for derived fields.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TotalsError {
    #[error("{0} is out of range")]
    Overflow(&'static str),
}

pub(crate) fn add(a: Decimal, b: Decimal, field: &'static str) -> Result<Decimal, TotalsError> {
    a.checked_add(b).ok_or(TotalsError::Overflow(field))
}

pub(crate) fn sub(a: Decimal, b: Decimal, field: &'static str) -> Result<Decimal, TotalsError> {
    a.checked_sub(b).ok_or(TotalsError::Overflow(field))
}

pub(crate) fn mul(a: Decimal, b: Decimal, field: &'static str) -> Result<Decimal, TotalsError> {
    a.checked_mul(b).ok_or(TotalsError::Overflow(field))
}

pub(crate) fn div(a: Decimal, b: Decimal, field: &'static str) -> Result<Decimal, TotalsError> {
    a.checked_div(b).ok_or(TotalsError::Overflow(field))
}

/// Sum of `values`; an empty sequence is zero.
pub(crate) fn sum<I>(values: I, field: &'static str) -> Result<Decimal, TotalsError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| add(acc, value, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sums_plain_values() {
        assert_eq!(sum([dec!(1.5), dec!(2.5)], "total").unwrap(), dec!(4));
        assert_eq!(sum(Vec::<Decimal>::new(), "total").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn overflow_names_the_field() {
        let err = sum([Decimal::MAX, dec!(1)], "total_amount").unwrap_err();
        assert_eq!(err, TotalsError::Overflow("total_amount"));
        assert_eq!(err.to_string(), "total_amount is out of range");

        assert!(mul(Decimal::MAX, dec!(2), "amount").is_err());
        assert!(sub(Decimal::MIN, dec!(1), "net_weight").is_err());
    }
}
