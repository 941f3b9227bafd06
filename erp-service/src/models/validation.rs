//! Field validators shared by the document models.

use rust_decimal::Decimal;
use validator::ValidationError;

/// Weights, rates and amounts are never below zero.
pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("must be greater than or equal to 0".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn accepts_zero_and_positive() {
        assert!(non_negative(&dec!(0)).is_ok());
        assert!(non_negative(&dec!(12.5)).is_ok());
    }

    #[test]
    fn rejects_negative() {
        let err = non_negative(&dec!(-0.01)).unwrap_err();
        assert_eq!(err.code, "non_negative");
    }
}
