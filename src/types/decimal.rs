use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

use crate::error::{ArgumentError, Result};

/// decimal - Exact-precision real numbers.
///
/// The identity of a decimal is the triple (sign, coefficient digits,
/// exponent); the value is `(-1)^sign * coefficient * 10^exponent`. Two
/// decimals with the same numeric value but different coefficient/exponent
/// pairs are distinct (`0d0 != 0d-1`), and negative zero is representable,
/// which is why the sign is carried separately from the (unsigned)
/// coefficient.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    coefficient: BigUint,
    exponent: i32,
}

impl Decimal {
    pub fn new(coefficient: BigInt, exponent: i32) -> Self {
        let (sign, magnitude) = coefficient.to_bytes_be();
        Decimal {
            negative: sign == Sign::Minus,
            coefficient: BigUint::from_bytes_be(&magnitude),
            exponent,
        }
    }

    pub fn from_sign_magnitude(negative: bool, coefficient: BigUint, exponent: i32) -> Self {
        Decimal {
            negative,
            coefficient,
            exponent,
        }
    }

    pub fn negative_zero(exponent: i32) -> Self {
        Decimal {
            negative: true,
            coefficient: BigUint::zero(),
            exponent,
        }
    }

    /// Converts a finite double to its exact decimal expansion.
    ///
    /// Every finite IEEE-754 double is `m * 2^e` for integers m, e, and
    /// `2^-k = 5^k * 10^-k`, so the expansion is always finite. NaN and the
    /// infinities are not in the decimal value space.
    pub fn try_from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(ArgumentError::NonFiniteDecimal.into());
        }
        let negative = value.is_sign_negative();
        let bits = value.abs().to_bits();
        let raw_exponent = (bits >> 52) & 0x7ff;
        let raw_mantissa = bits & ((1u64 << 52) - 1);
        if raw_exponent == 0 && raw_mantissa == 0 {
            return Ok(Decimal {
                negative,
                coefficient: BigUint::zero(),
                exponent: 0,
            });
        }
        let (mut mantissa, mut exponent2) = if raw_exponent == 0 {
            (raw_mantissa, -1074i32)
        } else {
            (raw_mantissa | (1u64 << 52), raw_exponent as i32 - 1075)
        };
        while mantissa & 1 == 0 && exponent2 < 0 {
            mantissa >>= 1;
            exponent2 += 1;
        }
        if exponent2 >= 0 {
            Ok(Decimal {
                negative,
                coefficient: BigUint::from(mantissa) << exponent2 as usize,
                exponent: 0,
            })
        } else {
            let scale = (-exponent2) as usize;
            Ok(Decimal {
                negative,
                coefficient: BigUint::from(mantissa) * num_traits::pow(BigUint::from(5u8), scale),
                exponent: -(scale as i32),
            })
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn coefficient(&self) -> &BigUint {
        &self.coefficient
    }

    /// The coefficient with the sign applied. Note that this loses the
    /// distinction between `0` and `-0`.
    pub fn signed_coefficient(&self) -> BigInt {
        let sign = if self.coefficient.is_zero() {
            Sign::NoSign
        } else if self.negative {
            Sign::Minus
        } else {
            Sign::Plus
        };
        BigInt::from_biguint(sign, self.coefficient.clone())
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.coefficient.is_zero()
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal::new(BigInt::from(value), 0)
    }
}

/// Canonical Ion text form. The coefficient digits are reproduced exactly;
/// the `d` exponent marker is elided only when a decimal point makes the
/// value unambiguously a decimal.
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.coefficient.to_str_radix(10);
        if self.negative {
            f.write_str("-")?;
        }
        if self.exponent > 0 {
            write!(f, "{}d{}", digits, self.exponent)
        } else if self.exponent == 0 {
            write!(f, "{}.", digits)
        } else {
            let point = (-self.exponent) as usize;
            if point < digits.len() {
                let (integer, fraction) = digits.split_at(digits.len() - point);
                write!(f, "{}.{}", integer, fraction)
            } else {
                write!(f, "0.{}{}", "0".repeat(point - digits.len()), digits)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn decimal(coefficient: i64, exponent: i32) -> Decimal {
        Decimal::new(BigInt::from(coefficient), exponent)
    }

    #[test]
    fn identity_is_exact() {
        assert_ne!(decimal(0, 0), decimal(0, -1));
        assert_ne!(decimal(1, -1), decimal(10, -2));
        assert_ne!(decimal(0, 0), Decimal::negative_zero(0));
        assert_eq!(decimal(100, -3), decimal(100, -3));
    }

    #[test]
    fn display_places_the_point() {
        assert_eq!(decimal(100, -3).to_string(), "0.100");
        assert_eq!(decimal(12345, -2).to_string(), "123.45");
        assert_eq!(decimal(5, -4).to_string(), "0.0005");
        assert_eq!(decimal(5, 0).to_string(), "5.");
        assert_eq!(decimal(5, 2).to_string(), "5d2");
        assert_eq!(decimal(0, -1).to_string(), "0.0");
        assert_eq!(Decimal::negative_zero(0).to_string(), "-0.");
        assert_eq!(decimal(-42, -1).to_string(), "-4.2");
    }

    #[test]
    fn from_f64_is_exact() {
        assert_eq!(Decimal::try_from_f64(0.5).unwrap(), decimal(5, -1));
        assert_eq!(Decimal::try_from_f64(3.0).unwrap(), decimal(3, 0));
        assert_eq!(Decimal::try_from_f64(-0.25).unwrap(), decimal(-25, -2));
        assert_eq!(
            Decimal::try_from_f64(-0.0).unwrap(),
            Decimal::negative_zero(0)
        );
    }

    #[test]
    fn from_f64_rejects_non_finite() {
        assert!(Decimal::try_from_f64(f64::NAN).is_err());
        assert!(Decimal::try_from_f64(f64::INFINITY).is_err());
        assert!(Decimal::try_from_f64(f64::NEG_INFINITY).is_err());
    }
}
