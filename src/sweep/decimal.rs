//! Exact decimal numbers for parameter ranges.
//!
//! A [`Decimal`] keeps the coefficient and base-10 exponent exactly as written,
//! so `0.1` and `0.10` compare equal but remember different precision. That
//! precision drives the fixed-width filename formatting in [`super::range`].
//!
//! Literals are limited to 18 significant digits and an exponent within ±18;
//! within those bounds all arithmetic used by range expansion fits in `i128`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MAX_DIGITS: usize = 18;
const MAX_EXPONENT: i64 = 18;

/// Failure to read a decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("'{0}' is not a decimal number")]
    Malformed(String),
    #[error("'{0}' exceeds the supported precision (18 significant digits, exponent within ±18)")]
    OutOfRange(String),
}

/// Exact decimal value `coefficient × 10^exponent`.
#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    coefficient: i128,
    exponent: i32,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        coefficient: 0,
        exponent: 0,
    };

    pub const fn new(coefficient: i128, exponent: i32) -> Self {
        Self {
            coefficient,
            exponent,
        }
    }

    pub fn coefficient(&self) -> i128 {
        self.coefficient
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.coefficient == 0
    }

    pub fn is_negative(&self) -> bool {
        self.coefficient < 0
    }

    /// Number of digits in the coefficient. Zero counts as one digit.
    pub fn digit_count(&self) -> i32 {
        self.coefficient
            .unsigned_abs()
            .checked_ilog10()
            .map_or(1, |d| d as i32 + 1)
    }

    /// Digits before the decimal point in the written form (`9.99` → 1,
    /// `0.05` → -1, `5E+2` → 3).
    pub fn integer_digits(&self) -> i32 {
        self.digit_count() + self.exponent
    }

    /// Digits after the decimal point in the written form (`0` for integers).
    pub fn fraction_digits(&self) -> u32 {
        self.exponent.min(0).unsigned_abs()
    }

    /// Exact sum, or `None` if it cannot be represented.
    pub fn checked_add(self, other: Decimal) -> Option<Decimal> {
        let exponent = self.exponent.min(other.exponent);
        let lhs = rescale(self.coefficient, self.exponent - exponent)?;
        let rhs = rescale(other.coefficient, other.exponent - exponent)?;
        Some(Decimal {
            coefficient: lhs.checked_add(rhs)?,
            exponent,
        })
    }

    /// Render with exactly `places` fractional digits.
    ///
    /// Extra precision is truncated; range values never carry more fractional
    /// digits than their range's format allows.
    pub fn format_fixed(&self, places: u32) -> String {
        let mut digits = self.coefficient.unsigned_abs().to_string();
        let target = -(places as i32);
        if self.exponent > target {
            digits.push_str(&"0".repeat((self.exponent - target) as usize));
        } else if self.exponent < target {
            let drop = (target - self.exponent) as usize;
            digits.truncate(digits.len().saturating_sub(drop));
        }

        let places = places as usize;
        if digits.len() <= places {
            digits = format!("{}{digits}", "0".repeat(places + 1 - digits.len()));
        }

        let mut out = String::with_capacity(digits.len() + 2);
        if self.coefficient < 0 && digits.bytes().any(|b| b != b'0') {
            out.push('-');
        }
        let split = digits.len() - places;
        out.push_str(&digits[..split]);
        if places > 0 {
            out.push('.');
            out.push_str(&digits[split..]);
        }
        out
    }
}

fn rescale(coefficient: i128, shift: i32) -> Option<i128> {
    let factor = 10i128.checked_pow(u32::try_from(shift).ok()?)?;
    coefficient.checked_mul(factor)
}

fn compare_magnitude(a: &Decimal, b: &Decimal) -> Ordering {
    let by_width = a.integer_digits().cmp(&b.integer_digits());
    if by_width != Ordering::Equal {
        return by_width;
    }
    // Same integer width: aligning to the smaller exponent never grows past
    // the wider coefficient, so this cannot overflow.
    let exponent = a.exponent.min(b.exponent);
    let scale = |d: &Decimal| {
        10u128
            .checked_pow((d.exponent - exponent) as u32)
            .and_then(|f| d.coefficient.unsigned_abs().checked_mul(f))
            .unwrap_or(u128::MAX)
    };
    scale(a).cmp(&scale(b))
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_sign = self.coefficient.signum().cmp(&other.coefficient.signum());
        if by_sign != Ordering::Equal || self.coefficient == 0 {
            return by_sign;
        }
        let magnitude = compare_magnitude(self, other);
        if self.coefficient > 0 {
            magnitude
        } else {
            magnitude.reverse()
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DecimalError::Malformed(s.to_string());
        let text = s.trim();

        let (negative, body) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (mantissa, exponent_text) = match body.find(['e', 'E']) {
            Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
            None => (body, None),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed());
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(malformed());
        }

        let mut exponent = match exponent_text {
            Some(e) => e.parse::<i64>().map_err(|_| malformed())?,
            None => 0,
        };
        exponent -= frac_part.len() as i64;

        let digits = format!("{int_part}{frac_part}");
        let significant = digits.trim_start_matches('0');
        if significant.len() > MAX_DIGITS || exponent.abs() > MAX_EXPONENT {
            return Err(DecimalError::OutOfRange(s.to_string()));
        }

        let magnitude: i128 = if significant.is_empty() {
            0
        } else {
            significant.parse().map_err(|_| malformed())?
        };

        Ok(Decimal {
            coefficient: if negative { -magnitude } else { magnitude },
            exponent: exponent as i32,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_fixed(self.fraction_digits()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parse_keeps_written_precision() {
        assert_eq!(d("9.99").coefficient(), 999);
        assert_eq!(d("9.99").exponent(), -2);
        assert_eq!(d("0.10").exponent(), -2);
        assert_eq!(d("1E+2").exponent(), 2);
        assert_eq!(d("10").exponent(), 0);
        assert_eq!(d("0.00").coefficient(), 0);
        assert_eq!(d("0.00").exponent(), -2);
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", ".", "abc", "1.2.3", "1e", "--1", "0x10", "1,5"] {
            assert!(bad.parse::<Decimal>().is_err(), "{bad:?} should fail");
        }
        assert!(matches!(
            "1234567890123456789".parse::<Decimal>(),
            Err(DecimalError::OutOfRange(_))
        ));
    }

    #[test]
    fn equality_is_numeric() {
        assert_eq!(d("0.1"), d("0.10"));
        assert_eq!(d("1E+2"), d("100"));
        assert!(d("0.05") < d("0.5"));
        assert!(d("-1") < d("0"));
        assert!(d("-2") < d("-1.5"));
        assert!(d("9.99") < d("10"));
    }

    #[test]
    fn addition_is_exact() {
        let mut v = d("0.1");
        for _ in 0..9 {
            v = v.checked_add(d("0.1")).unwrap();
        }
        assert_eq!(v, d("1"));
        assert_eq!(v.to_string(), "1.0");
        assert_eq!(d("0.1").checked_add(d("0.5")).unwrap().to_string(), "0.6");
    }

    #[test]
    fn integer_digits_follow_written_form() {
        assert_eq!(d("9.99").integer_digits(), 1);
        assert_eq!(d("10.0").integer_digits(), 2);
        assert_eq!(d("5E+2").integer_digits(), 3);
        assert_eq!(d("0.05").integer_digits(), -1);
    }

    #[test]
    fn fixed_formatting() {
        assert_eq!(d("0.1").format_fixed(2), "0.10");
        assert_eq!(d("2E+1").format_fixed(0), "20");
        assert_eq!(d("0.005").format_fixed(3), "0.005");
        assert_eq!(d("7").format_fixed(1), "7.0");
        assert_eq!(d("1.25").format_fixed(1), "1.2");
        assert_eq!(d("5E+2").to_string(), "500");
    }
}
