//! Closed numeric ranges and their fixed-width formatting.
//!
//! A range literal is either a single decimal (`0.5`) or `start-stop-step`
//! (`0.1-9.99-0.5`). Values are generated exactly, starting at `start` and
//! stopping before the first value greater than `stop`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::decimal::Decimal;

/// Upper bound on the number of values a single range may expand to.
pub const MAX_RANGE_VALUES: usize = 100_000;

/// Reasons a range is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("expected '{input}' to be a decimal value or in form start-stop-step: {reason}")]
    Malformed { input: String, reason: String },
    #[error("expected start {start} to be <= stop {stop}")]
    StartAfterStop { start: Decimal, stop: Decimal },
    #[error("step cannot be zero when start {start} differs from stop {stop}")]
    ZeroStep { start: Decimal, stop: Decimal },
    #[error("step {0} cannot be negative")]
    NegativeStep(Decimal),
    #[error("{bound} value {value} cannot be negative")]
    NegativeBound { bound: &'static str, value: Decimal },
    #[error("range {start}-{stop}-{step} expands to more than {limit} values", limit = MAX_RANGE_VALUES)]
    TooManyValues {
        start: Decimal,
        stop: Decimal,
        step: Decimal,
    },
    #[error("range {start}-{stop}-{step} exceeds the supported decimal precision")]
    Overflow {
        start: Decimal,
        stop: Decimal,
        step: Decimal,
    },
}

/// Fixed-width rendering shared by every value of one range.
///
/// Every value gets the same number of fractional digits and is zero padded
/// to the width of the stop value, so string order equals numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFormat {
    pub places: u32,
    pub width: usize,
}

impl FixedFormat {
    pub fn render(&self, value: &Decimal) -> String {
        let text = value.format_fixed(self.places);
        format!("{text:0>width$}", width = self.width)
    }
}

/// Validated `start-stop-step` range with its expanded values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericRange {
    start: Decimal,
    stop: Decimal,
    step: Decimal,
    values: Vec<Decimal>,
}

impl NumericRange {
    /// Checks run in order: bound signs, then `start <= stop`, then the step.
    pub fn new(start: Decimal, stop: Decimal, step: Decimal) -> Result<Self, RangeError> {
        if start.is_negative() {
            return Err(RangeError::NegativeBound {
                bound: "start",
                value: start,
            });
        }
        if stop.is_negative() {
            return Err(RangeError::NegativeBound {
                bound: "stop",
                value: stop,
            });
        }
        if start > stop {
            return Err(RangeError::StartAfterStop { start, stop });
        }
        if start != stop && step.is_zero() {
            return Err(RangeError::ZeroStep { start, stop });
        }
        if step.is_negative() {
            return Err(RangeError::NegativeStep(step));
        }

        let values = expand(start, stop, step)?;
        Ok(Self {
            start,
            stop,
            step,
            values,
        })
    }

    /// Range holding exactly one value.
    pub fn single(value: Decimal) -> Result<Self, RangeError> {
        Self::new(value, value, Decimal::ZERO)
    }

    pub fn start(&self) -> Decimal {
        self.start
    }

    pub fn stop(&self) -> Decimal {
        self.stop
    }

    pub fn step(&self) -> Decimal {
        self.step
    }

    pub fn values(&self) -> &[Decimal] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when the range sweeps more than one value.
    pub fn is_swept(&self) -> bool {
        self.values.len() > 1
    }

    /// Width needed to render every value without loss and in sortable form.
    pub fn format(&self) -> FixedFormat {
        let places = self
            .start
            .fraction_digits()
            .max(self.stop.fraction_digits())
            .max(self.step.fraction_digits());

        let before_point = self.stop.integer_digits().max(1) as usize;
        let width = if places > 0 {
            before_point + 1 + places as usize
        } else {
            before_point
        };

        FixedFormat { places, width }
    }
}

fn expand(start: Decimal, stop: Decimal, step: Decimal) -> Result<Vec<Decimal>, RangeError> {
    let mut values = vec![start];
    if step.is_zero() {
        return Ok(values);
    }

    let mut current = start;
    loop {
        current = current
            .checked_add(step)
            .ok_or(RangeError::Overflow { start, stop, step })?;
        if current > stop {
            break;
        }
        if values.len() == MAX_RANGE_VALUES {
            return Err(RangeError::TooManyValues { start, stop, step });
        }
        values.push(current);
    }
    Ok(values)
}

impl FromStr for NumericRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: String| RangeError::Malformed {
            input: s.to_string(),
            reason,
        };
        let parse = |part: &str| part.parse::<Decimal>().map_err(|e| malformed(e.to_string()));

        let parts: Vec<&str> = s.trim().split('-').collect();
        match parts.as_slice() {
            [value] => Self::single(parse(value)?),
            [start, stop, step] => Self::new(parse(start)?, parse(stop)?, parse(step)?),
            _ => Err(malformed(format!(
                "found {} dash-separated parts, expected 1 or 3",
                parts.len()
            ))),
        }
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.stop {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}-{}", self.start, self.stop, self.step)
        }
    }
}
