use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("invalid number in duration {0:?}")]
    InvalidNumber(String),

    /// Unit missing or not one of ns, us, µs, ms, s, m, h
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { input: String, unit: String },

    #[error("duration must be positive, got {0:?}")]
    NonPositive(String),
}

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3_600 * 1_000_000_000),
];

/// Parse an interval written as a sequence of `<number><unit>` terms,
/// e.g. `"30s"`, `"1m"`, `"1h30m"`, `"1.5m"`, `"250ms"`.
///
/// Every term needs a unit. Fractions are allowed. The total must be
/// greater than zero since it drives a timer.
pub fn parse_interval(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let mut rest = s;
    let mut total_nanos: u128 = 0;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, after) = rest.split_at(number_len);
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return Err(DurationError::InvalidNumber(input.to_string()));
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, tail) = after.split_at(unit_len);
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| DurationError::UnknownUnit {
                input: input.to_string(),
                unit: unit.to_string(),
            })?;

        total_nanos = total_nanos.saturating_add(scaled(number, scale));
        rest = tail;
    }

    if total_nanos == 0 {
        return Err(DurationError::NonPositive(input.to_string()));
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000).unwrap_or(u64::MAX);
    let nanos = (total_nanos % 1_000_000_000) as u32;
    Ok(Duration::new(secs, nanos))
}

/// `number` (digits with at most one '.') times `scale` nanoseconds.
/// Fraction digits past nanosecond precision are truncated.
fn scaled(number: &str, scale: u128) -> u128 {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));

    let whole_nanos = whole
        .parse::<u128>()
        .unwrap_or(0)
        .saturating_mul(scale);

    let mut fraction_nanos: u128 = 0;
    let mut place = scale;
    for digit in fraction.bytes() {
        place /= 10;
        if place == 0 {
            break;
        }
        fraction_nanos += u128::from(digit - b'0') * place;
    }

    whole_nanos.saturating_add(fraction_nanos)
}
