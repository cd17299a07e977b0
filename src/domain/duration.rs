//! Compact duration notation parsing (`1d12h`, `90s`, `2m-30s`, ...)

use crate::application::errors::DurationError;

/// What to do when a parsed duration falls outside the caller's bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePolicy {
    /// Fail with `TooShort` / `TooLong`.
    Reject,
    /// Silently clamp to the violated bound.
    Clamp,
}

const UNITS: [(char, i64); 5] = [
    ('w', 604_800),
    ('d', 86_400),
    ('h', 3_600),
    ('m', 60),
    ('s', 1),
];

fn unit_seconds(c: char) -> Option<i64> {
    let c = c.to_ascii_lowercase();
    UNITS.iter().find(|(u, _)| *u == c).map(|(_, secs)| *secs)
}

/// Parses a duration written as concatenated signed segments with unit
/// suffixes (`w`/`d`/`h`/`m`/`s`, case-insensitive) into total seconds.
///
/// Segments may appear in any order and repeat; digits not followed by a
/// unit contribute nothing. `min`/`max` are inclusive bounds in seconds,
/// applied to the total per `policy`.
pub fn parse_duration(
    input: &str,
    min: Option<i64>,
    max: Option<i64>,
    policy: RangePolicy,
) -> Result<i64, DurationError> {
    let mut total: i64 = 0;
    let mut segment = String::new();

    for c in input.chars() {
        if let Some(secs) = unit_seconds(c) {
            if !segment.is_empty() {
                let amount: i64 = segment.parse().map_err(|_| {
                    DurationError::InvalidFormat(format!("bad number `{}`", segment))
                })?;
                let add = amount
                    .checked_mul(secs)
                    .ok_or_else(|| DurationError::InvalidFormat("amount too large".into()))?;
                total = total
                    .checked_add(add)
                    .ok_or_else(|| DurationError::InvalidFormat("amount too large".into()))?;
                segment.clear();
            }
        } else if c.is_ascii_digit() || c == '+' || c == '-' {
            segment.push(c);
        } else {
            return Err(DurationError::InvalidFormat(format!(
                "unrecognized character `{}`",
                c
            )));
        }
    }

    if let Some(min) = min {
        if total < min {
            match policy {
                RangePolicy::Reject => return Err(DurationError::TooShort { min }),
                RangePolicy::Clamp => total = min,
            }
        }
    }
    if let Some(max) = max {
        if total > max {
            match policy {
                RangePolicy::Reject => return Err(DurationError::TooLong { max }),
                RangePolicy::Clamp => total = max,
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_concatenated_units() {
        assert_eq!(parse_duration("1d12h", None, None, RangePolicy::Reject), Ok(129_600));
        assert_eq!(parse_duration("2m30s", None, None, RangePolicy::Reject), Ok(150));
        assert_eq!(parse_duration("1w", None, None, RangePolicy::Reject), Ok(604_800));
        assert_eq!(parse_duration("", None, None, RangePolicy::Reject), Ok(0));
    }

    #[test]
    fn units_are_case_insensitive_and_may_repeat() {
        assert_eq!(parse_duration("1D12H", None, None, RangePolicy::Reject), Ok(129_600));
        assert_eq!(parse_duration("1d1d", None, None, RangePolicy::Reject), Ok(172_800));
    }

    #[test]
    fn segments_may_be_signed() {
        assert_eq!(parse_duration("1h-30m", None, None, RangePolicy::Reject), Ok(1_800));
        assert_eq!(parse_duration("+5s", None, None, RangePolicy::Reject), Ok(5));
        assert_eq!(parse_duration("-5s", None, None, RangePolicy::Reject), Ok(-5));
    }

    #[test]
    fn digits_without_a_unit_contribute_nothing() {
        assert_eq!(parse_duration("90", None, None, RangePolicy::Reject), Ok(0));
        assert_eq!(parse_duration("1d5", None, None, RangePolicy::Reject), Ok(86_400));
    }

    #[test]
    fn rejects_unrecognized_characters() {
        assert!(matches!(
            parse_duration("5x", None, None, RangePolicy::Reject),
            Err(DurationError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_duration("1d 2h", None, None, RangePolicy::Reject),
            Err(DurationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_dangling_signs() {
        assert!(matches!(
            parse_duration("-s", None, None, RangePolicy::Reject),
            Err(DurationError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_duration("+-5s", None, None, RangePolicy::Reject),
            Err(DurationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn bounds_reject_or_clamp() {
        assert_eq!(
            parse_duration("90s", Some(0), Some(60), RangePolicy::Clamp),
            Ok(60)
        );
        assert_eq!(
            parse_duration("90s", Some(0), Some(60), RangePolicy::Reject),
            Err(DurationError::TooLong { max: 60 })
        );
        assert_eq!(
            parse_duration("0s", Some(1), None, RangePolicy::Reject),
            Err(DurationError::TooShort { min: 1 })
        );
        assert_eq!(
            parse_duration("-5s", Some(0), None, RangePolicy::Clamp),
            Ok(0)
        );
    }

    #[test]
    fn overflow_is_invalid() {
        assert!(matches!(
            parse_duration("99999999999999999999s", None, None, RangePolicy::Reject),
            Err(DurationError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_duration("9223372036854775807w", None, None, RangePolicy::Reject),
            Err(DurationError::InvalidFormat(_))
        ));
    }
}
