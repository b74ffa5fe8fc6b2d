//! Typed-digits quantity entry.
//!
//! Counting is done on numeric keypads without a minus key, so a leading `0`
//! followed by more digits means "subtract": `"05"` is `-5`. A lone `"0"` is a
//! literal zero.

use stocktake_core::{DomainError, DomainResult};

/// A parsed quantity entry, ready to be accumulated into an item.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QuantityEntry {
    delta: i64,
    shorthand: bool,
}

impl QuantityEntry {
    /// Parse user input. Rejects anything that is not a whole integer; nothing
    /// is partially parsed.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(DomainError::parse_failure(input));
        }

        if s.len() > 1 && s.starts_with('0') {
            let magnitude = parse_digits(&s[1..]).ok_or_else(|| DomainError::parse_failure(input))?;
            return Ok(Self {
                delta: -magnitude,
                shorthand: true,
            });
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let magnitude = parse_digits(digits).ok_or_else(|| DomainError::parse_failure(input))?;

        Ok(Self {
            delta: if negative { -magnitude } else { magnitude },
            shorthand: false,
        })
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    /// Whether the leading-zero subtraction shorthand was used.
    pub fn is_shorthand(&self) -> bool {
        self.shorthand
    }
}

impl core::str::FromStr for QuantityEntry {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_digits(digits: &str) -> Option<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(input: &str) -> i64 {
        QuantityEntry::parse(input).unwrap().delta()
    }

    #[test]
    fn plain_digits_are_added() {
        assert_eq!(delta("5"), 5);
        assert_eq!(delta("120"), 120);
    }

    #[test]
    fn leading_zero_means_subtract() {
        let entry = QuantityEntry::parse("05").unwrap();
        assert_eq!(entry.delta(), -5);
        assert!(entry.is_shorthand());
        assert_eq!(delta("012"), -12);
    }

    #[test]
    fn lone_zero_is_literal() {
        let entry = QuantityEntry::parse("0").unwrap();
        assert_eq!(entry.delta(), 0);
        assert!(!entry.is_shorthand());
    }

    #[test]
    fn double_zero_subtracts_nothing() {
        assert_eq!(delta("00"), 0);
    }

    #[test]
    fn explicit_sign_is_accepted() {
        assert_eq!(delta("-3"), -3);
        assert_eq!(delta("+3"), 3);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(delta(" 7 "), 7);
    }

    #[test]
    fn garbage_is_rejected() {
        for input in ["", "  ", "abc", "5x", "0x", "1.5", "-", "0-5", "99999999999999999999"] {
            let err = QuantityEntry::parse(input).unwrap_err();
            assert!(matches!(err, DomainError::ParseFailure(_)), "input {input:?}");
        }
    }
}
