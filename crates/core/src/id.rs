//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Item code (SKU): the primary key of the item collection.
///
/// Codes are compared exactly and case-sensitively. Surrounding whitespace is
/// stripped on construction; a blank code is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemCode(String);

impl ItemCode {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("item code cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for ItemCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ItemCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl crate::ValueObject for ItemCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_trimmed() {
        let code = ItemCode::new("  100 ").unwrap();
        assert_eq!(code.as_str(), "100");
    }

    #[test]
    fn blank_code_is_rejected() {
        let err = ItemCode::new("   ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn codes_compare_case_sensitively() {
        assert_ne!(ItemCode::new("ab").unwrap(), ItemCode::new("AB").unwrap());
    }

    #[test]
    fn serializes_as_plain_string() {
        let code: ItemCode = "SKU-7".parse().unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"SKU-7\"");
    }
}
