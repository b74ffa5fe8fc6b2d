use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktake_core::{DomainError, Entity, ItemCode, ValueObject};

/// Reconciliation status of one item.
///
/// Always derived from `(actual_quantity, expected_quantity)`; see
/// [`ItemStatus::derive`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Unchecked,
    Match,
    Shortage,
    Excess,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 4] = [
        ItemStatus::Unchecked,
        ItemStatus::Match,
        ItemStatus::Shortage,
        ItemStatus::Excess,
    ];

    /// Pure, total status function.
    pub fn derive(actual: Option<u64>, expected: u64) -> Self {
        match actual {
            None => ItemStatus::Unchecked,
            Some(a) if a == expected => ItemStatus::Match,
            Some(a) if a < expected => ItemStatus::Shortage,
            Some(_) => ItemStatus::Excess,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Unchecked => "unchecked",
            ItemStatus::Match => "match",
            ItemStatus::Shortage => "shortage",
            ItemStatus::Excess => "excess",
        }
    }

    /// Human-readable label used in reports and the console.
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Unchecked => "Unchecked",
            ItemStatus::Match => "Match",
            ItemStatus::Shortage => "Shortage",
            ItemStatus::Excess => "Excess",
        }
    }

    /// `Shortage` or `Excess`.
    pub fn is_discrepancy(&self) -> bool {
        matches!(self, ItemStatus::Shortage | ItemStatus::Excess)
    }

    pub fn is_checked(&self) -> bool {
        !matches!(self, ItemStatus::Unchecked)
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl core::str::FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ItemStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == needle)
            .ok_or_else(|| DomainError::validation(format!("unknown status '{s}'")))
    }
}

/// One inventory line.
///
/// `expected_quantity` and `unit_cost` are fixed when the item is created. The
/// counted quantity changes only through [`Item::apply_delta`], which is the
/// single place the status is recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ItemRecord")]
pub struct Item {
    code: ItemCode,
    name: String,
    expected_quantity: u64,
    actual_quantity: Option<u64>,
    unit_cost: f64,
    status: ItemStatus,
}

/// Persisted shape of an item. `status` is accepted but never trusted.
#[derive(Deserialize)]
struct ItemRecord {
    code: ItemCode,
    name: String,
    expected_quantity: u64,
    actual_quantity: Option<u64>,
    unit_cost: f64,
    #[serde(default)]
    #[allow(dead_code)]
    status: Option<ItemStatus>,
}

impl From<ItemRecord> for Item {
    fn from(r: ItemRecord) -> Self {
        Self {
            status: ItemStatus::derive(r.actual_quantity, r.expected_quantity),
            code: r.code,
            name: r.name,
            expected_quantity: r.expected_quantity,
            actual_quantity: r.actual_quantity,
            unit_cost: sanitize_cost(r.unit_cost),
        }
    }
}

impl Item {
    /// Item loaded from a spreadsheet row. A blank name falls back to the code.
    pub fn imported(code: ItemCode, name: impl Into<String>, expected_quantity: u64, unit_cost: f64) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            code.to_string()
        } else {
            name.trim().to_string()
        };
        Self {
            code,
            name,
            expected_quantity,
            actual_quantity: None,
            unit_cost: sanitize_cost(unit_cost),
            status: ItemStatus::Unchecked,
        }
    }

    /// Item created during a scan session for a code that was not imported.
    ///
    /// Carries zero expected quantity and zero cost until a future import.
    pub fn scanned(code: ItemCode, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        Ok(Self::imported(code, name, 0, 0.0))
    }

    pub fn code(&self) -> &ItemCode {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected_quantity(&self) -> u64 {
        self.expected_quantity
    }

    pub fn actual_quantity(&self) -> Option<u64> {
        self.actual_quantity
    }

    pub fn unit_cost(&self) -> f64 {
        self.unit_cost
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// `actual - expected`, absent while unchecked.
    pub fn difference(&self) -> Option<i64> {
        self.actual_quantity
            .map(|actual| clamp_to_i64(actual as i128 - self.expected_quantity as i128))
    }

    pub fn expected_value(&self) -> f64 {
        self.expected_quantity as f64 * self.unit_cost
    }

    /// Counted value; unchecked items count as zero.
    pub fn actual_value(&self) -> f64 {
        self.actual_quantity.unwrap_or(0) as f64 * self.unit_cost
    }

    /// `(actual-or-0 - expected) * unit_cost`.
    pub fn variance_value(&self) -> f64 {
        (self.actual_quantity.unwrap_or(0) as f64 - self.expected_quantity as f64) * self.unit_cost
    }

    /// Accumulate a signed delta into the counted quantity.
    ///
    /// An unchecked item starts from the delta itself. The result is floored at
    /// zero: over-subtraction is absorbed, not reported.
    pub(crate) fn apply_delta(&mut self, delta: i64) {
        let base = self.actual_quantity.unwrap_or(0) as i128;
        let next = (base + delta as i128).clamp(0, u64::MAX as i128) as u64;
        self.actual_quantity = Some(next);
        self.status = ItemStatus::derive(self.actual_quantity, self.expected_quantity);
    }
}

impl Entity for Item {
    type Id = ItemCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}

fn sanitize_cost(cost: f64) -> f64 {
    if cost.is_finite() && cost > 0.0 { cost } else { 0.0 }
}

fn clamp_to_i64(v: i128) -> i64 {
    v.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Describes the currently loaded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMetadata {
    pub source_name: String,
    pub loaded_at: DateTime<Utc>,
    pub item_count: usize,
}

impl ImportMetadata {
    pub fn new(source_name: impl Into<String>, loaded_at: DateTime<Utc>, item_count: usize) -> Self {
        Self {
            source_name: source_name.into(),
            loaded_at,
            item_count,
        }
    }
}

impl ValueObject for ImportMetadata {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn code(s: &str) -> ItemCode {
        ItemCode::new(s).unwrap()
    }

    #[test]
    fn identity_is_the_code() {
        let mut counted = Item::imported(code("100"), "Bolt", 10, 2.5);
        counted.apply_delta(4);
        assert!(counted.same_identity(&Item::imported(code("100"), "Bolt M6", 0, 0.0)));
        assert!(!counted.same_identity(&Item::imported(code("101"), "Bolt", 10, 2.5)));
    }

    #[test]
    fn imported_item_starts_unchecked() {
        let item = Item::imported(code("100"), "Bolt", 10, 2.5);
        assert_eq!(item.status(), ItemStatus::Unchecked);
        assert_eq!(item.actual_quantity(), None);
        assert_eq!(item.difference(), None);
    }

    #[test]
    fn imported_item_without_name_uses_code() {
        let item = Item::imported(code("100"), "  ", 1, 1.0);
        assert_eq!(item.name(), "100");
    }

    #[test]
    fn scanned_item_has_zero_expectation() {
        let item = Item::scanned(code("999"), "Washer").unwrap();
        assert_eq!(item.expected_quantity(), 0);
        assert_eq!(item.unit_cost(), 0.0);
        assert_eq!(item.status(), ItemStatus::Unchecked);
    }

    #[test]
    fn scanned_item_rejects_blank_name() {
        let err = Item::scanned(code("999"), " ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn first_delta_sets_actual_quantity() {
        let mut item = Item::imported(code("100"), "Bolt", 10, 2.5);
        item.apply_delta(10);
        assert_eq!(item.actual_quantity(), Some(10));
        assert_eq!(item.status(), ItemStatus::Match);
    }

    #[test]
    fn negative_first_delta_is_floored_at_zero() {
        let mut item = Item::imported(code("100"), "Bolt", 10, 2.5);
        item.apply_delta(-5);
        assert_eq!(item.actual_quantity(), Some(0));
        assert_eq!(item.status(), ItemStatus::Shortage);
    }

    #[test]
    fn zero_delta_marks_item_checked() {
        let mut item = Item::imported(code("100"), "Bolt", 0, 2.5);
        item.apply_delta(0);
        assert_eq!(item.status(), ItemStatus::Match);
    }

    #[test]
    fn monetary_values() {
        let mut item = Item::imported(code("200"), "Nut", 5, 1.0);
        assert_eq!(item.expected_value(), 5.0);
        assert_eq!(item.actual_value(), 0.0);
        assert_eq!(item.variance_value(), -5.0);
        item.apply_delta(3);
        assert_eq!(item.actual_value(), 3.0);
        assert_eq!(item.variance_value(), -2.0);
        assert_eq!(item.difference(), Some(-2));
    }

    #[test]
    fn negative_cost_is_stored_as_zero() {
        let item = Item::imported(code("1"), "x", 1, -4.0);
        assert_eq!(item.unit_cost(), 0.0);
    }

    #[test]
    fn deserialization_recomputes_status() {
        let json = r#"{"code":"1","name":"x","expected_quantity":5,"actual_quantity":7,"unit_cost":1.0,"status":"match"}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.status(), ItemStatus::Excess);
    }

    #[test]
    fn status_parses_from_name() {
        assert_eq!("Shortage".parse::<ItemStatus>().unwrap(), ItemStatus::Shortage);
        assert!("lost".parse::<ItemStatus>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a defined actual quantity always yields exactly the status
        /// given by its ordering against the expectation.
        #[test]
        fn status_is_total_over_orderings(actual in 0u64..10_000, expected in 0u64..10_000) {
            let status = ItemStatus::derive(Some(actual), expected);
            let want = match actual.cmp(&expected) {
                core::cmp::Ordering::Equal => ItemStatus::Match,
                core::cmp::Ordering::Less => ItemStatus::Shortage,
                core::cmp::Ordering::Greater => ItemStatus::Excess,
            };
            prop_assert_eq!(status, want);
        }

        #[test]
        fn absent_actual_is_always_unchecked(expected in any::<u64>()) {
            prop_assert_eq!(ItemStatus::derive(None, expected), ItemStatus::Unchecked);
        }

        /// Property: the counted quantity is never negative and the cached status
        /// always agrees with the derivation rule.
        #[test]
        fn accumulation_never_goes_negative(
            expected in 0u64..1_000,
            deltas in prop::collection::vec(-1_000i64..1_000i64, 1..40)
        ) {
            let mut item = Item::imported(ItemCode::new("P").unwrap(), "prop", expected, 1.0);
            let mut model: i64 = 0;
            for delta in deltas {
                item.apply_delta(delta);
                model = (model + delta).max(0);
                prop_assert_eq!(item.actual_quantity(), Some(model as u64));
                prop_assert_eq!(item.status(), ItemStatus::derive(item.actual_quantity(), expected));
            }
        }
    }
}
