//! Translation slot assignment.
//!
//! Users keep up to three catalog translations available locally. The first
//! slot always holds an entry; the other two may be empty. No two slots may
//! reference the same catalog entry, and the first slot wins every conflict.

use std::fmt;

use super::catalog::Catalog;
use super::error::{TranslationError, TranslationResult};

/// Description of the entry the first slot defaults to.
pub const DEFAULT_PRIMARY: &str = "English 2009";

/// Description of the entry the second slot defaults to, when present.
pub const DEFAULT_SECONDARY: &str = "Portuguese Alternative";

/// Raw persisted value meaning "no entry".
pub const NONE_VALUE: i64 = -1;

/// One of the three slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    First,
    Second,
    Third,
}

impl Slot {
    /// All slots in processing order.
    pub const ALL: [Slot; 3] = [Slot::First, Slot::Second, Slot::Third];

    /// Whether the slot may hold no entry.
    pub fn allows_none(self) -> bool {
        !matches!(self, Slot::First)
    }

    /// Settings key persisting this slot.
    pub fn settings_key(self) -> &'static str {
        match self {
            Slot::First => "translation_slot1",
            Slot::Second => "translation_slot2",
            Slot::Third => "translation_slot3",
        }
    }

    /// 1-based slot number.
    pub fn number(self) -> u8 {
        match self {
            Slot::First => 1,
            Slot::Second => 2,
            Slot::Third => 3,
        }
    }

    /// Parse `1`, `2`, `3` or `slot1`..`slot3`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().trim_start_matches("slot") {
            "1" => Some(Slot::First),
            "2" => Some(Slot::Second),
            "3" => Some(Slot::Third),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.number())
    }
}

/// Content of a slot: nothing, or a catalog ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotValue {
    #[default]
    None,
    Entry(usize),
}

impl SlotValue {
    /// Convert from the persisted form (`-1` for none).
    ///
    /// Returns `None` for other negative numbers.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            NONE_VALUE => Some(SlotValue::None),
            n if n >= 0 => usize::try_from(n).ok().map(SlotValue::Entry),
            _ => None,
        }
    }

    /// Persisted form.
    pub fn to_raw(self) -> i64 {
        match self {
            SlotValue::None => NONE_VALUE,
            SlotValue::Entry(index) => i64::try_from(index).unwrap_or(i64::MAX),
        }
    }

    /// Catalog ordinal, if any.
    pub fn entry(self) -> Option<usize> {
        match self {
            SlotValue::None => None,
            SlotValue::Entry(index) => Some(index),
        }
    }
}

/// What happened when a slot was assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    /// The value was stored as requested.
    Applied,
    /// The value was stored and the listed slots were cleared to none.
    Evicted(Vec<Slot>),
    /// The first slot already holds the value; the target slot was set to none.
    ForcedNone,
    /// Nothing changed.
    Unchanged,
}

/// The three slot values, always satisfying the no-duplicate invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    first: usize,
    second: SlotValue,
    third: SlotValue,
}

impl SlotAssignment {
    /// Create an assignment, clearing later slots that duplicate earlier ones.
    pub fn new(first: usize, second: SlotValue, third: SlotValue) -> Self {
        let second = if second == SlotValue::Entry(first) {
            SlotValue::None
        } else {
            second
        };
        let third = if third == SlotValue::Entry(first) || (third != SlotValue::None && third == second) {
            SlotValue::None
        } else {
            third
        };
        Self {
            first,
            second,
            third,
        }
    }

    /// Resolve persisted values against the catalog, applying defaults.
    ///
    /// `persisted` holds the raw values of slot 1 to 3; `None` means the slot
    /// was never saved. Values outside the catalog fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `CatalogUnavailable` for an empty catalog, since there is
    /// nothing to default against.
    pub fn resolve(persisted: [Option<i64>; 3], catalog: &Catalog) -> TranslationResult<Self> {
        if catalog.is_empty() {
            return Err(TranslationError::CatalogUnavailable {
                tried: catalog.source().display().to_string(),
            });
        }

        let valid = |raw: i64| -> Option<SlotValue> {
            SlotValue::from_raw(raw).filter(|value| match value {
                SlotValue::None => true,
                SlotValue::Entry(index) => *index < catalog.len(),
            })
        };

        let first = persisted[0]
            .and_then(valid)
            .and_then(SlotValue::entry)
            .or_else(|| catalog.find_by_description(DEFAULT_PRIMARY).map(|e| e.ordinal))
            .unwrap_or(0);

        let second = match persisted[1] {
            None => catalog
                .find_by_description(DEFAULT_SECONDARY)
                .map(|e| SlotValue::Entry(e.ordinal))
                .unwrap_or_default(),
            Some(raw) => valid(raw).unwrap_or_else(|| {
                tracing::warn!(raw, "Ignoring out-of-range value for translation slot 2");
                SlotValue::None
            }),
        };

        let third = persisted[2].and_then(valid).unwrap_or_default();

        Ok(Self::new(first, second, third))
    }

    /// Value held by a slot.
    pub fn get(&self, slot: Slot) -> SlotValue {
        match slot {
            Slot::First => SlotValue::Entry(self.first),
            Slot::Second => self.second,
            Slot::Third => self.third,
        }
    }

    /// Non-empty slots in order, with their catalog ordinals.
    pub fn selected(&self) -> Vec<(Slot, usize)> {
        Slot::ALL
            .iter()
            .filter_map(|slot| self.get(*slot).entry().map(|index| (*slot, index)))
            .collect()
    }

    /// Persisted form of all three slots.
    pub fn to_raw(&self) -> [i64; 3] {
        [
            SlotValue::Entry(self.first).to_raw(),
            self.second.to_raw(),
            self.third.to_raw(),
        ]
    }

    /// Assign a raw catalog index (`-1` for none) to a slot.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSlotValue` when the index is outside the catalog, or
    /// when trying to empty the first slot. The assignment is unchanged then.
    pub fn set_slot(
        &mut self,
        slot: Slot,
        catalog_index: i64,
        catalog_len: usize,
    ) -> TranslationResult<SlotChange> {
        let invalid = || TranslationError::InvalidSlotValue {
            slot: slot.to_string(),
            value: catalog_index,
        };

        let value = SlotValue::from_raw(catalog_index).ok_or_else(invalid)?;
        if let SlotValue::Entry(index) = value {
            if index >= catalog_len {
                return Err(invalid());
            }
        }

        let (next, change) = reconcile(self, slot, value)?;
        *self = next;
        Ok(change)
    }
}

/// Compute the assignment that results from setting `slot` to `value`.
///
/// Other slots holding the same entry are cleared. When the conflicting slot
/// is the first one, the first slot keeps its value and `slot` ends up empty.
///
/// # Errors
///
/// Returns `InvalidSlotValue` when `value` is none for the first slot.
pub fn reconcile(
    current: &SlotAssignment,
    slot: Slot,
    value: SlotValue,
) -> TranslationResult<(SlotAssignment, SlotChange)> {
    if current.get(slot) == value {
        return Ok((*current, SlotChange::Unchanged));
    }

    let mut next = *current;

    let index = match value {
        SlotValue::None => {
            if !slot.allows_none() {
                return Err(TranslationError::InvalidSlotValue {
                    slot: slot.to_string(),
                    value: NONE_VALUE,
                });
            }
            set(&mut next, slot, SlotValue::None);
            return Ok((next, SlotChange::Applied));
        }
        SlotValue::Entry(index) => index,
    };

    if slot != Slot::First && current.first == index {
        set(&mut next, slot, SlotValue::None);
        return Ok((next, SlotChange::ForcedNone));
    }

    let evicted: Vec<Slot> = Slot::ALL
        .iter()
        .copied()
        .filter(|other| *other != slot && current.get(*other) == value)
        .collect();

    for other in &evicted {
        set(&mut next, *other, SlotValue::None);
    }
    set(&mut next, slot, value);

    let change = if evicted.is_empty() {
        SlotChange::Applied
    } else {
        SlotChange::Evicted(evicted)
    };
    Ok((next, change))
}

fn set(assignment: &mut SlotAssignment, slot: Slot, value: SlotValue) {
    match (slot, value) {
        (Slot::First, SlotValue::Entry(index)) => assignment.first = index,
        (Slot::First, SlotValue::None) => {}
        (Slot::Second, value) => assignment.second = value,
        (Slot::Third, value) => assignment.third = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[&str]) -> Catalog {
        let json = serde_json::to_string(
            &names
                .iter()
                .map(|name| serde_json::json!({ "Description": name }))
                .collect::<Vec<_>>(),
        )
        .unwrap();
        Catalog::parse(&json, "catalog.json").unwrap()
    }

    #[test]
    fn test_defaults_on_first_load() {
        let catalog = catalog(&["English 2009", "Portuguese Alternative"]);

        let slots = SlotAssignment::resolve([None, None, None], &catalog).unwrap();

        assert_eq!(slots.get(Slot::First), SlotValue::Entry(0));
        assert_eq!(slots.get(Slot::Second), SlotValue::Entry(1));
        assert_eq!(slots.get(Slot::Third), SlotValue::None);
    }

    #[test]
    fn test_primary_default_is_case_insensitive_and_falls_back_to_first() {
        let named = catalog(&["German", "ENGLISH 2009"]);
        let slots = SlotAssignment::resolve([None, None, None], &named).unwrap();
        assert_eq!(slots.get(Slot::First), SlotValue::Entry(1));
        assert_eq!(slots.get(Slot::Second), SlotValue::None);

        let unnamed = catalog(&["German", "French"]);
        let slots = SlotAssignment::resolve([None, None, None], &unnamed).unwrap();
        assert_eq!(slots.get(Slot::First), SlotValue::Entry(0));
    }

    #[test]
    fn test_persisted_values_win_over_defaults() {
        let catalog = catalog(&["English 2009", "Portuguese Alternative", "Spanish"]);

        let slots = SlotAssignment::resolve([Some(2), Some(-1), Some(0)], &catalog).unwrap();

        assert_eq!(slots.to_raw(), [2, -1, 0]);
    }

    #[test]
    fn test_resolve_drops_duplicates_and_out_of_range() {
        let catalog = catalog(&["English 2009", "Portuguese Alternative"]);

        let slots = SlotAssignment::resolve([Some(1), None, Some(7)], &catalog).unwrap();

        // Slot 2 defaults to entry 1, which slot 1 already holds.
        assert_eq!(slots.to_raw(), [1, -1, -1]);
    }

    #[test]
    fn test_resolve_requires_entries() {
        let empty = catalog(&[]);
        assert!(matches!(
            SlotAssignment::resolve([None, None, None], &empty),
            Err(TranslationError::CatalogUnavailable { .. })
        ));
    }

    #[test]
    fn test_slot_one_wins_conflicts() {
        let mut slots = SlotAssignment::new(0, SlotValue::None, SlotValue::None);

        let change = slots.set_slot(Slot::Second, 0, 3).unwrap();

        assert_eq!(change, SlotChange::ForcedNone);
        assert_eq!(slots.get(Slot::First), SlotValue::Entry(0));
        assert_eq!(slots.get(Slot::Second), SlotValue::None);
    }

    #[test]
    fn test_assignment_evicts_other_optional_slot() {
        let mut slots = SlotAssignment::new(0, SlotValue::Entry(1), SlotValue::Entry(2));

        let change = slots.set_slot(Slot::Third, 1, 3).unwrap();

        assert_eq!(change, SlotChange::Evicted(vec![Slot::Second]));
        assert_eq!(slots.to_raw(), [0, -1, 1]);
    }

    #[test]
    fn test_slot_one_assignment_evicts_duplicates() {
        let mut slots = SlotAssignment::new(0, SlotValue::Entry(1), SlotValue::None);

        let change = slots.set_slot(Slot::First, 1, 3).unwrap();

        assert_eq!(change, SlotChange::Evicted(vec![Slot::Second]));
        assert_eq!(slots.to_raw(), [1, -1, -1]);
    }

    #[test]
    fn test_slot_one_cannot_be_emptied() {
        let mut slots = SlotAssignment::new(2, SlotValue::None, SlotValue::None);

        let result = slots.set_slot(Slot::First, -1, 3);

        assert!(matches!(result, Err(TranslationError::InvalidSlotValue { .. })));
        assert_eq!(slots.get(Slot::First), SlotValue::Entry(2));
    }

    #[test]
    fn test_set_slot_validates_range() {
        let mut slots = SlotAssignment::new(0, SlotValue::None, SlotValue::None);
        assert!(slots.set_slot(Slot::Second, 3, 3).is_err());
        assert!(slots.set_slot(Slot::Second, -2, 3).is_err());
        assert_eq!(slots.set_slot(Slot::Second, -1, 3).unwrap(), SlotChange::Unchanged);
        assert_eq!(slots.set_slot(Slot::Second, 2, 3).unwrap(), SlotChange::Applied);
    }

    #[test]
    fn test_selected_order() {
        let slots = SlotAssignment::new(4, SlotValue::None, SlotValue::Entry(1));
        assert_eq!(slots.selected(), vec![(Slot::First, 4), (Slot::Third, 1)]);
    }

    #[test]
    fn test_slot_parse() {
        assert_eq!(Slot::parse("slot2"), Some(Slot::Second));
        assert_eq!(Slot::parse("3"), Some(Slot::Third));
        assert_eq!(Slot::parse("4"), None);
        assert_eq!(Slot::First.settings_key(), "translation_slot1");
    }
}
