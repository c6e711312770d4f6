//! Identity types shared by every layer: variables, sites, logical time.

use std::fmt;

use crate::error::CoordinatorError;

/// One of the twenty data items `x1`..`x20`.
///
/// Placement follows the fixed rule from the data model: even-indexed variables are
/// replicated at all ten sites, odd-indexed variables live only at `1 + (i mod 10)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(u32);

impl VariableId {
    /// Lowest valid index.
    pub const MIN: u32 = 1;
    /// Highest valid index.
    pub const MAX: u32 = 20;

    /// Construct from a numeric index, validating the `1..=20` range.
    pub fn new(index: u32) -> Result<Self, CoordinatorError> {
        if (Self::MIN..=Self::MAX).contains(&index) {
            Ok(Self(index))
        } else {
            Err(CoordinatorError::InvalidVariable {
                name: format!("x{index}"),
            })
        }
    }

    /// Numeric index (`1..=20`).
    pub fn index(self) -> u32 {
        self.0
    }

    /// True for even-indexed variables, replicated at every site.
    pub fn is_replicated(self) -> bool {
        self.0 % 2 == 0
    }

    /// The unique home site for a non-replicated (odd-indexed) variable.
    ///
    /// # Panics
    ///
    /// Panics if called on a replicated variable; callers must check
    /// [`VariableId::is_replicated`] first.
    pub fn home_site(self) -> SiteId {
        assert!(!self.is_replicated(), "x{} is replicated, has no unique home site", self.0);
        SiteId::new(1 + (self.0 % 10)).expect("1 + (i % 10) is always in 1..=10")
    }

    /// Initial value committed at logical time 0: `10 * i`.
    pub fn initial_value(self) -> Value {
        Value(10 * self.0 as i64)
    }

    /// Parse the `xNN` textual form used in the command stream.
    pub fn parse(text: &str) -> Result<Self, CoordinatorError> {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix('x').ok_or_else(|| CoordinatorError::InvalidVariable {
            name: trimmed.to_string(),
        })?;
        let index: u32 = digits.parse().map_err(|_| CoordinatorError::InvalidVariable {
            name: trimmed.to_string(),
        })?;
        Self::new(index)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Identity of one of the ten sites, `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId(u8);

impl SiteId {
    /// Lowest valid site id.
    pub const MIN: u8 = 1;
    /// Highest valid site id.
    pub const MAX: u8 = 10;

    /// Construct from a numeric id, validating the `1..=10` range.
    pub fn new(id: u8) -> Result<Self, CoordinatorError> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(CoordinatorError::InvalidSite { id: id as i64 })
        }
    }

    /// Iterate all ten site ids in ascending order.
    pub fn all() -> impl Iterator<Item = SiteId> {
        (Self::MIN..=Self::MAX).map(|id| SiteId(id))
    }

    /// Numeric id (`1..=10`).
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The logical clock: a monotonically non-decreasing tick count, advanced by exactly
/// one after every command. Not wall-clock time — see `spec.md` section 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LogicalTime(u64);

impl LogicalTime {
    /// The clock's value at startup, before any command is processed.
    pub const ZERO: LogicalTime = LogicalTime(0);

    /// Wrap a raw tick count.
    pub fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Raw tick count.
    pub fn get(self) -> u64 {
        self.0
    }

    /// The next tick.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed integer value, the `v` in `W(T, x, v)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Value(pub i64);

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entry in a site's per-variable commit history: either a real committed value,
/// or the "unreadable" sentinel a recovered replica carries until its next real write.
///
/// See `spec.md` section 9, "Unreadable sentinel": modeled as a sum type rather than a
/// parallel bitmap, so a history is simply `Vec<(LogicalTime, Slot)>` and snapshot reads
/// skip non-`Value` entries without a second lookup structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A real committed value.
    Value(Value),
    /// Masks the variable at this replica until a subsequent real write lands.
    Unreadable,
}

impl Slot {
    /// The value, if this slot is readable.
    pub fn value(self) -> Option<Value> {
        match self {
            Slot::Value(v) => Some(v),
            Slot::Unreadable => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_placement_matches_parity_rule() {
        assert!(VariableId::new(2).unwrap().is_replicated());
        assert!(!VariableId::new(1).unwrap().is_replicated());
        assert_eq!(VariableId::new(1).unwrap().home_site(), SiteId::new(2).unwrap());
        assert_eq!(VariableId::new(11).unwrap().home_site(), SiteId::new(2).unwrap());
        assert_eq!(VariableId::new(19).unwrap().home_site(), SiteId::new(10).unwrap());
    }

    #[test]
    fn variable_out_of_range_is_rejected() {
        assert!(VariableId::new(0).is_err());
        assert!(VariableId::new(21).is_err());
    }

    #[test]
    fn variable_parses_xn_form() {
        assert_eq!(VariableId::parse("x7").unwrap().index(), 7);
        assert_eq!(VariableId::parse(" x20 ").unwrap().index(), 20);
        assert!(VariableId::parse("7").is_err());
        assert!(VariableId::parse("x0").is_err());
    }

    #[test]
    fn initial_value_is_ten_times_index() {
        assert_eq!(VariableId::new(4).unwrap().initial_value(), Value(40));
    }

    #[test]
    fn site_range_is_one_to_ten() {
        assert!(SiteId::new(1).is_ok());
        assert!(SiteId::new(10).is_ok());
        assert!(SiteId::new(0).is_err());
        assert!(SiteId::new(11).is_err());
        assert_eq!(SiteId::all().count(), 10);
    }

    #[test]
    fn slot_value_extraction() {
        assert_eq!(Slot::Value(Value(5)).value(), Some(Value(5)));
        assert_eq!(Slot::Unreadable.value(), None);
    }

    proptest::proptest! {
        // Every valid index round-trips through Display/parse, and home_site (for the
        // odd half) always lands back in 1..=10 regardless of which odd index is
        // picked.
        #[test]
        fn every_valid_index_round_trips_and_places_correctly(index in VariableId::MIN..=VariableId::MAX) {
            let var = VariableId::new(index).unwrap();
            prop_assert_eq!(VariableId::parse(&var.to_string()).unwrap(), var);
            if !var.is_replicated() {
                let home = var.home_site();
                prop_assert!((SiteId::MIN..=SiteId::MAX).contains(&home.get()));
            }
            prop_assert_eq!(var.initial_value(), Value(10 * index as i64));
        }
    }
}
