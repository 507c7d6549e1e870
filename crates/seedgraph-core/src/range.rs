use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive bounds of the keys a sink assigned to a table's rows.
///
/// Ranges are never empty: a table seeded with zero rows has no range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifierRange {
    min: i64,
    max: i64,
}

impl IdentifierRange {
    pub fn new(min: i64, max: i64) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// The 1-based logical range `[1, count]` used for tables without generated keys.
    pub fn positional(count: u64) -> Option<Self> {
        let max = i64::try_from(count).ok()?;
        Self::new(1, max)
    }

    /// Range covering `keys` when they form one contiguous run.
    pub fn from_contiguous(keys: &[i64]) -> Option<Self> {
        let min = *keys.iter().min()?;
        let max = *keys.iter().max()?;
        let range = Self::new(min, max)?;
        (range.len() == keys.len() as u64).then_some(range)
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn len(&self) -> u64 {
        self.max.abs_diff(self.min) + 1
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl fmt::Display for IdentifierRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
