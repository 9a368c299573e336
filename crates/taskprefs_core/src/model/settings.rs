//! User preference model.
//!
//! # Responsibility
//! - Define the `Settings` value exposed to callers and UI composition.
//! - Own the persisted `SortOrder` encoding and its two-flag projection.
//!
//! # Invariants
//! - `SortOrder` <-> `SortFlags` conversion is lossless in both directions.
//! - Persisted sort order names are upper snake case and never change.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted sort order.
///
/// Four states packing two independent toggles. Used at the storage boundary
/// and in UI models; mutation logic works on [`SortFlags`] instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    #[default]
    None,
    ByDeadline,
    ByPriority,
    ByDeadlineAndPriority,
}

impl SortOrder {
    /// All variants in declaration order.
    pub const ALL: [SortOrder; 4] = [
        SortOrder::None,
        SortOrder::ByDeadline,
        SortOrder::ByPriority,
        SortOrder::ByDeadlineAndPriority,
    ];

    /// Returns the persisted name of this sort order.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::ByDeadline => "BY_DEADLINE",
            Self::ByPriority => "BY_PRIORITY",
            Self::ByDeadlineAndPriority => "BY_DEADLINE_AND_PRIORITY",
        }
    }

    /// Parses a persisted name. Matching is exact; no case folding.
    pub fn parse(value: &str) -> Result<Self, UnknownSortOrder> {
        match value {
            "NONE" => Ok(Self::None),
            "BY_DEADLINE" => Ok(Self::ByDeadline),
            "BY_PRIORITY" => Ok(Self::ByPriority),
            "BY_DEADLINE_AND_PRIORITY" => Ok(Self::ByDeadlineAndPriority),
            other => Err(UnknownSortOrder(other.to_string())),
        }
    }

    pub fn flags(self) -> SortFlags {
        SortFlags::from(self)
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted sort order name that is not one of the known variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortOrder(pub String);

impl Display for UnknownSortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown sort order `{}`", self.0)
    }
}

impl Error for UnknownSortOrder {}

/// Sort toggles as two independent axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SortFlags {
    pub by_deadline: bool,
    pub by_priority: bool,
}

impl SortFlags {
    /// Returns a copy with the deadline axis set to `enable`.
    pub fn with_deadline(self, enable: bool) -> Self {
        Self {
            by_deadline: enable,
            ..self
        }
    }

    /// Returns a copy with the priority axis set to `enable`.
    pub fn with_priority(self, enable: bool) -> Self {
        Self {
            by_priority: enable,
            ..self
        }
    }

    pub fn order(self) -> SortOrder {
        match (self.by_deadline, self.by_priority) {
            (false, false) => SortOrder::None,
            (true, false) => SortOrder::ByDeadline,
            (false, true) => SortOrder::ByPriority,
            (true, true) => SortOrder::ByDeadlineAndPriority,
        }
    }
}

impl From<SortOrder> for SortFlags {
    fn from(value: SortOrder) -> Self {
        match value {
            SortOrder::None => Self::default(),
            SortOrder::ByDeadline => Self {
                by_deadline: true,
                by_priority: false,
            },
            SortOrder::ByPriority => Self {
                by_deadline: false,
                by_priority: true,
            },
            SortOrder::ByDeadlineAndPriority => Self {
                by_deadline: true,
                by_priority: true,
            },
        }
    }
}

impl From<SortFlags> for SortOrder {
    fn from(value: SortFlags) -> Self {
        value.order()
    }
}

/// Current user preferences.
///
/// Absent persisted entries resolve to `Settings::default()` field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub show_completed: bool,
    pub sort: SortFlags,
}

impl Settings {
    pub fn new(show_completed: bool, sort_order: SortOrder) -> Self {
        Self {
            show_completed,
            sort: sort_order.into(),
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort.order()
    }
}
