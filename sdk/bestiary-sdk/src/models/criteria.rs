//! Per-session filter criteria for the browsing view.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Active filter dimensions and secondary predicates.
///
/// An unset bound never excludes; an empty selected-set means "no
/// constraint", not "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Selected category groups (generation-like partitions of the ID space).
    pub groups: BTreeSet<u8>,
    /// Selected tags; entities matching ANY selected tag qualify.
    pub tags: BTreeSet<String>,
    /// Height bounds in display units (meters); inclusive.
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
    /// Weight bounds in display units (kilograms); inclusive.
    pub min_weight: Option<f64>,
    pub max_weight: Option<f64>,
    pub tier_a: bool,
    pub tier_b: bool,
    /// Keep only entities with a known evolutionary successor.
    pub has_successor: bool,
    /// Free-text search over name and ID.
    pub search: String,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    ById,
    ByName,
}

impl FilterCriteria {
    /// Whether any dimension constrains the candidate pool (as opposed to
    /// the secondary predicates, which filter within it).
    pub fn pool_dimension_active(&self) -> bool {
        !self.groups.is_empty() || !self.tags.is_empty() || self.tier_a || self.tier_b
    }

    /// Whether any active secondary filter needs fully hydrated records.
    pub fn needs_full_detail(&self) -> bool {
        self.min_height.is_some()
            || self.max_height.is_some()
            || self.min_weight.is_some()
            || self.max_weight.is_some()
    }

    pub fn search_term(&self) -> Option<&str> {
        let trimmed = self.search.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
