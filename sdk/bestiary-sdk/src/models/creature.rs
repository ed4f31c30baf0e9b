//! The creature record and its merge rules.
//!
//! A record is a tagged union: `Summary` from listing and membership
//! endpoints, `Full` from the detail endpoint. Merging only ever upgrades
//! `Summary` to `Full`; a record is never downgraded, even when a summary
//! listing is refetched after hydration.

use bestiary_catalog::{Ability, BaseStat, CreatureDetail, CreatureId, SummaryRef};
use serde::{Deserialize, Serialize};

/// One catalog entity, as much of it as we currently know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Creature {
    Summary(SummaryRecord),
    Full(FullRecord),
}

/// Listing-level knowledge of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: CreatureId,
    /// `None` when no listing has told us the name yet.
    pub name: Option<String>,
    /// Set when a detail fetch for this entity failed permanently; the
    /// record stands in for the entity instead of dropping it, and is not
    /// re-requested on every recomputation.
    pub placeholder: bool,
}

/// Fully hydrated entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullRecord {
    pub id: CreatureId,
    pub name: String,
    pub category_tags: Vec<String>,
    /// Decimeters; `0` means unknown.
    pub height: u32,
    /// Hectograms; `0` means unknown.
    pub weight: u32,
    pub abilities: Vec<Ability>,
    pub base_stats: Vec<BaseStat>,
    pub moves: Vec<String>,
}

impl Creature {
    /// Placeholder for an entity whose detail fetch failed: ID, fallback
    /// name, empty category tags.
    pub fn placeholder(id: CreatureId) -> Self {
        Creature::Summary(SummaryRecord {
            id,
            name: None,
            placeholder: true,
        })
    }

    pub fn summary(id: CreatureId, name: impl Into<String>) -> Self {
        Creature::Summary(SummaryRecord {
            id,
            name: Some(name.into()),
            placeholder: false,
        })
    }

    /// An entity known only by ID so far (e.g. from a curated ID list).
    pub fn unnamed(id: CreatureId) -> Self {
        Creature::Summary(SummaryRecord {
            id,
            name: None,
            placeholder: false,
        })
    }

    pub fn id(&self) -> CreatureId {
        match self {
            Creature::Summary(record) => record.id,
            Creature::Full(record) => record.id,
        }
    }

    /// Canonical name when known, otherwise a deterministic fallback.
    pub fn display_name(&self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => format!("creature-{}", self.id()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Creature::Summary(record) => record.name.as_deref(),
            Creature::Full(record) => Some(&record.name),
        }
    }

    /// Empty until hydrated.
    pub fn category_tags(&self) -> &[String] {
        match self {
            Creature::Summary(_) => &[],
            Creature::Full(record) => &record.category_tags,
        }
    }

    /// Height in storage units, `None` while summary-only or unknown.
    pub fn height(&self) -> Option<u32> {
        match self {
            Creature::Full(record) if record.height > 0 => Some(record.height),
            _ => None,
        }
    }

    /// Weight in storage units, `None` while summary-only or unknown.
    pub fn weight(&self) -> Option<u32> {
        match self {
            Creature::Full(record) if record.weight > 0 => Some(record.weight),
            _ => None,
        }
    }

    pub fn is_summary(&self) -> bool {
        matches!(self, Creature::Summary(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Creature::Summary(record) if record.placeholder)
    }

    /// Merge `incoming` knowledge about the same entity into `self`.
    ///
    /// Full records win over summaries and replace older full records;
    /// a summary never replaces a full record. Among summaries, a name is
    /// kept over no name and the placeholder marker is sticky only while
    /// nothing better arrives.
    pub fn merge(&mut self, incoming: Creature) {
        debug_assert_eq!(self.id(), incoming.id());
        match incoming {
            Creature::Full(_) => *self = incoming,
            Creature::Summary(incoming) => match self {
                Creature::Full(_) => {},
                Creature::Summary(existing) => {
                    if incoming.name.is_some() {
                        existing.name = incoming.name;
                        existing.placeholder = incoming.placeholder;
                    }
                },
            },
        }
    }
}

impl From<SummaryRef> for Creature {
    fn from(summary: SummaryRef) -> Self {
        Creature::summary(summary.id, summary.name)
    }
}

impl From<CreatureDetail> for Creature {
    fn from(detail: CreatureDetail) -> Self {
        Creature::Full(FullRecord {
            id: detail.id,
            name: detail.name,
            category_tags: detail.category_tags,
            height: detail.height,
            weight: detail.weight,
            abilities: detail.abilities,
            base_stats: detail.base_stats,
            moves: detail.moves,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn full(id: CreatureId, name: &str) -> Creature {
        Creature::Full(FullRecord {
            id,
            name: name.to_string(),
            category_tags: vec!["electric".to_string()],
            height: 4,
            weight: 60,
            abilities: vec![],
            base_stats: vec![],
            moves: vec![],
        })
    }

    #[test]
    fn summary_upgrades_to_full() {
        let mut record = Creature::summary(25, "pikachu");
        record.merge(full(25, "pikachu"));
        assert!(!record.is_summary());
    }

    #[test]
    fn full_never_downgrades_to_summary() {
        let mut record = full(25, "pikachu");
        record.merge(Creature::summary(25, "pikachu"));
        assert!(!record.is_summary());
        record.merge(Creature::placeholder(25));
        assert!(!record.is_summary());
    }

    #[test]
    fn named_summary_replaces_placeholder() {
        let mut record = Creature::placeholder(25);
        record.merge(Creature::summary(25, "pikachu"));
        assert!(!record.is_placeholder());
        assert_eq!(record.name(), Some("pikachu"));
    }

    #[test]
    fn nameless_summary_does_not_erase_a_name() {
        let mut record = Creature::summary(25, "pikachu");
        record.merge(Creature::placeholder(25));
        assert_eq!(record.name(), Some("pikachu"));
    }

    #[test]
    fn placeholder_has_fallback_name_and_no_tags() {
        let record = Creature::placeholder(999);
        assert_eq!(record.display_name(), "creature-999");
        assert!(record.category_tags().is_empty());
        assert!(record.is_placeholder());
    }

    #[test]
    fn zero_physicals_read_as_unknown() {
        let mut record = full(25, "pikachu");
        if let Creature::Full(ref mut full) = record {
            full.height = 0;
        }
        assert_eq!(record.height(), None);
        assert_eq!(record.weight(), Some(60));
    }
}
