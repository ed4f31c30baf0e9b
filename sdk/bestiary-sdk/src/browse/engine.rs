//! The filter-merge engine.
//!
//! A pure, synchronous recomputation over whatever data is currently
//! available: it selects a candidate pool from the active filter dimensions,
//! decides which candidates still need hydration, applies the secondary
//! predicate filters, de-duplicates by ID and re-sorts from scratch. It never
//! suspends; incompleteness is reported through `still_resolving` and
//! `hydration_wanted` instead, and the driver recomputes when more data
//! arrives.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use bestiary_catalog::{CreatureId, SummaryRef};

use crate::models::creature::Creature;
use crate::models::criteria::{FilterCriteria, SortOrder};
use crate::models::registry;

// ---------------------------------------------------------------------------
// Dimension pools
// ---------------------------------------------------------------------------

/// The member-ID set of one filter axis, with names where the membership
/// listing provided them (curated ID lists carry none).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionPool {
    members: BTreeMap<CreatureId, Option<String>>,
}

impl DimensionPool {
    pub fn from_listing(members: &[SummaryRef]) -> Self {
        let mut pool = Self::default();
        pool.absorb_listing(members);
        pool
    }

    pub fn from_ids(ids: impl IntoIterator<Item = CreatureId>) -> Self {
        let mut pool = Self::default();
        pool.absorb_ids(ids);
        pool
    }

    /// Union in one membership listing.
    pub fn absorb_listing(&mut self, members: &[SummaryRef]) {
        for member in members {
            self.members
                .entry(member.id)
                .and_modify(|name| {
                    if name.is_none() {
                        *name = Some(member.name.clone());
                    }
                })
                .or_insert_with(|| Some(member.name.clone()));
        }
    }

    /// Union in bare IDs without names.
    pub fn absorb_ids(&mut self, ids: impl IntoIterator<Item = CreatureId>) {
        for id in ids {
            self.members.entry(id).or_insert(None);
        }
    }

    pub fn contains(&self, id: CreatureId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = CreatureId> + '_ {
        self.members.keys().copied()
    }

    pub fn name_of(&self, id: CreatureId) -> Option<&str> {
        self.members.get(&id).and_then(|name| name.as_deref())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Inputs / outcome
// ---------------------------------------------------------------------------

/// Everything the engine reads. Pools are `None` while their data has not
/// arrived; a selected dimension without its pool contributes an empty set
/// and flags the view as still resolving.
#[derive(Debug)]
pub struct MergeInputs<'a> {
    /// Accumulated paginated listing, arrival order.
    pub paginated: &'a [SummaryRef],
    /// Enrichments keyed by ID: hydrated full records and placeholders for
    /// permanently failed fetches.
    pub details: &'a HashMap<CreatureId, Creature>,
    /// Union of the selected category groups' members.
    pub group_pool: Option<&'a DimensionPool>,
    /// Union of the selected tags' members.
    pub tag_pool: Option<&'a DimensionPool>,
    /// Externally supplied curated ID list, when browsing one.
    pub curated: Option<&'a DimensionPool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Ordered, de-duplicated view.
    pub items: Vec<Creature>,
    /// True while the view may be incomplete pending outstanding fetches.
    pub still_resolving: bool,
    /// Candidate IDs the driver should hydrate next.
    pub hydration_wanted: BTreeSet<CreatureId>,
}

// ---------------------------------------------------------------------------
// The merge
// ---------------------------------------------------------------------------

pub fn merge(inputs: &MergeInputs<'_>, criteria: &FilterCriteria) -> MergeOutcome {
    let empty = DimensionPool::default();
    let tier_pool = tier_union(criteria);

    // Every *active* dimension constrains the pool; unselected dimensions
    // never do. Tier-A and tier-B were already unioned into one pool.
    let mut active: Vec<&DimensionPool> = Vec::new();
    let mut awaiting_pool = false;
    if !criteria.groups.is_empty() {
        match inputs.group_pool {
            Some(pool) => active.push(pool),
            None => {
                awaiting_pool = true;
                active.push(&empty);
            },
        }
    }
    if !criteria.tags.is_empty() {
        match inputs.tag_pool {
            Some(pool) => active.push(pool),
            None => {
                awaiting_pool = true;
                active.push(&empty);
            },
        }
    }
    if let Some(pool) = &tier_pool {
        active.push(pool);
    }
    if let Some(curated) = inputs.curated {
        active.push(curated);
    }

    let paginated_names: HashMap<CreatureId, &str> = inputs
        .paginated
        .iter()
        .map(|summary| (summary.id, summary.name.as_str()))
        .collect();

    let needs_detail = criteria.needs_full_detail();
    let mut hydration_wanted = BTreeSet::new();
    let mut candidates: Vec<Creature> = Vec::new();

    if let Some((base, rest)) = active.split_first() {
        // pool selection: intersection of every active dimension
        for id in base.ids() {
            if !rest.iter().all(|pool| pool.contains(id)) {
                continue;
            }
            let listed_name = active
                .iter()
                .find_map(|pool| pool.name_of(id))
                .or_else(|| paginated_names.get(&id).copied());
            let record = record_for(inputs.details, id, listed_name);
            if wants_hydration(inputs.details, &record, needs_detail) {
                hydration_wanted.insert(id);
            }
            candidates.push(record);
        }
    } else {
        // no dimension active: the paginated sequence is the pool
        let mut seen = BTreeSet::new();
        for summary in inputs.paginated {
            if !seen.insert(summary.id) {
                continue;
            }
            let record = record_for(inputs.details, summary.id, Some(&summary.name));
            if wants_hydration(inputs.details, &record, needs_detail) {
                hydration_wanted.insert(summary.id);
            }
            candidates.push(record);
        }
    }

    apply_secondary_filters(&mut candidates, criteria);
    sort(&mut candidates, criteria.sort);

    MergeOutcome {
        still_resolving: !hydration_wanted.is_empty() || awaiting_pool,
        items: candidates,
        hydration_wanted,
    }
}

/// The union of the selected tiers' member sets.
///
/// When both flags are set an entity needs to match one tier or the other,
/// not both: the union feeds into the outer intersection. Deliberate
/// exception to the intersection rule; do not generalize.
fn tier_union(criteria: &FilterCriteria) -> Option<DimensionPool> {
    if !criteria.tier_a && !criteria.tier_b {
        return None;
    }
    let mut pool = DimensionPool::default();
    if criteria.tier_a {
        pool.absorb_ids(registry::TIER_A.iter().copied());
    }
    if criteria.tier_b {
        pool.absorb_ids(registry::TIER_B.iter().copied());
    }
    Some(pool)
}

/// The view record for one candidate: the enrichment map wins over listing
/// data, listing names fill gaps, and an ID nobody has named yet stays
/// unnamed until hydration.
fn record_for(
    details: &HashMap<CreatureId, Creature>,
    id: CreatureId,
    listed_name: Option<&str>,
) -> Creature {
    match details.get(&id) {
        Some(enriched) => {
            let mut record = enriched.clone();
            if record.name().is_none() {
                if let Some(name) = listed_name {
                    record.merge(Creature::summary(id, name));
                }
            }
            record
        },
        None => match listed_name {
            Some(name) => Creature::summary(id, name),
            None => Creature::unnamed(id),
        },
    }
}

/// Whether this candidate should be hydrated: nothing resolved for it yet
/// (placeholders count as resolved, or they would be re-requested forever)
/// and either an active filter needs full detail or we don't even know its
/// name.
fn wants_hydration(
    details: &HashMap<CreatureId, Creature>,
    record: &Creature,
    needs_detail: bool,
) -> bool {
    let unresolved = match details.get(&record.id()) {
        None => true,
        Some(existing) => existing.is_summary() && !existing.is_placeholder(),
    };
    unresolved && (needs_detail || record.name().is_none())
}

/// Conjunctive predicate filters over the candidate pool. Entities lacking
/// hydration are treated as non-matching by the filters that require full
/// detail.
fn apply_secondary_filters(candidates: &mut Vec<Creature>, criteria: &FilterCriteria) {
    let query = criteria.search_term().map(str::to_lowercase);
    candidates.retain(|record| {
        if let Some(query) = &query {
            let name_match = record
                .name()
                .map(|name| name.to_lowercase().contains(query))
                .unwrap_or(false);
            let id_match = record.id().to_string().starts_with(query.as_str());
            if !name_match && !id_match {
                return false;
            }
        }
        if let Some(min) = criteria.min_height {
            if !record
                .height()
                .is_some_and(|height| f64::from(height) >= min * 10.0)
            {
                return false;
            }
        }
        if let Some(max) = criteria.max_height {
            if !record
                .height()
                .is_some_and(|height| f64::from(height) <= max * 10.0)
            {
                return false;
            }
        }
        if let Some(min) = criteria.min_weight {
            if !record
                .weight()
                .is_some_and(|weight| f64::from(weight) >= min * 10.0)
            {
                return false;
            }
        }
        if let Some(max) = criteria.max_weight {
            if !record
                .weight()
                .is_some_and(|weight| f64::from(weight) <= max * 10.0)
            {
                return false;
            }
        }
        if criteria.has_successor && registry::is_terminal(record.id()) {
            return false;
        }
        true
    });
}

/// Full re-sort on every recomputation; stable and deterministic.
fn sort(candidates: &mut [Creature], order: SortOrder) {
    match order {
        SortOrder::ById => candidates.sort_by_key(|record| record.id()),
        SortOrder::ByName => candidates.sort_by(|a, b| match (a.name(), b.name()) {
            (Some(x), Some(y)) => x
                .to_lowercase()
                .cmp(&y.to_lowercase())
                .then_with(|| a.id().cmp(&b.id())),
            // unnamed records (unresolved or placeholder) go last
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id().cmp(&b.id()),
        }),
    }
}
