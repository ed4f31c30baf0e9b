//! Catalog interaction types.
//!
//! Raw wire shapes (the `Raw*` structs) mirror what the remote catalog
//! actually sends, including its named-resource `{name, url}` convention
//! where an entity's numeric ID only appears as the trailing segment of its
//! resource URL. The public types are the normalized domain model; conversion
//! happens once, in this crate, so the SDK never sees a resource URL.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::CatalogClientError;

/// Stable numeric identifier of a creature, externally assigned.
pub type CreatureId = u32;

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Position of one fixed-size page in the catalog listing.
///
/// Opaque to callers: the first cursor comes from [`PageCursor::start`] and
/// every later one from the previous [`CatalogPage::next`], never from
/// arithmetic on the caller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor {
    offset: u32,
    limit: u32,
}

impl PageCursor {
    /// Cursor for the first page of a listing.
    pub fn start(limit: u32) -> Self {
        Self { offset: 0, limit }
    }

    /// Cursor at an explicit position. Real pagination should follow
    /// [`CatalogPage::next`] instead; this exists for canned responses.
    pub fn at(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Recover the follow-up cursor from the `next` URL the server returned.
    pub(crate) fn from_next_url(next: &str) -> Option<Self> {
        let url = Url::parse(next).ok()?;
        let mut offset = None;
        let mut limit = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "offset" => offset = value.parse().ok(),
                "limit" => limit = value.parse().ok(),
                _ => {},
            }
        }
        Some(Self {
            offset: offset?,
            limit: limit?,
        })
    }
}

/// One page of the catalog listing, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub summaries: Vec<SummaryRef>,
    /// Cursor for the next page, `None` when the listing is exhausted.
    pub next: Option<PageCursor>,
    /// Total number of entities the catalog reports for this listing.
    pub total: u64,
}

/// Listing-level view of an entity: ID and canonical lower-case name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRef {
    pub id: CreatureId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Full detail
// ---------------------------------------------------------------------------

/// Full record from the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureDetail {
    pub id: CreatureId,
    pub name: String,
    /// Ordered category tags, 1-2 typical.
    pub category_tags: Vec<String>,
    /// Height in decimeters; `0` means unknown.
    pub height: u32,
    /// Weight in hectograms; `0` means unknown.
    pub weight: u32,
    pub abilities: Vec<Ability>,
    pub base_stats: Vec<BaseStat>,
    /// First few move names; the full move list is not carried.
    pub moves: Vec<String>,
    /// URL of the richer species resource, if the catalog linked one.
    pub species_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStat {
    pub name: String,
    pub value: u32,
}

/// Classification and narrative metadata from the species endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesInfo {
    pub id: CreatureId,
    pub name: String,
    /// English description with form feeds normalized to spaces.
    pub description: String,
    pub generation: String,
    pub capture_rate: u32,
    pub habitat: Option<String>,
    pub legendary: bool,
    pub mythical: bool,
    /// URL of the evolution graph resource, if any.
    pub evolution_graph: Option<String>,
}

/// One node of the evolution graph; branching factor is arbitrary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionNode {
    pub id: CreatureId,
    pub name: String,
    pub evolves_to: Vec<EvolutionNode>,
}

impl EvolutionNode {
    /// Depth-first linearization for display; branches flatten in order.
    pub fn flatten(&self) -> Vec<SummaryRef> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into(&self, out: &mut Vec<SummaryRef>) {
        out.push(SummaryRef {
            id: self.id,
            name: self.name.clone(),
        });
        for child in &self.evolves_to {
            child.collect_into(out);
        }
    }
}

/// Recover an entity ID from its resource URL (trailing path segment).
pub fn creature_id_from_url(url: &str) -> Result<CreatureId, CatalogClientError> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| {
            CatalogClientError::Malformed(format!("no entity id in resource url {url}"))
        })
}

// ---------------------------------------------------------------------------
// Raw wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RawNamedResource {
    pub(crate) name: String,
    pub(crate) url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawUrlResource {
    pub(crate) url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPage {
    pub(crate) count: u64,
    pub(crate) next: Option<String>,
    pub(crate) results: Vec<RawNamedResource>,
}

impl From<RawPage> for CatalogPage {
    fn from(raw: RawPage) -> Self {
        let summaries = raw
            .results
            .into_iter()
            .filter_map(|entry| match creature_id_from_url(&entry.url) {
                Ok(id) => Some(SummaryRef {
                    id,
                    name: entry.name,
                }),
                Err(_) => {
                    warn!(name = %entry.name, url = %entry.url, "skipping listing entry without id");
                    None
                },
            })
            .collect();
        CatalogPage {
            summaries,
            next: raw.next.as_deref().and_then(PageCursor::from_next_url),
            total: raw.count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCreature {
    pub(crate) id: CreatureId,
    pub(crate) name: String,
    pub(crate) height: u32,
    pub(crate) weight: u32,
    pub(crate) types: Vec<RawTypeSlot>,
    pub(crate) abilities: Vec<RawAbilitySlot>,
    pub(crate) stats: Vec<RawStatSlot>,
    pub(crate) moves: Vec<RawMoveSlot>,
    pub(crate) species: Option<RawNamedResource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTypeSlot {
    #[serde(rename = "type")]
    pub(crate) tag: RawNamedResource,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAbilitySlot {
    pub(crate) ability: RawNamedResource,
    pub(crate) is_hidden: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawStatSlot {
    pub(crate) base_stat: u32,
    pub(crate) stat: RawNamedResource,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMoveSlot {
    #[serde(rename = "move")]
    pub(crate) mv: RawNamedResource,
}

/// Number of move names carried on a normalized detail record.
const MOVES_CARRIED: usize = 10;

impl From<RawCreature> for CreatureDetail {
    fn from(raw: RawCreature) -> Self {
        CreatureDetail {
            id: raw.id,
            name: raw.name,
            category_tags: raw.types.into_iter().map(|slot| slot.tag.name).collect(),
            height: raw.height,
            weight: raw.weight,
            abilities: raw
                .abilities
                .into_iter()
                .map(|slot| Ability {
                    name: slot.ability.name,
                    hidden: slot.is_hidden,
                })
                .collect(),
            base_stats: raw
                .stats
                .into_iter()
                .map(|slot| BaseStat {
                    name: slot.stat.name,
                    value: slot.base_stat,
                })
                .collect(),
            moves: raw
                .moves
                .into_iter()
                .take(MOVES_CARRIED)
                .map(|slot| slot.mv.name)
                .collect(),
            species_ref: raw.species.map(|species| species.url),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSpecies {
    pub(crate) id: CreatureId,
    pub(crate) name: String,
    pub(crate) flavor_text_entries: Vec<RawFlavorText>,
    pub(crate) generation: RawNamedResource,
    pub(crate) capture_rate: u32,
    pub(crate) habitat: Option<RawNamedResource>,
    pub(crate) is_legendary: bool,
    pub(crate) is_mythical: bool,
    pub(crate) evolution_chain: Option<RawUrlResource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFlavorText {
    pub(crate) flavor_text: String,
    pub(crate) language: RawNamedResource,
}

impl From<RawSpecies> for SpeciesInfo {
    fn from(raw: RawSpecies) -> Self {
        let description = raw
            .flavor_text_entries
            .iter()
            .find(|entry| entry.language.name == "en")
            .map(|entry| entry.flavor_text.replace('\u{c}', " "))
            .unwrap_or_default();
        SpeciesInfo {
            id: raw.id,
            name: raw.name,
            description,
            generation: raw.generation.name,
            capture_rate: raw.capture_rate,
            habitat: raw.habitat.map(|habitat| habitat.name),
            legendary: raw.is_legendary,
            mythical: raw.is_mythical,
            evolution_graph: raw.evolution_chain.map(|chain| chain.url),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEvolutionGraph {
    pub(crate) chain: RawChainLink,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawChainLink {
    pub(crate) species: RawNamedResource,
    #[serde(default)]
    pub(crate) evolves_to: Vec<RawChainLink>,
}

impl TryFrom<RawChainLink> for EvolutionNode {
    type Error = CatalogClientError;

    fn try_from(raw: RawChainLink) -> Result<Self, CatalogClientError> {
        let id = creature_id_from_url(&raw.species.url)?;
        let evolves_to = raw
            .evolves_to
            .into_iter()
            .map(EvolutionNode::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EvolutionNode {
            id,
            name: raw.species.name,
            evolves_to,
        })
    }
}

/// Membership listing for one group or tag; full membership in one call.
#[derive(Debug, Deserialize)]
pub(crate) struct RawMembership {
    pub(crate) members: Vec<RawNamedResource>,
}

impl From<RawMembership> for Vec<SummaryRef> {
    fn from(raw: RawMembership) -> Self {
        raw.members
            .into_iter()
            .filter_map(|entry| match creature_id_from_url(&entry.url) {
                Ok(id) => Some(SummaryRef {
                    id,
                    name: entry.name,
                }),
                Err(_) => {
                    warn!(name = %entry.name, "skipping membership entry without id");
                    None
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn id_recovered_from_trailing_segment() {
        assert_eq!(
            creature_id_from_url("https://catalog.test/api/v2/creature/25/").unwrap(),
            25
        );
        assert_eq!(
            creature_id_from_url("https://catalog.test/api/v2/creature/25").unwrap(),
            25
        );
    }

    #[test]
    fn id_recovery_rejects_non_numeric_tail() {
        assert!(creature_id_from_url("https://catalog.test/api/v2/creature/pikachu/").is_err());
    }

    #[test]
    fn next_cursor_parsed_from_next_url() {
        let cursor =
            PageCursor::from_next_url("https://catalog.test/api/v2/creature?offset=40&limit=20")
                .unwrap();
        assert_eq!(cursor.offset(), 40);
        assert_eq!(cursor.limit(), 20);
    }

    #[test]
    fn next_cursor_requires_both_parameters() {
        assert_eq!(
            PageCursor::from_next_url("https://catalog.test/api/v2/creature?offset=40"),
            None
        );
    }

    #[test]
    fn evolution_flatten_is_depth_first() {
        let graph = EvolutionNode {
            id: 133,
            name: "eevee".to_string(),
            evolves_to: vec![
                EvolutionNode {
                    id: 134,
                    name: "vaporeon".to_string(),
                    evolves_to: vec![],
                },
                EvolutionNode {
                    id: 135,
                    name: "jolteon".to_string(),
                    evolves_to: vec![],
                },
            ],
        };
        let ids: Vec<_> = graph.flatten().into_iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![133, 134, 135]);
    }
}
