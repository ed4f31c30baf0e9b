//! Static reference data about the catalog's ID space.
//!
//! Everything here is a pure function of the entity ID: the two curated
//! tiers, the category-group (generation) partitions, and the terminal-ID
//! list backing the "has successor" filter. None of it is ever fetched.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use bestiary_catalog::CreatureId;

/// Highest entity ID the catalog currently assigns.
pub const MAX_CREATURE_ID: CreatureId = 1025;

/// Tier-A curated IDs.
///
/// Kept disjoint from [`TIER_B`]: where the upstream classification would
/// apply both, tier-B (the more exclusive tier) takes precedence and the ID
/// is listed there only.
pub static TIER_A: LazyLock<BTreeSet<CreatureId>> = LazyLock::new(|| {
    [
        144, 145, 146, 150, // first partition
        243, 244, 245, 249, 250, // second
        377, 378, 379, 380, 381, 382, 383, 384, // third
        480, 481, 482, 483, 484, 485, 486, 487, 488, // fourth
        638, 639, 640, 641, 642, 643, 644, 645, 646, // fifth
        716, 717, 718, // sixth
        785, 786, 787, 788, 789, 790, 791, 792, 800, // seventh
        888, 889, 890, 891, 892, 894, 895, 896, 897, 898, // eighth
        1001, 1002, 1003, 1004, 1007, 1008, 1009, 1010, 1014, 1015, 1016, 1017, 1024, // ninth
    ]
    .into_iter()
    .collect()
});

/// Tier-B curated IDs.
pub static TIER_B: LazyLock<BTreeSet<CreatureId>> = LazyLock::new(|| {
    [
        151, 251, 385, 386, 489, 490, 491, 492, 493, 494, 647, 648, 649, 719, 720, 721, 801, 802,
        807, 808, 809, 893, 1025,
    ]
    .into_iter()
    .collect()
});

pub fn is_tier_a(id: CreatureId) -> bool {
    TIER_A.contains(&id)
}

pub fn is_tier_b(id: CreatureId) -> bool {
    TIER_B.contains(&id)
}

/// Contiguous ID ranges of the nine category groups.
pub const GENERATION_RANGES: [RangeInclusive<CreatureId>; 9] = [
    1..=151,
    152..=251,
    252..=386,
    387..=493,
    494..=649,
    650..=721,
    722..=809,
    810..=905,
    906..=1025,
];

/// ID range of one category group (1-based), if the group exists.
pub fn generation_span(group: u8) -> Option<RangeInclusive<CreatureId>> {
    (1..=GENERATION_RANGES.len() as u8)
        .contains(&group)
        .then(|| GENERATION_RANGES[group as usize - 1].clone())
}

/// Category group an ID belongs to.
pub fn generation_of(id: CreatureId) -> Option<u8> {
    GENERATION_RANGES
        .iter()
        .position(|range| range.contains(&id))
        .map(|index| index as u8 + 1)
}

/// IDs known to have no evolutionary successor.
///
/// A hardcoded approximation over the early ID space, not a graph
/// traversal; the "has successor" filter is exactly as good as this list.
pub static TERMINAL_IDS: LazyLock<BTreeSet<CreatureId>> = LazyLock::new(|| {
    [
        83, 84, 85, 108, 113, 115, 128, 131, 132, 133, 134, 135, 136, 137, 138, 139, 140, 141,
        142, 143, 144, 145, 146, 147, 148, 149, 150, 151,
    ]
    .into_iter()
    .collect()
});

pub fn is_terminal(id: CreatureId) -> bool {
    TERMINAL_IDS.contains(&id)
}
