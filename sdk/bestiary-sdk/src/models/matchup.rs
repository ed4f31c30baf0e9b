//! Category-effectiveness matrix.
//!
//! For each defending tag, the multipliers of attacking tags that deviate
//! from 1.0. Combined effectiveness for a multi-tag entity multiplies the
//! per-tag entries. Deterministic; the comparison surface consumes this
//! table directly.

/// Attacking-tag multipliers that deviate from 1.0 for one defending tag.
fn defense_chart(tag: &str) -> &'static [(&'static str, f64)] {
    match tag {
        "normal" => &[("fighting", 2.0), ("ghost", 0.0)],
        "fire" => &[
            ("water", 2.0),
            ("ground", 2.0),
            ("rock", 2.0),
            ("fire", 0.5),
            ("grass", 0.5),
            ("ice", 0.5),
            ("bug", 0.5),
            ("steel", 0.5),
            ("fairy", 0.5),
        ],
        "water" => &[
            ("electric", 2.0),
            ("grass", 2.0),
            ("water", 0.5),
            ("fire", 0.5),
            ("ice", 0.5),
            ("steel", 0.5),
        ],
        "electric" => &[
            ("ground", 2.0),
            ("electric", 0.5),
            ("flying", 0.5),
            ("steel", 0.5),
        ],
        "grass" => &[
            ("fire", 2.0),
            ("ice", 2.0),
            ("poison", 2.0),
            ("flying", 2.0),
            ("bug", 2.0),
            ("water", 0.5),
            ("electric", 0.5),
            ("grass", 0.5),
            ("ground", 0.5),
        ],
        "ice" => &[
            ("fire", 2.0),
            ("fighting", 2.0),
            ("rock", 2.0),
            ("steel", 2.0),
            ("ice", 0.5),
        ],
        "fighting" => &[
            ("flying", 2.0),
            ("psychic", 2.0),
            ("fairy", 2.0),
            ("bug", 0.5),
            ("rock", 0.5),
            ("dark", 0.5),
        ],
        "poison" => &[
            ("ground", 2.0),
            ("psychic", 2.0),
            ("grass", 0.5),
            ("fighting", 0.5),
            ("poison", 0.5),
            ("bug", 0.5),
            ("fairy", 0.5),
        ],
        "ground" => &[
            ("water", 2.0),
            ("grass", 2.0),
            ("ice", 2.0),
            ("poison", 0.5),
            ("rock", 0.5),
            ("electric", 0.0),
        ],
        "flying" => &[
            ("electric", 2.0),
            ("ice", 2.0),
            ("rock", 2.0),
            ("grass", 0.5),
            ("fighting", 0.5),
            ("bug", 0.5),
            ("ground", 0.0),
        ],
        "psychic" => &[
            ("bug", 2.0),
            ("ghost", 2.0),
            ("dark", 2.0),
            ("fighting", 0.5),
            ("psychic", 0.5),
        ],
        "bug" => &[
            ("fire", 2.0),
            ("flying", 2.0),
            ("rock", 2.0),
            ("grass", 0.5),
            ("fighting", 0.5),
            ("ground", 0.5),
        ],
        "rock" => &[
            ("water", 2.0),
            ("grass", 2.0),
            ("fighting", 2.0),
            ("ground", 2.0),
            ("steel", 2.0),
            ("normal", 0.5),
            ("fire", 0.5),
            ("poison", 0.5),
            ("flying", 0.5),
        ],
        "ghost" => &[
            ("ghost", 2.0),
            ("dark", 2.0),
            ("normal", 0.0),
            ("fighting", 0.0),
        ],
        "dragon" => &[
            ("ice", 2.0),
            ("dragon", 2.0),
            ("fairy", 2.0),
            ("fire", 0.5),
            ("water", 0.5),
            ("electric", 0.5),
            ("grass", 0.5),
        ],
        "dark" => &[
            ("fighting", 2.0),
            ("bug", 2.0),
            ("fairy", 2.0),
            ("ghost", 0.5),
            ("dark", 0.5),
            ("psychic", 0.0),
        ],
        "steel" => &[
            ("fire", 2.0),
            ("fighting", 2.0),
            ("ground", 2.0),
            ("normal", 0.5),
            ("grass", 0.5),
            ("ice", 0.5),
            ("flying", 0.5),
            ("psychic", 0.5),
            ("bug", 0.5),
            ("rock", 0.5),
            ("dragon", 0.5),
            ("steel", 0.5),
            ("fairy", 0.5),
            ("poison", 0.0),
        ],
        "fairy" => &[
            ("poison", 2.0),
            ("steel", 2.0),
            ("fighting", 0.5),
            ("bug", 0.5),
            ("dark", 0.5),
            ("dragon", 0.0),
        ],
        _ => &[],
    }
}

/// Combined defensive profile of a tag set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effectiveness {
    /// Attacking tags with a combined multiplier above 1, strongest first.
    pub weaknesses: Vec<(String, f64)>,
    /// Attacking tags with a combined multiplier below 1 (but not 0),
    /// strongest resistance first.
    pub resistances: Vec<(String, f64)>,
    /// Attacking tags with a combined multiplier of 0.
    pub immunities: Vec<String>,
}

/// Multiply per-tag entries across the set and bucket the result.
pub fn combined_effectiveness<S: AsRef<str>>(tags: &[S]) -> Effectiveness {
    let mut multipliers: Vec<(&'static str, f64)> = Vec::new();
    for tag in tags {
        for &(attacker, multiplier) in defense_chart(tag.as_ref()) {
            match multipliers.iter_mut().find(|(name, _)| *name == attacker) {
                Some(entry) => entry.1 *= multiplier,
                None => multipliers.push((attacker, multiplier)),
            }
        }
    }

    let mut result = Effectiveness::default();
    for (attacker, multiplier) in multipliers {
        if multiplier == 0.0 {
            result.immunities.push(attacker.to_string());
        } else if multiplier > 1.0 {
            result.weaknesses.push((attacker.to_string(), multiplier));
        } else if multiplier < 1.0 {
            result.resistances.push((attacker.to_string(), multiplier));
        }
    }
    // deterministic order: multiplier first, name as tie-break
    result
        .weaknesses
        .sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    result
        .resistances
        .sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    result.immunities.sort();
    result
}
