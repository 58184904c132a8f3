use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One listing row exactly as found in the markup.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub id: String,
    pub name: String,
    pub alt_name: Option<String>,
    pub avatar: String,
    pub details_path: String,
    pub types: Vec<String>,
    /// total, HP, attack, defense, sp_attack, sp_defense, speed
    pub stats: [String; 7],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    pub avatar: String,
    pub details_path: String,
    pub types: Vec<String>,
    pub total: u32,
    #[serde(rename = "HP")]
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,
    pub entry: String,
}

#[derive(Debug, Error)]
#[error("field `{field}` is not an integer: {value:?}")]
pub struct ConversionError {
    pub field: &'static str,
    pub value: String,
}

const STAT_FIELDS: [&str; 7] = [
    "total",
    "HP",
    "attack",
    "defense",
    "sp_attack",
    "sp_defense",
    "speed",
];

fn to_int(field: &'static str, value: &str) -> Result<u32, ConversionError> {
    value.trim().parse().map_err(|_| ConversionError {
        field,
        value: value.to_string(),
    })
}

/// Type the raw row. The alternate short-form name wins over the link text.
pub fn normalize(raw: RawRow, entry: String) -> Result<Pokemon, ConversionError> {
    let id = to_int("id", &raw.id)?;
    let mut stats = [0u32; 7];
    for (i, slot) in stats.iter_mut().enumerate() {
        *slot = to_int(STAT_FIELDS[i], &raw.stats[i])?;
    }
    let [total, hp, attack, defense, sp_attack, sp_defense, speed] = stats;

    Ok(Pokemon {
        id,
        name: raw.alt_name.unwrap_or(raw.name),
        avatar: raw.avatar,
        details_path: raw.details_path,
        types: raw.types,
        total,
        hp,
        attack,
        defense,
        sp_attack,
        sp_defense,
        speed,
        entry,
    })
}

// ── Tests ──
