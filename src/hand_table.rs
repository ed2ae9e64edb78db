use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use itertools::Itertools;
use log::{info, warn};
use serde::Deserialize;

use crate::error::LoadError;

static DATA_DIR: Dir = include_dir!("src/data");

const BUNDLED_TABLE: &str = "hands.csv";

const KEY_COLUMN: &str = "Hand";
const CATEGORY_COLUMN: &str = "Color";
const TARGET_COLUMN: &str = "Players";

/// Weight given to rows whose `misses` cell is absent or not a number.
pub const DEFAULT_WEIGHT: u32 = 1;

/// One quiz entry: a starting hand and the answer the user has to recall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: String,
    pub label: String,
    pub category: String,
    pub target: u32,
    /// Selection weight, at least 1 once loaded.
    pub weight: u32,
    pub last_missed_at: Option<String>,
}

impl Item {
    pub fn new(key: &str, category: &str, target: u32, weight: u32) -> Self {
        let key = normalize_key(key);
        Self {
            label: display_label(&key),
            key,
            category: category.trim().to_string(),
            target,
            weight: weight.max(DEFAULT_WEIGHT),
            last_missed_at: None,
        }
    }
}

/// Where the reference table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Bundled,
    Path(PathBuf),
}

impl TableSource {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(TableSource::Bundled, TableSource::Path)
    }
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Hand", default)]
    hand: String,
    #[serde(rename = "Color", default)]
    color: String,
    #[serde(rename = "Players", default)]
    players: String,
    #[serde(default)]
    misses: Option<String>,
}

/// Resolve `source` against `base` and load it. This is the only blocking
/// step of bootstrap.
pub fn fetch(source: &TableSource, base: &Path) -> Result<Vec<Item>, LoadError> {
    match source {
        TableSource::Bundled => bundled(),
        TableSource::Path(path) => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                base.join(path)
            };
            let bytes = fs::read(&path).map_err(|source| LoadError::Fetch {
                path: path.clone(),
                source,
            })?;
            let items = load(bytes.as_slice())?;
            info!("loaded {} hands from {}", items.len(), path.display());
            Ok(items)
        }
    }
}

/// The 169-hand chart shipped inside the binary.
pub fn bundled() -> Result<Vec<Item>, LoadError> {
    let file = DATA_DIR
        .get_file(BUNDLED_TABLE)
        .ok_or(LoadError::Bundled)?;
    load(file.contents())
}

/// Parse a CSV table with a `Hand,Color,Players,misses` header into items,
/// preserving row order.
pub fn load<R: Read>(raw_table: R) -> Result<Vec<Item>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(raw_table);

    let headers = reader.headers()?.clone();
    for required in [KEY_COLUMN, CATEGORY_COLUMN, TARGET_COLUMN] {
        if !headers.iter().any(|h| h == required) {
            return Err(LoadError::MissingColumn(required));
        }
    }

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for row in reader.deserialize::<RawRow>() {
        let row = row?;
        let key = normalize_key(&row.hand);
        if key.is_empty() {
            continue;
        }
        if !seen.insert(key.clone()) {
            warn!("duplicate hand {key} in table, keeping the first row");
            continue;
        }

        let target = row.players.trim().parse::<u32>().unwrap_or(0);
        let weight = row
            .misses
            .as_deref()
            .and_then(|m| m.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_WEIGHT as i64);

        items.push(Item {
            label: display_label(&key),
            key,
            category: row.color.trim().to_string(),
            target,
            weight: floor_weight(weight),
            last_missed_at: None,
        });
    }

    Ok(items)
}

/// Clamp a raw miss count into the valid weight range.
pub fn floor_weight(raw: i64) -> u32 {
    raw.clamp(DEFAULT_WEIGHT as i64, u32::MAX as i64) as u32
}

/// Canonical hand notation: ranks upper case, suited/offsuit marker lower
/// case, no whitespace.
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .enumerate()
        .flat_map(|(i, c)| {
            if i < 2 {
                c.to_uppercase().collect::<Vec<_>>()
            } else {
                c.to_lowercase().collect::<Vec<_>>()
            }
        })
        .collect()
}

pub fn display_label(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), None, _) if a == b => format!("{a}{b} pair"),
        (Some(a), Some(b), Some('s'), None) => format!("{a}{b} suited"),
        (Some(a), Some(b), Some('o'), None) => format!("{a}{b} offsuit"),
        _ => key.to_string(),
    }
}

/// The candidate answers to offer: every distinct target in the table, ascending.
pub fn answer_domain(items: &[Item]) -> Vec<u32> {
    items.iter().map(|item| item.target).sorted().dedup().collect()
}
