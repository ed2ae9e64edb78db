//! Durable per-hand miss history.
//!
//! The store is a plain value: [`ProgressStore::record_miss`] returns a new
//! store rather than mutating in place, and [`ProgressStore::persist`] writes
//! it to whatever [`KeyValueStore`] the caller owns. Loading never fails; a
//! missing or corrupt blob yields an empty store.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PersistError;
use crate::hand_table::{Item, DEFAULT_WEIGHT};
use crate::storage::KeyValueStore;

/// Fixed storage key the serialized store lives under.
pub const PROGRESS_KEY: &str = "handdrill.progress";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub misses: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_missed_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStore {
    total_misses: u64,
    per_hand: BTreeMap<String, ProgressRecord>,
}

impl ProgressStore {
    /// Read the store from `medium`, falling back to an empty store when the
    /// blob is absent, unreadable or malformed.
    pub fn load<K: KeyValueStore + ?Sized>(medium: &K) -> Self {
        let blob = match medium.get(PROGRESS_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!("could not read saved progress, starting fresh: {e}");
                return Self::default();
            }
        };

        match Self::from_blob(&blob) {
            Ok(store) => {
                debug!(
                    "loaded progress: {} misses across {} hands",
                    store.total_misses,
                    store.per_hand.len()
                );
                store
            }
            Err(e) => {
                warn!("saved progress is corrupt, starting fresh: {e}");
                Self::default()
            }
        }
    }

    /// Parse a stored blob. Records with a zero count are dropped; every
    /// saved record stands for at least one miss.
    pub fn from_blob(blob: &str) -> Result<Self, serde_json::Error> {
        let mut store: Self = serde_json::from_str(blob)?;
        store.per_hand.retain(|key, record| {
            if record.misses == 0 {
                warn!("dropping saved record for {key} with no misses");
            }
            record.misses > 0
        });
        Ok(store)
    }

    pub fn to_blob(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize and write the whole store under [`PROGRESS_KEY`].
    pub fn persist<K: KeyValueStore + ?Sized>(&self, medium: &mut K) -> Result<(), PersistError> {
        let blob = self.to_blob()?;
        medium.set(PROGRESS_KEY, &blob)?;
        Ok(())
    }

    pub fn total_misses(&self) -> u64 {
        self.total_misses
    }

    pub fn record(&self, key: &str) -> Option<&ProgressRecord> {
        self.per_hand.get(key)
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &ProgressRecord)> {
        self.per_hand.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn is_empty(&self) -> bool {
        self.per_hand.is_empty() && self.total_misses == 0
    }

    /// Sum of the per-hand counters. Tracked separately from
    /// [`total_misses`](Self::total_misses), which counts recorded misses.
    pub fn per_hand_sum(&self) -> u64 {
        self.per_hand.values().map(|r| r.misses as u64).sum()
    }

    /// A copy of this store with one more miss on `key`. A new record starts
    /// at 1.
    pub fn record_miss(&self, key: &str, timestamp: &str) -> Self {
        self.record_miss_from(key, 0, timestamp)
    }

    /// Like [`record_miss`](Self::record_miss), but a record created by this
    /// call starts from `baseline + 1` instead of 1. Existing records ignore
    /// the baseline.
    pub fn record_miss_from(&self, key: &str, baseline: u32, timestamp: &str) -> Self {
        let mut next = self.clone();
        let misses = next
            .per_hand
            .get(key)
            .map_or(baseline, |r| r.misses)
            .saturating_add(1);
        next.per_hand.insert(
            key.to_string(),
            ProgressRecord {
                misses,
                last_missed_at: Some(timestamp.to_string()),
            },
        );
        next.total_misses = next.total_misses.saturating_add(1);
        next
    }

    /// Records ordered by miss count, highest first; ties by key.
    pub fn most_missed(&self, limit: usize) -> Vec<(&str, &ProgressRecord)> {
        let mut records: Vec<_> = self.records().collect();
        records.sort_by(|a, b| b.1.misses.cmp(&a.1.misses).then_with(|| a.0.cmp(b.0)));
        records.truncate(limit);
        records
    }
}

/// Overlay saved miss counts onto reference items. Items without a record
/// keep their table weight and get no timestamp.
pub fn merge(items: &[Item], store: &ProgressStore) -> Vec<Item> {
    items
        .iter()
        .map(|item| match store.record(&item.key) {
            Some(record) => Item {
                weight: record.misses.max(DEFAULT_WEIGHT),
                last_missed_at: record.last_missed_at.clone(),
                ..item.clone()
            },
            None => item.clone(),
        })
        .collect()
}
