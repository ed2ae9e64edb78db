use chrono::{DateTime, SecondsFormat, Utc};
use log::{error, info};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::path::Path;

use crate::error::{LoadError, PersistError};
use crate::hand_table::{self, Item, TableSource, DEFAULT_WEIGHT};
use crate::progress::{self, ProgressStore};
use crate::selector::{HandSelector, WeightedSelector};
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AnswerStatus {
    Awaiting,
    Correct,
    Incorrect,
}

/// Per-question state, replaced wholesale on every `select_next`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub current: Option<usize>,
    pub status: AnswerStatus,
    pub selected: Option<u32>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            current: None,
            status: AnswerStatus::Awaiting,
            selected: None,
        }
    }
}

/// What the user needs to see after answering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub status: AnswerStatus,
    pub selected: u32,
    pub target: u32,
    pub category: String,
}

/// One row of the most-missed report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissSummary {
    pub key: String,
    pub label: String,
    pub category: String,
    pub target: Option<u32>,
    pub misses: u32,
    pub last_missed_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub answered: u32,
    pub correct: u32,
}

impl Tally {
    pub fn accuracy(&self) -> Option<f64> {
        match self.answered {
            0 => None,
            n => Some((self.correct as f64 / n as f64 * 100.0).round()),
        }
    }
}

/// Owns the hand collection, the progress store and the medium it is
/// persisted to, and drives the question/answer cycle.
pub struct Drill<K: KeyValueStore> {
    reference: Vec<Item>,
    items: Vec<Item>,
    progress: ProgressStore,
    medium: K,
    selector: Box<dyn HandSelector>,
    rng: Box<dyn RngCore>,
    session: Session,
    tally: Tally,
    last_persist_error: Option<String>,
}

impl<K: KeyValueStore> Drill<K> {
    /// Merge `reference` with whatever progress `medium` holds. No hand is
    /// selected yet.
    pub fn new(reference: Vec<Item>, medium: K) -> Self {
        let progress = ProgressStore::load(&medium);
        let items = progress::merge(&reference, &progress);
        Self {
            reference,
            items,
            progress,
            medium,
            selector: Box::new(WeightedSelector),
            rng: Box::new(StdRng::from_entropy()),
            session: Session::default(),
            tally: Tally::default(),
            last_persist_error: None,
        }
    }

    /// Fetch the table, load progress and pick the first hand.
    pub fn bootstrap(source: &TableSource, base: &Path, medium: K) -> Result<Self, LoadError> {
        let reference = hand_table::fetch(source, base)?;
        let mut drill = Self::new(reference, medium);
        drill.select_next();
        info!(
            "drill ready: {} hands, {} misses on record",
            drill.items.len(),
            drill.progress.total_misses()
        );
        Ok(drill)
    }

    pub fn with_selector(mut self, selector: Box<dyn HandSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_rng<R: RngCore + 'static>(mut self, rng: R) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn medium(&self) -> &K {
        &self.medium
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> AnswerStatus {
        self.session.status
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.session.current.map(|idx| &self.items[idx])
    }

    pub fn can_advance(&self) -> bool {
        self.session.status != AnswerStatus::Awaiting
    }

    /// Draw the next hand and start a fresh question. Leaves everything
    /// untouched when there are no hands.
    pub fn select_next(&mut self) -> Option<&Item> {
        let idx = self.selector.pick_index(&self.items, self.rng.as_mut())?;
        self.session = Session {
            current: Some(idx),
            status: AnswerStatus::Awaiting,
            selected: None,
        };
        Some(&self.items[idx])
    }

    pub fn submit_answer(&mut self, value: u32) -> Option<Feedback> {
        self.submit_answer_at(value, Utc::now())
    }

    /// Grade `value` against the current hand. Returns `None` without side
    /// effects unless a hand is showing and still awaiting its answer.
    pub fn submit_answer_at(&mut self, value: u32, at: DateTime<Utc>) -> Option<Feedback> {
        if self.session.status != AnswerStatus::Awaiting {
            return None;
        }
        let idx = self.session.current?;

        let target = self.items[idx].target;
        let status = if value == target {
            AnswerStatus::Correct
        } else {
            AnswerStatus::Incorrect
        };

        if status == AnswerStatus::Incorrect {
            self.record_miss(idx, at);
        }

        self.session.status = status;
        self.session.selected = Some(value);
        self.tally.answered += 1;
        if status == AnswerStatus::Correct {
            self.tally.correct += 1;
        }

        Some(Feedback {
            status,
            selected: value,
            target,
            category: self.items[idx].category.clone(),
        })
    }

    fn record_miss(&mut self, idx: usize, at: DateTime<Utc>) {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let item = &self.items[idx];
        let next = self
            .progress
            .record_miss_from(&item.key, item.weight, &timestamp);

        match next.persist(&mut self.medium) {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                error!("failed to save miss on {}: {e}", item.key);
                self.last_persist_error = Some(e.to_string());
            }
        }

        let weight = next
            .record(&item.key)
            .map_or(item.weight.saturating_add(1), |r| r.misses.max(DEFAULT_WEIGHT));
        self.progress = next;

        let item = &mut self.items[idx];
        item.weight = weight;
        item.last_missed_at = Some(timestamp);
    }

    /// Hands with saved misses, most missed first. Hands no longer in the
    /// table are still listed, without category or answer.
    pub fn most_missed(&self, limit: usize) -> Vec<MissSummary> {
        self.progress
            .most_missed(limit)
            .into_iter()
            .map(|(key, record)| {
                let item = self.items.iter().find(|item| item.key == key);
                MissSummary {
                    key: key.to_string(),
                    label: item.map_or_else(|| hand_table::display_label(key), |i| i.label.clone()),
                    category: item.map(|i| i.category.clone()).unwrap_or_default(),
                    target: item.map(|i| i.target),
                    misses: record.misses,
                    last_missed_at: record.last_missed_at.clone(),
                }
            })
            .collect()
    }

    /// Forget all saved misses and restore table weights.
    pub fn reset_progress(&mut self) -> Result<(), PersistError> {
        self.progress = ProgressStore::default();
        self.items = self.reference.clone();
        self.session = Session::default();
        self.progress.persist(&mut self.medium)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::PROGRESS_KEY;
    use crate::storage::MemoryStore;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn one_hand() -> Vec<Item> {
        hand_table::load("Hand,Color,Players,misses\nAA,紺,2,1\n".as_bytes()).unwrap()
    }

    fn drill(items: Vec<Item>, medium: MemoryStore) -> Drill<MemoryStore> {
        let mut drill = Drill::new(items, medium).with_rng(StdRng::seed_from_u64(5));
        drill.select_next();
        drill
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_new_drill_awaits_without_item() {
        let drill = Drill::new(one_hand(), MemoryStore::new());
        assert_eq!(drill.session(), &Session::default());
        assert!(drill.current_item().is_none());
    }

    #[test]
    fn test_submit_without_current_item_is_noop() {
        let mut drill = Drill::new(one_hand(), MemoryStore::new());
        assert!(drill.submit_answer_at(2, at()).is_none());
        assert_eq!(drill.tally(), Tally::default());
    }

    #[test]
    fn test_select_next_on_empty_is_noop() {
        let mut drill = Drill::new(Vec::new(), MemoryStore::new());
        assert!(drill.select_next().is_none());
        assert_eq!(drill.session(), &Session::default());
    }

    #[test]
    fn test_correct_answer_does_not_write() {
        let mut drill = drill(one_hand(), MemoryStore::new());
        assert_eq!(drill.current_item().unwrap().key, "AA");

        let feedback = drill.submit_answer_at(2, at()).unwrap();
        assert_eq!(feedback.status, AnswerStatus::Correct);
        assert_eq!(feedback.category, "紺");
        assert_eq!(drill.medium().writes(), 0);
        assert_eq!(drill.progress().total_misses(), 0);
        assert_eq!(drill.current_item().unwrap().weight, 1);
    }

    #[test]
    fn test_incorrect_answer_records_and_persists() {
        let mut drill = drill(one_hand(), MemoryStore::new());

        let feedback = drill.submit_answer_at(3, at()).unwrap();
        assert_eq!(feedback.status, AnswerStatus::Incorrect);
        assert_eq!(feedback.target, 2);
        assert_eq!(feedback.selected, 3);

        let record = drill.progress().record("AA").unwrap();
        assert_eq!(record.misses, 2);
        assert_eq!(record.last_missed_at.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        assert_eq!(drill.progress().total_misses(), 1);
        assert_eq!(drill.medium().writes(), 1);

        let item = drill.current_item().unwrap();
        assert_eq!(item.weight, 2);
        assert_eq!(item.last_missed_at, record.last_missed_at);
        assert_eq!(drill.items()[0], *item);

        let saved = ProgressStore::load(drill.medium());
        assert_eq!(&saved, drill.progress());
    }

    #[test]
    fn test_miss_on_zero_count_record_still_raises_weight() {
        let blob = r#"{"totalMisses":0,"perHand":{"AA":{"misses":0}}}"#;
        let mut drill = drill(one_hand(), MemoryStore::with_value(PROGRESS_KEY, blob));
        let before = drill.current_item().unwrap().weight;

        drill.submit_answer_at(3, at()).unwrap();
        let after = drill.current_item().unwrap().weight;
        assert_eq!(after, before + 1);
        assert_eq!(drill.progress().record("AA").unwrap().misses, after);
    }

    #[test]
    fn test_duplicate_submission_is_ignored() {
        let mut drill = drill(one_hand(), MemoryStore::new());
        drill.submit_answer_at(3, at()).unwrap();
        assert!(drill.submit_answer_at(3, at()).is_none());
        assert!(drill.submit_answer_at(2, at()).is_none());
        assert_eq!(drill.status(), AnswerStatus::Incorrect);
        assert_eq!(drill.session().selected, Some(3));
        assert_eq!(drill.progress().total_misses(), 1);
        assert_eq!(drill.tally().answered, 1);
    }

    #[test]
    fn test_select_next_resets_session() {
        let mut drill = drill(one_hand(), MemoryStore::new());
        assert!(!drill.can_advance());
        drill.submit_answer_at(3, at());
        assert!(drill.can_advance());
        drill.select_next();
        assert_eq!(drill.status(), AnswerStatus::Awaiting);
        assert_eq!(drill.session().selected, None);
        assert!(drill.submit_answer_at(2, at()).is_some());
    }

    #[test]
    fn test_repeated_misses_accumulate() {
        let mut drill = drill(one_hand(), MemoryStore::new());
        for _ in 0..3 {
            drill.submit_answer_at(9, at());
            drill.select_next();
        }
        assert_eq!(drill.progress().record("AA").unwrap().misses, 4);
        assert_eq!(drill.progress().total_misses(), 3);
        assert_eq!(drill.items()[0].weight, 4);
        assert_eq!(drill.tally(), Tally { answered: 3, correct: 0 });
    }

    #[test]
    fn test_progress_survives_restart() {
        let mut first = drill(one_hand(), MemoryStore::new());
        first.submit_answer_at(3, at());
        let medium = first.medium().clone();

        let second = Drill::new(one_hand(), medium);
        assert_eq!(second.items()[0].weight, 2);
        assert_eq!(second.progress().total_misses(), 1);
    }

    #[test]
    fn test_corrupt_progress_uses_table_weights() {
        let medium = MemoryStore::with_value(PROGRESS_KEY, "not json");
        let drill = Drill::new(one_hand(), medium);
        assert!(drill.progress().is_empty());
        assert_eq!(drill.items(), one_hand().as_slice());
    }

    #[test]
    fn test_persist_failure_keeps_in_memory_state() {
        struct ReadOnly;
        impl KeyValueStore for ReadOnly {
            fn get(&self, _: &str) -> Result<Option<String>, crate::error::StorageError> {
                Ok(None)
            }
            fn set(&mut self, _: &str, _: &str) -> Result<(), crate::error::StorageError> {
                Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
            }
        }

        let mut drill = Drill::new(one_hand(), ReadOnly).with_rng(StdRng::seed_from_u64(1));
        drill.select_next();
        let feedback = drill.submit_answer_at(5, at()).unwrap();
        assert_eq!(feedback.status, AnswerStatus::Incorrect);
        assert!(drill.last_persist_error().is_some());
        assert_eq!(drill.progress().total_misses(), 1);
        assert_eq!(drill.items()[0].weight, 2);
    }

    #[test]
    fn test_reset_progress() {
        let mut drill = drill(one_hand(), MemoryStore::new());
        drill.submit_answer_at(3, at());
        drill.reset_progress().unwrap();
        assert!(drill.progress().is_empty());
        assert_eq!(drill.items()[0].weight, 1);
        assert!(ProgressStore::load(drill.medium()).is_empty());
        assert!(drill.current_item().is_none());
    }

    #[test]
    fn test_bootstrap_bundled_selects_first_hand() {
        let drill = Drill::bootstrap(&TableSource::Bundled, Path::new("."), MemoryStore::new())
            .unwrap();
        assert!(drill.current_item().is_some());
        assert_eq!(drill.status(), AnswerStatus::Awaiting);
    }

    #[test]
    fn test_bootstrap_missing_table_fails() {
        let source = TableSource::Path("does/not/exist.csv".into());
        let result = Drill::bootstrap(&source, Path::new("."), MemoryStore::new());
        assert_matches!(result.err(), Some(LoadError::Fetch { .. }));
    }

    #[test]
    fn test_most_missed_joins_table_rows() {
        let table = "Hand,Color,Players,misses\nAA,紺,2,1\nKK,紺,2,1\n";
        let items = hand_table::load(table.as_bytes()).unwrap();
        let blob = r#"{"totalMisses":5,"perHand":{"KK":{"misses":4},"ZZ":{"misses":1}}}"#;
        let drill = Drill::new(items, MemoryStore::with_value(PROGRESS_KEY, blob));

        let rows = drill.most_missed(10);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "KK");
        assert_eq!(rows[0].label, "KK pair");
        assert_eq!(rows[0].category, "紺");
        assert_eq!(rows[0].target, Some(2));
        assert_eq!(rows[1].key, "ZZ");
        assert_eq!(rows[1].target, None);
        assert!(rows[1].category.is_empty());
    }

    #[test]
    fn test_tally_accuracy() {
        assert_eq!(Tally::default().accuracy(), None);
        let tally = Tally { answered: 3, correct: 2 };
        assert_eq!(tally.accuracy(), Some(67.0));
    }
}
