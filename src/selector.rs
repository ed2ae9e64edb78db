use log::debug;
use rand::{Rng, RngCore};

use crate::hand_table::{Item, DEFAULT_WEIGHT};

/// Strategy for choosing the next hand to ask about
pub trait HandSelector {
    /// Index into `items` of the chosen hand, `None` only when `items` is empty.
    fn pick_index(&self, items: &[Item], rng: &mut dyn RngCore) -> Option<usize>;
}

/// Draw proportional to miss weight (default)
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedSelector;

impl HandSelector for WeightedSelector {
    fn pick_index(&self, items: &[Item], rng: &mut dyn RngCore) -> Option<usize> {
        if items.is_empty() {
            return None;
        }

        let total: f64 = items.iter().map(effective_weight).sum();
        let mut threshold = rng.gen_range(0.0..total);

        for (idx, item) in items.iter().enumerate() {
            threshold -= effective_weight(item);
            if threshold <= 0.0 {
                debug!("picked {} (weight {} of {total})", item.key, item.weight);
                return Some(idx);
            }
        }

        // only reachable through float drift
        Some(items.len() - 1)
    }
}

/// Every hand equally likely, ignoring weights
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformSelector;

impl HandSelector for UniformSelector {
    fn pick_index(&self, items: &[Item], rng: &mut dyn RngCore) -> Option<usize> {
        if items.is_empty() {
            None
        } else {
            Some(rng.gen_range(0..items.len()))
        }
    }
}

/// Weight used for sampling; never below 1 so every hand stays reachable.
pub fn effective_weight(item: &Item) -> f64 {
    item.weight.max(DEFAULT_WEIGHT) as f64
}

/// Weighted draw returning the item itself.
pub fn pick<'a>(items: &'a [Item], rng: &mut dyn RngCore) -> Option<&'a Item> {
    WeightedSelector
        .pick_index(items, rng)
        .map(|idx| &items[idx])
}
