//! Item difficulty.
//!
//! Each item is treated on its own: missing values are dropped per column, so
//! one item's gaps never affect another item's difficulty.

use crate::matrix::ItemMatrix;
use crate::variance::round_to;
use serde::{Deserialize, Serialize};

/// Precision applied to difficulty values
pub const DIFFICULTY_DIGITS: u32 = 2;

/// Difficulty of a single item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDifficulty {
    /// Item name
    pub term: String,
    /// `sum / (max × n)`, rounded to two decimals
    pub difficulty: f64,
    /// `p + (1 − p) / 2` with `p = 1 / max`, rounded to two decimals
    pub ideal_difficulty: f64,
}

/// Difficulties for every item, in column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyResult {
    /// Per-item rows
    pub items: Vec<ItemDifficulty>,
}

impl DifficultyResult {
    /// Row for a named item
    #[must_use]
    pub fn get(&self, term: &str) -> Option<&ItemDifficulty> {
        self.items.iter().find(|item| item.term == term)
    }

    /// Items whose difficulty lies further than `tolerance` from their ideal
    pub fn off_target(&self, tolerance: f64) -> impl Iterator<Item = &ItemDifficulty> {
        self.items
            .iter()
            .filter(move |item| (item.difficulty - item.ideal_difficulty).abs() > tolerance)
    }
}

/// Item difficulty and ideal difficulty for every column.
///
/// An item with no observed values gets `NaN` for both.
#[must_use]
pub fn item_difficulty(matrix: &ItemMatrix) -> DifficultyResult {
    let items = (0..matrix.n_cols())
        .map(|c| {
            let (difficulty, ideal_difficulty) = difficulty_of(&matrix.observed(c));
            ItemDifficulty {
                term: matrix.column_names()[c].clone(),
                difficulty,
                ideal_difficulty,
            }
        })
        .collect();

    DifficultyResult { items }
}

#[allow(clippy::cast_precision_loss)]
fn difficulty_of(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let sum: f64 = values.iter().sum();

    let difficulty = sum / (max * values.len() as f64);
    let p = 1.0 / max;
    let ideal = p + (1.0 - p) / 2.0;

    (
        round_to(difficulty, DIFFICULTY_DIGITS),
        round_to(ideal, DIFFICULTY_DIGITS),
    )
}
