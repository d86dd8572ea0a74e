//! Frequency counts, majority vote, and Shannon entropy over label sequences.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::TreeError;

/// Count how often each distinct value occurs in `values`.
///
/// Returns an empty map for empty input. Iteration order is unspecified.
#[must_use]
pub fn counts<T: Eq + Hash>(values: &[T]) -> HashMap<&T, usize> {
    let mut counts = HashMap::with_capacity(values.len().min(64));
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Return the most frequent value in `values`.
///
/// Ties go to the value whose first occurrence comes earliest in the input,
/// so the result depends only on the sequence, never on hash order.
///
/// # Errors
///
/// Returns [`TreeError::EmptyInput`] when `values` is empty.
pub fn majority<T: Eq + Hash>(values: &[T]) -> Result<&T, TreeError> {
    let counts = counts(values);
    let max_count = counts.values().copied().max().ok_or(TreeError::EmptyInput)?;
    values
        .iter()
        .find(|v| counts[v] == max_count)
        .ok_or(TreeError::EmptyInput)
}

/// Shannon entropy of `values` in bits: `-Σ p·log2(p)`.
///
/// The entropy of an empty sequence is 0.
#[must_use]
pub fn entropy<T: Eq + Hash>(values: &[T]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    // summed in first-seen order so equal inputs give bit-identical results
    let h: f64 = ordered_counts(values)
        .into_iter()
        .map(|c| {
            let p = c as f64 / n;
            p * p.log2()
        })
        .sum();
    // a pure sequence sums to -0.0
    (-h).max(0.0)
}

/// Occurrence counts of each distinct value, in order of first occurrence.
fn ordered_counts<T: Eq + Hash>(values: &[T]) -> Vec<usize> {
    let mut slots: HashMap<&T, usize> = HashMap::new();
    let mut counts: Vec<usize> = Vec::new();
    for value in values {
        match slots.get(value) {
            Some(&slot) => counts[slot] += 1,
            None => {
                slots.insert(value, counts.len());
                counts.push(1);
            }
        }
    }
    counts
}

/// Return `true` if every element equals the first. Vacuously true when empty.
#[must_use]
pub fn all_same<T: PartialEq>(values: &[T]) -> bool {
    match values.split_first() {
        Some((first, rest)) => rest.iter().all(|v| v == first),
        None => true,
    }
}
