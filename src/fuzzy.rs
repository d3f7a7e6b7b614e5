//! Similarity scoring for filenames.
//!
//! [`ratio`] scores two strings on a 0–100 scale from their indel distance
//! (insertions and deletions only): `100 * 2 * matched / (len_a + len_b)`,
//! rounded half-to-even, where `matched` is the number of characters the
//! minimal char-level diff keeps. Identical strings score 100, strings with
//! no character in common score 0, and an empty input always scores 0.

use similar::{DiffOp, TextDiff};

/// Similarity ratio between `a` and `b`, compared per `char`.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let diff = TextDiff::from_chars(a, b);
    let matched: usize = diff
        .ops()
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();
    let total = a.chars().count() + b.chars().count();
    round_half_even(200 * matched, total).min(100) as u8
}

/// `numerator / denominator` rounded to the nearest integer, ties to even.
fn round_half_even(numerator: usize, denominator: usize) -> usize {
    let quotient = numerator / denominator;
    let twice_rem = 2 * (numerator % denominator);
    if twice_rem > denominator || (twice_rem == denominator && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

/// Characters left dangling at either end once an embedded date is removed.
const SEPARATORS: &[char] = &['_', '-', '.', ' '];

/// Normalize a filename base for matching: upper-case, ASCII digits removed,
/// then separators trimmed from both ends.
///
/// Partner filenames usually embed dates or sequence numbers, which must
/// not count against the similarity to a static pattern.
pub fn normalize_filename(base: &str) -> String {
    let stripped: String = base
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .flat_map(char::to_uppercase)
        .collect();
    stripped.trim_matches(SEPARATORS).to_string()
}
