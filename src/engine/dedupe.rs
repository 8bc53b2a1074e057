//! Duplicate transaction detection
//!
//! Scores an incoming transaction against existing transactions on the same
//! account within a time window, combining exact amount match, normalized
//! note similarity, and category match into a weighted score in [0, 1].
//! The detector only reports candidates; it never merges or deletes.
//! Confirmation is the caller's job.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::models::{Money, Transaction, TransactionId};

/// Tuning knobs for duplicate detection. These are configurable defaults,
/// not fixed contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Candidates must be within this many days of the new transaction
    pub window_days: i64,

    /// Minimum score for a candidate to be surfaced
    pub threshold: f64,

    /// Weight of an exact amount match
    pub amount_weight: f64,

    /// Weight of note text similarity
    pub note_weight: f64,

    /// Weight of a category match
    pub category_weight: f64,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            window_days: 3,
            threshold: 0.75,
            amount_weight: 0.5,
            note_weight: 0.3,
            category_weight: 0.2,
        }
    }
}

/// A possible duplicate of a new transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateCandidate {
    /// The existing transaction that may be a duplicate
    pub transaction_id: TransactionId,

    /// When the existing transaction occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Similarity score in [0, 1]
    pub score: f64,
}

/// Windowed, weighted duplicate detector
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    config: DedupeConfig,
}

impl DuplicateDetector {
    /// Create a detector with the given configuration
    pub fn new(config: DedupeConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &DedupeConfig {
        &self.config
    }

    /// Score `new` against existing transactions and return candidates at or
    /// above the threshold, best first.
    ///
    /// Deterministic: identical inputs always produce the identical ordered
    /// list (score descending, then existing timestamp ascending, then id).
    pub fn find_candidates(
        &self,
        new: &Transaction,
        existing: &[Transaction],
    ) -> Vec<DuplicateCandidate> {
        let window = Duration::days(self.config.window_days);

        let mut candidates: Vec<DuplicateCandidate> = existing
            .iter()
            .filter(|t| {
                t.id != new.id
                    && !t.voided
                    && t.account_id == new.account_id
                    && (t.timestamp - new.timestamp).abs() <= window
            })
            .map(|t| DuplicateCandidate {
                transaction_id: t.id,
                timestamp: t.timestamp,
                score: self.score(new, t),
            })
            .filter(|c| c.score >= self.config.threshold)
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.timestamp.cmp(&b.timestamp))
                .then(a.transaction_id.cmp(&b.transaction_id))
        });
        candidates
    }

    /// Weighted similarity of two transactions in [0, 1]
    fn score(&self, new: &Transaction, existing: &Transaction) -> f64 {
        let amount = amount_match(new.amount, existing.amount, &new.currency, &existing.currency);
        let note = note_similarity(&new.note, &existing.note);
        let category = if new.category_id == existing.category_id {
            1.0
        } else {
            0.0
        };

        let total_weight =
            self.config.amount_weight + self.config.note_weight + self.config.category_weight;
        if total_weight <= 0.0 {
            return 0.0;
        }

        (self.config.amount_weight * amount
            + self.config.note_weight * note
            + self.config.category_weight * category)
            / total_weight
    }
}

fn amount_match(a: Money, b: Money, a_currency: &str, b_currency: &str) -> f64 {
    if a == b && a_currency == b_currency {
        1.0
    } else {
        0.0
    }
}

/// Similarity of two notes in [0, 1]: the larger of token overlap (Jaccard)
/// and Jaro-Winkler over the normalized text. Two empty notes count as
/// identical; one empty note matches nothing.
fn note_similarity(a: &str, b: &str) -> f64 {
    let a_tokens = tokenize(a);
    let b_tokens = tokenize(b);

    match (a_tokens.is_empty(), b_tokens.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let a_set: std::collections::BTreeSet<&str> =
        a_tokens.iter().map(String::as_str).collect();
    let b_set: std::collections::BTreeSet<&str> =
        b_tokens.iter().map(String::as_str).collect();
    let intersection = a_set.intersection(&b_set).count() as f64;
    let union = a_set.union(&b_set).count() as f64;
    let jaccard = intersection / union;

    let edit = strsim::jaro_winkler(&a_tokens.join(" "), &b_tokens.join(" "));

    jaccard.max(edit)
}

/// Lowercase alphanumeric tokens of a note
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, CategoryId};
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
    }

    fn txn(
        account_id: AccountId,
        day: u32,
        cents: i64,
        note: &str,
    ) -> Transaction {
        Transaction::new(account_id, ts(day, 12), Money::from_cents(cents), "USD")
            .with_note(note)
    }

    #[test]
    fn test_exact_duplicate_scores_one() {
        let account_id = AccountId::new();
        let detector = DuplicateDetector::default();
        let new = txn(account_id, 15, -450, "STARBUCKS #1234");
        let existing = vec![txn(account_id, 15, -450, "STARBUCKS #1234")];

        let candidates = detector.find_candidates(&new, &existing);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_outside_window_ignored() {
        let account_id = AccountId::new();
        let detector = DuplicateDetector::default();
        let new = txn(account_id, 15, -450, "STARBUCKS #1234");
        let existing = vec![txn(account_id, 25, -450, "STARBUCKS #1234")];

        assert!(detector.find_candidates(&new, &existing).is_empty());
    }

    #[test]
    fn test_other_account_ignored() {
        let detector = DuplicateDetector::default();
        let new = txn(AccountId::new(), 15, -450, "STARBUCKS #1234");
        let existing = vec![txn(AccountId::new(), 15, -450, "STARBUCKS #1234")];

        assert!(detector.find_candidates(&new, &existing).is_empty());
    }

    #[test]
    fn test_voided_ignored() {
        let account_id = AccountId::new();
        let detector = DuplicateDetector::default();
        let new = txn(account_id, 15, -450, "STARBUCKS #1234");
        let mut voided = txn(account_id, 15, -450, "STARBUCKS #1234");
        voided.void();

        assert!(detector.find_candidates(&new, &[voided]).is_empty());
    }

    #[test]
    fn test_amount_mismatch_below_threshold() {
        let account_id = AccountId::new();
        let detector = DuplicateDetector::default();
        let new = txn(account_id, 15, -450, "STARBUCKS #1234");
        // Same note and (absent) category but different amount: 0.3 + 0.2.
        let existing = vec![txn(account_id, 15, -999, "STARBUCKS #1234")];

        assert!(detector.find_candidates(&new, &existing).is_empty());
    }

    #[test]
    fn test_similar_note_same_amount_surfaces() {
        let account_id = AccountId::new();
        let detector = DuplicateDetector::default();
        let new = txn(account_id, 15, -450, "STARBUCKS 1234 SEATTLE");
        let existing = vec![txn(account_id, 16, -450, "STARBUCKS 1234")];

        let candidates = detector.find_candidates(&new, &existing);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].score >= 0.75);
        assert!(candidates[0].score < 1.0);
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let account_id = AccountId::new();
        let detector = DuplicateDetector::default();
        let new = txn(account_id, 15, -450, "STARBUCKS #1234");

        let exact_later = txn(account_id, 16, -450, "STARBUCKS #1234");
        let exact_earlier = txn(account_id, 14, -450, "STARBUCKS #1234");
        let near = txn(account_id, 15, -450, "STARBUCKS #1234 SEATTLE");
        let existing = vec![exact_later.clone(), near.clone(), exact_earlier.clone()];

        let first = detector.find_candidates(&new, &existing);
        let second = detector.find_candidates(&new, &existing);
        assert_eq!(first, second);

        // Equal scores tie-break on timestamp ascending.
        assert_eq!(first[0].transaction_id, exact_earlier.id);
        assert_eq!(first[1].transaction_id, exact_later.id);
        assert_eq!(first[2].transaction_id, near.id);
    }

    #[test]
    fn test_category_contributes() {
        let account_id = AccountId::new();
        let category_id = CategoryId::new();
        // Only amount and category weights in play: note weight zeroed.
        let detector = DuplicateDetector::new(DedupeConfig {
            note_weight: 0.0,
            ..DedupeConfig::default()
        });

        let mut new = txn(account_id, 15, -450, "");
        new.category_id = Some(category_id);
        let mut same_cat = txn(account_id, 15, -450, "");
        same_cat.category_id = Some(category_id);
        let mut other_cat = txn(account_id, 15, -450, "");
        other_cat.category_id = Some(CategoryId::new());

        let candidates = detector.find_candidates(&new, &[same_cat.clone(), other_cat]);
        // 0.5/0.7 ≈ 0.714 for the mismatched category, below threshold.
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].transaction_id, same_cat.id);
    }

    #[test]
    fn test_empty_notes_count_as_identical() {
        assert_eq!(note_similarity("", ""), 1.0);
        assert_eq!(note_similarity("", "STARBUCKS"), 0.0);
        assert_eq!(note_similarity("STARBUCKS", "starbucks!"), 1.0);
    }
}
