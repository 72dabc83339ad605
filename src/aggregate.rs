//! Author aggregation across partitions.
//!
//! Raw per-heading records are folded into an [`AuthorTally`] keyed by the
//! normalized merge key, then filtered and ranked with [`AuthorTally::finalize`].

use crate::catalog::{RawAuthorRecord, WorkEntry};
use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// An author accumulated over every partition seen so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedAuthor {
    /// First-seen heading form; never overwritten
    pub display_name: String,
    pub merge_key: String,
    pub works: Vec<WorkEntry>,
}

impl AggregatedAuthor {
    fn new(merge_key: String, display_name: String) -> Self {
        Self {
            display_name,
            merge_key,
            works: Vec::new(),
        }
    }

    /// Number of qualifying works, always `works.len()`
    pub fn work_count(&self) -> usize {
        self.works.len()
    }
}

/// Insertion-ordered map from merge key to aggregated author.
///
/// Each merge key owns exactly one entry for the lifetime of the tally.
#[derive(Debug, Default, Clone)]
pub struct AuthorTally {
    authors: Vec<AggregatedAuthor>,
    index: HashMap<String, usize>,
}

impl AuthorTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for `merge_key`, inserting an empty one named
    /// `display_name` if the key has not been seen.
    pub fn get_or_insert(&mut self, merge_key: &str, display_name: &str) -> &mut AggregatedAuthor {
        let slot = match self.index.get(merge_key) {
            Some(&slot) => slot,
            None => {
                let slot = self.authors.len();
                self.authors.push(AggregatedAuthor::new(
                    merge_key.to_string(),
                    display_name.to_string(),
                ));
                self.index.insert(merge_key.to_string(), slot);
                slot
            }
        };
        &mut self.authors[slot]
    }

    /// Fold one partition's records into the tally.
    ///
    /// Works are appended in arrival order and never deduplicated.
    pub fn fold(&mut self, records: Vec<RawAuthorRecord>) {
        for record in records {
            let merge_key = normalize(&record.display_name);
            let author = self.get_or_insert(&merge_key, &record.display_name);
            if author.display_name != record.display_name {
                debug!(
                    kept = %author.display_name,
                    variant = %record.display_name,
                    key = %merge_key,
                    "Merged name variant"
                );
            }
            author.works.extend(record.works);
        }
    }

    pub fn get(&self, merge_key: &str) -> Option<&AggregatedAuthor> {
        self.index.get(merge_key).map(|&slot| &self.authors[slot])
    }

    /// Number of distinct merge keys seen
    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &AggregatedAuthor> {
        self.authors.iter()
    }

    /// Keep authors with at least `min_books` works, ranked by work count.
    ///
    /// Ties are ordered by display name, then merge key, so the ranking does
    /// not depend on partition order. The tally itself is left untouched.
    pub fn finalize(&self, min_books: usize) -> Vec<AggregatedAuthor> {
        let mut ranked: Vec<AggregatedAuthor> = self
            .authors
            .iter()
            .filter(|a| a.work_count() >= min_books)
            .cloned()
            .collect();
        ranked.sort_by(rank_order);
        ranked
    }
}

fn rank_order(a: &AggregatedAuthor, b: &AggregatedAuthor) -> Ordering {
    b.work_count()
        .cmp(&a.work_count())
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.merge_key.cmp(&b.merge_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn work(n: usize) -> WorkEntry {
        WorkEntry {
            title: format!("Work {}", n),
            location: format!("https://www.gutenberg.org/ebooks/{}", n),
        }
    }

    fn record(name: &str, works: &[usize]) -> RawAuthorRecord {
        RawAuthorRecord {
            display_name: name.to_string(),
            works: works.iter().map(|&n| work(n)).collect(),
        }
    }

    #[test]
    fn test_variants_merge_into_first_seen_name() {
        let mut tally = AuthorTally::new();
        tally.fold(vec![
            record("Lytton, Edward Bulwer", &[1, 2, 3]),
            record("Baron Lytton, Edward Bulwer", &[4]),
        ]);

        assert_eq!(tally.len(), 1);
        let lytton = tally.get("lytton, edward bulwer").expect("merged entry");
        assert_eq!(lytton.display_name, "Lytton, Edward Bulwer");
        assert_eq!(lytton.work_count(), 4);
        assert_eq!(lytton.works, vec![work(1), work(2), work(3), work(4)]);

        assert_eq!(tally.finalize(3).len(), 1);
        assert!(tally.finalize(5).is_empty());
    }

    #[test]
    fn test_duplicate_works_are_kept() {
        let mut tally = AuthorTally::new();
        tally.fold(vec![record("Twain, Mark", &[7])]);
        tally.fold(vec![record("Twain, Mark", &[7])]);
        let twain = tally.get("twain, mark").expect("entry");
        assert_eq!(twain.works, vec![work(7), work(7)]);
    }

    #[test]
    fn test_zero_work_record_is_retained() {
        let mut tally = AuthorTally::new();
        tally.fold(vec![record("Nobody, Quite", &[])]);
        assert_eq!(tally.len(), 1);
        assert_eq!(tally.finalize(0).len(), 1);
        assert!(tally.finalize(1).is_empty());
    }

    #[test]
    fn test_get_or_insert_keeps_existing() {
        let mut tally = AuthorTally::new();
        tally.get_or_insert("doyle, arthur conan", "Doyle, Arthur Conan").works.push(work(1));
        let again = tally.get_or_insert("doyle, arthur conan", "Sir Doyle, Arthur Conan");
        assert_eq!(again.display_name, "Doyle, Arthur Conan");
        assert_eq!(again.work_count(), 1);
    }

    #[test]
    fn test_finalize_ranks_with_deterministic_ties() {
        let mut tally = AuthorTally::new();
        tally.fold(vec![
            record("Wells, H. G.", &[1, 2]),
            record("Dickens, Charles", &[3, 4, 5]),
            record("Austen, Jane", &[6, 7]),
            record("Poe, Edgar Allan", &[8]),
        ]);

        let ranked: Vec<(String, usize)> = tally
            .finalize(2)
            .into_iter()
            .map(|a| {
                let count = a.work_count();
                (a.display_name, count)
            })
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("Dickens, Charles".to_string(), 3),
                ("Austen, Jane".to_string(), 2),
                ("Wells, H. G.".to_string(), 2),
            ]
        );
        // input untouched
        assert_eq!(tally.len(), 4);
    }

    #[test]
    fn test_empty_tally_finalizes_to_empty() {
        assert!(AuthorTally::new().finalize(0).is_empty());
    }

    fn records_strategy() -> impl Strategy<Value = Vec<RawAuthorRecord>> {
        let name = prop_oneof![
            Just("Lytton, Edward"),
            Just("Baron Lytton, Edward"),
            Just("Scott, Walter"),
            Just("Sir Scott, Walter"),
            Just("Eliot, George"),
        ];
        prop::collection::vec(
            (name, prop::collection::vec(0usize..50, 0..6)),
            0..12,
        )
        .prop_map(|items| {
            items
                .into_iter()
                .map(|(name, works)| record(name, &works))
                .collect()
        })
    }

    fn sorted_works(tally: &AuthorTally, key: &str) -> Vec<WorkEntry> {
        let mut works = tally.get(key).map(|a| a.works.clone()).unwrap_or_default();
        works.sort_by(|a, b| a.location.cmp(&b.location));
        works
    }

    proptest! {
        #[test]
        fn fold_order_does_not_change_counts(records in records_strategy()) {
            let mut forward = AuthorTally::new();
            forward.fold(records.clone());

            let mut reversed = AuthorTally::new();
            reversed.fold(records.into_iter().rev().collect());

            prop_assert_eq!(forward.len(), reversed.len());
            for author in forward.iter() {
                let other = reversed.get(&author.merge_key);
                prop_assert!(other.is_some());
                prop_assert_eq!(other.map(|a| a.work_count()), Some(author.work_count()));
                prop_assert_eq!(
                    sorted_works(&forward, &author.merge_key),
                    sorted_works(&reversed, &author.merge_key)
                );
            }
        }

        #[test]
        fn finalize_respects_threshold_and_order(
            records in records_strategy(),
            min_books in 0usize..8,
        ) {
            let total_works: usize = records.iter().map(|r| r.works.len()).sum();
            let mut tally = AuthorTally::new();
            tally.fold(records);

            let ranked = tally.finalize(min_books);
            prop_assert!(ranked.len() <= tally.len());
            prop_assert!(ranked.iter().all(|a| a.work_count() >= min_books));
            prop_assert!(ranked.windows(2).all(|w| w[0].work_count() >= w[1].work_count()));

            let folded: usize = tally.iter().map(|a| a.work_count()).sum();
            prop_assert_eq!(folded, total_works);
        }
    }
}
