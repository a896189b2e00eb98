//! SortedSet implementation
//!
//! Score buckets plus a member → score index.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Members with their scores, in ascending (score, member) order
pub type ScoredMembers = Vec<(String, i64)>;

/// Score-ordered set of unique members for one key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedSet {
    /// score → members at that score (never empty)
    buckets: BTreeMap<i64, BTreeSet<String>>,

    /// member → current score
    scores: HashMap<String, i64>,
}

impl SortedSet {
    /// Create an empty sorted set
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a set from its buckets
    ///
    /// Fails if a bucket is empty or a member appears under two scores.
    pub fn from_buckets(buckets: BTreeMap<i64, BTreeSet<String>>) -> Result<Self, String> {
        let mut scores = HashMap::new();

        for (&score, members) in &buckets {
            if members.is_empty() {
                return Err(format!("empty bucket at score {}", score));
            }
            for member in members {
                if let Some(previous) = scores.insert(member.clone(), score) {
                    return Err(format!(
                        "member {:?} appears at scores {} and {}",
                        member, previous, score
                    ));
                }
            }
        }

        Ok(Self { buckets, scores })
    }

    /// Place `member` at `score`, moving it out of any other bucket
    ///
    /// Returns `true` if the member was not in the set before. Moving an
    /// existing member, or re-adding it at its current score, returns `false`.
    pub fn insert(&mut self, member: String, score: i64) -> bool {
        match self.scores.insert(member.clone(), score) {
            Some(old) if old == score => false,
            Some(old) => {
                self.remove_from_bucket(old, &member);
                self.buckets.entry(score).or_default().insert(member);
                false
            }
            None => {
                self.buckets.entry(score).or_default().insert(member);
                true
            }
        }
    }

    /// Current score of `member`
    pub fn score(&self, member: &str) -> Option<i64> {
        self.scores.get(member).copied()
    }

    /// Total number of members across all buckets
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Check if the set has no members
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Number of members with `min <= score <= max`
    pub fn count_in(&self, min: i64, max: i64) -> usize {
        if min > max {
            return 0;
        }
        self.buckets.range(min..=max).map(|(_, members)| members.len()).sum()
    }

    /// Members with `start <= score <= stop`, ordered by (score, member)
    pub fn range(&self, start: i64, stop: i64) -> ScoredMembers {
        if start > stop {
            return Vec::new();
        }
        self.buckets
            .range(start..=stop)
            .flat_map(|(&score, members)| members.iter().map(move |m| (m.clone(), score)))
            .collect()
    }

    /// Buckets in ascending score order
    pub fn buckets(&self) -> impl Iterator<Item = (i64, &BTreeSet<String>)> {
        self.buckets.iter().map(|(&score, members)| (score, members))
    }

    /// Number of non-empty buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn remove_from_bucket(&mut self, score: i64, member: &str) {
        if let Some(members) = self.buckets.get_mut(&score) {
            members.remove(member);
            if members.is_empty() {
                self.buckets.remove(&score);
            }
        }
    }
}
