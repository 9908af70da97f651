use crate::types::{CardPosition, ReviewRecord};
use std::collections::HashMap;

pub const DEFAULT_PREFIX_CHARS: usize = 20;

/// `nickname|date|content-prefix` fingerprint.
///
/// Heuristic by nature: two distinct reviews by the same user on the same day
/// that open with the same text collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn for_record(record: &ReviewRecord, prefix_chars: usize) -> Self {
        let prefix: String = record.content.chars().take(prefix_chars).collect();
        Self(format!("{}|{}|{}", record.nickname, record.date, prefix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Fresh,
    Duplicate {
        key: DedupKey,
        /// `None` when the original was admitted without a position.
        first_seen: Option<CardPosition>,
    },
}

impl Admission {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Admission::Fresh)
    }
}

/// Run-scoped record of fingerprints. One instance per harvest.
#[derive(Debug)]
pub struct DedupTracker {
    prefix_chars: usize,
    seen: HashMap<DedupKey, Option<CardPosition>>,
}

impl Default for DedupTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX_CHARS)
    }
}

impl DedupTracker {
    pub fn new(prefix_chars: usize) -> Self {
        Self {
            prefix_chars: prefix_chars.max(1),
            seen: HashMap::new(),
        }
    }

    pub fn key_for(&self, record: &ReviewRecord) -> DedupKey {
        DedupKey::for_record(record, self.prefix_chars)
    }

    /// `true` when the record was not seen before (and is now remembered).
    pub fn admit(&mut self, record: &ReviewRecord) -> bool {
        self.admit_with(record, None).is_fresh()
    }

    pub fn admit_at(&mut self, record: &ReviewRecord, position: CardPosition) -> Admission {
        self.admit_with(record, Some(position))
    }

    fn admit_with(&mut self, record: &ReviewRecord, position: Option<CardPosition>) -> Admission {
        let key = self.key_for(record);
        if let Some(first_seen) = self.seen.get(&key) {
            return Admission::Duplicate {
                first_seen: *first_seen,
                key,
            };
        }
        self.seen.insert(key, position);
        Admission::Fresh
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
