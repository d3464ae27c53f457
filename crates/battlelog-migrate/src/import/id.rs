use battlelog_common::types::RecordKind;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

/// Assigns ids to records that arrive without one.
///
/// Every import starts with one `begin_run` call and hands the returned stamp
/// to each `generate` of that import. `index` is the record's zero-based
/// position in its input. Generators must return distinct ids for distinct
/// `(kind, stamp, index)` triples and distinct stamps for distinct runs.
pub trait IdGenerator: Send + Sync {
    fn begin_run(&self) -> i64 {
        0
    }

    fn generate(&self, kind: RecordKind, stamp: i64, index: usize) -> String;
}

pub fn id_prefix(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::DeckMaster => "dm",
        RecordKind::MyDeck => "md",
        RecordKind::BattleLog => "bl",
    }
}

/// `<prefix>_<unix millis>_<index>`, with the clock read at the start of each
/// run. Runs starting within the same millisecond get the next free one.
#[derive(Debug)]
pub struct TimestampIdGenerator {
    pinned: Option<i64>,
    last: AtomicI64,
}

impl TimestampIdGenerator {
    pub fn new() -> Self {
        Self {
            pinned: None,
            last: AtomicI64::new(i64::MIN),
        }
    }

    /// Clock fixed at `millis`; later runs count up from it.
    pub fn at(millis: i64) -> Self {
        Self {
            pinned: Some(millis),
            last: AtomicI64::new(i64::MIN),
        }
    }
}

impl Default for TimestampIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for TimestampIdGenerator {
    fn begin_run(&self) -> i64 {
        let now = self
            .pinned
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let next = |prev: i64| now.max(prev.saturating_add(1));
        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(next(prev)))
        {
            Ok(prev) | Err(prev) => next(prev),
        }
    }

    fn generate(&self, kind: RecordKind, stamp: i64, index: usize) -> String {
        format!("{}_{}_{}", id_prefix(kind), stamp, index)
    }
}

/// Deterministic `<prefix>-<n>` ids counting up from 1, ignoring stamp and index.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicUsize,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self, kind: RecordKind, _stamp: i64, _index: usize) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", id_prefix(kind), n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ids() {
        let ids = TimestampIdGenerator::at(1_754_524_800_000);
        let stamp = ids.begin_run();
        assert_eq!(stamp, 1_754_524_800_000);
        assert_eq!(ids.generate(RecordKind::BattleLog, stamp, 4), "bl_1754524800000_4");
        assert_ne!(
            ids.generate(RecordKind::MyDeck, stamp, 0),
            ids.generate(RecordKind::MyDeck, stamp, 1)
        );
    }

    #[test]
    fn test_each_run_gets_a_new_stamp() {
        let pinned = TimestampIdGenerator::at(1_000);
        assert_eq!(pinned.begin_run(), 1_000);
        assert_eq!(pinned.begin_run(), 1_001);

        let clock = TimestampIdGenerator::new();
        let first = clock.begin_run();
        let second = clock.begin_run();
        assert!(second > first);
        assert_ne!(
            clock.generate(RecordKind::MyDeck, first, 0),
            clock.generate(RecordKind::MyDeck, second, 0)
        );
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIdGenerator::new();
        let stamp = ids.begin_run();
        assert_eq!(ids.generate(RecordKind::DeckMaster, stamp, 9), "dm-1");
        assert_eq!(ids.generate(RecordKind::BattleLog, stamp, 0), "bl-2");
    }
}
