//! Identity and clock collaborators.
//!
//! # Responsibility
//! - Supply globally unique ids for new persons and trees.
//! - Supply epoch-millisecond timestamps for tree metadata.
//!
//! Both are traits so callers (and tests) can inject deterministic sources.

use crate::model::person::PersonId;
use crate::model::tree::TreeId;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Source of fresh, opaque, unique identifiers.
pub trait IdGenerator {
    fn next_person_id(&mut self) -> PersonId;
    fn next_tree_id(&mut self) -> TreeId;
}

/// Random v4 UUID ids, rendered as hyphenated lowercase strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_person_id(&mut self) -> PersonId {
        PersonId::new(Uuid::new_v4().to_string())
    }

    fn next_tree_id(&mut self) -> TreeId {
        TreeId::new(Uuid::new_v4().to_string())
    }
}

/// Sequential ids (`p-0001`, `t-0001`, ...). Handy for reproducible output.
#[derive(Debug, Clone, Default)]
pub struct SequentialIdGenerator {
    persons: u32,
    trees: u32,
}

impl IdGenerator for SequentialIdGenerator {
    fn next_person_id(&mut self) -> PersonId {
        self.persons += 1;
        PersonId::new(format!("p-{:04}", self.persons))
    }

    fn next_tree_id(&mut self) -> TreeId {
        self.trees += 1;
        TreeId::new(format!("t-{:04}", self.trees))
    }
}

/// Source of "now" in Unix epoch milliseconds.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, IdGenerator, SequentialIdGenerator, SystemClock, UuidIdGenerator};

    #[test]
    fn uuid_ids_are_unique() {
        let mut ids = UuidIdGenerator;
        assert_ne!(ids.next_person_id(), ids.next_person_id());
        assert_ne!(ids.next_tree_id(), ids.next_tree_id());
    }

    #[test]
    fn sequential_ids_sort_in_creation_order() {
        let mut ids = SequentialIdGenerator::default();
        let first = ids.next_person_id();
        let second = ids.next_person_id();
        assert_eq!(first.as_str(), "p-0001");
        assert!(first < second);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now_ms() > 0);
    }
}
