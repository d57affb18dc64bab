//! Counters for `increment_integer` / `increment_long` fields.
//!
//! Counter state lives in a [`CounterBank`] owned by the model, one atomic
//! per counter field. Every call performs a single `fetch_add`, so workers
//! sharing a model never observe duplicated or skipped values.

use datagen_core::Value;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub struct CounterBank {
    counters: Vec<AtomicI64>,
}

impl CounterBank {
    /// Reserve a new counter and return its slot.
    pub fn allocate(&mut self) -> usize {
        self.counters.push(AtomicI64::new(0));
        self.counters.len() - 1
    }

    /// Increment the counter at `slot` and return its new count (1 on the
    /// first call).
    pub fn next(&self, slot: usize) -> i64 {
        self.counters
            .get(slot)
            .map(|c| c.fetch_add(1, Ordering::Relaxed) + 1)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

/// A counter field's view of the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub slot: usize,
    pub base: i64,
    /// `increment_integer` wraps to 32 bits.
    pub narrow: bool,
}

impl Counter {
    pub fn next(&self, bank: &CounterBank) -> Value {
        let value = self.base.wrapping_add(bank.next(self.slot));
        if self.narrow {
            Value::Integer(value as i32)
        } else {
            Value::Long(value)
        }
    }
}
