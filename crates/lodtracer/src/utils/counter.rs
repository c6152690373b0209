//! Process wide statistics counters.
//!
//! Counters are registered lazily on first use by the [counter!] macro and are
//! compiled out unless the `counter` feature is enabled.
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

#[derive(Default)]
pub struct CounterU64 {
    atomic: AtomicU64,
}

impl CounterU64 {
    pub const fn new() -> Self {
        Self {
            atomic: AtomicU64::new(0),
        }
    }
    pub fn inc(&self) {
        self.atomic.fetch_add(1, Ordering::Relaxed); // Adding one is associative and commutative
    }
    pub fn value(&self) -> u64 {
        self.atomic.load(Ordering::Acquire)
    }
}

lazy_static::lazy_static! {
    pub static ref __COUNTERS: Mutex<BTreeMap<&'static str, Arc<CounterU64>>> =
        Mutex::new(BTreeMap::new());
}

pub fn insert_counter(descr: &'static str) -> Arc<CounterU64> {
    let mut counters = __COUNTERS.lock().unwrap_or_else(|poison| poison.into_inner());
    counters.entry(descr).or_default().clone()
}

/// Current value of every registered counter, sorted by name
pub fn counter_values() -> Vec<(&'static str, u64)> {
    let counters = __COUNTERS.lock().unwrap_or_else(|poison| poison.into_inner());
    counters
        .iter()
        .map(|(name, counter)| (*name, counter.value()))
        .collect()
}

pub fn report_counters() {
    for (counter_name, value) in counter_values() {
        log::log!(target: "counter_report", log::Level::Info, "{}: {}", counter_name, value)
    }
}

#[macro_export]
macro_rules! counter {
    ($descr:literal) => {
        if cfg!(feature = "counter") {
            use $crate::utils::counter::{insert_counter, lazy_static, CounterU64};
            lazy_static::lazy_static! {
                static ref COUNTER_REF: std::sync::Arc<CounterU64> = insert_counter($descr);
            }
            COUNTER_REF.inc();
        };
    };
}

pub use counter;
// Reexport for ease of use
pub use lazy_static;

#[cfg(test)]
mod tests {
    use super::{counter_values, insert_counter};

    #[test]
    fn same_name_same_counter() {
        let a = insert_counter("test: shared counter");
        let b = insert_counter("test: shared counter");
        a.inc();
        b.inc();
        let value = counter_values()
            .into_iter()
            .find(|(name, _)| *name == "test: shared counter")
            .map(|(_, value)| value);
        assert_eq!(value, Some(2));
    }
}
