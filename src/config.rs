//! Construction-time tuning for `EntryStore`.

use core::num::NonZeroUsize;

/// Slots allocated by a freshly created store.
pub const DEFAULT_INITIAL_CAPACITY: usize = 10;

/// Slots appended each time an add finds the store full.
pub const DEFAULT_GROWTH_INCREMENT: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => panic!("growth increment must be non-zero"),
};

/// Capacity policy of a store. Growth is additive: a full store gains
/// exactly `growth_increment` empty slots, appended after the existing ones.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StoreConfig {
    pub initial_capacity: usize,
    pub growth_increment: NonZeroUsize,
}

impl StoreConfig {
    pub const fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            growth_increment: DEFAULT_GROWTH_INCREMENT,
        }
    }

    pub const fn with_initial_capacity(mut self, slots: usize) -> Self {
        self.initial_capacity = slots;
        self
    }

    pub const fn with_growth_increment(mut self, slots: NonZeroUsize) -> Self {
        self.growth_increment = slots;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
