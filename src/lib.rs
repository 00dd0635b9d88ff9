//! entry-store: a single-owner store of named entries, each holding one
//! scalar whose type is picked at runtime when the entry is added, and
//! addressed afterwards through stable slot indices.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: register a small set of named options once, then read and
//!   write them by index without repeating name lookups.
//! - Layers:
//!   - Slot array: `Vec<Option<Entry>>`. An `Index` is a position in it.
//!     Removal leaves a hole; growth appends. Positions never shift.
//!   - Name index: a `hashbrown::HashTable<usize>` of slot positions keyed
//!     by each entry's stored hash. Add/query are O(1) on average; the slot
//!     array stays the source of truth.
//!   - Typed access: `Value` is a sum type, so the stored type and payload
//!     cannot disagree. Typed getters/setters match on the variant and
//!     return `InvalidType` otherwise.
//!
//! Constraints
//! - Keys are unique, compared by exact bytes. Duplicate adds fail with
//!   `KeyExists` and change nothing.
//! - An entry's type is fixed at add time.
//! - Adds take the lowest empty slot. When every slot is taken the array
//!   grows by a fixed increment (`StoreConfig::growth_increment`).
//! - Allocation is fallible throughout add/duplicate: `OutOfMemory` is
//!   reported with the store left valid.
//!
//! Iteration
//! - `begin`/`next`/`end` walk occupied indices in ascending order, with
//!   `end() == capacity()`. Nothing is snapshotted; adding or removing
//!   during a walk is the caller's concern. `iter()` and `indices()` offer
//!   the same order behind a shared borrow.
//!
//! Ownership
//! - Keys and strings are owned by the store. Getters named `get_*` return
//!   owned copies; `key`/`value` borrow. `try_duplicate` deep-copies
//!   everything and discards its partial work on failure.
//!
//! Status
//! - Every operation returns `Result<_, StoreError>`. `KeyNotPresent` is a
//!   warning, everything else an error; `Status` offers the flat
//!   success/warning/error classification.
//!
//! Notes and non-goals
//! - Not synchronized. Mutation needs `&mut EntryStore`; share across
//!   threads behind a lock.
//! - No persistence and no nested values.

mod config;
pub mod entry_store;
mod entry_store_proptest;
mod error;
mod value;

// Public surface
pub use config::{StoreConfig, DEFAULT_GROWTH_INCREMENT, DEFAULT_INITIAL_CAPACITY};
pub use entry_store::{EntryStore, Index, Indices, Iter};
pub use error::{Result, Severity, Status, StoreError};
pub use value::{Value, ValueType};
