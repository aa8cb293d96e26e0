//! Object store implementations.

mod memory;

pub use memory::{InMemoryStore, merge_patch};
