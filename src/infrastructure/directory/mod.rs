//! Platform directory adapters

pub mod memory;

pub use memory::{Delivery, MemoryDirectory};
