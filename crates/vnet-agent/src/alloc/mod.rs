//! Bounded dataplane resource allocators.
//!
//! Service labels, VXLAN identifiers and tunnel identifiers come out of
//! finite id spaces. The [`ResourceAllocator`] tracks which owner holds
//! which id so that repeated acquire/release calls are idempotent and an
//! interface teardown can never leak an id.

mod table;
mod types;

pub use table::{AllocConfig, ResourceAllocator};
pub use types::{AllocError, AllocStats, LabelPurpose};
