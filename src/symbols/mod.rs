//! Symbol table
//!
//! Tracks which variables exist, where they live and how big they are:
//! - [`variable`]: the [`Variable`] record and its [`VariableKind`]
//! - [`table`]: the id/address indexes and the occupied-byte set
//! - [`allocator`]: the aligned and scattered placement policies
//!
//! Whether a variable lives on the heap is decided by its name alone: heap
//! blocks carry the reserved `$heap` prefix, everything else is a stack
//! variable.

pub mod allocator;
pub mod table;
pub mod variable;

pub use allocator::AllocationPolicy;
pub use table::SymbolTable;
pub use variable::{Variable, VariableKind};
