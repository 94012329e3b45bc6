//! Address allocation policies

use crate::interpreter::constants::SCATTER_ATTEMPTS;
use crate::interpreter::errors::{MachineError, Result};
use crate::memory::value::Address;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationPolicy {
    /// First free word-aligned slot, scanning upwards from the first word
    #[default]
    Aligned,
    /// Pseudo-random offsets, retried a bounded number of times
    Scattered,
}

impl AllocationPolicy {
    pub fn toggled(self) -> Self {
        match self {
            AllocationPolicy::Aligned => AllocationPolicy::Scattered,
            AllocationPolicy::Scattered => AllocationPolicy::Aligned,
        }
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationPolicy::Aligned => write!(f, "aligned"),
            AllocationPolicy::Scattered => write!(f, "scattered"),
        }
    }
}

/// SplitMix64 stream. Lives inside the symbol table so that a snapshot
/// restore also rewinds the sequence of scattered addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMix {
    state: u64,
}

impl SplitMix {
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        SplitMix { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in `[min, max]`
    pub fn range(&mut self, min: usize, max: usize) -> usize {
        if min >= max {
            return min;
        }
        let span = (max - min + 1) as u64;
        min + (self.next_u64() % span) as usize
    }
}

/// Find a slot of `size` bytes inside `[0, capacity)`. `is_free(address)`
/// decides whether a candidate span may be used.
pub(crate) fn find_slot(
    policy: AllocationPolicy,
    rng: &mut SplitMix,
    size: usize,
    capacity: usize,
    word_size: usize,
    is_free: impl Fn(Address) -> bool,
) -> Result<Address> {
    let exhausted = MachineError::MemoryExhausted { requested: size };
    if size == 0 || size >= capacity {
        return Err(exhausted);
    }

    match policy {
        AllocationPolicy::Aligned => (word_size..=capacity - size)
            .step_by(word_size)
            .find(|&address| is_free(address))
            .ok_or(exhausted),
        AllocationPolicy::Scattered => (0..SCATTER_ATTEMPTS)
            .map(|_| rng.range(1, capacity - size))
            .find(|&address| is_free(address))
            .ok_or(exhausted),
    }
}
