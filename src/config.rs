//! Machine configuration

use crate::interpreter::errors::{MachineError, Result};
use crate::memory::codec::Endianness;
use crate::symbols::AllocationPolicy;

/// Default snapshot history budget (4 MiB)
pub const DEFAULT_HISTORY_LIMIT: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// Pointer and `int` width in bytes: 2, 4 or 8
    pub word_size: usize,
    pub endianness: Endianness,
    /// Total bytes of memory. Must be larger than 16 and a multiple of 16.
    pub memory_size: usize,
    pub allocation: AllocationPolicy,
    /// Seed for the scattered allocator
    pub seed: u64,
    /// Estimated bytes of snapshot history kept before the oldest entries go
    pub history_limit: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            word_size: 4,
            endianness: Endianness::Little,
            memory_size: 256,
            allocation: AllocationPolicy::Aligned,
            seed: 0x5EED,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.word_size, 2 | 4 | 8) {
            return Err(MachineError::InvalidWordSize(self.word_size));
        }
        if self.memory_size <= 16 || self.memory_size % 16 != 0 {
            return Err(MachineError::InvalidMemorySize(self.memory_size));
        }
        Ok(())
    }

    pub fn with_word_size(mut self, word_size: usize) -> Self {
        self.word_size = word_size;
        self
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    pub fn with_allocation(mut self, allocation: AllocationPolicy) -> Self {
        self.allocation = allocation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(MachineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_memory_size_rules() {
        for size in [0, 16, 24, 100] {
            assert!(matches!(
                MachineConfig::default().with_memory_size(size).validate(),
                Err(MachineError::InvalidMemorySize(_))
            ));
        }
        assert!(MachineConfig::default()
            .with_memory_size(32)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_word_size_rules() {
        assert!(matches!(
            MachineConfig::default().with_word_size(3).validate(),
            Err(MachineError::InvalidWordSize(3))
        ));
        assert!(MachineConfig::default().with_word_size(8).validate().is_ok());
    }
}
