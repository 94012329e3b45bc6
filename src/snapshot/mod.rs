// Snapshot management for rollback and history

use crate::interpreter::errors::Result;
use crate::memory::codec::Endianness;
use crate::memory::Memory;
use crate::symbols::SymbolTable;
use std::collections::VecDeque;

/// Full machine state at one instant
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// What produced this state: the statement text, or `<reset>`
    pub name: String,
    pub memory: Vec<u8>,
    pub endianness: Endianness,
    pub symbols: SymbolTable,
}

impl Snapshot {
    pub fn capture(name: impl Into<String>, memory: &Memory, symbols: &SymbolTable) -> Self {
        Snapshot {
            name: name.into(),
            memory: memory.bytes().to_vec(),
            endianness: memory.endianness(),
            symbols: symbols.clone(),
        }
    }

    /// Rebuild the memory store this snapshot was taken from
    pub fn memory_image(&self) -> Result<Memory> {
        let mut memory = Memory::new(self.memory.len(), self.endianness)?;
        memory.restore(&self.memory)?;
        Ok(memory)
    }

    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        // Rough: 96 bytes per variable across both indexes
        self.memory.len() + self.name.len() + self.symbols.len() * 96
    }
}

/// Named snapshots in execution order, bounded by an estimated byte budget.
/// The oldest entries are evicted first, but the newest is always kept.
#[derive(Debug)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
    max_memory: usize,
    current_memory: usize,
    /// Entries evicted since the last clear, so indices stay meaningful to
    /// hosts that count statements
    evicted: usize,
}

impl History {
    pub fn new(max_memory: usize) -> Self {
        History {
            snapshots: VecDeque::new(),
            max_memory,
            current_memory: 0,
            evicted: 0,
        }
    }

    /// Add a snapshot, evicting the oldest ones past the budget
    pub fn push(&mut self, snapshot: Snapshot) {
        self.current_memory += snapshot.estimated_size();
        self.snapshots.push_back(snapshot);

        while self.current_memory > self.max_memory && self.snapshots.len() > 1 {
            if let Some(oldest) = self.snapshots.pop_front() {
                self.current_memory -= oldest.estimated_size();
                self.evicted += 1;
            }
        }
    }

    /// Get a snapshot by index
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// Drop every entry after `index`
    pub fn truncate(&mut self, index: usize) {
        while self.snapshots.len() > index + 1 {
            if let Some(newest) = self.snapshots.pop_back() {
                self.current_memory -= newest.estimated_size();
            }
        }
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.current_memory = 0;
        self.evicted = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Get the number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn evicted(&self) -> usize {
        self.evicted
    }

    /// Get current memory usage
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get max memory limit
    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::AllocationPolicy;

    fn snapshot(name: &str) -> Snapshot {
        let memory = Memory::new(64, Endianness::Little).unwrap();
        let symbols = SymbolTable::new(64, 4, AllocationPolicy::Aligned, 1);
        Snapshot::capture(name, &memory, &symbols)
    }

    #[test]
    fn test_push_and_get() {
        let mut history = History::new(1 << 20);
        history.push(snapshot("a"));
        history.push(snapshot("b"));
        assert_eq!(history.len(), 2);
        assert_eq!(history.get(1).unwrap().name, "b");
        assert_eq!(history.latest().unwrap().name, "b");
        assert_eq!(history.memory_usage(), 2 * 65);
    }

    #[test]
    fn test_oldest_entries_are_evicted() {
        let mut history = History::new(150);
        for name in ["a", "b", "c"] {
            history.push(snapshot(name));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.get(0).unwrap().name, "b");
        assert_eq!(history.evicted(), 1);
        assert!(history.memory_usage() <= history.memory_limit());
    }

    #[test]
    fn test_newest_survives_tiny_budget() {
        let mut history = History::new(1);
        history.push(snapshot("only"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_truncate() {
        let mut history = History::new(1 << 20);
        for name in ["a", "b", "c", "d"] {
            history.push(snapshot(name));
        }
        history.truncate(1);
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().name, "b");
        assert_eq!(history.memory_usage(), 2 * 65);
    }
}
