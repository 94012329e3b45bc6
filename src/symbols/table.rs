use super::allocator::{find_slot, AllocationPolicy, SplitMix};
use super::variable::{Variable, VariableKind};
use crate::interpreter::errors::{MachineError, Result};
use crate::memory::value::Address;
use crate::memory::Memory;
use crate::parser::identifier::Identifier;
use crate::types::{TypeId, TypeKind, TypeSystem};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use tracing::debug;

/// Id and address bookkeeping for every live variable
///
/// Variables are kept in declaration order. Several variables may share an
/// address (a reference and its target); lookups by address disambiguate by
/// type. Only variables that own their bytes mark them occupied.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    variables: IndexMap<Identifier, Variable, FxBuildHasher>,
    by_address: FxHashMap<Address, Vec<Identifier>>,
    occupied: FxHashSet<Address>,
    policy: AllocationPolicy,
    rng: SplitMix,
    seed: u64,
    capacity: usize,
    word_size: usize,
    heap_serial: u64,
    temp_serial: u64,
}

impl SymbolTable {
    pub fn new(capacity: usize, word_size: usize, policy: AllocationPolicy, seed: u64) -> Self {
        SymbolTable {
            variables: IndexMap::default(),
            by_address: FxHashMap::default(),
            occupied: FxHashSet::default(),
            policy,
            rng: SplitMix::new(seed),
            seed,
            capacity,
            word_size,
            heap_serial: 0,
            temp_serial: 0,
        }
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: AllocationPolicy) {
        self.policy = policy;
    }

    /// Forget every variable and restart the name counters and address stream
    pub fn clear(&mut self) {
        self.variables.clear();
        self.by_address.clear();
        self.occupied.clear();
        self.rng = SplitMix::new(self.seed);
        self.heap_serial = 0;
        self.temp_serial = 0;
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn get(&self, id: &Identifier) -> Option<&Variable> {
        self.variables.get(id)
    }

    pub fn get_str(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.variables.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn is_occupied(&self, address: Address) -> bool {
        self.occupied.contains(&address)
    }

    pub fn next_heap_name(&mut self) -> Identifier {
        self.heap_serial += 1;
        Identifier::heap_block(self.heap_serial)
    }

    pub fn next_temp_name(&mut self) -> Identifier {
        self.temp_serial += 1;
        Identifier::temporary(self.temp_serial)
    }

    fn span_is_free(&self, address: Address, size: usize) -> bool {
        !self.by_address.contains_key(&address)
            && (address..address + size).all(|a| !self.occupied.contains(&a))
    }

    /// Pick an address for `size` bytes under the active policy
    pub fn allocate(&mut self, size: usize) -> Result<Address> {
        let mut rng = self.rng;
        let address = find_slot(
            self.policy,
            &mut rng,
            size,
            self.capacity,
            self.word_size,
            |a| self.span_is_free(a, size),
        )?;
        self.rng = rng;

        debug!(address, size, policy = %self.policy, "allocated");
        Ok(address)
    }

    /// Register a variable under its id and address
    pub fn insert(&mut self, variable: Variable) -> Result<()> {
        if self.variables.contains_key(&variable.id) {
            return Err(MachineError::DuplicateVariable(variable.id.to_string()));
        }
        if variable.is_temporary() {
            return Err(MachineError::runtime(format!(
                "temporary {} cannot be registered",
                variable.id
            )));
        }

        if !variable.is_reference() {
            self.occupied.extend(variable.address..variable.end());
        }
        self.by_address
            .entry(variable.address)
            .or_default()
            .push(variable.id.clone());
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Unregister a variable. Its bytes are left as they are.
    pub fn remove(&mut self, id: &Identifier) -> Option<Variable> {
        let variable = self.variables.shift_remove(id)?;
        if let Some(ids) = self.by_address.get_mut(&variable.address) {
            ids.retain(|other| other != id);
            if ids.is_empty() {
                self.by_address.remove(&variable.address);
            }
        }
        if !variable.is_reference() {
            for a in variable.address..variable.end() {
                self.occupied.remove(&a);
            }
        }
        Some(variable)
    }

    /// Every variable registered at exactly `address`
    pub fn at(&self, address: Address) -> impl Iterator<Item = &Variable> {
        self.by_address
            .get(&address)
            .into_iter()
            .flatten()
            .filter_map(|id| self.variables.get(id))
    }

    /// The variable at `address` whose type, seen through references, is `ty`.
    /// Owners are preferred over aliases.
    pub fn find_typed(
        &self,
        address: Address,
        ty: TypeId,
        types: &TypeSystem,
    ) -> Option<&Variable> {
        let mut matching = self
            .at(address)
            .filter(|v| types.strip_reference(v.ty) == types.strip_reference(ty));
        let first = matching.next()?;
        if !first.is_reference() {
            return Some(first);
        }
        matching.find(|v| !v.is_reference()).or(Some(first))
    }

    /// The byte-owning variable whose span covers `[address, address + length)`
    pub fn spanning(&self, address: Address, length: usize) -> Option<&Variable> {
        self.variables
            .values()
            .find(|v| !v.is_reference() && v.spans(address, length))
    }

    /// The heap block starting at `address`, for `free`/`delete`
    pub fn heap_block_at(&self, address: Address) -> Result<Identifier> {
        self.at(address)
            .find(|v| v.is_heap())
            .map(|v| v.id.clone())
            .ok_or(MachineError::NotHeapAddress(address))
    }

    /// Whether a reference's target still exists and still covers it
    pub fn is_bound(&self, variable: &Variable) -> bool {
        match &variable.kind {
            VariableKind::Reference { target } => self
                .variables
                .get(target)
                .is_some_and(|t| !t.is_reference() && t.spans(variable.address, variable.size)),
            _ => true,
        }
    }

    /// Remove every reference whose target has gone away
    pub fn collect_dangling(&mut self) -> Vec<Identifier> {
        let dangling: Vec<Identifier> = self
            .variables
            .values()
            .filter(|v| !self.is_bound(v))
            .map(|v| v.id.clone())
            .collect();
        for id in &dangling {
            self.remove(id);
            debug!(id = %id, "collected dangling reference");
        }
        dangling
    }

    /// Reverse the stored bytes of every owning variable in place, element by
    /// element for arrays, then flip the memory's byte order.
    pub fn switch_endianness(&self, memory: &mut Memory, types: &TypeSystem) -> Result<()> {
        for variable in self.variables.values().filter(|v| !v.is_reference()) {
            let (unit, count) = match types.kind(variable.ty) {
                TypeKind::Array { element, count } => (types.size(element), count),
                _ => (variable.size, 1),
            };
            if unit < 2 {
                continue;
            }
            for i in 0..count {
                memory.reverse(variable.address + i * unit, unit)?;
            }
        }
        memory.set_endianness(memory.endianness().toggled());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::codec::Endianness;
    use crate::memory::value::Literal;

    fn id(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    fn declare(table: &mut SymbolTable, types: &TypeSystem, name: &str, ty: &str) -> Variable {
        let ty = types.lookup(ty).unwrap();
        let address = table.allocate(types.size(ty)).unwrap();
        let variable = Variable::new(id(name), ty, address, types);
        table.insert(variable.clone()).unwrap();
        variable
    }

    #[test]
    fn test_aligned_layout_and_reuse() {
        let types = TypeSystem::new(4).unwrap();
        let mut table = SymbolTable::new(64, 4, AllocationPolicy::Aligned, 1);

        let a = declare(&mut table, &types, "a", "int");
        let b = declare(&mut table, &types, "b", "char");
        let c = declare(&mut table, &types, "c", "double");
        assert_eq!((a.address, b.address, c.address), (4, 8, 12));

        table.remove(&id("b")).unwrap();
        assert!(!table.is_occupied(8));
        let d = declare(&mut table, &types, "d", "short");
        assert_eq!(d.address, 8);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let types = TypeSystem::new(4).unwrap();
        let mut table = SymbolTable::new(64, 4, AllocationPolicy::Aligned, 1);
        let x = declare(&mut table, &types, "x", "int");
        assert!(matches!(
            table.insert(x),
            Err(MachineError::DuplicateVariable(name)) if name == "x"
        ));
    }

    #[test]
    fn test_scattered_never_overlaps() {
        let types = TypeSystem::new(4).unwrap();
        let mut table = SymbolTable::new(256, 4, AllocationPolicy::Scattered, 7);
        let mut placed = Vec::new();
        for i in 0..10 {
            placed.push(declare(&mut table, &types, &format!("v{}", i), "int"));
        }
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                assert!(a.end() <= b.address || b.end() <= a.address);
            }
        }
    }

    #[test]
    fn test_references_alias_and_dangle() {
        let types = TypeSystem::new(4).unwrap();
        let mut table = SymbolTable::new(64, 4, AllocationPolicy::Aligned, 1);
        let x = declare(&mut table, &types, "x", "int");

        let mut types = types;
        let int_ref = types.reference_to(x.ty).unwrap();
        let r = Variable {
            id: id("r"),
            ty: int_ref,
            address: x.address,
            size: x.size,
            kind: VariableKind::Reference { target: id("x") },
        };
        table.insert(r).unwrap();

        assert_eq!(table.at(x.address).count(), 2);
        assert_eq!(table.find_typed(x.address, x.ty, &types).unwrap().id, id("x"));
        assert!(table.collect_dangling().is_empty());

        table.remove(&id("x"));
        assert_eq!(table.collect_dangling(), vec![id("r")]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_heap_classification_is_by_name() {
        let types = TypeSystem::new(4).unwrap();
        let mut table = SymbolTable::new(64, 4, AllocationPolicy::Aligned, 1);
        let x = declare(&mut table, &types, "x", "int");
        assert!(matches!(
            table.heap_block_at(x.address),
            Err(MachineError::NotHeapAddress(_))
        ));

        let name = table.next_heap_name();
        let chr = types.lookup("char").unwrap();
        let address = table.allocate(1).unwrap();
        table
            .insert(Variable::new(name.clone(), chr, address, &types))
            .unwrap();
        assert_eq!(table.heap_block_at(address).unwrap(), name);
    }

    #[test]
    fn test_endianness_switch_is_element_wise() {
        let mut types = TypeSystem::new(4).unwrap();
        let mut table = SymbolTable::new(64, 4, AllocationPolicy::Aligned, 1);
        let mut memory = Memory::new(64, Endianness::Little).unwrap();

        let int = types.lookup("int").unwrap();
        let arr = types.array_of(int, 2).unwrap();
        let address = table.allocate(8).unwrap();
        table
            .insert(Variable::new(id("a"), arr, address, &types))
            .unwrap();
        memory.store(address, int, &Literal::Integer(1), &types).unwrap();
        memory
            .store(address + 4, int, &Literal::Integer(2), &types)
            .unwrap();

        table.switch_endianness(&mut memory, &types).unwrap();
        assert_eq!(memory.endianness(), Endianness::Big);
        assert_eq!(memory.read(address, 8).unwrap(), &[0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(memory.load(address + 4, int, &types).unwrap(), Literal::Integer(2));
    }
}
