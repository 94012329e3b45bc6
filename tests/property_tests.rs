//! Property-based tests for statement atomicity and byte order
//!
//! Uses proptest to check that:
//! - a failing statement leaves memory, symbols and history untouched
//! - switching byte order twice restores every byte
//! - integer declarations read back what they stored

use memlab::config::MachineConfig;
use memlab::interpreter::engine::Machine;
use memlab::memory::codec::Endianness;
use memlab::memory::value::Literal;
use memlab::symbols::{AllocationPolicy, Variable};
use proptest::prelude::*;

const STATEMENTS: &[&str] = &[
    "int a = 1",
    "int b = a * 3",
    "double d = a / 2.0",
    "int* p = &a",
    "*p = *p + 1",
    "int& r = a",
    "r = r - 5",
    "char s[8] = \"bytes\"",
    "s[0] = 'B'",
    "int* h = new int[3]",
    "h[1] = a",
    "h[3] = 1",
    "free(h)",
    "delete p",
    "long l = missing + 1",
    "int q = typeof(a)",
    "a = a % 0",
    "char* t = \"heap text\"",
    "short w = 70000",
    "uint u = a - 10",
];

fn state(m: &Machine) -> (Vec<u8>, Vec<Variable>, usize) {
    (
        m.memory().to_vec(),
        m.variables().cloned().collect(),
        m.history().len(),
    )
}

proptest! {
    /// Every statement either commits or leaves no observable change.
    #[test]
    fn prop_statements_are_atomic(
        script in prop::collection::vec(prop::sample::select(STATEMENTS), 1..30),
        scattered in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let allocation = if scattered {
            AllocationPolicy::Scattered
        } else {
            AllocationPolicy::Aligned
        };
        let config = MachineConfig {
            seed,
            ..MachineConfig::default()
        }
        .with_allocation(allocation);
        let mut m = Machine::new(config).unwrap();

        for statement in script {
            let before = state(&m);
            match m.execute(statement) {
                Ok(_) => prop_assert_eq!(m.history().len(), before.2 + 1),
                Err(_) => prop_assert_eq!(state(&m), before),
            }
            // no reference outlives its target
            for variable in m.variables() {
                prop_assert!(m.symbols().is_bound(variable));
            }
        }
    }

    /// Switching byte order there and back is the identity on memory.
    #[test]
    fn prop_endianness_round_trip(
        values in prop::collection::vec(any::<i32>(), 1..6),
        wide in any::<i64>(),
    ) {
        let mut m = Machine::new(MachineConfig::default().with_memory_size(512)).unwrap();
        for (i, v) in values.iter().enumerate() {
            m.execute(&format!("int v{} = {}", i, v)).unwrap();
        }
        m.execute(&format!("int64_t w = {}", wide)).unwrap();
        let original = m.memory().to_vec();

        m.set_endianness(Endianness::Big).unwrap();
        for (i, v) in values.iter().enumerate() {
            let variable = m.lookup(&format!("v{}", i)).unwrap().clone();
            prop_assert_eq!(m.value_of(&variable).unwrap(), Literal::Integer(*v as i128));
        }
        m.set_endianness(Endianness::Little).unwrap();
        prop_assert_eq!(m.memory(), original.as_slice());
    }

    /// Declared integers read back exactly, wrapped to their width.
    #[test]
    fn prop_integer_declarations_read_back(value in any::<i32>(), word_size in prop::sample::select(vec![2usize, 4, 8])) {
        let mut m = Machine::new(MachineConfig::default().with_word_size(word_size)).unwrap();
        let x = m.execute(&format!("int32_t x = {}", value)).unwrap().unwrap();
        prop_assert_eq!(x.size, 4);
        prop_assert_eq!(m.value_of(&x).unwrap(), Literal::Integer(value as i128));
    }
}
