// Execution engine for the memory machine

use crate::config::MachineConfig;
use crate::interpreter::builtins::FunctionTable;
use crate::interpreter::console::Console;
use crate::interpreter::constants::{RESET_SNAPSHOT, STREAM_DESCRIPTORS};
use crate::interpreter::errors::{MachineError, ProgramError, Result};
use crate::interpreter::inspect::Inspector;
use crate::interpreter::operand::Operand;
use crate::memory::codec::Endianness;
use crate::memory::value::Literal;
use crate::memory::Memory;
use crate::parser::identifier::Identifier;
use crate::parser::lexer::clean_statement;
use crate::parser::opcode::Opcode;
use crate::parser::parse_statement;
use crate::snapshot::{History, Snapshot};
use crate::symbols::{AllocationPolicy, SymbolTable, Variable, VariableKind};
use crate::types::{Primitive, TypeId, TypeSystem};
use tracing::{debug, info, trace, warn};

/// One simulated machine: memory, symbols, types, builtins and the operand
/// stack, driven one statement at a time
pub struct Machine {
    pub(crate) config: MachineConfig,
    pub(crate) types: TypeSystem,
    pub(crate) memory: Memory,
    pub(crate) symbols: SymbolTable,
    pub(crate) functions: FunctionTable,

    /// Operand stack, only meaningful while a statement runs
    pub(crate) stack: Vec<Operand>,

    /// Host I/O used by `print` and `input`
    pub(crate) console: Console,

    /// Committed states, oldest first, starting with the last reset
    history: History,
}

impl Machine {
    /// Create a machine with no console attached
    pub fn new(config: MachineConfig) -> Result<Self> {
        Self::with_console(config, Console::silent())
    }

    pub fn with_console(config: MachineConfig, console: Console) -> Result<Self> {
        config.validate()?;

        let mut types = TypeSystem::new(config.word_size)?;
        let functions = FunctionTable::standard(&mut types)?;
        let memory = Memory::new(config.memory_size, config.endianness)?;
        let symbols = SymbolTable::new(
            config.memory_size,
            config.word_size,
            config.allocation,
            config.seed,
        );
        let history = History::new(config.history_limit);

        let mut machine = Machine {
            config,
            types,
            memory,
            symbols,
            functions,
            stack: Vec::new(),
            console,
            history,
        };
        machine.reset()?;
        Ok(machine)
    }

    pub fn set_console(&mut self, console: Console) {
        self.console = console;
    }

    /// Run one statement. Either every opcode commits or the machine is left
    /// exactly as it was.
    ///
    /// Returns the statement's result: the variable it names, or a temporary
    /// holding the value it computed. Statements with no result (a `free`, a
    /// blank line) return `None`.
    pub fn execute(&mut self, text: &str) -> Result<Option<Variable>> {
        let statement = clean_statement(text);
        let ops = parse_statement(statement, &mut self.types, &self.symbols)?;
        if ops.is_empty() {
            return Ok(None);
        }

        self.stack.clear();
        let before = Snapshot::capture(statement, &self.memory, &self.symbols);

        match self.run_opcodes(&ops) {
            Ok(result) => {
                let collected = self.symbols.collect_dangling();
                self.history
                    .push(Snapshot::capture(statement, &self.memory, &self.symbols));
                debug!(
                    statement,
                    opcodes = ops.len(),
                    collected = collected.len(),
                    "statement committed"
                );
                Ok(result)
            }
            Err(err) => {
                self.restore(&before)?;
                warn!(statement, error = %err, "statement rolled back");
                Err(err)
            }
        }
    }

    /// Execute newline separated statements in order, stopping at the first
    /// failure. Blank and comment-only lines are skipped.
    pub fn run_program(&mut self, source: &str) -> std::result::Result<Vec<Variable>, ProgramError> {
        let mut results = Vec::new();
        for (index, line) in source.lines().enumerate() {
            if clean_statement(line).is_empty() {
                continue;
            }
            match self.execute(line) {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(source) => {
                    return Err(ProgramError {
                        line: index + 1,
                        source,
                    })
                }
            }
        }
        Ok(results)
    }

    fn run_opcodes(&mut self, ops: &[Opcode]) -> Result<Option<Variable>> {
        for op in ops {
            trace!(opcode = %op, depth = self.stack.len(), "execute");
            self.execute_opcode(op)?;
        }

        match self.stack.len() {
            0 => Ok(None),
            1 => {
                let result = self.pop()?;
                self.resolve_result(result).map(Some)
            }
            n => Err(MachineError::runtime(format!(
                "statement left {} values behind",
                n
            ))),
        }
    }

    fn execute_opcode(&mut self, op: &Opcode) -> Result<()> {
        match op {
            Opcode::Push(literal) => self.exec_push(literal),
            Opcode::PushTyped(literal, ty) => {
                self.push_value(literal.clone(), *ty);
                Ok(())
            }
            Opcode::PushId(id) => self.exec_push_id(id),
            Opcode::AddressOf => self.exec_address_of(),
            Opcode::Dereference { levels } => self.exec_dereference(*levels),
            Opcode::Index => self.exec_index(),
            Opcode::Binary(op) => self.exec_binary(*op),
            Opcode::Assign => self.exec_assign(),
            Opcode::Create {
                ty,
                id,
                initialized,
            } => self.exec_create(*ty, id, *initialized),
            Opcode::Call { name, argc } => self.exec_call(name, *argc),
            Opcode::Discard => self.pop().map(drop),
        }
    }

    /// Turn the last operand into the statement's result variable
    fn resolve_result(&mut self, operand: Operand) -> Result<Variable> {
        match operand {
            Operand::Variable(id) => self.variable(&id).cloned(),
            Operand::Place { address, ty, .. } => {
                let value = self.memory.load(address, ty, &self.types)?;
                Ok(Variable {
                    id: self.symbols.next_temp_name(),
                    ty,
                    address,
                    size: self.types.size(ty),
                    kind: VariableKind::Temporary(value),
                })
            }
            Operand::Value { literal, ty } => Ok(Variable {
                id: self.symbols.next_temp_name(),
                ty,
                address: 0,
                size: self.types.size(ty),
                kind: VariableKind::Temporary(literal),
            }),
        }
    }

    /// Restore memory and symbols from a snapshot
    fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.memory.restore(&snapshot.memory)?;
        self.memory.set_endianness(snapshot.endianness);
        self.symbols = snapshot.symbols.clone();
        self.symbols.set_policy(self.config.allocation);
        self.config.endianness = snapshot.endianness;
        self.stack.clear();
        Ok(())
    }

    // ========== Configuration ==========

    /// Clear memory and symbols, register the stream descriptors and start a
    /// fresh history
    pub fn reset(&mut self) -> Result<()> {
        self.memory.clear();
        self.symbols.clear();
        self.stack.clear();
        self.register_streams()?;

        self.history.clear();
        self.history.push(Snapshot::capture(
            RESET_SNAPSHOT,
            &self.memory,
            &self.symbols,
        ));

        info!(
            word_size = self.config.word_size,
            memory = self.memory.len(),
            endianness = %self.memory.endianness(),
            allocation = %self.symbols.policy(),
            "machine reset"
        );
        Ok(())
    }

    fn register_streams(&mut self) -> Result<()> {
        let int = self.types.primitive(Primitive::Int);
        for (name, descriptor) in STREAM_DESCRIPTORS {
            let id = Identifier::new(name)?;
            let address = self.symbols.allocate(self.types.size(int))?;
            self.symbols
                .insert(Variable::new(id, int, address, &self.types))?;
            self.memory
                .store(address, int, &Literal::Integer(descriptor), &self.types)?;
        }
        Ok(())
    }

    /// Switch byte order, rewriting every stored value so it reads the same
    pub fn set_endianness(&mut self, endianness: Endianness) -> Result<()> {
        if endianness == self.memory.endianness() {
            return Ok(());
        }
        self.symbols
            .switch_endianness(&mut self.memory, &self.types)?;
        self.config.endianness = endianness;
        self.history.push(Snapshot::capture(
            format!("<{}>", endianness),
            &self.memory,
            &self.symbols,
        ));
        info!(%endianness, "byte order switched");
        Ok(())
    }

    /// Change the word size. Every type size changes with it, so the type
    /// catalog and builtins are rebuilt and the machine is reset.
    pub fn set_word_size(&mut self, word_size: usize) -> Result<()> {
        let config = self.config.clone().with_word_size(word_size);
        config.validate()?;

        let mut types = TypeSystem::new(word_size)?;
        self.functions = FunctionTable::standard(&mut types)?;
        self.types = types;
        self.symbols = SymbolTable::new(
            config.memory_size,
            word_size,
            config.allocation,
            config.seed,
        );
        self.config = config;
        self.reset()
    }

    pub fn set_allocation_policy(&mut self, policy: AllocationPolicy) {
        self.config.allocation = policy;
        self.symbols.set_policy(policy);
        info!(%policy, "allocation policy changed");
    }

    /// Go back to a history entry, discarding everything after it
    pub fn revert_to(&mut self, index: usize) -> Result<()> {
        let snapshot = self
            .history
            .get(index)
            .cloned()
            .ok_or_else(|| MachineError::runtime(format!("no history entry {}", index)))?;
        self.restore(&snapshot)?;
        self.history.truncate(index);
        info!(index, name = %snapshot.name, "reverted");
        Ok(())
    }

    // ========== Inspection ==========

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn types(&self) -> &TypeSystem {
        &self.types
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Raw memory contents
    pub fn memory(&self) -> &[u8] {
        self.memory.bytes()
    }

    pub fn endianness(&self) -> Endianness {
        self.memory.endianness()
    }

    pub fn word_size(&self) -> usize {
        self.types.word_size()
    }

    pub fn allocation_policy(&self) -> AllocationPolicy {
        self.symbols.policy()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Every registered variable in declaration order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.symbols.iter()
    }

    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.symbols.get_str(name)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub(crate) fn variable(&self, id: &Identifier) -> Result<&Variable> {
        self.symbols
            .get(id)
            .ok_or_else(|| MachineError::UnknownVariable(id.to_string()))
    }

    /// Value rendering over the live memory
    pub fn inspector(&self) -> Inspector<'_> {
        Inspector::new(&self.memory, &self.types)
    }

    /// See [`Inspector::value_of`]
    pub fn value_of(&self, variable: &Variable) -> Result<Literal> {
        self.inspector().value_of(variable)
    }

    pub fn elements(&self, variable: &Variable) -> Result<Vec<Literal>> {
        self.inspector().elements(variable)
    }

    pub fn format_value(&self, literal: &Literal, ty: TypeId) -> String {
        self.inspector().format_value(literal, ty)
    }

    /// `name: type @ 0xADDR = value`
    pub fn describe(&self, variable: &Variable) -> String {
        self.inspector().describe(variable)
    }
}
