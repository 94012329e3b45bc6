//! Built-in function implementations
//!
//! Every callable the language knows is registered here in one static table,
//! built when the machine is created and rebuilt whenever the word size
//! changes (parameter types depend on it). A [`Function`] declares its
//! parameters; the call opcode checks arity and types against them before the
//! body runs, so bodies can index their arguments directly.
//!
//! # Supported Built-ins
//!
//! - `malloc(size)`: register a `char[size]` heap block, returns `any*`
//! - `free(ptr)`, `delete ptr`: unregister the heap block at `ptr`
//! - `new T`, `new T[n]`: register a typed heap block, returns `T*`
//! - `sizeof(x)`, `typeof(x)`: size in bytes and type of a value or type
//! - `int(x)`, `double(x)`, `char(x)`, ...: one cast per arithmetic type
//! - `print(x)`, `input(prompt)`: host console I/O
//! - `strlen(s)`, `abs(x)`, `sqrt(x)`, `pow(x, y)`
//!
//! # Implementation Notes
//!
//! - Freed blocks are unregistered but their bytes are left as they are
//! - `free(null)` does nothing
//! - Bodies push at most one result and never pop; the caller already did

use crate::interpreter::engine::Machine;
use crate::interpreter::errors::{MachineError, Result};
use crate::interpreter::operand::Operand;
use crate::memory::codec::wrap_int;
use crate::memory::text_bytes;
use crate::memory::value::Literal;
use crate::types::{Primitive, TypeId, TypeSystem};
use rustc_hash::FxHashMap;
use std::fmt;
use tracing::debug;

pub type NativeFn = fn(&mut Machine, &[Operand]) -> Result<()>;

#[derive(Clone, Copy)]
pub enum Body {
    Native(NativeFn),
    /// Conversion to an arithmetic primitive, named after it
    Cast(Primitive),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Native(_) => f.write_str("Native"),
            Body::Cast(primitive) => write!(f, "Cast({})", primitive.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    pub name: &'static str,
    pub ty: TypeId,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: &'static str,
    pub params: Vec<Param>,
    pub body: Body,
}

impl Function {
    pub fn invoke(&self, machine: &mut Machine, args: &[Operand]) -> Result<()> {
        match self.body {
            Body::Native(body) => body(machine, args),
            Body::Cast(primitive) => machine.builtin_cast(primitive, args),
        }
    }

    /// `name(type param, ...)`
    pub fn signature(&self, types: &TypeSystem) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{} {}", types.name(p.ty), p.name))
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: FxHashMap<&'static str, Function>,
}

impl FunctionTable {
    /// The standard library, typed against `types`
    pub fn standard(types: &mut TypeSystem) -> Result<Self> {
        let any = types.primitive(Primitive::Any);
        let any_ptr = types.pointer_to(any)?;
        let char_ptr = types.pointer_to(types.primitive(Primitive::Char))?;
        let uint = types.primitive(Primitive::UInt);
        let double = types.primitive(Primitive::Double);
        let type_t = types.type_value();

        let mut table = FunctionTable::default();
        table.native("malloc", &[("size", uint)], Machine::builtin_malloc);
        table.native("free", &[("ptr", any_ptr)], Machine::builtin_free);
        table.native("delete", &[("ptr", any_ptr)], Machine::builtin_free);
        table.native("new", &[("type", type_t)], Machine::builtin_new);
        table.native(
            "new[]",
            &[("type", type_t), ("count", uint)],
            Machine::builtin_new_array,
        );
        table.native("sizeof", &[("value", any)], Machine::builtin_sizeof);
        table.native("typeof", &[("value", any)], Machine::builtin_typeof);
        table.native("print", &[("value", any)], Machine::builtin_print);
        table.native("input", &[("prompt", char_ptr)], Machine::builtin_input);
        table.native("strlen", &[("text", char_ptr)], Machine::builtin_strlen);
        table.native("abs", &[("value", any)], Machine::builtin_abs);
        table.native("sqrt", &[("x", double)], Machine::builtin_sqrt);
        table.native("pow", &[("x", double), ("y", double)], Machine::builtin_pow);

        for primitive in Primitive::ALL.into_iter().filter(|p| p.is_arithmetic()) {
            table.register(Function {
                name: primitive.name(),
                params: vec![Param {
                    name: "value",
                    ty: any,
                }],
                body: Body::Cast(primitive),
            });
        }
        Ok(table)
    }

    pub fn register(&mut self, function: Function) {
        self.functions.insert(function.name, function);
    }

    fn native(&mut self, name: &'static str, params: &[(&'static str, TypeId)], body: NativeFn) {
        self.register(Function {
            name,
            params: params.iter().map(|&(name, ty)| Param { name, ty }).collect(),
            body: Body::Native(body),
        });
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Every function, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        let mut functions: Vec<&Function> = self.functions.values().collect();
        functions.sort_by_key(|f| f.name);
        functions.into_iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Machine {
    pub(crate) fn builtin_malloc(&mut self, args: &[Operand]) -> Result<()> {
        let size = self.read_integer(&args[0])?;
        let count = usize::try_from(size)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| MachineError::runtime(format!("malloc size must be positive, got {}", size)))?;

        let chr = self.types.primitive(Primitive::Char);
        let block = self.types.array_of(chr, count)?;
        let address = self.allocate_heap(block)?;

        let any = self.types.primitive(Primitive::Any);
        let any_ptr = self.types.pointer_to(any)?;
        self.push_value(Literal::Integer(address as i128), any_ptr);
        Ok(())
    }

    /// `free` and `delete`
    pub(crate) fn builtin_free(&mut self, args: &[Operand]) -> Result<()> {
        let (pointer, _) = self.read_operand(&args[0])?;
        let address = pointer.as_address().ok_or(MachineError::NotHeapAddress(0))?;
        if address == 0 {
            return Ok(());
        }

        let block = self.symbols.heap_block_at(address)?;
        self.symbols.remove(&block);
        debug!(block = %block, address, "heap block released");
        Ok(())
    }

    pub(crate) fn builtin_new(&mut self, args: &[Operand]) -> Result<()> {
        let ty = self.type_argument(&args[0])?;
        let address = self.allocate_heap(ty)?;
        let pointer = self.types.pointer_to(ty)?;
        self.push_value(Literal::Integer(address as i128), pointer);
        Ok(())
    }

    pub(crate) fn builtin_new_array(&mut self, args: &[Operand]) -> Result<()> {
        let element = self.type_argument(&args[0])?;
        let count = self.read_integer(&args[1])?;
        let count = usize::try_from(count)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| MachineError::runtime(format!("array length must be positive, got {}", count)))?;

        let block = self.types.array_of(element, count)?;
        let address = self.allocate_heap(block)?;
        let pointer = self.types.pointer_to(element)?;
        self.push_value(Literal::Integer(address as i128), pointer);
        Ok(())
    }

    pub(crate) fn builtin_sizeof(&mut self, args: &[Operand]) -> Result<()> {
        let ty = self.reflected_type(&args[0])?;
        let uint = self.types.primitive(Primitive::UInt);
        self.push_value(Literal::Integer(self.types.size(ty) as i128), uint);
        Ok(())
    }

    pub(crate) fn builtin_typeof(&mut self, args: &[Operand]) -> Result<()> {
        let ty = self.reflected_type(&args[0])?;
        let type_t = self.types.type_value();
        self.push_value(Literal::Type(ty), type_t);
        Ok(())
    }

    pub(crate) fn builtin_print(&mut self, args: &[Operand]) -> Result<()> {
        let mut text = self.printable(&args[0])?;
        text.push('\n');
        self.console.write(&text);
        Ok(())
    }

    pub(crate) fn builtin_input(&mut self, args: &[Operand]) -> Result<()> {
        let prompt = self.read_text(&args[0])?;
        let line = self
            .console
            .read_line(&prompt)
            .ok_or_else(|| MachineError::runtime("input is closed"))?;

        let address = self.allocate_text(&line)?;
        let char_ptr = self.types.pointer_to(self.types.primitive(Primitive::Char))?;
        self.push_value(Literal::Integer(address as i128), char_ptr);
        Ok(())
    }

    pub(crate) fn builtin_strlen(&mut self, args: &[Operand]) -> Result<()> {
        let length = text_bytes(&self.read_text(&args[0])?)?.len();
        let uint = self.types.primitive(Primitive::UInt);
        self.push_value(Literal::Integer(length as i128), uint);
        Ok(())
    }

    pub(crate) fn builtin_abs(&mut self, args: &[Operand]) -> Result<()> {
        let (value, ty) = self.read_operand(&args[0])?;
        let primitive = self
            .types
            .as_primitive(ty)
            .filter(|p| p.is_arithmetic())
            .ok_or_else(|| MachineError::mismatch("a number", self.types.name(ty).to_string()))?;

        let result = match value {
            Literal::Float(x) => Literal::Float(x.abs()),
            other => {
                let n = other
                    .as_integer()
                    .ok_or_else(|| MachineError::mismatch("a number", "text"))?;
                let width = primitive.size(self.types.word_size());
                Literal::Integer(wrap_int(n.wrapping_abs(), width, primitive.is_signed()))
            }
        };
        self.push_value(result, ty);
        Ok(())
    }

    pub(crate) fn builtin_sqrt(&mut self, args: &[Operand]) -> Result<()> {
        let x = self.read_float(&args[0])?;
        let double = self.types.primitive(Primitive::Double);
        self.push_value(Literal::Float(x.sqrt()), double);
        Ok(())
    }

    pub(crate) fn builtin_pow(&mut self, args: &[Operand]) -> Result<()> {
        let x = self.read_float(&args[0])?;
        let y = self.read_float(&args[1])?;
        let double = self.types.primitive(Primitive::Double);
        self.push_value(Literal::Float(x.powf(y)), double);
        Ok(())
    }

    /// Convert a number or pointer to `primitive`, wrapping integers to its
    /// width
    pub(crate) fn builtin_cast(&mut self, primitive: Primitive, args: &[Operand]) -> Result<()> {
        let (value, ty) = self.read_operand(&args[0])?;
        let castable = self.types.is_arithmetic(ty) || self.types.is_pointer(ty);
        let invalid = || MachineError::mismatch("a number or pointer", format!("{:?}", value));
        if !castable {
            return Err(MachineError::mismatch(
                "a number or pointer",
                self.types.name(ty).to_string(),
            ));
        }

        let width = primitive.size(self.types.word_size());
        let result = if primitive.is_float() {
            let x = value.as_float().ok_or_else(invalid)?;
            Literal::Float(if width == 4 { x as f32 as f64 } else { x })
        } else {
            let n = wrap_int(
                value.as_integer().ok_or_else(invalid)?,
                width,
                primitive.is_signed(),
            );
            if primitive == Primitive::Char {
                Literal::Char(n as u8)
            } else {
                Literal::Integer(n)
            }
        };
        self.push_value(result, self.types.primitive(primitive));
        Ok(())
    }

    /// A type literal names itself; any other operand stands for its type
    fn reflected_type(&self, operand: &Operand) -> Result<TypeId> {
        match operand {
            Operand::Value {
                literal: Literal::Type(ty),
                ..
            } => Ok(*ty),
            other => Ok(self.types.strip_reference(self.operand_type(other)?)),
        }
    }

    /// The type named by a `type_t` argument, which must have a size
    fn type_argument(&mut self, operand: &Operand) -> Result<TypeId> {
        let (value, _) = self.read_operand(operand)?;
        let Literal::Type(ty) = value else {
            return Err(MachineError::mismatch("a type", format!("{:?}", value)));
        };
        if self.types.size(ty) == 0 || self.types.is_reference(ty) {
            return Err(MachineError::mismatch(
                "a type with a size",
                self.types.name(ty).to_string(),
            ));
        }
        Ok(ty)
    }

    /// What `print` shows: text for strings, the character for `char`, and
    /// the usual rendering otherwise
    fn printable(&mut self, operand: &Operand) -> Result<String> {
        let ty = self.types.strip_reference(self.operand_type(operand)?);
        if self.types.is_char_pointer(ty) || self.types.is_char_array(ty) {
            if let Ok(text) = self.read_text(operand) {
                return Ok(text);
            }
        }
        let (value, ty) = self.read_operand(operand)?;
        Ok(match value {
            Literal::Char(c) => (c as char).to_string(),
            other => self.format_value(&other, ty),
        })
    }
}
