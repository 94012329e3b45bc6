//! Type catalog and interning
//!
//! Every type the machine knows about lives in a [`TypeSystem`] and is referred
//! to by a copyable [`TypeId`] handle. Derived types (pointers, references,
//! arrays) are interned through a map keyed by their [`TypeKind`], so two
//! handles are equal exactly when they describe the same shape and type
//! identity can be compared with `==`.
//!
//! # Sizes
//!
//! Primitive sizes follow the configured word size `w`:
//!
//! | type | size |
//! |------|------|
//! | `char`, `int8_t`, `uint8_t` | 1 |
//! | `short`, `ushort` | w / 2 |
//! | `int`, `uint`, `float` | w |
//! | `long`, `ulong`, `double` | 2w |
//! | pointers and references | w |
//! | `type_t` | 1 |
//!
//! Changing the word size means building a fresh catalog; handles from an old
//! catalog must not be used with a new one.

use crate::interpreter::constants::MAX_INDIRECTION;
use crate::interpreter::errors::{MachineError, Result};
use rustc_hash::FxHashMap;

/// Handle to an interned type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Built-in scalar types. The discriminant is the index stored in the low five
/// bits of a type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Any = 0,
    Char = 1,
    Int8 = 2,
    UInt8 = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Short = 10,
    UShort = 11,
    Int = 12,
    UInt = 13,
    Long = 14,
    ULong = 15,
    Float = 16,
    Double = 17,
}

impl Primitive {
    pub const ALL: [Primitive; 18] = [
        Primitive::Any,
        Primitive::Char,
        Primitive::Int8,
        Primitive::UInt8,
        Primitive::Int16,
        Primitive::UInt16,
        Primitive::Int32,
        Primitive::UInt32,
        Primitive::Int64,
        Primitive::UInt64,
        Primitive::Short,
        Primitive::UShort,
        Primitive::Int,
        Primitive::UInt,
        Primitive::Long,
        Primitive::ULong,
        Primitive::Float,
        Primitive::Double,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Primitive> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Any => "any",
            Primitive::Char => "char",
            Primitive::Int8 => "int8_t",
            Primitive::UInt8 => "uint8_t",
            Primitive::Int16 => "int16_t",
            Primitive::UInt16 => "uint16_t",
            Primitive::Int32 => "int32_t",
            Primitive::UInt32 => "uint32_t",
            Primitive::Int64 => "int64_t",
            Primitive::UInt64 => "uint64_t",
            Primitive::Short => "short",
            Primitive::UShort => "ushort",
            Primitive::Int => "int",
            Primitive::UInt => "uint",
            Primitive::Long => "long",
            Primitive::ULong => "ulong",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    pub fn size(self, word_size: usize) -> usize {
        match self {
            Primitive::Any => 0,
            Primitive::Char | Primitive::Int8 | Primitive::UInt8 => 1,
            Primitive::Int16 | Primitive::UInt16 => 2,
            Primitive::Int32 | Primitive::UInt32 => 4,
            Primitive::Int64 | Primitive::UInt64 => 8,
            Primitive::Short | Primitive::UShort => word_size / 2,
            Primitive::Int | Primitive::UInt | Primitive::Float => word_size,
            Primitive::Long | Primitive::ULong | Primitive::Double => word_size * 2,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::Float | Primitive::Double)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Primitive::Char
                | Primitive::Int8
                | Primitive::Int16
                | Primitive::Int32
                | Primitive::Int64
                | Primitive::Short
                | Primitive::Int
                | Primitive::Long
        )
    }

    /// Everything except `any` takes part in arithmetic
    pub fn is_arithmetic(self) -> bool {
        self != Primitive::Any
    }
}

/// The shape of a type. Used as the interning key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive(Primitive),
    /// `target` is never itself a pointer; `depth` counts the stars
    Pointer { target: TypeId, depth: u8 },
    Reference { target: TypeId },
    Array { element: TypeId, count: usize },
    /// The reflective `type_t`
    TypeValue,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub kind: TypeKind,
    pub size: usize,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct TypeSystem {
    word_size: usize,
    types: Vec<TypeInfo>,
    interned: FxHashMap<TypeKind, TypeId>,
    by_name: FxHashMap<&'static str, TypeId>,
}

impl TypeSystem {
    pub fn new(word_size: usize) -> Result<Self> {
        if !matches!(word_size, 2 | 4 | 8) {
            return Err(MachineError::InvalidWordSize(word_size));
        }

        let mut system = TypeSystem {
            word_size,
            types: Vec::new(),
            interned: FxHashMap::default(),
            by_name: FxHashMap::default(),
        };

        for primitive in Primitive::ALL {
            let id = system.intern(TypeKind::Primitive(primitive));
            system.by_name.insert(primitive.name(), id);
        }
        let type_value = system.intern(TypeKind::TypeValue);
        system.by_name.insert("type_t", type_value);

        Ok(system)
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }

        let (size, name) = match kind {
            TypeKind::Primitive(p) => (p.size(self.word_size), p.name().to_string()),
            TypeKind::Pointer { target, depth } => (
                self.word_size,
                format!("{}{}", self.name(target), "*".repeat(depth as usize)),
            ),
            TypeKind::Reference { target } => (self.word_size, format!("{}&", self.name(target))),
            TypeKind::Array { element, count } => (
                self.size(element) * count,
                format!("{}[{}]", self.name(element), count),
            ),
            TypeKind::TypeValue => (1, "type_t".to_string()),
        };

        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeInfo { kind, size, name });
        self.interned.insert(kind, id);
        id
    }

    /// Look up an already interned shape
    pub fn find(&self, kind: TypeKind) -> Option<TypeId> {
        self.interned.get(&kind).copied()
    }

    pub fn info(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.index()]
    }

    pub fn kind(&self, id: TypeId) -> TypeKind {
        self.info(id).kind
    }

    pub fn size(&self, id: TypeId) -> usize {
        self.info(id).size
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.info(id).name
    }

    /// Look up a type by its keyword (`int`, `double`, `type_t`, ...)
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn is_type_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_name.keys().copied()
    }

    pub fn primitive(&self, primitive: Primitive) -> TypeId {
        // Primitives are interned first, in index order
        TypeId(primitive.index() as u32)
    }

    pub fn type_value(&self) -> TypeId {
        TypeId(Primitive::ALL.len() as u32)
    }

    pub fn pointer_to(&mut self, target: TypeId) -> Result<TypeId> {
        let (base, depth) = match self.kind(target) {
            TypeKind::Pointer { target, depth } => (target, depth + 1),
            TypeKind::Reference { target } => return self.pointer_to(target),
            _ => (target, 1),
        };
        if depth > MAX_INDIRECTION {
            return Err(MachineError::mismatch(
                format!("at most {} levels of indirection", MAX_INDIRECTION),
                format!("{}*", self.name(target)),
            ));
        }
        Ok(self.intern(TypeKind::Pointer { target: base, depth }))
    }

    pub fn reference_to(&mut self, target: TypeId) -> Result<TypeId> {
        match self.kind(target) {
            TypeKind::Reference { .. } => Err(MachineError::mismatch(
                "a non-reference type",
                self.name(target).to_string(),
            )),
            _ => Ok(self.intern(TypeKind::Reference { target })),
        }
    }

    pub fn array_of(&mut self, element: TypeId, count: usize) -> Result<TypeId> {
        match self.kind(element) {
            TypeKind::Reference { .. } | TypeKind::Array { .. } => Err(MachineError::mismatch(
                "a scalar element type",
                self.name(element).to_string(),
            )),
            TypeKind::Primitive(Primitive::Any) => {
                Err(MachineError::mismatch("a sized element type", "any"))
            }
            _ if count == 0 => Err(MachineError::runtime("array length must be positive")),
            _ => {
                if self.size(element).checked_mul(count).is_none() {
                    return Err(MachineError::MemoryExhausted {
                        requested: usize::MAX,
                    });
                }
                Ok(self.intern(TypeKind::Array { element, count }))
            }
        }
    }

    /// The type obtained by one level of dereference, if `id` is a pointer
    pub fn pointee(&mut self, id: TypeId) -> Option<TypeId> {
        match self.kind(self.strip_reference(id)) {
            TypeKind::Pointer { target, depth: 1 } => Some(target),
            TypeKind::Pointer { target, depth } => Some(self.intern(TypeKind::Pointer {
                target,
                depth: depth - 1,
            })),
            _ => None,
        }
    }

    pub fn strip_reference(&self, id: TypeId) -> TypeId {
        match self.kind(id) {
            TypeKind::Reference { target } => target,
            _ => id,
        }
    }

    /// Arrays decay to a pointer to their element type
    pub fn decay(&mut self, id: TypeId) -> TypeId {
        let id = self.strip_reference(id);
        match self.kind(id) {
            TypeKind::Array { element, .. } => self.pointer_to(element).unwrap_or(id),
            _ => id,
        }
    }

    pub fn as_primitive(&self, id: TypeId) -> Option<Primitive> {
        match self.kind(self.strip_reference(id)) {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.kind(self.strip_reference(id)), TypeKind::Pointer { .. })
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        matches!(self.kind(self.strip_reference(id)), TypeKind::Array { .. })
    }

    pub fn is_reference(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Reference { .. })
    }

    pub fn is_any(&self, id: TypeId) -> bool {
        self.as_primitive(id) == Some(Primitive::Any)
    }

    pub fn is_arithmetic(&self, id: TypeId) -> bool {
        self.as_primitive(id).is_some_and(Primitive::is_arithmetic)
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        self.as_primitive(id).is_some_and(Primitive::is_float)
    }

    /// `any*`, `any**`, ...
    pub fn is_pointer_to_any(&self, id: TypeId) -> bool {
        match self.kind(self.strip_reference(id)) {
            TypeKind::Pointer { target, .. } => self.is_any(target),
            _ => false,
        }
    }

    /// `char*` reads back as text
    pub fn is_char_pointer(&self, id: TypeId) -> bool {
        match self.kind(self.strip_reference(id)) {
            TypeKind::Pointer { target, depth: 1 } => {
                self.as_primitive(target) == Some(Primitive::Char)
            }
            _ => false,
        }
    }

    pub fn is_char_array(&self, id: TypeId) -> bool {
        match self.kind(self.strip_reference(id)) {
            TypeKind::Array { element, .. } => self.as_primitive(element) == Some(Primitive::Char),
            _ => false,
        }
    }

    /// Compatibility of two operand types, shared by every binary operator,
    /// assignment and call-site parameter check.
    ///
    /// References compare as their target and arrays as a pointer to their
    /// element.
    pub fn is_compatible_with(&mut self, a: TypeId, b: TypeId) -> bool {
        let a = self.decay(a);
        let b = self.decay(b);

        if self.is_any(a) || self.is_any(b) || self.is_pointer_to_any(a) || self.is_pointer_to_any(b)
        {
            return true;
        }
        if a == b {
            return true;
        }

        let (a_ptr, b_ptr) = (self.is_pointer(a), self.is_pointer(b));
        let (a_num, b_num) = (self.is_arithmetic(a), self.is_arithmetic(b));

        (a_ptr && b_ptr) || (a_ptr && b_num) || (a_num && b_ptr) || (a_num && b_num)
    }

    pub fn check_compatible(&mut self, expected: TypeId, found: TypeId) -> Result<()> {
        if self.is_compatible_with(expected, found) {
            Ok(())
        } else {
            Err(MachineError::mismatch(
                self.name(expected).to_string(),
                self.name(found).to_string(),
            ))
        }
    }

    /// Element type and count, for array types
    pub fn array_shape(&self, id: TypeId) -> Option<(TypeId, usize)> {
        match self.kind(self.strip_reference(id)) {
            TypeKind::Array { element, count } => Some((element, count)),
            _ => None,
        }
    }

    /// Natural type of an integer literal: `int` if it fits, else `long`
    pub fn integer_literal_type(&self, value: i128) -> TypeId {
        let bits = (self.word_size * 8) as u32;
        let fits = bits >= 128 || (value >= -(1i128 << (bits - 1)) && value < (1i128 << (bits - 1)));
        if fits {
            self.primitive(Primitive::Int)
        } else {
            self.primitive(Primitive::Long)
        }
    }
}
