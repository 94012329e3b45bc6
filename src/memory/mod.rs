//! Memory model for the machine
//!
//! This module provides the flat byte store every variable lives in:
//! - [`value`]: the [`value::Literal`] tagged value and the [`value::Address`] type
//! - [`codec`]: endianness-aware integer and float codecs
//! - [`type_tag`]: the one-byte encoding used to store `type_t` values
//!
//! # Layout
//!
//! Memory is a single `Vec<u8>` whose size is fixed at construction. Every
//! access is bounds-checked; nothing is ever resized. Values are not cached
//! anywhere else, so what the memory holds is exactly what a variable reads
//! back.
//!
//! Pointers to `char` are the one special case on read: the host-facing
//! [`Memory::read_literal`] follows them and returns the NUL-terminated text.

pub mod codec;
pub mod type_tag;
pub mod value;

use crate::interpreter::errors::{MachineError, Result};
use crate::types::{Primitive, TypeId, TypeKind, TypeSystem};
use codec::Endianness;
use value::{Address, Literal};

/// Bytes of `text` as stored in a `char` array, one per character. Text is
/// Latin-1 in memory, so characters above U+00FF have no encoding.
pub fn text_bytes(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(c).map_err(|_| {
                MachineError::runtime(format!("character '{}' does not fit in a char", c))
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Vec<u8>,
    endianness: Endianness,
}

impl Memory {
    /// Create a zeroed memory of `size` bytes
    pub fn new(size: usize, endianness: Endianness) -> Result<Self> {
        if size <= 16 || size % 16 != 0 {
            return Err(MachineError::InvalidMemorySize(size));
        }
        Ok(Memory {
            bytes: vec![0; size],
            endianness,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Change the byte order used by the codecs. Existing bytes are left
    /// untouched; reordering them is the symbol table's job.
    pub(crate) fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    pub(crate) fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Overwrite the whole store, e.g. from a snapshot of the same size
    pub(crate) fn restore(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.bytes.len() {
            return Err(MachineError::InvalidMemorySize(bytes.len()));
        }
        self.bytes.copy_from_slice(bytes);
        Ok(())
    }

    fn check(&self, address: Address, length: usize) -> Result<()> {
        match address.checked_add(length) {
            Some(end) if end <= self.bytes.len() => Ok(()),
            _ => Err(MachineError::InvalidAddress { address, length }),
        }
    }

    pub fn read(&self, address: Address, length: usize) -> Result<&[u8]> {
        self.check(address, length)?;
        Ok(&self.bytes[address..address + length])
    }

    pub fn write(&mut self, address: Address, bytes: &[u8]) -> Result<()> {
        self.check(address, bytes.len())?;
        self.bytes[address..address + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Reverse a byte range in place
    pub(crate) fn reverse(&mut self, address: Address, length: usize) -> Result<()> {
        self.check(address, length)?;
        self.bytes[address..address + length].reverse();
        Ok(())
    }

    /// Decode the scalar stored at `address` as type `ty`
    pub fn load(&self, address: Address, ty: TypeId, types: &TypeSystem) -> Result<Literal> {
        let size = types.size(ty);
        match types.kind(ty) {
            TypeKind::Reference { target } => self.load(address, target, types),
            TypeKind::Primitive(Primitive::Any) | TypeKind::Array { .. } => Err(
                MachineError::mismatch("a scalar type", types.name(ty).to_string()),
            ),
            TypeKind::Primitive(Primitive::Char) => Ok(Literal::Char(self.read(address, 1)?[0])),
            TypeKind::Primitive(p) if p.is_float() => Ok(Literal::Float(codec::decode_float(
                self.read(address, size)?,
                self.endianness,
            )?)),
            TypeKind::Primitive(p) => Ok(Literal::Integer(codec::decode_int(
                self.read(address, size)?,
                p.is_signed(),
                self.endianness,
            )?)),
            TypeKind::Pointer { .. } => Ok(Literal::Integer(codec::decode_int(
                self.read(address, size)?,
                false,
                self.endianness,
            )?)),
            TypeKind::TypeValue => {
                let tag = self.read(address, 1)?[0];
                Ok(Literal::Type(type_tag::resolve(tag, types)?))
            }
        }
    }

    /// Read a NUL-terminated string starting at `address`
    pub fn load_text(&self, address: Address) -> Result<String> {
        if address == 0 {
            return Err(MachineError::InvalidAddress { address, length: 1 });
        }
        let tail = self.read(address, self.bytes.len().saturating_sub(address))?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(MachineError::InvalidAddress {
                address,
                length: tail.len() + 1,
            })?;
        Ok(tail[..end].iter().map(|&b| b as char).collect())
    }

    /// Decode a value for display: like [`Memory::load`], except that `char*`
    /// follows the pointer to its text and `char[n]` reads as text.
    pub fn read_literal(&self, address: Address, ty: TypeId, types: &TypeSystem) -> Result<Literal> {
        if types.is_char_pointer(ty) {
            let pointer = self.load(address, ty, types)?;
            return match pointer.as_address() {
                Some(0) | None => Ok(pointer),
                Some(target) => self.load_text(target).map(Literal::Text),
            };
        }
        if types.is_char_array(ty) {
            let bytes = self.read(address, types.size(types.strip_reference(ty)))?;
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            return Ok(Literal::Text(bytes[..end].iter().map(|&b| b as char).collect()));
        }
        self.load(address, ty, types)
    }

    /// Encode `literal` as type `ty` in the current byte order
    pub fn encode(&self, literal: &Literal, ty: TypeId, types: &TypeSystem) -> Result<Vec<u8>> {
        let size = types.size(ty);
        let wrong_value = || {
            MachineError::mismatch(
                types.name(ty).to_string(),
                format!("{}", literal.display(types)),
            )
        };

        match types.kind(ty) {
            TypeKind::Reference { target } => self.encode(literal, target, types),
            TypeKind::Primitive(Primitive::Any) | TypeKind::Array { .. } => Err(wrong_value()),
            TypeKind::Primitive(p) if p.is_float() => {
                let value = literal.as_float().ok_or_else(wrong_value)?;
                codec::encode_float(value, size, self.endianness)
            }
            TypeKind::Primitive(p) => {
                let value = literal.as_integer().ok_or_else(wrong_value)?;
                codec::encode_int(codec::wrap_int(value, size, p.is_signed()), size, self.endianness)
            }
            TypeKind::Pointer { .. } => {
                let value = literal.as_integer().ok_or_else(wrong_value)?;
                codec::encode_int(value, size, self.endianness)
            }
            TypeKind::TypeValue => match literal {
                Literal::Type(id) => Ok(vec![type_tag::encode(*id, types)?]),
                _ => Err(wrong_value()),
            },
        }
    }

    pub fn store(
        &mut self,
        address: Address,
        ty: TypeId,
        literal: &Literal,
        types: &TypeSystem,
    ) -> Result<()> {
        let bytes = self.encode(literal, ty, types)?;
        self.write(address, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(endianness: Endianness) -> (Memory, TypeSystem) {
        (
            Memory::new(64, endianness).unwrap(),
            TypeSystem::new(4).unwrap(),
        )
    }

    #[test]
    fn test_size_validation() {
        assert!(matches!(
            Memory::new(16, Endianness::Little),
            Err(MachineError::InvalidMemorySize(16))
        ));
        assert!(Memory::new(40, Endianness::Little).is_err());
        assert_eq!(Memory::new(32, Endianness::Little).unwrap().len(), 32);
    }

    #[test]
    fn test_bounds_checked_access() {
        let (mut memory, _) = setup(Endianness::Little);
        assert!(memory.write(60, &[1, 2, 3, 4]).is_ok());
        assert!(matches!(
            memory.write(62, &[1, 2, 3]),
            Err(MachineError::InvalidAddress {
                address: 62,
                length: 3
            })
        ));
        assert!(memory.read(64, 1).is_err());
        assert!(memory.read(usize::MAX, 2).is_err());
        assert_eq!(memory.read(60, 4).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_store_respects_endianness() {
        let (mut little, types) = setup(Endianness::Little);
        let int = types.lookup("int").unwrap();
        little
            .store(8, int, &Literal::Integer(0x0102_0304), &types)
            .unwrap();
        assert_eq!(little.read(8, 4).unwrap(), &[4, 3, 2, 1]);

        let (mut big, _) = setup(Endianness::Big);
        big.store(8, int, &Literal::Integer(0x0102_0304), &types)
            .unwrap();
        assert_eq!(big.read(8, 4).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(
            big.load(8, int, &types).unwrap(),
            Literal::Integer(0x0102_0304)
        );
    }

    #[test]
    fn test_store_wraps_and_converts() {
        let (mut memory, types) = setup(Endianness::Little);
        let chr = types.lookup("char").unwrap();
        let uint = types.lookup("uint").unwrap();
        let dbl = types.lookup("double").unwrap();

        memory.store(4, chr, &Literal::Integer(321), &types).unwrap();
        assert_eq!(memory.load(4, chr, &types).unwrap(), Literal::Char(65));

        memory.store(8, uint, &Literal::Integer(-1), &types).unwrap();
        assert_eq!(
            memory.load(8, uint, &types).unwrap(),
            Literal::Integer(0xffff_ffff)
        );

        memory.store(16, dbl, &Literal::Integer(3), &types).unwrap();
        assert_eq!(memory.load(16, dbl, &types).unwrap(), Literal::Float(3.0));

        assert!(memory
            .store(4, uint, &Literal::Text("no".into()), &types)
            .is_err());
    }

    #[test]
    fn test_type_values_round_trip() {
        let (mut memory, mut types) = setup(Endianness::Little);
        let dbl = types.lookup("double").unwrap();
        let dbl_ptr = types.pointer_to(dbl).unwrap();
        let tv = types.type_value();

        memory.store(4, tv, &Literal::Type(dbl_ptr), &types).unwrap();
        assert_eq!(memory.read(4, 1).unwrap(), &[0b0011_0001]);
        assert_eq!(memory.load(4, tv, &types).unwrap(), Literal::Type(dbl_ptr));
    }

    #[test]
    fn test_char_pointer_reads_text() {
        let (mut memory, mut types) = setup(Endianness::Little);
        let chr = types.lookup("char").unwrap();
        let chr_ptr = types.pointer_to(chr).unwrap();

        memory.write(32, b"hey\0").unwrap();
        memory
            .store(4, chr_ptr, &Literal::Integer(32), &types)
            .unwrap();

        assert_eq!(
            memory.read_literal(4, chr_ptr, &types).unwrap(),
            Literal::Text("hey".to_string())
        );
        assert_eq!(
            memory.load(4, chr_ptr, &types).unwrap(),
            Literal::Integer(32)
        );
    }

    #[test]
    fn test_unterminated_text_fails() {
        let (mut memory, _) = setup(Endianness::Little);
        memory.write(60, b"abcd").unwrap();
        assert!(memory.load_text(60).is_err());
        assert!(memory.load_text(0).is_err());
    }
}
