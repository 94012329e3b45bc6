//! One-byte type tags
//!
//! `type_t` values are stored in memory as a single byte:
//!
//! ```text
//!   7   6 5   4 3 2 1 0
//! +---+-----+-----------+
//! |ref|depth| primitive |
//! +---+-----+-----------+
//! ```
//!
//! `0xFF` is reserved for `type_t` itself. Arrays have no tag of their own and
//! are stored as a pointer to their element type.

use crate::interpreter::constants::MAX_INDIRECTION;
use crate::interpreter::errors::{MachineError, Result};
use crate::types::{Primitive, TypeId, TypeKind, TypeSystem};

pub const TYPE_VALUE_TAG: u8 = 0xFF;

const REFERENCE_BIT: u8 = 0x80;
const DEPTH_SHIFT: u8 = 5;
const DEPTH_MASK: u8 = 0x60;
const PRIMITIVE_MASK: u8 = 0x1F;

fn not_encodable(types: &TypeSystem, id: TypeId) -> MachineError {
    MachineError::mismatch("a type with a one-byte tag", types.name(id).to_string())
}

pub fn encode(id: TypeId, types: &TypeSystem) -> Result<u8> {
    match types.kind(id) {
        TypeKind::TypeValue => Ok(TYPE_VALUE_TAG),
        TypeKind::Primitive(p) => Ok(p.index()),
        TypeKind::Pointer { target, depth } => match types.kind(target) {
            TypeKind::Primitive(p) if depth <= MAX_INDIRECTION => {
                Ok((depth << DEPTH_SHIFT) | p.index())
            }
            _ => Err(not_encodable(types, id)),
        },
        TypeKind::Array { element, .. } => match types.kind(element) {
            TypeKind::Primitive(p) => Ok((1 << DEPTH_SHIFT) | p.index()),
            TypeKind::Pointer { target, depth } if depth < MAX_INDIRECTION => {
                match types.kind(target) {
                    TypeKind::Primitive(p) => Ok(((depth + 1) << DEPTH_SHIFT) | p.index()),
                    _ => Err(not_encodable(types, id)),
                }
            }
            _ => Err(not_encodable(types, id)),
        },
        TypeKind::Reference { target } => {
            let inner = encode(target, types)?;
            if inner == TYPE_VALUE_TAG || inner & REFERENCE_BIT != 0 {
                return Err(not_encodable(types, id));
            }
            Ok(REFERENCE_BIT | inner)
        }
    }
}

/// Map a tag back to its type without interning. Every tag that was ever
/// written names a type that already exists, so a miss means the byte was
/// not written as a `type_t`.
pub fn resolve(tag: u8, types: &TypeSystem) -> Result<TypeId> {
    let invalid = || MachineError::runtime(format!("byte 0x{:02x} is not a valid type tag", tag));
    if tag == TYPE_VALUE_TAG {
        return Ok(types.type_value());
    }

    let primitive = Primitive::from_index(tag & PRIMITIVE_MASK).ok_or_else(invalid)?;
    let mut id = types.primitive(primitive);
    let depth = (tag & DEPTH_MASK) >> DEPTH_SHIFT;
    if depth > 0 {
        id = types
            .find(TypeKind::Pointer { target: id, depth })
            .ok_or_else(invalid)?;
    }
    if tag & REFERENCE_BIT != 0 {
        id = types
            .find(TypeKind::Reference { target: id })
            .ok_or_else(invalid)?;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_layout() {
        let mut types = TypeSystem::new(4).unwrap();
        let int = types.primitive(Primitive::Int);
        let int_pp = {
            let p = types.pointer_to(int).unwrap();
            types.pointer_to(p).unwrap()
        };
        let int_ref = types.reference_to(int).unwrap();

        assert_eq!(encode(int, &types).unwrap(), 12);
        assert_eq!(encode(int_pp, &types).unwrap(), 0b0100_1100);
        assert_eq!(encode(int_ref, &types).unwrap(), 0b1000_1100);
        assert_eq!(encode(types.type_value(), &types).unwrap(), 0xFF);
    }

    #[test]
    fn test_tags_resolve_to_the_same_handles() {
        let mut types = TypeSystem::new(8).unwrap();
        let chr = types.primitive(Primitive::Char);
        let chr_ptr = types.pointer_to(chr).unwrap();
        let chr_ptr_ref = types.reference_to(chr_ptr).unwrap();

        for id in [chr, chr_ptr, chr_ptr_ref, types.type_value()] {
            let tag = encode(id, &types).unwrap();
            assert_eq!(resolve(tag, &types).unwrap(), id);
        }
    }

    #[test]
    fn test_arrays_encode_as_element_pointer() {
        let mut types = TypeSystem::new(4).unwrap();
        let dbl = types.primitive(Primitive::Double);
        let arr = types.array_of(dbl, 4).unwrap();
        let dbl_ptr = types.pointer_to(dbl).unwrap();
        let tag = encode(arr, &types).unwrap();
        assert_eq!(resolve(tag, &types).unwrap(), dbl_ptr);
    }

    #[test]
    fn test_resolve_only_finds_existing_types() {
        let mut types = TypeSystem::new(4).unwrap();
        let int = types.primitive(Primitive::Int);
        assert_eq!(resolve(12, &types).unwrap(), int);
        assert!(resolve(0b0010_1100, &types).is_err());

        let int_ptr = types.pointer_to(int).unwrap();
        assert_eq!(resolve(0b0010_1100, &types).unwrap(), int_ptr);
    }

    #[test]
    fn test_invalid_tags() {
        let mut types = TypeSystem::new(4).unwrap();
        assert!(resolve(0x1E, &types).is_err());

        let tv = types.type_value();
        let tv_ptr = types.pointer_to(tv).unwrap();
        assert!(encode(tv_ptr, &types).is_err());
    }
}
