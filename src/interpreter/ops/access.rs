use crate::interpreter::engine::Machine;
use crate::interpreter::errors::{MachineError, Result};
use crate::interpreter::operand::Operand;
use crate::memory::value::{Address, Literal};
use crate::parser::identifier::Identifier;
use crate::types::TypeId;

impl Machine {
    /// `-> value`
    pub(crate) fn exec_push(&mut self, literal: &Literal) -> Result<()> {
        let ty = self.natural_type(literal)?;
        self.push_value(literal.clone(), ty);
        Ok(())
    }

    /// `-> variable`
    pub(crate) fn exec_push_id(&mut self, id: &Identifier) -> Result<()> {
        self.variable(id)?;
        self.stack.push(Operand::Variable(id.clone()));
        Ok(())
    }

    /// `lvalue -> pointer`. The address of an array points at its first
    /// element.
    pub(crate) fn exec_address_of(&mut self) -> Result<()> {
        let operand = self.pop()?;
        let (address, ty) = self
            .lvalue(&operand)?
            .ok_or_else(|| MachineError::runtime("cannot take the address of a temporary value"))?;

        let pointer = match self.types.array_shape(ty) {
            Some((element, _)) => self.types.pointer_to(element)?,
            None => self.types.pointer_to(ty)?,
        };
        self.push_value(Literal::Integer(address as i128), pointer);
        Ok(())
    }

    /// `pointer -> lvalue`, `levels` times over
    pub(crate) fn exec_dereference(&mut self, levels: usize) -> Result<()> {
        let mut operand = self.pop()?;
        for _ in 0..levels {
            let (value, ty) = self.read_operand(&operand)?;
            let target = self.typed_pointee(ty)?;
            let address = value
                .as_address()
                .ok_or(MachineError::InvalidAddress {
                    address: 0,
                    length: self.types.size(target),
                })?;
            operand = self.resolve_address(address, target)?;
        }
        self.stack.push(operand);
        Ok(())
    }

    /// `base, index -> lvalue`. Arrays are bounds checked against their
    /// element count; pointers only need to land inside some variable.
    pub(crate) fn exec_index(&mut self) -> Result<()> {
        let index = self.pop()?;
        let base = self.pop()?;

        let (literal, index_ty) = self.read_operand(&index)?;
        if !self.types.is_arithmetic(index_ty) || self.types.is_float(index_ty) {
            return Err(MachineError::mismatch(
                "an integer index",
                self.types.name(index_ty).to_string(),
            ));
        }
        let i = literal
            .as_integer()
            .ok_or_else(|| MachineError::mismatch("an integer index", "a non-integer value"))?;

        if let Some((address, ty)) = self.lvalue(&base)? {
            if let Some((element, count)) = self.types.array_shape(ty) {
                let size = self.types.size(element);
                if i < 0 || i as usize >= count {
                    return Err(MachineError::InvalidAddress {
                        address: offset(address, i, size).unwrap_or(0),
                        length: size,
                    });
                }
                let owner = self
                    .owner_of(&base)?
                    .ok_or_else(|| MachineError::runtime("array element without an owner"))?;
                self.stack.push(Operand::Place {
                    address: address + i as usize * size,
                    ty: element,
                    owner,
                });
                return Ok(());
            }
        }

        let (value, ty) = self.read_operand(&base)?;
        let target = self.typed_pointee(ty)?;
        let size = self.types.size(target);
        let address = value
            .as_integer()
            .and_then(|start| {
                let start = Address::try_from(start).ok()?;
                offset(start, i, size)
            })
            .ok_or(MachineError::InvalidAddress { address: 0, length: size })?;
        let operand = self.resolve_address(address, target)?;
        self.stack.push(operand);
        Ok(())
    }

    /// Target of a pointer type, refusing `any*` since it has no size
    fn typed_pointee(&mut self, ty: TypeId) -> Result<TypeId> {
        let target = self
            .types
            .pointee(ty)
            .ok_or_else(|| MachineError::mismatch("a pointer", self.types.name(ty).to_string()))?;
        if self.types.is_any(target) {
            return Err(MachineError::mismatch("a typed pointer", "any*"));
        }
        Ok(target)
    }
}

/// `start + index * size`, or `None` if it leaves the address space
fn offset(start: Address, index: i128, size: usize) -> Option<Address> {
    let address = (start as i128).checked_add(index.checked_mul(size as i128)?)?;
    Address::try_from(address).ok()
}

#[cfg(test)]
mod tests {
    use crate::config::MachineConfig;
    use crate::interpreter::engine::Machine;
    use crate::interpreter::errors::MachineError;
    use crate::memory::value::Literal;

    fn machine() -> Machine {
        Machine::new(MachineConfig::default()).unwrap()
    }

    fn value(m: &Machine, name: &str) -> Literal {
        let v = m.lookup(name).unwrap().clone();
        m.value_of(&v).unwrap()
    }

    #[test]
    fn test_pointer_write_through() {
        let mut m = machine();
        m.run_program("int x\nint* p = &x\n*p = 5").unwrap();
        assert_eq!(value(&m, "x"), Literal::Integer(5));
    }

    #[test]
    fn test_double_dereference() {
        let mut m = machine();
        m.run_program("int x = 1\nint* p = &x\nint** pp = &p\n**pp = 9")
            .unwrap();
        assert_eq!(value(&m, "x"), Literal::Integer(9));
        let result = m.execute("**pp").unwrap().unwrap();
        assert_eq!(result.id.as_str(), "x");
    }

    #[test]
    fn test_null_dereference_fails() {
        let mut m = machine();
        m.execute("int* p = null").unwrap();
        assert!(matches!(
            m.execute("*p = 1"),
            Err(MachineError::InvalidAddress { address: 0, .. })
        ));
    }

    #[test]
    fn test_any_pointer_cannot_be_dereferenced() {
        let mut m = machine();
        m.execute("any* p = malloc(4)").unwrap();
        assert!(matches!(
            m.execute("*p"),
            Err(MachineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_array_index_bounds() {
        let mut m = machine();
        m.execute("int a[3] = {1, 2, 3}").unwrap();
        let second = m.execute("a[1]").unwrap().unwrap();
        assert_eq!(m.value_of(&second).unwrap(), Literal::Integer(2));
        assert!(matches!(
            m.execute("a[3]"),
            Err(MachineError::InvalidAddress { .. })
        ));
        assert!(matches!(
            m.execute("a[1.5]"),
            Err(MachineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_pointer_index_lands_in_block() {
        let mut m = machine();
        m.run_program("int* v = new int[4]\nv[3] = 8\nint x = v[3]")
            .unwrap();
        assert_eq!(value(&m, "x"), Literal::Integer(8));
        assert!(matches!(
            m.execute("v[40]"),
            Err(MachineError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_address_of_temporary_fails() {
        let mut m = machine();
        assert!(matches!(
            m.execute("&5"),
            Err(MachineError::Runtime(_))
        ));
    }
}
