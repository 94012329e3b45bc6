use crate::interpreter::engine::Machine;
use crate::interpreter::errors::{MachineError, Result};
use crate::interpreter::operand::Operand;
use crate::memory::text_bytes;
use crate::memory::value::{Address, Literal};
use crate::types::{Primitive, TypeId};
use tracing::debug;

impl Machine {
    /// `lvalue, value -> lvalue`
    pub(crate) fn exec_assign(&mut self) -> Result<()> {
        let right = self.pop()?;
        let left = self.pop()?;
        let (address, target) = self
            .lvalue(&left)?
            .ok_or_else(|| MachineError::runtime("cannot assign to a temporary value"))?;

        self.assign_to(address, target, &right)?;
        self.stack.push(left);
        Ok(())
    }

    /// Write `source` into storage of type `target`. Only `char` arrays
    /// accept a whole value, copied from text.
    pub(crate) fn assign_to(&mut self, address: Address, target: TypeId, source: &Operand) -> Result<()> {
        let target = self.types.strip_reference(target);

        if let Some((_, count)) = self.types.array_shape(target) {
            if !self.types.is_char_array(target) {
                return Err(MachineError::mismatch(
                    "an element of the array",
                    self.types.name(target).to_string(),
                ));
            }
            let text = self.read_text(source)?;
            return self.copy_text(address, count, &text);
        }

        let (value, ty) = self.read_operand(source)?;
        self.types.check_compatible(target, ty)?;
        self.store_value(address, target, value)
    }

    /// Store a value converted to `target`. Text stored into a `char*` is
    /// copied to a new heap block first.
    pub(crate) fn store_value(&mut self, address: Address, target: TypeId, value: Literal) -> Result<()> {
        let value = match value {
            Literal::Text(text) if self.types.is_char_pointer(target) => {
                let block = self.allocate_text(&text)?;
                Literal::Integer(block as i128)
            }
            Literal::Type(id) => Literal::Type(self.types.decay(id)),
            value => value,
        };
        self.memory.store(address, target, &value, &self.types)
    }

    /// NUL-terminated copy of `text` in a fresh `char[len + 1]` heap block
    pub(crate) fn allocate_text(&mut self, text: &str) -> Result<Address> {
        let length = text_bytes(text)?.len() + 1;
        let chr = self.types.primitive(Primitive::Char);
        let ty = self.types.array_of(chr, length)?;
        let address = self.allocate_heap(ty)?;
        self.copy_text(address, length, text)?;
        Ok(address)
    }

    fn copy_text(&mut self, address: Address, capacity: usize, text: &str) -> Result<()> {
        let mut bytes = text_bytes(text)?;
        if bytes.len() + 1 > capacity {
            return Err(MachineError::runtime(format!(
                "string of {} characters does not fit in char[{}]",
                bytes.len(),
                capacity
            )));
        }
        bytes.push(0);
        self.memory.write(address, &bytes)?;
        debug!(address, length = bytes.len(), "copied text");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MachineConfig;
    use crate::interpreter::engine::Machine;
    use crate::interpreter::errors::MachineError;
    use crate::memory::value::Literal;
    use crate::types::{Primitive, TypeKind};

    fn machine() -> Machine {
        Machine::new(MachineConfig::default()).unwrap()
    }

    fn value(m: &Machine, name: &str) -> Literal {
        let v = m.lookup(name).unwrap().clone();
        m.value_of(&v).unwrap()
    }

    #[test]
    fn test_assignment_converts_to_target() {
        let mut m = machine();
        m.run_program("char c\nc = 321\ndouble d\nd = 3\nint i\ni = 2.9")
            .unwrap();
        assert_eq!(value(&m, "c"), Literal::Char(65));
        assert_eq!(value(&m, "d"), Literal::Float(3.0));
        assert_eq!(value(&m, "i"), Literal::Integer(2));
    }

    #[test]
    fn test_assignment_chains_left_operand() {
        let mut m = machine();
        m.execute("int x").unwrap();
        let result = m.execute("x = 4").unwrap().unwrap();
        assert_eq!(result.id.as_str(), "x");
    }

    #[test]
    fn test_cannot_assign_to_temporary() {
        let mut m = machine();
        assert!(matches!(m.execute("3 = 4"), Err(MachineError::Runtime(_))));
    }

    #[test]
    fn test_text_into_char_pointer_allocates() {
        let mut m = machine();
        let before = m.variables().count();
        m.execute("char* s = \"hey\"").unwrap();
        assert_eq!(value(&m, "s"), Literal::Text("hey".to_string()));
        // the variable plus its heap block
        assert_eq!(m.variables().count(), before + 2);
        let block = m.variables().find(|v| v.is_heap()).unwrap();
        assert_eq!(m.types().name(block.ty), "char[4]");
    }

    #[test]
    fn test_text_into_char_array() {
        let mut m = machine();
        m.execute("char name[6]").unwrap();
        m.execute("name = \"abc\"").unwrap();
        assert_eq!(value(&m, "name"), Literal::Text("abc".to_string()));
        assert!(matches!(
            m.execute("name = \"toolong\""),
            Err(MachineError::Runtime(_))
        ));
        assert_eq!(value(&m, "name"), Literal::Text("abc".to_string()));
    }

    #[test]
    fn test_whole_array_assignment_is_rejected() {
        let mut m = machine();
        m.execute("int a[2]").unwrap();
        assert!(matches!(
            m.execute("a = 1"),
            Err(MachineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_type_values_decay_when_stored() {
        let mut m = machine();
        m.execute("int a[2]").unwrap();
        m.execute("type_t t = typeof(a)").unwrap();
        let int = m.types().primitive(Primitive::Int);
        let int_ptr = m
            .types()
            .find(TypeKind::Pointer {
                target: int,
                depth: 1,
            })
            .unwrap();
        assert_eq!(value(&m, "t"), Literal::Type(int_ptr));
    }
}
