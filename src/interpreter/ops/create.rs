use crate::interpreter::engine::Machine;
use crate::interpreter::errors::{MachineError, Result};
use crate::interpreter::operand::Operand;
use crate::memory::value::Address;
use crate::parser::identifier::Identifier;
use crate::symbols::{Variable, VariableKind};
use crate::types::{TypeId, TypeKind};
use tracing::debug;

impl Machine {
    /// `[init] -> variable`
    pub(crate) fn exec_create(&mut self, ty: TypeId, id: &Identifier, initialized: bool) -> Result<()> {
        if self.symbols.contains(id) {
            return Err(MachineError::DuplicateVariable(id.to_string()));
        }

        match self.types.kind(ty) {
            TypeKind::Reference { target } => self.create_reference(id, ty, target)?,
            TypeKind::Array { .. } => {
                let address = self.allocate_variable(id.clone(), ty)?;
                if initialized {
                    let zeros = vec![0; self.types.size(ty)];
                    self.memory.write(address, &zeros)?;
                }
            }
            _ => self.create_scalar(id, ty, initialized)?,
        }

        self.stack.push(Operand::Variable(id.clone()));
        Ok(())
    }

    /// The initial value is evaluated and checked before any memory is taken
    fn create_scalar(&mut self, id: &Identifier, ty: TypeId, initialized: bool) -> Result<()> {
        let init = if initialized { Some(self.pop()?) } else { None };
        if self.types.size(ty) == 0 {
            return Err(MachineError::mismatch(
                "a type with a size",
                self.types.name(ty).to_string(),
            ));
        }

        let value = match &init {
            Some(operand) => {
                let (value, found) = self.read_operand(operand)?;
                self.types.check_compatible(ty, found)?;
                Some(value)
            }
            None => None,
        };

        let address = self.allocate_variable(id.clone(), ty)?;
        if let Some(value) = value {
            self.store_value(address, ty, value)?;
        }
        Ok(())
    }

    /// Bind a new alias to existing storage. The reference takes the
    /// target's address and size but owns none of its bytes.
    fn create_reference(&mut self, id: &Identifier, ty: TypeId, target: TypeId) -> Result<()> {
        let source = self.pop()?;
        let (address, found) = self.lvalue(&source)?.ok_or_else(|| {
            MachineError::runtime(format!("cannot bind reference '{}' to a temporary value", id))
        })?;

        let target = self.types.strip_reference(target);
        if found != target {
            return Err(MachineError::mismatch(
                self.types.name(target).to_string(),
                self.types.name(found).to_string(),
            ));
        }
        let owner = self
            .owner_of(&source)?
            .ok_or_else(|| MachineError::runtime(format!("reference '{}' has no target", id)))?;

        debug!(reference = %id, target = %owner, address, "bound reference");
        self.symbols.insert(Variable {
            id: id.clone(),
            ty,
            address,
            size: self.types.size(target),
            kind: VariableKind::Reference { target: owner },
        })
    }

    /// Allocate and register storage for a named variable
    pub(crate) fn allocate_variable(&mut self, id: Identifier, ty: TypeId) -> Result<Address> {
        let address = self.symbols.allocate(self.types.size(ty))?;
        self.symbols
            .insert(Variable::new(id, ty, address, &self.types))?;
        Ok(address)
    }

    /// Allocate and register an anonymous heap block
    pub(crate) fn allocate_heap(&mut self, ty: TypeId) -> Result<Address> {
        let id = self.symbols.next_heap_name();
        debug!(block = %id, ty = self.types.name(ty), "heap allocation");
        self.allocate_variable(id, ty)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MachineConfig;
    use crate::interpreter::engine::Machine;
    use crate::interpreter::errors::MachineError;
    use crate::memory::value::Literal;
    use crate::parser::ParseError;
    use crate::symbols::VariableKind;

    fn machine() -> Machine {
        Machine::new(MachineConfig::default()).unwrap()
    }

    fn value(m: &Machine, name: &str) -> Literal {
        let v = m.lookup(name).unwrap().clone();
        m.value_of(&v).unwrap()
    }

    #[test]
    fn test_declarations_follow_aligned_layout() {
        let mut m = machine();
        // stdin, stdout and stderr take 4, 8 and 12
        let x = m.execute("int x").unwrap().unwrap();
        let d = m.execute("double d").unwrap().unwrap();
        let c = m.execute("char c").unwrap().unwrap();
        assert_eq!((x.address, x.size), (16, 4));
        assert_eq!((d.address, d.size), (20, 8));
        assert_eq!((c.address, c.size), (28, 1));
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut m = machine();
        m.execute("int x").unwrap();
        assert_eq!(
            m.execute("double x"),
            Err(MachineError::DuplicateVariable("x".to_string()))
        );
    }

    #[test]
    fn test_failed_initializer_allocates_nothing() {
        let mut m = machine();
        assert!(m.execute("int x = y").is_err());
        let x = m.execute("int x").unwrap().unwrap();
        assert_eq!(x.address, 16);
    }

    #[test]
    fn test_any_cannot_be_declared() {
        let mut m = machine();
        assert!(matches!(
            m.execute("any a"),
            Err(MachineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_reference_aliases_target() {
        let mut m = machine();
        m.run_program("int x = 5\nint& r = x\nr = 6").unwrap();
        assert_eq!(value(&m, "x"), Literal::Integer(6));

        let r = m.lookup("r").unwrap();
        let x = m.lookup("x").unwrap();
        assert_eq!(r.address, x.address);
        assert_eq!(
            r.kind,
            VariableKind::Reference {
                target: x.id.clone()
            }
        );
    }

    #[test]
    fn test_reference_to_reference_binds_the_owner() {
        let mut m = machine();
        m.run_program("int x\nint& a = x\nint& b = a").unwrap();
        let b = m.lookup("b").unwrap();
        assert!(matches!(&b.kind, VariableKind::Reference { target } if target.as_str() == "x"));
    }

    #[test]
    fn test_reference_errors() {
        let mut m = machine();
        m.execute("int x").unwrap();
        assert!(matches!(
            m.execute("int& r"),
            Err(MachineError::Parse(ParseError::UninitializedReference { .. }))
        ));
        assert!(matches!(m.execute("int& r = 4"), Err(MachineError::Runtime(_))));
        assert!(matches!(
            m.execute("double& r = x"),
            Err(MachineError::TypeMismatch { .. })
        ));
        assert!(m.lookup("r").is_none());
    }

    #[test]
    fn test_reference_to_array_element() {
        let mut m = machine();
        m.run_program("int a[3] = {1, 2, 3}\nint& r = a[2]\nr = 30").unwrap();
        let a = m.lookup("a").unwrap().clone();
        assert_eq!(
            m.elements(&a).unwrap(),
            vec![Literal::Integer(1), Literal::Integer(2), Literal::Integer(30)]
        );
    }

    #[test]
    fn test_array_declarations() {
        let mut m = machine();
        m.execute("int a[4] = {7, 8}").unwrap();
        let a = m.lookup("a").unwrap().clone();
        assert_eq!(a.size, 16);
        assert_eq!(
            m.elements(&a).unwrap(),
            vec![
                Literal::Integer(7),
                Literal::Integer(8),
                Literal::Integer(0),
                Literal::Integer(0)
            ]
        );

        m.execute("char s[] = \"hi\"").unwrap();
        assert_eq!(value(&m, "s"), Literal::Text("hi".to_string()));
        assert_eq!(m.lookup("s").unwrap().size, 3);
    }
}
