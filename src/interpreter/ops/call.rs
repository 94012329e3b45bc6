use crate::interpreter::engine::Machine;
use crate::interpreter::errors::{MachineError, Result};
use tracing::trace;

impl Machine {
    /// `arg1 .. argN -> [result]`
    ///
    /// Arity and each argument's type are checked against the declaration
    /// before the body runs.
    pub(crate) fn exec_call(&mut self, name: &str, argc: usize) -> Result<()> {
        if self.stack.len() < argc {
            return Err(MachineError::runtime(format!(
                "missing arguments for '{}'",
                name
            )));
        }
        let args = self.stack.split_off(self.stack.len() - argc);

        let function = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| MachineError::UnknownFunction(name.to_string()))?;

        if args.len() != function.params.len() {
            return Err(MachineError::ParameterCount {
                function: name.to_string(),
                expected: function.params.len(),
                found: args.len(),
            });
        }

        for (position, (param, arg)) in function.params.iter().zip(&args).enumerate() {
            let found = self.operand_type(arg)?;
            if !self.types.is_compatible_with(param.ty, found) {
                return Err(MachineError::ParameterType {
                    function: name.to_string(),
                    position: position + 1,
                    expected: self.types.name(param.ty).to_string(),
                    found: self.types.name(found).to_string(),
                });
            }
        }

        trace!(function = name, argc, "call");
        function.invoke(self, &args)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MachineConfig;
    use crate::interpreter::engine::Machine;
    use crate::interpreter::errors::MachineError;

    #[test]
    fn test_unknown_function() {
        let mut m = Machine::new(MachineConfig::default()).unwrap();
        assert_eq!(
            m.execute("launch(1)"),
            Err(MachineError::UnknownFunction("launch".to_string()))
        );
    }

    #[test]
    fn test_arity_is_checked() {
        let mut m = Machine::new(MachineConfig::default()).unwrap();
        assert_eq!(
            m.execute("pow(2.0)"),
            Err(MachineError::ParameterCount {
                function: "pow".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn test_parameter_types_are_checked() {
        let mut m = Machine::new(MachineConfig::default()).unwrap();
        assert_eq!(
            m.execute("strlen(typeof(1))"),
            Err(MachineError::ParameterType {
                function: "strlen".to_string(),
                position: 1,
                expected: "char*".to_string(),
                found: "type_t".to_string(),
            })
        );
    }
}
