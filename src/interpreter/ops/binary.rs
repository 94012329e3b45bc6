use crate::interpreter::engine::Machine;
use crate::interpreter::errors::{MachineError, Result};
use crate::memory::codec::wrap_int;
use crate::memory::value::Literal;
use crate::parser::opcode::BinaryOp;
use crate::types::{Primitive, TypeId};

impl Machine {
    /// `left, right -> value`
    pub(crate) fn exec_binary(&mut self, op: BinaryOp) -> Result<()> {
        let right = self.pop()?;
        let left = self.pop()?;
        let (lv, lt) = self.read_operand(&left)?;
        let (rv, rt) = self.read_operand(&right)?;
        self.types.check_compatible(lt, rt)?;

        let (value, ty) = match (self.types.is_pointer(lt), self.types.is_pointer(rt)) {
            (true, true) => self.pointer_difference(op, &lv, lt, &rv, rt)?,
            (true, false) => self.pointer_offset(op, &lv, lt, &rv, rt)?,
            (false, true) if op == BinaryOp::Add => self.pointer_offset(op, &rv, rt, &lv, lt)?,
            (false, true) => return Err(self.operator_mismatch(op, rt)),
            (false, false) => self.arithmetic(op, &lv, lt, &rv, rt)?,
        };
        self.push_value(value, ty);
        Ok(())
    }

    /// `pointer ± integer`, scaled by the size of the target
    fn pointer_offset(
        &mut self,
        op: BinaryOp,
        pointer: &Literal,
        pointer_ty: TypeId,
        offset: &Literal,
        offset_ty: TypeId,
    ) -> Result<(Literal, TypeId)> {
        if !matches!(op, BinaryOp::Add | BinaryOp::Sub) {
            return Err(self.operator_mismatch(op, pointer_ty));
        }
        if self.types.is_float(offset_ty) || !self.types.is_arithmetic(offset_ty) {
            return Err(MachineError::mismatch(
                "an integer offset",
                self.types.name(offset_ty).to_string(),
            ));
        }
        let base = pointer
            .as_integer()
            .ok_or_else(|| MachineError::mismatch("an address", "text"))?;
        let offset = offset
            .as_integer()
            .ok_or_else(|| MachineError::mismatch("an integer offset", "text"))?;
        let scale = self.pointer_scale(pointer_ty) as i128;

        let delta = offset.wrapping_mul(scale);
        let address = match op {
            BinaryOp::Sub => base.wrapping_sub(delta),
            _ => base.wrapping_add(delta),
        };
        let word = self.types.word_size();
        Ok((Literal::Integer(wrap_int(address, word, false)), pointer_ty))
    }

    /// `pointer - pointer`, in elements of the left target
    fn pointer_difference(
        &mut self,
        op: BinaryOp,
        left: &Literal,
        left_ty: TypeId,
        right: &Literal,
        _right_ty: TypeId,
    ) -> Result<(Literal, TypeId)> {
        if op != BinaryOp::Sub {
            return Err(self.operator_mismatch(op, left_ty));
        }
        let (Some(a), Some(b)) = (left.as_integer(), right.as_integer()) else {
            return Err(MachineError::mismatch("an address", "text"));
        };
        let scale = self.pointer_scale(left_ty) as i128;
        let int = self.types.primitive(Primitive::Int);
        let distance = (a - b) / scale;
        Ok((
            Literal::Integer(wrap_int(distance, self.types.size(int), true)),
            int,
        ))
    }

    fn arithmetic(
        &mut self,
        op: BinaryOp,
        left: &Literal,
        left_ty: TypeId,
        right: &Literal,
        right_ty: TypeId,
    ) -> Result<(Literal, TypeId)> {
        let (Some(lp), Some(rp)) = (
            self.arithmetic_primitive(left_ty),
            self.arithmetic_primitive(right_ty),
        ) else {
            let culprit = if self.types.is_arithmetic(left_ty) {
                right_ty
            } else {
                left_ty
            };
            return Err(MachineError::mismatch(
                "an arithmetic value",
                self.types.name(culprit).to_string(),
            ));
        };

        if lp.is_float() || rp.is_float() {
            let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
                return Err(MachineError::mismatch("a number", "text"));
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Mod => a % b,
            };
            let precision = if lp == Primitive::Double || rp == Primitive::Double {
                Primitive::Double
            } else {
                Primitive::Float
            };
            return Ok((Literal::Float(result), self.types.primitive(precision)));
        }

        let (Some(a), Some(b)) = (left.as_integer(), right.as_integer()) else {
            return Err(MachineError::mismatch("an integer", "text"));
        };
        let result = integer_op(op, a, b)?;
        let primitive = promote(lp, rp, self.types.word_size());
        let width = primitive.size(self.types.word_size());
        Ok((
            Literal::Integer(wrap_int(result, width, primitive.is_signed())),
            self.types.primitive(primitive),
        ))
    }

    fn arithmetic_primitive(&self, ty: TypeId) -> Option<Primitive> {
        self.types
            .as_primitive(ty)
            .filter(|primitive| primitive.is_arithmetic())
    }

    /// Bytes one step of pointer arithmetic moves; `any*` moves by one
    fn pointer_scale(&mut self, pointer_ty: TypeId) -> usize {
        self.types
            .pointee(pointer_ty)
            .map(|target| self.types.size(target))
            .filter(|&size| size > 0)
            .unwrap_or(1)
    }

    fn operator_mismatch(&self, op: BinaryOp, ty: TypeId) -> MachineError {
        MachineError::mismatch(
            format!("operands valid for '{}'", op.symbol()),
            self.types.name(ty).to_string(),
        )
    }
}

fn integer_op(op: BinaryOp, a: i128, b: i128) -> Result<i128> {
    match op {
        BinaryOp::Add => Ok(a.wrapping_add(b)),
        BinaryOp::Sub => Ok(a.wrapping_sub(b)),
        BinaryOp::Mul => Ok(a.wrapping_mul(b)),
        BinaryOp::Div if b == 0 => Err(MachineError::DivisionByZero),
        BinaryOp::Mod if b == 0 => Err(MachineError::DivisionByZero),
        BinaryOp::Div => Ok(a.wrapping_div(b)),
        BinaryOp::Mod => Ok(a.wrapping_rem(b)),
    }
}

/// Result type of integral arithmetic: the widest of `int` and both
/// operands, unsigned on a tie
fn promote(left: Primitive, right: Primitive, word_size: usize) -> Primitive {
    let rank = |p: Primitive| (p.size(word_size), !p.is_signed());
    [left, right]
        .into_iter()
        .fold(Primitive::Int, |widest, p| {
            if rank(p) > rank(widest) {
                p
            } else {
                widest
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;

    fn eval(source: &str) -> Result<Literal> {
        let mut m = Machine::new(MachineConfig::default())?;
        let result = m.execute(source)?.ok_or(MachineError::runtime("no result"))?;
        m.value_of(&result)
    }

    #[test]
    fn test_promotion() {
        assert_eq!(promote(Primitive::Char, Primitive::Short, 4), Primitive::Int);
        assert_eq!(promote(Primitive::Int, Primitive::UInt, 4), Primitive::UInt);
        assert_eq!(promote(Primitive::Int, Primitive::Long, 4), Primitive::Long);
        assert_eq!(promote(Primitive::Int32, Primitive::Int, 4), Primitive::Int);
        assert_eq!(promote(Primitive::UInt8, Primitive::Int64, 2), Primitive::Int64);
    }

    #[test]
    fn test_integer_arithmetic_is_left_to_right() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), Literal::Integer(20));
        assert_eq!(eval("7 / 2").unwrap(), Literal::Integer(3));
        assert_eq!(eval("-7 % 3").unwrap(), Literal::Integer(-1));
        assert_eq!(eval("10 - (2 * 3)").unwrap(), Literal::Integer(4));
    }

    #[test]
    fn test_float_contaminates() {
        assert_eq!(eval("1 + 0.5").unwrap(), Literal::Float(1.5));
        assert_eq!(eval("7.0 / 2").unwrap(), Literal::Float(3.5));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1 / 0"), Err(MachineError::DivisionByZero));
        assert_eq!(eval("1 % 0"), Err(MachineError::DivisionByZero));
    }

    #[test]
    fn test_integer_results_wrap() {
        let mut m = Machine::new(MachineConfig::default()).unwrap();
        m.execute("uint8_t b = 250").unwrap();
        let sum = m.execute("b + 10").unwrap().unwrap();
        // promoted to int, so no wrap at 8 bits
        assert_eq!(m.value_of(&sum).unwrap(), Literal::Integer(260));

        m.execute("int big = 2147483647").unwrap();
        let wrapped = m.execute("big + 1").unwrap().unwrap();
        assert_eq!(m.value_of(&wrapped).unwrap(), Literal::Integer(-2147483648));
    }

    #[test]
    fn test_pointer_arithmetic_scales() {
        let mut m = Machine::new(MachineConfig::default()).unwrap();
        m.execute("double* d = new double[4]").unwrap();
        let base = m.execute("d").unwrap().unwrap();
        let base = m.value_of(&base).unwrap().as_integer().unwrap();

        let next = m.execute("d + 1").unwrap().unwrap();
        assert_eq!(m.value_of(&next).unwrap(), Literal::Integer(base + 8));
        let back = m.execute("2 + d - 1").unwrap().unwrap();
        assert_eq!(m.value_of(&back).unwrap(), Literal::Integer(base + 8));

        m.execute("double* e = d + 3").unwrap();
        let distance = m.execute("e - d").unwrap().unwrap();
        assert_eq!(m.value_of(&distance).unwrap(), Literal::Integer(3));
    }

    #[test]
    fn test_invalid_pointer_operators() {
        let mut m = Machine::new(MachineConfig::default()).unwrap();
        m.execute("int* p = new int").unwrap();
        for statement in ["p * 2", "p + p", "p + 1.5", "2 - p"] {
            assert!(
                matches!(m.execute(statement), Err(MachineError::TypeMismatch { .. })),
                "{}",
                statement
            );
        }
    }

    #[test]
    fn test_type_values_are_not_arithmetic() {
        assert!(matches!(
            eval("typeof(1) + 1"),
            Err(MachineError::TypeMismatch { .. })
        ));
    }
}
