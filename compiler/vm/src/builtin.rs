//! Built-in standard library procedures.
//!
//! A built-in is called by name through the same frame protocol as a
//! compiled procedure: the caller's inputs are copied into a scratch frame
//! at the top of the stack, the operation runs, and the result is copied
//! back. Names have the form `<OPERATION>_<TYPE>`, for example `ADD_INT`.
//! The frame holds the operands at consecutive offsets of the operand size
//! followed by the result.

use std::cmp::Ordering;

use stplc_ir::{CompiledArgument, MemoryLocation, MemoryReader, PrimitiveType, Scalar, STACK_AREA};

use crate::error::Trap;
use crate::memory::Memory;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
    Xor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Arithmetic(Arithmetic),
    Negate,
    Compare(Comparison),
    Logic(Logic),
    Not,
}

impl Operation {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ADD" => Operation::Arithmetic(Arithmetic::Add),
            "SUB" => Operation::Arithmetic(Arithmetic::Sub),
            "MUL" => Operation::Arithmetic(Arithmetic::Mul),
            "DIV" => Operation::Arithmetic(Arithmetic::Div),
            "MOD" => Operation::Arithmetic(Arithmetic::Mod),
            "NEG" => Operation::Negate,
            "EQ" => Operation::Compare(Comparison::Eq),
            "NE" => Operation::Compare(Comparison::Ne),
            "LT" => Operation::Compare(Comparison::Lt),
            "LE" => Operation::Compare(Comparison::Le),
            "GT" => Operation::Compare(Comparison::Gt),
            "GE" => Operation::Compare(Comparison::Ge),
            "AND" => Operation::Logic(Logic::And),
            "OR" => Operation::Logic(Logic::Or),
            "XOR" => Operation::Logic(Logic::Xor),
            "NOT" => Operation::Not,
            _ => return None,
        })
    }

    /// Whether the operation is defined for operands of the type.
    fn accepts(self, ty: PrimitiveType) -> bool {
        match self {
            Operation::Arithmetic(Arithmetic::Mod) => ty.is_integer(),
            Operation::Arithmetic(_) => ty.is_numeric(),
            Operation::Negate => ty.is_numeric() && ty.is_signed(),
            Operation::Compare(Comparison::Eq | Comparison::Ne) => true,
            Operation::Compare(_) => ty.is_numeric(),
            Operation::Logic(_) | Operation::Not => ty == PrimitiveType::Bool,
        }
    }

    fn arity(self) -> usize {
        match self {
            Operation::Negate | Operation::Not => 1,
            _ => 2,
        }
    }
}

/// A built-in procedure: an operation on operands of one primitive type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Builtin {
    pub operation: Operation,
    pub operand: PrimitiveType,
}

impl Builtin {
    /// Finds the built-in with the exact name, such as `LT_DINT`.
    pub fn lookup(name: &str) -> Option<Self> {
        let (operation, operand) = name.rsplit_once('_')?;
        let operation = Operation::from_name(operation)?;
        let operand = PrimitiveType::from_name(operand).filter(|ty| ty.name() == operand)?;
        operation
            .accepts(operand)
            .then_some(Builtin { operation, operand })
    }

    fn result_type(self) -> PrimitiveType {
        match self.operation {
            Operation::Compare(_) => PrimitiveType::Bool,
            _ => self.operand,
        }
    }

    fn result_offset(self) -> usize {
        self.operation.arity() * self.operand.size()
    }

    pub fn inputs(self) -> Vec<CompiledArgument> {
        let size = self.operand.size();
        (0..self.operation.arity())
            .map(|i| CompiledArgument::new((i * size) as u16, size))
            .collect()
    }

    pub fn outputs(self) -> Vec<CompiledArgument> {
        vec![CompiledArgument::new(
            self.result_offset() as u16,
            self.result_type().size(),
        )]
    }

    pub fn stack_usage(self) -> usize {
        self.result_offset() + self.result_type().size()
    }

    /// Runs the operation on the frame at `base`.
    pub fn execute(self, memory: &mut Memory, base: u16) -> Result<(), Trap> {
        let size = self.operand.size() as u16;
        let a = MemoryLocation::new(STACK_AREA, base);
        let b = MemoryLocation::new(STACK_AREA, base + size);
        let result = MemoryLocation::new(STACK_AREA, base + self.result_offset() as u16);

        let value = match self.operation {
            Operation::Arithmetic(op) => arithmetic(
                op,
                self.operand.load(a, memory)?,
                self.operand.load(b, memory)?,
            )?,
            Operation::Negate => negate(self.operand.load(a, memory)?),
            Operation::Compare(op) => Scalar::Bool(compare(op, self.operand, a, b, memory)?),
            Operation::Logic(op) => {
                let (x, y) = (memory.load_bool(a)?, memory.load_bool(b)?);
                Scalar::Bool(match op {
                    Logic::And => x && y,
                    Logic::Or => x || y,
                    Logic::Xor => x ^ y,
                })
            }
            Operation::Not => Scalar::Bool(!memory.load_bool(a)?),
        };

        let result_type = self.result_type();
        memory.write_bits(result_type.encode(value), result, result_type.size())
    }
}

/// Integer results wrap; they are truncated to the operand width on store.
fn arithmetic(op: Arithmetic, a: Scalar, b: Scalar) -> Result<Scalar, Trap> {
    Ok(match (a, b) {
        (Scalar::Signed(x), Scalar::Signed(y)) => Scalar::Signed(match op {
            Arithmetic::Add => x.wrapping_add(y),
            Arithmetic::Sub => x.wrapping_sub(y),
            Arithmetic::Mul => x.wrapping_mul(y),
            Arithmetic::Div if y == 0 => return Err(Trap::DivideByZero),
            Arithmetic::Div => x.wrapping_div(y),
            Arithmetic::Mod if y == 0 => return Err(Trap::DivideByZero),
            Arithmetic::Mod => x.wrapping_rem(y),
        }),
        (Scalar::Unsigned(x), Scalar::Unsigned(y)) => Scalar::Unsigned(match op {
            Arithmetic::Add => x.wrapping_add(y),
            Arithmetic::Sub => x.wrapping_sub(y),
            Arithmetic::Mul => x.wrapping_mul(y),
            Arithmetic::Div | Arithmetic::Mod if y == 0 => return Err(Trap::DivideByZero),
            Arithmetic::Div => x / y,
            Arithmetic::Mod => x % y,
        }),
        (Scalar::Float(x), Scalar::Float(y)) => Scalar::Float(match op {
            Arithmetic::Add => x + y,
            Arithmetic::Sub => x - y,
            Arithmetic::Mul => x * y,
            Arithmetic::Div => x / y,
            Arithmetic::Mod => x % y,
        }),
        // Lookup rejects BOOL operands.
        (a, _) => a,
    })
}

fn negate(a: Scalar) -> Scalar {
    match a {
        Scalar::Signed(x) => Scalar::Signed(x.wrapping_neg()),
        Scalar::Float(x) => Scalar::Float(-x),
        other => other,
    }
}

fn compare(
    op: Comparison,
    ty: PrimitiveType,
    a: MemoryLocation,
    b: MemoryLocation,
    memory: &Memory,
) -> Result<bool, Trap> {
    let ordering = || ty.compare(a, b, memory);
    Ok(match op {
        Comparison::Eq => ty.equals(a, b, memory)?,
        Comparison::Ne => !ty.equals(a, b, memory)?,
        Comparison::Lt => ordering()? == Some(Ordering::Less),
        Comparison::Le => matches!(ordering()?, Some(Ordering::Less | Ordering::Equal)),
        Comparison::Gt => ordering()? == Some(Ordering::Greater),
        Comparison::Ge => matches!(ordering()?, Some(Ordering::Greater | Ordering::Equal)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_memory() -> Memory {
        Memory::new(&[0, 64])
    }

    fn at(offset: u16) -> MemoryLocation {
        MemoryLocation::new(STACK_AREA, offset)
    }

    fn run(name: &str, a: u64, b: u64) -> Result<Memory, Trap> {
        let builtin = Builtin::lookup(name).unwrap();
        let size = builtin.operand.size();
        let mut memory = frame_memory();
        memory.write_bits(a, at(8), size).unwrap();
        memory.write_bits(b, at(8 + size as u16), size).unwrap();
        builtin.execute(&mut memory, 8)?;
        Ok(memory)
    }

    #[test]
    fn lookup_when_known_name_then_builtin() {
        assert_eq!(
            Builtin::lookup("ADD_INT"),
            Some(Builtin {
                operation: Operation::Arithmetic(Arithmetic::Add),
                operand: PrimitiveType::Int
            })
        );
    }

    #[test]
    fn lookup_when_not_defined_for_type_then_none() {
        assert_eq!(Builtin::lookup("MOD_REAL"), None);
        assert_eq!(Builtin::lookup("NEG_UINT"), None);
        assert_eq!(Builtin::lookup("AND_INT"), None);
        assert_eq!(Builtin::lookup("LT_BOOL"), None);
        assert_eq!(Builtin::lookup("add_int"), None);
        assert_eq!(Builtin::lookup("ADD"), None);
    }

    #[test]
    fn layout_when_binary_then_result_after_operands() {
        let builtin = Builtin::lookup("GT_DINT").unwrap();

        assert_eq!(
            builtin.inputs(),
            vec![CompiledArgument::new(0, 4), CompiledArgument::new(4, 4)]
        );
        assert_eq!(builtin.outputs(), vec![CompiledArgument::new(8, 1)]);
        assert_eq!(builtin.stack_usage(), 9);
    }

    #[test]
    fn execute_when_add_int_overflows_then_wraps() {
        let memory = run("ADD_INT", 32767, 2).unwrap();

        assert_eq!(memory.load_i16(at(12)).unwrap(), -32767);
    }

    #[test]
    fn execute_when_sub_usint_underflows_then_wraps() {
        let memory = run("SUB_USINT", 1, 2).unwrap();

        assert_eq!(memory.load_u8(at(10)).unwrap(), 255);
    }

    #[test]
    fn execute_when_div_dint_negative_then_truncates_toward_zero() {
        let memory = run("DIV_DINT", (-7i32) as u32 as u64, 2).unwrap();

        assert_eq!(memory.load_i32(at(16)).unwrap(), -3);
    }

    #[test]
    fn execute_when_div_by_zero_then_trap() {
        assert_eq!(run("DIV_INT", 5, 0).err(), Some(Trap::DivideByZero));
        assert_eq!(run("MOD_UDINT", 5, 0).err(), Some(Trap::DivideByZero));
    }

    #[test]
    fn execute_when_mul_real_then_float_result() {
        let memory = run(
            "MUL_REAL",
            1.5f32.to_bits() as u64,
            4.0f32.to_bits() as u64,
        )
        .unwrap();

        assert_eq!(memory.load_f32(at(16)).unwrap(), 6.0);
    }

    #[test]
    fn execute_when_neg_int_min_then_wraps() {
        let memory = run("NEG_INT", 0x8000, 0).unwrap();

        assert_eq!(memory.load_i16(at(10)).unwrap(), i16::MIN);
    }

    #[test]
    fn execute_when_lt_sint_signed_operands_then_signed_order() {
        let memory = run("LT_SINT", 0xFF, 1).unwrap();

        assert!(memory.load_bool(at(10)).unwrap());
    }

    #[test]
    fn execute_when_ge_lreal_nan_then_false() {
        let memory = run("GE_LREAL", f64::NAN.to_bits(), 0).unwrap();

        assert!(!memory.load_bool(at(24)).unwrap());
    }

    #[test]
    fn execute_when_ne_bool_then_compares_truth() {
        let memory = run("NE_BOOL", 1, 0).unwrap();

        assert!(memory.load_bool(at(10)).unwrap());
    }

    #[test]
    fn execute_when_not_bool_then_inverts() {
        let memory = run("NOT_BOOL", 0, 0).unwrap();

        assert!(memory.load_bool(at(9)).unwrap());
    }
}
