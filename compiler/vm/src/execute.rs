//! The statement interpreter.
//!
//! Execution is a loop over an explicit frame stack rather than host
//! recursion, so that the depth of procedure calls is bounded only by the
//! stack area.

use log::trace;
use stplc_ir::{
    AccessViolation, AddressBase, AddressElement, CompiledArgument, Expression, LocalVarOffset,
    MemoryLocation, MemoryReader, Statement, STACK_AREA,
};

use crate::builtin::Builtin;
use crate::error::{FaultContext, Trap};
use crate::link::{Callee, Program, Target};
use crate::memory::Memory;
use crate::stack::{CallStack, Frame};

/// What happens after a statement.
enum Step<'a> {
    Next,
    Goto(usize),
    Call {
        callee: Callee,
        inputs: &'a [LocalVarOffset],
        outputs: &'a [LocalVarOffset],
    },
    Return,
}

/// Resolves a frame offset against the frame base.
fn local(base: u16, offset: LocalVarOffset) -> Result<MemoryLocation, Trap> {
    let location = MemoryLocation::new(STACK_AREA, base);
    location
        .checked_add(offset.0 as i64)
        .ok_or(Trap::AccessViolation(AccessViolation { location, size: 0 }))
}

/// Loads the pointer held in a frame slot.
fn load_pointer(memory: &Memory, base: u16, offset: LocalVarOffset) -> Result<MemoryLocation, Trap> {
    Ok(memory.load_pointer(local(base, offset)?)?)
}

fn panic(message: String) -> Trap {
    Trap::Panic(message)
}

/// Computes the location an address expression refers to.
fn effective_address(
    memory: &Memory,
    base: u16,
    start: AddressBase,
    elements: &[AddressElement],
) -> Result<MemoryLocation, Trap> {
    let mut location = match start {
        AddressBase::Local(offset) => local(base, offset)?,
        AddressBase::Deref(offset) => load_pointer(memory, base, offset)?,
    };

    for element in elements {
        let delta = match *element {
            AddressElement::Offset(bytes) => bytes as i64,
            AddressElement::UncheckedIndex { index, scale } => {
                memory.load_i32(local(base, index)?)? as i64 * scale as i64
            }
            AddressElement::CheckedIndex {
                index,
                scale,
                lower,
                upper,
            } => {
                let value = memory.load_i32(local(base, index)?)?;
                if value < lower || value > upper {
                    return Err(panic(format!(
                        "index {value} is outside the range [{lower}..{upper}]"
                    )));
                }
                (value as i64 - lower as i64) * scale as i64
            }
        };
        location = location
            .checked_add(delta)
            .ok_or(Trap::AccessViolation(AccessViolation { location, size: 0 }))?;
    }
    Ok(location)
}

/// Deposits `size` bytes of the expression's value at `dst`.
fn write_expression(
    memory: &mut Memory,
    base: u16,
    value: &Expression,
    size: usize,
    dst: MemoryLocation,
) -> Result<(), Trap> {
    match value {
        Expression::Literal { bits } => memory.write_bits(*bits, dst, size),
        Expression::LoadLocal { offset } => memory.copy(local(base, *offset)?, dst, size),
        Expression::Deref { offset } => {
            let src = load_pointer(memory, base, *offset)?;
            memory.copy(src, dst, size)
        }
        Expression::Address {
            base: start,
            elements,
        } => {
            let location = effective_address(memory, base, *start, elements)?;
            memory.write_bits(location.pack() as u64, dst, size)
        }
        Expression::Null => Ok(()),
    }
}

fn step<'a>(
    statement: &'a Statement,
    target: Target,
    memory: &mut Memory,
    base: u16,
) -> Result<Step<'a>, Trap> {
    Ok(match (statement, target) {
        (Statement::Jump { .. }, Target::Jump(position)) => Step::Goto(position),
        (Statement::JumpIfNot { control, .. }, Target::Jump(position)) => {
            if memory.load_bool(local(base, *control)?)? {
                Step::Next
            } else {
                Step::Goto(position)
            }
        }
        (
            Statement::StaticCall {
                inputs, outputs, ..
            },
            Target::Call(callee),
        ) => Step::Call {
            callee,
            inputs: inputs.as_slice(),
            outputs: outputs.as_slice(),
        },
        (
            Statement::WriteValue {
                size,
                value,
                target,
            },
            _,
        ) => {
            write_expression(memory, base, value, *size, local(base, *target)?)?;
            Step::Next
        }
        (
            Statement::WriteDerefValue {
                size,
                value,
                target,
            },
            _,
        ) => {
            let dst = load_pointer(memory, base, *target)?;
            write_expression(memory, base, value, *size, dst)?;
            Step::Next
        }
        (Statement::Return, _) => Step::Return,
        _ => Step::Next,
    })
}

/// Copies argument values between a caller frame and a callee frame.
fn copy_arguments(
    memory: &mut Memory,
    from_base: u16,
    from: impl Iterator<Item = LocalVarOffset>,
    to_base: u16,
    to: impl Iterator<Item = LocalVarOffset>,
    declared: &[CompiledArgument],
) -> Result<(), Trap> {
    for ((src, dst), arg) in from.zip(to).zip(declared) {
        memory.copy(local(from_base, src)?, local(to_base, dst)?, arg.size)?;
    }
    Ok(())
}

fn offsets(arguments: &[CompiledArgument]) -> impl Iterator<Item = LocalVarOffset> + '_ {
    arguments.iter().map(|a| LocalVarOffset(a.offset))
}

/// Pushes a zeroed frame for a compiled procedure and copies its inputs
/// from the caller's slots.
fn enter(
    program: &Program,
    memory: &mut Memory,
    stack: &mut CallStack,
    caller: Frame,
    callee: usize,
    inputs: &[LocalVarOffset],
) -> Result<(), Trap> {
    let pou = &program.get(callee).pou;
    let frame = stack.push(callee, pou.stack_usage)?;
    memory.zero(MemoryLocation::new(STACK_AREA, frame.base), frame.size)?;
    trace!("Call {} with frame at {}", pou.id, frame.base);
    copy_arguments(
        memory,
        caller.base,
        inputs.iter().copied(),
        frame.base,
        offsets(&pou.inputs),
        &pou.inputs,
    )
}

/// Runs a built-in in a scratch frame at the top of the stack.
fn call_builtin(
    memory: &mut Memory,
    stack: &CallStack,
    caller: Frame,
    builtin: Builtin,
    inputs: &[LocalVarOffset],
    outputs: &[LocalVarOffset],
) -> Result<(), Trap> {
    let size = builtin.stack_usage();
    let base = stack.reserve(size)?;
    memory.zero(MemoryLocation::new(STACK_AREA, base), size)?;

    let declared_inputs = builtin.inputs();
    copy_arguments(
        memory,
        caller.base,
        inputs.iter().copied(),
        base,
        offsets(&declared_inputs),
        &declared_inputs,
    )?;
    builtin.execute(memory, base)?;
    let declared_outputs = builtin.outputs();
    copy_arguments(
        memory,
        base,
        offsets(&declared_outputs),
        caller.base,
        outputs.iter().copied(),
        &declared_outputs,
    )
}

/// Executes `entry` from an empty call stack until its outermost return.
///
/// Running past the last statement of a procedure returns from it.
pub fn execute(
    program: &Program,
    memory: &mut Memory,
    stack: &mut CallStack,
    entry: usize,
) -> Result<(), FaultContext> {
    let fault = |trap: Trap, frame: Frame| FaultContext {
        trap,
        pou: program.get(frame.pou).pou.id.clone(),
        statement: frame.pc,
    };

    stack.clear();
    let entry_pou = &program.get(entry).pou;
    let frame = stack
        .push(entry, entry_pou.stack_usage)
        .map_err(|trap| FaultContext {
            trap,
            pou: entry_pou.id.clone(),
            statement: 0,
        })?;
    memory
        .zero(MemoryLocation::new(STACK_AREA, frame.base), frame.size)
        .map_err(|trap| fault(trap, frame))?;

    while let Some(frame) = stack.current() {
        let linked = program.get(frame.pou);
        let next = match linked.pou.statements.get(frame.pc) {
            Some(statement) => step(statement, linked.targets[frame.pc], memory, frame.base)
                .map_err(|trap| fault(trap, frame))?,
            None => Step::Return,
        };

        match next {
            Step::Next => advance(stack, frame.pc + 1),
            Step::Goto(position) => advance(stack, position),
            Step::Call {
                callee,
                inputs,
                outputs,
            } => match callee {
                Callee::Pou(index) => enter(program, memory, stack, frame, index, inputs)
                    .map_err(|trap| fault(trap, frame))?,
                Callee::Builtin(builtin) => {
                    call_builtin(memory, stack, frame, builtin, inputs, outputs)
                        .map_err(|trap| fault(trap, frame))?;
                    advance(stack, frame.pc + 1);
                }
            },
            Step::Return => {
                stack.pop();
                let Some(caller) = stack.current() else {
                    break;
                };
                let callee = &linked.pou;
                if let Some(Statement::StaticCall { outputs, .. }) =
                    program.get(caller.pou).pou.statements.get(caller.pc)
                {
                    copy_arguments(
                        memory,
                        frame.base,
                        offsets(&callee.outputs),
                        caller.base,
                        outputs.iter().copied(),
                        &callee.outputs,
                    )
                    .map_err(|trap| fault(trap, caller))?;
                }
                advance(stack, caller.pc + 1);
            }
        }
    }
    Ok(())
}

fn advance(stack: &mut CallStack, pc: usize) {
    if let Some(frame) = stack.current_mut() {
        frame.pc = pc;
    }
}
