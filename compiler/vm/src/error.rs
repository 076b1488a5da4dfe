use std::fmt;

use stplc_ir::{AccessViolation, IrError, PouId};

/// Runtime traps that halt the current invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trap {
    /// A checked failure raised by the program, such as an array index
    /// outside its declared range.
    Panic(String),
    StackOverflow,
    AccessViolation(AccessViolation),
    DivideByZero,
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::Panic(msg) => write!(f, "panic: {msg}"),
            Trap::StackOverflow => write!(f, "stack overflow"),
            Trap::AccessViolation(v) => write!(f, "access violation: {v}"),
            Trap::DivideByZero => write!(f, "divide by zero"),
        }
    }
}

impl From<AccessViolation> for Trap {
    fn from(v: AccessViolation) -> Self {
        Trap::AccessViolation(v)
    }
}

/// Problems in a program image found before anything executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkError {
    UnresolvedLabel {
        pou: PouId,
        label: String,
    },
    DuplicateLabel {
        pou: PouId,
        label: String,
    },
    UnknownProcedure {
        pou: PouId,
        callee: PouId,
    },
    ArgumentCountMismatch {
        pou: PouId,
        callee: PouId,
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A frame access that does not fit inside the procedure's stack usage.
    FrameOffsetOutOfRange {
        pou: PouId,
        offset: u16,
        size: usize,
        stack_usage: usize,
    },
    /// A global variable list that is not in the area matching its position.
    AreaMismatch {
        gvl: String,
        expected: u16,
        actual: u16,
    },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::UnresolvedLabel { pou, label } => {
                write!(f, "{pou}: label {label} is not defined")
            }
            LinkError::DuplicateLabel { pou, label } => {
                write!(f, "{pou}: label {label} is defined more than once")
            }
            LinkError::UnknownProcedure { pou, callee } => {
                write!(f, "{pou}: call to unknown procedure {callee}")
            }
            LinkError::ArgumentCountMismatch {
                pou,
                callee,
                kind,
                expected,
                actual,
            } => write!(
                f,
                "{pou}: call to {callee} has {actual} {kind} arguments but {expected} are declared"
            ),
            LinkError::FrameOffsetOutOfRange {
                pou,
                offset,
                size,
                stack_usage,
            } => write!(
                f,
                "{pou}: access of {size} bytes at ${offset} exceeds the frame size {stack_usage}"
            ),
            LinkError::AreaMismatch {
                gvl,
                expected,
                actual,
            } => write!(
                f,
                "global variable list {gvl} is in area {actual} but must be in area {expected}"
            ),
        }
    }
}

impl std::error::Error for LinkError {}

/// Context for a trap: the procedure and statement that raised it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultContext {
    pub trap: Trap,
    pub pou: PouId,
    pub statement: usize,
}

impl fmt::Display for FaultContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} at statement {}", self.trap, self.pou, self.statement)
    }
}

impl std::error::Error for FaultContext {}

/// Errors produced by VM operations.
#[derive(Debug)]
pub enum VmError {
    /// A trap outside the execution of a procedure.
    Trap(Trap),
    /// A trap while executing a procedure.
    Fault(FaultContext),
    Link(LinkError),
    /// A compiled unit could not be read.
    Ir(IrError),
    UnknownEntryPoint(String),
    /// Entry points are called without arguments.
    EntryPointHasInputs(PouId),
    UnknownGlobal(String),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::Trap(t) => write!(f, "trap: {t}"),
            VmError::Fault(ctx) => write!(f, "fault: {ctx}"),
            VmError::Link(e) => write!(f, "link error: {e}"),
            VmError::Ir(e) => write!(f, "{e}"),
            VmError::UnknownEntryPoint(name) => write!(f, "no procedure named {name}"),
            VmError::EntryPointHasInputs(id) => {
                write!(f, "{id} declares inputs and cannot be an entry point")
            }
            VmError::UnknownGlobal(name) => write!(f, "no global variable named {name}"),
        }
    }
}

impl std::error::Error for VmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VmError::Ir(e) => Some(e),
            VmError::Link(e) => Some(e),
            VmError::Fault(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Trap> for VmError {
    fn from(t: Trap) -> Self {
        VmError::Trap(t)
    }
}

impl From<FaultContext> for VmError {
    fn from(ctx: FaultContext) -> Self {
        VmError::Fault(ctx)
    }
}

impl From<LinkError> for VmError {
    fn from(e: LinkError) -> Self {
        VmError::Link(e)
    }
}

impl From<IrError> for VmError {
    fn from(e: IrError) -> Self {
        VmError::Ir(e)
    }
}
