//! The instruction set.
//!
//! Statements hold no state. Control flow state is the runtime's program
//! counter and call stack, and each statement is a transition over it.

use std::fmt;
use std::str::FromStr;

use crate::error::IrError;
use crate::expression::Expression;
use crate::memory::LocalVarOffset;
use crate::pou::PouId;
use crate::text;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// Kept only for readability of the text form.
    Comment { text: String },
    /// A jump target.
    Label { name: String },
    Jump { label: String },
    /// Jumps when the BOOL in the control slot is FALSE.
    JumpIfNot {
        control: LocalVarOffset,
        label: String,
    },
    /// Calls a procedure. Inputs are copied from the caller's slots into
    /// the callee's input arguments; outputs are copied back on return.
    StaticCall {
        callee: PouId,
        inputs: Vec<LocalVarOffset>,
        outputs: Vec<LocalVarOffset>,
    },
    /// Writes `size` bytes at the address of the target slot.
    WriteValue {
        size: usize,
        value: Expression,
        target: LocalVarOffset,
    },
    /// Writes `size` bytes at the location held by the pointer in the
    /// target slot.
    WriteDerefValue {
        size: usize,
        value: Expression,
        target: LocalVarOffset,
    },
    Return,
}

impl Statement {
    /// A comment. Line breaks become spaces so the text form stays on one
    /// line, and trailing whitespace is dropped.
    pub fn comment(text: &str) -> Self {
        Statement::Comment {
            text: text.replace(['\r', '\n'], " ").trim_end().to_string(),
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Statement::Label { name: name.into() }
    }

    /// Returns the label this statement may transfer control to.
    pub fn jump_target(&self) -> Option<&str> {
        match self {
            Statement::Jump { label } | Statement::JumpIfNot { label, .. } => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Comment { text } => write!(f, "// {}", text.trim_end()),
            Statement::Label { name } => write!(f, "label {name}"),
            Statement::Jump { label } => write!(f, "jump {label}"),
            Statement::JumpIfNot { control, label } => write!(f, "jumpifnot {control} {label}"),
            Statement::StaticCall {
                callee,
                inputs,
                outputs,
            } => write!(
                f,
                "call {callee}({}) => ({})",
                join(inputs),
                join(outputs)
            ),
            Statement::WriteValue {
                size,
                value,
                target,
            } => write!(f, "copy{size} {value} to {target}"),
            Statement::WriteDerefValue {
                size,
                value,
                target,
            } => write!(f, "copy{size} {value} to *{target}"),
            Statement::Return => write!(f, "return"),
        }
    }
}

fn join(offsets: &[LocalVarOffset]) -> String {
    offsets
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromStr for Statement {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        text::parse_statement(s)
    }
}

/// Renders statements one per line.
pub fn render_statements(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
