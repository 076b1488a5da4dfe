//! Compiled program organization units.

use std::borrow::Borrow;
use std::fmt;

use crate::debug::DebugData;
use crate::statement::Statement;

/// The name of a compiled procedure. Names are case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PouId(String);

impl PouId {
    pub fn new(name: impl Into<String>) -> Self {
        PouId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PouId {
    fn from(name: &str) -> Self {
        PouId(name.to_string())
    }
}

impl From<String> for PouId {
    fn from(name: String) -> Self {
        PouId(name)
    }
}

impl Borrow<str> for PouId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PouId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An input or output slot in a procedure's frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompiledArgument {
    pub offset: u16,
    pub size: usize,
}

impl CompiledArgument {
    pub fn new(offset: u16, size: usize) -> Self {
        CompiledArgument { offset, size }
    }
}

/// A procedure ready to execute.
///
/// `stack_usage` is the size of the frame the procedure needs. Every frame
/// offset its statements touch lies inside the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledPou {
    pub id: PouId,
    pub stack_usage: usize,
    pub inputs: Vec<CompiledArgument>,
    pub outputs: Vec<CompiledArgument>,
    pub statements: Vec<Statement>,
    pub debug: Option<DebugData>,
}

impl CompiledPou {
    pub fn new(id: impl Into<PouId>, stack_usage: usize) -> Self {
        CompiledPou {
            id: id.into(),
            stack_usage,
            inputs: vec![],
            outputs: vec![],
            statements: vec![],
            debug: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<CompiledArgument>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<CompiledArgument>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_statements(mut self, statements: Vec<Statement>) -> Self {
        self.statements = statements;
        self
    }

    pub fn with_debug(mut self, debug: DebugData) -> Self {
        self.debug = Some(debug);
        self
    }
}
