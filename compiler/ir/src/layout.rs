//! Placement of variables in frames and global areas.
//!
//! Each variable starts on a multiple of its type's alignment. The total
//! size ends at the last byte of the last variable; there is no tail padding.

use std::rc::Rc;

use crate::debug::VariableEntry;
use crate::error::IrError;
use crate::gvl::GlobalVariable;
use crate::pou::CompiledArgument;
use crate::types::RuntimeType;

/// A variable to place.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: String,
    pub ty: Rc<RuntimeType>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, ty: impl Into<Rc<RuntimeType>>) -> Self {
        Declaration {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A placed variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub offset: u16,
    pub size: usize,
    pub type_name: String,
}

#[derive(Default)]
struct Allocator {
    end: usize,
}

impl Allocator {
    fn place(&mut self, declaration: &Declaration) -> Result<Slot, IrError> {
        let alignment = declaration.ty.alignment().max(1);
        let size = declaration.ty.size();
        let start = self.end.div_ceil(alignment) * alignment;
        let overflow = || IrError::LayoutOverflow {
            name: declaration.name.clone(),
        };

        let offset = u16::try_from(start).map_err(|_| overflow())?;
        let end = start
            .checked_add(size)
            .filter(|&end| end <= u16::MAX as usize + 1)
            .ok_or_else(overflow)?;
        self.end = end;

        Ok(Slot {
            name: declaration.name.clone(),
            offset,
            size,
            type_name: declaration.ty.name(),
        })
    }

    fn place_all<'a>(
        &mut self,
        declarations: impl IntoIterator<Item = &'a Declaration>,
    ) -> Result<Vec<Slot>, IrError> {
        declarations.into_iter().map(|d| self.place(d)).collect()
    }
}

/// Sorts by descending alignment, keeping declaration order among equals.
fn by_alignment(declarations: &[Declaration]) -> Vec<&Declaration> {
    let mut sorted: Vec<&Declaration> = declarations.iter().collect();
    sorted.sort_by_key(|d| std::cmp::Reverse(d.ty.alignment()));
    sorted
}

/// The layout of a procedure frame.
///
/// Arguments keep their declaration order so that callers can copy them
/// positionally; locals are packed by alignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    pub inputs: Vec<Slot>,
    pub outputs: Vec<Slot>,
    pub locals: Vec<Slot>,
    pub size: usize,
}

impl FrameLayout {
    pub fn new(
        inputs: &[Declaration],
        outputs: &[Declaration],
        locals: &[Declaration],
    ) -> Result<Self, IrError> {
        let mut allocator = Allocator::default();
        let inputs = allocator.place_all(inputs)?;
        let outputs = allocator.place_all(outputs)?;
        let locals = allocator.place_all(by_alignment(locals))?;
        Ok(FrameLayout {
            inputs,
            outputs,
            locals,
            size: allocator.end,
        })
    }

    pub fn input_arguments(&self) -> Vec<CompiledArgument> {
        self.inputs
            .iter()
            .map(|s| CompiledArgument::new(s.offset, s.size))
            .collect()
    }

    pub fn output_arguments(&self) -> Vec<CompiledArgument> {
        self.outputs
            .iter()
            .map(|s| CompiledArgument::new(s.offset, s.size))
            .collect()
    }

    /// The variable table of a procedure with this frame.
    pub fn variable_entries(&self) -> Vec<VariableEntry> {
        let arguments = self.inputs.iter().chain(&self.outputs).map(|s| (s, true));
        let locals = self.locals.iter().map(|s| (s, false));
        arguments
            .chain(locals)
            .map(|(slot, is_argument)| VariableEntry {
                name: slot.name.clone(),
                offset: slot.offset,
                type_name: slot.type_name.clone(),
                is_argument,
            })
            .collect()
    }
}

/// The layout of a global variable list area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalLayout {
    pub variables: Vec<Slot>,
    pub size: usize,
}

impl GlobalLayout {
    pub fn new(declarations: &[Declaration]) -> Result<Self, IrError> {
        let mut allocator = Allocator::default();
        let variables = allocator.place_all(by_alignment(declarations))?;
        Ok(GlobalLayout {
            variables,
            size: allocator.end,
        })
    }

    pub fn offset_of(&self, name: &str) -> Option<u16> {
        self.variables
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.offset)
    }

    pub fn global_variables(&self) -> Vec<GlobalVariable> {
        self.variables
            .iter()
            .map(|s| GlobalVariable {
                name: s.name.clone(),
                offset: s.offset,
                type_name: s.type_name.clone(),
            })
            .collect()
    }
}
