//! Intermediate representation of compiled structured text.
//!
//! A compiled program is a set of procedures ([`CompiledPou`]) and global
//! variable lists ([`CompiledGlobalVariableList`]). Procedure bodies are
//! sequences of [`Statement`]s that address memory by area and offset. Each
//! statement and expression has a one-line text form, and compiled units are
//! stored as XML files (see [`envelope`]).

mod debug;
pub mod envelope;
mod error;
mod expression;
mod gvl;
pub mod layout;
mod memory;
mod pou;
mod resolver;
mod statement;
mod text;
mod types;

pub use debug::{Breakpoint, BreakpointMap, DebugData, SourcePosition, VariableEntry};
pub use error::IrError;
pub use expression::{AddressBase, AddressElement, Expression};
pub use gvl::{CompiledGlobalVariableList, GlobalVariable};
pub use memory::{
    AccessViolation, LocalVarOffset, MemoryLocation, MemoryReader, FIRST_GLOBAL_AREA,
    POINTER_SIZE, RESERVED_AREA, STACK_AREA,
};
pub use pou::{CompiledArgument, CompiledPou, PouId};
pub use resolver::{FieldDeclaration, StructDeclaration, TypeResolver};
pub use statement::{render_statements, Statement};
pub use text::{parse_local, parse_statements};
pub use types::{
    ArrayType, Dimension, IndexedChildren, PrimitiveType, RuntimeType, Scalar, StructProperty,
    StructuredType,
};
