//! Execution engine for compiled structured text.
//!
//! A [`ProgramImage`] is loaded into a [`Vm`], which links every procedure
//! and allocates the memory areas. Starting the VM runs the global variable
//! initializers; the running VM then executes entry points on demand.

pub(crate) mod builtin;
pub mod error;
mod execute;
mod image;
pub(crate) mod link;
pub(crate) mod memory;
pub(crate) mod stack;
mod vm;

pub use error::{FaultContext, LinkError, Trap, VmError};
pub use image::ProgramImage;
pub use vm::{EntryPoint, GlobalSymbol, Vm, VmFaulted, VmReady, VmRunning, VmStopped};
