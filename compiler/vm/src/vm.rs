use std::rc::Rc;

use log::debug;
use stplc_ir::{
    MemoryLocation, MemoryReader, PouId, RuntimeType, TypeResolver, FIRST_GLOBAL_AREA,
};

use crate::error::{FaultContext, LinkError, Trap, VmError};
use crate::execute::execute;
use crate::image::ProgramImage;
use crate::link::Program;
use crate::memory::Memory;
use crate::stack::CallStack;

/// A global variable with its resolved type and absolute location.
#[derive(Clone, Debug)]
pub struct GlobalSymbol {
    /// The global variable list that declares the variable.
    pub list: String,
    pub name: String,
    pub location: MemoryLocation,
    pub ty: Rc<RuntimeType>,
}

/// A validated procedure that can be run with [`VmRunning::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPoint {
    index: usize,
    id: PouId,
}

impl EntryPoint {
    pub fn id(&self) -> &PouId {
        &self.id
    }
}

/// A newly created VM with no loaded program.
///
/// The only valid operation is [`load`](Vm::load), which consumes
/// this value and produces a [`VmReady`].
pub struct Vm;

impl Vm {
    pub fn new() -> Self {
        Vm
    }

    /// Allocates the memory areas and links every procedure.
    ///
    /// Fails when a global variable list is not in the area matching its
    /// position or when any procedure fails to link.
    pub fn load(self, image: ProgramImage) -> Result<VmReady, VmError> {
        let (area_sizes, pous, gvls, types) = image.into_parts();

        for (position, gvl) in gvls.iter().enumerate() {
            let expected = FIRST_GLOBAL_AREA + position as u16;
            if gvl.area != expected {
                return Err(LinkError::AreaMismatch {
                    gvl: gvl.name.clone(),
                    expected,
                    actual: gvl.area,
                }
                .into());
            }
        }

        let mut compiled: Vec<_> = pous.into_values().collect();
        compiled.sort_by(|a, b| a.id.cmp(&b.id));
        let mut initializers = vec![];
        for gvl in &gvls {
            if let Some(initializer) = &gvl.initializer {
                initializers.push(compiled.len());
                compiled.push(initializer.clone());
            }
        }
        let program = Program::link(compiled)?;

        let mut resolver = TypeResolver::with_declarations(types);
        let globals = gvls
            .iter()
            .flat_map(|gvl| {
                gvl.variables
                    .iter()
                    .flatten()
                    .map(move |variable| (gvl, variable))
            })
            .map(|(gvl, variable)| GlobalSymbol {
                list: gvl.name.clone(),
                name: variable.name.clone(),
                location: MemoryLocation::new(gvl.area, variable.offset),
                ty: resolver.resolve(&variable.type_name),
            })
            .collect();

        debug!(
            "Loaded program with area sizes {:?} and {} initializers",
            area_sizes,
            initializers.len()
        );
        let stack = CallStack::new(area_sizes[1]);
        Ok(VmReady {
            program,
            memory: Memory::new(&area_sizes),
            stack,
            initializers,
            globals,
        })
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a global variable through its type descriptor.
fn read_global(
    globals: &[GlobalSymbol],
    memory: &Memory,
    list: &str,
    name: &str,
) -> Result<String, VmError> {
    let symbol = globals
        .iter()
        .find(|g| g.list.eq_ignore_ascii_case(list) && g.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| VmError::UnknownGlobal(format!("{list}.{name}")))?;
    symbol
        .ty
        .read_value(symbol.location, memory)
        .map_err(|e| VmError::Trap(Trap::from(e)))
}

/// A VM with a linked program and zeroed memory.
///
/// Call [`start`](VmReady::start) to initialize the global variables.
pub struct VmReady {
    program: Program,
    memory: Memory,
    stack: CallStack,
    initializers: Vec<usize>,
    globals: Vec<GlobalSymbol>,
}

impl VmReady {
    /// Runs every global variable list initializer once, in declaration
    /// order. Consumes the ready VM and returns a running VM.
    pub fn start(mut self) -> Result<VmRunning, FaultContext> {
        for &index in &self.initializers {
            debug!("Initializing globals with {}", self.program.get(index).pou.id);
            execute(&self.program, &mut self.memory, &mut self.stack, index)?;
        }
        Ok(VmRunning {
            program: self.program,
            memory: self.memory,
            stack: self.stack,
            globals: self.globals,
            run_count: 0,
        })
    }

    pub fn memory(&self) -> &dyn MemoryReader {
        &self.memory
    }
}

/// A VM whose global variables are initialized.
///
/// Call [`run`](VmRunning::run) any number of times. On a trap, the caller
/// can transition to [`VmFaulted`].
pub struct VmRunning {
    program: Program,
    memory: Memory,
    stack: CallStack,
    globals: Vec<GlobalSymbol>,
    run_count: u64,
}

impl VmRunning {
    /// Finds a procedure that can be an entry point.
    pub fn entry_point(&self, name: &str) -> Result<EntryPoint, VmError> {
        let index = self
            .program
            .find(name)
            .ok_or_else(|| VmError::UnknownEntryPoint(name.to_string()))?;
        let pou = &self.program.get(index).pou;
        if !pou.inputs.is_empty() {
            return Err(VmError::EntryPointHasInputs(pou.id.clone()));
        }
        Ok(EntryPoint {
            index,
            id: pou.id.clone(),
        })
    }

    /// Runs the entry point to its outermost return.
    ///
    /// Each run starts from an empty call stack. Global variables keep the
    /// values earlier runs left.
    pub fn run(&mut self, entry: &EntryPoint) -> Result<(), FaultContext> {
        debug!("Running {}", entry.id);
        execute(&self.program, &mut self.memory, &mut self.stack, entry.index)?;
        self.run_count += 1;
        Ok(())
    }

    pub fn memory(&self) -> &dyn MemoryReader {
        &self.memory
    }

    pub fn globals(&self) -> &[GlobalSymbol] {
        &self.globals
    }

    /// Renders the value of a global variable, for example `12345`.
    pub fn read_global(&self, list: &str, name: &str) -> Result<String, VmError> {
        read_global(&self.globals, &self.memory, list, name)
    }

    /// Returns the number of completed runs.
    pub fn run_count(&self) -> u64 {
        self.run_count
    }

    /// Transitions to the stopped state (clean shutdown).
    pub fn stop(self) -> VmStopped {
        VmStopped {
            memory: self.memory,
            globals: self.globals,
            run_count: self.run_count,
        }
    }

    /// Transitions to the faulted state (trap occurred).
    pub fn fault(self, context: FaultContext) -> VmFaulted {
        VmFaulted {
            context,
            memory: self.memory,
            globals: self.globals,
        }
    }
}

/// A VM that has been cleanly stopped.
pub struct VmStopped {
    memory: Memory,
    globals: Vec<GlobalSymbol>,
    run_count: u64,
}

impl VmStopped {
    pub fn memory(&self) -> &dyn MemoryReader {
        &self.memory
    }

    pub fn globals(&self) -> &[GlobalSymbol] {
        &self.globals
    }

    pub fn read_global(&self, list: &str, name: &str) -> Result<String, VmError> {
        read_global(&self.globals, &self.memory, list, name)
    }

    pub fn run_count(&self) -> u64 {
        self.run_count
    }
}

/// A VM that has stopped due to a trap.
///
/// Memory is left as the trap found it, including partial writes.
pub struct VmFaulted {
    context: FaultContext,
    memory: Memory,
    globals: Vec<GlobalSymbol>,
}

impl VmFaulted {
    /// Returns the trap that caused the fault.
    pub fn trap(&self) -> &Trap {
        &self.context.trap
    }

    /// Returns the procedure that was executing when the trap occurred.
    pub fn pou(&self) -> &PouId {
        &self.context.pou
    }

    /// Returns the statement that raised the trap.
    pub fn statement(&self) -> usize {
        self.context.statement
    }

    pub fn context(&self) -> &FaultContext {
        &self.context
    }

    pub fn memory(&self) -> &dyn MemoryReader {
        &self.memory
    }

    pub fn globals(&self) -> &[GlobalSymbol] {
        &self.globals
    }

    pub fn read_global(&self, list: &str, name: &str) -> Result<String, VmError> {
        read_global(&self.globals, &self.memory, list, name)
    }
}

#[cfg(test)]
mod tests {
    use stplc_ir::{parse_statements, CompiledGlobalVariableList, CompiledPou, GlobalVariable};

    use super::*;

    fn counter_image() -> ProgramImage {
        let main = CompiledPou::new("MAIN", 10).with_statements(
            parse_statements(
                "copy4 0x20000 to $0\ncopy2 *$0 to $4\ncopy2 0x1 to $6\ncall ADD_INT($4, $6) => ($8)\ncopy2 $8 to *$0\nreturn",
            )
            .unwrap(),
        );
        let globals = CompiledGlobalVariableList::new("Globals", 2, 2).with_variables(vec![
            GlobalVariable {
                name: String::from("count"),
                offset: 0,
                type_name: String::from("INT"),
            },
        ]);
        ProgramImage::new(256, vec![main], vec![globals])
    }

    #[test]
    fn vm_load_when_gvl_in_wrong_area_then_area_mismatch() {
        let image = ProgramImage::new(
            16,
            vec![],
            vec![CompiledGlobalVariableList::new("Globals", 3, 2)],
        );

        let result = Vm::new().load(image);

        assert!(matches!(
            result,
            Err(VmError::Link(LinkError::AreaMismatch {
                expected: 2,
                actual: 3,
                ..
            }))
        ));
    }

    #[test]
    fn vm_run_when_counter_then_increments_each_run() {
        let mut vm = Vm::new().load(counter_image()).unwrap().start().unwrap();
        let entry = vm.entry_point("MAIN").unwrap();

        vm.run(&entry).unwrap();
        vm.run(&entry).unwrap();

        assert_eq!(vm.read_global("Globals", "count").unwrap(), "2");
        assert_eq!(vm.run_count(), 2);
    }

    #[test]
    fn vm_entry_point_when_unknown_then_error() {
        let vm = Vm::new().load(counter_image()).unwrap().start().unwrap();

        assert!(matches!(
            vm.entry_point("OTHER"),
            Err(VmError::UnknownEntryPoint(_))
        ));
    }

    #[test]
    fn vm_read_global_when_unknown_name_then_error() {
        let vm = Vm::new().load(counter_image()).unwrap().start().unwrap();

        assert!(matches!(
            vm.read_global("Globals", "missing"),
            Err(VmError::UnknownGlobal(_))
        ));
    }

    #[test]
    fn vm_stop_when_called_then_keeps_memory() {
        let mut vm = Vm::new().load(counter_image()).unwrap().start().unwrap();
        let entry = vm.entry_point("MAIN").unwrap();
        vm.run(&entry).unwrap();

        let stopped = vm.stop();

        assert_eq!(stopped.read_global("GLOBALS", "COUNT").unwrap(), "1");
        assert_eq!(stopped.run_count(), 1);
    }

    #[test]
    fn vm_fault_when_called_then_returns_faulted_with_context() {
        let vm = Vm::new().load(counter_image()).unwrap().start().unwrap();
        let context = FaultContext {
            trap: Trap::Panic(String::from("index 4 is outside the range [1..3]")),
            pou: PouId::from("MAIN"),
            statement: 3,
        };

        let faulted = vm.fault(context);

        assert_eq!(faulted.pou().as_str(), "MAIN");
        assert_eq!(faulted.statement(), 3);
        assert!(matches!(faulted.trap(), Trap::Panic(_)));
    }
}
