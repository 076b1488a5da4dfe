//! Shared test helpers for VM integration tests.

use stplc_ir::{parse_statements, CompiledGlobalVariableList, CompiledPou, GlobalVariable};
use stplc_vm::{ProgramImage, Vm, VmRunning};

/// Builds a procedure from IR text.
pub fn pou(id: &str, stack_usage: usize, code: &str) -> CompiledPou {
    CompiledPou::new(id, stack_usage).with_statements(parse_statements(code).unwrap())
}

/// Builds a global variable list in area 2 holding consecutive INT
/// variables.
#[allow(dead_code)]
pub fn int_globals(names: &[&str]) -> CompiledGlobalVariableList {
    let variables = names
        .iter()
        .enumerate()
        .map(|(i, name)| GlobalVariable {
            name: name.to_string(),
            offset: (i * 2) as u16,
            type_name: String::from("INT"),
        })
        .collect();
    CompiledGlobalVariableList::new("Globals", 2, names.len() * 2).with_variables(variables)
}

/// Loads and starts a program with a 1 KiB call stack.
pub fn running(pous: Vec<CompiledPou>, gvls: Vec<CompiledGlobalVariableList>) -> VmRunning {
    let image = ProgramImage::new(1024, pous, gvls);
    Vm::new().load(image).unwrap().start().unwrap()
}

/// Runs `MAIN` once.
#[allow(dead_code)]
pub fn run_main(vm: &mut VmRunning) {
    let entry = vm.entry_point("MAIN").unwrap();
    vm.run(&entry).unwrap();
}
