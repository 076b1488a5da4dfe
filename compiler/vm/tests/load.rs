mod common;

use std::fs;

use stplc_ir::envelope::{write_gvl, write_pou};
use stplc_ir::{
    parse_statements, CompiledArgument, CompiledGlobalVariableList, CompiledPou, Expression,
    GlobalVariable, LocalVarOffset, Statement,
};
use stplc_vm::{LinkError, ProgramImage, Vm, VmError};

use common::{int_globals, pou, run_main, running};

/// Global variables `x: INT := 12345; y: BOOL := TRUE`.
fn initialized_globals() -> CompiledGlobalVariableList {
    let initializer = pou(
        "Globals.INIT",
        4,
        "copy4 0x20000 to $0
copy2 0x3039 to *$0
copy4 0x20002 to $0
copy1 0x1 to *$0
return",
    );
    CompiledGlobalVariableList::new("Globals", 2, 3)
        .with_variables(vec![
            GlobalVariable {
                name: String::from("x"),
                offset: 0,
                type_name: String::from("INT"),
            },
            GlobalVariable {
                name: String::from("y"),
                offset: 2,
                type_name: String::from("BOOL"),
            },
        ])
        .with_initializer(initializer)
}

#[test]
fn start_when_gvl_has_initializer_then_globals_initialized() {
    let vm = running(vec![], vec![initialized_globals()]);

    assert_eq!(vm.read_global("Globals", "x").unwrap(), "12345");
    assert_eq!(vm.read_global("Globals", "y").unwrap(), "TRUE");
    assert_eq!(vm.globals().len(), 2);
}

#[test]
fn load_when_gvl_without_initializer_then_globals_zero() {
    let vm = running(vec![], vec![int_globals(&["a"])]);

    assert_eq!(vm.read_global("Globals", "a").unwrap(), "0");
}

#[test]
fn entry_point_when_pou_has_inputs_then_entry_point_has_inputs() {
    let add = pou("ADD", 4, "return").with_inputs(vec![CompiledArgument::new(0, 2)]);
    let vm = running(vec![add], vec![]);

    assert!(matches!(
        vm.entry_point("ADD"),
        Err(VmError::EntryPointHasInputs(id)) if id.as_str() == "ADD"
    ));
}

#[test]
fn entry_point_when_builtin_name_then_unknown_entry_point() {
    let vm = running(vec![], vec![]);

    assert!(matches!(
        vm.entry_point("ADD_INT"),
        Err(VmError::UnknownEntryPoint(_))
    ));
}

#[test]
fn load_when_unresolved_label_then_link_error() {
    let image = ProgramImage::new(64, vec![pou("MAIN", 0, "jump MISSING")], vec![]);

    let result = Vm::new().load(image);

    assert!(matches!(
        result,
        Err(VmError::Link(LinkError::UnresolvedLabel { .. }))
    ));
}

#[test]
fn load_when_copy_size_overflows_frame_offset_then_link_error() {
    let main = CompiledPou::new("MAIN", 4).with_statements(vec![Statement::WriteValue {
        size: usize::MAX,
        value: Expression::literal_i16(0),
        target: LocalVarOffset(1),
    }]);
    let image = ProgramImage::new(64, vec![main], vec![]);

    let result = Vm::new().load(image);

    assert!(matches!(
        result,
        Err(VmError::Link(LinkError::FrameOffsetOutOfRange { .. }))
    ));
}

#[test]
fn load_when_initializer_calls_unknown_procedure_then_link_error() {
    let gvl = CompiledGlobalVariableList::new("Globals", 2, 0)
        .with_initializer(pou("Globals.INIT", 0, "call MISSING() => ()"));
    let image = ProgramImage::new(64, vec![], vec![gvl]);

    let result = Vm::new().load(image);

    assert!(matches!(
        result,
        Err(VmError::Link(LinkError::UnknownProcedure { .. }))
    ));
}

#[test]
fn from_directory_when_compiled_files_then_runs_program() {
    let dir = tempfile::tempdir().unwrap();
    let main = CompiledPou::new("MAIN", 8).with_statements(
        parse_statements(
            "copy4 0x20000 to $0
copy2 *$0 to $4
call NEG_INT($4) => ($6)
copy2 $6 to *$0",
        )
        .unwrap(),
    );
    write_pou(&dir.path().join("MAIN.pou.xml"), &main).unwrap();
    write_gvl(&dir.path().join("Globals.gvl.xml"), &initialized_globals()).unwrap();
    fs::write(dir.path().join("README.txt"), "not a compiled unit").unwrap();

    let image = ProgramImage::from_directory(dir.path(), 256).unwrap();
    assert_eq!(image.area_sizes(), &[0, 256, 3]);
    let mut vm = Vm::new().load(image).unwrap().start().unwrap();
    run_main(&mut vm);

    assert_eq!(vm.read_global("Globals", "x").unwrap(), "-12345");
    assert_eq!(vm.read_global("Globals", "y").unwrap(), "TRUE");
}

#[test]
fn from_directory_when_malformed_file_then_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("MAIN.pou.xml"), "<pou").unwrap();

    let result = ProgramImage::from_directory(dir.path(), 256);

    assert!(matches!(result, Err(VmError::Ir(_))));
}
