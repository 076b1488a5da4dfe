//! Compiled units read back from the XML files they are written to.

use std::path::PathBuf;

use stplc_ir::envelope::{
    gvl_from_xml, gvl_to_xml, pou_from_xml, pou_to_xml, read_file, types_from_xml, types_to_xml,
    write_gvl, write_pou, CompiledFile,
};
use stplc_ir::{
    Breakpoint, BreakpointMap, CompiledArgument, CompiledGlobalVariableList, CompiledPou,
    DebugData, Expression, FieldDeclaration, GlobalVariable, LocalVarOffset, MemoryLocation,
    SourcePosition, Statement, StructDeclaration, VariableEntry,
};

fn add_pou() -> CompiledPou {
    CompiledPou::new("ADD_TWO", 6)
        .with_inputs(vec![CompiledArgument::new(0, 2)])
        .with_outputs(vec![CompiledArgument::new(2, 2)])
        .with_statements(vec![
            Statement::comment("result := value + 2;"),
            Statement::WriteValue {
                size: 2,
                value: Expression::literal_i16(2),
                target: LocalVarOffset(4),
            },
            Statement::StaticCall {
                callee: "ADD_INT".into(),
                inputs: vec![LocalVarOffset(0), LocalVarOffset(4)],
                outputs: vec![LocalVarOffset(2)],
            },
            Statement::Return,
        ])
        .with_debug(DebugData {
            breakpoints: BreakpointMap::new(vec![
                Breakpoint {
                    statement: 1,
                    position: SourcePosition::new(3, 5),
                },
                Breakpoint {
                    statement: 3,
                    position: SourcePosition::new(4, 1),
                },
            ]),
            variables: vec![
                VariableEntry {
                    name: String::from("value"),
                    offset: 0,
                    type_name: String::from("INT"),
                    is_argument: true,
                },
                VariableEntry {
                    name: String::from("result"),
                    offset: 2,
                    type_name: String::from("INT"),
                    is_argument: true,
                },
            ],
            source_path: Some(PathBuf::from("src/add_two.st")),
        })
}

fn globals() -> CompiledGlobalVariableList {
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
        .with_initializer(
            CompiledPou::new("Globals.init", 4).with_statements(vec![
                Statement::WriteValue {
                    size: 4,
                    value: Expression::literal_pointer(MemoryLocation::new(2, 0)),
                    target: LocalVarOffset(0),
                },
                Statement::WriteDerefValue {
                    size: 2,
                    value: Expression::literal_i16(12345),
                    target: LocalVarOffset(0),
                },
                Statement::Return,
            ]),
        )
}

#[test]
fn pou_when_written_with_debug_data_then_reads_back_equal() {
    let pou = add_pou();

    let xml = pou_to_xml(&pou).unwrap();

    assert!(xml.starts_with("<Pou"));
    assert_eq!(pou_from_xml(&xml).unwrap(), pou);
}

#[test]
fn pou_when_last_statement_is_comment_with_trailing_space_then_reads_back_equal() {
    let pou = CompiledPou::new("MAIN", 0).with_statements(vec![
        Statement::Return,
        Statement::comment("end of MAIN   "),
        Statement::comment(""),
    ]);

    let xml = pou_to_xml(&pou).unwrap();

    assert_eq!(pou_from_xml(&xml).unwrap(), pou);
}

#[test]
fn gvl_when_written_with_initializer_then_reads_back_equal() {
    let gvl = globals();

    let xml = gvl_to_xml(&gvl).unwrap();

    assert!(xml.contains("<Initializer"));
    assert_eq!(gvl_from_xml(&xml).unwrap(), gvl);
}

#[test]
fn types_when_written_then_reads_back_equal() {
    let declarations = vec![StructDeclaration {
        name: String::from("Point"),
        size: 4,
        fields: vec![
            FieldDeclaration {
                name: String::from("x"),
                offset: 0,
                type_name: String::from("INT"),
            },
            FieldDeclaration {
                name: String::from("y"),
                offset: 2,
                type_name: String::from("INT"),
            },
        ],
    }];

    let xml = types_to_xml(&declarations).unwrap();

    assert_eq!(types_from_xml(&xml).unwrap(), declarations);
}

#[test]
fn read_file_when_files_in_directory_then_selects_schema_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let pou_path = dir.path().join("ADD_TWO.pou.xml");
    let gvl_path = dir.path().join("Globals.gvl.xml");
    write_pou(&pou_path, &add_pou()).unwrap();
    write_gvl(&gvl_path, &globals()).unwrap();

    assert_eq!(read_file(&pou_path).unwrap(), CompiledFile::Pou(add_pou()));
    assert_eq!(read_file(&gvl_path).unwrap(), CompiledFile::Gvl(globals()));
}
