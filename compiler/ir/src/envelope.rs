//! XML files that carry compiled units between the compiler and the runtime.
//!
//! A procedure is a `.pou.xml` file, a global variable list is a `.gvl.xml`
//! file and structured type declarations are a `.types.xml` file. Statement
//! bodies are stored in their text form.

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::debug::{BreakpointMap, DebugData, VariableEntry};
use crate::error::IrError;
use crate::gvl::{CompiledGlobalVariableList, GlobalVariable};
use crate::pou::{CompiledArgument, CompiledPou, PouId};
use crate::resolver::{FieldDeclaration, StructDeclaration};
use crate::statement::render_statements;
use crate::text::parse_statements;

pub const POU_EXTENSION: &str = ".pou.xml";
pub const GVL_EXTENSION: &str = ".gvl.xml";
pub const TYPES_EXTENSION: &str = ".types.xml";

#[derive(Debug, Serialize, Deserialize)]
struct ArgumentElement {
    #[serde(rename = "@offset")]
    offset: u16,
    #[serde(rename = "@size")]
    size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct LocalVariableElement {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@offset")]
    offset: u16,
    #[serde(rename = "@type")]
    type_name: String,
    #[serde(rename = "@argument", default)]
    argument: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "Pou")]
struct PouElement {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@stackUsage")]
    stack_usage: usize,
    #[serde(rename = "@sourceFile", default, skip_serializing_if = "Option::is_none")]
    source_file: Option<String>,
    #[serde(rename = "Input", default)]
    inputs: Vec<ArgumentElement>,
    #[serde(rename = "Output", default)]
    outputs: Vec<ArgumentElement>,
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Breakpoints", default, skip_serializing_if = "Option::is_none")]
    breakpoints: Option<String>,
    #[serde(rename = "Variable", default)]
    variables: Vec<LocalVariableElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GlobalVariableElement {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@offset")]
    offset: u16,
    #[serde(rename = "@type")]
    type_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "GlobalVariableList")]
struct GvlElement {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@area")]
    area: u16,
    #[serde(rename = "@size")]
    size: usize,
    #[serde(rename = "Variable", default)]
    variables: Vec<GlobalVariableElement>,
    #[serde(rename = "Initializer", default, skip_serializing_if = "Option::is_none")]
    initializer: Option<PouElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldElement {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@offset")]
    offset: u16,
    #[serde(rename = "@type")]
    type_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StructElement {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@size")]
    size: usize,
    #[serde(rename = "Field", default)]
    fields: Vec<FieldElement>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "Types")]
struct TypesElement {
    #[serde(rename = "Struct", default)]
    structs: Vec<StructElement>,
}

fn to_xml<T: Serialize>(element: &T) -> Result<String, IrError> {
    quick_xml::se::to_string(element).map_err(|e| IrError::Xml(e.to_string()))
}

fn from_xml<'de, T: Deserialize<'de>>(xml: &'de str) -> Result<T, IrError> {
    quick_xml::de::from_str(xml).map_err(|e| IrError::Xml(e.to_string()))
}

fn arguments_to_elements(arguments: &[CompiledArgument]) -> Vec<ArgumentElement> {
    arguments
        .iter()
        .map(|a| ArgumentElement {
            offset: a.offset,
            size: a.size,
        })
        .collect()
}

fn elements_to_arguments(elements: Vec<ArgumentElement>) -> Vec<CompiledArgument> {
    elements
        .into_iter()
        .map(|e| CompiledArgument::new(e.offset, e.size))
        .collect()
}

impl PouElement {
    fn from_pou(pou: &CompiledPou) -> Result<Self, IrError> {
        let mut element = PouElement {
            id: pou.id.to_string(),
            stack_usage: pou.stack_usage,
            source_file: None,
            inputs: arguments_to_elements(&pou.inputs),
            outputs: arguments_to_elements(&pou.outputs),
            code: render_statements(&pou.statements),
            breakpoints: None,
            variables: vec![],
        };

        if let Some(debug) = &pou.debug {
            element.source_file = debug
                .source_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned());
            if !debug.breakpoints.is_empty() {
                element.breakpoints = Some(STANDARD.encode(debug.breakpoints.compress()?));
            }
            element.variables = debug
                .variables
                .iter()
                .map(|v| LocalVariableElement {
                    name: v.name.clone(),
                    offset: v.offset,
                    type_name: v.type_name.clone(),
                    argument: v.is_argument,
                })
                .collect();
        }
        Ok(element)
    }

    fn into_pou(self) -> Result<CompiledPou, IrError> {
        let statements = parse_statements(&self.code)?;

        let has_debug =
            self.source_file.is_some() || self.breakpoints.is_some() || !self.variables.is_empty();
        let debug = if has_debug {
            let breakpoints = match self.breakpoints {
                Some(encoded) => {
                    let bytes = STANDARD
                        .decode(encoded.trim())
                        .map_err(|e| IrError::Encoding(e.to_string()))?;
                    BreakpointMap::decompress(&bytes)?
                }
                None => BreakpointMap::default(),
            };
            Some(DebugData {
                breakpoints,
                variables: self
                    .variables
                    .into_iter()
                    .map(|v| VariableEntry {
                        name: v.name,
                        offset: v.offset,
                        type_name: v.type_name,
                        is_argument: v.argument,
                    })
                    .collect(),
                source_path: self.source_file.map(PathBuf::from),
            })
        } else {
            None
        };

        Ok(CompiledPou {
            id: PouId::from(self.id),
            stack_usage: self.stack_usage,
            inputs: elements_to_arguments(self.inputs),
            outputs: elements_to_arguments(self.outputs),
            statements,
            debug,
        })
    }
}

pub fn pou_to_xml(pou: &CompiledPou) -> Result<String, IrError> {
    to_xml(&PouElement::from_pou(pou)?)
}

pub fn pou_from_xml(xml: &str) -> Result<CompiledPou, IrError> {
    from_xml::<PouElement>(xml)?.into_pou()
}

/// Serializes a global variable list. A list without a variable table and
/// one with an empty table are written the same way.
pub fn gvl_to_xml(gvl: &CompiledGlobalVariableList) -> Result<String, IrError> {
    let element = GvlElement {
        name: gvl.name.clone(),
        area: gvl.area,
        size: gvl.size,
        variables: gvl
            .variables
            .iter()
            .flatten()
            .map(|v| GlobalVariableElement {
                name: v.name.clone(),
                offset: v.offset,
                type_name: v.type_name.clone(),
            })
            .collect(),
        initializer: gvl
            .initializer
            .as_ref()
            .map(PouElement::from_pou)
            .transpose()?,
    };
    to_xml(&element)
}

pub fn gvl_from_xml(xml: &str) -> Result<CompiledGlobalVariableList, IrError> {
    let element: GvlElement = from_xml(xml)?;
    let variables = (!element.variables.is_empty()).then(|| {
        element
            .variables
            .into_iter()
            .map(|v| GlobalVariable {
                name: v.name,
                offset: v.offset,
                type_name: v.type_name,
            })
            .collect()
    });
    Ok(CompiledGlobalVariableList {
        name: element.name,
        area: element.area,
        size: element.size,
        variables,
        initializer: element.initializer.map(PouElement::into_pou).transpose()?,
    })
}

pub fn types_to_xml(declarations: &[StructDeclaration]) -> Result<String, IrError> {
    let element = TypesElement {
        structs: declarations
            .iter()
            .map(|d| StructElement {
                name: d.name.clone(),
                size: d.size,
                fields: d
                    .fields
                    .iter()
                    .map(|f| FieldElement {
                        name: f.name.clone(),
                        offset: f.offset,
                        type_name: f.type_name.clone(),
                    })
                    .collect(),
            })
            .collect(),
    };
    to_xml(&element)
}

pub fn types_from_xml(xml: &str) -> Result<Vec<StructDeclaration>, IrError> {
    let element: TypesElement = from_xml(xml)?;
    Ok(element
        .structs
        .into_iter()
        .map(|s| StructDeclaration {
            name: s.name,
            size: s.size,
            fields: s
                .fields
                .into_iter()
                .map(|f| FieldDeclaration {
                    name: f.name,
                    offset: f.offset,
                    type_name: f.type_name,
                })
                .collect(),
        })
        .collect())
}

/// The contents of any compiled-unit file.
#[derive(Clone, Debug, PartialEq)]
pub enum CompiledFile {
    Pou(CompiledPou),
    Gvl(CompiledGlobalVariableList),
    Types(Vec<StructDeclaration>),
}

/// Reads a compiled-unit file, choosing the schema from the file name.
pub fn read_file(path: &Path) -> Result<CompiledFile, IrError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    debug!("Reading compiled unit {}", path.display());

    if name.ends_with(POU_EXTENSION) {
        Ok(CompiledFile::Pou(pou_from_xml(&fs::read_to_string(path)?)?))
    } else if name.ends_with(GVL_EXTENSION) {
        Ok(CompiledFile::Gvl(gvl_from_xml(&fs::read_to_string(path)?)?))
    } else if name.ends_with(TYPES_EXTENSION) {
        Ok(CompiledFile::Types(types_from_xml(&fs::read_to_string(path)?)?))
    } else {
        Err(IrError::UnrecognizedFile(path.display().to_string()))
    }
}

pub fn write_pou(path: &Path, pou: &CompiledPou) -> Result<(), IrError> {
    fs::write(path, pou_to_xml(pou)?)?;
    Ok(())
}

pub fn write_gvl(path: &Path, gvl: &CompiledGlobalVariableList) -> Result<(), IrError> {
    fs::write(path, gvl_to_xml(gvl)?)?;
    Ok(())
}

pub fn write_types(path: &Path, declarations: &[StructDeclaration]) -> Result<(), IrError> {
    fs::write(path, types_to_xml(declarations)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Statement;

    #[test]
    fn pou_from_xml_when_hand_written_then_parses_code() {
        let xml = r#"<Pou id="MAIN" stackUsage="4">
  <Code>
copy2 0x7 to $0
return
  </Code>
</Pou>"#;

        let pou = pou_from_xml(xml).unwrap();

        assert_eq!(pou.id.as_str(), "MAIN");
        assert_eq!(pou.stack_usage, 4);
        assert_eq!(pou.statements.len(), 2);
        assert_eq!(pou.statements[1], Statement::Return);
        assert!(pou.debug.is_none());
    }

    #[test]
    fn pou_from_xml_when_code_is_not_statements_then_syntax_error() {
        let xml = r#"<Pou id="MAIN" stackUsage="4"><Code>goto 5</Code></Pou>"#;

        assert!(matches!(pou_from_xml(xml), Err(IrError::Syntax { .. })));
    }

    #[test]
    fn pou_from_xml_when_breakpoints_not_base64_then_encoding_error() {
        let xml = r#"<Pou id="MAIN" stackUsage="0"><Code>return</Code><Breakpoints>!!!</Breakpoints></Pou>"#;

        assert!(matches!(pou_from_xml(xml), Err(IrError::Encoding(_))));
    }

    #[test]
    fn pou_from_xml_when_not_xml_then_xml_error() {
        assert!(matches!(pou_from_xml("<Pou"), Err(IrError::Xml(_))));
    }

    #[test]
    fn types_from_xml_when_struct_then_declaration() {
        let xml = r#"<Types><Struct name="Point" size="4"><Field name="x" offset="0" type="INT"/><Field name="y" offset="2" type="INT"/></Struct></Types>"#;

        let declarations = types_from_xml(xml).unwrap();

        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].fields[1].name, "y");
        assert_eq!(declarations[0].fields[1].offset, 2);
    }

    #[test]
    fn read_file_when_unknown_extension_then_error() {
        let result = read_file(Path::new("program.txt"));

        assert!(matches!(result, Err(IrError::UnrecognizedFile(_))));
    }
}
