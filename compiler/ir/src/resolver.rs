//! Resolves type names to runtime type descriptors.
//!
//! Resolution never fails. A name that is not a primitive, an array, a
//! pointer or a declared structure resolves to [`RuntimeType::Unknown`] so
//! that tooling keeps working against an incomplete type table.

use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::types::{ArrayType, Dimension, PrimitiveType, RuntimeType, StructProperty, StructuredType};

/// A structured type as it is declared in a type table, with members
/// referring to their types by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructDeclaration {
    pub name: String,
    pub size: usize,
    pub fields: Vec<FieldDeclaration>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDeclaration {
    pub name: String,
    pub offset: u16,
    pub type_name: String,
}

peg::parser! {
    grammar type_text() for str {
        rule _ = [' ' | '\t']*
        rule __ = [' ' | '\t']+

        rule keyword(expected: &'static str) -> ()
            = word:$(['a'..='z' | 'A'..='Z']+) {?
                if word.eq_ignore_ascii_case(expected) { Ok(()) } else { Err(expected) }
            }

        rule bound() -> i32
            = n:$("-"? ['0'..='9']+) {? n.parse().or(Err("32-bit array bound")) }

        rule dimension() -> Dimension
            = _ lower:bound() _ ".." _ upper:bound() _ { Dimension::new(lower, upper) }

        /// `ARRAY[l..u{,l..u}] OF <base>`
        pub rule array() -> (Vec<Dimension>, &'input str)
            = _ keyword("ARRAY") _ "[" dimensions:(dimension() ++ ",") "]" _ keyword("OF") __ base:$([_]+) {
                (dimensions, base.trim())
            }

        /// `POINTER TO <base>`
        pub rule pointer() -> &'input str
            = _ keyword("POINTER") __ keyword("TO") __ base:$([_]+) { base.trim() }
    }
}

enum Materialized {
    /// Materialization started and has not finished; a lookup in this
    /// state is a reference cycle.
    InProgress,
    Done(Rc<RuntimeType>),
}

/// A registry of declared structured types that materializes them lazily.
#[derive(Default)]
pub struct TypeResolver {
    declarations: HashMap<String, StructDeclaration>,
    materialized: HashMap<String, Materialized>,
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_declarations(declarations: impl IntoIterator<Item = StructDeclaration>) -> Self {
        let mut resolver = Self::new();
        for declaration in declarations {
            resolver.declare(declaration);
        }
        resolver
    }

    /// Adds a structured type. Names are matched ignoring ASCII case.
    pub fn declare(&mut self, declaration: StructDeclaration) {
        self.materialized.clear();
        self.declarations
            .insert(declaration.name.to_ascii_uppercase(), declaration);
    }

    /// Resolves a type from its text form.
    pub fn resolve(&mut self, text: &str) -> Rc<RuntimeType> {
        let text = text.trim();
        if let Some(primitive) = PrimitiveType::from_name(text) {
            return Rc::new(RuntimeType::Primitive(primitive));
        }
        if let Ok((dimensions, base)) = type_text::array(text) {
            let element = self.resolve(base);
            return Rc::new(RuntimeType::Array(ArrayType::new(dimensions, element)));
        }
        if let Ok(base) = type_text::pointer(text) {
            return Rc::new(RuntimeType::Pointer(self.resolve(base)));
        }
        self.resolve_struct(text)
            .unwrap_or_else(|| Rc::new(RuntimeType::Unknown(text.to_string())))
    }

    fn resolve_struct(&mut self, name: &str) -> Option<Rc<RuntimeType>> {
        let key = name.to_ascii_uppercase();
        match self.materialized.get(&key) {
            Some(Materialized::Done(ty)) => return Some(ty.clone()),
            Some(Materialized::InProgress) => {
                trace!("Type {name} refers to itself while being resolved");
                return None;
            }
            None => {}
        }

        let declaration = self.declarations.get(&key)?.clone();
        self.materialized
            .insert(key.clone(), Materialized::InProgress);

        let properties = declaration
            .fields
            .iter()
            .map(|field| StructProperty {
                name: field.name.clone(),
                offset: field.offset,
                ty: self.resolve(&field.type_name),
            })
            .collect();
        let ty = Rc::new(RuntimeType::Struct(StructuredType::new(
            declaration.name,
            declaration.size,
            properties,
        )));

        self.materialized
            .insert(key, Materialized::Done(ty.clone()));
        Some(ty)
    }
}
