//! Compiled global variable lists.

use crate::pou::CompiledPou;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalVariable {
    pub name: String,
    pub offset: u16,
    pub type_name: String,
}

/// The storage and initialization of one global variable list.
///
/// The list owns a whole memory area. The initializer, when present, runs
/// once before any entry point and addresses the area through pointers.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledGlobalVariableList {
    pub name: String,
    pub area: u16,
    pub size: usize,
    pub variables: Option<Vec<GlobalVariable>>,
    pub initializer: Option<CompiledPou>,
}

impl CompiledGlobalVariableList {
    pub fn new(name: impl Into<String>, area: u16, size: usize) -> Self {
        CompiledGlobalVariableList {
            name: name.into(),
            area,
            size,
            variables: None,
            initializer: None,
        }
    }

    pub fn with_variables(mut self, variables: Vec<GlobalVariable>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_initializer(mut self, initializer: CompiledPou) -> Self {
        self.initializer = Some(initializer);
        self
    }

    /// Finds a variable by name, ignoring ASCII case.
    pub fn variable(&self, name: &str) -> Option<&GlobalVariable> {
        self.variables
            .as_deref()?
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_when_different_case_then_found() {
        let gvl = CompiledGlobalVariableList::new("Globals", 2, 2).with_variables(vec![
            GlobalVariable {
                name: String::from("Count"),
                offset: 0,
                type_name: String::from("INT"),
            },
        ]);

        assert_eq!(gvl.variable("COUNT").unwrap().offset, 0);
        assert!(gvl.variable("other").is_none());
    }

    #[test]
    fn variable_when_no_table_then_none() {
        let gvl = CompiledGlobalVariableList::new("Globals", 2, 2);

        assert!(gvl.variable("Count").is_none());
    }
}
