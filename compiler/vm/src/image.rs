use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use stplc_ir::envelope::{read_file, CompiledFile, GVL_EXTENSION, POU_EXTENSION, TYPES_EXTENSION};
use stplc_ir::{CompiledGlobalVariableList, CompiledPou, IrError, PouId, StructDeclaration};

use crate::error::VmError;

/// Everything the VM needs to load a program.
///
/// The area sizes are indexed by area: index 0 is the reserved area (size
/// 0), index 1 is the call stack and every following index holds one global
/// variable list in declaration order.
#[derive(Clone, Debug)]
pub struct ProgramImage {
    area_sizes: Vec<usize>,
    pous: HashMap<PouId, CompiledPou>,
    gvls: Vec<CompiledGlobalVariableList>,
    types: Vec<StructDeclaration>,
}

impl ProgramImage {
    /// When two procedures share an id, the first one is kept.
    pub fn new(
        stack_size: usize,
        pous: impl IntoIterator<Item = CompiledPou>,
        gvls: Vec<CompiledGlobalVariableList>,
    ) -> Self {
        let mut area_sizes = vec![0, stack_size];
        area_sizes.extend(gvls.iter().map(|gvl| gvl.size));
        let mut by_id = HashMap::new();
        for pou in pous {
            match by_id.entry(pou.id.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(pou);
                }
                Entry::Occupied(_) => warn!("Ignoring duplicate procedure {}", pou.id),
            }
        }
        ProgramImage {
            area_sizes,
            pous: by_id,
            gvls,
            types: vec![],
        }
    }

    /// Adds structured type declarations used to describe global variables.
    pub fn with_types(mut self, types: Vec<StructDeclaration>) -> Self {
        self.types = types;
        self
    }

    /// Reads every compiled-unit file in a directory.
    ///
    /// Global variable lists are ordered by their area. Files with other
    /// extensions are ignored.
    pub fn from_directory(dir: &Path, stack_size: usize) -> Result<Self, VmError> {
        let mut paths = fs::read_dir(dir)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|e| e.path()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(IrError::from)?;
        paths.sort();

        let mut pous = vec![];
        let mut gvls = vec![];
        let mut types = vec![];
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            let known = [POU_EXTENSION, GVL_EXTENSION, TYPES_EXTENSION]
                .iter()
                .any(|extension| name.ends_with(extension));
            if !known {
                debug!("Skipping {}", path.display());
                continue;
            }
            match read_file(&path)? {
                CompiledFile::Pou(pou) => pous.push(pou),
                CompiledFile::Gvl(gvl) => gvls.push(gvl),
                CompiledFile::Types(declarations) => types.extend(declarations),
            }
        }
        gvls.sort_by_key(|gvl| gvl.area);

        debug!(
            "Read {} procedures, {} global variable lists and {} types from {}",
            pous.len(),
            gvls.len(),
            types.len(),
            dir.display()
        );
        Ok(ProgramImage::new(stack_size, pous, gvls).with_types(types))
    }

    pub fn area_sizes(&self) -> &[usize] {
        &self.area_sizes
    }

    pub fn stack_size(&self) -> usize {
        self.area_sizes[1]
    }

    pub fn pous(&self) -> &HashMap<PouId, CompiledPou> {
        &self.pous
    }

    pub fn gvls(&self) -> &[CompiledGlobalVariableList] {
        &self.gvls
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<usize>,
        HashMap<PouId, CompiledPou>,
        Vec<CompiledGlobalVariableList>,
        Vec<StructDeclaration>,
    ) {
        (self.area_sizes, self.pous, self.gvls, self.types)
    }
}
