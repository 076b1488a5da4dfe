//! Implements the command line behavior.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::info;
use stplc_ir::envelope::{read_file, CompiledFile};
use stplc_ir::{render_statements, MemoryLocation, MemoryReader, RuntimeType};
use stplc_vm::{GlobalSymbol, ProgramImage, Vm};

/// Loads every compiled unit in `dir` and runs `entry` once.
///
/// When `dump_vars` is `Some(path)`, writes every global variable after the
/// run, including when the run ends with a trap.
pub fn run(dir: &Path, entry: &str, stack_size: usize, dump_vars: Option<&Path>) -> Result<(), String> {
    let image = ProgramImage::from_directory(dir, stack_size)
        .map_err(|e| format!("Unable to read program in {}: {e}", dir.display()))?;

    let mut running = Vm::new()
        .load(image)
        .map_err(|e| format!("Unable to load program: {e}"))?
        .start()
        .map_err(|ctx| format!("VM trap during initialization: {ctx}"))?;

    let entry_point = running
        .entry_point(entry)
        .map_err(|e| format!("Unable to run {entry}: {e}"))?;

    if let Err(ctx) = running.run(&entry_point) {
        let faulted = running.fault(ctx);
        let err_msg = format!("VM trap: {}", faulted.context());
        if let Some(dump_path) = dump_vars {
            dump_variables(faulted.globals(), faulted.memory(), dump_path)?;
        }
        return Err(err_msg);
    }

    let stopped = running.stop();
    info!("Completed {} run of {entry}", stopped.run_count());

    if let Some(dump_path) = dump_vars {
        dump_variables(stopped.globals(), stopped.memory(), dump_path)?;
    }

    Ok(())
}

/// Prints the statements of a compiled procedure or of the initializer of
/// a global variable list.
pub fn disassemble(path: &Path) -> Result<(), String> {
    let file = read_file(path).map_err(|e| format!("Unable to read {}: {e}", path.display()))?;

    match file {
        CompiledFile::Pou(pou) => {
            println!("// {} (stack usage {})", pou.id, pou.stack_usage);
            println!("{}", render_statements(&pou.statements));
        }
        CompiledFile::Gvl(gvl) => {
            println!("// {} (area {}, size {})", gvl.name, gvl.area, gvl.size);
            if let Some(initializer) = gvl.initializer {
                println!("{}", render_statements(&initializer.statements));
            }
        }
        CompiledFile::Types(_) => {
            return Err(format!(
                "{} is a type table and has no statements",
                path.display()
            ));
        }
    }
    Ok(())
}

fn dump_variables(
    globals: &[GlobalSymbol],
    memory: &dyn MemoryReader,
    dump_path: &Path,
) -> Result<(), String> {
    let mut out = File::create(dump_path)
        .map_err(|e| format!("Unable to create dump file {}: {e}", dump_path.display()))?;
    for symbol in globals {
        let path = format!("{}.{}", symbol.list, symbol.name);
        dump_value(&mut out, &path, &symbol.ty, symbol.location, memory)?;
    }
    Ok(())
}

/// Writes one line per primitive value, expanding arrays and structures
/// through their children.
fn dump_value(
    out: &mut File,
    path: &str,
    ty: &RuntimeType,
    location: MemoryLocation,
    memory: &dyn MemoryReader,
) -> Result<(), String> {
    let Some(children) = ty.indexed_children() else {
        let value = ty
            .read_value(location, memory)
            .map_err(|e| format!("Unable to read {path}: {e}"))?;
        return writeln!(out, "{path}: {value}")
            .map_err(|e| format!("Unable to write dump file: {e}"));
    };

    for index in children.range() {
        let (Some(name), Some(child_ty), Some(child_location)) = (
            children.child_name(index),
            children.child_type(index),
            children.child_location(location, index),
        ) else {
            return Err(format!("Unable to locate element {index} of {path}"));
        };
        let child_path = if name.starts_with('[') {
            format!("{path}{name}")
        } else {
            format!("{path}.{name}")
        };
        dump_value(out, &child_path, child_ty, child_location, memory)?;
    }
    Ok(())
}
