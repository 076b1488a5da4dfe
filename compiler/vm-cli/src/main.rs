use std::path::PathBuf;

use clap::Parser;

mod cli;
mod logger;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "stplcvm", about = "Runs compiled structured text units")]
struct Args {
    /// Turn on verbose logging. Repeat to increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Sets the logging to write to a file.
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Selects the subcommand.
    #[command(subcommand)]
    action: Action,
}

#[derive(clap::Subcommand, Debug)]
enum Action {
    /// Loads every compiled unit in a directory and runs an entry point once.
    Run {
        /// Directory containing `.pou.xml`, `.gvl.xml` and `.types.xml` files.
        dir: PathBuf,

        /// Name of the procedure to run. The procedure must not have inputs.
        #[arg(long)]
        entry: String,

        /// Size of the call stack area in bytes.
        #[arg(long, default_value_t = 65535)]
        stack_size: usize,

        /// Write every global variable to the specified file after execution.
        #[arg(long)]
        dump_vars: Option<PathBuf>,
    },
    /// Prints the statements of a compiled procedure or global variable list.
    Disassemble {
        /// Path to a `.pou.xml` or `.gvl.xml` file.
        file: PathBuf,
    },
    /// Prints the version number of the virtual machine.
    Version,
}

pub fn main() -> Result<(), String> {
    let args = Args::parse();

    logger::configure(args.verbose, args.log_file)?;

    match args.action {
        Action::Run {
            dir,
            entry,
            stack_size,
            dump_vars,
        } => cli::run(&dir, &entry, stack_size, dump_vars.as_deref()),
        Action::Disassemble { file } => cli::disassemble(&file),
        Action::Version => {
            println!("stplcvm version {VERSION}");
            Ok(())
        }
    }
}
