//! Routes `log` records from the library crates to standard error or a file.
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use env_logger::{Builder, Target};
use log::{trace, LevelFilter};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// The level for a count of `-v` flags. Errors are always shown.
fn level(verbosity: u8) -> Result<LevelFilter, String> {
    const LEVELS: [LevelFilter; 5] = [
        LevelFilter::Error,
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ];
    LEVELS
        .get(verbosity as usize)
        .copied()
        .ok_or_else(|| format!("At most {} -v flags are allowed", LEVELS.len() - 1))
}

fn target(log_file: Option<PathBuf>) -> Result<Target, String> {
    let Some(path) = log_file else {
        return Ok(Target::Stderr);
    };
    let file = File::create(&path)
        .map_err(|e| format!("Unable to create log file {}: {e}", path.display()))?;
    Ok(Target::Pipe(Box::new(file)))
}

/// Installs the global logger.
///
/// `RUST_LOG` directives are applied on top of the level chosen by
/// `verbosity`, so a single module can be traced without raising every
/// other module.
pub fn configure(verbosity: u8, log_file: Option<PathBuf>) -> Result<(), String> {
    let filter = level(verbosity)?;

    Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .target(target(log_file)?)
        .format(|buf, record| {
            let now = OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default();
            writeln!(
                buf,
                "{now} {:<5} {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .map_err(|e| format!("Unable to install logger: {e}"))?;

    trace!("Logging at {filter}");
    Ok(())
}
