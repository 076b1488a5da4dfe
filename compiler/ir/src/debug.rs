//! Debug information attached to compiled units.

use std::io::{Read, Write};
use std::path::PathBuf;

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::IrError;

/// A position in the source text. Lines and columns are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        SourcePosition { line, column }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Breakpoint {
    pub statement: u32,
    pub position: SourcePosition,
}

const ROW_SIZE: usize = 12;

/// Maps statement indices to source positions and back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BreakpointMap {
    rows: Vec<Breakpoint>,
}

impl BreakpointMap {
    pub fn new(mut rows: Vec<Breakpoint>) -> Self {
        rows.sort_by_key(|row| row.statement);
        BreakpointMap { rows }
    }

    pub fn rows(&self) -> &[Breakpoint] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The source position of the nearest row at or before the statement.
    pub fn position_of(&self, statement: u32) -> Option<SourcePosition> {
        let end = self.rows.partition_point(|row| row.statement <= statement);
        end.checked_sub(1).map(|index| self.rows[index].position)
    }

    /// The first statement whose row is on or after the line.
    pub fn statement_at(&self, line: u32) -> Option<u32> {
        self.rows
            .iter()
            .find(|row| row.position.line >= line)
            .map(|row| row.statement)
    }

    /// Encodes rows as little-endian `(statement, line, column)` triples
    /// and deflates them.
    pub fn compress(&self) -> Result<Vec<u8>, IrError> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        for row in &self.rows {
            encoder.write_all(&row.statement.to_le_bytes())?;
            encoder.write_all(&row.position.line.to_le_bytes())?;
            encoder.write_all(&row.position.column.to_le_bytes())?;
        }
        Ok(encoder.finish()?)
    }

    pub fn decompress(bytes: &[u8]) -> Result<Self, IrError> {
        let mut raw = Vec::new();
        DeflateDecoder::new(bytes).read_to_end(&mut raw)?;
        if raw.len() % ROW_SIZE != 0 {
            return Err(IrError::InvalidBreakpointMap(format!(
                "{} bytes is not a whole number of rows",
                raw.len()
            )));
        }

        let word = |chunk: &[u8], at: usize| {
            u32::from_le_bytes([chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]])
        };
        let rows = raw
            .chunks_exact(ROW_SIZE)
            .map(|chunk| Breakpoint {
                statement: word(chunk, 0),
                position: SourcePosition::new(word(chunk, 4), word(chunk, 8)),
            })
            .collect();
        Ok(BreakpointMap::new(rows))
    }
}

/// A variable visible to a debugger in a procedure frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableEntry {
    pub name: String,
    pub offset: u16,
    pub type_name: String,
    pub is_argument: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DebugData {
    pub breakpoints: BreakpointMap,
    pub variables: Vec<VariableEntry>,
    pub source_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(statement: u32, line: u32, column: u32) -> Breakpoint {
        Breakpoint {
            statement,
            position: SourcePosition::new(line, column),
        }
    }

    fn sample() -> BreakpointMap {
        BreakpointMap::new(vec![row(4, 12, 3), row(0, 10, 1), row(7, 15, 5)])
    }

    #[test]
    fn new_when_unsorted_then_sorted_by_statement() {
        let statements: Vec<u32> = sample().rows().iter().map(|r| r.statement).collect();

        assert_eq!(statements, vec![0, 4, 7]);
    }

    #[test]
    fn position_of_when_between_rows_then_previous_row() {
        let map = sample();

        assert_eq!(map.position_of(5), Some(SourcePosition::new(12, 3)));
        assert_eq!(map.position_of(4), Some(SourcePosition::new(12, 3)));
        assert_eq!(map.position_of(100), Some(SourcePosition::new(15, 5)));
    }

    #[test]
    fn position_of_when_before_first_row_then_none() {
        let map = BreakpointMap::new(vec![row(2, 1, 1)]);

        assert_eq!(map.position_of(1), None);
    }

    #[test]
    fn statement_at_when_line_has_no_row_then_next_row() {
        let map = sample();

        assert_eq!(map.statement_at(11), Some(4));
        assert_eq!(map.statement_at(10), Some(0));
        assert_eq!(map.statement_at(16), None);
    }

    #[test]
    fn decompress_when_compressed_then_same_rows() {
        let map = sample();

        let bytes = map.compress().unwrap();

        assert_eq!(BreakpointMap::decompress(&bytes).unwrap(), map);
    }

    #[test]
    fn decompress_when_partial_row_then_error() {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[1, 2, 3]).unwrap();
        let bytes = encoder.finish().unwrap();

        assert!(matches!(
            BreakpointMap::decompress(&bytes),
            Err(IrError::InvalidBreakpointMap(_))
        ));
    }
}
