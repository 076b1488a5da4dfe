use std::fmt;

/// Errors produced while reading, writing or laying out compiled units.
#[derive(Debug)]
pub enum IrError {
    /// A statement or expression does not match the text grammar.
    Syntax { line: usize, message: String },
    /// The XML envelope is malformed or does not match the schema.
    Xml(String),
    Io(std::io::Error),
    /// An embedded binary field is not valid base64.
    Encoding(String),
    /// Decompressed breakpoint data is not a sequence of rows.
    InvalidBreakpointMap(String),
    /// A variable does not fit in the 16-bit offset space.
    LayoutOverflow { name: String },
    /// A file name that has none of the known compiled-unit extensions.
    UnrecognizedFile(String),
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrError::Syntax { line, message } => write!(f, "syntax error on line {line}: {message}"),
            IrError::Xml(msg) => write!(f, "XML error: {msg}"),
            IrError::Io(e) => write!(f, "I/O error: {e}"),
            IrError::Encoding(msg) => write!(f, "encoding error: {msg}"),
            IrError::InvalidBreakpointMap(msg) => write!(f, "invalid breakpoint map: {msg}"),
            IrError::LayoutOverflow { name } => {
                write!(f, "variable {name} does not fit in the 16-bit offset space")
            }
            IrError::UnrecognizedFile(name) => {
                write!(f, "{name} is not a .pou.xml, .gvl.xml or .types.xml file")
            }
        }
    }
}

impl std::error::Error for IrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IrError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IrError {
    fn from(e: std::io::Error) -> Self {
        IrError::Io(e)
    }
}
