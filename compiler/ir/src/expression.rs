//! Expressions produce a bit pattern of a given width.
//!
//! An expression has no behavior of its own beyond depositing `size` bytes
//! at a destination; the runtime evaluates it by matching on the variant.

use std::fmt;
use std::str::FromStr;

use crate::error::IrError;
use crate::memory::{LocalVarOffset, MemoryLocation};
use crate::text;

/// Where an address computation starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressBase {
    /// The address of a frame slot.
    Local(LocalVarOffset),
    /// The pointer stored in a frame slot.
    Deref(LocalVarOffset),
}

/// One step of an address computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressElement {
    /// Adds a fixed number of bytes.
    Offset(u16),
    /// Adds `index × scale` where `index` is the DINT held in a frame slot.
    UncheckedIndex { index: LocalVarOffset, scale: u16 },
    /// Adds `(index − lower) × scale` after checking `lower <= index <= upper`.
    CheckedIndex {
        index: LocalVarOffset,
        scale: u16,
        lower: i32,
        upper: i32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    /// A raw 64-bit pattern; writes its low `size` bytes.
    Literal { bits: u64 },
    /// Copies bytes from a frame slot.
    LoadLocal { offset: LocalVarOffset },
    /// Copies bytes from the location the pointer in a frame slot refers to.
    Deref { offset: LocalVarOffset },
    /// Computes a location and writes it as a packed pointer.
    Address {
        base: AddressBase,
        elements: Vec<AddressElement>,
    },
    /// Writes nothing.
    Null,
}

impl Expression {
    pub fn literal_bool(value: bool) -> Self {
        Expression::Literal { bits: value as u64 }
    }

    pub fn literal_i8(value: i8) -> Self {
        Expression::Literal {
            bits: value as u8 as u64,
        }
    }

    pub fn literal_i16(value: i16) -> Self {
        Expression::Literal {
            bits: value as u16 as u64,
        }
    }

    pub fn literal_i32(value: i32) -> Self {
        Expression::Literal {
            bits: value as u32 as u64,
        }
    }

    pub fn literal_i64(value: i64) -> Self {
        Expression::Literal { bits: value as u64 }
    }

    pub fn literal_u8(value: u8) -> Self {
        Expression::Literal { bits: value as u64 }
    }

    pub fn literal_u16(value: u16) -> Self {
        Expression::Literal { bits: value as u64 }
    }

    pub fn literal_u32(value: u32) -> Self {
        Expression::Literal { bits: value as u64 }
    }

    pub fn literal_u64(value: u64) -> Self {
        Expression::Literal { bits: value }
    }

    /// Encodes the IEEE-754 bits of the value, not a numeric conversion.
    pub fn literal_f32(value: f32) -> Self {
        Expression::Literal {
            bits: value.to_bits() as u64,
        }
    }

    pub fn literal_f64(value: f64) -> Self {
        Expression::Literal {
            bits: value.to_bits(),
        }
    }

    pub fn literal_pointer(location: MemoryLocation) -> Self {
        Expression::Literal {
            bits: location.pack() as u64,
        }
    }

    /// Frame slots this expression reads, with the number of bytes read
    /// from each when that is known without executing.
    pub fn frame_reads(&self, size: usize) -> Vec<(LocalVarOffset, usize)> {
        match self {
            Expression::Literal { .. } | Expression::Null => vec![],
            Expression::LoadLocal { offset } => vec![(*offset, size)],
            Expression::Deref { offset } => vec![(*offset, crate::memory::POINTER_SIZE)],
            Expression::Address { base, elements } => {
                let mut reads = match base {
                    AddressBase::Local(offset) => vec![(*offset, 0)],
                    AddressBase::Deref(offset) => vec![(*offset, crate::memory::POINTER_SIZE)],
                };
                reads.extend(elements.iter().filter_map(|element| match element {
                    AddressElement::Offset(_) => None,
                    AddressElement::UncheckedIndex { index, .. }
                    | AddressElement::CheckedIndex { index, .. } => Some((*index, 4)),
                }));
                reads
            }
        }
    }
}

impl fmt::Display for AddressBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressBase::Local(offset) => write!(f, "{offset}"),
            AddressBase::Deref(offset) => write!(f, "*{offset}"),
        }
    }
}

impl fmt::Display for AddressElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressElement::Offset(bytes) => write!(f, "+{bytes}"),
            AddressElement::UncheckedIndex { index, scale } => write!(f, "[{index},{scale}]"),
            AddressElement::CheckedIndex {
                index,
                scale,
                lower,
                upper,
            } => write!(f, "[{index},{scale},{lower},{upper}]"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal { bits } => write!(f, "0x{bits:x}"),
            Expression::LoadLocal { offset } => write!(f, "{offset}"),
            Expression::Deref { offset } => write!(f, "*{offset}"),
            Expression::Address { base, elements } => {
                write!(f, "&{base}")?;
                for element in elements {
                    write!(f, "{element}")?;
                }
                Ok(())
            }
            Expression::Null => write!(f, "null"),
        }
    }
}

impl FromStr for Expression {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        text::parse_expression(s)
    }
}
