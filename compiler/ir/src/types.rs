//! Runtime type descriptors.
//!
//! A [`RuntimeType`] describes the byte width of a value and how a debugger
//! renders and decomposes it. The same descriptors serve execution (sizes and
//! comparisons of built-in procedures) and inspection.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use crate::memory::{AccessViolation, MemoryLocation, MemoryReader, POINTER_SIZE};

/// The elementary types that the runtime loads and stores directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    SInt,
    Int,
    DInt,
    LInt,
    USInt,
    UInt,
    UDInt,
    ULInt,
    Real,
    LReal,
}

/// A primitive value loaded from memory, widened to 64 bits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 11] = [
        PrimitiveType::Bool,
        PrimitiveType::SInt,
        PrimitiveType::Int,
        PrimitiveType::DInt,
        PrimitiveType::LInt,
        PrimitiveType::USInt,
        PrimitiveType::UInt,
        PrimitiveType::UDInt,
        PrimitiveType::ULInt,
        PrimitiveType::Real,
        PrimitiveType::LReal,
    ];

    /// Returns the IEC 61131-3 name of the type.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "BOOL",
            PrimitiveType::SInt => "SINT",
            PrimitiveType::Int => "INT",
            PrimitiveType::DInt => "DINT",
            PrimitiveType::LInt => "LINT",
            PrimitiveType::USInt => "USINT",
            PrimitiveType::UInt => "UINT",
            PrimitiveType::UDInt => "UDINT",
            PrimitiveType::ULInt => "ULINT",
            PrimitiveType::Real => "REAL",
            PrimitiveType::LReal => "LREAL",
        }
    }

    /// Finds a primitive type by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        PrimitiveType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
    }

    pub fn size(self) -> usize {
        match self {
            PrimitiveType::Bool | PrimitiveType::SInt | PrimitiveType::USInt => 1,
            PrimitiveType::Int | PrimitiveType::UInt => 2,
            PrimitiveType::DInt | PrimitiveType::UDInt | PrimitiveType::Real => 4,
            PrimitiveType::LInt | PrimitiveType::ULInt | PrimitiveType::LReal => 8,
        }
    }

    pub fn is_numeric(self) -> bool {
        self != PrimitiveType::Bool
    }

    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            PrimitiveType::Bool | PrimitiveType::Real | PrimitiveType::LReal
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::SInt
                | PrimitiveType::Int
                | PrimitiveType::DInt
                | PrimitiveType::LInt
                | PrimitiveType::Real
                | PrimitiveType::LReal
        )
    }

    /// Loads a value of this type from memory.
    pub fn load(
        self,
        location: MemoryLocation,
        reader: &dyn MemoryReader,
    ) -> Result<Scalar, AccessViolation> {
        Ok(match self {
            PrimitiveType::Bool => Scalar::Bool(reader.load_bool(location)?),
            PrimitiveType::SInt => Scalar::Signed(reader.load_i8(location)? as i64),
            PrimitiveType::Int => Scalar::Signed(reader.load_i16(location)? as i64),
            PrimitiveType::DInt => Scalar::Signed(reader.load_i32(location)? as i64),
            PrimitiveType::LInt => Scalar::Signed(reader.load_i64(location)?),
            PrimitiveType::USInt => Scalar::Unsigned(reader.load_u8(location)? as u64),
            PrimitiveType::UInt => Scalar::Unsigned(reader.load_u16(location)? as u64),
            PrimitiveType::UDInt => Scalar::Unsigned(reader.load_u32(location)? as u64),
            PrimitiveType::ULInt => Scalar::Unsigned(reader.load_u64(location)?),
            PrimitiveType::Real => Scalar::Float(reader.load_f32(location)? as f64),
            PrimitiveType::LReal => Scalar::Float(reader.load_f64(location)?),
        })
    }

    /// Encodes a scalar as the bit pattern this type stores.
    ///
    /// Integers are truncated to the width of the type by the writer, so the
    /// returned pattern only needs to be correct in its low `size()` bytes.
    pub fn encode(self, value: Scalar) -> u64 {
        match (self, value) {
            (PrimitiveType::Real, Scalar::Float(v)) => (v as f32).to_bits() as u64,
            (PrimitiveType::LReal, Scalar::Float(v)) => v.to_bits(),
            (_, Scalar::Bool(v)) => v as u64,
            (_, Scalar::Signed(v)) => v as u64,
            (_, Scalar::Unsigned(v)) => v,
            (_, Scalar::Float(v)) => v as i64 as u64,
        }
    }

    /// Renders the value at `location` for a debugger.
    pub fn read_value(
        self,
        location: MemoryLocation,
        reader: &dyn MemoryReader,
    ) -> Result<String, AccessViolation> {
        Ok(match self {
            PrimitiveType::Real => reader.load_f32(location)?.to_string(),
            _ => self.load(location, reader)?.to_string(),
        })
    }

    /// Orders two values of this type. BOOL has no ordering and NaN is
    /// unordered.
    pub fn compare(
        self,
        a: MemoryLocation,
        b: MemoryLocation,
        reader: &dyn MemoryReader,
    ) -> Result<Option<Ordering>, AccessViolation> {
        if !self.is_numeric() {
            return Ok(None);
        }
        Ok(
            match (self.load(a, reader)?, self.load(b, reader)?) {
                (Scalar::Signed(x), Scalar::Signed(y)) => Some(x.cmp(&y)),
                (Scalar::Unsigned(x), Scalar::Unsigned(y)) => Some(x.cmp(&y)),
                (Scalar::Float(x), Scalar::Float(y)) => x.partial_cmp(&y),
                _ => None,
            },
        )
    }

    pub fn equals(
        self,
        a: MemoryLocation,
        b: MemoryLocation,
        reader: &dyn MemoryReader,
    ) -> Result<bool, AccessViolation> {
        Ok(self.load(a, reader)? == self.load(b, reader)?)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(true) => write!(f, "TRUE"),
            Scalar::Bool(false) => write!(f, "FALSE"),
            Scalar::Signed(v) => write!(f, "{v}"),
            Scalar::Unsigned(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
        }
    }
}

/// An inclusive index range of one array dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub lower: i32,
    pub upper: i32,
}

impl Dimension {
    pub fn new(lower: i32, upper: i32) -> Self {
        Dimension { lower, upper }
    }

    /// Number of elements in the dimension (0 when `upper < lower`).
    pub fn len(&self) -> usize {
        (self.upper as i64 - self.lower as i64 + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.lower, self.upper)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayType {
    dimensions: Vec<Dimension>,
    element: Rc<RuntimeType>,
}

impl ArrayType {
    pub fn new(dimensions: Vec<Dimension>, element: Rc<RuntimeType>) -> Self {
        ArrayType {
            dimensions,
            element,
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn element(&self) -> &RuntimeType {
        &self.element
    }

    /// Total number of elements across all dimensions. Saturates at
    /// `usize::MAX`.
    pub fn element_count(&self) -> usize {
        self.dimensions
            .iter()
            .map(Dimension::len)
            .fold(1, usize::saturating_mul)
    }
}

/// A named member of a structured type.
#[derive(Clone, Debug, PartialEq)]
pub struct StructProperty {
    pub name: String,
    pub offset: u16,
    pub ty: Rc<RuntimeType>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructuredType {
    name: String,
    size: usize,
    properties: Vec<StructProperty>,
}

impl StructuredType {
    pub fn new(name: impl Into<String>, size: usize, properties: Vec<StructProperty>) -> Self {
        StructuredType {
            name: name.into(),
            size,
            properties,
        }
    }

    pub fn properties(&self) -> &[StructProperty] {
        &self.properties
    }
}

/// Traversal of a composite value by linear child index.
///
/// This is the only way an inspector walks into arrays and structures.
pub trait IndexedChildren {
    /// The valid child indices.
    fn range(&self) -> Range<usize>;

    /// Location of the child, or `None` when it falls outside the offset space.
    fn child_location(&self, parent: MemoryLocation, index: usize) -> Option<MemoryLocation>;

    fn child_name(&self, index: usize) -> Option<String>;

    fn child_type(&self, index: usize) -> Option<&RuntimeType>;
}

impl IndexedChildren for ArrayType {
    fn range(&self) -> Range<usize> {
        0..self.element_count()
    }

    fn child_location(&self, parent: MemoryLocation, index: usize) -> Option<MemoryLocation> {
        let delta = index.checked_mul(self.element.size())?;
        parent.checked_add(i64::try_from(delta).ok()?)
    }

    /// The flat index is split with the first dimension varying fastest.
    fn child_name(&self, index: usize) -> Option<String> {
        if !self.range().contains(&index) {
            return None;
        }
        let mut rest = index;
        let mut parts = Vec::with_capacity(self.dimensions.len());
        for dimension in &self.dimensions {
            let len = dimension.len();
            parts.push((dimension.lower as i64 + (rest % len) as i64).to_string());
            rest /= len;
        }
        Some(format!("[{}]", parts.join(",")))
    }

    fn child_type(&self, index: usize) -> Option<&RuntimeType> {
        self.range().contains(&index).then_some(self.element.as_ref())
    }
}

impl IndexedChildren for StructuredType {
    fn range(&self) -> Range<usize> {
        0..self.properties.len()
    }

    fn child_location(&self, parent: MemoryLocation, index: usize) -> Option<MemoryLocation> {
        let property = self.properties.get(index)?;
        parent.checked_add(property.offset as i64)
    }

    fn child_name(&self, index: usize) -> Option<String> {
        self.properties.get(index).map(|p| p.name.clone())
    }

    fn child_type(&self, index: usize) -> Option<&RuntimeType> {
        self.properties.get(index).map(|p| p.ty.as_ref())
    }
}

/// Describes every value the runtime can touch.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeType {
    Primitive(PrimitiveType),
    Array(ArrayType),
    Struct(StructuredType),
    /// A packed area/offset pointer to a value of the target type.
    Pointer(Rc<RuntimeType>),
    /// A type name that could not be resolved. Has no size.
    Unknown(String),
}

impl RuntimeType {
    /// The canonical name, which is also the type's text form.
    pub fn name(&self) -> String {
        match self {
            RuntimeType::Primitive(ty) => ty.name().to_string(),
            RuntimeType::Array(array) => {
                let dimensions: Vec<String> =
                    array.dimensions.iter().map(|d| d.to_string()).collect();
                format!(
                    "ARRAY[{}] OF {}",
                    dimensions.join(","),
                    array.element.name()
                )
            }
            RuntimeType::Struct(structured) => structured.name.clone(),
            RuntimeType::Pointer(target) => format!("POINTER TO {}", target.name()),
            RuntimeType::Unknown(name) => name.clone(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            RuntimeType::Primitive(ty) => ty.size(),
            RuntimeType::Array(array) => array.element_count().saturating_mul(array.element.size()),
            RuntimeType::Struct(structured) => structured.size,
            RuntimeType::Pointer(_) => POINTER_SIZE,
            RuntimeType::Unknown(_) => 0,
        }
    }

    /// The boundary a variable of this type is placed on.
    pub fn alignment(&self) -> usize {
        match self {
            RuntimeType::Primitive(ty) => ty.size(),
            RuntimeType::Array(array) => array.element.alignment(),
            RuntimeType::Struct(structured) => structured
                .properties
                .iter()
                .map(|p| p.ty.alignment())
                .max()
                .unwrap_or(1),
            RuntimeType::Pointer(_) => POINTER_SIZE,
            RuntimeType::Unknown(_) => 1,
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            RuntimeType::Primitive(ty) => Some(*ty),
            _ => None,
        }
    }

    /// Renders the value at `location` for a debugger.
    ///
    /// Composite values render as their type name; their contents are
    /// reached through [`indexed_children`](RuntimeType::indexed_children).
    pub fn read_value(
        &self,
        location: MemoryLocation,
        reader: &dyn MemoryReader,
    ) -> Result<String, AccessViolation> {
        match self {
            RuntimeType::Primitive(ty) => ty.read_value(location, reader),
            RuntimeType::Pointer(_) => Ok(reader.load_pointer(location)?.to_string()),
            RuntimeType::Array(_) | RuntimeType::Struct(_) => Ok(self.name()),
            RuntimeType::Unknown(_) => Ok(String::from("?")),
        }
    }

    /// Orders two values, or `None` when the type has no ordering.
    pub fn compare(
        &self,
        a: MemoryLocation,
        b: MemoryLocation,
        reader: &dyn MemoryReader,
    ) -> Result<Option<Ordering>, AccessViolation> {
        match self {
            RuntimeType::Primitive(ty) => ty.compare(a, b, reader),
            _ => Ok(None),
        }
    }

    /// Tests two values for equality, or `None` when the type has no equality.
    pub fn equals(
        &self,
        a: MemoryLocation,
        b: MemoryLocation,
        reader: &dyn MemoryReader,
    ) -> Result<Option<bool>, AccessViolation> {
        match self {
            RuntimeType::Primitive(ty) => ty.equals(a, b, reader).map(Some),
            RuntimeType::Pointer(_) => {
                Ok(Some(reader.load_u32(a)? == reader.load_u32(b)?))
            }
            _ => Ok(None),
        }
    }

    pub fn indexed_children(&self) -> Option<&dyn IndexedChildren> {
        match self {
            RuntimeType::Array(array) => Some(array),
            RuntimeType::Struct(structured) => Some(structured),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<PrimitiveType> for RuntimeType {
    fn from(ty: PrimitiveType) -> Self {
        RuntimeType::Primitive(ty)
    }
}
