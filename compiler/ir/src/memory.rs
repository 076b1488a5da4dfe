//! Memory addressing for compiled units.
//!
//! Every value lives in a numbered area at a byte offset. Procedure bodies
//! address their own frame with [`LocalVarOffset`], which the runtime resolves
//! against the base of the active frame.

use std::fmt;

/// Area 0 is never allocated.
pub const RESERVED_AREA: u16 = 0;

/// The area that holds the call stack.
pub const STACK_AREA: u16 = 1;

/// The area assigned to the first global variable list.
pub const FIRST_GLOBAL_AREA: u16 = 2;

/// Size in bytes of a packed pointer value.
pub const POINTER_SIZE: usize = 4;

/// The absolute location of a value: an area and a byte offset in that area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MemoryLocation {
    pub area: u16,
    pub offset: u16,
}

impl MemoryLocation {
    pub fn new(area: u16, offset: u16) -> Self {
        MemoryLocation { area, offset }
    }

    /// Packs the location into a pointer value `(area << 16) | offset`.
    pub fn pack(self) -> u32 {
        ((self.area as u32) << 16) | self.offset as u32
    }

    /// Unpacks a pointer value produced by [`pack`](MemoryLocation::pack).
    pub fn unpack(bits: u32) -> Self {
        MemoryLocation {
            area: (bits >> 16) as u16,
            offset: bits as u16,
        }
    }

    /// Moves the location by `delta` bytes within the same area.
    ///
    /// Returns `None` when the result leaves the 16-bit offset space.
    pub fn checked_add(self, delta: i64) -> Option<Self> {
        let offset = u16::try_from(self.offset as i64 + delta).ok()?;
        Some(MemoryLocation {
            area: self.area,
            offset,
        })
    }
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.area, self.offset)
    }
}

/// A byte offset relative to the base of the current call frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalVarOffset(pub u16);

impl LocalVarOffset {
    pub fn new(offset: u16) -> Self {
        LocalVarOffset(offset)
    }
}

impl fmt::Display for LocalVarOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// An access that does not fit inside the bounds of an area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessViolation {
    pub location: MemoryLocation,
    pub size: usize,
}

impl fmt::Display for AccessViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "access of {} bytes at {} is outside the area",
            self.size, self.location
        )
    }
}

impl std::error::Error for AccessViolation {}

/// Read access to area-addressed memory.
///
/// This is the only view of memory that type descriptors need, so that an
/// inspector can render values from a memory snapshot without an engine.
/// All multi-byte values are little-endian.
pub trait MemoryReader {
    /// Fills `buf` with the bytes starting at `location`.
    fn read(&self, location: MemoryLocation, buf: &mut [u8]) -> Result<(), AccessViolation>;

    /// Loads a BOOL. Any non-zero byte is TRUE.
    fn load_bool(&self, location: MemoryLocation) -> Result<bool, AccessViolation> {
        Ok(self.load_u8(location)? != 0)
    }

    fn load_u8(&self, location: MemoryLocation) -> Result<u8, AccessViolation> {
        Ok(read_array::<1, _>(self, location)?[0])
    }

    fn load_i8(&self, location: MemoryLocation) -> Result<i8, AccessViolation> {
        Ok(i8::from_le_bytes(read_array(self, location)?))
    }

    fn load_i16(&self, location: MemoryLocation) -> Result<i16, AccessViolation> {
        Ok(i16::from_le_bytes(read_array(self, location)?))
    }

    fn load_u16(&self, location: MemoryLocation) -> Result<u16, AccessViolation> {
        Ok(u16::from_le_bytes(read_array(self, location)?))
    }

    fn load_i32(&self, location: MemoryLocation) -> Result<i32, AccessViolation> {
        Ok(i32::from_le_bytes(read_array(self, location)?))
    }

    fn load_u32(&self, location: MemoryLocation) -> Result<u32, AccessViolation> {
        Ok(u32::from_le_bytes(read_array(self, location)?))
    }

    fn load_i64(&self, location: MemoryLocation) -> Result<i64, AccessViolation> {
        Ok(i64::from_le_bytes(read_array(self, location)?))
    }

    fn load_u64(&self, location: MemoryLocation) -> Result<u64, AccessViolation> {
        Ok(u64::from_le_bytes(read_array(self, location)?))
    }

    fn load_f32(&self, location: MemoryLocation) -> Result<f32, AccessViolation> {
        Ok(f32::from_le_bytes(read_array(self, location)?))
    }

    fn load_f64(&self, location: MemoryLocation) -> Result<f64, AccessViolation> {
        Ok(f64::from_le_bytes(read_array(self, location)?))
    }

    /// Loads a packed pointer value.
    fn load_pointer(&self, location: MemoryLocation) -> Result<MemoryLocation, AccessViolation> {
        Ok(MemoryLocation::unpack(self.load_u32(location)?))
    }
}

fn read_array<const N: usize, R: MemoryReader + ?Sized>(
    reader: &R,
    location: MemoryLocation,
) -> Result<[u8; N], AccessViolation> {
    let mut buf = [0u8; N];
    reader.read(location, &mut buf)?;
    Ok(buf)
}

/// A set of areas indexed by area id.
impl MemoryReader for Vec<Vec<u8>> {
    fn read(&self, location: MemoryLocation, buf: &mut [u8]) -> Result<(), AccessViolation> {
        let violation = AccessViolation {
            location,
            size: buf.len(),
        };
        let start = location.offset as usize;
        let bytes = self
            .get(location.area as usize)
            .and_then(|area| area.get(start..start + buf.len()))
            .ok_or(violation)?;
        buf.copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_when_area_and_offset_then_area_in_high_half() {
        let location = MemoryLocation::new(2, 0x10);

        assert_eq!(location.pack(), 0x0002_0010);
        assert_eq!(MemoryLocation::unpack(0x0002_0010), location);
    }

    #[test]
    fn checked_add_when_leaves_offset_space_then_none() {
        let location = MemoryLocation::new(1, 10);

        assert_eq!(location.checked_add(-11), None);
        assert_eq!(location.checked_add(65526), None);
        assert_eq!(location.checked_add(-10), Some(MemoryLocation::new(1, 0)));
    }

    #[test]
    fn read_when_areas_then_loads_little_endian() {
        let areas = vec![vec![], vec![0x39, 0x30, 0x01, 0, 0, 0]];

        assert_eq!(areas.load_i16(MemoryLocation::new(1, 0)).unwrap(), 12345);
        assert!(areas.load_bool(MemoryLocation::new(1, 2)).unwrap());
        assert!(!areas.load_bool(MemoryLocation::new(1, 3)).unwrap());
    }

    #[test]
    fn read_when_past_end_of_area_then_access_violation() {
        let areas = vec![vec![], vec![0u8; 4]];

        let result = areas.load_i32(MemoryLocation::new(1, 2));

        assert_eq!(
            result,
            Err(AccessViolation {
                location: MemoryLocation::new(1, 2),
                size: 4
            })
        );
    }

    #[test]
    fn read_when_unknown_area_then_access_violation() {
        let areas = vec![vec![], vec![0u8; 4]];

        assert!(areas.load_u8(MemoryLocation::new(7, 0)).is_err());
    }
}
