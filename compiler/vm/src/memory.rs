use stplc_ir::{AccessViolation, MemoryLocation, MemoryReader};

use crate::error::Trap;

/// The byte storage of every area, sized once at load.
pub struct Memory {
    areas: Vec<Vec<u8>>,
}

impl Memory {
    /// Allocates zero-filled areas. Index 0 is the reserved area.
    pub fn new(area_sizes: &[usize]) -> Self {
        Memory {
            areas: area_sizes.iter().map(|&size| vec![0u8; size]).collect(),
        }
    }

    pub fn area_size(&self, area: u16) -> usize {
        self.areas.get(area as usize).map_or(0, Vec::len)
    }

    fn check(&self, location: MemoryLocation, size: usize) -> Result<(), Trap> {
        let fits = (location.offset as usize)
            .checked_add(size)
            .is_some_and(|end| end <= self.area_size(location.area));
        if fits && (location.area as usize) < self.areas.len() {
            Ok(())
        } else {
            Err(Trap::AccessViolation(AccessViolation { location, size }))
        }
    }

    fn bytes_mut(&mut self, location: MemoryLocation, size: usize) -> Result<&mut [u8], Trap> {
        self.check(location, size)?;
        let start = location.offset as usize;
        Ok(&mut self.areas[location.area as usize][start..start + size])
    }

    /// Writes the low `size` bytes of `bits` little-endian. Bytes past the
    /// eighth are zero.
    pub fn write_bits(
        &mut self,
        bits: u64,
        location: MemoryLocation,
        size: usize,
    ) -> Result<(), Trap> {
        let bytes = self.bytes_mut(location, size)?;
        let value = bits.to_le_bytes();
        let n = size.min(value.len());
        bytes[..n].copy_from_slice(&value[..n]);
        bytes[n..].fill(0);
        Ok(())
    }

    pub fn zero(&mut self, location: MemoryLocation, size: usize) -> Result<(), Trap> {
        self.bytes_mut(location, size)?.fill(0);
        Ok(())
    }

    /// Copies `size` bytes. The ranges may overlap.
    pub fn copy(
        &mut self,
        src: MemoryLocation,
        dst: MemoryLocation,
        size: usize,
    ) -> Result<(), Trap> {
        self.check(src, size)?;
        self.check(dst, size)?;
        let (from, to) = (src.offset as usize, dst.offset as usize);
        let (src_area, dst_area) = (src.area as usize, dst.area as usize);

        if src_area == dst_area {
            self.areas[src_area].copy_within(from..from + size, to);
        } else if src_area < dst_area {
            let (low, high) = self.areas.split_at_mut(dst_area);
            high[0][to..to + size].copy_from_slice(&low[src_area][from..from + size]);
        } else {
            let (low, high) = self.areas.split_at_mut(src_area);
            low[dst_area][to..to + size].copy_from_slice(&high[0][from..from + size]);
        }
        Ok(())
    }
}

impl MemoryReader for Memory {
    fn read(&self, location: MemoryLocation, buf: &mut [u8]) -> Result<(), AccessViolation> {
        self.areas.read(location, buf)
    }
}
