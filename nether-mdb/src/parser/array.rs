//! Array descriptors
//!
//! Every variable-length array in the format is described by a 12-byte
//! `(start, used, allocated)` triple. Writers may over-allocate, so the used
//! count is authoritative and a mismatch is only worth a warning.

use tracing::warn;

use crate::error::MdbError;

use super::helpers::{read_f32, read_u32, seek_to, MdbCursor};

/// Decoded `(start, used, allocated)` triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrayDescriptor {
    /// Start offset, relative to the segment the array lives in
    pub start: u32,
    /// Number of elements in use
    pub used: u32,
    /// Number of elements allocated by the writer
    pub allocated: u32,
}

impl ArrayDescriptor {
    pub const SIZE: usize = 12;

    pub fn is_over_allocated(&self) -> bool {
        self.used != self.allocated
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Number of elements to read
    pub fn len(&self) -> usize {
        self.used as usize
    }

    /// Absolute offset of the first element within a segment
    pub fn absolute(&self, base: u32) -> u64 {
        u64::from(base) + u64::from(self.start)
    }
}

/// Read an array descriptor at the cursor
pub(crate) fn read_array(cursor: &mut MdbCursor<'_>) -> Result<ArrayDescriptor, MdbError> {
    let offset = cursor.position();
    let start = read_u32(cursor)?;
    let used = read_u32(cursor)?;
    let allocated = read_u32(cursor)?;

    let array = ArrayDescriptor {
        start,
        used,
        allocated,
    };
    if array.is_over_allocated() {
        warn!(
            "Array at 0x{:08X}: used count {} != allocated count {}",
            offset, used, allocated
        );
    }
    Ok(array)
}

/// Read `count` little-endian u32 values at `offset`, restoring the cursor
pub(crate) fn read_offset_array(
    cursor: &mut MdbCursor<'_>,
    offset: u64,
    count: usize,
) -> Result<Vec<u32>, MdbError> {
    let pos = seek_to(cursor, offset);
    let mut values = Vec::with_capacity(capacity_hint(cursor, count, 4));
    for _ in 0..count {
        values.push(read_u32(cursor)?);
    }
    seek_to(cursor, pos);
    Ok(values)
}

/// Read `count` little-endian f32 values at `offset`, restoring the cursor
pub(crate) fn read_float_array(
    cursor: &mut MdbCursor<'_>,
    offset: u64,
    count: usize,
) -> Result<Vec<f32>, MdbError> {
    let pos = seek_to(cursor, offset);
    let mut values = Vec::with_capacity(capacity_hint(cursor, count, 4));
    for _ in 0..count {
        values.push(read_f32(cursor)?);
    }
    seek_to(cursor, pos);
    Ok(values)
}

/// Cap a preallocation by what the remaining data could possibly hold
pub(crate) fn capacity_hint(cursor: &MdbCursor<'_>, count: usize, element_size: usize) -> usize {
    let remaining = (cursor.get_ref().len() as u64).saturating_sub(cursor.position());
    count.min((remaining / element_size as u64) as usize)
}
