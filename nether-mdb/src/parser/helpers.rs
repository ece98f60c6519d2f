//! Helper functions for reading binary data

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::error::MdbError;

pub(crate) type MdbCursor<'a> = Cursor<&'a [u8]>;

fn read_bytes<const N: usize>(cursor: &mut MdbCursor<'_>) -> Result<[u8; N], MdbError> {
    let offset = cursor.position();
    let mut buf = [0u8; N];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| MdbError::UnexpectedEof { offset })?;
    Ok(buf)
}

/// Read a single byte
pub(crate) fn read_u8(cursor: &mut MdbCursor<'_>) -> Result<u8, MdbError> {
    Ok(read_bytes::<1>(cursor)?[0])
}

/// Read a 16-bit little-endian integer
pub(crate) fn read_u16(cursor: &mut MdbCursor<'_>) -> Result<u16, MdbError> {
    Ok(u16::from_le_bytes(read_bytes(cursor)?))
}

/// Read a 32-bit little-endian integer
pub(crate) fn read_u32(cursor: &mut MdbCursor<'_>) -> Result<u32, MdbError> {
    Ok(u32::from_le_bytes(read_bytes(cursor)?))
}

/// Read a 32-bit big-endian integer
pub(crate) fn read_u32_be(cursor: &mut MdbCursor<'_>) -> Result<u32, MdbError> {
    Ok(u32::from_be_bytes(read_bytes(cursor)?))
}

/// Read a 32-bit little-endian IEEE float
pub(crate) fn read_f32(cursor: &mut MdbCursor<'_>) -> Result<f32, MdbError> {
    Ok(f32::from_le_bytes(read_bytes(cursor)?))
}

/// Read three floats
pub(crate) fn read_vec3(cursor: &mut MdbCursor<'_>) -> Result<[f32; 3], MdbError> {
    Ok([read_f32(cursor)?, read_f32(cursor)?, read_f32(cursor)?])
}

/// Read a fixed-length, NUL-padded ASCII field
pub(crate) fn read_fixed_string<const N: usize>(
    cursor: &mut MdbCursor<'_>,
) -> Result<String, MdbError> {
    let bytes = read_bytes::<N>(cursor)?;
    Ok(read_string(&bytes))
}

/// Read a record terminated by `\n` or NUL, consuming the terminator
///
/// The end of the data also ends a record, but a record cannot start there.
pub(crate) fn read_line(cursor: &mut MdbCursor<'_>) -> Result<String, MdbError> {
    let offset = cursor.position();
    let data = *cursor.get_ref();
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let rest = &data[start..];
    if rest.is_empty() {
        return Err(MdbError::UnexpectedEof { offset });
    }
    let len = rest
        .iter()
        .position(|&b| b == b'\n' || b == 0)
        .unwrap_or(rest.len());

    let consumed = (len + 1).min(rest.len());
    cursor.set_position((start + consumed) as u64);

    Ok(String::from_utf8_lossy(&rest[..len])
        .trim_end_matches('\r')
        .to_string())
}

/// Convert a NUL-terminated or fixed-length byte field to a string
pub(crate) fn read_string(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).trim_end().to_string()
}

/// Skip `count` reserved bytes
pub(crate) fn skip(cursor: &mut MdbCursor<'_>, count: i64) -> Result<(), MdbError> {
    let offset = cursor.position();
    cursor
        .seek(SeekFrom::Current(count))
        .map_err(|_| MdbError::UnexpectedEof { offset })?;
    Ok(())
}

/// Seek to an absolute offset, returning the previous position
///
/// Seeking past the end is allowed; the next read fails instead.
pub(crate) fn seek_to(cursor: &mut MdbCursor<'_>, offset: u64) -> u64 {
    let previous = cursor.position();
    cursor.set_position(offset);
    previous
}
