//! File header parsing
//!
//! # Layout
//! ```text
//! 0x000: zero byte (binary model marker)
//! 0x004: version u16
//! 0x006: reserved (10 bytes)
//! 0x010: model_data_size u32
//! 0x014: reserved (4 bytes)
//! 0x018: v133:   raw_data_offset u32, raw_data_size u32
//!        others: texture_data_offset u32, texture_data_size u32
//! 0x020: reserved (8 bytes)
//! 0x028: name [64]
//! 0x068: root_node_offset u32 (model-data relative)
//! 0x06C: reserved (32 bytes)
//! 0x08C: type u8
//! 0x08D: reserved (3 + 48 bytes)
//! 0x0C0: first_lod f32, last_lod f32
//! 0x0C8: reserved (16 bytes)
//! 0x0D8: detail_map [64]
//! 0x118: reserved (4 bytes)
//! 0x11C: scale f32
//! 0x120: super_model [64]
//! 0x160: reserved (16 bytes)
//! ```

use tracing::debug;

use crate::error::MdbError;
use crate::{BINARY_COMPOSITE_MAGIC, LEGACY_VERSION, MODEL_DATA_BASE, NAME_LENGTH};

use super::helpers::{
    read_f32, read_fixed_string, read_string, read_u8, read_u16, read_u32, seek_to, skip,
    MdbCursor,
};

/// Offset of the version field
const VERSION_OFFSET: u64 = 4;

/// Longest container signature worth inspecting
const SIGNATURE_PROBE: usize = 64;

/// Decoded file header with resolved segment bases
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MdbHeader {
    pub version: u16,
    pub name: String,
    pub model_data_size: u32,
    /// Base of the model-data segment (node records, controllers)
    pub model_data_base: u32,
    /// Base of the raw-data segment (mesh arrays)
    pub raw_data_base: u32,
    pub raw_data_size: u32,
    /// Base of the texture-info segment
    pub texture_data_base: u32,
    pub texture_data_size: u32,
    /// Absolute offset of the root node record
    pub root_node_offset: u64,
    pub model_type: u8,
    pub first_lod: f32,
    pub last_lod: f32,
    pub detail_map: String,
    pub scale: f32,
    pub super_model: String,
}

impl MdbHeader {
    pub const SIZE: usize = 0x170;

    pub fn is_legacy(&self) -> bool {
        self.version == LEGACY_VERSION
    }
}

/// Check whether data looks like a binary MDB model
pub fn is_mdb(data: &[u8]) -> bool {
    data.first() == Some(&0)
}

/// Parse and validate the file header
pub(crate) fn read_header(cursor: &mut MdbCursor<'_>) -> Result<MdbHeader, MdbError> {
    seek_to(cursor, 0);
    if read_u8(cursor)? != 0 {
        return Err(identify_container(cursor.get_ref()));
    }

    seek_to(cursor, VERSION_OFFSET);
    let version = read_u16(cursor)?;
    skip(cursor, 10)?;
    let model_data_size = read_u32(cursor)?;
    skip(cursor, 4)?;

    let model_data_base = MODEL_DATA_BASE;
    let first = read_u32(cursor)?;
    let second = read_u32(cursor)?;

    let (raw_data_base, raw_data_size, texture_data_base, texture_data_size) =
        if version == LEGACY_VERSION {
            (first.wrapping_add(model_data_base), second, model_data_base, 0)
        } else {
            (model_data_base, 0, first.wrapping_add(model_data_base), second)
        };

    skip(cursor, 8)?;
    let name = read_fixed_string::<NAME_LENGTH>(cursor)?;
    let root_node_field = read_u32(cursor)?;
    skip(cursor, 32)?;
    let model_type = read_u8(cursor)?;
    skip(cursor, 3)?;
    skip(cursor, 48)?;
    let first_lod = read_f32(cursor)?;
    let last_lod = read_f32(cursor)?;
    skip(cursor, 16)?;
    let detail_map = read_fixed_string::<NAME_LENGTH>(cursor)?;
    skip(cursor, 4)?;
    let scale = read_f32(cursor)?;
    let super_model = read_fixed_string::<NAME_LENGTH>(cursor)?;
    skip(cursor, 16)?;

    let header = MdbHeader {
        version,
        name,
        model_data_size,
        model_data_base,
        raw_data_base,
        raw_data_size,
        texture_data_base,
        texture_data_size,
        root_node_offset: u64::from(root_node_field) + u64::from(model_data_base),
        model_type,
        first_lod,
        last_lod,
        detail_map,
        scale,
        super_model,
    };

    debug!(
        "MDB \"{}\" v{}: model data {} bytes, root 0x{:08X}, type {}, scale {}, detail \"{}\", super \"{}\"",
        header.name,
        header.version,
        header.model_data_size,
        header.root_node_offset,
        header.model_type,
        header.scale,
        header.detail_map,
        header.super_model
    );

    Ok(header)
}

/// Classify a file whose first byte is non-zero
fn identify_container(data: &[u8]) -> MdbError {
    let probe = &data[..data.len().min(SIGNATURE_PROBE)];
    if probe.starts_with(BINARY_COMPOSITE_MAGIC) {
        MdbError::UnsupportedContainer(read_string(probe))
    } else {
        MdbError::NotAModel
    }
}

/// Parse only the file header
pub fn parse_header(data: &[u8]) -> Result<MdbHeader, MdbError> {
    let mut cursor = std::io::Cursor::new(data);
    read_header(&mut cursor)
}
