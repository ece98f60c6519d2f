//! Controller key decoding
//!
//! # Layout
//! ```text
//! Controller key (12 bytes):
//! 0x00: type u32          - 84 = position, 96 = orientation
//! 0x04: row_count u16
//! 0x06: time_index u16
//! 0x08: data_index u16    - first float in the controller data array
//! 0x0A: column_count u8
//! 0x0B: reserved u8
//! ```
//!
//! Only the first row of position and orientation keys is used; the rest of
//! the table belongs to animation playback.

use std::fmt;

use glam::{Quat, Vec3};
use tracing::trace;

use crate::error::MdbError;
use crate::model::Rotation;
use crate::{CONTROLLER_ORIENTATION, CONTROLLER_POSITION};

use super::helpers::{read_u8, read_u16, read_u32, seek_to, skip, MdbCursor};

/// Column count marking the variable-column layout
const VARIABLE_COLUMNS: u8 = u8::MAX;

/// What a controller key drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    Position,
    Orientation,
    /// A channel the decoder does not model
    Other(u32),
}

impl ControllerKind {
    pub fn from_type(tag: u32) -> Self {
        match tag {
            CONTROLLER_POSITION => Self::Position,
            CONTROLLER_ORIENTATION => Self::Orientation,
            other => Self::Other(other),
        }
    }

    /// Columns a key of this kind must carry
    pub fn expected_columns(self) -> Option<u8> {
        match self {
            Self::Position => Some(3),
            Self::Orientation => Some(4),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position => write!(f, "Position"),
            Self::Orientation => write!(f, "Orientation"),
            Self::Other(tag) => write!(f, "Type {}", tag),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ControllerKey {
    controller_type: u32,
    row_count: u16,
    time_index: u16,
    data_index: u16,
    column_count: u8,
}

fn read_key(cursor: &mut MdbCursor<'_>) -> Result<ControllerKey, MdbError> {
    let controller_type = read_u32(cursor)?;
    let row_count = read_u16(cursor)?;
    let time_index = read_u16(cursor)?;
    let data_index = read_u16(cursor)?;
    let column_count = read_u8(cursor)?;
    skip(cursor, 1)?;

    Ok(ControllerKey {
        controller_type,
        row_count,
        time_index,
        data_index,
        column_count,
    })
}

/// Transform produced by a node's controllers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ControllerTransform {
    pub position: Option<Vec3>,
    pub orientation: Option<Quat>,
    pub rotation: Option<Rotation>,
}

/// Decode `count` controller keys at `offset` against the controller data
///
/// The cursor is restored afterwards. Later keys of the same kind override
/// earlier ones.
pub(crate) fn apply_controllers(
    cursor: &mut MdbCursor<'_>,
    offset: u64,
    count: usize,
    data: &[f32],
) -> Result<ControllerTransform, MdbError> {
    let pos = seek_to(cursor, offset);
    let mut transform = ControllerTransform::default();

    for _ in 0..count {
        let key = read_key(cursor)?;
        if key.column_count == VARIABLE_COLUMNS {
            return Err(MdbError::VariableColumnController {
                controller_type: key.controller_type,
            });
        }

        let kind = ControllerKind::from_type(key.controller_type);
        let Some(expected) = kind.expected_columns() else {
            trace!(
                "Ignoring controller type {} ({} rows at time index {})",
                key.controller_type, key.row_count, key.time_index
            );
            continue;
        };

        if key.column_count != expected {
            return Err(MdbError::MalformedController {
                kind,
                columns: key.column_count,
            });
        }

        let values = key_values(&key, data)?;
        match kind {
            ControllerKind::Position => {
                transform.position = Some(Vec3::new(values[0], values[1], values[2]));
            }
            ControllerKind::Orientation => {
                let (x, y, z, w) = (values[0], values[1], values[2], values[3]);
                transform.orientation = Some(Quat::from_xyzw(x, y, z, w));
                transform.rotation = Some(Rotation::from_quat_components(x, y, z, w));
            }
            ControllerKind::Other(_) => {}
        }
    }

    seek_to(cursor, pos);
    Ok(transform)
}

/// First row of a key, bounds-checked against the data array
fn key_values<'d>(key: &ControllerKey, data: &'d [f32]) -> Result<&'d [f32], MdbError> {
    let start = usize::from(key.data_index);
    let end = start + usize::from(key.column_count);
    data.get(start..end)
        .ok_or(MdbError::ControllerDataOutOfRange {
            index: key.data_index,
            columns: key.column_count,
            len: data.len(),
        })
}
