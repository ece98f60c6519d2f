//! Mesh sub-record decoding
//!
//! # Layout
//! ```text
//! Mesh record (768 bytes, follows the node flags):
//! 0x000: reserved (8 bytes)
//! 0x008: mesh_arrays_offset u32 (raw-data relative)
//! 0x00C: reserved (76 bytes)
//! 0x058: ambient [f32; 3], diffuse [f32; 3], specular [f32; 3], shininess f32
//! 0x080: reserved (20 bytes)
//! 0x094: texture slots [64] x 4
//! 0x194: reserved (20 bytes)
//! 0x1A8: fourcc u32 BE
//! 0x1AC: reserved (8 bytes)
//! 0x1B4: corona_center_x f32
//! 0x1B8: reserved (8 bytes)
//! 0x1C0: enlarge_start_distance f32
//! 0x1C4: reserved (308 bytes)
//! 0x2F8: texture_info_offset u32
//! 0x2FC: reserved (4 bytes)
//!
//! Mesh arrays (at raw_data_base + mesh_arrays_offset):
//! 0x00: reserved (4 bytes)
//! 0x04: descriptors x 10: vertices, normals, tangents, binormals,
//!       texcoords 0-3, unknown, faces
//! 0x7C: texture_data_base u32 (version 133 only)
//!
//! Face record: reserved (20 bytes), [v133: reserved (12 bytes)],
//!              indices [u32; 3], [v133: reserved (4 bytes)]
//!
//! Texture info: line_count u32, reserved u32, then line_count records
//!               terminated by `\n` or NUL plus one pad byte
//! ```

use glam::Vec3;

use crate::error::MdbError;
use crate::model::{Face, Material, MeshInfo};
use crate::{NAME_LENGTH, NULL_TEXTURE, TEXTURE_SLOTS};

use super::array::{capacity_hint, read_array, ArrayDescriptor};
use super::helpers::{
    read_f32, read_fixed_string, read_line, read_u32, read_u32_be, read_vec3, seek_to, skip,
    MdbCursor,
};

/// Texture info keys naming the primary texture
const TEXTURE_KEYS: [&str; 2] = ["texture texture0 ", "texture tex "];

/// Segment state a mesh needs from the decode context
pub(crate) struct MeshSegments<'s> {
    pub raw_data_base: u32,
    /// Texture-data base; legacy meshes overwrite it for the rest of the decode
    pub texture_data_base: &'s mut u32,
    pub legacy: bool,
}

/// Everything a mesh record contributes to its node
#[derive(Debug, Clone, Default)]
pub(crate) struct MeshData {
    pub material: Material,
    pub info: MeshInfo,
    pub faces: Vec<Face>,
    pub render: bool,
    /// Texture name to resolve, if the texture info names one
    pub texture: Option<String>,
}

struct MeshArrays {
    vertices: ArrayDescriptor,
    normals: ArrayDescriptor,
    tangents: ArrayDescriptor,
    binormals: ArrayDescriptor,
    texcoords: [ArrayDescriptor; 4],
    faces: ArrayDescriptor,
}

/// Decode the mesh record at the cursor
///
/// Leaves the cursor directly after the mesh record.
pub(crate) fn read_mesh(
    cursor: &mut MdbCursor<'_>,
    segments: MeshSegments<'_>,
) -> Result<MeshData, MdbError> {
    skip(cursor, 8)?;
    let mesh_arrays_offset = read_u32(cursor)?;
    skip(cursor, 76)?;

    let material = Material {
        ambient: Vec3::from_array(read_vec3(cursor)?),
        diffuse: Vec3::from_array(read_vec3(cursor)?),
        specular: Vec3::from_array(read_vec3(cursor)?),
        shininess: read_f32(cursor)?,
    };

    skip(cursor, 20)?;
    let mut texture_slots: [String; TEXTURE_SLOTS] = Default::default();
    for slot in texture_slots.iter_mut() {
        *slot = read_fixed_string::<NAME_LENGTH>(cursor)?;
    }

    skip(cursor, 20)?;
    let fourcc = read_u32_be(cursor)?;
    skip(cursor, 8)?;
    let corona_center_x = read_f32(cursor)?;
    skip(cursor, 8)?;
    let enlarge_start_distance = read_f32(cursor)?;
    skip(cursor, 308)?;
    let texture_info_offset = read_u32(cursor)?;
    skip(cursor, 4)?;

    let return_point = seek_to(
        cursor,
        u64::from(segments.raw_data_base) + u64::from(mesh_arrays_offset),
    );

    skip(cursor, 4)?;
    let arrays = MeshArrays {
        vertices: read_array(cursor)?,
        normals: read_array(cursor)?,
        tangents: read_array(cursor)?,
        binormals: read_array(cursor)?,
        texcoords: [
            read_array(cursor)?,
            read_array(cursor)?,
            read_array(cursor)?,
            read_array(cursor)?,
        ],
        faces: {
            let _unknown = read_array(cursor)?;
            read_array(cursor)?
        },
    };

    if segments.legacy {
        *segments.texture_data_base = read_u32(cursor)?;
    }

    let raw_base = segments.raw_data_base;
    let vertices = read_vertices(cursor, arrays.vertices.absolute(raw_base), arrays.vertices.len())?;
    let texcoords = read_texcoords(
        cursor,
        arrays.texcoords[0].absolute(raw_base),
        arrays.texcoords[0].len(),
    )?;
    let indices = read_face_indices(
        cursor,
        arrays.faces.absolute(raw_base),
        arrays.faces.len(),
        segments.legacy,
    )?;
    let faces = build_faces(&indices, &vertices, &texcoords)?;

    let primary = &texture_slots[0];
    let (render, texture) = if primary.is_empty() || primary == NULL_TEXTURE {
        (false, None)
    } else {
        let offset = if segments.legacy {
            u64::from(raw_base) + u64::from(*segments.texture_data_base)
        } else {
            u64::from(*segments.texture_data_base) + u64::from(texture_info_offset)
        };
        (true, read_texture_info(cursor, offset)?)
    };

    seek_to(cursor, return_point);

    let info = MeshInfo {
        texture_slots,
        fourcc,
        corona_center_x,
        enlarge_start_distance,
        vertex_count: arrays.vertices.used,
        normal_count: arrays.normals.used,
        tangent_count: arrays.tangents.used,
        binormal_count: arrays.binormals.used,
        texcoord_counts: arrays.texcoords.map(|t| t.used),
        face_count: arrays.faces.used,
    };

    Ok(MeshData {
        material,
        info,
        faces,
        render,
        texture,
    })
}

fn read_vertices(
    cursor: &mut MdbCursor<'_>,
    offset: u64,
    count: usize,
) -> Result<Vec<[f32; 3]>, MdbError> {
    seek_to(cursor, offset);
    let mut vertices = Vec::with_capacity(capacity_hint(cursor, count, 12));
    for _ in 0..count {
        vertices.push(read_vec3(cursor)?);
    }
    Ok(vertices)
}

/// Texcoords are stored as (u, v) and widened to (u, v, 0)
fn read_texcoords(
    cursor: &mut MdbCursor<'_>,
    offset: u64,
    count: usize,
) -> Result<Vec<[f32; 3]>, MdbError> {
    seek_to(cursor, offset);
    let mut texcoords = Vec::with_capacity(capacity_hint(cursor, count, 8));
    for _ in 0..count {
        let u = read_f32(cursor)?;
        let v = read_f32(cursor)?;
        texcoords.push([u, v, 0.0]);
    }
    Ok(texcoords)
}

fn read_face_indices(
    cursor: &mut MdbCursor<'_>,
    offset: u64,
    count: usize,
    legacy: bool,
) -> Result<Vec<[u32; 3]>, MdbError> {
    let record_size = if legacy { 48 } else { 32 };
    seek_to(cursor, offset);
    let mut indices = Vec::with_capacity(capacity_hint(cursor, count, record_size));
    for _ in 0..count {
        skip(cursor, 20)?;
        if legacy {
            skip(cursor, 12)?;
        }

        indices.push([read_u32(cursor)?, read_u32(cursor)?, read_u32(cursor)?]);

        if legacy {
            skip(cursor, 4)?;
        }
    }
    Ok(indices)
}

/// Bake indexed faces into flat per-face vertex data
fn build_faces(
    indices: &[[u32; 3]],
    vertices: &[[f32; 3]],
    texcoords: &[[f32; 3]],
) -> Result<Vec<Face>, MdbError> {
    indices
        .iter()
        .enumerate()
        .map(|(face, corners)| {
            let mut out = Face::default();
            for (corner, &index) in corners.iter().enumerate() {
                let i = index as usize;
                out.positions[corner] = *vertices.get(i).ok_or(MdbError::FaceIndexOutOfRange {
                    face,
                    index,
                    count: vertices.len(),
                })?;

                // Untextured meshes have no texcoord channel at all
                if !texcoords.is_empty() {
                    out.tex_coords[corner] =
                        *texcoords.get(i).ok_or(MdbError::FaceIndexOutOfRange {
                            face,
                            index,
                            count: texcoords.len(),
                        })?;
                }
            }
            Ok(out)
        })
        .collect()
}

/// Scan the texture info text for the primary texture name
///
/// Later matching lines override earlier ones.
fn read_texture_info(cursor: &mut MdbCursor<'_>, offset: u64) -> Result<Option<String>, MdbError> {
    seek_to(cursor, offset);
    let line_count = read_u32(cursor)?;
    let _reserved = read_u32(cursor)?;

    let mut texture = None;
    for _ in 0..line_count {
        let line = read_line(cursor)?;
        skip(cursor, 1)?;

        if let Some(name) = texture_from_line(line.trim()) {
            texture = Some(name.to_string());
        }
    }

    Ok(texture.filter(|name| !name.is_empty() && name != NULL_TEXTURE))
}

fn texture_from_line(line: &str) -> Option<&str> {
    TEXTURE_KEYS.iter().find_map(|key| line.strip_prefix(key))
}
