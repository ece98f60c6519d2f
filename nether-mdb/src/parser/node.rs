//! Node hierarchy walking
//!
//! # Layout
//! ```text
//! Node record (relative to the node offset):
//! 0x00: reserved (24 bytes)
//! 0x18: inherit_color u32
//! 0x1C: node_number u32
//! 0x20: name [64]
//! 0x60: reserved parent pointer (8 bytes)
//! 0x68: children descriptor        - model-data relative
//! 0x74: controller key descriptor  - model-data relative
//! 0x80: controller data descriptor - model-data relative
//! 0x8C: reserved (20 bytes)
//! 0xA0: flags u32
//! 0xA4: mesh record (when the mesh flag is set)
//! ```

use std::fmt;

use glam::Vec3;
use tracing::{debug, trace};

use crate::error::MdbError;
use crate::model::{Node, NodeId};
use crate::options::DecodeOptions;
use crate::NAME_LENGTH;

use super::array::{read_array, read_float_array, read_offset_array};
use super::controller::apply_controllers;
use super::helpers::{read_fixed_string, read_u32, seek_to, skip};
use super::mesh::{read_mesh, MeshSegments};
use super::ParserContext;

/// Node capability bit flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeFlags(u32);

impl NodeFlags {
    /// Plain transform node
    pub const HEADER: Self = Self(0x0001);
    /// Light source
    pub const LIGHT: Self = Self(0x0002);
    /// Particle emitter
    pub const EMITTER: Self = Self(0x0004);
    /// Reference to another model
    pub const REFERENCE: Self = Self(0x0010);
    /// Triangle mesh
    pub const MESH: Self = Self(0x0020);
    /// Skinned mesh
    pub const SKIN: Self = Self(0x0040);
    /// Animated mesh
    pub const ANIM: Self = Self(0x0080);
    /// Dangly (cloth) mesh
    pub const DANGLY: Self = Self(0x0100);
    /// Walkmesh bounding tree
    pub const AABB: Self = Self(0x0200);

    /// Every bit the format defines, including reserved ones
    pub const KNOWN_MASK: u32 = 0x0003_FFFF;

    /// Number of defined bit positions
    const KNOWN_BITS: u8 = 18;

    /// Validate raw flags read from a node record
    pub fn parse(bits: u32) -> Result<Self, MdbError> {
        if bits & !Self::KNOWN_MASK != 0 {
            return Err(MdbError::UnknownNodeFlags { flags: bits });
        }
        Ok(Self(bits))
    }

    /// Get raw bits
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Check if flag is set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Capabilities selected by the set bits, lowest bit first
    pub fn capabilities(self) -> impl Iterator<Item = NodeCapability> {
        (0..Self::KNOWN_BITS)
            .filter(move |bit| self.0 & (1 << bit) != 0)
            .map(NodeCapability::from_bit)
    }
}

impl std::ops::BitOr for NodeFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What a single node flag bit selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCapability {
    Header,
    Light,
    Emitter,
    Reference,
    Mesh,
    Skin,
    Animation,
    Dangly,
    Aabb,
    /// Defined but unassigned bit
    Reserved(u8),
}

impl NodeCapability {
    fn from_bit(bit: u8) -> Self {
        match bit {
            0 => Self::Header,
            1 => Self::Light,
            2 => Self::Emitter,
            4 => Self::Reference,
            5 => Self::Mesh,
            6 => Self::Skin,
            7 => Self::Animation,
            8 => Self::Dangly,
            9 => Self::Aabb,
            other => Self::Reserved(other),
        }
    }

    /// Whether the decoder reads this capability's payload
    pub fn is_decoded(self) -> bool {
        matches!(self, Self::Header | Self::Mesh)
    }
}

impl fmt::Display for NodeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved(bit) => write!(f, "reserved bit {}", bit),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A node record plus what the walker still has to do with it
struct NodeRecord {
    node: Node,
    children: Vec<u64>,
    texture: Option<String>,
}

/// Decode the node at `offset` and, depth first, all of its children
///
/// Nodes are appended to the context in pre-order.
pub(crate) fn decode_node(
    ctx: &mut ParserContext<'_>,
    offset: u64,
    parent: Option<NodeId>,
    depth: usize,
) -> Result<NodeId, MdbError> {
    if depth >= ctx.options.max_depth {
        return Err(MdbError::TooDeep {
            max: ctx.options.max_depth,
        });
    }
    if !ctx.visited.insert(offset) {
        return Err(MdbError::NodeCycle { offset });
    }
    let id = next_node_id(ctx.nodes.len(), ctx.options)?;
    let NodeRecord {
        mut node,
        children,
        texture,
    } = read_node(ctx, id, offset).map_err(|e| e.in_node(offset))?;

    node.parent = parent;
    match parent.and_then(|p| ctx.nodes.get_mut(p.index())) {
        Some(parent_node) => parent_node.children.push(id),
        None => ctx.roots.push(id),
    }
    ctx.nodes.push(node);

    if let Some(name) = texture {
        let pending = ctx.textures.request(&name);
        ctx.pending.push((id, pending));
    }

    for child in children {
        decode_node(ctx, child, Some(id), depth + 1)?;
    }

    Ok(id)
}

/// Id for the next node, enforcing the node limit and the id range
fn next_node_id(count: usize, options: &DecodeOptions) -> Result<NodeId, MdbError> {
    let too_many = || MdbError::TooManyNodes {
        max: options.max_nodes,
    };
    if count >= options.max_nodes {
        return Err(too_many());
    }
    u32::try_from(count).map(NodeId).map_err(|_| too_many())
}

/// Read one node record without following its children
fn read_node(ctx: &mut ParserContext<'_>, id: NodeId, offset: u64) -> Result<NodeRecord, MdbError> {
    let base = ctx.header.model_data_base;
    let cursor = &mut ctx.cursor;
    seek_to(cursor, offset);

    let mut node = Node::new(id, offset);

    skip(cursor, 24)?;
    node.inherit_color = read_u32(cursor)?;
    node.node_number = read_u32(cursor)?;
    node.name = read_fixed_string::<NAME_LENGTH>(cursor)?;
    skip(cursor, 8)?;

    let children = read_array(cursor)?;
    let controller_keys = read_array(cursor)?;
    let controller_data = read_array(cursor)?;

    let children = read_offset_array(cursor, children.absolute(base), children.len())?
        .into_iter()
        .map(|child| u64::from(child) + u64::from(base))
        .collect::<Vec<_>>();

    let data = read_float_array(cursor, controller_data.absolute(base), controller_data.len())?;
    let transform = apply_controllers(
        cursor,
        controller_keys.absolute(base),
        controller_keys.len(),
        &data,
    )?;
    node.position = transform.position.unwrap_or(Vec3::ZERO);
    node.orientation = transform.orientation;
    node.rotation = transform.rotation.unwrap_or_default();

    skip(cursor, 20)?;
    node.flags = NodeFlags::parse(read_u32(cursor)?)?;

    let mut texture = None;
    for capability in node.flags.capabilities() {
        match capability {
            NodeCapability::Header => {}
            NodeCapability::Mesh => {
                let mesh = read_mesh(
                    &mut ctx.cursor,
                    MeshSegments {
                        raw_data_base: ctx.header.raw_data_base,
                        texture_data_base: &mut ctx.texture_data_base,
                        legacy: ctx.header.is_legacy(),
                    },
                )?;
                node.material = mesh.material;
                node.mesh = Some(mesh.info);
                node.faces = mesh.faces;
                node.render = mesh.render;
                texture = mesh.texture;
            }
            other => trace!("Node \"{}\": {} not decoded", node.name, other),
        }
    }

    debug!(
        "Node \"{}\" at 0x{:08X}: flags 0x{:05X}, {} children, {} faces",
        node.name,
        offset,
        node.flags.bits(),
        children.len(),
        node.faces.len()
    );

    Ok(NodeRecord {
        node,
        children,
        texture,
    })
}
