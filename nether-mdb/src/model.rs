//! Decoded scene graph
//!
//! Nodes are stored in one arena (`Model::nodes`) in pre-order. Parent and
//! children links are `NodeId` indices into that arena, so the tree owns no
//! shared pointers and drops in one pass.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

use crate::parser::{MdbHeader, NodeFlags};
use crate::texture::TextureHandle;

/// Index of a node in `Model::nodes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A decoded model
#[derive(Debug, Clone)]
pub struct Model {
    /// File header (version, segment bases, informational names)
    pub header: MdbHeader,
    pub(crate) roots: Vec<NodeId>,
    pub(crate) nodes: Vec<Node>,
}

impl Model {
    /// Format version from the header
    pub fn version(&self) -> u16 {
        self.header.version
    }

    /// Global model scale
    pub fn scale(&self) -> f32 {
        self.header.scale
    }

    /// Root nodes in file order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Children of a node, in file order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(move |node| node.children.iter().filter_map(move |&c| self.node(c)))
    }

    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.node(id)?.parent.and_then(|p| self.node(p))
    }

    /// First node with the given name (names are not guaranteed unique)
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Nodes that carry triangle data and should be drawn
    pub fn renderable(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|n| n.render && !n.faces.is_empty())
    }

    /// Total face count over all nodes
    pub fn face_count(&self) -> usize {
        self.nodes.iter().map(|n| n.faces.len()).sum()
    }
}

/// One scene-graph node
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Absolute offset of the node record in the file
    pub offset: u64,
    pub node_number: u32,
    pub inherit_color: u32,
    pub flags: NodeFlags,
    /// Position from the position controller, zero otherwise
    pub position: Vec3,
    /// Source quaternion of the orientation controller, if any
    pub orientation: Option<Quat>,
    /// Orientation as yaw/pitch/roll degrees, zero without a controller
    pub rotation: Rotation,
    pub material: Material,
    /// Informational mesh fields, present for mesh nodes
    pub mesh: Option<MeshInfo>,
    /// Resolved texture, cleared if resolution failed
    pub texture: Option<NodeTexture>,
    /// False when the mesh names no texture (`NULL` slot)
    pub render: bool,
    pub faces: Vec<Face>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, offset: u64) -> Self {
        Self {
            id,
            name: String::new(),
            offset,
            node_number: 0,
            inherit_color: 0,
            flags: NodeFlags::default(),
            position: Vec3::ZERO,
            orientation: None,
            rotation: Rotation::default(),
            material: Material::default(),
            mesh: None,
            texture: None,
            render: true,
            faces: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Orientation as `[x, y, z, angle]`, the angle being `2·acos(w)` in degrees
    pub fn axis_angle(&self) -> Option<[f32; 4]> {
        self.orientation.map(|q| {
            let angle = 2.0 * q.w.clamp(-1.0, 1.0).acos();
            [q.x, q.y, q.z, angle.to_degrees()]
        })
    }

    /// Face data as raw bytes, ready for a vertex buffer upload
    pub fn face_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.faces)
    }
}

/// Yaw/pitch/roll in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rotation {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Rotation {
    /// Convert an orientation key quaternion
    ///
    /// Yaw and pitch are measured from 180 degrees to match the model axis
    /// layout. This is not a general quaternion to Euler conversion.
    pub fn from_quat_components(x: f32, y: f32, z: f32, w: f32) -> Self {
        let yaw = (2.0 * (x * y + z * w)).atan2(1.0 - 2.0 * (y * y + z * z));
        let pitch = (2.0 * (x * z - w * y)).clamp(-1.0, 1.0).asin();
        let roll = (2.0 * (x * w + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));

        Self {
            yaw: 180.0 - yaw.to_degrees(),
            pitch: 180.0 - pitch.to_degrees(),
            roll: roll.to_degrees(),
        }
    }
}

/// Material constants, copied verbatim from the mesh record
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

/// Informational fields of a mesh record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshInfo {
    /// The four texture name slots (only the first one drives texturing)
    pub texture_slots: [String; crate::TEXTURE_SLOTS],
    /// Big-endian four-character tag
    pub fourcc: u32,
    pub corona_center_x: f32,
    pub enlarge_start_distance: f32,
    pub vertex_count: u32,
    pub normal_count: u32,
    pub tangent_count: u32,
    pub binormal_count: u32,
    pub texcoord_counts: [u32; 4],
    pub face_count: u32,
}

impl MeshInfo {
    /// Four-character tag as text, if printable
    pub fn fourcc_str(&self) -> Option<String> {
        let bytes = self.fourcc.to_be_bytes();
        bytes
            .iter()
            .all(|b| b.is_ascii_graphic() || *b == b' ')
            .then(|| String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A texture reference that was successfully resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTexture {
    pub name: String,
    pub handle: TextureHandle,
}

/// One triangle with baked (non-indexed) vertex data
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Face {
    pub positions: [[f32; 3]; 3],
    /// Texture coordinates `[u, v, 0]`
    pub tex_coords: [[f32; 3]; 3],
}

impl Face {
    pub const SIZE: usize = 72;
}
