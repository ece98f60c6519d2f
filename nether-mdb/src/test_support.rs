//! Synthetic MDB files for tests
//!
//! `MdbBuilder` lays a file out as: header, every node record back to back,
//! then each node's arrays, mesh data and texture info in node order. All
//! offsets are computed, so tests only describe the tree.

use crate::parser::{MdbHeader, NodeFlags};
use crate::{CONTROLLER_ORIENTATION, CONTROLLER_POSITION, LEGACY_VERSION, MODEL_DATA_BASE};

const NODE_RECORD_SIZE: usize = 164;
const MESH_RECORD_SIZE: usize = 768;

/// Builds a complete MDB file byte by byte
pub struct MdbBuilder {
    pub version: u16,
    pub name: String,
    pub scale: f32,
    /// Header pair for current versions: (offset, size)
    pub texture_data: (u32, u32),
    /// Header pair for the legacy version: (offset, size)
    pub raw_data: (u32, u32),
    pub lod: (f32, f32),
    pub super_model: String,
    /// Node 0 is the root
    pub nodes: Vec<NodeSpec>,
}

impl MdbBuilder {
    pub fn new(version: u16) -> Self {
        Self {
            version,
            name: "model".to_string(),
            scale: 1.0,
            texture_data: (0, 0),
            raw_data: (0, 0),
            lod: (0.0, 0.0),
            super_model: String::new(),
            nodes: vec![NodeSpec::new("root")],
        }
    }

    /// Add a node under `parent`, returning its index
    pub fn add_node(&mut self, parent: usize, node: NodeSpec) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(index);
        index
    }

    /// Root node offset as stored in the header (model-data relative)
    pub fn root_offset(&self) -> u32 {
        (MdbHeader::SIZE as u32) - MODEL_DATA_BASE
    }

    /// Absolute offset of a node record in the built file
    pub fn node_offset(&self, index: usize) -> u64 {
        self.record_offsets()[index] as u64
    }

    fn is_legacy(&self) -> bool {
        self.version == LEGACY_VERSION
    }

    fn raw_base(&self) -> usize {
        if self.is_legacy() {
            (self.raw_data.0 + MODEL_DATA_BASE) as usize
        } else {
            MODEL_DATA_BASE as usize
        }
    }

    fn texture_base(&self) -> usize {
        if self.is_legacy() {
            MODEL_DATA_BASE as usize
        } else {
            (self.texture_data.0 + MODEL_DATA_BASE) as usize
        }
    }

    fn record_offsets(&self) -> Vec<usize> {
        let mut at = MdbHeader::SIZE;
        self.nodes
            .iter()
            .map(|node| {
                let offset = at;
                at += node.record_size();
                offset
            })
            .collect()
    }

    pub fn build(&self) -> Vec<u8> {
        let offsets = self.record_offsets();
        let extra_base = offsets
            .last()
            .zip(self.nodes.last())
            .map(|(offset, node)| offset + node.record_size())
            .unwrap_or(MdbHeader::SIZE);

        let mut records = Vec::new();
        let mut extra = Vec::new();
        for node in &self.nodes {
            self.write_node(node, &offsets, extra_base, &mut records, &mut extra);
        }

        let mut out = self.header_bytes(records.len() + extra.len());
        out.extend_from_slice(&records);
        out.extend_from_slice(&extra);
        out
    }

    fn header_bytes(&self, model_data_size: usize) -> Vec<u8> {
        let mut h = vec![0u8; MdbHeader::SIZE];
        put_u16(&mut h, 4, self.version);
        put_u32(&mut h, 16, model_data_size as u32);
        let (first, second) = if self.is_legacy() {
            self.raw_data
        } else {
            self.texture_data
        };
        put_u32(&mut h, 24, first);
        put_u32(&mut h, 28, second);
        put_str(&mut h, 40, &self.name);
        put_u32(&mut h, 104, self.root_offset());
        put_f32(&mut h, 192, self.lod.0);
        put_f32(&mut h, 196, self.lod.1);
        put_f32(&mut h, 284, self.scale);
        put_str(&mut h, 288, &self.super_model);
        h
    }

    fn write_node(
        &self,
        node: &NodeSpec,
        offsets: &[usize],
        extra_base: usize,
        records: &mut Vec<u8>,
        extra: &mut Vec<u8>,
    ) {
        let model_base = MODEL_DATA_BASE as usize;
        let mut r = vec![0u8; node.record_size()];
        put_u32(&mut r, 24, node.inherit_color);
        put_u32(&mut r, 28, node.node_number);
        put_str(&mut r, 32, &node.name);

        // Children offsets
        let children_at = extra_base + extra.len();
        for &child in &node.children {
            extra.extend_from_slice(&((offsets[child] - model_base) as u32).to_le_bytes());
        }
        let count = node.children.len() as u32;
        put_descriptor(&mut r, 104, children_at - model_base, count, count + node.child_slack);

        // Controller keys
        let keys_at = extra_base + extra.len();
        for key in &node.controllers {
            extra.extend_from_slice(&key.controller_type.to_le_bytes());
            extra.extend_from_slice(&1u16.to_le_bytes());
            extra.extend_from_slice(&0u16.to_le_bytes());
            extra.extend_from_slice(&key.data_index.to_le_bytes());
            extra.push(key.columns);
            extra.push(0);
        }
        let count = node.controllers.len() as u32;
        put_descriptor(&mut r, 116, keys_at - model_base, count, count);

        // Controller data
        let data_at = extra_base + extra.len();
        for value in &node.controller_data {
            extra.extend_from_slice(&value.to_le_bytes());
        }
        let count = node.controller_data.len() as u32;
        put_descriptor(&mut r, 128, data_at - model_base, count, count);

        let mut flags = node.flags;
        if let Some(mesh) = &node.mesh {
            flags |= NodeFlags::MESH.bits();
            let record = self.mesh_record(mesh, extra_base, extra);
            r[NODE_RECORD_SIZE..].copy_from_slice(&record);
        }
        put_u32(&mut r, 160, flags);

        records.extend_from_slice(&r);
    }

    fn mesh_record(&self, mesh: &MeshSpec, extra_base: usize, extra: &mut Vec<u8>) -> Vec<u8> {
        let legacy = self.is_legacy();
        let raw_base = self.raw_base();

        let arrays_at = extra_base + extra.len();
        let block_len = 4 + 10 * 12 + if legacy { 4 } else { 0 };
        let vertices_at = arrays_at + block_len;
        let texcoords_at = vertices_at + 12 * mesh.vertices.len();
        let faces_at = texcoords_at + 8 * mesh.texcoords.len();
        let face_size = if legacy { 48 } else { 32 };
        let info_at = faces_at + face_size * mesh.faces.len();

        // Mesh arrays block
        let mut block = vec![0u8; block_len];
        let vertex_count = mesh.vertices.len() as u32;
        let texcoord_count = mesh.texcoords.len() as u32;
        let face_count = mesh.faces.len() as u32;
        put_descriptor(&mut block, 4, vertices_at - raw_base, vertex_count, vertex_count);
        put_descriptor(&mut block, 4 + 4 * 12, texcoords_at - raw_base, texcoord_count, texcoord_count);
        put_descriptor(&mut block, 4 + 9 * 12, faces_at - raw_base, face_count, face_count);
        if legacy {
            put_u32(&mut block, 124, (info_at - raw_base) as u32);
        }
        extra.extend_from_slice(&block);

        for v in &mesh.vertices {
            v.iter().for_each(|c| extra.extend_from_slice(&c.to_le_bytes()));
        }
        for t in &mesh.texcoords {
            t.iter().for_each(|c| extra.extend_from_slice(&c.to_le_bytes()));
        }
        for face in &mesh.faces {
            extra.extend_from_slice(&[0u8; 20]);
            if legacy {
                extra.extend_from_slice(&[0u8; 12]);
            }
            face.iter().for_each(|i| extra.extend_from_slice(&i.to_le_bytes()));
            if legacy {
                extra.extend_from_slice(&[0u8; 4]);
            }
        }

        // Texture info text
        extra.extend_from_slice(&(mesh.texture_lines.len() as u32).to_le_bytes());
        extra.extend_from_slice(&0u32.to_le_bytes());
        for line in &mesh.texture_lines {
            extra.extend_from_slice(line.as_bytes());
            extra.extend_from_slice(b"\n\0");
        }

        let mut m = vec![0u8; MESH_RECORD_SIZE];
        put_u32(&mut m, 8, (arrays_at - raw_base) as u32);
        let material = [mesh.ambient, mesh.diffuse, mesh.specular];
        for (i, value) in material.iter().flatten().enumerate() {
            put_f32(&mut m, 88 + 4 * i, *value);
        }
        put_f32(&mut m, 124, mesh.shininess);
        for (i, slot) in mesh.texture_slots.iter().enumerate() {
            put_str(&mut m, 148 + 64 * i, slot);
        }
        m[424..428].copy_from_slice(&mesh.fourcc);
        put_f32(&mut m, 436, mesh.corona_center_x);
        put_f32(&mut m, 448, mesh.enlarge_start_distance);
        if !legacy {
            put_u32(&mut m, 760, (info_at - self.texture_base()) as u32);
        }
        m
    }
}

/// One node in an `MdbBuilder` tree
pub struct NodeSpec {
    pub name: String,
    pub node_number: u32,
    pub inherit_color: u32,
    /// Raw flags; the mesh bit is added when `mesh` is set
    pub flags: u32,
    /// Indices into `MdbBuilder::nodes`
    pub children: Vec<usize>,
    /// Extra allocated-but-unused entries in the children descriptor
    pub child_slack: u32,
    pub controllers: Vec<ControllerSpec>,
    pub controller_data: Vec<f32>,
    pub mesh: Option<MeshSpec>,
}

impl NodeSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            node_number: 0,
            inherit_color: 0,
            flags: NodeFlags::HEADER.bits(),
            children: Vec::new(),
            child_slack: 0,
            controllers: Vec::new(),
            controller_data: Vec::new(),
            mesh: None,
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Append a controller key whose first row is `values`
    pub fn with_controller(mut self, controller_type: u32, values: &[f32]) -> Self {
        self.controllers.push(ControllerSpec {
            controller_type,
            data_index: self.controller_data.len() as u16,
            columns: values.len() as u8,
        });
        self.controller_data.extend_from_slice(values);
        self
    }

    pub fn with_position(self, position: [f32; 3]) -> Self {
        self.with_controller(CONTROLLER_POSITION, &position)
    }

    pub fn with_orientation(self, quat: [f32; 4]) -> Self {
        self.with_controller(CONTROLLER_ORIENTATION, &quat)
    }

    pub fn with_mesh(mut self, mesh: MeshSpec) -> Self {
        self.mesh = Some(mesh);
        self
    }

    fn record_size(&self) -> usize {
        NODE_RECORD_SIZE + if self.mesh.is_some() { MESH_RECORD_SIZE } else { 0 }
    }
}

/// A raw controller key
pub struct ControllerSpec {
    pub controller_type: u32,
    pub data_index: u16,
    pub columns: u8,
}

/// Mesh payload of a node
pub struct MeshSpec {
    pub texture_slots: [String; 4],
    pub texture_lines: Vec<String>,
    pub vertices: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub faces: Vec<[u32; 3]>,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub fourcc: [u8; 4],
    pub corona_center_x: f32,
    pub enlarge_start_distance: f32,
}

impl MeshSpec {
    /// A single untextured triangle in the XY plane
    pub fn triangle() -> Self {
        Self {
            texture_slots: [
                "NULL".to_string(),
                String::new(),
                String::new(),
                String::new(),
            ],
            texture_lines: Vec::new(),
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            texcoords: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            faces: vec![[0, 1, 2]],
            ambient: [0.2, 0.2, 0.2],
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.0, 0.0, 0.0],
            shininess: 1.0,
            fourcc: *b"TRIM",
            corona_center_x: 0.0,
            enlarge_start_distance: 0.0,
        }
    }

    /// Name `texture` in the first slot and in the texture info text
    pub fn textured(mut self, texture: &str) -> Self {
        self.texture_slots[0] = texture.to_string();
        self.texture_lines = vec![
            "shader mesh_default".to_string(),
            format!("texture texture0 {}", texture),
        ];
        self
    }
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_f32(buf: &mut [u8], at: usize, value: f32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_str(buf: &mut [u8], at: usize, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(63);
    buf[at..at + len].copy_from_slice(&bytes[..len]);
}

fn put_descriptor(buf: &mut [u8], at: usize, start: usize, used: u32, allocated: u32) {
    put_u32(buf, at, start as u32);
    put_u32(buf, at + 4, used);
    put_u32(buf, at + 8, allocated);
}
