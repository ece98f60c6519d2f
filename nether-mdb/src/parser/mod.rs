//! MDB file parser

mod array;
mod controller;
mod header;
mod helpers;
mod mesh;
mod node;


use std::io::Cursor;
use std::time::Duration;

use hashbrown::HashSet;
use tracing::{debug, warn};

use crate::error::MdbError;
use crate::model::{Model, Node, NodeId, NodeTexture};
use crate::options::DecodeOptions;
use crate::texture::{PendingTexture, TextureRequester};

pub use array::ArrayDescriptor;
pub use controller::ControllerKind;
pub use header::{is_mdb, parse_header, MdbHeader};
pub use node::{NodeCapability, NodeFlags};

use helpers::MdbCursor;

/// Per-decode state, dropped as a whole if the decode fails
pub(crate) struct ParserContext<'a> {
    pub cursor: MdbCursor<'a>,
    pub header: MdbHeader,
    /// Texture-data base, which legacy meshes may replace mid-decode
    pub texture_data_base: u32,
    pub options: &'a DecodeOptions,
    pub textures: &'a dyn TextureRequester,
    pub nodes: Vec<Node>,
    pub roots: Vec<NodeId>,
    pub visited: HashSet<u64>,
    pub pending: Vec<(NodeId, PendingTexture)>,
}

/// Decode a binary MDB model
///
/// Texture names found in mesh records are submitted to `textures` as the
/// walk reaches them. The model is returned only after every request has
/// been answered (or has timed out). Failed texture requests leave the node
/// untextured; any format error aborts the whole decode.
pub fn decode_mdb(
    data: &[u8],
    textures: &dyn TextureRequester,
    options: &DecodeOptions,
) -> Result<Model, MdbError> {
    let mut cursor = Cursor::new(data);
    let header = header::read_header(&mut cursor)?;

    let mut ctx = ParserContext {
        cursor,
        texture_data_base: header.texture_data_base,
        header,
        options,
        textures,
        nodes: Vec::new(),
        roots: Vec::new(),
        visited: HashSet::new(),
        pending: Vec::new(),
    };

    let root = ctx.header.root_node_offset;
    node::decode_node(&mut ctx, root, None, 0)?;

    let ParserContext {
        header,
        mut nodes,
        roots,
        pending,
        ..
    } = ctx;

    let requested = pending.len();
    let resolved = await_textures(&mut nodes, pending, options.texture_timeout());

    let model = Model {
        header,
        roots,
        nodes,
    };

    debug!(
        "Decoded \"{}\": {} nodes, {} faces, {}/{} textures resolved",
        model.header.name,
        model.node_count(),
        model.face_count(),
        resolved,
        requested
    );

    Ok(model)
}

/// Wait for every outstanding texture request, returning how many resolved
fn await_textures(
    nodes: &mut [Node],
    pending: Vec<(NodeId, PendingTexture)>,
    timeout: Option<Duration>,
) -> usize {
    let mut resolved = 0;

    for (id, request) in pending {
        let name = request.name().to_string();
        let reply = request.wait(timeout);

        let Some(node) = nodes.get_mut(id.index()) else {
            continue;
        };

        match reply {
            Ok(handle) => {
                node.texture = Some(NodeTexture { name, handle });
                resolved += 1;
            }
            Err(e) => {
                warn!("Node \"{}\": {}, rendering untextured", node.name, e);
                node.texture = None;
            }
        }
    }

    resolved
}
