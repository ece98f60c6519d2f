//! Nether-MDB: binary scene-graph model decoder for Nethercore
//!
//! This crate decodes offset-addressed binary model files (MDB) into an owned
//! scene graph: a node hierarchy with controller-derived transforms, material
//! constants, texture references and denormalized triangle data.
//!
//! Any format error (unknown node flags, malformed controllers, truncated
//! data) aborts the decode, so a partial model is never returned. Texture
//! requests may be answered on another thread; `decode_mdb` returns only
//! after every request has been answered or has timed out.
//!
//! # MDB Format Overview
//!
//! MDB files contain:
//! - A fixed header with the format version and three segment bases
//!   (model data, raw geometry data, texture info)
//! - A tree of node records, each addressed by an offset relative to the
//!   model-data base
//! - Array descriptors `(start, used, allocated)` for every variable-length array
//! - Optional mesh sub-records selected by a bit-flag field
//! - Controller keys (position, orientation) indexing a float table
//!
//! # Usage
//!
//! ```ignore
//! use nether_mdb::{decode_mdb, DecodeOptions, InlineTextures};
//!
//! let bytes = std::fs::read("model.mdb").unwrap();
//! let textures = InlineTextures::new(my_texture_source);
//! let model = decode_mdb(&bytes, &textures, &DecodeOptions::default()).unwrap();
//!
//! for node in model.nodes() {
//!     println!("{}: {} faces", node.name, node.faces.len());
//! }
//! ```

mod error;
mod model;
mod options;
mod parser;
mod texture;

#[cfg(test)]
mod test_support;

pub use error::{MdbError, TextureError};
pub use model::{Face, Material, MeshInfo, Model, Node, NodeId, NodeTexture, Rotation};
pub use options::DecodeOptions;
pub use parser::{
    decode_mdb, is_mdb, parse_header, ArrayDescriptor, ControllerKind, MdbHeader,
    NodeCapability, NodeFlags,
};
pub use texture::{
    InlineTextures, PendingTexture, TextureHandle, TextureRequester, TextureSource,
    TextureThread,
};

// =============================================================================
// Format Constants
// =============================================================================

/// Signature of the composite container format, which is not supported
pub const BINARY_COMPOSITE_MAGIC: &[u8] = b"binarycompositemodel";

/// Legacy format version with a separate raw-data segment
pub const LEGACY_VERSION: u16 = 133;

/// Base offset of the model-data segment
pub const MODEL_DATA_BASE: u32 = 32;

/// Length of every fixed-width name field
pub const NAME_LENGTH: usize = 64;

/// Number of texture name slots in a mesh record
pub const TEXTURE_SLOTS: usize = 4;

/// Texture slot value meaning "no texture"
pub const NULL_TEXTURE: &str = "NULL";

/// Controller type tag for position keys
pub const CONTROLLER_POSITION: u32 = 84;

/// Controller type tag for orientation keys
pub const CONTROLLER_ORIENTATION: u32 = 96;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(BINARY_COMPOSITE_MAGIC.len(), 20);
        assert_eq!(MODEL_DATA_BASE, 32);
        assert_eq!(NULL_TEXTURE.len(), 4);
        assert_ne!(CONTROLLER_POSITION, CONTROLLER_ORIENTATION);
    }
}
