//! Error types for MDB decoding

use crate::parser::ControllerKind;

/// Fatal decode errors
///
/// Any of these aborts the whole model load. Partially built nodes are
/// discarded with the decoder state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MdbError {
    /// First byte is non-zero and the data is no known container
    #[error("Not a binary MDB model file")]
    NotAModel,

    /// A textual container signature was found instead of a binary model
    #[error("Unsupported model container: {0}")]
    UnsupportedContainer(String),

    /// A read ran past the end of the data
    #[error("Unexpected end of data at offset 0x{offset:08X}")]
    UnexpectedEof { offset: u64 },

    /// Node flags carry bits outside the known mask
    #[error("Unknown node flags 0x{flags:08X}")]
    UnknownNodeFlags { flags: u32 },

    /// Controller uses the variable-column layout
    #[error("Variable-column controller (type {controller_type}) is not supported")]
    VariableColumnController { controller_type: u32 },

    /// Known controller type with the wrong number of columns
    #[error("{kind} controller with {columns} values")]
    MalformedController { kind: ControllerKind, columns: u8 },

    /// Controller key indexes past the end of the controller data
    #[error("Controller data index {index} (+{columns}) exceeds {len} floats")]
    ControllerDataOutOfRange { index: u16, columns: u8, len: usize },

    /// Face references a vertex or texcoord that does not exist
    #[error("Face {face} references index {index}, but only {count} are present")]
    FaceIndexOutOfRange { face: usize, index: u32, count: usize },

    /// The same node offset was reached twice
    #[error("Node at offset 0x{offset:08X} is referenced more than once")]
    NodeCycle { offset: u64 },

    /// Node hierarchy exceeds the configured depth
    #[error("Node hierarchy deeper than {max} levels")]
    TooDeep { max: usize },

    /// Node count exceeds the configured limit
    #[error("Model has more than {max} nodes")]
    TooManyNodes { max: usize },

    /// Error while reading the record of the node at `offset`
    #[error("Node at offset 0x{offset:08X}: {source}")]
    Node {
        offset: u64,
        #[source]
        source: Box<MdbError>,
    },
}

impl MdbError {
    /// Wrap an error with the offset of the node being read
    pub(crate) fn in_node(self, offset: u64) -> Self {
        Self::Node {
            offset,
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping node context wrappers
    pub fn root_cause(&self) -> &MdbError {
        match self {
            Self::Node { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Recoverable texture resolution errors
///
/// These never abort a decode: the node's texture reference is cleared and
/// the model renders untextured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextureError {
    /// The texture source does not know this name
    #[error("Texture not found: {0}")]
    NotFound(String),

    /// The texture source could not serve the request
    #[error("Texture source unavailable for {0}")]
    Unavailable(String),

    /// No answer arrived within the configured timeout
    #[error("Timed out waiting for texture {0}")]
    TimedOut(String),
}
