use crate::id::{LineId, NodeId};

/// Structural errors: caller misuse of the document API.
///
/// Policy vetoes and gesture outcomes are never reported through this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node id `{0}` already exists")]
    DuplicateNodeId(NodeId),

    #[error("node `{0}` not found")]
    NodeNotFound(String),

    #[error("port `{0}` not found")]
    PortNotFound(String),

    #[error("line `{0}` not found")]
    LineNotFound(LineId),

    #[error("line `{0}` is not a drawing line, setting its to-port is not allowed")]
    LineNotDrawing(LineId),

    #[error("workflow document has been disposed")]
    Disposed,

    #[error("failed to serialize data of node `{node}`: {reason}")]
    Serialize { node: NodeId, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
