pub mod component;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod id;
pub mod index;
pub mod layout;
pub mod line;
pub mod lines;
pub mod model;
pub mod node;
pub mod playground;
pub mod port;
pub mod registry;
pub mod selection;
pub mod store;
pub mod transform;

pub use config::{EditorConfig, LineColors};
pub use document::{
    ContentChangeEvent, ContentChangeKind, DefaultDocumentPolicy, DocumentPolicy, WorkflowDocument,
};
pub use error::{Error, Result};
pub use event::{Emitter, Subscription};
pub use id::{EntityKey, Key, LineId, NodeId, NodeType, PortId, PortKey, PortType};
pub use line::{LineInfo, WorkflowLine};
pub use lines::{DefaultLinePolicy, LinePolicy, LinesChange, LinesManager};
pub use model::{EdgeJson, NodeJson, WorkflowJson};
pub use node::{ROOT_ID, WorkflowNode};
pub use playground::Playground;
pub use port::WorkflowPort;
pub use registry::{NodeRegistry, NodeTypeMeta, PortDecl, PortLocation, SubCanvas};
pub use selection::{EntityRef, HoverService, SelectService};
pub use store::EntityStore;

// Re-export kurbo geometry so downstream crates share one version
pub use kurbo::{Point, Rect, Size, Vec2};
