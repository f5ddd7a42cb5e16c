//! Node type registrations.
//!
//! A registry entry carries everything the core needs to know about a node
//! type: which ports it declares, whether it is the start/end of the flow,
//! whether it is a container, its default size, and the optional hooks the
//! host plugs in (sub-canvas resolver, data serializer).

use crate::id::{NodeId, NodeType, PortKey, PortType};
use crate::node::WorkflowNode;
use kurbo::{Rect, Size, Vec2};
use serde_json::Value;
use smallvec::{SmallVec, smallvec};
use std::collections::HashMap;
use std::rc::Rc;

/// Which side of the node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortLocation {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
}

impl PortLocation {
    pub fn default_for(port_type: PortType) -> Self {
        match port_type {
            PortType::Input => PortLocation::Left,
            PortType::Output => PortLocation::Right,
        }
    }
}

/// A port a node declares, statically (registry) or dynamically (markup).
#[derive(Debug, Clone, PartialEq)]
pub struct PortDecl {
    pub port_type: PortType,
    pub key: PortKey,
    pub disabled: bool,
    pub location: Option<PortLocation>,
    /// Absolute rectangle of the rendered anchor element, if any. Overrides
    /// the position derived from the node bounds.
    pub anchor: Option<Rect>,
}

impl PortDecl {
    pub fn input() -> Self {
        Self::new(PortType::Input, PortKey::default())
    }

    pub fn output() -> Self {
        Self::new(PortType::Output, PortKey::default())
    }

    pub fn new(port_type: PortType, key: impl Into<PortKey>) -> Self {
        Self {
            port_type,
            key: key.into(),
            disabled: false,
            location: None,
            anchor: None,
        }
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: Rect) -> Self {
        self.anchor = Some(anchor);
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// The hidden half of a sub-canvas pair, as declared by the container type.
#[derive(Debug, Clone, PartialEq)]
pub struct SubCanvas {
    pub canvas_id: NodeId,
    pub canvas_type: NodeType,
    /// Canvas position relative to the container when the JSON carries no
    /// `canvasPosition`.
    pub offset: Vec2,
}

/// Resolves the canvas node paired with a container. Must be a pure function
/// of the container id: it is called on import and again on export.
pub type SubCanvasResolver = Rc<dyn Fn(NodeId) -> SubCanvas>;

/// Produces the exported `data` of a node. An `Err` aborts the export.
pub type DataSerializer = Rc<dyn Fn(&WorkflowNode) -> Result<Option<Value>, String>>;

#[derive(Clone)]
pub struct NodeTypeMeta {
    pub is_start: bool,
    pub is_node_end: bool,
    pub is_container: bool,
    pub delete_disable: bool,
    /// Selectable nodes can be entered by a palette drag. Default: **true**.
    pub selectable: bool,
    pub input_disable: bool,
    pub output_disable: bool,
    pub default_ports: SmallVec<[PortDecl; 2]>,
    pub size: Option<Size>,
    pub sub_canvas: Option<SubCanvasResolver>,
}

impl Default for NodeTypeMeta {
    fn default() -> Self {
        Self {
            is_start: false,
            is_node_end: false,
            is_container: false,
            delete_disable: false,
            selectable: true,
            input_disable: false,
            output_disable: false,
            default_ports: smallvec![PortDecl::input(), PortDecl::output()],
            size: None,
            sub_canvas: None,
        }
    }
}

impl std::fmt::Debug for NodeTypeMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTypeMeta")
            .field("is_start", &self.is_start)
            .field("is_node_end", &self.is_node_end)
            .field("is_container", &self.is_container)
            .field("delete_disable", &self.delete_disable)
            .field("default_ports", &self.default_ports)
            .field("size", &self.size)
            .field("sub_canvas", &self.sub_canvas.is_some())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct NodeRegistry {
    pub node_type: NodeType,
    pub meta: NodeTypeMeta,
    pub data_serializer: Option<DataSerializerHook>,
}

/// Newtype so `NodeRegistry` can stay `Debug`.
#[derive(Clone)]
pub struct DataSerializerHook(pub DataSerializer);

impl std::fmt::Debug for DataSerializerHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataSerializerHook")
    }
}

impl NodeRegistry {
    pub fn new(node_type: impl Into<NodeType>) -> Self {
        Self {
            node_type: node_type.into(),
            meta: NodeTypeMeta::default(),
            data_serializer: None,
        }
    }

    /// A start node only has an output port.
    pub fn start(node_type: impl Into<NodeType>) -> Self {
        let mut reg = Self::new(node_type);
        reg.meta.is_start = true;
        reg.meta.delete_disable = true;
        reg.meta.default_ports = smallvec![PortDecl::output()];
        reg
    }

    /// An end node only has an input port.
    pub fn end(node_type: impl Into<NodeType>) -> Self {
        let mut reg = Self::new(node_type);
        reg.meta.is_node_end = true;
        reg.meta.delete_disable = true;
        reg.meta.default_ports = smallvec![PortDecl::input()];
        reg
    }

    #[must_use]
    pub fn container(mut self) -> Self {
        self.meta.is_container = true;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.meta.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_ports(mut self, ports: impl IntoIterator<Item = PortDecl>) -> Self {
        self.meta.default_ports = ports.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_sub_canvas(mut self, resolver: impl Fn(NodeId) -> SubCanvas + 'static) -> Self {
        self.meta.is_container = true;
        self.meta.sub_canvas = Some(Rc::new(resolver));
        self
    }

    #[must_use]
    pub fn with_data_serializer(
        mut self,
        serializer: impl Fn(&WorkflowNode) -> Result<Option<Value>, String> + 'static,
    ) -> Self {
        self.data_serializer = Some(DataSerializerHook(Rc::new(serializer)));
        self
    }
}

/// Registered node types, with a fallback for unregistered ones.
#[derive(Debug)]
pub struct NodeRegistries {
    by_type: HashMap<NodeType, NodeRegistry>,
    fallback: NodeRegistry,
}

impl Default for NodeRegistries {
    fn default() -> Self {
        Self {
            by_type: HashMap::new(),
            fallback: NodeRegistry::new(""),
        }
    }
}

impl NodeRegistries {
    pub fn register(&mut self, registry: NodeRegistry) {
        log::debug!("register node type `{}`", registry.node_type);
        self.by_type.insert(registry.node_type.clone(), registry);
    }

    pub fn get(&self, node_type: &NodeType) -> &NodeRegistry {
        self.by_type.get(node_type).unwrap_or(&self.fallback)
    }

    pub fn is_registered(&self, node_type: &NodeType) -> bool {
        self.by_type.contains_key(node_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_types_get_two_sided_ports() {
        let regs = NodeRegistries::default();
        let meta = &regs.get(&"anything".into()).meta;
        assert_eq!(meta.default_ports.len(), 2);
        assert!(meta.selectable);
        assert!(!meta.is_container);
    }

    #[test]
    fn start_and_end_declare_one_port() {
        let start = NodeRegistry::start("start");
        assert_eq!(start.meta.default_ports[0].port_type, PortType::Output);
        let end = NodeRegistry::end("end");
        assert_eq!(end.meta.default_ports[0].port_type, PortType::Input);
    }
}
