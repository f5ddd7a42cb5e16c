//! The entity store: nodes, ports, their per-entity components, and the
//! sub-canvas containment relation.
//!
//! Lines live in the [`crate::lines::LinesManager`]; everything a line
//! points at lives here.

use crate::component::ComponentTable;
use crate::config::EditorConfig;
use crate::id::{NodeId, PortId, PortKey, PortType};
use crate::index::{NodeLines, NodePorts};
use crate::node::{NodeTree, WorkflowNode};
use crate::playground::Playground;
use crate::port::WorkflowPort;
use crate::registry::{NodeRegistries, NodeRegistry, NodeTypeMeta, PortDecl};
use crate::transform::{NodeTransform, rect_contains};
use kurbo::{Point, Rect};
use std::collections::HashMap;
use std::rc::Rc;

// ─── Containment ─────────────────────────────────────────────────────────

/// `container ⇄ canvas` pairs of sub-canvas nodes. Looked up, never
/// traversed as an object graph.
#[derive(Debug, Clone, Default)]
pub struct Containment {
    canvas_by_container: HashMap<NodeId, NodeId>,
    container_by_canvas: HashMap<NodeId, NodeId>,
}

impl Containment {
    pub fn link(&mut self, container: NodeId, canvas: NodeId) {
        self.canvas_by_container.insert(container, canvas);
        self.container_by_canvas.insert(canvas, container);
    }

    /// Remove the pair `id` belongs to (as either member). Returns the partner.
    pub fn unlink(&mut self, id: NodeId) -> Option<NodeId> {
        if let Some(canvas) = self.canvas_by_container.remove(&id) {
            self.container_by_canvas.remove(&canvas);
            return Some(canvas);
        }
        if let Some(container) = self.container_by_canvas.remove(&id) {
            self.canvas_by_container.remove(&container);
            return Some(container);
        }
        None
    }

    pub fn canvas_of(&self, container: NodeId) -> Option<NodeId> {
        self.canvas_by_container.get(&container).copied()
    }

    pub fn container_of(&self, canvas: NodeId) -> Option<NodeId> {
        self.container_by_canvas.get(&canvas).copied()
    }

    pub fn is_canvas(&self, id: NodeId) -> bool {
        self.container_by_canvas.contains_key(&id)
    }

    /// The node's partner in its pair, if it has one.
    pub fn partner(&self, id: NodeId) -> Option<NodeId> {
        self.canvas_of(id).or_else(|| self.container_of(id))
    }

    pub fn clear(&mut self) {
        self.canvas_by_container.clear();
        self.container_by_canvas.clear();
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

pub struct EntityStore {
    pub tree: NodeTree,
    pub ports: HashMap<PortId, WorkflowPort>,
    pub components: ComponentTable,
    pub registries: NodeRegistries,
    pub containment: Containment,
    pub playground: Playground,
    pub config: Rc<EditorConfig>,
}

impl EntityStore {
    pub fn new(config: Rc<EditorConfig>) -> Self {
        Self {
            tree: NodeTree::new(),
            ports: HashMap::new(),
            components: ComponentTable::new(),
            registries: NodeRegistries::default(),
            containment: Containment::default(),
            playground: Playground::default(),
            config,
        }
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    pub fn has_node(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&WorkflowNode> {
        self.tree.get(id)
    }

    pub fn registry(&self, id: NodeId) -> Option<&NodeRegistry> {
        self.tree
            .get(id)
            .map(|node| self.registries.get(&node.node_type))
    }

    /// Type meta of a node; the fallback meta for unknown ids.
    pub fn meta(&self, id: NodeId) -> &NodeTypeMeta {
        match self.tree.get(id) {
            Some(node) => &self.registries.get(&node.node_type).meta,
            None => &self.registries.get(&"".into()).meta,
        }
    }

    pub fn is_container(&self, id: NodeId) -> bool {
        self.meta(id).is_container
    }

    /// Key of the block a node's own children live in when it is used as a
    /// line endpoint: containers and canvas nodes own a block, other nodes
    /// belong to their parent's block. `None` is the top level.
    pub fn block_key(&self, id: NodeId) -> Option<NodeId> {
        if self.containment.is_canvas(id) || self.is_container(id) {
            Some(id)
        } else {
            self.tree.parent(id)
        }
    }

    /// Where the children of a node actually live: the paired canvas node
    /// for sub-canvas containers, the node itself otherwise.
    pub fn block_parent(&self, id: NodeId) -> NodeId {
        self.containment.canvas_of(id).unwrap_or(id)
    }

    /// True if the node sits inside a container (directly, or inside the
    /// canvas of a sub-canvas container).
    pub fn is_in_container(&self, id: NodeId) -> bool {
        self.tree
            .parent(id)
            .is_some_and(|p| self.is_container(p) || self.containment.is_canvas(p))
    }

    // ─── Transforms ──────────────────────────────────────────────────────

    pub fn transform(&self, id: NodeId) -> Option<&NodeTransform> {
        self.components.get::<NodeTransform>(id)
    }

    /// Absolute anchor position: the sum of the positions up the parent chain.
    pub fn absolute_position(&self, id: NodeId) -> Option<Point> {
        let mut pos = self.transform(id)?.position;
        let mut current = id;
        while let Some(parent) = self.tree.parent(current) {
            if let Some(t) = self.transform(parent) {
                pos += t.position.to_vec2();
            }
            current = parent;
        }
        Some(pos)
    }

    /// Absolute position of the origin a node's children are relative to.
    pub fn parent_origin(&self, id: NodeId) -> Point {
        self.tree
            .parent(id)
            .and_then(|p| self.absolute_position(p))
            .unwrap_or(Point::ZERO)
    }

    pub fn set_position(&mut self, id: NodeId, relative: Point) -> bool {
        match self.components.get_mut::<NodeTransform>(id) {
            Some(t) if t.position != relative => {
                t.position = relative;
                true
            }
            _ => false,
        }
    }

    /// Move a node so its absolute position becomes `absolute`. Returns true
    /// if the node moved.
    pub fn set_absolute_position(&mut self, id: NodeId, absolute: Point) -> bool {
        let origin = self.parent_origin(id);
        self.set_position(id, (absolute - origin).to_point())
    }

    pub fn node_bounds(&self, id: NodeId) -> Option<Rect> {
        let t = self.transform(id)?;
        Some(t.bounds_at(self.absolute_position(id)?))
    }

    /// Topmost node (highest paint order) whose bounds contain `pos`,
    /// inflated by `padding`.
    pub fn topmost_node_at(&self, pos: Point, padding: f64) -> Option<NodeId> {
        self.nodes_at(pos, padding).into_iter().last()
    }

    /// Every node whose padded bounds contain `pos`, in paint order.
    pub fn nodes_at(&self, pos: Point, padding: f64) -> Vec<NodeId> {
        self.tree
            .all_nodes()
            .into_iter()
            .filter(|id| {
                self.node_bounds(*id)
                    .is_some_and(|b| rect_contains(&b.inflate(padding, padding), pos))
            })
            .collect()
    }

    // ─── Ports ───────────────────────────────────────────────────────────

    pub fn port(&self, id: PortId) -> Option<&WorkflowPort> {
        self.ports.get(&id)
    }

    pub fn port_mut(&mut self, id: PortId) -> Option<&mut WorkflowPort> {
        self.ports.get_mut(&id)
    }

    /// Get the port `(node, type, key)`, creating and caching it on first
    /// lookup. `None` if the node does not exist.
    pub fn get_or_create_port(
        &mut self,
        node: NodeId,
        port_type: PortType,
        key: &PortKey,
    ) -> Option<PortId> {
        if !self.has_node(node) {
            return None;
        }
        let id = PortId::new(node, port_type, key);
        if !self.ports.contains_key(&id) {
            let port = WorkflowPort::new(node, port_type, key.clone());
            log::trace!("create port {id:?}");
            self.ports.insert(id, port);
            self.components
                .get_or_default::<NodePorts>(node)
                .static_ports
                .push(id);
        }
        Some(id)
    }

    /// Create the ports the node's registration declares.
    pub fn init_static_ports(&mut self, node: NodeId) {
        let decls: Vec<PortDecl> = self.meta(node).default_ports.to_vec();
        for decl in &decls {
            let id = PortId::new(node, decl.port_type, &decl.key);
            match self.ports.get_mut(&id) {
                Some(port) => port.apply_decl(decl),
                None => {
                    self.ports
                        .insert(id, WorkflowPort::from_decl(node, decl, false));
                    self.components
                        .get_or_default::<NodePorts>(node)
                        .static_ports
                        .push(id);
                }
            }
        }
    }

    /// Replace the dynamically discovered ports of a node. Returns the ports
    /// that are no longer declared; the caller disposes them and their lines.
    pub fn sync_dynamic_ports(&mut self, node: NodeId, decls: &[PortDecl]) -> Vec<PortId> {
        let mut next = Vec::with_capacity(decls.len());
        for decl in decls {
            let id = PortId::new(node, decl.port_type, &decl.key);
            match self.ports.get_mut(&id) {
                Some(port) => {
                    port.apply_decl(decl);
                    port.dynamic = true;
                }
                None => {
                    self.ports
                        .insert(id, WorkflowPort::from_decl(node, decl, true));
                }
            }
            next.push(id);
        }

        let index = self.components.get_or_default::<NodePorts>(node);
        let stale: Vec<PortId> = index
            .all()
            .filter(|p| !next.contains(p))
            .collect();
        index
            .static_ports
            .retain(|p| !next.contains(p) && !stale.contains(p));
        index.dynamic_ports = next.into_iter().collect();
        stale
    }

    /// Forget a port. Lines must already be gone.
    pub fn remove_port(&mut self, id: PortId) -> Option<WorkflowPort> {
        let port = self.ports.remove(&id)?;
        if let Some(index) = self.components.get_mut::<NodePorts>(port.node) {
            index.remove(id);
        }
        self.components.remove_entity(id);
        Some(port)
    }

    pub fn node_ports(&self, node: NodeId) -> Vec<PortId> {
        self.components
            .get::<NodePorts>(node)
            .map(|index| index.all().collect())
            .unwrap_or_default()
    }

    pub fn input_ports(&self, node: NodeId) -> Vec<PortId> {
        self.ports_of_type(node, PortType::Input)
    }

    pub fn output_ports(&self, node: NodeId) -> Vec<PortId> {
        self.ports_of_type(node, PortType::Output)
    }

    fn ports_of_type(&self, node: NodeId, port_type: PortType) -> Vec<PortId> {
        self.node_ports(node)
            .into_iter()
            .filter(|p| self.port(*p).is_some_and(|port| port.port_type == port_type))
            .collect()
    }

    /// Explicit flag, or disabled by the owning node's meta, or read-only canvas.
    pub fn port_disabled(&self, id: PortId) -> bool {
        let Some(port) = self.port(id) else {
            return true;
        };
        if port.disabled || self.playground.readonly {
            return true;
        }
        let meta = self.meta(port.node);
        match port.port_type {
            PortType::Input => meta.input_disable,
            PortType::Output => meta.output_disable,
        }
    }

    pub fn port_point(&self, id: PortId) -> Option<Point> {
        let port = self.port(id)?;
        let bounds = self.node_bounds(port.node).unwrap_or(Rect::ZERO);
        Some(port.point(&bounds))
    }

    pub fn port_bounds(&self, id: PortId) -> Option<Rect> {
        let port = self.port(id)?;
        let bounds = self.node_bounds(port.node).unwrap_or(Rect::ZERO);
        Some(port.bounds(&bounds, self.config.port_hit_size))
    }

    // ─── Line indexes ────────────────────────────────────────────────────

    pub fn node_lines(&self, node: NodeId) -> Option<&NodeLines> {
        self.components.get::<NodeLines>(node)
    }

    pub fn node_lines_mut(&mut self, node: NodeId) -> Option<&mut NodeLines> {
        self.components.get_mut::<NodeLines>(node)
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.ports.clear();
        self.components.clear();
        self.containment.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;

    fn store_with(ids: &[(&str, Option<&str>, Point)]) -> EntityStore {
        let mut store = EntityStore::new(Rc::new(EditorConfig::default()));
        for (id, parent, pos) in ids {
            let id = NodeId::intern(id);
            store.tree.add_node(
                parent.map(NodeId::intern),
                WorkflowNode::new(id, "test".into()),
            );
            store
                .components
                .insert(id, NodeTransform::new(*pos, Size::new(100.0, 40.0)));
            store.components.insert(id, NodeLines::default());
            store.init_static_ports(id);
        }
        store
    }

    #[test]
    fn absolute_position_accumulates_parents() {
        let mut store = store_with(&[
            ("st_outer", None, Point::new(100.0, 100.0)),
            ("st_inner", Some("st_outer"), Point::new(10.0, 20.0)),
        ]);
        let inner = NodeId::intern("st_inner");
        assert_eq!(store.absolute_position(inner), Some(Point::new(110.0, 120.0)));

        assert!(store.set_absolute_position(inner, Point::new(150.0, 150.0)));
        assert_eq!(store.transform(inner).unwrap().position, Point::new(50.0, 50.0));
    }

    #[test]
    fn ports_are_cached_by_composite_key() {
        let mut store = store_with(&[("st_ports", None, Point::ZERO)]);
        let node = NodeId::intern("st_ports");
        assert_eq!(store.node_ports(node).len(), 2);

        let a = store.get_or_create_port(node, PortType::Output, &PortKey::default());
        let b = store.get_or_create_port(node, PortType::Output, &PortKey::default());
        assert_eq!(a, b);
        assert_eq!(store.node_ports(node).len(), 2);

        assert!(store
            .get_or_create_port(NodeId::intern("st_missing"), PortType::Input, &PortKey::default())
            .is_none());
    }

    #[test]
    fn dynamic_ports_replace_stale_ones() {
        let mut store = store_with(&[("st_dyn", None, Point::ZERO)]);
        let node = NodeId::intern("st_dyn");

        let stale = store.sync_dynamic_ports(
            node,
            &[PortDecl::input(), PortDecl::new(PortType::Output, "a")],
        );
        assert_eq!(stale, vec![PortId::new(node, PortType::Output, &PortKey::default())]);
        assert_eq!(store.output_ports(node), vec![PortId::new(node, PortType::Output, &"a".into())]);
    }

    #[test]
    fn containment_pairs_both_ways() {
        let mut c = Containment::default();
        let container = NodeId::intern("loop_x");
        let canvas = NodeId::intern("loop_x_canvas");
        c.link(container, canvas);
        assert_eq!(c.partner(container), Some(canvas));
        assert_eq!(c.partner(canvas), Some(container));
        assert!(c.is_canvas(canvas));
        assert_eq!(c.unlink(canvas), Some(container));
        assert!(c.partner(container).is_none());
    }
}
