//! The workflow document: the single owner of the node tree, the lines and
//! the selection/hover state, and the JSON import/export boundary.
//!
//! Sub-canvas containers are imported as two nodes, the visible container
//! and a hidden canvas node (a sibling of the container) that owns the
//! nested blocks and lines. Export collapses the canvas node back into its
//! container.

use crate::config::EditorConfig;
use crate::error::{Error, Result};
use crate::event::{Emitter, Subscription};
use crate::id::{LineId, NodeId, NodeType, PortId};
use crate::index::{NodeLines, NodePorts};
use crate::layout::{avoid_overlap, centred_position};
use crate::line::{LineInfo, WorkflowLine};
use crate::lines::{LinePolicy, LinesManager};
use crate::model::{EdgeJson, NodeJson, WorkflowJson, set_meta_point};
use crate::node::WorkflowNode;
use crate::registry::{NodeRegistry, PortDecl};
use crate::selection::{EntityRef, HoverService, SelectService};
use crate::store::EntityStore;
use crate::transform::NodeTransform;
use kurbo::{Point, Vec2};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

// ─── Events & policy ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentChangeKind {
    AddNode,
    DeleteNode,
    MoveNode,
    NodeDataChange,
    AddLine,
    DeleteLine,
    LineDataChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentChangeEvent {
    pub kind: ContentChangeKind,
    pub entity: EntityRef,
    /// Set when the node was created as a copy of another one.
    pub is_clone: bool,
}

impl ContentChangeEvent {
    fn node(kind: ContentChangeKind, node: NodeId) -> Self {
        Self {
            kind,
            entity: EntityRef::Node(node),
            is_clone: false,
        }
    }

    fn line(kind: ContentChangeKind, line: LineId) -> Self {
        Self {
            kind,
            entity: EntityRef::Line(line),
            is_clone: false,
        }
    }
}

/// Host veto on node removal.
pub trait DocumentPolicy {
    fn can_remove(&self, _store: &EntityStore, _node: NodeId, _silent: bool) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDocumentPolicy;

impl DocumentPolicy for DefaultDocumentPolicy {}

// ─── Document ────────────────────────────────────────────────────────────

pub struct WorkflowDocument {
    pub store: EntityStore,
    pub lines: LinesManager,
    pub selection: SelectService,
    pub hover: HoverService,
    content_change: Emitter<ContentChangeEvent>,
    policy: Box<dyn DocumentPolicy>,
    disposed: bool,
}

impl Default for WorkflowDocument {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl WorkflowDocument {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            store: EntityStore::new(Rc::new(config)),
            lines: LinesManager::default(),
            selection: SelectService::new(),
            hover: HoverService::new(),
            content_change: Emitter::new(),
            policy: Box::new(DefaultDocumentPolicy),
            disposed: false,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.store.config
    }

    pub fn set_policy(&mut self, policy: Box<dyn DocumentPolicy>) {
        self.policy = policy;
    }

    pub fn set_line_policy(&mut self, policy: Box<dyn LinePolicy>) {
        self.lines.set_policy(policy);
    }

    pub fn register(&mut self, registry: NodeRegistry) {
        self.store.registries.register(registry);
    }

    pub fn on_content_change(
        &self,
        listener: impl Fn(&ContentChangeEvent) + 'static,
    ) -> Subscription {
        self.content_change.on(listener)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    // ─── Node queries ────────────────────────────────────────────────────

    pub fn get_node(&self, id: NodeId) -> Option<&WorkflowNode> {
        self.store.node(id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.store.has_node(id)
    }

    /// Every node in paint order, canvas nodes included.
    pub fn all_nodes(&self) -> Vec<NodeId> {
        self.store.tree.all_nodes()
    }

    /// Children as the user sees them: a sub-canvas container reports the
    /// children of its canvas node; canvas nodes themselves are hidden.
    pub fn visible_children(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        let parent = parent.map(|p| self.store.block_parent(p));
        self.store
            .tree
            .children(parent)
            .into_iter()
            .filter(|c| !self.store.containment.is_canvas(*c))
            .collect()
    }

    pub fn start_node(&self) -> Option<NodeId> {
        self.all_nodes()
            .into_iter()
            .find(|id| self.store.meta(*id).is_start)
    }

    pub fn end_node(&self) -> Option<NodeId> {
        self.all_nodes()
            .into_iter()
            .find(|id| self.store.meta(*id).is_node_end)
    }

    // ─── Import ──────────────────────────────────────────────────────────

    /// Replace the document content with `json`.
    pub fn from_json(&mut self, json: &WorkflowJson) -> Result<()> {
        self.ensure_live()?;
        self.clear();
        for node in &json.nodes {
            self.create_workflow_node(node, false, None)?;
        }
        for edge in &json.edges {
            self.create_line(LineInfo::from(edge));
        }
        log::debug!(
            "imported {} nodes and {} lines",
            self.store.tree.len(),
            self.lines.len()
        );
        Ok(())
    }

    pub fn load(&mut self, json: &str) -> Result<()> {
        let json = WorkflowJson::parse(json)?;
        self.from_json(&json)
    }

    /// Create the node described by `json` under `parent` (`None` = top
    /// level), or update it if it already exists. Recurses into `blocks`,
    /// then creates the block `edges`.
    pub fn create_workflow_node(
        &mut self,
        json: &NodeJson,
        is_clone: bool,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        self.ensure_live()?;
        let parent = parent.map(|p| self.store.block_parent(p));
        if let Some(p) = parent
            && !self.store.has_node(p)
        {
            return Err(Error::NodeNotFound(p.to_string()));
        }

        let id = json.id;
        if self.store.has_node(id) {
            self.update_from_json(json)?;
        } else {
            self.insert_node(json, is_clone, parent);
        }

        let meta = self.store.registries.get(&json.node_type).meta.clone();
        if let Some(resolver) = &meta.sub_canvas {
            let sub = resolver(id);
            if !self.store.has_node(sub.canvas_id) {
                let container = self
                    .store
                    .transform(id)
                    .map(|t| t.position)
                    .unwrap_or(Point::ZERO);
                let position = json
                    .canvas_position()
                    .unwrap_or(container + sub.offset);
                let canvas = NodeJson::new(sub.canvas_id, sub.canvas_type.clone())
                    .with_position(position);
                self.insert_node(&canvas, is_clone, parent);
            }
            self.store.containment.link(id, sub.canvas_id);
        }

        if let Some(blocks) = &json.blocks {
            let block_parent = self.store.block_parent(id);
            for block in blocks {
                self.create_workflow_node(block, is_clone, Some(block_parent))?;
            }
        }
        if let Some(edges) = &json.edges {
            let canvas = self.store.containment.canvas_of(id);
            for edge in edges {
                let mut info = LineInfo::from(edge);
                if let Some(canvas) = canvas {
                    if info.from == id {
                        info.from = canvas;
                    }
                    if info.to == Some(id) {
                        info.to = Some(canvas);
                    }
                }
                self.create_line(info);
            }
        }
        Ok(id)
    }

    fn insert_node(&mut self, json: &NodeJson, is_clone: bool, parent: Option<NodeId>) {
        let id = json.id;
        let origin = parent
            .and_then(|p| self.store.absolute_position(p))
            .unwrap_or(Point::ZERO);
        let position = match json.position() {
            Some(position) => position,
            None => (self.default_position_in(&json.node_type, parent) - origin).to_point(),
        };
        let size = self
            .store
            .registries
            .get(&json.node_type)
            .meta
            .size
            .unwrap_or(self.store.config.default_node_size);

        let mut node = WorkflowNode::new(id, json.node_type.clone());
        node.meta = json.meta.clone().unwrap_or_default();
        node.data = json.data.clone();
        self.store.tree.add_node(parent, node);
        self.store
            .components
            .insert(id, NodeTransform::new(position, size));
        self.store.components.insert(id, NodePorts::default());
        self.store.components.insert(id, NodeLines::default());
        self.store.init_static_ports(id);

        log::debug!("node created {id:?} ({})", json.node_type);
        self.content_change.fire(&ContentChangeEvent {
            kind: ContentChangeKind::AddNode,
            entity: EntityRef::Node(id),
            is_clone,
        });
    }

    fn update_from_json(&mut self, json: &NodeJson) -> Result<()> {
        let id = json.id;
        if let Some(position) = json.position() {
            self.move_node(id, position)?;
        }
        if let Some(node) = self.store.tree.get_mut(id)
            && let Some(meta) = &json.meta
        {
            node.meta = meta.clone();
        }
        if let Some(data) = &json.data {
            self.update_node_data(id, data.clone())?;
        }
        Ok(())
    }

    /// Create a node of `node_type`. The id comes from `template` when given
    /// (it must not exist yet), otherwise a fresh `{type}_{n}` id is
    /// generated. `position` overrides the template's position.
    pub fn create_workflow_node_by_type(
        &mut self,
        node_type: impl Into<NodeType>,
        position: Option<Point>,
        template: Option<NodeJson>,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        self.ensure_live()?;
        let node_type = node_type.into();
        let mut json = match template {
            Some(template) => {
                if self.store.has_node(template.id) {
                    return Err(Error::DuplicateNodeId(template.id));
                }
                template
            }
            None => NodeJson::new(self.generate_node_id(&node_type), node_type.clone()),
        };
        json.node_type = node_type;
        if let Some(position) = position {
            json = json.with_position(position);
        }
        self.create_workflow_node(&json, false, parent)
    }

    fn generate_node_id(&self, node_type: &NodeType) -> NodeId {
        let prefix = node_type.to_string();
        loop {
            let id = NodeId::with_prefix(&prefix);
            if !self.store.has_node(id) {
                return id;
            }
        }
    }

    /// Duplicate a node (and its blocks) with fresh ids. The copy lands at
    /// `position`, or one overlap step away from the original.
    pub fn copy_node(
        &mut self,
        id: NodeId,
        new_id: Option<NodeId>,
        position: Option<Point>,
    ) -> Result<NodeId> {
        self.ensure_live()?;
        let json = self.to_node_json(id)?;
        if let Some(new_id) = new_id
            && self.store.has_node(new_id)
        {
            return Err(Error::DuplicateNodeId(new_id));
        }

        let mut ids = HashMap::new();
        collect_copy_ids(&json, &mut ids, |node| self.generate_node_id(&node.node_type));
        if let Some(new_id) = new_id {
            ids.insert(id, new_id);
        }
        let mut copy = remap_node_json(&json, &ids);

        let step = self.store.config.overlap_step;
        let position = position.unwrap_or_else(|| {
            json.position().unwrap_or(Point::ZERO) + Vec2::new(step, step)
        });
        copy = copy.with_position(position);
        if let Some(meta) = copy.meta.as_mut() {
            meta.remove("canvasPosition");
        }

        let parent = self.store.tree.parent(id);
        self.create_workflow_node(&copy, true, parent)
    }

    // ─── Export ──────────────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<WorkflowJson> {
        self.ensure_live()?;
        let mut edges = self.edges_by_block();
        let nodes = self
            .visible_children(None)
            .into_iter()
            .map(|id| self.export_node(id, &edges))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("exported {} top-level nodes", nodes.len());
        Ok(WorkflowJson {
            nodes,
            edges: edges.remove(&None).unwrap_or_default(),
        })
    }

    pub fn to_node_json(&self, id: NodeId) -> Result<NodeJson> {
        self.ensure_live()?;
        if !self.store.has_node(id) {
            return Err(Error::NodeNotFound(id.to_string()));
        }
        self.export_node(id, &self.edges_by_block())
    }

    fn export_node(
        &self,
        id: NodeId,
        edges: &HashMap<Option<NodeId>, Vec<EdgeJson>>,
    ) -> Result<NodeJson> {
        let node = self
            .store
            .node(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        let registry = self.store.registries.get(&node.node_type);

        let mut meta = node.meta.clone();
        if let Some(t) = self.store.transform(id) {
            set_meta_point(&mut meta, "position", t.position);
        }
        if let Some(canvas) = self.store.containment.canvas_of(id)
            && let (Some(canvas_t), Some(resolver)) =
                (self.store.transform(canvas), &registry.meta.sub_canvas)
        {
            let default = self
                .store
                .transform(id)
                .map(|t| t.position + resolver(id).offset);
            if meta.contains_key("canvasPosition") || default != Some(canvas_t.position) {
                set_meta_point(&mut meta, "canvasPosition", canvas_t.position);
            }
        }

        let data = match &registry.data_serializer {
            Some(hook) => (hook.0)(node).map_err(|reason| Error::Serialize { node: id, reason })?,
            None => node.data.clone(),
        };

        let blocks = self
            .visible_children(Some(id))
            .into_iter()
            .map(|child| self.export_node(child, edges))
            .collect::<Result<Vec<_>>>()?;
        let block_edges = edges
            .get(&Some(self.store.block_parent(id)))
            .cloned()
            .unwrap_or_default();

        Ok(NodeJson {
            id,
            node_type: node.node_type.clone(),
            meta: (!meta.is_empty()).then_some(meta),
            data,
            blocks: (!blocks.is_empty()).then_some(blocks),
            edges: (!block_edges.is_empty()).then_some(block_edges),
        })
    }

    /// Attached lines grouped by the block they are exported in, in line
    /// creation order. Canvas ids are mapped back to their containers and
    /// container ⇄ own-canvas lines are dropped.
    fn edges_by_block(&self) -> HashMap<Option<NodeId>, Vec<EdgeJson>> {
        let containment = &self.store.containment;
        let mut by_block: HashMap<Option<NodeId>, Vec<EdgeJson>> = HashMap::new();
        for line in self.lines.available_lines() {
            let Some(to) = line.to else { continue };
            if containment.partner(line.from) == Some(to) {
                continue;
            }
            let block = self.common_block(line.from, to);
            if let Some(edge) =
                line.to_edge_json(|n| containment.container_of(n).unwrap_or(n))
            {
                by_block.entry(block).or_default().push(edge);
            }
        }
        by_block
    }

    /// Lowest block shared by both endpoints of a line.
    fn common_block(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let chain = |n: NodeId| {
            let mut chain = Vec::new();
            let mut key = self.store.block_key(n);
            while let Some(k) = key {
                chain.push(k);
                key = self.store.tree.parent(k);
            }
            chain
        };
        let chain_b = chain(b);
        chain(a).into_iter().find(|k| chain_b.contains(k))
    }

    // ─── Placement ───────────────────────────────────────────────────────

    /// Viewport centre (shifted up by half the registered height), pushed
    /// off any top-level node already sitting there.
    pub fn get_node_default_position(&self, node_type: &NodeType) -> Point {
        self.default_position_in(node_type, None)
    }

    fn default_position_in(&self, node_type: &NodeType, parent: Option<NodeId>) -> Point {
        let height = self
            .store
            .registries
            .get(node_type)
            .meta
            .size
            .map(|s| s.height);
        let candidate = centred_position(self.store.playground.viewport_center(), height);
        let siblings: Vec<Point> = self
            .store
            .tree
            .children(parent)
            .into_iter()
            .filter_map(|id| self.store.absolute_position(id))
            .collect();
        let config = &self.store.config;
        avoid_overlap(
            candidate,
            &siblings,
            config.overlap_tolerance,
            config.overlap_step,
        )
    }

    pub fn move_node(&mut self, id: NodeId, position: Point) -> Result<()> {
        if !self.store.has_node(id) {
            return Err(Error::NodeNotFound(id.to_string()));
        }
        if self.store.set_position(id, position) {
            self.content_change
                .fire(&ContentChangeEvent::node(ContentChangeKind::MoveNode, id));
        }
        Ok(())
    }

    pub fn set_node_absolute_position(&mut self, id: NodeId, absolute: Point) -> Result<()> {
        if !self.store.has_node(id) {
            return Err(Error::NodeNotFound(id.to_string()));
        }
        if self.store.set_absolute_position(id, absolute) {
            self.content_change
                .fire(&ContentChangeEvent::node(ContentChangeKind::MoveNode, id));
        }
        Ok(())
    }

    pub fn bring_to_front(&mut self, id: NodeId) -> bool {
        self.store.tree.bring_to_front(id)
    }

    pub fn update_node_data(&mut self, id: NodeId, data: Value) -> Result<()> {
        let node = self
            .store
            .tree
            .get_mut(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        if node.data.as_ref() == Some(&data) {
            return Ok(());
        }
        node.data = Some(data);
        self.content_change
            .fire(&ContentChangeEvent::node(ContentChangeKind::NodeDataChange, id));
        Ok(())
    }

    // ─── Reachability ────────────────────────────────────────────────────

    /// Nodes reachable from the start node along lines, plus the end node
    /// and every node inside a container. Start and reached nodes come in
    /// breadth-first order, the structural seeds last.
    pub fn get_associated_nodes(&self) -> Vec<NodeId> {
        let end = self.end_node();
        let mut seeds: Vec<NodeId> = end.into_iter().collect();
        seeds.extend(
            self.all_nodes()
                .into_iter()
                .filter(|id| self.store.is_in_container(*id) && Some(*id) != end),
        );
        let mut visited: HashSet<NodeId> = seeds.iter().copied().collect();

        let mut reached = Vec::new();
        if let Some(start) = self.start_node()
            && visited.insert(start)
        {
            let mut queue = VecDeque::from([start]);
            reached.push(start);
            while let Some(id) = queue.pop_front() {
                for next in self.output_nodes(id) {
                    if visited.insert(next) {
                        reached.push(next);
                        queue.push_back(next);
                    }
                }
            }
        }
        reached.extend(seeds);
        reached
    }

    /// Distinct targets of the node's outgoing lines.
    pub fn output_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(index) = self.store.node_lines(id) {
            for line in &index.output_lines {
                if let Some(to) = self.lines.get(*line).and_then(|l| l.to)
                    && !out.contains(&to)
                {
                    out.push(to);
                }
            }
        }
        out
    }

    /// Distinct sources of the node's incoming lines.
    pub fn input_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(index) = self.store.node_lines(id) {
            for line in &index.input_lines {
                if let Some(from) = self.lines.get(*line).map(|l| l.from)
                    && !out.contains(&from)
                {
                    out.push(from);
                }
            }
        }
        out
    }

    /// Transitive downstream nodes within the node's own block.
    pub fn all_output_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.walk_block(id, |n| self.output_nodes(n))
    }

    /// Transitive upstream nodes within the node's own block.
    pub fn all_input_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.walk_block(id, |n| self.input_nodes(n))
    }

    fn walk_block(&self, id: NodeId, next: impl Fn(NodeId) -> Vec<NodeId>) -> Vec<NodeId> {
        let block = self.store.tree.parent(id);
        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut out = Vec::new();
        while let Some(n) = queue.pop_front() {
            for m in next(n) {
                if self.store.tree.parent(m) == block && visited.insert(m) {
                    out.push(m);
                    queue.push_back(m);
                }
            }
        }
        out
    }

    // ─── Lines ───────────────────────────────────────────────────────────

    /// Create (or find) a line; see [`LinesManager::create_line`].
    pub fn create_line(&mut self, info: LineInfo) -> Option<LineId> {
        let existed = self.lines.contains(info.id());
        let attached = info.to.is_some();
        let id = self.lines.create_line(&mut self.store, info)?;
        if !existed && attached {
            self.content_change
                .fire(&ContentChangeEvent::line(ContentChangeKind::AddLine, id));
        }
        Some(id)
    }

    pub fn dispose_line(&mut self, id: LineId) -> Option<WorkflowLine> {
        let line = self.lines.dispose_line(&mut self.store, id)?;
        self.selection.forget(EntityRef::Line(id));
        if self.hover.is_hovered(EntityRef::Line(id)) {
            self.hover.clear();
        }
        if !line.is_drawing() {
            self.content_change
                .fire(&ContentChangeEvent::line(ContentChangeKind::DeleteLine, id));
        }
        Some(line)
    }

    /// Attach a drawing line to a port.
    pub fn set_line_to_port(&mut self, id: LineId, to: PortId) -> Result<LineId> {
        let new_id = self.lines.set_to_port(&mut self.store, id, to)?;
        self.content_change
            .fire(&ContentChangeEvent::line(ContentChangeKind::AddLine, new_id));
        Ok(new_id)
    }

    /// Mutate a line's display state (flowing, processing, disabled, ...).
    pub fn update_line(&mut self, id: LineId, f: impl FnOnce(&mut WorkflowLine)) -> bool {
        let Some(line) = self.lines.get_mut(id) else {
            return false;
        };
        f(line);
        self.lines.validate_line(&mut self.store, id);
        self.content_change
            .fire(&ContentChangeEvent::line(ContentChangeKind::LineDataChange, id));
        true
    }

    /// Replace the ports discovered from the rendered node. Ports no longer
    /// declared are disposed with their lines.
    pub fn update_dynamic_ports(&mut self, node: NodeId, decls: &[PortDecl]) -> Result<()> {
        if !self.store.has_node(node) {
            return Err(Error::NodeNotFound(node.to_string()));
        }
        for port in self.store.sync_dynamic_ports(node, decls) {
            for line in self.lines.port_lines(&self.store, port) {
                self.dispose_line(line);
            }
            self.store.remove_port(port);
            self.selection.forget(EntityRef::Port(port));
        }
        self.lines.validate(&mut self.store);
        Ok(())
    }

    // ─── Hover ───────────────────────────────────────────────────────────

    /// Hover the port, line or node under `pos`, in that order.
    pub fn update_hover_from_pointer(&mut self, pos: Point) -> Option<EntityRef> {
        let hovered = if let Some(port) = self.lines.get_port_from_mouse_pos(&self.store, pos) {
            Some(EntityRef::Port(port))
        } else if let Some(line) = self.lines.line_from_mouse_pos(&self.store, pos) {
            Some(EntityRef::Line(line))
        } else {
            let selected = self.selection.selected_nodes();
            self.lines
                .get_node_from_mouse_pos(&self.store, pos, &selected)
                .map(EntityRef::Node)
        };
        self.hover.set_hovered(hovered);
        hovered
    }

    // ─── Removal ─────────────────────────────────────────────────────────

    pub fn can_remove(&self, id: NodeId, silent: bool) -> bool {
        if !self.store.has_node(id) || self.store.meta(id).delete_disable {
            return false;
        }
        let allowed = self.policy.can_remove(&self.store, id, silent);
        if !allowed && !silent {
            log::warn!("removal of {id:?} rejected by policy");
        }
        allowed
    }

    /// Dispose a node: its children, its lines, its ports, and the other
    /// half of its sub-canvas pair. Returns false for unknown ids.
    pub fn dispose_node(&mut self, id: NodeId) -> bool {
        if !self.store.has_node(id) {
            return false;
        }
        let partner = self.store.containment.unlink(id);

        for child in self.store.tree.children(Some(id)) {
            self.dispose_node(child);
        }
        let line_ids: Vec<LineId> = self
            .store
            .node_lines(id)
            .map(|index| index.all().collect())
            .unwrap_or_default();
        for line in line_ids {
            self.dispose_line(line);
        }
        for port in self.store.node_ports(id) {
            self.store.remove_port(port);
            self.selection.forget(EntityRef::Port(port));
        }
        self.store.components.remove_entity(id);
        self.store.tree.remove_node(id);
        self.selection.forget(EntityRef::Node(id));
        let stale_hover = match self.hover.hovered() {
            Some(EntityRef::Node(n)) => n == id,
            Some(EntityRef::Port(p)) => !self.store.ports.contains_key(&p),
            _ => false,
        };
        if stale_hover {
            self.hover.clear();
        }

        log::debug!("node disposed {id:?}");
        self.content_change
            .fire(&ContentChangeEvent::node(ContentChangeKind::DeleteNode, id));

        if let Some(partner) = partner {
            self.dispose_node(partner);
        }
        true
    }

    /// Remove every node and line, keeping registrations and listeners.
    pub fn clear(&mut self) {
        for id in self.store.tree.children(None) {
            self.dispose_node(id);
        }
        self.lines.clear(&mut self.store);
        self.store.clear();
        self.selection.clear();
        self.hover.clear();
    }

    /// Tear the document down: nodes, then lines, then ports, then the
    /// selection. Every later call that returns `Result` fails with
    /// [`Error::Disposed`].
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.clear();
        self.content_change.clear();
        self.disposed = true;
        log::debug!("document disposed");
    }
}

// ─── Copy helpers ────────────────────────────────────────────────────────

fn collect_copy_ids(
    json: &NodeJson,
    ids: &mut HashMap<NodeId, NodeId>,
    fresh: impl Fn(&NodeJson) -> NodeId + Copy,
) {
    ids.insert(json.id, fresh(json));
    for block in json.blocks.iter().flatten() {
        collect_copy_ids(block, ids, fresh);
    }
}

fn remap_node_json(json: &NodeJson, ids: &HashMap<NodeId, NodeId>) -> NodeJson {
    let map = |id: NodeId| ids.get(&id).copied().unwrap_or(id);
    NodeJson {
        id: map(json.id),
        node_type: json.node_type.clone(),
        meta: json.meta.clone(),
        data: json.data.clone(),
        blocks: json
            .blocks
            .as_ref()
            .map(|blocks| blocks.iter().map(|b| remap_node_json(b, ids)).collect()),
        edges: json.edges.as_ref().map(|edges| {
            edges
                .iter()
                .map(|e| EdgeJson {
                    source_node_id: map(e.source_node_id),
                    target_node_id: map(e.target_node_id),
                    ..e.clone()
                })
                .collect()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubCanvas;
    use kurbo::{Size, Vec2};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn doc() -> WorkflowDocument {
        let mut doc = WorkflowDocument::default();
        doc.register(NodeRegistry::start("start"));
        doc.register(NodeRegistry::end("end"));
        doc.register(NodeRegistry::new("llm").with_size(Size::new(360.0, 100.0)));
        doc.register(
            NodeRegistry::new("loop").with_sub_canvas(|id| SubCanvas {
                canvas_id: NodeId::intern(&format!("{id}_canvas")),
                canvas_type: "sub_canvas".into(),
                offset: Vec2::new(0.0, 200.0),
            }),
        );
        doc
    }

    #[test]
    fn default_position_centres_and_avoids_overlap() {
        let mut doc = doc();
        doc.store.playground.scroll = Vec2::new(-640.0, -400.0);
        let llm: NodeType = "llm".into();
        assert_eq!(doc.get_node_default_position(&llm), Point::new(0.0, -50.0));

        doc.create_workflow_node_by_type("llm", None, None, None).unwrap();
        assert_eq!(doc.get_node_default_position(&llm), Point::new(30.0, -20.0));
    }

    #[test]
    fn generated_ids_use_the_type_prefix() {
        let mut doc = doc();
        let id = doc
            .create_workflow_node_by_type("llm", Some(Point::ZERO), None, None)
            .unwrap();
        assert!(id.as_str().starts_with("llm_"));

        let dup = NodeJson::new(id, "llm");
        assert!(matches!(
            doc.create_workflow_node_by_type("llm", None, Some(dup), None),
            Err(Error::DuplicateNodeId(d)) if d == id
        ));
    }

    #[test]
    fn delete_disabled_nodes_cannot_be_removed() {
        let mut doc = doc();
        let start = NodeJson::new(NodeId::intern("doc_start"), "start");
        doc.create_workflow_node(&start, false, None).unwrap();
        assert!(!doc.can_remove(start.id, true));

        let llm = doc
            .create_workflow_node_by_type("llm", Some(Point::ZERO), None, None)
            .unwrap();
        assert!(doc.can_remove(llm, true));

        struct Never;
        impl DocumentPolicy for Never {
            fn can_remove(&self, _: &EntityStore, _: NodeId, _: bool) -> bool {
                false
            }
        }
        doc.set_policy(Box::new(Never));
        assert!(!doc.can_remove(llm, true));
    }

    #[test]
    fn sub_canvas_pair_disposes_together() {
        let mut doc = doc();
        let container = doc
            .create_workflow_node_by_type("loop", Some(Point::new(100.0, 100.0)), None, None)
            .unwrap();
        let canvas = doc.store.containment.canvas_of(container).unwrap();
        assert_eq!(
            doc.store.absolute_position(canvas),
            Some(Point::new(100.0, 300.0))
        );

        let child = doc
            .create_workflow_node_by_type(
                "llm",
                Some(Point::new(0.0, 40.0)),
                None,
                Some(container),
            )
            .unwrap();
        assert_eq!(doc.store.tree.parent(child), Some(canvas));
        assert_eq!(doc.visible_children(Some(container)), vec![child]);

        assert!(doc.dispose_node(canvas));
        assert!(!doc.has_node(container));
        assert!(!doc.has_node(child));
        assert!(doc.store.ports.is_empty());
    }

    #[test]
    fn copy_node_remaps_nested_ids() {
        let mut doc = doc();
        let json: NodeJson = serde_json::from_value(serde_json::json!({
            "id": "group_0",
            "type": "group",
            "meta": { "position": { "x": 0, "y": 0 } },
            "blocks": [
                { "id": "g_a", "type": "llm", "meta": { "position": { "x": 0, "y": 40 } } },
                { "id": "g_b", "type": "llm", "meta": { "position": { "x": 400, "y": 40 } } }
            ],
            "edges": [ { "sourceNodeID": "g_a", "targetNodeID": "g_b" } ]
        }))
        .unwrap();
        doc.register(NodeRegistry::new("group").container());
        doc.create_workflow_node(&json, false, None).unwrap();

        let clones = Rc::new(RefCell::new(0));
        let sink = clones.clone();
        doc.on_content_change(move |e| {
            if e.kind == ContentChangeKind::AddNode && e.is_clone {
                *sink.borrow_mut() += 1;
            }
        })
        .detach();

        let copy = doc.copy_node(json.id, None, None).unwrap();
        assert_eq!(*clones.borrow(), 3);
        assert_eq!(
            doc.store.transform(copy).unwrap().position,
            Point::new(30.0, 30.0)
        );
        let children = doc.visible_children(Some(copy));
        assert_eq!(children.len(), 2);
        assert_eq!(doc.output_nodes(children[0]), vec![children[1]]);
        assert_eq!(doc.lines.len(), 2);
    }

    #[test]
    fn disposed_document_refuses_export() {
        let mut doc = doc();
        doc.dispose();
        assert!(matches!(doc.to_json(), Err(Error::Disposed)));
    }

    #[test]
    fn serializer_errors_abort_export() {
        let mut doc = doc();
        doc.register(
            NodeRegistry::new("form").with_data_serializer(|_| Err("title is required".into())),
        );
        doc.create_workflow_node_by_type("form", Some(Point::ZERO), None, None)
            .unwrap();
        assert!(matches!(doc.to_json(), Err(Error::Serialize { .. })));
    }
}
