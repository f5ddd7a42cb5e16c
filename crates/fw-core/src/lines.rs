//! The lines manager: line lifecycle, connection legality and screen-space
//! hit-testing.
//!
//! Lines are kept in creation order. A line is registered into the
//! [`NodeLines`] index of both endpoint nodes, and every mutation that can
//! change an error flag re-validates the affected ports before returning.

use crate::error::{Error, Result};
use crate::event::{Emitter, Subscription};
use crate::id::{LineId, NodeId, PortId, PortType};
use crate::index::NodeLines;
use crate::line::{LineInfo, WorkflowLine, distance_to_path};
use crate::port::WorkflowPort;
use crate::selection::{EntityRef, HoverService, SelectService};
use crate::store::EntityStore;
use crate::transform::rect_contains;
use indexmap::IndexMap;
use kurbo::Point;

// ─── Policy ──────────────────────────────────────────────────────────────

/// Host hooks consulted by the lines manager. Every hook returns a plain
/// answer and must not mutate anything.
pub trait LinePolicy {
    /// Runs after the hard-coded prerequisites of [`LinesManager::can_add_line`].
    fn can_add_line(
        &self,
        _store: &EntityStore,
        from: &WorkflowPort,
        to: &WorkflowPort,
        _silent: bool,
    ) -> bool {
        from.node != to.node
    }

    /// `new_info` is the line that will replace it when reconnecting.
    fn can_remove_line(
        &self,
        _line: &WorkflowLine,
        _new_info: Option<&LineInfo>,
        _silent: bool,
    ) -> bool {
        true
    }

    fn can_reset_line(&self, _old: &WorkflowLine, _new_info: &LineInfo) -> bool {
        true
    }

    fn is_error_line(&self, line: &WorkflowLine) -> bool {
        line.to == Some(line.from)
    }

    fn is_hide_line(&self, _line: &WorkflowLine) -> bool {
        false
    }

    fn is_flowing_line(&self, _line: &WorkflowLine) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLinePolicy;

impl LinePolicy for DefaultLinePolicy {}

/// Emitted for lines whose both endpoints resolve to nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum LinesChange {
    Added(LineInfo),
    Removed(LineInfo),
}

// ─── Manager ─────────────────────────────────────────────────────────────

pub struct LinesManager {
    lines: IndexMap<LineId, WorkflowLine>,
    policy: Box<dyn LinePolicy>,
    available_change: Emitter<LinesChange>,
}

impl Default for LinesManager {
    fn default() -> Self {
        Self::new(Box::new(DefaultLinePolicy))
    }
}

impl LinesManager {
    pub fn new(policy: Box<dyn LinePolicy>) -> Self {
        Self {
            lines: IndexMap::new(),
            policy,
            available_change: Emitter::new(),
        }
    }

    pub fn set_policy(&mut self, policy: Box<dyn LinePolicy>) {
        self.policy = policy;
    }

    pub fn policy(&self) -> &dyn LinePolicy {
        self.policy.as_ref()
    }

    pub fn on_available_lines_change(
        &self,
        listener: impl Fn(&LinesChange) + 'static,
    ) -> Subscription {
        self.available_change.on(listener)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn get(&self, id: LineId) -> Option<&WorkflowLine> {
        self.lines.get(&id)
    }

    pub fn get_mut(&mut self, id: LineId) -> Option<&mut WorkflowLine> {
        self.lines.get_mut(&id)
    }

    pub fn contains(&self, id: LineId) -> bool {
        self.lines.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Every line in creation order, drawing lines included.
    pub fn all_lines(&self) -> impl Iterator<Item = &WorkflowLine> {
        self.lines.values()
    }

    /// Lines with both endpoints attached.
    pub fn available_lines(&self) -> impl Iterator<Item = &WorkflowLine> {
        self.lines.values().filter(|l| !l.is_drawing())
    }

    /// True if some attached line goes from `from` to `to`, any ports.
    pub fn has_line(&self, from: NodeId, to: NodeId) -> bool {
        self.available_lines()
            .any(|l| l.from == from && l.to == Some(to))
    }

    /// Lines attached to a port, looked up through the owning node's index.
    pub fn port_lines(&self, store: &EntityStore, port: PortId) -> Vec<LineId> {
        let Some(owner) = store.port(port) else {
            return Vec::new();
        };
        let Some(index) = store.node_lines(owner.node) else {
            return Vec::new();
        };
        index
            .all()
            .filter(|id| {
                self.lines.get(id).is_some_and(|l| {
                    l.from_port_id() == port || l.to_port_id() == Some(port)
                })
            })
            .collect()
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Create the line described by `info`, or return the existing one with
    /// the same identity (its highlight is cleared and it is re-validated).
    ///
    /// Returns `None` if `from` (or a given `to`) does not resolve to a node.
    pub fn create_line(&mut self, store: &mut EntityStore, info: LineInfo) -> Option<LineId> {
        let id = info.id();
        if let Some(line) = self.lines.get_mut(&id) {
            line.highlight_color = None;
            if info.drawing_to.is_some() {
                line.drawing_to = info.drawing_to;
            }
            self.validate_line(store, id);
            return Some(id);
        }

        if !store.has_node(info.from) {
            log::debug!("create_line: from node {:?} not found", info.from);
            return None;
        }
        if let Some(to) = info.to
            && !store.has_node(to)
        {
            log::debug!("create_line: to node {to:?} not found");
            return None;
        }

        store.get_or_create_port(info.from, PortType::Output, &info.from_port);
        if let Some(to) = info.to {
            store.get_or_create_port(to, PortType::Input, &info.to_port);
        }

        let line = WorkflowLine::new(&info);
        self.lines.insert(id, line);
        self.register(store, id);
        self.validate_line(store, id);

        log::debug!("line created {id:?}");
        if info.to.is_some() {
            self.available_change.fire(&LinesChange::Added(info));
        }
        Some(id)
    }

    fn register(&self, store: &mut EntityStore, id: LineId) {
        let Some(line) = self.lines.get(&id) else {
            return;
        };
        store
            .components
            .get_or_default::<NodeLines>(line.from)
            .add_output(id);
        if let Some(to) = line.to {
            store.components.get_or_default::<NodeLines>(to).add_input(id);
        }
    }

    fn unregister(store: &mut EntityStore, line: &WorkflowLine) {
        if let Some(index) = store.node_lines_mut(line.from) {
            index.remove(line.id);
        }
        if let Some(to) = line.to
            && let Some(index) = store.node_lines_mut(to)
        {
            index.remove(line.id);
        }
    }

    /// Remove a line and re-validate the ports it was attached to.
    pub fn dispose_line(&mut self, store: &mut EntityStore, id: LineId) -> Option<WorkflowLine> {
        let line = self.lines.shift_remove(&id)?;
        Self::unregister(store, &line);
        self.validate_port(store, line.from_port_id());
        if let Some(port) = line.to_port_id() {
            self.validate_port(store, port);
        }
        log::debug!("line disposed {id:?}");
        if !line.is_drawing() {
            self.available_change.fire(&LinesChange::Removed(line.info()));
        }
        Some(line)
    }

    /// Dispose every line attached to `node`.
    pub fn dispose_node_lines(&mut self, store: &mut EntityStore, node: NodeId) -> Vec<WorkflowLine> {
        let ids: Vec<LineId> = store
            .node_lines(node)
            .map(|index| index.all().collect())
            .unwrap_or_default();
        ids.into_iter()
            .filter_map(|id| self.dispose_line(store, id))
            .collect()
    }

    /// Dispose every line attached to `port`.
    pub fn dispose_port_lines(&mut self, store: &mut EntityStore, port: PortId) -> Vec<WorkflowLine> {
        self.port_lines(store, port)
            .into_iter()
            .filter_map(|id| self.dispose_line(store, id))
            .collect()
    }

    /// Attach a drawing line to `to`. The line takes the identity of its new
    /// endpoints; if that line already exists the drawing line is dropped
    /// and the existing id is returned.
    pub fn set_to_port(
        &mut self,
        store: &mut EntityStore,
        id: LineId,
        to: PortId,
    ) -> Result<LineId> {
        let line = self
            .lines
            .get(&id)
            .ok_or(Error::LineNotFound(id))?;
        if !line.is_drawing() {
            return Err(Error::LineNotDrawing(id));
        }
        let port = store
            .port(to)
            .ok_or_else(|| Error::PortNotFound(to.as_str().to_string()))?;
        let mut info = line.info();
        info.to = Some(port.node);
        info.to_port = port.key.clone();
        info.drawing_to = None;

        self.dispose_line(store, id);
        self.create_line(store, info)
            .ok_or_else(|| Error::PortNotFound(to.as_str().to_string()))
    }

    /// Move the floating end of a drawing line.
    pub fn set_drawing_to(&mut self, id: LineId, point: Point) {
        if let Some(line) = self.lines.get_mut(&id) {
            line.drawing_to = Some(point);
        }
    }

    pub fn set_highlight(&mut self, id: LineId, color: Option<String>) {
        if let Some(line) = self.lines.get_mut(&id) {
            line.highlight_color = color;
        }
    }

    pub fn clear(&mut self, store: &mut EntityStore) {
        let ids: Vec<LineId> = self.lines.keys().copied().collect();
        for id in ids {
            self.dispose_line(store, id);
        }
    }

    // ─── Validation ──────────────────────────────────────────────────────

    /// Recompute the line's error flag, then its ports'.
    pub fn validate_line(&mut self, store: &mut EntityStore, id: LineId) {
        let Some(line) = self.lines.get(&id) else {
            return;
        };
        let has_error = self.policy.is_error_line(line);
        let (from_port, to_port) = (line.from_port_id(), line.to_port_id());
        if let Some(line) = self.lines.get_mut(&id) {
            line.has_error = has_error;
        }
        self.validate_port(store, from_port);
        if let Some(port) = to_port {
            self.validate_port(store, port);
        }
    }

    /// A port is in error while any of its lines is.
    pub fn validate_port(&self, store: &mut EntityStore, port: PortId) {
        let has_error = self
            .port_lines(store, port)
            .iter()
            .any(|id| self.lines.get(id).is_some_and(|l| l.has_error));
        if let Some(p) = store.port_mut(port) {
            p.has_error = has_error;
        }
    }

    pub fn validate(&mut self, store: &mut EntityStore) {
        let ids: Vec<LineId> = self.lines.keys().copied().collect();
        for id in ids {
            self.validate_line(store, id);
        }
    }

    // ─── Legality ────────────────────────────────────────────────────────

    pub fn can_add_line(&self, store: &EntityStore, from: PortId, to: PortId, silent: bool) -> bool {
        if from == to {
            return false;
        }
        let (Some(from_port), Some(to_port)) = (store.port(from), store.port(to)) else {
            return false;
        };
        if from_port.node == to_port.node
            || !from_port.is_output()
            || !to_port.is_input()
            || store.port_disabled(to)
        {
            return false;
        }
        let allowed = self.policy.can_add_line(store, from_port, to_port, silent);
        if !allowed && !silent {
            log::warn!("line {from:?} -> {to:?} rejected by policy");
        }
        allowed
    }

    pub fn can_remove_line(&self, id: LineId, new_info: Option<&LineInfo>, silent: bool) -> bool {
        self.lines
            .get(&id)
            .is_some_and(|line| self.policy.can_remove_line(line, new_info, silent))
    }

    pub fn can_reset_line(&self, id: LineId, new_info: &LineInfo) -> bool {
        self.lines
            .get(&id)
            .is_some_and(|line| self.policy.can_reset_line(line, new_info))
    }

    // ─── Hit-testing ─────────────────────────────────────────────────────

    /// The port under `pos`, unless another node paints over it.
    pub fn get_port_from_mouse_pos(&self, store: &EntityStore, pos: Point) -> Option<PortId> {
        let mut candidates: Vec<(PortId, f64)> = store
            .ports
            .keys()
            .filter_map(|id| {
                let bounds = store.port_bounds(*id)?;
                if !rect_contains(&bounds, pos) {
                    return None;
                }
                let point = store.port_point(*id)?;
                Some((*id, point.distance(pos)))
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let topmost = store.topmost_node_at(pos, 0.0);
        candidates.into_iter().map(|(id, _)| id).find(|id| {
            match (topmost, store.port(*id)) {
                (None, Some(_)) => true,
                (Some(top), Some(port)) => top == port.node,
                _ => false,
            }
        })
    }

    /// The node under `pos`, preferring a selected one.
    pub fn get_node_from_mouse_pos(
        &self,
        store: &EntityStore,
        pos: Point,
        selected: &[NodeId],
    ) -> Option<NodeId> {
        let padding = store.config.node_hover_padding / store.playground.zoom;
        let hits = store.nodes_at(pos, padding);
        hits.iter()
            .rev()
            .find(|id| selected.contains(id))
            .or_else(|| hits.last())
            .copied()
    }

    /// Both rendered end points of a line.
    pub fn line_endpoints(&self, store: &EntityStore, id: LineId) -> Option<(Point, Point)> {
        let line = self.lines.get(&id)?;
        let from = store.port_point(line.from_port_id())?;
        let to = match line.to_port_id() {
            Some(port) => store.port_point(port)?,
            None => line.drawing_to?,
        };
        Some((from, to))
    }

    /// Closest line whose path passes within `line_hover_distance` of `pos`.
    pub fn line_from_mouse_pos(&self, store: &EntityStore, pos: Point) -> Option<LineId> {
        let max = store.config.line_hover_distance;
        self.lines
            .keys()
            .filter_map(|id| {
                let (from, to) = self.line_endpoints(store, *id)?;
                let d = distance_to_path(from, to, pos);
                (d <= max).then_some((*id, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    // ─── Colors ──────────────────────────────────────────────────────────

    /// Resolved stroke color. First match wins: hidden, error, highlight
    /// override, drawing, hovered, selected, flowing, default.
    pub fn line_color(
        &self,
        store: &EntityStore,
        id: LineId,
        selection: &SelectService,
        hover: &HoverService,
    ) -> Option<String> {
        let line = self.lines.get(&id)?;
        let colors = &store.config.line_colors;
        let entity = EntityRef::Line(id);
        let color = if self.policy.is_hide_line(line) {
            &colors.hidden
        } else if line.has_error {
            &colors.error
        } else if let Some(highlight) = &line.highlight_color {
            highlight
        } else if line.is_drawing() {
            &colors.drawing
        } else if hover.is_hovered(entity) {
            &colors.hovered
        } else if selection.is_selected(entity) {
            &colors.selected
        } else if line.flowing || line.processing || self.policy.is_flowing_line(line) {
            &colors.flowing
        } else {
            &colors.default
        };
        Some(color.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::node::WorkflowNode;
    use crate::transform::NodeTransform;
    use kurbo::Size;
    use std::rc::Rc;

    fn store(nodes: &[(&str, Point)]) -> EntityStore {
        let mut store = EntityStore::new(Rc::new(EditorConfig::default()));
        for (id, pos) in nodes {
            let id = NodeId::intern(id);
            store
                .tree
                .add_node(None, WorkflowNode::new(id, "test".into()));
            store
                .components
                .insert(id, NodeTransform::new(*pos, Size::new(100.0, 40.0)));
            store.init_static_ports(id);
        }
        store
    }

    fn port(node: &str, port_type: PortType) -> PortId {
        PortId::new(NodeId::intern(node), port_type, &Default::default())
    }

    #[test]
    fn create_line_is_idempotent() {
        let mut store = store(&[("lm_a", Point::ZERO), ("lm_b", Point::new(300.0, 0.0))]);
        let mut lines = LinesManager::default();

        let first = lines.create_line(&mut store, LineInfo::new("lm_a", "lm_b"));
        lines.set_highlight(first.unwrap(), Some("#123456".into()));
        let second = lines.create_line(&mut store, LineInfo::new("lm_a", "lm_b"));

        assert_eq!(first, second);
        assert_eq!(lines.len(), 1);
        assert!(lines.get(first.unwrap()).unwrap().highlight_color.is_none());
        assert_eq!(
            store.node_lines(NodeId::intern("lm_b")).unwrap().input_lines,
            vec![first.unwrap()]
        );
    }

    #[test]
    fn create_line_from_nothing_is_refused() {
        let mut store = store(&[("lm_only", Point::ZERO)]);
        let mut lines = LinesManager::default();
        assert!(lines.create_line(&mut store, LineInfo::new("", "lm_only")).is_none());
        assert!(lines.is_empty());
    }

    #[test]
    fn available_change_skips_drawing_lines() {
        let mut store = store(&[("lm_ev_a", Point::ZERO), ("lm_ev_b", Point::new(300.0, 0.0))]);
        let mut lines = LinesManager::default();
        let events = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = events.clone();
        lines
            .on_available_lines_change(move |e| sink.borrow_mut().push(e.clone()))
            .detach();

        let drawing = lines
            .create_line(
                &mut store,
                LineInfo::drawing(NodeId::intern("lm_ev_a"), Default::default(), Point::new(50.0, 50.0)),
            )
            .unwrap();
        assert!(events.borrow().is_empty());

        let attached = lines
            .set_to_port(&mut store, drawing, port("lm_ev_b", PortType::Input))
            .unwrap();
        assert_eq!(attached.as_str(), "lm_ev_a_-lm_ev_b_");
        assert_eq!(events.borrow().len(), 1);

        assert!(matches!(
            lines.set_to_port(&mut store, attached, port("lm_ev_b", PortType::Input)),
            Err(Error::LineNotDrawing(_))
        ));
    }

    #[test]
    fn legality_prerequisites() {
        let store = store(&[("lg_a", Point::ZERO), ("lg_b", Point::new(300.0, 0.0))]);
        let lines = LinesManager::default();
        let a_out = port("lg_a", PortType::Output);
        let a_in = port("lg_a", PortType::Input);
        let b_out = port("lg_b", PortType::Output);
        let b_in = port("lg_b", PortType::Input);

        assert!(lines.can_add_line(&store, a_out, b_in, true));
        assert!(!lines.can_add_line(&store, a_out, a_out, true));
        assert!(!lines.can_add_line(&store, a_out, a_in, true));
        assert!(!lines.can_add_line(&store, b_in, a_in, true));
        assert!(!lines.can_add_line(&store, a_out, b_out, true));
    }

    #[test]
    fn disabled_target_port_is_illegal() {
        let mut store = store(&[("dis_a", Point::ZERO), ("dis_b", Point::new(300.0, 0.0))]);
        let b_in = port("dis_b", PortType::Input);
        store.port_mut(b_in).unwrap().disabled = true;
        let lines = LinesManager::default();
        assert!(!lines.can_add_line(&store, port("dis_a", PortType::Output), b_in, true));
    }

    #[test]
    fn error_flag_follows_lines_onto_ports() {
        let mut store = store(&[("err_a", Point::ZERO)]);
        let mut lines = LinesManager::default();
        // Self loops are only reachable through JSON import.
        let id = lines
            .create_line(&mut store, LineInfo::new("err_a", "err_a"))
            .unwrap();
        assert!(lines.get(id).unwrap().has_error);
        assert!(store.port(port("err_a", PortType::Input)).unwrap().has_error);

        lines.dispose_line(&mut store, id);
        assert!(!store.port(port("err_a", PortType::Input)).unwrap().has_error);
        assert!(store.node_lines(NodeId::intern("err_a")).unwrap().is_empty());
    }

    #[test]
    fn occluded_port_is_not_hit() {
        // Node bounds: a = (-50,0)-(50,40); b sits on top of a's right edge.
        let mut store = store(&[("occ_a", Point::ZERO), ("occ_b", Point::new(60.0, 0.0))]);
        let lines = LinesManager::default();
        let a_out_point = Point::new(50.0, 20.0);
        assert_eq!(lines.get_port_from_mouse_pos(&store, a_out_point), None);

        store.tree.bring_to_front(NodeId::intern("occ_a"));
        assert_eq!(
            lines.get_port_from_mouse_pos(&store, a_out_point),
            Some(port("occ_a", PortType::Output))
        );
    }

    #[test]
    fn raised_container_keeps_children_on_top() {
        let mut store = store(&[("occ_group", Point::ZERO), ("occ_cover", Point::new(60.0, 0.0))]);
        let group = NodeId::intern("occ_group");
        let child = NodeId::intern("occ_child");
        store
            .tree
            .add_node(Some(group), WorkflowNode::new(child, "test".into()));
        store
            .components
            .insert(child, NodeTransform::new(Point::ZERO, Size::new(100.0, 40.0)));
        store.init_static_ports(child);
        let lines = LinesManager::default();
        let child_out = Point::new(50.0, 20.0);

        store.tree.bring_to_front(group);
        assert_eq!(
            lines.get_port_from_mouse_pos(&store, child_out),
            Some(port("occ_child", PortType::Output))
        );
    }

    #[test]
    fn node_hit_prefers_selected() {
        let store = store(&[("hit_a", Point::ZERO), ("hit_b", Point::new(20.0, 10.0))]);
        let lines = LinesManager::default();
        let a = NodeId::intern("hit_a");
        let b = NodeId::intern("hit_b");
        let p = Point::new(10.0, 20.0);

        assert_eq!(lines.get_node_from_mouse_pos(&store, p, &[]), Some(b));
        assert_eq!(lines.get_node_from_mouse_pos(&store, p, &[a]), Some(a));
        // Padding extends the hit area by 4px.
        assert_eq!(
            lines.get_node_from_mouse_pos(&store, Point::new(-53.0, 20.0), &[]),
            Some(a)
        );
    }

    #[test]
    fn color_precedence() {
        let mut store = store(&[("col_a", Point::ZERO), ("col_b", Point::new(300.0, 0.0))]);
        let mut lines = LinesManager::default();
        let mut selection = SelectService::new();
        let mut hover = HoverService::new();
        let colors = store.config.line_colors.clone();
        let id = lines
            .create_line(&mut store, LineInfo::new("col_a", "col_b"))
            .unwrap();

        let color = |lines: &LinesManager, s: &SelectService, h: &HoverService| {
            lines.line_color(&store, id, s, h).unwrap()
        };
        assert_eq!(color(&lines, &selection, &hover), colors.default);

        lines.get_mut(id).unwrap().flowing = true;
        assert_eq!(color(&lines, &selection, &hover), colors.flowing);

        selection.select(EntityRef::Line(id));
        assert_eq!(color(&lines, &selection, &hover), colors.selected);

        hover.set_hovered(Some(EntityRef::Line(id)));
        assert_eq!(color(&lines, &selection, &hover), colors.hovered);

        lines.set_highlight(id, Some("#abcdef".into()));
        assert_eq!(color(&lines, &selection, &hover), "#abcdef");

        lines.get_mut(id).unwrap().has_error = true;
        assert_eq!(color(&lines, &selection, &hover), colors.error);
    }

    #[test]
    fn line_hover_uses_rendered_path() {
        let mut store = store(&[("lh_a", Point::ZERO), ("lh_b", Point::new(400.0, 0.0))]);
        let mut lines = LinesManager::default();
        let id = lines
            .create_line(&mut store, LineInfo::new("lh_a", "lh_b"))
            .unwrap();
        // a.out = (50,20), b.in = (350,20): a straight horizontal path.
        assert_eq!(lines.line_from_mouse_pos(&store, Point::new(200.0, 25.0)), Some(id));
        assert_eq!(lines.line_from_mouse_pos(&store, Point::new(200.0, 60.0)), None);
    }
}
