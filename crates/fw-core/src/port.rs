//! Port entities: connectable anchors owned by exactly one node.

use crate::id::{NodeId, PortId, PortKey, PortType};
use crate::registry::{PortDecl, PortLocation};
use kurbo::{Point, Rect};

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowPort {
    pub id: PortId,
    pub node: NodeId,
    pub port_type: PortType,
    pub key: PortKey,
    /// Explicitly disabled. The effective flag also folds in node meta, see
    /// `EntityStore::port_disabled`.
    pub disabled: bool,
    pub location: PortLocation,
    /// Rendered anchor rectangle (absolute), overriding the derived position.
    pub anchor: Option<Rect>,
    /// Discovered from rendered markup rather than declared by the registry.
    pub dynamic: bool,
    pub has_error: bool,
}

impl WorkflowPort {
    pub fn new(node: NodeId, port_type: PortType, key: PortKey) -> Self {
        Self {
            id: PortId::new(node, port_type, &key),
            node,
            port_type,
            key,
            disabled: false,
            location: PortLocation::default_for(port_type),
            anchor: None,
            dynamic: false,
            has_error: false,
        }
    }

    pub fn from_decl(node: NodeId, decl: &PortDecl, dynamic: bool) -> Self {
        let mut port = Self::new(node, decl.port_type, decl.key.clone());
        port.disabled = decl.disabled;
        port.anchor = decl.anchor;
        port.dynamic = dynamic;
        if let Some(location) = decl.location {
            port.location = location;
        }
        port
    }

    /// Re-apply a declaration to an already cached port.
    pub fn apply_decl(&mut self, decl: &PortDecl) {
        self.disabled = decl.disabled;
        self.anchor = decl.anchor;
        self.location = decl
            .location
            .unwrap_or(PortLocation::default_for(self.port_type));
    }

    pub fn is_input(&self) -> bool {
        self.port_type == PortType::Input
    }

    pub fn is_output(&self) -> bool {
        self.port_type == PortType::Output
    }

    /// Connection point given the owning node's absolute bounds.
    pub fn point(&self, node_bounds: &Rect) -> Point {
        if let Some(anchor) = self.anchor {
            return anchor.center();
        }
        let c = node_bounds.center();
        match self.location {
            PortLocation::Left => Point::new(node_bounds.x0, c.y),
            PortLocation::Right => Point::new(node_bounds.x1, c.y),
            PortLocation::Top => Point::new(c.x, node_bounds.y0),
            PortLocation::Bottom => Point::new(c.x, node_bounds.y1),
        }
    }

    /// Square hit box of side `hit_size` centred on the connection point.
    pub fn bounds(&self, node_bounds: &Rect, hit_size: f64) -> Rect {
        let p = self.point(node_bounds);
        let half = hit_size / 2.0;
        Rect::new(p.x - half, p.y - half, p.x + half, p.y + half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_sit_on_the_sides() {
        let node = NodeId::intern("port_owner");
        let bounds = Rect::new(0.0, 0.0, 100.0, 40.0);

        let input = WorkflowPort::new(node, PortType::Input, PortKey::default());
        assert_eq!(input.point(&bounds), Point::new(0.0, 20.0));

        let output = WorkflowPort::new(node, PortType::Output, PortKey::default());
        assert_eq!(output.point(&bounds), Point::new(100.0, 20.0));
        assert_eq!(
            output.bounds(&bounds, 24.0),
            Rect::new(88.0, 8.0, 112.0, 32.0)
        );
    }

    #[test]
    fn anchor_overrides_derived_point() {
        let node = NodeId::intern("port_owner");
        let decl = PortDecl::output().with_anchor(Rect::new(40.0, 40.0, 50.0, 50.0));
        let port = WorkflowPort::from_decl(node, &decl, true);
        assert_eq!(port.point(&Rect::new(0.0, 0.0, 10.0, 10.0)), Point::new(45.0, 45.0));
        assert!(port.dynamic);
    }
}
