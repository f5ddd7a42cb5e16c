//! Line entities: directed edges from an output port to an input port.

use crate::id::{LineId, NodeId, PortId, PortKey, PortType};
use crate::model::{EdgeJson, non_empty_key};
use kurbo::{CubicBez, ParamCurveNearest, Point};

/// The four components that identify a line. Also the options of
/// `create_line` (plus `drawing_to`).
#[derive(Debug, Clone, PartialEq)]
pub struct LineInfo {
    pub from: NodeId,
    pub from_port: PortKey,
    pub to: Option<NodeId>,
    pub to_port: PortKey,
    /// Floating end point while the line is being drawn.
    pub drawing_to: Option<Point>,
}

impl LineInfo {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: NodeId::intern(from),
            from_port: PortKey::default(),
            to: (!to.is_empty()).then(|| NodeId::intern(to)),
            to_port: PortKey::default(),
            drawing_to: None,
        }
    }

    /// A drawing line floating at `drawing_to`.
    pub fn drawing(from: NodeId, from_port: PortKey, drawing_to: Point) -> Self {
        Self {
            from,
            from_port,
            to: None,
            to_port: PortKey::default(),
            drawing_to: Some(drawing_to),
        }
    }

    #[must_use]
    pub fn with_ports(mut self, from_port: impl Into<PortKey>, to_port: impl Into<PortKey>) -> Self {
        self.from_port = from_port.into();
        self.to_port = to_port.into();
        self
    }

    pub fn id(&self) -> LineId {
        LineId::new(Some(self.from), &self.from_port, self.to, &self.to_port)
    }

    pub fn from_port_id(&self) -> PortId {
        PortId::new(self.from, PortType::Output, &self.from_port)
    }

    pub fn to_port_id(&self) -> Option<PortId> {
        self.to.map(|to| PortId::new(to, PortType::Input, &self.to_port))
    }
}

impl From<&EdgeJson> for LineInfo {
    fn from(edge: &EdgeJson) -> Self {
        Self {
            from: edge.source_node_id,
            from_port: edge.source_port(),
            to: Some(edge.target_node_id),
            to_port: edge.target_port(),
            drawing_to: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowLine {
    pub id: LineId,
    pub from: NodeId,
    pub from_port: PortKey,
    pub to: Option<NodeId>,
    pub to_port: PortKey,
    pub drawing_to: Option<Point>,
    pub has_error: bool,
    /// Live test-run highlighting.
    pub processing: bool,
    /// Animated flow along the line.
    pub flowing: bool,
    pub disabled: bool,
    /// Overrides the resolved color when set (e.g. red while illegal).
    pub highlight_color: Option<String>,
}

impl WorkflowLine {
    pub fn new(info: &LineInfo) -> Self {
        Self {
            id: info.id(),
            from: info.from,
            from_port: info.from_port.clone(),
            to: info.to,
            to_port: info.to_port.clone(),
            drawing_to: info.drawing_to,
            has_error: false,
            processing: false,
            flowing: false,
            disabled: false,
            highlight_color: None,
        }
    }

    pub fn info(&self) -> LineInfo {
        LineInfo {
            from: self.from,
            from_port: self.from_port.clone(),
            to: self.to,
            to_port: self.to_port.clone(),
            drawing_to: self.drawing_to,
        }
    }

    /// A line is being drawn while it has no `to` node.
    pub fn is_drawing(&self) -> bool {
        self.to.is_none()
    }

    pub fn from_port_id(&self) -> PortId {
        PortId::new(self.from, PortType::Output, &self.from_port)
    }

    pub fn to_port_id(&self) -> Option<PortId> {
        self.to.map(|to| PortId::new(to, PortType::Input, &self.to_port))
    }

    pub fn is_incident_to(&self, node: NodeId) -> bool {
        self.from == node || self.to == Some(node)
    }

    /// Edge JSON with endpoint ids mapped through `map_node`.
    /// `None` for drawing lines.
    pub fn to_edge_json(&self, map_node: impl Fn(NodeId) -> NodeId) -> Option<EdgeJson> {
        let to = self.to?;
        Some(EdgeJson {
            source_node_id: map_node(self.from),
            target_node_id: map_node(to),
            source_port_id: non_empty_key(&self.from_port),
            target_port_id: non_empty_key(&self.to_port),
        })
    }
}

/// The rendered path: a cubic Bézier leaving `from` and entering `to`
/// horizontally.
pub fn line_path(from: Point, to: Point) -> CubicBez {
    let dx = ((to.x - from.x).abs() / 2.0).max(40.0);
    CubicBez::new(
        from,
        Point::new(from.x + dx, from.y),
        Point::new(to.x - dx, to.y),
        to,
    )
}

/// Shortest distance from `p` to the rendered path between two points.
pub fn distance_to_path(from: Point, to: Point, p: Point) -> f64 {
    line_path(from, to).nearest(p, 1e-3).distance_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_id_matches_line_id() {
        let info = LineInfo::new("start_0", "end_0");
        let line = WorkflowLine::new(&info);
        assert_eq!(line.id.as_str(), "start_0_-end_0_");
        assert!(!line.is_drawing());
        assert_eq!(line.to_port_id().unwrap().as_str(), "port_input_end_0_");
    }

    #[test]
    fn drawing_lines_do_not_export() {
        let info = LineInfo::drawing(NodeId::intern("start_0"), PortKey::default(), Point::new(5.0, 5.0));
        let line = WorkflowLine::new(&info);
        assert!(line.is_drawing());
        assert!(line.to_edge_json(|n| n).is_none());
    }

    #[test]
    fn path_distance() {
        let from = Point::new(0.0, 0.0);
        let to = Point::new(200.0, 0.0);
        assert!(distance_to_path(from, to, Point::new(100.0, 3.0)) < 4.0);
        assert!(distance_to_path(from, to, Point::new(100.0, 50.0)) > 40.0);
    }
}
