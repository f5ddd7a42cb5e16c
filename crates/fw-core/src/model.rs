//! Graph JSON: the persisted / exchanged document shape.
//!
//! ```text
//! WorkflowJson = { nodes: NodeJson[], edges: EdgeJson[] }
//! NodeJson     = { id, type, meta?, data?, blocks?, edges? }
//! EdgeJson     = { sourceNodeID, targetNodeID, sourcePortID?, targetPortID? }
//! ```
//!
//! `meta` is free-form; only `position` and `canvasPosition` are read by the
//! core, everything else is carried through untouched.

use crate::id::{Key, NodeId, NodeType, PortKey};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type NodeMetaJson = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowJson {
    #[serde(default)]
    pub nodes: Vec<NodeJson>,
    #[serde(default)]
    pub edges: Vec<EdgeJson>,
}

impl WorkflowJson {
    pub fn parse(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_value(&self) -> crate::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<NodeMetaJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<NodeJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<EdgeJson>>,
}

impl NodeJson {
    pub fn new(id: NodeId, node_type: impl Into<NodeType>) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            meta: None,
            data: None,
            blocks: None,
            edges: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: Point) -> Self {
        set_meta_point(self.meta.get_or_insert_with(Map::new), "position", position);
        self
    }

    pub fn position(&self) -> Option<Point> {
        self.meta.as_ref().and_then(|m| meta_point(m, "position"))
    }

    pub fn canvas_position(&self) -> Option<Point> {
        self.meta.as_ref().and_then(|m| meta_point(m, "canvasPosition"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeJson {
    #[serde(rename = "sourceNodeID")]
    pub source_node_id: NodeId,
    #[serde(rename = "targetNodeID")]
    pub target_node_id: NodeId,
    #[serde(
        rename = "sourcePortID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_port_id: Option<PortKey>,
    #[serde(
        rename = "targetPortID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_port_id: Option<PortKey>,
}

impl EdgeJson {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            source_node_id: source,
            target_node_id: target,
            source_port_id: None,
            target_port_id: None,
        }
    }

    pub fn source_port(&self) -> PortKey {
        self.source_port_id.clone().unwrap_or_default()
    }

    pub fn target_port(&self) -> PortKey {
        self.target_port_id.clone().unwrap_or_default()
    }
}

/// Port keys are only exported when they are not the default anchor.
pub(crate) fn non_empty_key(key: &Key) -> Option<Key> {
    (!key.is_empty()).then(|| key.clone())
}

// ─── Meta helpers ────────────────────────────────────────────────────────

pub fn meta_point(meta: &NodeMetaJson, field: &str) -> Option<Point> {
    let obj = meta.get(field)?.as_object()?;
    Some(Point::new(obj.get("x")?.as_f64()?, obj.get("y")?.as_f64()?))
}

/// Write `{x, y}` into `meta[field]`, unless it already holds that point.
/// Integral coordinates are written as JSON integers so an unchanged
/// document re-exports byte-for-byte.
pub fn set_meta_point(meta: &mut NodeMetaJson, field: &str, point: Point) {
    if meta_point(meta, field) == Some(point) {
        return;
    }
    let mut obj = Map::new();
    obj.insert("x".into(), number(point.x));
    obj.insert("y".into(), number(point.y));
    meta.insert(field.into(), Value::Object(obj));
}

fn number(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}
