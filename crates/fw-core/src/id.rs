//! Interned identifiers for nodes, ports and lines.
//!
//! All three id kinds share one interner. Their string formats never
//! collide: port ids carry a `port_` prefix and line ids always contain a
//! `-` between their two endpoint halves.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for entity ids: fast comparisons, low memory.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned identifier for workflow nodes.
/// Internally a `Spur` index: 4 bytes, Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a new string as a NodeId, or return existing if already interned.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate an id with a type prefix (e.g. `llm_3`). Callers that need a
    /// collision-free id check the candidate against their node table and
    /// ask again.
    pub fn with_prefix(prefix: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}

// ─── Keys ────────────────────────────────────────────────────────────────

/// A string-or-integer key, used for node types and port keys.
///
/// The empty string is the default port key (the node's default anchor).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    pub fn is_empty(&self) -> bool {
        matches!(self, Key::Str(s) if s.is_empty())
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::Str(String::new())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

/// Node type tag.
pub type NodeType = Key;

/// Port key within a node.
pub type PortKey = Key;

// ─── Ports ───────────────────────────────────────────────────────────────

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Input,
    Output,
}

impl PortType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortType::Input => "input",
            PortType::Output => "output",
        }
    }
}

/// Interned port id: `port_<input|output>_<nodeId>_<portKey>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(Spur);

impl PortId {
    pub fn new(node: NodeId, port_type: PortType, key: &PortKey) -> Self {
        let s = format!("port_{}_{}_{}", port_type.as_str(), node.as_str(), key);
        PortId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Lines ───────────────────────────────────────────────────────────────

/// Interned line id: `<from>_<fromPort>-<to>_<toPort>`.
///
/// Missing components collapse to empty segments, so a line still being
/// drawn from `start_0` has the id `start_0_-_`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(Spur);

impl LineId {
    pub fn new(
        from: Option<NodeId>,
        from_port: &PortKey,
        to: Option<NodeId>,
        to_port: &PortKey,
    ) -> Self {
        let from = from.as_ref().map(|n| n.as_str()).unwrap_or("");
        let to = to.as_ref().map(|n| n.as_str()).unwrap_or("");
        let s = format!("{from}_{from_port}-{to}_{to_port}");
        LineId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key under which any entity's data is stored in the component table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntityKey(Spur);

impl From<NodeId> for EntityKey {
    fn from(id: NodeId) -> Self {
        EntityKey(id.0)
    }
}

impl From<PortId> for EntityKey {
    fn from(id: PortId) -> Self {
        EntityKey(id.0)
    }
}

impl From<LineId> for EntityKey {
    fn from(id: LineId) -> Self {
        EntityKey(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("start_0");
        let b = NodeId::intern("start_0");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "start_0");
    }

    #[test]
    fn prefixed_ids_are_unique() {
        let a = NodeId::with_prefix("llm");
        let b = NodeId::with_prefix("llm");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("llm_"));
    }

    #[test]
    fn port_id_format() {
        let node = NodeId::intern("end_0");
        assert_eq!(
            PortId::new(node, PortType::Input, &Key::default()).as_str(),
            "port_input_end_0_"
        );
        assert_eq!(
            PortId::new(node, PortType::Output, &Key::Int(2)).as_str(),
            "port_output_end_0_2"
        );
    }

    #[test]
    fn line_id_collapses_empty_segments() {
        let from = NodeId::intern("start_0");
        let to = NodeId::intern("end_0");
        let full = LineId::new(Some(from), &Key::default(), Some(to), &Key::default());
        assert_eq!(full.as_str(), "start_0_-end_0_");

        let drawing = LineId::new(Some(from), &"out".into(), None, &Key::default());
        assert_eq!(drawing.as_str(), "start_0_out-_");
    }

    #[test]
    fn key_deserializes_string_or_number() {
        let k: Key = serde_json::from_str("3").unwrap();
        assert_eq!(k, Key::Int(3));
        let k: Key = serde_json::from_str("\"if\"").unwrap();
        assert_eq!(k, Key::Str("if".into()));
        assert!(Key::default().is_empty());
    }
}
