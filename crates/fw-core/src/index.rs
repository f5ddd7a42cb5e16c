//! Per-node secondary indexes, stored as components of the node.
//!
//! - [`NodePorts`]: the live port set (registry-declared + discovered).
//! - [`NodeLines`]: incident lines, split into inputs and outputs.

use crate::id::{LineId, PortId};
use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePorts {
    /// Declared by the node type registration.
    pub static_ports: SmallVec<[PortId; 4]>,
    /// Discovered from rendered markup.
    pub dynamic_ports: SmallVec<[PortId; 4]>,
}

impl NodePorts {
    pub fn all(&self) -> impl Iterator<Item = PortId> + '_ {
        self.static_ports
            .iter()
            .chain(self.dynamic_ports.iter())
            .copied()
    }

    pub fn contains(&self, port: PortId) -> bool {
        self.all().any(|p| p == port)
    }

    pub fn remove(&mut self, port: PortId) {
        self.static_ports.retain(|p| *p != port);
        self.dynamic_ports.retain(|p| *p != port);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeLines {
    /// Lines whose `to` is this node.
    pub input_lines: Vec<LineId>,
    /// Lines whose `from` is this node (including lines still being drawn).
    pub output_lines: Vec<LineId>,
}

impl NodeLines {
    pub fn add_input(&mut self, line: LineId) {
        if !self.input_lines.contains(&line) {
            self.input_lines.push(line);
        }
    }

    pub fn add_output(&mut self, line: LineId) {
        if !self.output_lines.contains(&line) {
            self.output_lines.push(line);
        }
    }

    pub fn remove(&mut self, line: LineId) {
        self.input_lines.retain(|l| *l != line);
        self.output_lines.retain(|l| *l != line);
    }

    pub fn all(&self) -> impl Iterator<Item = LineId> + '_ {
        self.input_lines
            .iter()
            .chain(self.output_lines.iter())
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.input_lines.is_empty() && self.output_lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{Key, NodeId};

    #[test]
    fn node_lines_dedup_and_remove() {
        let a = NodeId::intern("idx_a");
        let b = NodeId::intern("idx_b");
        let line = LineId::new(Some(a), &Key::default(), Some(b), &Key::default());

        let mut lines = NodeLines::default();
        lines.add_output(line);
        lines.add_output(line);
        assert_eq!(lines.output_lines.len(), 1);

        lines.remove(line);
        assert!(lines.is_empty());
    }
}
