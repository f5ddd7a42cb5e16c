//! Workflow nodes and the containment tree.
//!
//! The tree is a `StableDiGraph` whose edges go parent → child. Every node
//! carries an explicit `stack_index` (paint order); children are listed in
//! stack order and hit-testing treats the highest index as topmost.

use crate::id::{NodeId, NodeType};
use crate::model::NodeMetaJson;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde_json::Value;
use std::collections::HashMap;

pub const ROOT_ID: &str = "root";

/// A single node of the workflow.
#[derive(Debug, Clone)]
pub struct WorkflowNode {
    pub id: NodeId,
    pub node_type: NodeType,
    /// Free-form meta carried through from JSON.
    pub meta: NodeMetaJson,
    /// Extension data payload (the node's form values).
    pub data: Option<Value>,
    /// Paint order; higher paints on top.
    pub stack_index: u64,
}

impl WorkflowNode {
    pub fn new(id: NodeId, node_type: NodeType) -> Self {
        Self {
            id,
            node_type,
            meta: NodeMetaJson::new(),
            data: None,
            stack_index: 0,
        }
    }
}

/// The containment tree of all nodes, rooted at an invisible root node.
#[derive(Debug, Clone)]
pub struct NodeTree {
    pub graph: StableDiGraph<WorkflowNode, ()>,
    pub root: NodeIndex,
    /// Index from NodeId → NodeIndex for fast lookup.
    pub id_index: HashMap<NodeId, NodeIndex>,
    next_stack_index: u64,
}

impl NodeTree {
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root_id = NodeId::intern(ROOT_ID);
        let root = graph.add_node(WorkflowNode::new(root_id, ROOT_ID.into()));
        Self {
            graph,
            root,
            id_index: HashMap::new(),
            next_stack_index: 1,
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.graph[self.root].id
    }

    /// Add a node as a child of `parent` (`None` = root), on top of the
    /// paint order.
    pub fn add_node(&mut self, parent: Option<NodeId>, mut node: WorkflowNode) -> NodeIndex {
        let parent_idx = parent.and_then(|p| self.index_of(p)).unwrap_or(self.root);
        node.stack_index = self.next_stack_index;
        self.next_stack_index += 1;
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent_idx, idx, ());
        self.id_index.insert(id, idx);
        idx
    }

    /// Remove a single node, keeping the `id_index` synchronized. Children
    /// are not touched; callers remove them first.
    pub fn remove_node(&mut self, id: NodeId) -> Option<WorkflowNode> {
        let idx = self.id_index.remove(&id)?;
        self.graph.remove_node(idx)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&WorkflowNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut WorkflowNode> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    /// Parent of a node; `None` for top-level nodes (whose parent is the root)
    /// and for unknown ids.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id)?;
        let parent = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()?;
        (parent != self.root).then(|| self.graph[parent].id)
    }

    /// Children of `parent` (`None` = top level) in paint order.
    pub fn children(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        let idx = match parent {
            Some(p) => match self.index_of(p) {
                Some(idx) => idx,
                None => return Vec::new(),
            },
            None => self.root,
        };
        let mut children: Vec<&WorkflowNode> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|c| &self.graph[c])
            .collect();
        children.sort_by_key(|n| n.stack_index);
        children.into_iter().map(|n| n.id).collect()
    }

    /// Every node except the root, in paint order.
    pub fn all_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<&WorkflowNode> = self
            .graph
            .node_indices()
            .filter(|idx| *idx != self.root)
            .map(|idx| &self.graph[idx])
            .collect();
        nodes.sort_by_key(|n| n.stack_index);
        nodes.into_iter().map(|n| n.id).collect()
    }

    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    /// Put a node and its descendants on top of the paint order, each
    /// parent directly below its children. Returns false if they already are.
    pub fn bring_to_front(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let subtree = self.subtree(id);
        let len = subtree.len() as u64;
        let top = self.next_stack_index;
        let in_place = subtree.iter().enumerate().all(|(i, n)| {
            self.get(*n)
                .is_some_and(|node| node.stack_index + len == top + i as u64)
        });
        if in_place {
            return false;
        }
        for n in subtree {
            let next = self.next_stack_index;
            self.next_stack_index += 1;
            if let Some(node) = self.get_mut(n) {
                node.stack_index = next;
            }
        }
        true
    }

    /// `id` followed by its descendants, parents before children and
    /// siblings in paint order.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            out.push(current);
            pending.extend(self.children(Some(current)).into_iter().rev());
        }
        out
    }

    /// Drop every node but the root.
    pub fn clear(&mut self) {
        let root = self.root;
        self.graph.retain_nodes(|_, idx| idx == root);
        self.id_index.clear();
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> WorkflowNode {
        WorkflowNode::new(NodeId::intern(id), "test".into())
    }

    #[test]
    fn tree_basics() {
        let mut tree = NodeTree::new();
        tree.add_node(None, node("a"));
        tree.add_node(None, node("b"));
        tree.add_node(Some(NodeId::intern("a")), node("a_child"));

        assert_eq!(
            tree.children(None),
            vec![NodeId::intern("a"), NodeId::intern("b")]
        );
        assert_eq!(tree.parent(NodeId::intern("a_child")), Some(NodeId::intern("a")));
        assert_eq!(tree.parent(NodeId::intern("a")), None);
    }

    #[test]
    fn bring_to_front_reorders_children() {
        let mut tree = NodeTree::new();
        tree.add_node(None, node("z1"));
        tree.add_node(None, node("z2"));

        assert!(tree.bring_to_front(NodeId::intern("z1")));
        assert_eq!(
            tree.children(None),
            vec![NodeId::intern("z2"), NodeId::intern("z1")]
        );
        assert!(!tree.bring_to_front(NodeId::intern("z1")));
    }

    #[test]
    fn bring_to_front_lifts_descendants_above_their_parent() {
        let mut tree = NodeTree::new();
        tree.add_node(None, node("front_group"));
        tree.add_node(Some(NodeId::intern("front_group")), node("front_child_a"));
        tree.add_node(Some(NodeId::intern("front_group")), node("front_child_b"));
        tree.add_node(None, node("front_other"));

        assert!(tree.bring_to_front(NodeId::intern("front_group")));
        assert_eq!(
            tree.all_nodes(),
            vec![
                NodeId::intern("front_other"),
                NodeId::intern("front_group"),
                NodeId::intern("front_child_a"),
                NodeId::intern("front_child_b"),
            ]
        );
        assert!(!tree.bring_to_front(NodeId::intern("front_group")));
    }

    #[test]
    fn clear_keeps_root() {
        let mut tree = NodeTree::new();
        tree.add_node(None, node("gone"));
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.children(None).is_empty());
        assert_eq!(tree.root_id().as_str(), ROOT_ID);
    }
}
