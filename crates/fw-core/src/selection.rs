//! Selection and hover state holders.

use crate::event::{Emitter, Subscription};
use crate::id::{LineId, NodeId, PortId};

/// Any selectable / hoverable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Node(NodeId),
    Port(PortId),
    Line(LineId),
}

// ─── Select ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct SelectService {
    selection: Vec<EntityRef>,
    on_change: Emitter<Vec<EntityRef>>,
}

impl SelectService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &[EntityRef] {
        &self.selection
    }

    /// Replace the selection. Fires only if it changed.
    pub fn set_selection(&mut self, selection: Vec<EntityRef>) {
        if self.selection == selection {
            return;
        }
        self.selection = selection;
        self.on_change.fire(&self.selection);
    }

    pub fn select(&mut self, entity: EntityRef) {
        self.set_selection(vec![entity]);
    }

    pub fn select_nodes(&mut self, nodes: &[NodeId]) {
        self.set_selection(nodes.iter().map(|n| EntityRef::Node(*n)).collect());
    }

    /// Add the entity, or remove it if already selected.
    pub fn toggle(&mut self, entity: EntityRef) {
        let mut next = self.selection.clone();
        if let Some(pos) = next.iter().position(|e| *e == entity) {
            next.remove(pos);
        } else {
            next.push(entity);
        }
        self.set_selection(next);
    }

    pub fn clear(&mut self) {
        self.set_selection(Vec::new());
    }

    pub fn is_selected(&self, entity: EntityRef) -> bool {
        self.selection.contains(&entity)
    }

    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.selection
            .iter()
            .filter_map(|e| match e {
                EntityRef::Node(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    pub fn selected_lines(&self) -> Vec<LineId> {
        self.selection
            .iter()
            .filter_map(|e| match e {
                EntityRef::Line(l) => Some(*l),
                _ => None,
            })
            .collect()
    }

    /// Drop an entity that no longer exists, without a change event if it
    /// was not selected.
    pub fn forget(&mut self, entity: EntityRef) {
        if self.is_selected(entity) {
            let next = self.selection.iter().copied().filter(|e| *e != entity).collect();
            self.set_selection(next);
        }
    }

    pub fn on_change(&self, listener: impl Fn(&Vec<EntityRef>) + 'static) -> Subscription {
        self.on_change.on(listener)
    }
}

// ─── Hover ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct HoverService {
    hovered: Option<EntityRef>,
    on_change: Emitter<Option<EntityRef>>,
}

impl HoverService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<EntityRef> {
        self.hovered
    }

    pub fn is_hovered(&self, entity: EntityRef) -> bool {
        self.hovered == Some(entity)
    }

    pub fn hovered_node(&self) -> Option<NodeId> {
        match self.hovered {
            Some(EntityRef::Node(n)) => Some(n),
            _ => None,
        }
    }

    pub fn set_hovered(&mut self, hovered: Option<EntityRef>) {
        if self.hovered == hovered {
            return;
        }
        self.hovered = hovered;
        self.on_change.fire(&self.hovered);
    }

    pub fn clear(&mut self) {
        self.set_hovered(None);
    }

    pub fn on_change(&self, listener: impl Fn(&Option<EntityRef>) + 'static) -> Subscription {
        self.on_change.on(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn toggle_and_filters() {
        let mut select = SelectService::new();
        let a = EntityRef::Node(NodeId::intern("sel_a"));
        let b = EntityRef::Node(NodeId::intern("sel_b"));

        select.select(a);
        select.toggle(b);
        assert_eq!(select.selected_nodes().len(), 2);
        select.toggle(a);
        assert_eq!(select.selection(), &[b]);
        assert!(select.selected_lines().is_empty());
    }

    #[test]
    fn change_fires_only_on_difference() {
        let mut select = SelectService::new();
        let fired = Rc::new(Cell::new(0));
        let f = fired.clone();
        select.on_change(move |_| f.set(f.get() + 1)).detach();

        let a = EntityRef::Node(NodeId::intern("sel_once"));
        select.select(a);
        select.select(a);
        assert_eq!(fired.get(), 1);

        select.forget(EntityRef::Node(NodeId::intern("not_selected")));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn hover_tracks_single_entity() {
        let mut hover = HoverService::new();
        let n = NodeId::intern("hover_me");
        hover.set_hovered(Some(EntityRef::Node(n)));
        assert_eq!(hover.hovered_node(), Some(n));
        hover.clear();
        assert!(hover.hovered().is_none());
    }
}
