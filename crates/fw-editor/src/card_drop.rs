//! Dragging a node card in from the palette.
//!
//! The card preview follows the pointer in client space while a fixed-size
//! drag rectangle is collision-tested against the containers the pointer
//! may enter. The eligible containers are collected once, at drag start.

use crate::input::PointerEvent;
use crate::service::DragService;
use crate::session::{DragSession, pump};
use futures::Stream;
use fw_core::{NodeId, NodeType, WorkflowDocument};
use kurbo::{Point, Rect};

pub struct CardDragGesture<'a> {
    service: &'a DragService,
    doc: &'a mut WorkflowDocument,
    node_type: NodeType,
    session: DragSession,
    card_origin: Point,
    preview: Point,
    /// Drop candidates, lowest paint order first.
    containers: Vec<NodeId>,
    target: Option<NodeId>,
}

impl<'a> CardDragGesture<'a> {
    pub(crate) fn start(
        service: &'a DragService,
        doc: &'a mut WorkflowDocument,
        node_type: NodeType,
        start: &PointerEvent,
        card_origin: Point,
    ) -> Self {
        let containers = drop_containers(doc);
        log::debug!("card drag for {node_type} over {} containers", containers.len());
        let session = DragSession::new(start, doc.config());
        Self {
            service,
            doc,
            node_type,
            session,
            card_origin,
            preview: card_origin,
            containers,
            target: None,
        }
    }

    /// The document under the gesture, for rendering mid-drag.
    pub fn document(&self) -> &WorkflowDocument {
        self.doc
    }

    /// Client position of the card preview's top-left corner.
    pub fn preview(&self) -> Point {
        self.preview
    }

    /// The container the card would drop into, if any.
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn on_move(&mut self, event: &PointerEvent) {
        self.session.update(event);
        self.preview = self.card_origin + self.session.delta();

        let world = self.doc.store.playground.pos_from_client(event.client());
        let drag_rect = Rect::from_center_size(world, self.doc.config().card_drag_size);
        let store = &self.doc.store;
        self.target = self.containers.iter().rev().copied().find(|id| {
            store
                .node_bounds(*id)
                .is_some_and(|b| b.intersect(drag_rect).area() > 0.0)
        });
        log::trace!("card drag at {world:?}, target {:?}", self.target);
    }

    /// Release the card. Resolves to the created node; `None` when the drop
    /// is outside the canvas or rejected, in which case the preview is sent
    /// back to the card's origin.
    pub fn finish(mut self, up: &PointerEvent) -> Option<NodeId> {
        self.on_move(up);

        let playground = self.doc.store.playground;
        if !playground.client_rect().contains(up.client()) {
            log::debug!("card dropped outside the canvas");
            return self.reject();
        }
        if let Some(target) = self.target
            && !self
                .service
                .drop_policy
                .can_drop_to_node(&self.doc.store, &self.node_type, target)
        {
            log::debug!("card drop of {} into {target:?} rejected", self.node_type);
            return self.reject();
        }

        let world = playground.pos_from_client(up.client());
        let position = match self.target {
            Some(target) => {
                let origin = self.doc.store.absolute_position(target).unwrap_or_default();
                let local = world - origin.to_vec2();
                Point::new(local.x, local.y.max(self.doc.config().container_padding_top))
            }
            None => world,
        };
        let node_type = self.node_type.clone();
        match self
            .doc
            .create_workflow_node_by_type(node_type, Some(position), None, self.target)
        {
            Ok(id) => {
                log::debug!("card dropped as {id:?}");
                Some(id)
            }
            Err(err) => {
                log::warn!("card drop of {} failed: {err}", self.node_type);
                self.reject()
            }
        }
    }

    fn reject(&mut self) -> Option<NodeId> {
        self.preview = self.card_origin;
        self.target = None;
        None
    }

    pub async fn run<S>(mut self, events: S) -> Option<NodeId>
    where
        S: Stream<Item = PointerEvent>,
    {
        let up = pump(events, |event| self.on_move(event)).await;
        let up = up.unwrap_or_else(|| self.session.last_up());
        self.finish(&up)
    }
}

/// Nodes a card may be dropped into: plain containers and the canvas nodes
/// of sub-canvas containers, provided they and every ancestor are
/// selectable.
fn drop_containers(doc: &WorkflowDocument) -> Vec<NodeId> {
    let store = &doc.store;
    store
        .tree
        .all_nodes()
        .into_iter()
        .filter(|id| {
            let accepts = store.containment.is_canvas(*id)
                || (store.is_container(*id) && store.containment.canvas_of(*id).is_none());
            accepts && selectable_chain(doc, *id)
        })
        .collect()
}

fn selectable_chain(doc: &WorkflowDocument, id: NodeId) -> bool {
    let mut current = Some(id);
    while let Some(node) = current {
        if !doc.store.meta(node).selectable {
            return false;
        }
        current = doc.store.tree.parent(node);
    }
    true
}
