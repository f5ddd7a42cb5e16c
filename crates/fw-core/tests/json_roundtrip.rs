//! Integration tests: graph JSON import/export through the workflow document.
//!
//! Round-trips plain and nested documents and checks the sub-canvas
//! substitution on both the import and the export side.

use fw_core::*;
use pretty_assertions::assert_eq;
use serde_json::Value;

fn document() -> WorkflowDocument {
    let mut doc = WorkflowDocument::default();
    doc.register(NodeRegistry::start("start"));
    doc.register(NodeRegistry::end("end"));
    doc.register(NodeRegistry::new("llm"));
    doc.register(NodeRegistry::new("condition"));
    doc.register(NodeRegistry::new("group").container());
    doc.register(
        NodeRegistry::new("loop").with_sub_canvas(|id| SubCanvas {
            canvas_id: NodeId::intern(&format!("{id}_canvas")),
            canvas_type: "sub_canvas".into(),
            offset: Vec2::new(0.0, 200.0),
        }),
    );
    doc
}

fn roundtrip(fixture: &str) -> (WorkflowDocument, Value) {
    let mut doc = document();
    doc.load(fixture).unwrap();
    let exported = doc.to_json().unwrap().to_value().unwrap();
    (doc, exported)
}

fn parse(fixture: &str) -> Value {
    serde_json::from_str(fixture).unwrap()
}

// ─── Round-trip ─────────────────────────────────────────────────────────

#[test]
fn roundtrip_simple_graph() {
    let input = include_str!("fixtures/simple.json");
    let (doc, exported) = roundtrip(input);
    assert_eq!(exported, parse(input));
    assert_eq!(doc.lines.len(), 4);
}

#[test]
fn roundtrip_nested_blocks() {
    let input = include_str!("fixtures/nested.json");
    let (_, exported) = roundtrip(input);
    assert_eq!(exported, parse(input));
}

#[test]
fn reimport_of_export_is_stable() {
    let input = include_str!("fixtures/nested.json");
    let (mut doc, first) = roundtrip(input);
    let json = doc.to_json().unwrap();
    doc.from_json(&json).unwrap();
    assert_eq!(doc.to_json().unwrap().to_value().unwrap(), first);
}

#[test]
fn moved_node_exports_new_position() {
    let mut doc = document();
    doc.load(include_str!("fixtures/simple.json")).unwrap();
    let llm = NodeId::intern("llm_0");
    doc.move_node(llm, Point::new(820.5, -100.0)).unwrap();

    let json = doc.to_node_json(llm).unwrap();
    let meta = json.meta.unwrap();
    assert_eq!(meta["position"], serde_json::json!({ "x": 820.5, "y": -100 }));
    // Unknown meta survives.
    assert_eq!(meta["defaultExpanded"], Value::Bool(true));
}

// ─── Sub-canvas ─────────────────────────────────────────────────────────

#[test]
fn sub_canvas_import_substitutes_canvas_node() {
    let mut doc = document();
    doc.load(include_str!("fixtures/sub_canvas.json")).unwrap();

    let container = NodeId::intern("loop_0");
    let canvas = NodeId::intern("loop_0_canvas");
    let child = NodeId::intern("llm_1");

    assert_eq!(doc.store.containment.canvas_of(container), Some(canvas));
    assert_eq!(doc.store.tree.parent(canvas), None);
    assert_eq!(doc.store.tree.parent(child), Some(canvas));
    assert_eq!(
        doc.store.absolute_position(canvas),
        Some(Point::new(400.0, 200.0))
    );
    assert_eq!(
        doc.store.absolute_position(child),
        Some(Point::new(500.0, 240.0))
    );

    // Block edges that referenced the container now hang off the canvas.
    assert!(doc.lines.contains(LineInfo::new("loop_0_canvas", "llm_1").id()));
    assert!(doc.lines.contains(LineInfo::new("llm_1", "loop_0_canvas").id()));
    assert!(!doc.lines.contains(LineInfo::new("loop_0", "llm_1").id()));
    // Top-level edges keep the container.
    assert!(doc.lines.contains(LineInfo::new("start_0", "loop_0").id()));
}

#[test]
fn sub_canvas_export_collapses_canvas_node() {
    let input = include_str!("fixtures/sub_canvas.json");
    let (_, exported) = roundtrip(input);
    assert_eq!(exported, parse(input));
}

#[test]
fn structural_container_canvas_line_is_not_exported() {
    let mut doc = document();
    doc.load(include_str!("fixtures/sub_canvas.json")).unwrap();
    doc.create_line(LineInfo::new("loop_0", "loop_0_canvas"))
        .unwrap();

    let json = doc.to_json().unwrap();
    let loop_json = json.nodes.iter().find(|n| n.id.as_str() == "loop_0").unwrap();
    assert_eq!(loop_json.edges.as_ref().unwrap().len(), 2);
    assert_eq!(json.edges.len(), 2);
}

#[test]
fn moved_canvas_exports_canvas_position() {
    let mut doc = document();
    doc.load(include_str!("fixtures/sub_canvas.json")).unwrap();
    doc.move_node(NodeId::intern("loop_0_canvas"), Point::new(400.0, 320.0))
        .unwrap();

    let json = doc.to_node_json(NodeId::intern("loop_0")).unwrap();
    assert_eq!(
        json.canvas_position(),
        Some(Point::new(400.0, 320.0))
    );

    let mut again = document();
    again
        .from_json(&WorkflowJson {
            nodes: vec![json],
            edges: Vec::new(),
        })
        .unwrap();
    assert_eq!(
        again.store.absolute_position(NodeId::intern("loop_0_canvas")),
        Some(Point::new(400.0, 320.0))
    );
}

// ─── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn two_node_scenario_exports_one_edge() {
    let mut doc = WorkflowDocument::default();
    doc.create_workflow_node(
        &NodeJson::new(NodeId::intern("start_0"), "start").with_position(Point::new(0.0, 0.0)),
        false,
        None,
    )
    .unwrap();
    doc.create_workflow_node(
        &NodeJson::new(NodeId::intern("end_0"), "end").with_position(Point::new(800.0, 0.0)),
        false,
        None,
    )
    .unwrap();

    let line = doc.create_line(LineInfo::new("start_0", "end_0")).unwrap();
    assert_eq!(line.as_str(), "start_0_-end_0_");

    let edges = serde_json::to_value(doc.to_json().unwrap().edges).unwrap();
    assert_eq!(
        edges,
        serde_json::json!([{ "sourceNodeID": "start_0", "targetNodeID": "end_0" }])
    );
}

#[test]
fn load_rejects_malformed_json() {
    let mut doc = document();
    assert!(matches!(doc.load("{ \"nodes\": 3 }"), Err(Error::Json(_))));
}
