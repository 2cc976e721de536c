// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end pipeline checks over complete documents.

use approx::assert_relative_eq;
use x3dfilter_core::{DocumentEvent, FieldValue};
use x3dfilter_filters::{build_pipeline, send_all, EventCollector, FilterSpec};

fn header() -> DocumentEvent {
    DocumentEvent::StartDocument {
        uri: "memory".into(),
        url: "memory".into(),
        encoding: "utf8".into(),
        kind: "scene".into(),
        version: "3.0".into(),
        comment: None,
    }
}

fn doc(body: Vec<DocumentEvent>) -> Vec<DocumentEvent> {
    let mut events = vec![header()];
    events.extend(body);
    events.push(DocumentEvent::EndDocument);
    events
}

fn start(name: &str) -> DocumentEvent {
    DocumentEvent::StartNode {
        name: name.into(),
        def_name: None,
    }
}

fn field(name: &str) -> DocumentEvent {
    DocumentEvent::StartField { name: name.into() }
}

fn text(payload: &str) -> DocumentEvent {
    DocumentEvent::Value(FieldValue::Text(payload.into()))
}

fn shape(geometry: Vec<DocumentEvent>) -> Vec<DocumentEvent> {
    let mut events = vec![start("Shape"), field("geometry")];
    events.extend(geometry);
    events.push(DocumentEvent::EndField);
    events.push(DocumentEvent::EndNode);
    events
}

fn coordinate(points: &str) -> Vec<DocumentEvent> {
    vec![
        field("coord"),
        start("Coordinate"),
        field("point"),
        text(points),
        DocumentEvent::EndField,
        DocumentEvent::EndNode,
        DocumentEvent::EndField,
    ]
}

fn face_set(points: &str, coord_index: &str) -> Vec<DocumentEvent> {
    let mut events = vec![start("IndexedFaceSet")];
    events.extend(coordinate(points));
    events.push(field("coordIndex"));
    events.push(text(coord_index));
    events.push(DocumentEvent::EndField);
    events.push(DocumentEvent::EndNode);
    events
}

/// Sink that shares its buffer with the test so the events can be read
/// back after the boxed chain is dropped.
#[derive(Clone, Default)]
struct SharedSink(std::rc::Rc<std::cell::RefCell<Vec<DocumentEvent>>>);

impl x3dfilter_filters::DocumentHandler for SharedSink {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), x3dfilter_filters::FilterError> {
        self.0.borrow_mut().push(event);
        Ok(())
    }
}

/// Runs events through one named stage and returns the sink contents.
fn run_stage(name: &str, events: Vec<DocumentEvent>) -> Vec<DocumentEvent> {
    run_stages(&[name], events)
}

fn run_stages(names: &[&str], events: Vec<DocumentEvent>) -> Vec<DocumentEvent> {
    let specs: Vec<FilterSpec> = names.iter().map(|n| FilterSpec::new(*n)).collect();
    let sink = SharedSink::default();
    let tap = sink.clone();
    let mut chain = build_pipeline(&specs, Box::new(sink)).unwrap();
    send_all(chain.as_mut(), events).unwrap();
    drop(chain);
    tap.0.take()
}

fn assert_balanced(events: &[DocumentEvent]) {
    let mut depth = 0i32;
    for ev in events {
        match ev {
            DocumentEvent::StartNode { .. } | DocumentEvent::StartField { .. } => depth += 1,
            DocumentEvent::EndNode | DocumentEvent::EndField => {
                depth -= 1;
                assert!(depth >= 0, "close without matching open");
            }
            _ => {}
        }
    }
    assert_eq!(depth, 0, "stream left open at end");
}

fn field_floats(events: &[DocumentEvent], name: &str) -> Option<Vec<f32>> {
    for w in events.windows(2) {
        if let (DocumentEvent::StartField { name: n }, DocumentEvent::Value(v)) = (&w[0], &w[1]) {
            if n == name {
                return v.as_floats().ok();
            }
        }
    }
    None
}

fn field_ints(events: &[DocumentEvent], name: &str) -> Option<Vec<i32>> {
    for w in events.windows(2) {
        if let (DocumentEvent::StartField { name: n }, DocumentEvent::Value(v)) = (&w[0], &w[1]) {
            if n == name {
                return v.as_ints().ok();
            }
        }
    }
    None
}

fn node_count(events: &[DocumentEvent], name: &str) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, DocumentEvent::StartNode { name: n, .. } if n == name))
        .count()
}

#[test]
fn every_stage_preserves_balance() {
    let body = {
        let mut b = vec![
            start("Transform"),
            field("translation"),
            text("1 2 3"),
            DocumentEvent::EndField,
            field("children"),
        ];
        b.extend(shape(face_set(
            "0 0 0 1 0 0 1 1 0 0 1 0",
            "0 1 2 3 -1",
        )));
        b.push(DocumentEvent::EndField);
        b.push(DocumentEvent::EndNode);
        b
    };
    for stage in [
        "Identity",
        "FlattenTransform",
        "CombineShape",
        "Index",
        "Triangulation",
        "GenNormals",
        "Recode",
    ] {
        let out = run_stage(stage, doc(body.clone()));
        assert_balanced(&out);
    }
}

#[test]
fn flatten_bakes_nested_translations() {
    let mut inner = vec![
        start("Transform"),
        field("translation"),
        text("0 0 5"),
        DocumentEvent::EndField,
        field("children"),
    ];
    inner.extend(shape(face_set("0 0 0 1 0 0 0 1 0", "0 1 2 -1")));
    inner.push(DocumentEvent::EndField);
    inner.push(DocumentEvent::EndNode);

    let mut outer = vec![
        start("Transform"),
        field("translation"),
        text("2 0 0"),
        DocumentEvent::EndField,
        field("children"),
    ];
    outer.extend(inner);
    outer.push(DocumentEvent::EndField);
    outer.push(DocumentEvent::EndNode);

    let out = run_stage("FlattenTransform", doc(outer));
    assert_eq!(node_count(&out, "Transform"), 0);
    let pts = field_floats(&out, "point").unwrap();
    assert_relative_eq!(pts[0], 2.0, epsilon = 1e-5);
    assert_relative_eq!(pts[2], 5.0, epsilon = 1e-5);
}

#[test]
fn index_merges_shared_edge_vertices() {
    let mut ts = vec![start("TriangleSet")];
    ts.extend(coordinate(
        "0 0 0  1 0 0  0 1 0  1 0 0  1 1 0  0 1 0",
    ));
    ts.push(DocumentEvent::EndNode);
    let out = run_stage("Index", doc(shape(ts)));
    assert_balanced(&out);
    let pts = field_floats(&out, "point").unwrap();
    assert_eq!(pts.len() / 3, 4);
    let idx = field_ints(&out, "index").unwrap();
    assert_eq!(idx, vec![0, 1, 2, 1, 3, 2]);
}

#[test]
fn triangulation_fans_convex_quads() {
    let out = run_stage(
        "Triangulation",
        doc(shape(face_set("0 0 0 1 0 0 1 1 0 0 1 0", "0 1 2 3 -1"))),
    );
    assert_eq!(node_count(&out, "IndexedFaceSet"), 0);
    assert_eq!(node_count(&out, "IndexedTriangleSet"), 1);
    let idx = field_ints(&out, "index").unwrap();
    assert_eq!(idx, vec![0, 1, 2, 0, 2, 3]);
}

#[test]
fn triangulation_handles_concave_faces() {
    // L-shaped hexagon, declared non-convex.
    let mut fs = vec![start("IndexedFaceSet")];
    fs.extend(coordinate(
        "0 0 0  2 0 0  2 1 0  1 1 0  1 2 0  0 2 0",
    ));
    fs.push(field("coordIndex"));
    fs.push(text("0 1 2 3 4 5 -1"));
    fs.push(DocumentEvent::EndField);
    fs.push(field("convex"));
    fs.push(DocumentEvent::Value(FieldValue::Bool(false)));
    fs.push(DocumentEvent::EndField);
    fs.push(DocumentEvent::EndNode);

    let out = run_stage("Triangulation", doc(shape(fs)));
    let idx = field_ints(&out, "index").unwrap();
    assert_eq!(idx.len(), (6 - 2) * 3);
    assert!(idx.iter().all(|&i| (0..6).contains(&i)));
}

#[test]
fn gen_normals_covers_every_vertex() {
    let mut its = vec![start("IndexedTriangleSet")];
    // Five points; vertex 3 sits between referenced indices but no
    // triangle touches it.
    its.extend(coordinate("0 0 0  1 0 0  0 1 0  7 7 7  1 1 0"));
    its.push(field("index"));
    its.push(DocumentEvent::Value(FieldValue::Ints(vec![0, 1, 2, 2, 1, 4])));
    its.push(DocumentEvent::EndField);
    its.push(DocumentEvent::EndNode);

    let out = run_stage("GenNormals", doc(shape(its)));
    assert_balanced(&out);
    let vectors = field_floats(&out, "vector").unwrap();
    // One vector per slot up to the highest referenced index.
    assert_eq!(vectors.len(), 5 * 3);
    for n in vectors[0..9].chunks_exact(3) {
        assert_relative_eq!(n[2], 1.0, epsilon = 1e-5);
    }
    // Untouched vertex falls back to +z.
    assert_eq!(&vectors[9..12], &[0.0, 0.0, 1.0]);
}

#[test]
fn combine_offsets_second_shape_indices() {
    let mut body = Vec::new();
    let mut a = vec![start("IndexedTriangleSet")];
    a.extend(coordinate("0 0 0  1 0 0  0 1 0"));
    a.push(field("index"));
    a.push(DocumentEvent::Value(FieldValue::Ints(vec![0, 1, 2])));
    a.push(DocumentEvent::EndField);
    a.push(DocumentEvent::EndNode);
    body.extend(shape(a));

    let mut b = vec![start("IndexedTriangleSet")];
    b.extend(coordinate("5 0 0  6 0 0  6 1 0  5 1 0"));
    b.push(field("index"));
    b.push(DocumentEvent::Value(FieldValue::Ints(vec![0, 1, 2, 0, 2, 3])));
    b.push(DocumentEvent::EndField);
    b.push(DocumentEvent::EndNode);
    body.extend(shape(b));

    let out = run_stage("CombineShape", doc(body));
    assert_balanced(&out);
    assert_eq!(node_count(&out, "Shape"), 1);
    let pts = field_floats(&out, "point").unwrap();
    assert_eq!(pts.len() / 3, 7);
    let idx = field_ints(&out, "index").unwrap();
    assert_eq!(idx, vec![0, 1, 2, 3, 4, 5, 3, 5, 6]);
}

#[test]
fn chained_stages_produce_renderable_mesh() {
    // Flatten, triangulate, synthesize normals, then force binary payloads.
    let mut body = vec![
        start("Transform"),
        field("translation"),
        text("10 0 0"),
        DocumentEvent::EndField,
        field("children"),
    ];
    body.extend(shape(face_set("0 0 0 1 0 0 1 1 0 0 1 0", "0 1 2 3 -1")));
    body.push(DocumentEvent::EndField);
    body.push(DocumentEvent::EndNode);

    let out = run_stages(
        &["FlattenTransform", "Triangulation", "GenNormals", "Recode"],
        doc(body),
    );
    assert_balanced(&out);
    assert_eq!(node_count(&out, "Transform"), 0);
    assert_eq!(node_count(&out, "IndexedFaceSet"), 0);
    assert_eq!(node_count(&out, "IndexedTriangleSet"), 1);
    assert_eq!(node_count(&out, "Normal"), 1);

    let pts = field_floats(&out, "point").unwrap();
    assert_relative_eq!(pts[0], 10.0, epsilon = 1e-4);
    let vectors = field_floats(&out, "vector").unwrap();
    assert_eq!(vectors.len(), pts.len());
    // No lexical payloads survive the binary recode.
    assert!(!out
        .iter()
        .any(|e| matches!(e, DocumentEvent::Value(v) if v.is_textual())));
}

#[test]
fn unknown_stage_name_fails_pipeline_construction() {
    let sink = Box::new(EventCollector::new());
    assert!(build_pipeline(&[FilterSpec::new("Emboss")], sink).is_err());
}
