// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Non-indexed to indexed geometry conversion
//!
//! TriangleSet becomes IndexedTriangleSet with sequential indices followed
//! by coordinate dedup; TriangleFanSet and TriangleStripSet become their
//! indexed equivalents with `-1`-separated runs. Geometry that is already
//! indexed passes through untouched. A later USE of a converted DEF'd
//! geometry is replaced by an independent clone of the converted node.

use crate::context::DefMap;
use crate::error::FilterError;
use crate::node::{FieldEntry, NodeBuilder, SceneNode};
use crate::pipeline::DocumentHandler;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use x3dfilter_core::{DocumentEvent, FieldValue};
use x3dfilter_geometry::CoordinateDedup;

const CARRIED_FLAGS: [&str; 4] = ["ccw", "solid", "colorPerVertex", "normalPerVertex"];
const ATTRIBUTE_NODES: [&str; 3] = ["normal", "color", "texCoord"];

pub struct Index<D> {
    downstream: D,
    defs: DefMap,
    builder: NodeBuilder,
    converted: FxHashMap<String, SceneNode>,
}

impl<D: DocumentHandler> Index<D> {
    pub fn new(downstream: D) -> Self {
        Self {
            downstream,
            defs: DefMap::new(),
            builder: NodeBuilder::new(),
            converted: FxHashMap::default(),
        }
    }

    pub fn into_downstream(self) -> D {
        self.downstream
    }

    fn emit_converted(&mut self, node: SceneNode) -> Result<(), FilterError> {
        let output = match node.name.as_str() {
            "TriangleSet" => convert_triangle_set(&node),
            "TriangleFanSet" => convert_counted(&node, "fanCount", "IndexedTriangleFanSet"),
            "TriangleStripSet" => convert_counted(&node, "stripCount", "IndexedTriangleStripSet"),
            _ => Some(node),
        };
        match output {
            Some(out) => {
                if let Some(def) = out.def_name.as_deref() {
                    self.converted.insert(def.to_string(), out.clone());
                }
                out.encode(&mut self.downstream)
            }
            // Geometry without coordinates produces no output.
            None => Ok(()),
        }
    }
}

impl<D: DocumentHandler> DocumentHandler for Index<D> {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), FilterError> {
        if self.builder.is_active() {
            if let Some(node) = self.builder.push_with_defs(&event, &mut self.defs)? {
                return self.emit_converted(node);
            }
            return Ok(());
        }
        match &event {
            DocumentEvent::StartNode { name, .. }
                if matches!(
                    name.as_str(),
                    "TriangleSet" | "TriangleFanSet" | "TriangleStripSet"
                ) =>
            {
                debug!(node = %name, "intercepting non-indexed geometry");
                self.builder.push_with_defs(&event, &mut self.defs)?;
                Ok(())
            }
            DocumentEvent::UseRef { def_name } => {
                if let Some(converted) = self.converted.get(def_name) {
                    let mut clone = converted.clone();
                    clone.def_name = None;
                    clone.encode(&mut self.downstream)
                } else {
                    self.downstream.handle(event)
                }
            }
            _ => self.downstream.handle(event),
        }
    }
}

fn coordinate_points(node: &SceneNode) -> Option<(Vec<f32>, Option<String>)> {
    let coord = node.node("coord")?;
    match coord.value("point")?.as_floats() {
        Ok(points) if !points.is_empty() => Some((points, coord.def_name.clone())),
        Ok(_) => None,
        Err(e) => {
            warn!(node = %node.name, error = %e, "unreadable coordinate array");
            None
        }
    }
}

fn indexed_output(
    source: &SceneNode,
    name: &str,
    points: Vec<f32>,
    coord_def: Option<String>,
    indices: Vec<i32>,
) -> SceneNode {
    let mut out = SceneNode::with_def(name, source.def_name.clone());
    let mut coord = SceneNode::with_def("Coordinate", coord_def);
    coord.set_entry("point", FieldEntry::Value(FieldValue::Floats(points)));
    out.set_entry("coord", FieldEntry::Node(coord));
    out.set_entry("index", FieldEntry::Value(FieldValue::Ints(indices)));
    for flag in CARRIED_FLAGS {
        if let Some(v) = source.value(flag) {
            out.set_entry(flag, FieldEntry::Value(v.clone()));
        }
    }
    for attr in ATTRIBUTE_NODES {
        if let Some(n) = source.node(attr) {
            out.set_entry(attr, FieldEntry::Node(n.clone()));
        }
    }
    out
}

fn convert_triangle_set(node: &SceneNode) -> Option<SceneNode> {
    let (mut points, coord_def) = match coordinate_points(node) {
        Some(p) => p,
        None => {
            warn!("TriangleSet without coordinates, emitting nothing");
            return None;
        }
    };
    let usable = {
        let count = points.len() / 3;
        count - count % 3
    };
    // Trailing points that cannot form a full triangle are dropped.
    points.truncate(usable * 3);
    let mut indices: Vec<i32> = (0..usable as i32).collect();

    // Per-vertex attribute arrays are positional; compacting coordinates
    // under them would misalign the data.
    let has_attributes = ATTRIBUTE_NODES.iter().any(|a| node.node(a).is_some());
    if !has_attributes {
        if let Some(map) = CoordinateDedup::default().compact(&mut points) {
            debug!(removed = map.removed_count(), "deduplicated triangle set");
            map.remap(&mut indices);
        }
    }

    Some(indexed_output(
        node,
        "IndexedTriangleSet",
        points,
        coord_def,
        indices,
    ))
}

/// Fan and strip sets share one conversion: the count array becomes
/// `-1`-separated index runs over sequentially numbered vertices.
fn convert_counted(node: &SceneNode, count_field: &str, out_name: &str) -> Option<SceneNode> {
    let (points, coord_def) = match coordinate_points(node) {
        Some(p) => p,
        None => {
            warn!(node = %node.name, "geometry without coordinates, emitting nothing");
            return None;
        }
    };
    let counts = match node.value(count_field).map(|v| v.as_ints()) {
        Some(Ok(c)) => c,
        _ => {
            warn!(node = %node.name, field = count_field, "missing or unreadable count array");
            return None;
        }
    };

    let point_count = (points.len() / 3) as i32;
    let mut indices = Vec::new();
    let mut cursor = 0i32;
    for count in counts {
        if count < 3 {
            warn!(count, "degenerate run skipped");
            cursor += count.max(0);
            continue;
        }
        if cursor + count > point_count {
            warn!(cursor, count, point_count, "count array overruns points");
            break;
        }
        indices.extend(cursor..cursor + count);
        indices.push(-1);
        cursor += count;
    }

    Some(indexed_output(node, out_name, points, coord_def, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EventCollector;

    fn triangle_set(points: &[f32]) -> SceneNode {
        let mut coord = SceneNode::new("Coordinate");
        coord
            .set_value("point", FieldValue::Floats(points.to_vec()))
            .unwrap();
        let mut ts = SceneNode::new("TriangleSet");
        ts.set_entry("coord", FieldEntry::Node(coord));
        ts
    }

    fn run(node: &SceneNode) -> Vec<DocumentEvent> {
        let mut stage = Index::new(EventCollector::new());
        let mut replay = EventCollector::new();
        node.encode(&mut replay).unwrap();
        for ev in replay.events {
            stage.handle(ev).unwrap();
        }
        stage.into_downstream().events
    }

    fn field_value<'a>(events: &'a [DocumentEvent], field: &str) -> Option<&'a FieldValue> {
        for w in events.windows(2) {
            if let (DocumentEvent::StartField { name }, DocumentEvent::Value(v)) = (&w[0], &w[1]) {
                if name == field {
                    return Some(v);
                }
            }
        }
        None
    }

    #[test]
    fn shared_edge_dedups_to_four_points() {
        // Two triangles sharing the edge (1,0,0)-(0,1,0), six raw vertices.
        let ts = triangle_set(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ]);
        let out = run(&ts);
        assert!(out
            .iter()
            .any(|e| matches!(e, DocumentEvent::StartNode { name, .. } if name == "IndexedTriangleSet")));
        let points = field_value(&out, "point").unwrap().as_floats().unwrap();
        let indices = field_value(&out, "index").unwrap().as_ints().unwrap();
        assert_eq!(points.len() / 3, 4);
        assert_eq!(indices, vec![0, 1, 2, 1, 3, 2]);
        assert!(indices.iter().all(|&i| (i as usize) < points.len() / 3));
    }

    #[test]
    fn partial_trailing_triangle_is_dropped() {
        // Seven distinct vertices: two full triangles plus one leftover
        // point that no index can reference.
        let ts = triangle_set(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            2.0, 0.0, 0.0, //
            3.0, 0.0, 0.0, //
            2.0, 1.0, 0.0, //
            9.0, 9.0, 9.0,
        ]);
        let out = run(&ts);
        let points = field_value(&out, "point").unwrap().as_floats().unwrap();
        let indices = field_value(&out, "index").unwrap().as_ints().unwrap();
        assert_eq!(points.len() / 3, 6);
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn fan_counts_become_runs() {
        let mut tfs = triangle_set(&[0.0; 21]);
        tfs.name = "TriangleFanSet".into();
        tfs.set_value("fanCount", FieldValue::Ints(vec![4, 3])).unwrap();
        let out = run(&tfs);
        let indices = field_value(&out, "index").unwrap().as_ints().unwrap();
        assert_eq!(indices, vec![0, 1, 2, 3, -1, 4, 5, 6, -1]);
        assert!(out
            .iter()
            .any(|e| matches!(e, DocumentEvent::StartNode { name, .. } if name == "IndexedTriangleFanSet")));
    }

    #[test]
    fn empty_geometry_emits_nothing() {
        let mut ts = SceneNode::new("TriangleSet");
        ts.set_value("ccw", FieldValue::Bool(true)).unwrap();
        let out = run(&ts);
        assert!(out.is_empty());
    }

    #[test]
    fn indexed_geometry_passes_through() {
        let mut its = SceneNode::new("IndexedTriangleSet");
        its.set_value("index", FieldValue::Ints(vec![0, 1, 2]))
            .unwrap();
        let out = run(&its);
        assert!(out
            .iter()
            .any(|e| matches!(e, DocumentEvent::StartNode { name, .. } if name == "IndexedTriangleSet")));
    }

    #[test]
    fn use_of_converted_def_inlines_clone() {
        let mut ts = triangle_set(&[
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ]);
        ts.def_name = Some("TRI".into());
        let mut stage = Index::new(EventCollector::new());
        let mut replay = EventCollector::new();
        ts.encode(&mut replay).unwrap();
        for ev in replay.events {
            stage.handle(ev).unwrap();
        }
        stage
            .handle(DocumentEvent::UseRef {
                def_name: "TRI".into(),
            })
            .unwrap();
        let out = stage.into_downstream().events;
        let its_count = out
            .iter()
            .filter(|e| {
                matches!(e, DocumentEvent::StartNode { name, .. } if name == "IndexedTriangleSet")
            })
            .count();
        assert_eq!(its_count, 2);
        // The inlined clone carries no DEF.
        let defs: Vec<_> = out
            .iter()
            .filter_map(|e| match e {
                DocumentEvent::StartNode { name, def_name } if name == "IndexedTriangleSet" => {
                    Some(def_name.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(defs, vec![Some("TRI".to_string()), None]);
    }
}
