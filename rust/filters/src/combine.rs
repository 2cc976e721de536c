// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shape combination stage
//!
//! Collects every root-list Shape carrying indexed-triangle geometry and
//! merges them into one at `EndDocument`. Fan and strip variants are
//! normalized to plain triangle triples first. Indices of shape *i* are
//! offset by the running point count before concatenation. The first shape
//! is the output carrier; per-vertex color/normal/texCoord attributes do
//! not survive the merge. Merged points are not deduplicated.

use crate::context::DefMap;
use crate::error::FilterError;
use crate::node::{FieldEntry, NodeBuilder, SceneNode};
use crate::pipeline::DocumentHandler;
use tracing::{debug, warn};
use x3dfilter_core::{DocumentEvent, FieldValue};
use x3dfilter_geometry::CoordinateBuffer;

pub struct CombineShape<D> {
    downstream: D,
    defs: DefMap,
    builder: NodeBuilder,
    roots: Vec<SceneNode>,
    routes: Vec<DocumentEvent>,
    header_seen: bool,
}

impl<D: DocumentHandler> CombineShape<D> {
    pub fn new(downstream: D) -> Self {
        Self {
            downstream,
            defs: DefMap::new(),
            builder: NodeBuilder::new(),
            roots: Vec::new(),
            routes: Vec::new(),
            header_seen: false,
        }
    }

    pub fn into_downstream(self) -> D {
        self.downstream
    }

    fn combine(&mut self) -> Result<(), FilterError> {
        let roots = std::mem::take(&mut self.roots);

        let mut collected: Vec<(SceneNode, CoordinateBuffer, Vec<i32>)> = Vec::new();
        let mut pass_through: Vec<SceneNode> = Vec::new();

        for root in roots {
            match extract_triangles(&root) {
                Some((points, indices)) => collected.push((root, points, indices)),
                None => pass_through.push(root),
            }
        }

        for node in &pass_through {
            node.encode(&mut self.downstream)?;
        }

        if !collected.is_empty() {
            debug!(shapes = collected.len(), "combining shapes");
            let mut merged_points = CoordinateBuffer::new();
            let mut merged_indices: Vec<i32> = Vec::new();
            for (_, points, indices) in &collected {
                let offset = merged_points.point_count() as i32;
                merged_indices.extend(indices.iter().map(|&i| i + offset));
                merged_points.extend_from(points);
            }

            let mut carrier = collected[0].0.clone();
            if let Some(geometry) = carrier.node_mut("geometry") {
                geometry.name = "IndexedTriangleSet".to_string();
                for attr in ["normal", "color", "texCoord"] {
                    geometry.remove_field(attr);
                }
                let mut coord = geometry.node("coord").cloned().unwrap_or_else(|| {
                    SceneNode::new("Coordinate")
                });
                coord.set_entry(
                    "point",
                    FieldEntry::Value(FieldValue::Floats(merged_points.into_flat())),
                );
                geometry.set_entry("coord", FieldEntry::Node(coord));
                geometry.set_entry("index", FieldEntry::Value(FieldValue::Ints(merged_indices)));
            }
            carrier.encode(&mut self.downstream)?;
        }

        for route in std::mem::take(&mut self.routes) {
            self.downstream.handle(route)?;
        }
        Ok(())
    }
}

impl<D: DocumentHandler> DocumentHandler for CombineShape<D> {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), FilterError> {
        match event {
            DocumentEvent::StartDocument { .. } => {
                if self.header_seen {
                    return Err(FilterError::DuplicateHeader);
                }
                self.header_seen = true;
                self.downstream.handle(event)
            }
            DocumentEvent::EndDocument => {
                if !self.header_seen {
                    return Err(FilterError::MissingHeader);
                }
                self.combine()?;
                self.downstream.handle(DocumentEvent::EndDocument)
            }
            DocumentEvent::Route { .. } => {
                self.routes.push(event);
                Ok(())
            }
            other => {
                if let Some(root) = self.builder.push_with_defs(&other, &mut self.defs)? {
                    self.roots.push(root);
                }
                Ok(())
            }
        }
    }
}

/// Pulls (points, triangle indices) out of a Shape with indexed-triangle
/// geometry. `None` means the node is not mergeable and passes through.
fn extract_triangles(root: &SceneNode) -> Option<(CoordinateBuffer, Vec<i32>)> {
    if root.name != "Shape" {
        return None;
    }
    let geometry = root.node("geometry")?;
    let unroll: fn(&[i32]) -> Vec<i32> = match geometry.name.as_str() {
        "IndexedTriangleSet" => |idx| idx.iter().copied().filter(|&i| i >= 0).collect(),
        "IndexedTriangleFanSet" => unroll_fans,
        "IndexedTriangleStripSet" => unroll_strips,
        _ => return None,
    };
    let points = match geometry.node("coord")?.value("point")?.as_floats() {
        Ok(p) => CoordinateBuffer::from_flat(p),
        Err(e) => {
            warn!(error = %e, "unreadable coordinate array, shape left unmerged");
            return None;
        }
    };
    let raw = match geometry.value("index")?.as_ints() {
        Ok(i) => i,
        Err(e) => {
            warn!(error = %e, "unreadable index array, shape left unmerged");
            return None;
        }
    };
    Some((points, unroll(&raw)))
}

fn face_runs(indices: &[i32]) -> impl Iterator<Item = &[i32]> {
    indices.split(|&i| i < 0).filter(|s| !s.is_empty())
}

fn unroll_fans(indices: &[i32]) -> Vec<i32> {
    let mut out = Vec::new();
    for run in face_runs(indices) {
        for i in 1..run.len().saturating_sub(1) {
            out.extend_from_slice(&[run[0], run[i], run[i + 1]]);
        }
    }
    out
}

fn unroll_strips(indices: &[i32]) -> Vec<i32> {
    let mut out = Vec::new();
    for run in face_runs(indices) {
        for i in 0..run.len().saturating_sub(2) {
            // Alternate winding so every triangle keeps the strip's
            // orientation.
            if i % 2 == 0 {
                out.extend_from_slice(&[run[i], run[i + 1], run[i + 2]]);
            } else {
                out.extend_from_slice(&[run[i + 1], run[i], run[i + 2]]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EventCollector;

    #[test]
    fn fans_unroll_to_triples() {
        assert_eq!(
            unroll_fans(&[0, 1, 2, 3, -1, 4, 5, 6, -1]),
            vec![0, 1, 2, 0, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn strips_alternate_winding() {
        assert_eq!(unroll_strips(&[0, 1, 2, 3, -1]), vec![0, 1, 2, 2, 1, 3]);
    }

    fn shape(def: Option<&str>, geometry: &str, points: &[f32], indices: &[i32]) -> SceneNode {
        let mut coord = SceneNode::new("Coordinate");
        coord
            .set_value("point", FieldValue::Floats(points.to_vec()))
            .unwrap();
        let mut geom = SceneNode::new(geometry);
        geom.set_entry("coord", FieldEntry::Node(coord));
        geom.set_value("index", FieldValue::Ints(indices.to_vec()))
            .unwrap();
        let mut shape = SceneNode::with_def("Shape", def.map(|s| s.to_string()));
        shape.set_entry("geometry", FieldEntry::Node(geom));
        shape
    }

    fn run_combine(roots: Vec<SceneNode>) -> Vec<DocumentEvent> {
        let mut stage = CombineShape::new(EventCollector::new());
        stage
            .handle(DocumentEvent::StartDocument {
                uri: String::new(),
                url: String::new(),
                encoding: String::new(),
                kind: String::new(),
                version: String::new(),
                comment: None,
            })
            .unwrap();
        for root in roots {
            let mut replay = EventCollector::new();
            root.encode(&mut replay).unwrap();
            for ev in replay.events {
                stage.handle(ev).unwrap();
            }
        }
        stage.handle(DocumentEvent::EndDocument).unwrap();
        stage.into_downstream().events
    }

    #[test]
    fn two_shapes_merge_with_offset() {
        let a = shape(
            None,
            "IndexedTriangleSet",
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2],
        );
        let b = shape(
            None,
            "IndexedTriangleSet",
            &[
                2.0, 0.0, 0.0, 3.0, 0.0, 0.0, 3.0, 1.0, 0.0, 2.0, 1.0, 0.0,
            ],
            &[0, 1, 2, 0, 2, 3],
        );
        let out = run_combine(vec![a, b]);

        // Exactly one shape in the output.
        let shapes = out
            .iter()
            .filter(|e| matches!(e, DocumentEvent::StartNode { name, .. } if name == "Shape"))
            .count();
        assert_eq!(shapes, 1);

        let mut merged_points = None;
        let mut merged_indices = None;
        for w in out.windows(2) {
            if let (DocumentEvent::StartField { name }, DocumentEvent::Value(v)) = (&w[0], &w[1]) {
                match name.as_str() {
                    "point" => merged_points = Some(v.as_floats().unwrap()),
                    "index" => merged_indices = Some(v.as_ints().unwrap()),
                    _ => {}
                }
            }
        }
        let points = merged_points.unwrap();
        let indices = merged_indices.unwrap();
        assert_eq!(points.len() / 3, 7);
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 3, 5, 6]);
    }

    #[test]
    fn viewpoint_passes_through_unchanged() {
        let mut vp = SceneNode::new("Viewpoint");
        vp.set_value("position", FieldValue::Floats(vec![0.0, 0.0, 5.0]))
            .unwrap();
        let a = shape(
            None,
            "IndexedTriangleSet",
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2],
        );
        let out = run_combine(vec![vp, a]);
        assert!(out
            .iter()
            .any(|e| matches!(e, DocumentEvent::StartNode { name, .. } if name == "Viewpoint")));
    }

    #[test]
    fn fan_geometry_normalizes_before_merge() {
        let a = shape(
            None,
            "IndexedTriangleFanSet",
            &[
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ],
            &[0, 1, 2, 3, -1],
        );
        let out = run_combine(vec![a]);
        let mut indices = None;
        for w in out.windows(2) {
            if let (DocumentEvent::StartField { name }, DocumentEvent::Value(v)) = (&w[0], &w[1]) {
                if name == "index" {
                    indices = Some(v.as_ints().unwrap());
                }
            }
        }
        assert_eq!(indices.unwrap(), vec![0, 1, 2, 0, 2, 3]);
        assert!(out
            .iter()
            .any(|e| matches!(e, DocumentEvent::StartNode { name, .. } if name == "IndexedTriangleSet")));
    }
}
