// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IndexedFaceSet triangulation
//!
//! Scans the `-1`-separated polygon index stream for the maximum polygon
//! size. Size 3 or below emits triangles directly; larger convex faces fan
//! from their first vertex; concave faces go through the Newell-plane ear
//! clipper. Degenerate faces are reported and skipped.

use super::{coordinate_of, triangle_set_node, GeometryGenerator};
use crate::error::FilterError;
use crate::node::SceneNode;
use tracing::warn;
use x3dfilter_core::FieldValue;
use x3dfilter_geometry::triangulation::triangulate_face;
use x3dfilter_geometry::{IndexBuffer, Point3};

pub struct IndexedFaceSetGenerator {
    points: Vec<f32>,
    coord_def: Option<String>,
    coord_index: Vec<i32>,
    convex: bool,
    ccw: bool,
    solid: bool,
}

impl IndexedFaceSetGenerator {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            coord_def: None,
            coord_index: Vec::new(),
            convex: true,
            ccw: true,
            solid: true,
        }
    }

    fn loop_points(&self, face: &[i32]) -> Vec<Point3<f64>> {
        face.iter()
            .map(|&i| {
                let i = i as usize * 3;
                Point3::new(
                    self.points[i] as f64,
                    self.points[i + 1] as f64,
                    self.points[i + 2] as f64,
                )
            })
            .collect()
    }
}

impl Default for IndexedFaceSetGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryGenerator for IndexedFaceSetGenerator {
    fn reset(&mut self) {
        self.points.clear();
        self.coord_def = None;
        self.coord_index.clear();
        self.convex = true;
        self.ccw = true;
        self.solid = true;
    }

    fn set_field(&mut self, name: &str, value: &FieldValue) {
        let result = match name {
            "coordIndex" => value.as_ints().map(|v| self.coord_index = v),
            "convex" => value.as_bool().map(|b| self.convex = b),
            "ccw" => value.as_bool().map(|b| self.ccw = b),
            "solid" => value.as_bool().map(|b| self.solid = b),
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(field = name, error = %e, "rejected face set field");
        }
    }

    fn set_node(&mut self, field: &str, node: &SceneNode) {
        if field == "coord" {
            let (points, def) = coordinate_of(node);
            self.points = points;
            self.coord_def = def;
        }
    }

    fn generate(&self, def_name: Option<String>) -> Result<Option<SceneNode>, FilterError> {
        if self.points.is_empty() || self.coord_index.is_empty() {
            warn!("face set without coordinates or indices, emitting nothing");
            return Ok(None);
        }

        let buf = IndexBuffer::from_flat(self.coord_index.clone());
        if let Err(e) = buf.validate(self.points.len() / 3) {
            warn!(error = %e, "face set index out of range, emitting nothing");
            return Ok(None);
        }

        let max_poly = buf.max_poly_size();
        let mut triangles: Vec<i32> = Vec::new();

        if max_poly <= 3 {
            // Already triangles, just strip the separators.
            for face in buf.face_loops() {
                if face.len() == 3 {
                    triangles.extend_from_slice(face);
                } else {
                    warn!(vertices = face.len(), "degenerate face skipped");
                }
            }
        } else {
            for face in buf.face_loops() {
                if face.len() < 3 {
                    warn!(vertices = face.len(), "degenerate face skipped");
                    continue;
                }
                let pts = self.loop_points(face);
                match triangulate_face(&pts, self.convex, self.ccw) {
                    Ok(local) => triangles.extend(local.iter().map(|&k| face[k])),
                    Err(e) => warn!(error = %e, "face dropped"),
                }
            }
        }

        if triangles.is_empty() {
            return Ok(None);
        }
        Ok(Some(triangle_set_node(
            def_name,
            self.points.clone(),
            self.coord_def.clone(),
            triangles,
            self.solid,
            self.ccw,
        )))
    }
}
