// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Box primitive

use super::{triangle_set_node, GeometryGenerator};
use crate::error::FilterError;
use crate::node::SceneNode;
use tracing::warn;
use x3dfilter_core::FieldValue;

/// Unit corners, scaled by the half extents at generation time.
const CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
];

/// Two triangles per face, outward winding.
const TRIANGLES: [i32; 36] = [
    0, 1, 2, 0, 2, 3, // front
    1, 5, 6, 1, 6, 2, // right
    5, 4, 7, 5, 7, 6, // back
    4, 0, 3, 4, 3, 7, // left
    3, 2, 6, 3, 6, 7, // top
    4, 5, 1, 4, 1, 0, // bottom
];

pub struct BoxGenerator {
    size: [f32; 3],
    solid: bool,
}

impl BoxGenerator {
    pub fn new() -> Self {
        Self {
            size: [2.0, 2.0, 2.0],
            solid: true,
        }
    }
}

impl Default for BoxGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryGenerator for BoxGenerator {
    fn reset(&mut self) {
        self.size = [2.0, 2.0, 2.0];
        self.solid = true;
    }

    fn set_field(&mut self, name: &str, value: &FieldValue) {
        let result = match name {
            "size" => value.as_floats().map(|v| {
                if v.len() >= 3 {
                    self.size = [v[0], v[1], v[2]];
                }
            }),
            "solid" => value.as_bool().map(|b| self.solid = b),
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(field = name, error = %e, "rejected box field");
        }
    }

    fn set_node(&mut self, _field: &str, _node: &SceneNode) {}

    fn generate(&self, def_name: Option<String>) -> Result<Option<SceneNode>, FilterError> {
        if self.size.iter().any(|&s| s <= 0.0) {
            warn!(size = ?self.size, "box with non-positive size, emitting nothing");
            return Ok(None);
        }
        let hx = self.size[0] / 2.0;
        let hy = self.size[1] / 2.0;
        let hz = self.size[2] / 2.0;
        let mut points = Vec::with_capacity(24);
        for c in CORNERS {
            points.extend_from_slice(&[c[0] * hx, c[1] * hy, c[2] * hz]);
        }
        Ok(Some(triangle_set_node(
            def_name,
            points,
            None,
            TRIANGLES.to_vec(),
            self.solid,
            true,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_box_spans_two_units() {
        let g = BoxGenerator::new();
        let out = g.generate(None).unwrap().unwrap();
        let pts = out
            .node("coord")
            .unwrap()
            .value("point")
            .unwrap()
            .as_floats()
            .unwrap();
        assert_eq!(pts.len(), 24);
        assert!(pts.iter().all(|p| p.abs() == 1.0));
        let idx = out.value("index").unwrap().as_ints().unwrap();
        assert_eq!(idx.len(), 36);
        assert!(idx.iter().all(|&i| i >= 0 && i < 8));
    }

    #[test]
    fn size_field_scales_corners() {
        let mut g = BoxGenerator::new();
        g.set_field("size", &FieldValue::Floats(vec![4.0, 2.0, 6.0]));
        let out = g.generate(None).unwrap().unwrap();
        let pts = out
            .node("coord")
            .unwrap()
            .value("point")
            .unwrap()
            .as_floats()
            .unwrap();
        assert_eq!(pts[0].abs(), 2.0);
        assert_eq!(pts[1].abs(), 1.0);
        assert_eq!(pts[2].abs(), 3.0);
    }

    #[test]
    fn degenerate_size_emits_nothing() {
        let mut g = BoxGenerator::new();
        g.set_field("size", &FieldValue::Floats(vec![0.0, 1.0, 1.0]));
        assert!(g.generate(None).unwrap().is_none());
    }
}
