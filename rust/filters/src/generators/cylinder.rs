// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cylinder primitive
//!
//! 16-segment approximation. The `side`, `top` and `bottom` flags select
//! which surfaces are emitted.

use super::{triangle_set_node, GeometryGenerator};
use crate::error::FilterError;
use crate::node::SceneNode;
use tracing::warn;
use x3dfilter_core::FieldValue;

const SEGMENTS: usize = 16;

pub struct CylinderGenerator {
    radius: f32,
    height: f32,
    side: bool,
    top: bool,
    bottom: bool,
    solid: bool,
}

impl CylinderGenerator {
    pub fn new() -> Self {
        Self {
            radius: 1.0,
            height: 2.0,
            side: true,
            top: true,
            bottom: true,
            solid: true,
        }
    }
}

impl Default for CylinderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryGenerator for CylinderGenerator {
    fn reset(&mut self) {
        *self = Self::new();
    }

    fn set_field(&mut self, name: &str, value: &FieldValue) {
        let result = match name {
            "radius" => value.as_float().map(|v| self.radius = v),
            "height" => value.as_float().map(|v| self.height = v),
            "side" => value.as_bool().map(|b| self.side = b),
            "top" => value.as_bool().map(|b| self.top = b),
            "bottom" => value.as_bool().map(|b| self.bottom = b),
            "solid" => value.as_bool().map(|b| self.solid = b),
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(field = name, error = %e, "rejected cylinder field");
        }
    }

    fn set_node(&mut self, _field: &str, _node: &SceneNode) {}

    fn generate(&self, def_name: Option<String>) -> Result<Option<SceneNode>, FilterError> {
        if self.radius <= 0.0 || self.height <= 0.0 {
            warn!(
                radius = self.radius,
                height = self.height,
                "cylinder with non-positive dimensions, emitting nothing"
            );
            return Ok(None);
        }
        if !self.side && !self.top && !self.bottom {
            return Ok(None);
        }

        let half = self.height / 2.0;
        let mut points: Vec<f32> = Vec::with_capacity((SEGMENTS * 2 + 2) * 3);
        // Bottom ring 0..SEGMENTS, top ring SEGMENTS..2*SEGMENTS.
        for &y in &[-half, half] {
            for i in 0..SEGMENTS {
                let theta = (i as f32) * std::f32::consts::TAU / (SEGMENTS as f32);
                points.extend_from_slice(&[
                    self.radius * theta.sin(),
                    y,
                    self.radius * theta.cos(),
                ]);
            }
        }

        let bottom_at = |i: usize| (i % SEGMENTS) as i32;
        let top_at = |i: usize| (SEGMENTS + i % SEGMENTS) as i32;
        let mut indices: Vec<i32> = Vec::new();

        if self.side {
            for i in 0..SEGMENTS {
                let (b0, b1) = (bottom_at(i), bottom_at(i + 1));
                let (t0, t1) = (top_at(i), top_at(i + 1));
                indices.extend_from_slice(&[b0, b1, t1, b0, t1, t0]);
            }
        }
        if self.top {
            let center = (points.len() / 3) as i32;
            points.extend_from_slice(&[0.0, half, 0.0]);
            for i in 0..SEGMENTS {
                indices.extend_from_slice(&[center, top_at(i), top_at(i + 1)]);
            }
        }
        if self.bottom {
            let center = (points.len() / 3) as i32;
            points.extend_from_slice(&[0.0, -half, 0.0]);
            for i in 0..SEGMENTS {
                indices.extend_from_slice(&[center, bottom_at(i + 1), bottom_at(i)]);
            }
        }

        Ok(Some(triangle_set_node(
            def_name, points, None, indices, self.solid, true,
        )))
    }
}
