// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ElevationGrid primitive
//!
//! A regular xz grid of heights; every cell splits into two triangles.
//! Missing height entries read as zero.

use super::{triangle_set_node, GeometryGenerator};
use crate::error::FilterError;
use crate::node::SceneNode;
use tracing::warn;
use x3dfilter_core::FieldValue;

pub struct ElevationGridGenerator {
    x_dimension: i32,
    z_dimension: i32,
    x_spacing: f32,
    z_spacing: f32,
    height: Vec<f32>,
    solid: bool,
    ccw: bool,
}

impl ElevationGridGenerator {
    pub fn new() -> Self {
        Self {
            x_dimension: 0,
            z_dimension: 0,
            x_spacing: 1.0,
            z_spacing: 1.0,
            height: Vec::new(),
            solid: true,
            ccw: true,
        }
    }
}

impl Default for ElevationGridGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryGenerator for ElevationGridGenerator {
    fn reset(&mut self) {
        *self = Self::new();
    }

    fn set_field(&mut self, name: &str, value: &FieldValue) {
        let result = match name {
            "xDimension" => value.as_int().map(|v| self.x_dimension = v),
            "zDimension" => value.as_int().map(|v| self.z_dimension = v),
            "xSpacing" => value.as_float().map(|v| self.x_spacing = v),
            "zSpacing" => value.as_float().map(|v| self.z_spacing = v),
            "height" => value.as_floats().map(|v| self.height = v),
            "solid" => value.as_bool().map(|b| self.solid = b),
            "ccw" => value.as_bool().map(|b| self.ccw = b),
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(field = name, error = %e, "rejected elevation grid field");
        }
    }

    fn set_node(&mut self, _field: &str, _node: &SceneNode) {}

    fn generate(&self, def_name: Option<String>) -> Result<Option<SceneNode>, FilterError> {
        if self.x_dimension < 2 || self.z_dimension < 2 {
            warn!(
                x = self.x_dimension,
                z = self.z_dimension,
                "elevation grid needs at least a 2x2 lattice, emitting nothing"
            );
            return Ok(None);
        }
        let xd = self.x_dimension as usize;
        let zd = self.z_dimension as usize;

        let mut points = Vec::with_capacity(xd * zd * 3);
        for z in 0..zd {
            for x in 0..xd {
                let h = self.height.get(z * xd + x).copied().unwrap_or(0.0);
                points.extend_from_slice(&[
                    x as f32 * self.x_spacing,
                    h,
                    z as f32 * self.z_spacing,
                ]);
            }
        }

        let mut indices = Vec::with_capacity((xd - 1) * (zd - 1) * 6);
        for z in 0..zd - 1 {
            for x in 0..xd - 1 {
                let a = (z * xd + x) as i32;
                let b = a + 1;
                let d = a + xd as i32;
                let c = d + 1;
                // Upward-facing winding: (a,d,c) then (a,c,b).
                indices.extend_from_slice(&[a, d, c, a, c, b]);
            }
        }

        Ok(Some(triangle_set_node(
            def_name, points, None, indices, self.solid, self.ccw,
        )))
    }
}
