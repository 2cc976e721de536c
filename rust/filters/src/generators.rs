// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry generators
//!
//! One stateful holder per primitive kind accumulates raw field values and
//! emits the equivalent indexed-triangle node when the source node closes.
//! Holders are pooled by node-type name and reset between uses; the
//! name-to-constructor table is built once at startup, and a lookup miss
//! is a normal, non-exceptional outcome.

pub mod box_shape;
pub mod cylinder;
pub mod elevation_grid;
pub mod face_set;

use crate::error::FilterError;
use crate::node::{FieldEntry, SceneNode};
use rustc_hash::FxHashMap;
use std::sync::OnceLock;
use x3dfilter_core::FieldValue;

pub trait GeometryGenerator {
    /// Restores default field values so the pooled holder can be reused.
    fn reset(&mut self);

    /// Accumulates one raw field value.
    fn set_field(&mut self, name: &str, value: &FieldValue);

    /// Accumulates one node-valued field (coord and friends).
    fn set_node(&mut self, field: &str, node: &SceneNode);

    /// Emits the triangle-mesh equivalent. `Ok(None)` means the source was
    /// empty or degenerate and produces no output.
    fn generate(&self, def_name: Option<String>) -> Result<Option<SceneNode>, FilterError>;
}

pub type GeneratorCtor = fn() -> Box<dyn GeometryGenerator>;

pub fn generator_registry() -> &'static FxHashMap<&'static str, GeneratorCtor> {
    static REGISTRY: OnceLock<FxHashMap<&'static str, GeneratorCtor>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut m: FxHashMap<&'static str, GeneratorCtor> = FxHashMap::default();
        m.insert("IndexedFaceSet", || {
            Box::new(face_set::IndexedFaceSetGenerator::new())
        });
        m.insert("Box", || Box::new(box_shape::BoxGenerator::new()));
        m.insert("Cylinder", || Box::new(cylinder::CylinderGenerator::new()));
        m.insert("ElevationGrid", || {
            Box::new(elevation_grid::ElevationGridGenerator::new())
        });
        m
    })
}

/// Feeds a buffered node's fields into a generator.
pub fn feed(generator: &mut dyn GeometryGenerator, node: &SceneNode) {
    for (name, entry) in node.fields() {
        match entry {
            FieldEntry::Value(v) => generator.set_field(name, v),
            FieldEntry::Node(n) => generator.set_node(name, n),
            FieldEntry::Nodes(ns) => {
                for n in ns {
                    generator.set_node(name, n);
                }
            }
        }
    }
}

/// Builds the IndexedTriangleSet node every generator emits.
pub(crate) fn triangle_set_node(
    def_name: Option<String>,
    points: Vec<f32>,
    coord_def: Option<String>,
    indices: Vec<i32>,
    solid: bool,
    ccw: bool,
) -> SceneNode {
    let mut out = SceneNode::with_def("IndexedTriangleSet", def_name);
    let mut coord = SceneNode::with_def("Coordinate", coord_def);
    coord.set_entry("point", FieldEntry::Value(FieldValue::Floats(points)));
    out.set_entry("coord", FieldEntry::Node(coord));
    out.set_entry("index", FieldEntry::Value(FieldValue::Ints(indices)));
    out.set_entry("solid", FieldEntry::Value(FieldValue::Bool(solid)));
    out.set_entry("ccw", FieldEntry::Value(FieldValue::Bool(ccw)));
    out
}

/// Reads the flat point array and DEF name out of a Coordinate node.
pub(crate) fn coordinate_of(node: &SceneNode) -> (Vec<f32>, Option<String>) {
    let points = node
        .value("point")
        .map(|v| v.as_floats().unwrap_or_default())
        .unwrap_or_default();
    (points, node.def_name.clone())
}
