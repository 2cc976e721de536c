// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transform flattening stage
//!
//! Buffers the document, then walks the root-node list once at
//! `EndDocument` with an accumulated matrix: Transform nodes compose and
//! disappear, Group nodes recurse, Shape coordinates and normals are baked
//! in place, Viewpoints are re-aimed. Everything else re-emits untouched.

use crate::context::DefMap;
use crate::error::FilterError;
use crate::node::{NodeBuilder, SceneNode};
use crate::pipeline::DocumentHandler;
use nalgebra::{Matrix4, Vector3};
use tracing::{debug, warn};
use x3dfilter_core::{DocumentEvent, FieldValue};
use x3dfilter_geometry::transform::{
    compose_flatten, rotate_orientation, transform_normals, transform_points, transform_position,
};
use x3dfilter_geometry::TransformParams;

const DEFAULT_VIEW_POSITION: [f32; 3] = [0.0, 0.0, 10.0];
const DEFAULT_VIEW_ORIENTATION: [f32; 4] = [0.0, 0.0, 1.0, 0.0];

pub struct FlattenTransform<D> {
    downstream: D,
    defs: DefMap,
    builder: NodeBuilder,
    roots: Vec<SceneNode>,
    routes: Vec<DocumentEvent>,
    header_seen: bool,
}

impl<D: DocumentHandler> FlattenTransform<D> {
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

    fn walk(&mut self, node: &SceneNode, matrix: &Matrix4<f32>) -> Result<(), FilterError> {
        match node.name.as_str() {
            "Transform" => {
                let params = transform_params_of(node);
                let composed = compose_flatten(matrix, &params);
                for child in node.children("children") {
                    self.walk(child, &composed)?;
                }
            }
            "Group" => {
                for child in node.children("children") {
                    self.walk(child, matrix)?;
                }
            }
            "Shape" => {
                let baked = bake_shape(node, matrix);
                baked.encode(&mut self.downstream)?;
            }
            "Viewpoint" => {
                let aimed = bake_viewpoint(node, matrix);
                aimed.encode(&mut self.downstream)?;
            }
            _ => node.encode(&mut self.downstream)?,
        }
        Ok(())
    }
}

impl<D: DocumentHandler> DocumentHandler for FlattenTransform<D> {
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
                debug!(roots = self.roots.len(), "flattening transform hierarchy");
                let roots = std::mem::take(&mut self.roots);
                let identity = Matrix4::identity();
                for root in &roots {
                    self.walk(root, &identity)?;
                }
                for route in std::mem::take(&mut self.routes) {
                    self.downstream.handle(route)?;
                }
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

fn vec3_field(node: &SceneNode, field: &str, default: Vector3<f32>) -> Vector3<f32> {
    match node.value(field).map(|v| v.as_floats()) {
        Some(Ok(v)) if v.len() >= 3 => Vector3::new(v[0], v[1], v[2]),
        Some(_) => {
            warn!(node = %node.name, field, "malformed vector field, using default");
            default
        }
        None => default,
    }
}

fn rot4_field(node: &SceneNode, field: &str, default: (Vector3<f32>, f32)) -> (Vector3<f32>, f32) {
    match node.value(field).map(|v| v.as_floats()) {
        Some(Ok(v)) if v.len() >= 4 => (Vector3::new(v[0], v[1], v[2]), v[3]),
        Some(_) => {
            warn!(node = %node.name, field, "malformed rotation field, using default");
            default
        }
        None => default,
    }
}

fn transform_params_of(node: &SceneNode) -> TransformParams {
    let d = TransformParams::default();
    TransformParams {
        translation: vec3_field(node, "translation", d.translation),
        rotation: rot4_field(node, "rotation", d.rotation),
        scale: vec3_field(node, "scale", d.scale),
        scale_orientation: rot4_field(node, "scaleOrientation", d.scale_orientation),
        center: vec3_field(node, "center", d.center),
    }
}

/// Clones the shape and bakes the matrix into its coordinate points and
/// normal vectors. The buffered original stays untouched so later
/// instances of a shared node see untransformed data.
fn bake_shape(node: &SceneNode, matrix: &Matrix4<f32>) -> SceneNode {
    let mut shape = node.clone();
    let Some(geometry) = shape.node_mut("geometry") else {
        return shape;
    };

    if let Some(coord) = geometry.node_mut("coord") {
        match coord.value("point").map(|v| v.as_floats()) {
            Some(Ok(mut points)) => {
                transform_points(matrix, &mut points);
                coord.set_entry("point", crate::node::FieldEntry::Value(FieldValue::Floats(points)));
            }
            Some(Err(e)) => warn!(error = %e, "unreadable coordinate array, left unbaked"),
            None => {}
        }
    }
    if let Some(normal) = geometry.node_mut("normal") {
        match normal.value("vector").map(|v| v.as_floats()) {
            Some(Ok(mut vectors)) => {
                transform_normals(matrix, &mut vectors);
                normal.set_entry(
                    "vector",
                    crate::node::FieldEntry::Value(FieldValue::Floats(vectors)),
                );
            }
            Some(Err(e)) => warn!(error = %e, "unreadable normal array, left unbaked"),
            None => {}
        }
    }
    shape
}

fn bake_viewpoint(node: &SceneNode, matrix: &Matrix4<f32>) -> SceneNode {
    let mut vp = node.clone();

    let position = match vp.value("position").map(|v| v.as_floats()) {
        Some(Ok(v)) if v.len() >= 3 => [v[0], v[1], v[2]],
        _ => DEFAULT_VIEW_POSITION,
    };
    let orientation = match vp.value("orientation").map(|v| v.as_floats()) {
        Some(Ok(v)) if v.len() >= 4 => [v[0], v[1], v[2], v[3]],
        _ => DEFAULT_VIEW_ORIENTATION,
    };

    let p = transform_position(matrix, position);
    let o = rotate_orientation(matrix, orientation);

    vp.set_entry(
        "position",
        crate::node::FieldEntry::Value(FieldValue::Floats(p.to_vec())),
    );
    vp.set_entry(
        "orientation",
        crate::node::FieldEntry::Value(FieldValue::Floats(o.to_vec())),
    );
    vp
}
