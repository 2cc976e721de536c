// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normal synthesis stage
//!
//! Buffers every IndexedTriangleSet and, when it carries no normal of its
//! own, attaches a Normal node with one averaged vector per vertex. Sets
//! that already have normals replay unchanged.

use crate::context::DefMap;
use crate::error::FilterError;
use crate::node::{FieldEntry, NodeBuilder, SceneNode};
use crate::pipeline::DocumentHandler;
use tracing::warn;
use x3dfilter_core::{DocumentEvent, FieldValue};
use x3dfilter_geometry::normals::generate_vertex_normals;

pub struct GenNormals<D> {
    downstream: D,
    defs: DefMap,
    builder: NodeBuilder,
}

impl<D: DocumentHandler> GenNormals<D> {
    pub fn new(downstream: D) -> Self {
        Self {
            downstream,
            defs: DefMap::new(),
            builder: NodeBuilder::new(),
        }
    }

    pub fn into_downstream(self) -> D {
        self.downstream
    }

    fn attach_normals(&mut self, mut node: SceneNode) -> Result<(), FilterError> {
        if node.field("normal").is_some() {
            return node.encode(&mut self.downstream);
        }

        let points = node
            .node("coord")
            .and_then(|c| c.value("point"))
            .map(|v| v.as_floats())
            .transpose();
        let indices = node.value("index").map(|v| v.as_ints()).transpose();

        match (points, indices) {
            (Ok(Some(points)), Ok(Some(indices))) if !points.is_empty() && !indices.is_empty() => {
                let vectors = generate_vertex_normals(&points, &indices);
                let mut normal = SceneNode::new("Normal");
                normal.set_entry("vector", FieldEntry::Value(FieldValue::Floats(vectors)));
                node.set_entry("normal", FieldEntry::Node(normal));
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "unreadable triangle set, normals not generated");
            }
            _ => {
                warn!("triangle set without coordinates or index, normals not generated");
            }
        }
        node.encode(&mut self.downstream)
    }
}

impl<D: DocumentHandler> DocumentHandler for GenNormals<D> {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), FilterError> {
        if self.builder.is_active() {
            if let Some(node) = self.builder.push_with_defs(&event, &mut self.defs)? {
                return self.attach_normals(node);
            }
            return Ok(());
        }
        match &event {
            DocumentEvent::StartNode { name, .. } if name == "IndexedTriangleSet" => {
                self.builder.push_with_defs(&event, &mut self.defs)?;
                Ok(())
            }
            _ => self.downstream.handle(event),
        }
    }
}
