// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangulation stage
//!
//! Replaces any geometry node with a registered generator by its
//! indexed-triangle equivalent. Geometry that is already triangle-based
//! passes through. Unknown geometry names are remembered after the first
//! failed lookup so they warn once and then pass silently; routes that
//! target a DEF consumed by the rewrite are dropped.

use crate::context::DefMap;
use crate::error::FilterError;
use crate::generators::{self, GeometryGenerator};
use crate::node::{FieldEntry, NodeBuilder, SceneNode};
use crate::pipeline::DocumentHandler;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};
use x3dfilter_core::DocumentEvent;

/// Geometry kinds that already carry triangles and need no rewrite.
const TRIANGLE_KINDS: [&str; 6] = [
    "IndexedTriangleSet",
    "IndexedTriangleFanSet",
    "IndexedTriangleStripSet",
    "TriangleSet",
    "TriangleFanSet",
    "TriangleStripSet",
];

pub struct Triangulation<D> {
    downstream: D,
    defs: DefMap,
    builder: NodeBuilder,
    node_stack: SmallVec<[String; 8]>,
    field_stack: SmallVec<[(usize, String); 8]>,
    pool: FxHashMap<String, Box<dyn GeometryGenerator>>,
    ignored_types: FxHashSet<String>,
    ignored_defs: FxHashSet<String>,
}

impl<D: DocumentHandler> Triangulation<D> {
    pub fn new(downstream: D) -> Self {
        Self {
            downstream,
            defs: DefMap::new(),
            builder: NodeBuilder::new(),
            node_stack: SmallVec::new(),
            field_stack: SmallVec::new(),
            pool: FxHashMap::default(),
            ignored_types: FxHashSet::default(),
            ignored_defs: FxHashSet::default(),
        }
    }

    pub fn into_downstream(self) -> D {
        self.downstream
    }

    fn in_geometry_field(&self) -> bool {
        matches!(
            self.field_stack.last(),
            Some((depth, name)) if *depth == self.node_stack.len() && name == "geometry"
        )
    }

    fn generate(&mut self, source: SceneNode) -> Result<(), FilterError> {
        let kind = source.name.clone();
        let generator = match self.pool.entry(kind.clone()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                // Registry hit is guaranteed: interception only starts for
                // registered names.
                let ctor = generators::generator_registry()
                    .get(kind.as_str())
                    .ok_or_else(|| FilterError::UnknownFilter(kind.clone()))?;
                slot.insert(ctor())
            }
        };
        generator.reset();
        generators::feed(generator.as_mut(), &source);

        let emitted = match generator.generate(source.def_name.clone()) {
            Ok(out) => out,
            Err(e) => {
                warn!(node = %kind, error = %e, "generation failed, geometry dropped");
                None
            }
        };

        // DEF'd sub-nodes the rewrite did not carry forward no longer exist
        // downstream; routes addressing them must be dropped.
        let mut consumed = FxHashSet::default();
        collect_defs(&source, &mut consumed);
        if let Some(out) = &emitted {
            let mut kept = FxHashSet::default();
            collect_defs(out, &mut kept);
            for def in &kept {
                consumed.remove(def);
            }
        }
        self.ignored_defs.extend(consumed);

        match emitted {
            Some(out) => {
                debug!(source = %kind, "geometry rewritten to triangles");
                out.encode(&mut self.downstream)
            }
            None => Ok(()),
        }
    }
}

impl<D: DocumentHandler> DocumentHandler for Triangulation<D> {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), FilterError> {
        if self.builder.is_active() {
            if let Some(node) = self.builder.push_with_defs(&event, &mut self.defs)? {
                return self.generate(node);
            }
            return Ok(());
        }
        match &event {
            DocumentEvent::StartNode { name, .. } if self.in_geometry_field() => {
                if generators::generator_registry().contains_key(name.as_str()) {
                    self.builder.push_with_defs(&event, &mut self.defs)?;
                    return Ok(());
                }
                if !TRIANGLE_KINDS.contains(&name.as_str())
                    && self.ignored_types.insert(name.clone())
                {
                    warn!(node = %name, "no generator registered, passing through");
                }
                self.node_stack.push(name.clone());
                self.downstream.handle(event)
            }
            DocumentEvent::StartNode { name, .. } => {
                self.node_stack.push(name.clone());
                self.downstream.handle(event)
            }
            DocumentEvent::EndNode => {
                self.node_stack.pop();
                self.downstream.handle(event)
            }
            DocumentEvent::StartField { name } => {
                self.field_stack.push((self.node_stack.len(), name.clone()));
                self.downstream.handle(event)
            }
            DocumentEvent::EndField => {
                self.field_stack.pop();
                self.downstream.handle(event)
            }
            DocumentEvent::Route {
                src_node, dst_node, ..
            } => {
                if self.ignored_defs.contains(src_node) || self.ignored_defs.contains(dst_node) {
                    warn!(src = %src_node, dst = %dst_node, "route targets rewritten DEF, dropped");
                    Ok(())
                } else {
                    self.downstream.handle(event)
                }
            }
            _ => self.downstream.handle(event),
        }
    }
}

fn collect_defs(node: &SceneNode, out: &mut FxHashSet<String>) {
    if let Some(def) = node.def_name.as_deref() {
        out.insert(def.to_string());
    }
    for (_, entry) in node.fields() {
        match entry {
            FieldEntry::Node(n) => collect_defs(n, out),
            FieldEntry::Nodes(ns) => {
                for n in ns {
                    collect_defs(n, out);
                }
            }
            FieldEntry::Value(_) => {}
        }
    }
}
