// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Buffered node representation
//!
//! A stage that needs a whole node at once accumulates the event stream
//! into a [`SceneNode`] via [`NodeBuilder`], mutates it, and replays it
//! downstream with [`SceneNode::encode`]. USE references resolve at build
//! time by cloning the DEF'd node, so no instance aliases another; an
//! unknown USE is reported and its effect vanishes from the output.

use crate::context::DefMap;
use crate::error::FilterError;
use crate::pipeline::DocumentHandler;
use tracing::warn;
use x3dfilter_core::{schema, DocumentEvent, FieldKind, FieldValue};

/// Content of one field on a buffered node.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEntry {
    Value(FieldValue),
    Node(SceneNode),
    Nodes(Vec<SceneNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub def_name: Option<String>,
    fields: Vec<(String, FieldEntry)>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            def_name: None,
            fields: Vec::new(),
        }
    }

    pub fn with_def(name: impl Into<String>, def_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            def_name,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldEntry> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.fields.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Replaces the field if present, appends otherwise.
    pub fn set_entry(&mut self, name: &str, entry: FieldEntry) {
        if let Some(existing) = self.field_mut(name) {
            *existing = entry;
        } else {
            self.fields.push((name.to_string(), entry));
        }
    }

    pub fn remove_field(&mut self, name: &str) {
        self.fields.retain(|(n, _)| n != name);
    }

    /// Records a field value, coercing lexical payloads through the
    /// schema. A malformed lexeme leaves any previous value in place and
    /// returns the rejection to the caller.
    pub fn set_value(&mut self, field: &str, value: FieldValue) -> Result<(), FilterError> {
        let coerced = match schema::field_decl(&self.name, field) {
            Some(decl) => schema::coerce(&decl, value)?,
            None => value,
        };
        self.set_entry(field, FieldEntry::Value(coerced));
        Ok(())
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        match self.field(field) {
            Some(FieldEntry::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn node(&self, field: &str) -> Option<&SceneNode> {
        match self.field(field) {
            Some(FieldEntry::Node(n)) => Some(n),
            _ => None,
        }
    }

    pub fn node_mut(&mut self, field: &str) -> Option<&mut SceneNode> {
        match self.field_mut(field) {
            Some(FieldEntry::Node(n)) => Some(n),
            _ => None,
        }
    }

    /// Children of a multi-node field, empty when absent.
    pub fn children(&self, field: &str) -> &[SceneNode] {
        match self.field(field) {
            Some(FieldEntry::Nodes(ns)) => ns,
            _ => &[],
        }
    }

    pub fn push_child(&mut self, field: &str, child: SceneNode) {
        match self.field_mut(field) {
            Some(FieldEntry::Nodes(ns)) => ns.push(child),
            Some(other) => *other = FieldEntry::Nodes(vec![child]),
            None => self
                .fields
                .push((field.to_string(), FieldEntry::Nodes(vec![child]))),
        }
    }

    /// Replays the node as a balanced event sequence, fields in schema
    /// declaration order (unknown fields keep insertion order, after the
    /// declared ones).
    pub fn encode(&self, out: &mut dyn DocumentHandler) -> Result<(), FilterError> {
        out.handle(DocumentEvent::StartNode {
            name: self.name.clone(),
            def_name: self.def_name.clone(),
        })?;

        let mut order: Vec<usize> = (0..self.fields.len()).collect();
        order.sort_by_key(|&i| {
            schema::field_decl(&self.name, &self.fields[i].0)
                .map(|d| d.order)
                .unwrap_or(u16::MAX)
        });

        for i in order {
            let (name, entry) = &self.fields[i];
            out.handle(DocumentEvent::StartField { name: name.clone() })?;
            match entry {
                FieldEntry::Value(v) => out.handle(DocumentEvent::Value(v.clone()))?,
                FieldEntry::Node(n) => n.encode(out)?,
                FieldEntry::Nodes(ns) => {
                    for n in ns {
                        n.encode(out)?;
                    }
                }
            }
            out.handle(DocumentEvent::EndField)?;
        }

        out.handle(DocumentEvent::EndNode)
    }
}

struct Frame {
    node: SceneNode,
    open_field: Option<String>,
}

/// Accumulates a node subtree from the event stream.
///
/// The builder is active from the first `StartNode` until the matching
/// `EndNode`, which yields the completed root. DEF'd nodes register in the
/// DefMap as they close; a `UseRef` clones the registered node into the
/// open field (DEF name stripped so the copy is independent).
#[derive(Default)]
pub struct NodeBuilder {
    stack: Vec<Frame>,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Feeds one event. Returns the completed root node when the
    /// outermost `EndNode` arrives. Rejected field values are reported
    /// and skipped; structural violations are fatal.
    pub fn push_with_defs(
        &mut self,
        event: &DocumentEvent,
        defs: &mut DefMap,
    ) -> Result<Option<SceneNode>, FilterError> {
        match event {
            DocumentEvent::StartNode { name, def_name } => {
                self.stack.push(Frame {
                    node: SceneNode::with_def(name.clone(), def_name.clone()),
                    open_field: None,
                });
            }
            DocumentEvent::EndNode => {
                let frame = self
                    .stack
                    .pop()
                    .ok_or(FilterError::Unbalanced("EndNode without StartNode"))?;
                let node = frame.node;
                if let Some(def) = node.def_name.as_deref() {
                    defs.insert(def, node.clone());
                }
                match self.stack.last_mut() {
                    Some(parent) => attach_child(parent, node)?,
                    None => return Ok(Some(node)),
                }
            }
            DocumentEvent::StartField { name } => {
                let frame = self
                    .stack
                    .last_mut()
                    .ok_or(FilterError::Unbalanced("StartField outside node"))?;
                frame.open_field = Some(name.clone());
            }
            DocumentEvent::EndField => {
                let frame = self
                    .stack
                    .last_mut()
                    .ok_or(FilterError::Unbalanced("EndField outside node"))?;
                frame.open_field = None;
            }
            DocumentEvent::Value(value) => {
                let frame = self
                    .stack
                    .last_mut()
                    .ok_or(FilterError::Unbalanced("value outside node"))?;
                let field = frame
                    .open_field
                    .clone()
                    .ok_or(FilterError::Unbalanced("value outside field"))?;
                if let Err(e) = frame.node.set_value(&field, value.clone()) {
                    warn!(
                        node = %frame.node.name,
                        field = %field,
                        error = %e,
                        "rejected field value, keeping previous"
                    );
                }
            }
            DocumentEvent::UseRef { def_name } => {
                let resolved = defs.get(def_name).cloned();
                let frame = self
                    .stack
                    .last_mut()
                    .ok_or(FilterError::Unbalanced("USE outside node"))?;
                match resolved {
                    Some(mut node) => {
                        node.def_name = None;
                        attach_child(frame, node)?;
                    }
                    None => {
                        warn!(def = %def_name, "USE of unknown DEF, reference dropped");
                    }
                }
            }
            DocumentEvent::StartDocument { .. }
            | DocumentEvent::EndDocument
            | DocumentEvent::Route { .. } => {
                return Err(FilterError::Unbalanced("document event inside node"));
            }
        }
        Ok(None)
    }
}

fn attach_child(parent: &mut Frame, child: SceneNode) -> Result<(), FilterError> {
    let field = parent
        .open_field
        .clone()
        .ok_or(FilterError::Unbalanced("child node outside field"))?;
    let multi = matches!(
        schema::field_decl(&parent.node.name, &field).map(|d| d.kind),
        Some(FieldKind::MultiNode)
    );
    if multi {
        parent.node.push_child(&field, child);
    } else {
        parent.node.set_entry(&field, FieldEntry::Node(child));
    }
    Ok(())
}
