// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Representation conversion
//!
//! Rewrites field payloads between their lexical and typed forms using
//! the schema, leaving structure untouched. Fields without a schema entry
//! pass through as-is.

use crate::error::FilterError;
use crate::pipeline::DocumentHandler;
use smallvec::SmallVec;
use tracing::warn;
use x3dfilter_core::{schema, DocumentEvent, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Textual,
    Binary,
}

impl Encoding {
    pub fn from_arg(arg: Option<&str>) -> Result<Self, FilterError> {
        match arg {
            Some("textual") => Ok(Encoding::Textual),
            Some("binary") | None => Ok(Encoding::Binary),
            Some(other) => Err(FilterError::InvalidArgument(format!(
                "unknown encoding '{other}'"
            ))),
        }
    }
}

pub struct Recode<D> {
    encoding: Encoding,
    downstream: D,
    node_stack: SmallVec<[String; 8]>,
    field_stack: SmallVec<[(usize, String); 8]>,
}

impl<D: DocumentHandler> Recode<D> {
    pub fn new(encoding: Encoding, downstream: D) -> Self {
        Self {
            encoding,
            downstream,
            node_stack: SmallVec::new(),
            field_stack: SmallVec::new(),
        }
    }

    pub fn into_downstream(self) -> D {
        self.downstream
    }

    fn recode(&self, value: FieldValue) -> FieldValue {
        let Some((depth, field)) = self.field_stack.last() else {
            return value;
        };
        // The open field must belong to the innermost open node.
        if *depth != self.node_stack.len() {
            return value;
        }
        let Some(node) = self.node_stack.last() else {
            return value;
        };
        let Some(decl) = schema::field_decl(node, field) else {
            return value;
        };
        match self.encoding {
            Encoding::Textual => schema::to_lexical(&value),
            Encoding::Binary => match schema::coerce(&decl, value.clone()) {
                Ok(coerced) => coerced,
                Err(e) => {
                    warn!(node = %node, field = %field, error = %e, "recode failed, passing payload through");
                    value
                }
            },
        }
    }
}

impl<D: DocumentHandler> DocumentHandler for Recode<D> {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), FilterError> {
        match event {
            DocumentEvent::StartNode { name, def_name } => {
                self.node_stack.push(name.clone());
                self.downstream
                    .handle(DocumentEvent::StartNode { name, def_name })
            }
            DocumentEvent::EndNode => {
                self.node_stack.pop();
                self.downstream.handle(DocumentEvent::EndNode)
            }
            DocumentEvent::StartField { name } => {
                self.field_stack.push((self.node_stack.len(), name.clone()));
                self.downstream.handle(DocumentEvent::StartField { name })
            }
            DocumentEvent::EndField => {
                self.field_stack.pop();
                self.downstream.handle(DocumentEvent::EndField)
            }
            DocumentEvent::Value(v) => {
                let recoded = self.recode(v);
                self.downstream.handle(DocumentEvent::Value(recoded))
            }
            other => self.downstream.handle(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EventCollector;

    fn coordinate_value(payload: FieldValue) -> Vec<DocumentEvent> {
        vec![
            DocumentEvent::StartNode {
                name: "Coordinate".into(),
                def_name: None,
            },
            DocumentEvent::StartField {
                name: "point".into(),
            },
            DocumentEvent::Value(payload),
            DocumentEvent::EndField,
            DocumentEvent::EndNode,
        ]
    }

    #[test]
    fn binary_mode_parses_text() {
        let mut stage = Recode::new(Encoding::Binary, EventCollector::new());
        for ev in coordinate_value(FieldValue::Text("0 1 2".into())) {
            stage.handle(ev).unwrap();
        }
        let events = stage.into_downstream().events;
        assert!(events
            .iter()
            .any(|e| matches!(e, DocumentEvent::Value(FieldValue::Floats(v)) if v == &[0.0, 1.0, 2.0])));
    }

    #[test]
    fn textual_mode_renders_lexemes() {
        let mut stage = Recode::new(Encoding::Textual, EventCollector::new());
        for ev in coordinate_value(FieldValue::Floats(vec![0.5, 1.0])) {
            stage.handle(ev).unwrap();
        }
        let events = stage.into_downstream().events;
        assert!(events
            .iter()
            .any(|e| matches!(e, DocumentEvent::Value(FieldValue::Text(s)) if s == "0.5 1")));
    }

    #[test]
    fn unknown_field_passes_through() {
        let mut stage = Recode::new(Encoding::Binary, EventCollector::new());
        let events = vec![
            DocumentEvent::StartNode {
                name: "Gadget".into(),
                def_name: None,
            },
            DocumentEvent::StartField {
                name: "knob".into(),
            },
            DocumentEvent::Value(FieldValue::Text("opaque".into())),
            DocumentEvent::EndField,
            DocumentEvent::EndNode,
        ];
        for ev in events {
            stage.handle(ev).unwrap();
        }
        let events = stage.into_downstream().events;
        assert!(events
            .iter()
            .any(|e| matches!(e, DocumentEvent::Value(FieldValue::Text(s)) if s == "opaque")));
    }
}
