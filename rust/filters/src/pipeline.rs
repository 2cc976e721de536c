// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline contract and stage registry
//!
//! A stage consumes [`DocumentEvent`]s and forwards zero or more events to
//! its downstream handler, synchronously. Pipelines are built back to
//! front from a static name registry; unknown stage names fail
//! construction.

use crate::error::FilterError;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;
use tracing::debug;
use x3dfilter_core::DocumentEvent;

/// Synchronous event consumer. Every stage and every sink implements this.
pub trait DocumentHandler {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), FilterError>;
}

impl DocumentHandler for Box<dyn DocumentHandler> {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), FilterError> {
        (**self).handle(event)
    }
}

/// Terminal sink that records everything it receives.
#[derive(Debug, Default)]
pub struct EventCollector {
    pub events: Vec<DocumentEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }
}

impl DocumentHandler for EventCollector {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), FilterError> {
        self.events.push(event);
        Ok(())
    }
}

/// One stage request: a registered name plus opaque string arguments.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub name: String,
    pub args: Vec<String>,
}

impl FilterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

type Constructor =
    fn(&[String], Box<dyn DocumentHandler>) -> Result<Box<dyn DocumentHandler>, FilterError>;

fn registry() -> &'static FxHashMap<&'static str, Constructor> {
    static REGISTRY: OnceLock<FxHashMap<&'static str, Constructor>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut m: FxHashMap<&'static str, Constructor> = FxHashMap::default();
        m.insert("Identity", |_, down| {
            Ok(Box::new(crate::identity::Identity::new(down)))
        });
        m.insert("FlattenTransform", |_, down| {
            Ok(Box::new(crate::flatten::FlattenTransform::new(down)))
        });
        m.insert("CombineShape", |_, down| {
            Ok(Box::new(crate::combine::CombineShape::new(down)))
        });
        m.insert("Index", |_, down| {
            Ok(Box::new(crate::index::Index::new(down)))
        });
        m.insert("Triangulation", |_, down| {
            Ok(Box::new(crate::triangulate::Triangulation::new(down)))
        });
        m.insert("GenNormals", |_, down| {
            Ok(Box::new(crate::gen_normals::GenNormals::new(down)))
        });
        m.insert("Recode", |args, down| {
            let encoding = crate::recode::Encoding::from_arg(args.first().map(|s| s.as_str()))?;
            Ok(Box::new(crate::recode::Recode::new(encoding, down)))
        });
        m
    })
}

/// Builds a linear pipeline, last stage closest to the sink.
pub fn build_pipeline(
    specs: &[FilterSpec],
    sink: Box<dyn DocumentHandler>,
) -> Result<Box<dyn DocumentHandler>, FilterError> {
    let mut down = sink;
    for spec in specs.iter().rev() {
        let ctor = registry()
            .get(spec.name.as_str())
            .ok_or_else(|| FilterError::UnknownFilter(spec.name.clone()))?;
        debug!(stage = %spec.name, "adding pipeline stage");
        down = ctor(&spec.args, down)?;
    }
    Ok(down)
}

/// Feeds a whole event sequence through a handler.
pub fn send_all<H: DocumentHandler + ?Sized>(
    handler: &mut H,
    events: impl IntoIterator<Item = DocumentEvent>,
) -> Result<(), FilterError> {
    for event in events {
        handler.handle(event)?;
    }
    Ok(())
}
