// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # x3dfilter Core
//!
//! Event model and field schema for streaming scene-graph filtering.
//! A document is an ordered sequence of [`DocumentEvent`]s; field payloads
//! arrive typed or as lexical text and coerce through the static schema.

pub mod error;
pub mod event;
pub mod field;
pub mod schema;

pub use error::CoreError;
pub use event::{DocumentEvent, FieldValue};
pub use schema::{FieldDecl, FieldKind, ValueType};
