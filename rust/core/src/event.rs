// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural event vocabulary
//!
//! A scene document flows through the pipeline as an ordered sequence of
//! [`DocumentEvent`]s. Node and field events nest and balance; `Value` and
//! `UseRef` appear only between a `StartField` and its `EndField`.

use crate::error::CoreError;
use crate::field;

/// One structural event of a scene document stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    StartDocument {
        uri: String,
        url: String,
        encoding: String,
        kind: String,
        version: String,
        comment: Option<String>,
    },
    EndDocument,
    StartNode {
        name: String,
        def_name: Option<String>,
    },
    EndNode,
    StartField {
        name: String,
    },
    EndField,
    /// Reference to a previously DEF'd node, valid only inside a field.
    UseRef {
        def_name: String,
    },
    Value(FieldValue),
    Route {
        src_node: String,
        src_field: String,
        dst_node: String,
        dst_field: String,
    },
}

/// Typed payload for a field value.
///
/// Values arrive either pre-parsed (the binary delivery) or as raw lexical
/// text (`Text`/`Texts`). Consumers that need typed data go through the
/// `as_*` coercions, which parse lexical forms on demand, so a stage never
/// cares which delivery the upstream used.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Long(i64),
    Bool(bool),
    Float(f32),
    Double(f64),
    String(String),
    Ints(Vec<i32>),
    Longs(Vec<i64>),
    Bools(Vec<bool>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    Strings(Vec<String>),
    /// Unparsed lexical scalar.
    Text(String),
    /// Unparsed lexical array, one lexeme group per element.
    Texts(Vec<String>),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "Int",
            FieldValue::Long(_) => "Long",
            FieldValue::Bool(_) => "Bool",
            FieldValue::Float(_) => "Float",
            FieldValue::Double(_) => "Double",
            FieldValue::String(_) => "String",
            FieldValue::Ints(_) => "Ints",
            FieldValue::Longs(_) => "Longs",
            FieldValue::Bools(_) => "Bools",
            FieldValue::Floats(_) => "Floats",
            FieldValue::Doubles(_) => "Doubles",
            FieldValue::Strings(_) => "Strings",
            FieldValue::Text(_) => "Text",
            FieldValue::Texts(_) => "Texts",
        }
    }

    /// True for lexical deliveries that still need schema-driven parsing.
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldValue::Text(_) | FieldValue::Texts(_))
    }

    pub fn as_floats(&self) -> Result<Vec<f32>, CoreError> {
        match self {
            FieldValue::Floats(v) => Ok(v.clone()),
            FieldValue::Float(x) => Ok(vec![*x]),
            FieldValue::Doubles(v) => Ok(v.iter().map(|&x| x as f32).collect()),
            FieldValue::Double(x) => Ok(vec![*x as f32]),
            FieldValue::Text(s) => field::parse_floats(s),
            FieldValue::Texts(v) => {
                let mut out = Vec::new();
                for s in v {
                    out.extend(field::parse_floats(s)?);
                }
                Ok(out)
            }
            other => Err(CoreError::TypeMismatch {
                expected: "Floats",
                actual: other.kind(),
            }),
        }
    }

    pub fn as_ints(&self) -> Result<Vec<i32>, CoreError> {
        match self {
            FieldValue::Ints(v) => Ok(v.clone()),
            FieldValue::Int(x) => Ok(vec![*x]),
            FieldValue::Text(s) => field::parse_ints(s),
            FieldValue::Texts(v) => {
                let mut out = Vec::new();
                for s in v {
                    out.extend(field::parse_ints(s)?);
                }
                Ok(out)
            }
            other => Err(CoreError::TypeMismatch {
                expected: "Ints",
                actual: other.kind(),
            }),
        }
    }

    pub fn as_float(&self) -> Result<f32, CoreError> {
        match self {
            FieldValue::Float(x) => Ok(*x),
            FieldValue::Double(x) => Ok(*x as f32),
            FieldValue::Int(x) => Ok(*x as f32),
            FieldValue::Text(s) => field::parse_float(s.trim()),
            other => Err(CoreError::TypeMismatch {
                expected: "Float",
                actual: other.kind(),
            }),
        }
    }

    pub fn as_int(&self) -> Result<i32, CoreError> {
        match self {
            FieldValue::Int(x) => Ok(*x),
            FieldValue::Text(s) => field::parse_int(s.trim()),
            other => Err(CoreError::TypeMismatch {
                expected: "Int",
                actual: other.kind(),
            }),
        }
    }

    pub fn as_bool(&self) -> Result<bool, CoreError> {
        match self {
            FieldValue::Bool(b) => Ok(*b),
            FieldValue::Text(s) => field::parse_bool(s.trim()),
            other => Err(CoreError::TypeMismatch {
                expected: "Bool",
                actual: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textual_floats_coerce() {
        let v = FieldValue::Text("0 1.5 -2e0, 3".to_string());
        assert_eq!(v.as_floats().unwrap(), vec![0.0, 1.5, -2.0, 3.0]);
    }

    #[test]
    fn doubles_narrow_to_floats() {
        let v = FieldValue::Doubles(vec![1.0, 2.0]);
        assert_eq!(v.as_floats().unwrap(), vec![1.0f32, 2.0]);
    }

    #[test]
    fn mismatch_is_reported() {
        let v = FieldValue::Strings(vec!["a".into()]);
        assert!(v.as_ints().is_err());
    }
}
