// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Field declaration lookup
//!
//! A static table maps `(node name, field name)` to the field's kind and
//! its declaration order, built once on first use. Stages consult it to
//! decide how a just-closed child node attaches to its parent field and to
//! re-encode buffered nodes with deterministic field order. Unknown names
//! are a normal lookup miss; the caller treats the field as opaque.

use crate::error::CoreError;
use crate::event::FieldValue;
use crate::field;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int32,
    Int64,
    Bool,
    Float,
    Double,
    Str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Field holds exactly one child node.
    SingleNode,
    /// Field holds a list of child nodes.
    MultiNode,
    Scalar(ValueType),
    Array(ValueType),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDecl {
    pub kind: FieldKind,
    /// Position within the node's field declaration list.
    pub order: u16,
}

type SchemaTable = FxHashMap<(&'static str, &'static str), FieldDecl>;

fn declare(table: &mut SchemaTable, node: &'static str, fields: &[(&'static str, FieldKind)]) {
    for (order, (name, kind)) in fields.iter().enumerate() {
        table.insert(
            (node, *name),
            FieldDecl {
                kind: *kind,
                order: order as u16,
            },
        );
    }
}

fn build_table() -> SchemaTable {
    use FieldKind::*;
    use ValueType::*;

    let mut t = SchemaTable::default();

    declare(
        &mut t,
        "Transform",
        &[
            ("translation", Array(Float)),
            ("rotation", Array(Float)),
            ("scale", Array(Float)),
            ("scaleOrientation", Array(Float)),
            ("center", Array(Float)),
            ("children", MultiNode),
        ],
    );
    declare(&mut t, "Group", &[("children", MultiNode)]);
    declare(
        &mut t,
        "Shape",
        &[("appearance", SingleNode), ("geometry", SingleNode)],
    );
    declare(
        &mut t,
        "Appearance",
        &[
            ("material", SingleNode),
            ("texture", SingleNode),
            ("textureTransform", SingleNode),
        ],
    );
    declare(
        &mut t,
        "Material",
        &[
            ("diffuseColor", Array(Float)),
            ("emissiveColor", Array(Float)),
            ("specularColor", Array(Float)),
            ("ambientIntensity", Scalar(Float)),
            ("shininess", Scalar(Float)),
            ("transparency", Scalar(Float)),
        ],
    );
    declare(&mut t, "Coordinate", &[("point", Array(Float))]);
    declare(&mut t, "Normal", &[("vector", Array(Float))]);
    declare(&mut t, "Color", &[("color", Array(Float))]);
    declare(&mut t, "ColorRGBA", &[("color", Array(Float))]);
    declare(&mut t, "TextureCoordinate", &[("point", Array(Float))]);

    declare(
        &mut t,
        "IndexedFaceSet",
        &[
            ("coord", SingleNode),
            ("normal", SingleNode),
            ("color", SingleNode),
            ("texCoord", SingleNode),
            ("coordIndex", Array(Int32)),
            ("normalIndex", Array(Int32)),
            ("colorIndex", Array(Int32)),
            ("texCoordIndex", Array(Int32)),
            ("ccw", Scalar(Bool)),
            ("convex", Scalar(Bool)),
            ("solid", Scalar(Bool)),
            ("colorPerVertex", Scalar(Bool)),
            ("normalPerVertex", Scalar(Bool)),
            ("creaseAngle", Scalar(Float)),
        ],
    );
    for node in [
        "IndexedTriangleSet",
        "IndexedTriangleFanSet",
        "IndexedTriangleStripSet",
    ] {
        declare(
            &mut t,
            node,
            &[
                ("coord", SingleNode),
                ("normal", SingleNode),
                ("color", SingleNode),
                ("texCoord", SingleNode),
                ("index", Array(Int32)),
                ("ccw", Scalar(Bool)),
                ("solid", Scalar(Bool)),
                ("colorPerVertex", Scalar(Bool)),
                ("normalPerVertex", Scalar(Bool)),
            ],
        );
    }
    declare(
        &mut t,
        "TriangleSet",
        &[
            ("coord", SingleNode),
            ("normal", SingleNode),
            ("color", SingleNode),
            ("texCoord", SingleNode),
            ("ccw", Scalar(Bool)),
            ("solid", Scalar(Bool)),
            ("colorPerVertex", Scalar(Bool)),
            ("normalPerVertex", Scalar(Bool)),
        ],
    );
    declare(
        &mut t,
        "TriangleFanSet",
        &[
            ("coord", SingleNode),
            ("normal", SingleNode),
            ("color", SingleNode),
            ("texCoord", SingleNode),
            ("fanCount", Array(Int32)),
            ("ccw", Scalar(Bool)),
            ("solid", Scalar(Bool)),
            ("colorPerVertex", Scalar(Bool)),
            ("normalPerVertex", Scalar(Bool)),
        ],
    );
    declare(
        &mut t,
        "TriangleStripSet",
        &[
            ("coord", SingleNode),
            ("normal", SingleNode),
            ("color", SingleNode),
            ("texCoord", SingleNode),
            ("stripCount", Array(Int32)),
            ("ccw", Scalar(Bool)),
            ("solid", Scalar(Bool)),
            ("colorPerVertex", Scalar(Bool)),
            ("normalPerVertex", Scalar(Bool)),
        ],
    );

    declare(
        &mut t,
        "Box",
        &[("size", Array(Float)), ("solid", Scalar(Bool))],
    );
    declare(
        &mut t,
        "Cylinder",
        &[
            ("radius", Scalar(Float)),
            ("height", Scalar(Float)),
            ("side", Scalar(Bool)),
            ("top", Scalar(Bool)),
            ("bottom", Scalar(Bool)),
            ("solid", Scalar(Bool)),
        ],
    );
    declare(
        &mut t,
        "ElevationGrid",
        &[
            ("xDimension", Scalar(Int32)),
            ("zDimension", Scalar(Int32)),
            ("xSpacing", Scalar(Float)),
            ("zSpacing", Scalar(Float)),
            ("height", Array(Float)),
            ("ccw", Scalar(Bool)),
            ("solid", Scalar(Bool)),
            ("creaseAngle", Scalar(Float)),
        ],
    );

    declare(
        &mut t,
        "Viewpoint",
        &[
            ("position", Array(Float)),
            ("orientation", Array(Float)),
            ("fieldOfView", Scalar(Float)),
            ("centerOfRotation", Array(Float)),
            ("description", Scalar(Str)),
        ],
    );
    declare(
        &mut t,
        "WorldInfo",
        &[("title", Scalar(Str)), ("info", Array(Str))],
    );
    declare(
        &mut t,
        "NavigationInfo",
        &[
            ("type", Array(Str)),
            ("avatarSize", Array(Float)),
            ("speed", Scalar(Float)),
            ("headlight", Scalar(Bool)),
        ],
    );
    declare(
        &mut t,
        "DirectionalLight",
        &[
            ("direction", Array(Float)),
            ("color", Array(Float)),
            ("intensity", Scalar(Float)),
            ("ambientIntensity", Scalar(Float)),
            ("on", Scalar(Bool)),
        ],
    );

    t
}

fn table() -> &'static SchemaTable {
    static TABLE: OnceLock<SchemaTable> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

/// Looks up the declaration of `field` on `node`. `None` means the field is
/// unknown to the schema and should pass through untouched.
pub fn field_decl(node: &str, field: &str) -> Option<FieldDecl> {
    table().get(&(node, field)).copied()
}

/// Coerces a lexical payload into the typed form a declaration calls for.
/// Already-typed payloads pass through unchanged; a malformed lexeme is a
/// format violation the caller handles.
pub fn coerce(decl: &FieldDecl, value: FieldValue) -> Result<FieldValue, CoreError> {
    if !value.is_textual() {
        return Ok(value);
    }
    let joined = match &value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Texts(v) => v.join(" "),
        _ => unreachable!(),
    };
    let text = joined.trim().to_string();
    match decl.kind {
        FieldKind::Scalar(ValueType::Int32) => Ok(FieldValue::Int(field::parse_int(&text)?)),
        FieldKind::Scalar(ValueType::Int64) => Ok(FieldValue::Long(field::parse_long(&text)?)),
        FieldKind::Scalar(ValueType::Bool) => Ok(FieldValue::Bool(field::parse_bool(&text)?)),
        FieldKind::Scalar(ValueType::Float) => Ok(FieldValue::Float(field::parse_float(&text)?)),
        FieldKind::Scalar(ValueType::Double) => Ok(FieldValue::Double(field::parse_double(&text)?)),
        FieldKind::Scalar(ValueType::Str) => Ok(FieldValue::String(joined)),
        FieldKind::Array(ValueType::Int32) => Ok(FieldValue::Ints(field::parse_ints(&text)?)),
        FieldKind::Array(ValueType::Int64) => Ok(FieldValue::Longs(field::parse_longs(&text)?)),
        FieldKind::Array(ValueType::Bool) => Ok(FieldValue::Bools(field::parse_bools(&text)?)),
        FieldKind::Array(ValueType::Float) => Ok(FieldValue::Floats(field::parse_floats(&text)?)),
        FieldKind::Array(ValueType::Double) => {
            Ok(FieldValue::Doubles(field::parse_doubles(&text)?))
        }
        FieldKind::Array(ValueType::Str) => match value {
            FieldValue::Texts(v) => Ok(FieldValue::Strings(v)),
            _ => Ok(FieldValue::Strings(vec![joined])),
        },
        FieldKind::SingleNode | FieldKind::MultiNode => Ok(value),
    }
}

/// Renders a typed payload back to its lexical form. The inverse of
/// [`coerce`] for representation-converting stages.
pub fn to_lexical(value: &FieldValue) -> FieldValue {
    fn join<T: ToString>(v: &[T]) -> String {
        v.iter()
            .map(|x| x.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
    match value {
        FieldValue::Int(x) => FieldValue::Text(x.to_string()),
        FieldValue::Long(x) => FieldValue::Text(x.to_string()),
        FieldValue::Bool(b) => FieldValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        FieldValue::Float(x) => FieldValue::Text(x.to_string()),
        FieldValue::Double(x) => FieldValue::Text(x.to_string()),
        FieldValue::String(s) => FieldValue::Text(s.clone()),
        FieldValue::Ints(v) => FieldValue::Text(join(v)),
        FieldValue::Longs(v) => FieldValue::Text(join(v)),
        FieldValue::Bools(v) => FieldValue::Text(
            v.iter()
                .map(|b| if *b { "TRUE" } else { "FALSE" })
                .collect::<Vec<_>>()
                .join(" "),
        ),
        FieldValue::Floats(v) => FieldValue::Text(join(v)),
        FieldValue::Doubles(v) => FieldValue::Text(join(v)),
        FieldValue::Strings(v) => FieldValue::Texts(v.clone()),
        FieldValue::Text(_) | FieldValue::Texts(_) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fields_resolve() {
        let decl = field_decl("IndexedFaceSet", "coordIndex").unwrap();
        assert_eq!(decl.kind, FieldKind::Array(ValueType::Int32));
        assert!(field_decl("Shape", "geometry").is_some());
        assert!(field_decl("Shape", "banana").is_none());
        assert!(field_decl("Widget", "geometry").is_none());
    }

    #[test]
    fn declaration_order_is_stable() {
        let coord = field_decl("IndexedTriangleSet", "coord").unwrap();
        let index = field_decl("IndexedTriangleSet", "index").unwrap();
        assert!(coord.order < index.order);
    }

    #[test]
    fn coerce_textual_index_array() {
        let decl = field_decl("IndexedFaceSet", "coordIndex").unwrap();
        let out = coerce(&decl, FieldValue::Text("0 1 2 -1".into())).unwrap();
        assert_eq!(out, FieldValue::Ints(vec![0, 1, 2, -1]));
    }

    #[test]
    fn coerce_rejects_garbage() {
        let decl = field_decl("Coordinate", "point").unwrap();
        assert!(coerce(&decl, FieldValue::Text("0 0 oops".into())).is_err());
    }

    #[test]
    fn lexical_round_trip_bools() {
        let lex = to_lexical(&FieldValue::Bools(vec![true, false]));
        assert_eq!(lex, FieldValue::Text("TRUE FALSE".into()));
    }
}
