// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lexical parsing of textual field values
//!
//! The textual encoding separates lexemes with whitespace and optional
//! commas. Floats go through `fast-float`, integers through
//! `lexical-core`; a lexeme that fails to parse is a format violation
//! surfaced as [`CoreError::InvalidLexeme`].

use crate::error::CoreError;

fn lexemes(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(|c: char| c.is_ascii_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
}

pub fn parse_float(lexeme: &str) -> Result<f32, CoreError> {
    fast_float::parse(lexeme).map_err(|_| CoreError::InvalidLexeme {
        expected: "float",
        lexeme: lexeme.to_string(),
    })
}

pub fn parse_double(lexeme: &str) -> Result<f64, CoreError> {
    fast_float::parse(lexeme).map_err(|_| CoreError::InvalidLexeme {
        expected: "double",
        lexeme: lexeme.to_string(),
    })
}

pub fn parse_int(lexeme: &str) -> Result<i32, CoreError> {
    lexical_core::parse(lexeme.as_bytes()).map_err(|_| CoreError::InvalidLexeme {
        expected: "int32",
        lexeme: lexeme.to_string(),
    })
}

pub fn parse_long(lexeme: &str) -> Result<i64, CoreError> {
    lexical_core::parse(lexeme.as_bytes()).map_err(|_| CoreError::InvalidLexeme {
        expected: "int64",
        lexeme: lexeme.to_string(),
    })
}

pub fn parse_bool(lexeme: &str) -> Result<bool, CoreError> {
    match lexeme {
        "TRUE" | "true" => Ok(true),
        "FALSE" | "false" => Ok(false),
        other => Err(CoreError::InvalidLexeme {
            expected: "bool",
            lexeme: other.to_string(),
        }),
    }
}

pub fn parse_floats(input: &str) -> Result<Vec<f32>, CoreError> {
    lexemes(input).map(parse_float).collect()
}

pub fn parse_doubles(input: &str) -> Result<Vec<f64>, CoreError> {
    lexemes(input).map(parse_double).collect()
}

pub fn parse_ints(input: &str) -> Result<Vec<i32>, CoreError> {
    lexemes(input).map(parse_int).collect()
}

pub fn parse_longs(input: &str) -> Result<Vec<i64>, CoreError> {
    lexemes(input).map(parse_long).collect()
}

pub fn parse_bools(input: &str) -> Result<Vec<bool>, CoreError> {
    lexemes(input).map(parse_bool).collect()
}
