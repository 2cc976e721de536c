// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the event model and field schema

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A textual field lexeme failed to parse as its declared type.
    #[error("invalid {expected} lexeme '{lexeme}'")]
    InvalidLexeme {
        expected: &'static str,
        lexeme: String,
    },

    /// A payload was coerced to a type it does not carry.
    #[error("field value type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}
