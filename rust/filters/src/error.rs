// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the filter pipeline

use thiserror::Error;
use x3dfilter_core::CoreError;

#[derive(Debug, Error)]
pub enum FilterError {
    /// No registered constructor for a stage name.
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("invalid filter argument: {0}")]
    InvalidArgument(String),

    /// Structural invariant breach in the incoming event stream. Fatal.
    #[error("unbalanced event stream: {0}")]
    Unbalanced(&'static str),

    #[error("document header missing")]
    MissingHeader,

    #[error("duplicate document header")]
    DuplicateHeader,

    #[error("geometry error: {0}")]
    Geometry(#[from] x3dfilter_geometry::Error),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
