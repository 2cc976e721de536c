// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for geometry operations

use thiserror::Error as ThisError;
use x3dfilter_core::CoreError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("triangulation failed: {0}")]
    Triangulation(String),

    /// A face loop with fewer than 3 vertices.
    #[error("degenerate polygon with {0} vertices")]
    DegeneratePolygon(usize),

    #[error("index {index} out of range for {point_count} points")]
    IndexOutOfRange { index: i32, point_count: usize },

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
