// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flat coordinate and index buffers
//!
//! Coordinates are a flat array of xyz triples; indices are signed 32-bit
//! values where `-1` marks a polygon boundary in face-set inputs. Triangle
//! outputs carry no separators.

use crate::{Error, Point3};

/// Flat buffer of 3-component float points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateBuffer {
    data: Vec<f32>,
}

impl CoordinateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a flat xyz array. A trailing partial point is dropped.
    pub fn from_flat(mut data: Vec<f32>) -> Self {
        data.truncate(data.len() - data.len() % 3);
        Self { data }
    }

    pub fn point_count(&self) -> usize {
        self.data.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn point(&self, i: usize) -> Point3<f64> {
        Point3::new(
            self.data[i * 3] as f64,
            self.data[i * 3 + 1] as f64,
            self.data[i * 3 + 2] as f64,
        )
    }

    pub fn push(&mut self, x: f32, y: f32, z: f32) {
        self.data.extend_from_slice(&[x, y, z]);
    }

    pub fn extend_from(&mut self, other: &CoordinateBuffer) {
        self.data.extend_from_slice(&other.data);
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_flat(self) -> Vec<f32> {
        self.data
    }
}

/// Flat buffer of signed indices, `-1` separating face loops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBuffer {
    data: Vec<i32>,
}

impl IndexBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_flat(data: Vec<i32>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push(&mut self, index: i32) {
        self.data.push(index);
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [i32] {
        &mut self.data
    }

    pub fn into_flat(self) -> Vec<i32> {
        self.data
    }

    /// Iterates the face loops, splitting on `-1`. A missing trailing
    /// separator still yields the final loop; consecutive separators
    /// yield nothing.
    pub fn face_loops(&self) -> impl Iterator<Item = &[i32]> {
        self.data.split(|&i| i < 0).filter(|s| !s.is_empty())
    }

    /// Longest face loop in the buffer. A buffer with no separator at all
    /// is a single face.
    pub fn max_poly_size(&self) -> usize {
        self.face_loops().map(|l| l.len()).max().unwrap_or(0)
    }

    /// Checks every non-negative index against a point count.
    pub fn validate(&self, point_count: usize) -> Result<(), Error> {
        for &i in &self.data {
            if i >= 0 && i as usize >= point_count {
                return Err(Error::IndexOutOfRange {
                    index: i,
                    point_count,
                });
            }
        }
        Ok(())
    }
}
