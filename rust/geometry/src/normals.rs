// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-vertex normal synthesis
//!
//! Averages triangle face normals onto their vertices. Degenerate
//! triangles and untouched vertices fall back to `(0,0,1)` so the output
//! never carries NaN.

use nalgebra::Vector3;

/// Generates per-vertex normals for triangle-triple indices.
///
/// Output length is `(max_index + 1) * 3`; an empty index list yields an
/// empty array.
pub fn generate_vertex_normals(coords: &[f32], indices: &[i32]) -> Vec<f32> {
    let max_index = match indices.iter().copied().filter(|&i| i >= 0).max() {
        Some(m) => m as usize,
        None => return Vec::new(),
    };
    let vertex_count = max_index + 1;

    let mut acc = vec![Vector3::<f32>::zeros(); vertex_count];
    let mut touched = vec![false; vertex_count];

    for tri in indices.chunks_exact(3) {
        if tri.iter().any(|&i| i < 0) {
            continue;
        }
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if c * 3 + 2 >= coords.len() || a * 3 + 2 >= coords.len() || b * 3 + 2 >= coords.len() {
            continue;
        }
        let pa = Vector3::new(coords[a * 3], coords[a * 3 + 1], coords[a * 3 + 2]);
        let pb = Vector3::new(coords[b * 3], coords[b * 3 + 1], coords[b * 3 + 2]);
        let pc = Vector3::new(coords[c * 3], coords[c * 3 + 1], coords[c * 3 + 2]);

        // Edge vectors out of the middle vertex.
        let cross = (pc - pb).cross(&(pa - pb));
        let len = cross.norm();
        let face_normal = if len > 0.0 {
            cross / len
        } else {
            Vector3::new(0.0, 0.0, 1.0)
        };

        for &i in &[a, b, c] {
            acc[i] += face_normal;
            touched[i] = true;
        }
    }

    let mut out = Vec::with_capacity(vertex_count * 3);
    for (sum, hit) in acc.iter().zip(&touched) {
        let n = if !hit {
            Vector3::new(0.0, 0.0, 1.0)
        } else {
            let len = sum.norm();
            if len > 0.0 {
                sum / len
            } else {
                Vector3::new(0.0, 0.0, 1.0)
            }
        };
        out.extend_from_slice(&[n.x, n.y, n.z]);
    }
    out
}
