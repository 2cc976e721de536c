// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face-loop triangulation
//!
//! Convex loops fan from the first vertex; concave loops are projected
//! onto their Newell-normal plane and ear-clipped with earcutr.

use crate::{Error, Point2, Point3, Result, Vector3};
use smallvec::SmallVec;

/// Face normal of a polygon via Newell's method, with a cross-product fast
/// path for triangles and quads. Degenerate input falls back to `(0,0,1)`.
pub fn face_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();

    if n < 3 {
        return Vector3::new(0.0, 0.0, 1.0);
    }

    if n <= 4 {
        let v1 = points[1] - points[0];
        let v2 = points[2] - points[0];
        let normal = v1.cross(&v2);
        let len = normal.norm();
        if len > 1e-10 {
            return normal / len;
        }
        if n == 4 {
            // Retry with the far corner for a degenerate first triangle.
            let v3 = points[3] - points[0];
            let normal = v2.cross(&v3);
            let len = normal.norm();
            if len > 1e-10 {
                return normal / len;
            }
        }
        return Vector3::new(0.0, 0.0, 1.0);
    }

    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    let len = normal.norm();
    if len > 1e-10 {
        normal / len
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    }
}

/// All signed turns share a sign.
fn is_convex_2d(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    let mut sign = 0i8;
    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];
        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);
        if cross.abs() > 1e-10 {
            let current = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current;
            } else if sign != current {
                return false;
            }
        }
    }
    true
}

fn fan(n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity((n - 2) * 3);
    for i in 1..n - 1 {
        indices.push(0);
        indices.push(i);
        indices.push(i + 1);
    }
    indices
}

/// Projects polygon vertices onto the plane of `normal`, using the axis
/// least parallel to the normal to build a stable orthonormal basis.
fn project_to_2d(points: &[Point3<f64>], normal: &Vector3<f64>) -> SmallVec<[Point2<f64>; 16]> {
    let origin = points[0];

    let abs_x = normal.x.abs();
    let abs_y = normal.y.abs();
    let abs_z = normal.z.abs();
    let reference = if abs_x <= abs_y && abs_x <= abs_z {
        Vector3::new(1.0, 0.0, 0.0)
    } else if abs_y <= abs_z {
        Vector3::new(0.0, 1.0, 0.0)
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    };

    let u_axis = normal.cross(&reference).normalize();
    let v_axis = normal.cross(&u_axis).normalize();

    points
        .iter()
        .map(|p| {
            let v = p - origin;
            Point2::new(v.dot(&u_axis), v.dot(&v_axis))
        })
        .collect()
}

/// Triangulates one face loop, returning index triples local to the loop.
///
/// Loops of fewer than 3 vertices are degenerate and produce an error the
/// caller reports without aborting the document. Convex loops (and all
/// triangles) fan; concave loops ear-clip on the Newell plane, with the
/// normal sign flipped when the winding is declared clockwise.
pub fn triangulate_face(points: &[Point3<f64>], convex: bool, ccw: bool) -> Result<Vec<usize>> {
    let n = points.len();

    if n < 3 {
        return Err(Error::DegeneratePolygon(n));
    }
    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }
    if convex {
        return Ok(fan(n));
    }

    let mut normal = face_normal(points);
    if !ccw {
        normal = -normal;
    }

    let points_2d = project_to_2d(points, &normal);
    if is_convex_2d(&points_2d) {
        return Ok(fan(n));
    }

    let mut vertices: SmallVec<[f64; 32]> = SmallVec::with_capacity(n * 2);
    for p in &points_2d {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    let indices = earcutr::earcut(&vertices, &[], 2)
        .map_err(|e| Error::Triangulation(format!("{:?}", e)))?;
    if indices.is_empty() {
        return Err(Error::Triangulation(format!(
            "ear clipping produced no triangles for {} vertices",
            n
        )));
    }
    Ok(indices)
}
