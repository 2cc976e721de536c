// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Affine transform composition and flattening
//!
//! A grouping transform carries translation / rotation / scale /
//! scaleOrientation / center parameters; flattening composes a child's
//! local matrix into the accumulated parent matrix with the translation
//! column patched separately, so uniform scale never compounds into the
//! translation twice.

use nalgebra::{Matrix4, Point3, Rotation3, Unit, UnitQuaternion, Vector3};

/// Local parameters of one grouping transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    pub translation: Vector3<f32>,
    /// Axis-angle rotation.
    pub rotation: (Vector3<f32>, f32),
    pub scale: Vector3<f32>,
    pub scale_orientation: (Vector3<f32>, f32),
    pub center: Vector3<f32>,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: (Vector3::new(0.0, 0.0, 1.0), 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            scale_orientation: (Vector3::new(0.0, 0.0, 1.0), 0.0),
            center: Vector3::zeros(),
        }
    }
}

fn axis_angle_quat(axis: Vector3<f32>, angle: f32) -> UnitQuaternion<f32> {
    if axis.norm_squared() < 1e-12 {
        UnitQuaternion::identity()
    } else {
        UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), angle)
    }
}

impl TransformParams {
    /// Local matrix: T * C * R * SR * S * SR^-1 * C^-1.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        let t = Matrix4::new_translation(&self.translation);
        let c = Matrix4::new_translation(&self.center);
        let c_inv = Matrix4::new_translation(&(-self.center));
        let r = axis_angle_quat(self.rotation.0, self.rotation.1).to_homogeneous();
        let sr = axis_angle_quat(self.scale_orientation.0, self.scale_orientation.1);
        let s = Matrix4::new_nonuniform_scaling(&self.scale);
        t * c * r * sr.to_homogeneous() * s * sr.inverse().to_homogeneous() * c_inv
    }
}

/// Rotational part of a matrix with any uniform scale divided out.
pub fn rotation_of(m: &Matrix4<f32>) -> UnitQuaternion<f32> {
    let mut r = m.fixed_view::<3, 3>(0, 0).into_owned();
    for c in 0..3 {
        let col = r.column(c).into_owned();
        let n = col.norm();
        if n > 1e-10 {
            r.set_column(c, &(col / n));
        }
    }
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r))
}

/// Uniform scale factor of a matrix, read off the first column.
pub fn uniform_scale_of(m: &Matrix4<f32>) -> f32 {
    m.fixed_view::<3, 1>(0, 0).norm()
}

/// Composes a child transform into an accumulated parent matrix.
///
/// The translation is computed separately: the child's local translation is
/// rotated by the parent's rotation and scaled by the parent's uniform
/// scale, then added to the parent's translation. The matrix product's
/// translation column is overwritten with that result.
pub fn compose_flatten(parent: &Matrix4<f32>, child: &TransformParams) -> Matrix4<f32> {
    let local = child.to_matrix();

    let p_trans = parent.fixed_view::<3, 1>(0, 3).into_owned();
    let p_rot = rotation_of(parent);
    let p_scale = uniform_scale_of(parent);

    let local_trans = local.fixed_view::<3, 1>(0, 3).into_owned();
    let new_trans = p_trans + p_rot * (local_trans * p_scale);

    let mut m = parent * local;
    m[(0, 3)] = new_trans.x;
    m[(1, 3)] = new_trans.y;
    m[(2, 3)] = new_trans.z;
    m
}

/// Bakes a matrix into a flat xyz array (point transform).
pub fn transform_points(m: &Matrix4<f32>, coords: &mut [f32]) {
    for p in coords.chunks_exact_mut(3) {
        let out = m.transform_point(&Point3::new(p[0], p[1], p[2]));
        p[0] = out.x;
        p[1] = out.y;
        p[2] = out.z;
    }
}

/// Bakes the rotational part into a flat normal array (vector transform);
/// results stay unit length.
pub fn transform_normals(m: &Matrix4<f32>, normals: &mut [f32]) {
    let rot = rotation_of(m);
    for v in normals.chunks_exact_mut(3) {
        let out = rot * Vector3::new(v[0], v[1], v[2]);
        v[0] = out.x;
        v[1] = out.y;
        v[2] = out.z;
    }
}

/// Applies a point transform to a single position.
pub fn transform_position(m: &Matrix4<f32>, p: [f32; 3]) -> [f32; 3] {
    let out = m.transform_point(&Point3::new(p[0], p[1], p[2]));
    [out.x, out.y, out.z]
}

/// Rotates an axis-angle orientation by the rotational part of a matrix.
pub fn rotate_orientation(m: &Matrix4<f32>, orientation: [f32; 4]) -> [f32; 4] {
    let axis = Vector3::new(orientation[0], orientation[1], orientation[2]);
    let q = axis_angle_quat(axis, orientation[3]);
    let combined = rotation_of(m) * q;
    match combined.axis_angle() {
        Some((axis, angle)) => [axis.x, axis.y, axis.z, angle],
        None => [0.0, 0.0, 1.0, 0.0],
    }
}
