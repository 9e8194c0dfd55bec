// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the `Mat3` and `Mat4` types and associated operations.

use super::{Quaternion, Vec3, Vec4, EPSILON};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut, Mul};

// --- Mat3 ---

/// A 3x3 column-major matrix.
///
/// Its main role in the rig engine is the rotation (and scale) part of a [`Mat4`]
/// world transform, for example when guides are aimed or reflected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec3; 3],
}

impl Mat3 {
    /// The 3x3 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec3::X, Vec3::Y, Vec3::Z],
    };

    /// A 3x3 matrix with all elements set to 0.
    pub const ZERO: Self = Self {
        cols: [Vec3::ZERO; 3],
    };

    /// Creates a new matrix from three column vectors.
    #[inline]
    pub fn from_cols(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        Self { cols: [c0, c1, c2] }
    }

    /// Returns a row of the matrix as a `Vec3`.
    #[inline]
    pub fn get_row(&self, index: usize) -> Vec3 {
        Vec3 {
            x: self.cols[0].get(index),
            y: self.cols[1].get(index),
            z: self.cols[2].get(index),
        }
    }

    /// Creates a non-uniform scaling matrix.
    #[inline]
    pub fn from_scale(scale: Vec3) -> Self {
        Self::from_cols(
            Vec3::new(scale.x, 0.0, 0.0),
            Vec3::new(0.0, scale.y, 0.0),
            Vec3::new(0.0, 0.0, scale.z),
        )
    }

    /// Creates a rotation matrix from an axis and an angle.
    ///
    /// # Arguments
    ///
    /// * `axis`: The axis of rotation. Normalized internally.
    /// * `angle_radians`: The angle of rotation in radians.
    #[inline]
    pub fn from_axis_angle(axis: Vec3, angle_radians: f64) -> Self {
        Self::from_quat(Quaternion::from_axis_angle(axis, angle_radians))
    }

    /// Creates a rotation matrix from a quaternion.
    /// The quaternion is normalized before conversion to ensure a valid rotation matrix.
    #[inline]
    pub fn from_quat(q: Quaternion) -> Self {
        let q = q.normalize();
        let x2 = q.x + q.x;
        let y2 = q.y + q.y;
        let z2 = q.z + q.z;
        let xx = q.x * x2;
        let xy = q.x * y2;
        let xz = q.x * z2;
        let yy = q.y * y2;
        let yz = q.y * z2;
        let zz = q.z * z2;
        let wx = q.w * x2;
        let wy = q.w * y2;
        let wz = q.w * z2;

        Self::from_cols(
            Vec3::new(1.0 - (yy + zz), xy + wz, xz - wy),
            Vec3::new(xy - wz, 1.0 - (xx + zz), yz + wx),
            Vec3::new(xz + wy, yz - wx, 1.0 - (xx + yy)),
        )
    }

    /// Creates a `Mat3` from the upper-left 3x3 corner of a [`Mat4`].
    /// This extracts the rotation and scale components, discarding translation.
    #[inline]
    pub fn from_mat4(m4: &Mat4) -> Self {
        Self::from_cols(
            m4.cols[0].truncate(),
            m4.cols[1].truncate(),
            m4.cols[2].truncate(),
        )
    }

    /// Computes the determinant of the matrix.
    ///
    /// A negative determinant means the matrix flips handedness.
    #[inline]
    pub fn determinant(&self) -> f64 {
        let c0 = self.cols[0];
        let c1 = self.cols[1];
        let c2 = self.cols[2];
        c0.x * (c1.y * c2.z - c2.y * c1.z) - c1.x * (c0.y * c2.z - c2.y * c0.z)
            + c2.x * (c0.y * c1.z - c1.y * c0.z)
    }

    /// Returns the transpose of the matrix, where rows and columns are swapped.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.get_row(0), self.get_row(1), self.get_row(2))
    }

    /// Computes the inverse of the matrix.
    ///
    /// Returns `None` if the determinant is close to zero.
    pub fn inverse(&self) -> Option<Self> {
        let c0 = self.cols[0];
        let c1 = self.cols[1];
        let c2 = self.cols[2];
        let m00 = c1.y * c2.z - c2.y * c1.z;
        let m10 = c2.y * c0.z - c0.y * c2.z;
        let m20 = c0.y * c1.z - c1.y * c0.z;
        let det = c0.x * m00 + c1.x * m10 + c2.x * m20;

        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let m01 = c2.x * c1.z - c1.x * c2.z;
        let m11 = c0.x * c2.z - c2.x * c0.z;
        let m21 = c1.x * c0.z - c0.x * c1.z;
        let m02 = c1.x * c2.y - c2.x * c1.y;
        let m12 = c2.x * c0.y - c0.x * c2.y;
        let m22 = c0.x * c1.y - c1.x * c0.y;

        Some(Self::from_cols(
            Vec3::new(m00, m10, m20) * inv_det,
            Vec3::new(m01, m11, m21) * inv_det,
            Vec3::new(m02, m12, m22) * inv_det,
        ))
    }

    /// Converts this `Mat3` into a [`Mat4`] with a zero translation.
    #[inline]
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols(
            Vec4::from_vec3(self.cols[0], 0.0),
            Vec4::from_vec3(self.cols[1], 0.0),
            Vec4::from_vec3(self.cols[2], 0.0),
            Vec4::W,
        )
    }

    /// Returns `true` if every element differs from `other` by at most `epsilon`.
    pub fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.cols
            .iter()
            .zip(other.cols.iter())
            .all(|(a, b)| a.abs_diff_eq(*b, epsilon))
    }
}

impl Default for Mat3 {
    /// Returns the 3x3 identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat3> for Mat3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Mat3) -> Self::Output {
        Self::from_cols(self * rhs.cols[0], self * rhs.cols[1], self * rhs.cols[2])
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: Vec3) -> Self::Output {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z
    }
}

impl Index<usize> for Mat3 {
    type Output = Vec3;
    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.cols[index]
    }
}

impl IndexMut<usize> for Mat3 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.cols[index]
    }
}

// --- Mat4 ---

/// A 4x4 column-major affine matrix.
///
/// This is the world transform exchanged with the scene backend. It serializes as a
/// flat array of 16 numbers in column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 16]", into = "[f64; 16]")]
pub struct Mat4 {
    /// The columns of the matrix. `cols[3]` holds the translation.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 1.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::W,
        ],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Returns a row of the matrix as a `Vec4`.
    #[inline]
    pub fn get_row(&self, index: usize) -> Vec4 {
        Vec4 {
            x: self.cols[0].get(index),
            y: self.cols[1].get(index),
            z: self.cols[2].get(index),
            w: self.cols[3].get(index),
        }
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = Vec4::from_vec3(v, 1.0);
        m
    }

    /// Creates a non-uniform scaling matrix.
    #[inline]
    pub fn from_scale(scale: Vec3) -> Self {
        Mat3::from_scale(scale).to_mat4()
    }

    /// Creates a rotation matrix from a quaternion.
    #[inline]
    pub fn from_quat(q: Quaternion) -> Self {
        Mat3::from_quat(q).to_mat4()
    }

    /// Builds an affine matrix from a 3x3 linear part and a translation.
    #[inline]
    pub fn from_mat3_translation(linear: &Mat3, translation: Vec3) -> Self {
        let mut m = linear.to_mat4();
        m.cols[3] = Vec4::from_vec3(translation, 1.0);
        m
    }

    /// Returns the translation stored in the fourth column.
    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.cols[3].truncate()
    }

    /// Returns the transpose of the matrix.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(
            self.get_row(0),
            self.get_row(1),
            self.get_row(2),
            self.get_row(3),
        )
    }

    /// Computes the determinant of the upper-left 3x3 block.
    ///
    /// For the affine matrices used by the scene this is the determinant of the whole matrix.
    #[inline]
    pub fn determinant(&self) -> f64 {
        Mat3::from_mat4(self).determinant()
    }

    /// Computes the inverse of an affine transformation matrix.
    ///
    /// # Returns
    ///
    /// `None` if the linear part is not invertible.
    #[inline]
    pub fn affine_inverse(&self) -> Option<Self> {
        let linear = Mat3::from_mat4(self).inverse()?;
        let translation = -(linear * self.translation());
        Some(Self::from_mat3_translation(&linear, translation))
    }

    /// Transforms a point, applying the translation.
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        (*self * Vec4::from_vec3(p, 1.0)).truncate()
    }

    /// Transforms a direction, ignoring the translation.
    #[inline]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        (*self * Vec4::from_vec3(v, 0.0)).truncate()
    }

    /// Returns `true` if every element differs from `other` by at most `epsilon`.
    pub fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.to_cols_array()
            .iter()
            .zip(other.to_cols_array().iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    /// Returns the 16 elements in column order.
    pub fn to_cols_array(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for (c, col) in self.cols.iter().enumerate() {
            for r in 0..4 {
                out[c * 4 + r] = col.get(r);
            }
        }
        out
    }

    /// Creates a matrix from 16 elements in column order.
    pub fn from_cols_array(a: &[f64; 16]) -> Self {
        Self::from_cols(
            Vec4::new(a[0], a[1], a[2], a[3]),
            Vec4::new(a[4], a[5], a[6], a[7]),
            Vec4::new(a[8], a[9], a[10], a[11]),
            Vec4::new(a[12], a[13], a[14], a[15]),
        )
    }
}

// --- Operators Overloading ---

impl Default for Mat4 {
    /// Returns the 4x4 identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f64; 16]> for Mat4 {
    fn from(a: [f64; 16]) -> Self {
        Self::from_cols_array(&a)
    }
}

impl From<Mat4> for [f64; 16] {
    fn from(m: Mat4) -> Self {
        m.to_cols_array()
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    /// Multiplies this matrix by another `Mat4`. Note that matrix multiplication is not commutative.
    #[inline]
    fn mul(self, rhs: Mat4) -> Self::Output {
        let mut result_cols = [Vec4::ZERO; 4];
        for (c_idx, target) in result_cols.iter_mut().enumerate() {
            let col_from_rhs = rhs.cols[c_idx];
            *target = Vec4 {
                x: self.get_row(0).dot(col_from_rhs),
                y: self.get_row(1).dot(col_from_rhs),
                z: self.get_row(2).dot(col_from_rhs),
                w: self.get_row(3).dot(col_from_rhs),
            };
        }
        Mat4 { cols: result_cols }
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    /// Transforms a `Vec4` by this matrix.
    #[inline]
    fn mul(self, rhs: Vec4) -> Self::Output {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::FRAC_PI_2;
    use approx::assert_relative_eq;

    #[test]
    fn test_mat3_inverse_round_trip() {
        let m = Mat3::from_axis_angle(Vec3::new(1.0, 2.0, 3.0), 0.7)
            * Mat3::from_scale(Vec3::new(2.0, 1.0, 0.5));
        let inv = m.inverse().unwrap();
        assert!((m * inv).abs_diff_eq(&Mat3::IDENTITY, 1e-12));
    }

    #[test]
    fn test_mat3_singular_has_no_inverse() {
        assert!(Mat3::ZERO.inverse().is_none());
    }

    #[test]
    fn test_rotation_about_z() {
        let m = Mat3::from_axis_angle(Vec3::Z, FRAC_PI_2);
        let v = m * Vec3::X;
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_affine_inverse() {
        let m = Mat4::from_translation(Vec3::new(1.0, -2.0, 3.0))
            * Mat4::from_quat(Quaternion::from_axis_angle(Vec3::Y, 0.3))
            * Mat4::from_scale(Vec3::new(2.0, 2.0, 2.0));
        let inv = m.affine_inverse().unwrap();
        assert!((m * inv).abs_diff_eq(&Mat4::IDENTITY, 1e-12));
        let p = Vec3::new(4.0, 5.0, 6.0);
        assert!(inv.transform_point(m.transform_point(p)).abs_diff_eq(p, 1e-12));
    }

    #[test]
    fn test_mat4_serializes_column_major() {
        let m = Mat4::from_translation(Vec3::new(7.0, 8.0, 9.0));
        let arr: [f64; 16] = m.into();
        assert_eq!(&arr[12..15], &[7.0, 8.0, 9.0]);
        let json = serde_json::to_string(&m).unwrap();
        let back: Mat4 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
