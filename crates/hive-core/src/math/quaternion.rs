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

//! Defines the `Quaternion` type used for guide and joint orientations.

use super::{Mat3, Vec3, EPSILON};
use serde::{Deserialize, Serialize};
use std::ops::{Mul, Neg};

/// Represents a rotation as a unit quaternion.
///
/// A quaternion is stored as `(x, y, z, w)`, where `[x, y, z]` is the "vector" part
/// and `w` is the "scalar" part. Since `q` and `-q` encode the same rotation, values
/// produced by [`Quaternion::from_rotation_matrix`] are canonicalised so that `w >= 0`.
///
/// It serializes as a plain `[x, y, z, w]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Quaternion {
    /// The x component of the vector part.
    pub x: f64,
    /// The y component of the vector part.
    pub y: f64,
    /// The z component of the vector part.
    pub z: f64,
    /// The scalar (real) part.
    pub w: f64,
}

impl Quaternion {
    /// The identity quaternion, representing no rotation.
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Creates a new quaternion from its raw components.
    ///
    /// Note: This does not guarantee a unit quaternion.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a quaternion representing a rotation around a given axis by a given angle.
    #[inline]
    pub fn from_axis_angle(axis: Vec3, angle_radians: f64) -> Self {
        let normalized_axis = axis.normalize();
        let half_angle = angle_radians * 0.5;
        let s = half_angle.sin();
        let c = half_angle.cos();
        Self {
            x: normalized_axis.x * s,
            y: normalized_axis.y * s,
            z: normalized_axis.z * s,
            w: c,
        }
    }

    /// Creates a quaternion from XYZ Euler angles given in degrees.
    ///
    /// Rotations are applied X first, then Y, then Z.
    pub fn from_euler_degrees(euler: Vec3) -> Self {
        let qx = Self::from_axis_angle(Vec3::X, euler.x.to_radians());
        let qy = Self::from_axis_angle(Vec3::Y, euler.y.to_radians());
        let qz = Self::from_axis_angle(Vec3::Z, euler.z.to_radians());
        (qz * qy * qx).canonical()
    }

    /// Creates a quaternion from a pure rotation matrix.
    pub fn from_rotation_matrix(m: &Mat3) -> Self {
        let m00 = m.cols[0].x;
        let m10 = m.cols[0].y;
        let m20 = m.cols[0].z;
        let m01 = m.cols[1].x;
        let m11 = m.cols[1].y;
        let m21 = m.cols[1].z;
        let m02 = m.cols[2].x;
        let m12 = m.cols[2].y;
        let m22 = m.cols[2].z;

        let trace = m00 + m11 + m22;
        let mut q = Self::IDENTITY;

        if trace > 0.0 {
            let s = 2.0 * (trace + 1.0).sqrt();
            q.w = 0.25 * s;
            q.x = (m21 - m12) / s;
            q.y = (m02 - m20) / s;
            q.z = (m10 - m01) / s;
        } else if m00 > m11 && m00 > m22 {
            let s = 2.0 * (1.0 + m00 - m11 - m22).sqrt();
            q.w = (m21 - m12) / s;
            q.x = 0.25 * s;
            q.y = (m01 + m10) / s;
            q.z = (m02 + m20) / s;
        } else if m11 > m22 {
            let s = 2.0 * (1.0 + m11 - m00 - m22).sqrt();
            q.w = (m02 - m20) / s;
            q.x = (m01 + m10) / s;
            q.y = 0.25 * s;
            q.z = (m12 + m21) / s;
        } else {
            let s = 2.0 * (1.0 + m22 - m00 - m11).sqrt();
            q.w = (m10 - m01) / s;
            q.x = (m02 + m20) / s;
            q.y = (m12 + m21) / s;
            q.z = 0.25 * s;
        }
        q.normalize().canonical()
    }

    /// Calculates the squared length (magnitude) of the quaternion.
    #[inline]
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    /// Calculates the length (magnitude) of the quaternion.
    #[inline]
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Returns a unit-length version of this quaternion, or the identity if it is degenerate.
    #[inline]
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag > EPSILON {
            let inv_mag = 1.0 / mag;
            Self::new(
                self.x * inv_mag,
                self.y * inv_mag,
                self.z * inv_mag,
                self.w * inv_mag,
            )
        } else {
            Self::IDENTITY
        }
    }

    /// Returns the representative of this rotation with a non-negative `w`.
    #[inline]
    pub fn canonical(self) -> Self {
        if self.w < 0.0 {
            -self
        } else {
            self
        }
    }

    /// Computes the conjugate of the quaternion, which negates the vector part.
    #[inline]
    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Computes the inverse of the quaternion.
    #[inline]
    pub fn inverse(&self) -> Self {
        let mag_squared = self.magnitude_squared();
        if mag_squared > EPSILON {
            let c = self.conjugate();
            let inv = 1.0 / mag_squared;
            Self::new(c.x * inv, c.y * inv, c.z * inv, c.w * inv)
        } else {
            Self::IDENTITY
        }
    }

    /// Computes the dot product of two quaternions.
    #[inline]
    pub fn dot(&self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Rotates a 3D vector by this quaternion.
    pub fn rotate_vec3(&self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let s = self.w;
        2.0 * u.dot(v) * u + (s * s - u.dot(u)) * v + 2.0 * s * u.cross(v)
    }

    /// Returns `true` if both quaternions describe the same rotation within `epsilon`.
    ///
    /// `q` and `-q` compare equal.
    pub fn rotation_eq(&self, other: Self, epsilon: f64) -> bool {
        let a = self.canonical();
        let b = other.canonical();
        (a.x - b.x).abs() <= epsilon
            && (a.y - b.y).abs() <= epsilon
            && (a.z - b.z).abs() <= epsilon
            && (a.w - b.w).abs() <= epsilon
    }
}

impl Default for Quaternion {
    /// Returns the identity quaternion.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f64; 4]> for Quaternion {
    #[inline]
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Quaternion> for [f64; 4] {
    #[inline]
    fn from(q: Quaternion) -> Self {
        [q.x, q.y, q.z, q.w]
    }
}

impl Mul<Quaternion> for Quaternion {
    type Output = Self;
    /// Combines two rotations. `a * b` applies `b` first, then `a`.
    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }
}

impl Mul<Vec3> for Quaternion {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: Vec3) -> Self::Output {
        self.rotate_vec3(rhs)
    }
}

impl Neg for Quaternion {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{FRAC_PI_2, PI};
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_round_trip() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.3, -1.0, 0.5), 2.4);
        let back = Quaternion::from_rotation_matrix(&Mat3::from_quat(q));
        assert!(back.rotation_eq(q, 1e-12));
        assert!(back.w >= 0.0);
    }

    #[test]
    fn test_half_turn_is_canonical() {
        let q = Quaternion::from_axis_angle(Vec3::X, PI);
        let back = Quaternion::from_rotation_matrix(&Mat3::from_quat(q));
        assert_relative_eq!(back.x.abs(), 1.0, epsilon = 1e-12);
        assert!(back.w >= 0.0);
    }

    #[test]
    fn test_rotate_vec3() {
        let q = Quaternion::from_axis_angle(Vec3::Y, FRAC_PI_2);
        let v = q * Vec3::X;
        assert!(v.abs_diff_eq(-Vec3::Z, 1e-12));
    }

    #[test]
    fn test_euler_matches_axis_angle() {
        let q = Quaternion::from_euler_degrees(Vec3::new(0.0, 0.0, 90.0));
        assert!(q.rotation_eq(Quaternion::from_axis_angle(Vec3::Z, FRAC_PI_2), 1e-12));
    }

    #[test]
    fn test_serializes_as_array() {
        let json = serde_json::to_string(&Quaternion::IDENTITY).unwrap();
        assert_eq!(json, "[0.0,0.0,0.0,1.0]");
    }
}
