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

//! Defines the `Transform` type, the translate/rotate/scale form of a node transform.

use super::{Mat3, Mat4, Quaternion, Vec3, EPSILON};
use serde::{Deserialize, Serialize};

/// A decomposed affine transform: `T * R * S`.
///
/// Definitions store guide placement in this form because it is readable and diffable,
/// while the scene backend works with [`Mat4`] world matrices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// The translation part.
    #[serde(rename = "translate")]
    pub translation: Vec3,
    /// The rotation part, as a unit quaternion.
    #[serde(rename = "rotate")]
    pub rotation: Quaternion,
    /// The per-axis scale. A mirrored (negative determinant) transform carries its
    /// reflection in `scale.x`.
    pub scale: Vec3,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quaternion::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Creates a transform from its three parts.
    #[inline]
    pub fn new(translation: Vec3, rotation: Quaternion, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Creates a pure translation.
    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Composes the transform into an affine matrix.
    pub fn to_mat4(&self) -> Mat4 {
        let linear = Mat3::from_quat(self.rotation) * Mat3::from_scale(self.scale);
        Mat4::from_mat3_translation(&linear, self.translation)
    }

    /// Decomposes an affine matrix into translation, rotation and scale.
    ///
    /// Shear is discarded. A negative determinant is folded into `scale.x` so the
    /// rotation part stays a proper rotation.
    pub fn from_mat4(m: &Mat4) -> Self {
        let translation = m.translation();
        let linear = Mat3::from_mat4(m);
        let mut scale = Vec3::new(
            linear.cols[0].length(),
            linear.cols[1].length(),
            linear.cols[2].length(),
        );
        if linear.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        let axis = |i: usize, s: f64| {
            if s.abs() > EPSILON {
                linear.cols[i] / s
            } else {
                Vec3::ZERO
            }
        };
        let rotation_matrix = Mat3::from_cols(axis(0, scale.x), axis(1, scale.y), axis(2, scale.z));
        Self {
            translation,
            rotation: Quaternion::from_rotation_matrix(&rotation_matrix),
            scale,
        }
    }

    /// Returns `true` if both transforms agree within `epsilon`.
    ///
    /// Rotations are compared as rotations, so `q` and `-q` are equal.
    pub fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.translation.abs_diff_eq(other.translation, epsilon)
            && self.rotation.rotation_eq(other.rotation, epsilon)
            && self.scale.abs_diff_eq(other.scale, epsilon)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Transform> for Mat4 {
    fn from(t: Transform) -> Self {
        t.to_mat4()
    }
}
