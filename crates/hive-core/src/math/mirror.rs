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

//! Reflection and aiming math used by the mirror and guide-alignment operations.

use super::{Mat3, Mat4, Vec3, EPSILON};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The world axis a transform is mirrored across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorAxis {
    /// Mirror across the YZ plane.
    X,
    /// Mirror across the XZ plane.
    Y,
    /// Mirror across the XY plane.
    Z,
}

impl MirrorAxis {
    /// Returns the vector component index of this axis.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            MirrorAxis::X => 0,
            MirrorAxis::Y => 1,
            MirrorAxis::Z => 2,
        }
    }

    /// Returns the name of the reflection plane for this axis.
    pub fn plane(self) -> &'static str {
        match self {
            MirrorAxis::X => "yz",
            MirrorAxis::Y => "xz",
            MirrorAxis::Z => "xy",
        }
    }

    /// Returns `v` with the component along this axis negated.
    #[inline]
    pub fn reflect_vector(self, v: Vec3) -> Vec3 {
        let mut out = v;
        out[self.index()] = -out[self.index()];
        out
    }
}

impl fmt::Display for MirrorAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MirrorAxis::X => "x",
            MirrorAxis::Y => "y",
            MirrorAxis::Z => "z",
        };
        write!(f, "{s}")
    }
}

/// Returned when a string does not name a mirror axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMirrorAxis(pub String);

impl fmt::Display for InvalidMirrorAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid mirror axis '{}', expected one of x, y, z", self.0)
    }
}

impl std::error::Error for InvalidMirrorAxis {}

impl FromStr for MirrorAxis {
    type Err = InvalidMirrorAxis;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(MirrorAxis::X),
            "y" => Ok(MirrorAxis::Y),
            "z" => Ok(MirrorAxis::Z),
            _ => Err(InvalidMirrorAxis(s.to_string())),
        }
    }
}

/// How the rotation part of a transform is reflected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorBehavior {
    /// Mirrored axes point opposite to the source (`R' = -S * R`), so rotating both
    /// sides by the same local values gives symmetric motion. Used for limbs.
    #[default]
    Behavior,
    /// The orientation is reflected as a whole (`R' = S * R * S`), so both sides keep
    /// matching world-space axes apart from the mirrored one.
    Orientation,
}

/// Reflects an affine world matrix across the plane perpendicular to `axis`.
///
/// Translation is negated along the axis and the scale of each column is kept.
/// Only signs change, so applying the same reflection twice gives back the input
/// bit for bit.
pub fn reflect_matrix(m: &Mat4, axis: MirrorAxis, behavior: MirrorBehavior) -> Mat4 {
    let a = axis.index();
    let mut linear = Mat3::from_mat4(m);
    for col in linear.cols.iter_mut() {
        for row in 0..3 {
            let flip = match behavior {
                // -S * R negates every row except the mirror axis.
                MirrorBehavior::Behavior => row != a,
                // S * R * S negates row a and column a, their shared element twice.
                MirrorBehavior::Orientation => row == a,
            };
            if flip {
                col[row] = -col[row];
            }
        }
    }
    if behavior == MirrorBehavior::Orientation {
        linear.cols[a] = -linear.cols[a];
    }
    Mat4::from_mat3_translation(&linear, axis.reflect_vector(m.translation()))
}

/// Computes the rotation that points local `aim_axis` along `direction`, with local
/// `up_axis` as close as possible to `world_up`.
///
/// Returns `None` when the two local axes are not orthogonal, or when `direction` is
/// degenerate or parallel to `world_up`.
pub fn aim_rotation(direction: Vec3, aim_axis: Vec3, up_axis: Vec3, world_up: Vec3) -> Option<Mat3> {
    let a = aim_axis.normalize();
    let u = up_axis.normalize();
    if a == Vec3::ZERO || u == Vec3::ZERO || a.dot(u).abs() > 1e-6 {
        return None;
    }

    let d = direction.normalize();
    if d == Vec3::ZERO {
        return None;
    }
    let s = (world_up - d * world_up.dot(d)).normalize();
    if s.length_squared() < EPSILON {
        return None;
    }

    let local = Mat3::from_cols(a, u, a.cross(u));
    let world = Mat3::from_cols(d, s, d.cross(s));
    Some(world * local.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quaternion, Transform};

    fn sample() -> Mat4 {
        Transform::new(
            Vec3::new(3.0, 1.5, -0.25),
            Quaternion::from_axis_angle(Vec3::new(0.2, 1.0, -0.4), 1.1),
            Vec3::new(1.0, 2.0, 0.5),
        )
        .to_mat4()
    }

    #[test]
    fn test_parse_axis_case_insensitive() {
        assert_eq!("X".parse::<MirrorAxis>().unwrap(), MirrorAxis::X);
        assert_eq!("z".parse::<MirrorAxis>().unwrap(), MirrorAxis::Z);
        assert!("w".parse::<MirrorAxis>().is_err());
        assert_eq!(MirrorAxis::Y.plane(), "xz");
    }

    #[test]
    fn test_reflection_is_an_involution() {
        let m = sample();
        for axis in [MirrorAxis::X, MirrorAxis::Y, MirrorAxis::Z] {
            for behavior in [MirrorBehavior::Behavior, MirrorBehavior::Orientation] {
                let twice = reflect_matrix(&reflect_matrix(&m, axis, behavior), axis, behavior);
                assert_eq!(twice, m);
            }
        }
    }

    #[test]
    fn test_reflection_keeps_handedness_and_scale() {
        let m = sample();
        let r = reflect_matrix(&m, MirrorAxis::X, MirrorBehavior::Behavior);
        assert_eq!(r.translation().x, -m.translation().x);
        assert!(r.determinant() > 0.0);
        let t = Transform::from_mat4(&r);
        assert!(t.scale.abs_diff_eq(Vec3::new(1.0, 2.0, 0.5), 1e-9));
    }

    #[test]
    fn test_behavior_mirror_points_aim_axis_opposite() {
        let m = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        let r = reflect_matrix(&m, MirrorAxis::X, MirrorBehavior::Behavior);
        assert!(r.transform_vector(Vec3::X).abs_diff_eq(Vec3::X, 1e-12));
        assert!(r.transform_vector(Vec3::Y).abs_diff_eq(-Vec3::Y, 1e-12));
        let o = reflect_matrix(&m, MirrorAxis::X, MirrorBehavior::Orientation);
        assert_eq!(Mat3::from_mat4(&o), Mat3::IDENTITY);
    }

    #[test]
    fn test_aim_rotation() {
        let r = aim_rotation(Vec3::new(0.0, 0.0, -4.0), Vec3::X, Vec3::Y, Vec3::Y).unwrap();
        assert!((r * Vec3::X).abs_diff_eq(-Vec3::Z, 1e-12));
        assert!((r * Vec3::Y).abs_diff_eq(Vec3::Y, 1e-12));
        assert!(r.determinant() > 0.0);
    }

    #[test]
    fn test_aim_rotation_degenerate() {
        assert!(aim_rotation(Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Y).is_none());
        assert!(aim_rotation(Vec3::Y, Vec3::X, Vec3::Y, Vec3::Y).is_none());
        assert!(aim_rotation(Vec3::X, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y).is_none());
    }
}
