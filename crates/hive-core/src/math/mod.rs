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

//! Provides the double-precision math primitives used for guide and joint placement.
//!
//! Rig transforms are compared with tight tolerances (round trips and mirror
//! involutions must hold to `1e-6`), so every type in this module works in `f64`.
//! All angular functions operate in **radians**.

// --- Fundamental Constants ---

/// A small constant for degenerate-length and singularity checks.
pub const EPSILON: f64 = 1e-9;

pub use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

/// The factor to convert degrees to radians (PI / 180.0).
pub const DEG_TO_RAD: f64 = PI / 180.0;
/// The factor to convert radians to degrees (180.0 / PI).
pub const RAD_TO_DEG: f64 = 180.0 / PI;

// --- Declare Sub-Modules ---

pub mod matrix;
pub mod mirror;
pub mod quaternion;
pub mod transform;
pub mod vector;

// --- Re-export Principal Types ---

pub use self::matrix::{Mat3, Mat4};
pub use self::mirror::{
    aim_rotation, reflect_matrix, InvalidMirrorAxis, MirrorAxis, MirrorBehavior,
};
pub use self::quaternion::Quaternion;
pub use self::transform::Transform;
pub use self::vector::{Vec3, Vec4};

// --- Utility Functions ---

/// Converts an angle from degrees to radians.
///
/// # Examples
///
/// ```
/// use hive_core::math::{degrees_to_radians, PI};
/// assert_eq!(degrees_to_radians(180.0), PI);
/// ```
#[inline]
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * DEG_TO_RAD
}

/// Converts an angle from radians to degrees.
#[inline]
pub fn radians_to_degrees(radians: f64) -> f64 {
    radians * RAD_TO_DEG
}

/// Performs an approximate equality comparison between two floats with a custom tolerance.
///
/// # Examples
///
/// ```
/// use hive_core::math::approx_eq_eps;
/// assert!(approx_eq_eps(0.001, 0.002, 1e-2));
/// assert!(!approx_eq_eps(0.001, 0.002, 1e-4));
/// ```
#[inline]
pub fn approx_eq_eps(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() <= epsilon
}

/// Performs an approximate equality comparison using the module's default [`EPSILON`].
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    approx_eq_eps(a, b, EPSILON)
}
