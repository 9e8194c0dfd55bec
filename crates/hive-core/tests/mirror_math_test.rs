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

use approx::assert_abs_diff_eq;
use hive_core::math::{
    reflect_matrix, MirrorAxis, MirrorBehavior, Quaternion, Transform, Vec3, DEG_TO_RAD,
};

fn guide_transform(x: f64, y: f64, z: f64, angle_deg: f64) -> Transform {
    Transform::new(
        Vec3::new(x, y, z),
        Quaternion::from_axis_angle(Vec3::new(0.3, 0.8, -0.5), angle_deg * DEG_TO_RAD),
        Vec3::new(1.0, 1.25, 0.75),
    )
}

#[test]
fn test_mirrored_chain_decomposes_and_returns() {
    // --- 1. ARRANGE ---
    // A three-guide arm chain on the left side.
    let chain = [
        guide_transform(2.0, 14.0, 0.5, 10.0),
        guide_transform(5.0, 11.5, -0.4, 35.0),
        guide_transform(7.5, 9.0, 0.2, 80.0),
    ];

    for axis in [MirrorAxis::X, MirrorAxis::Y, MirrorAxis::Z] {
        for behavior in [MirrorBehavior::Behavior, MirrorBehavior::Orientation] {
            // --- 2. ACT ---
            // Mirror through the decomposed form, as definitions store it.
            let mirrored: Vec<Transform> = chain
                .iter()
                .map(|t| Transform::from_mat4(&reflect_matrix(&t.to_mat4(), axis, behavior)))
                .collect();
            let back: Vec<Transform> = mirrored
                .iter()
                .map(|t| Transform::from_mat4(&reflect_matrix(&t.to_mat4(), axis, behavior)))
                .collect();

            // --- 3. ASSERT ---
            for ((original, once), twice) in chain.iter().zip(&mirrored).zip(&back) {
                let i = axis.index();
                assert_abs_diff_eq!(once.translation[i], -original.translation[i], epsilon = 1e-12);
                assert!(once.scale.x > 0.0, "mirroring must not flip handedness");
                assert!(
                    twice.abs_diff_eq(original, 1e-6),
                    "mirror across {axis} ({behavior:?}) is not an involution"
                );
            }
        }
    }
}
