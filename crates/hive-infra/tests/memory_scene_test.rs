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

use hive_core::math::{Mat4, Quaternion, Transform, Vec3};
use hive_core::{AttributeValue, NodeKind, SceneBackend, SceneError};
use hive_infra::MemoryScene;

#[test]
fn test_scene_backend_contract_through_trait_object() {
    // --- 1. ARRANGE ---
    let mut scene: Box<dyn SceneBackend> = Box::new(MemoryScene::new());
    let world = Transform::new(
        Vec3::new(1.0, 2.0, 3.0),
        Quaternion::from_axis_angle(Vec3::Y, 0.5),
        Vec3::ONE,
    )
    .to_mat4();

    // --- 2. ACT ---
    let root = scene.create_node(NodeKind::Group, "rig_hrc").unwrap();
    let guide = scene.create_node(NodeKind::Guide, "arm_L_upr_guide").unwrap();
    scene.set_parent(guide, Some(root)).unwrap();
    scene.set_world_transform(guide, world).unwrap();
    scene
        .set_attribute(guide, "shape", AttributeValue::from("sphere"))
        .unwrap();
    let cycle = scene.set_parent(root, Some(guide));

    // --- 3. ASSERT ---
    assert_eq!(scene.world_transform(guide).unwrap(), world);
    assert_eq!(
        scene.attribute(guide, "shape").unwrap(),
        Some(AttributeValue::String("sphere".into()))
    );
    assert_eq!(
        cycle,
        Err(SceneError::ParentCycle {
            child: root,
            parent: guide
        })
    );

    let memory = scene.as_any().downcast_ref::<MemoryScene>().unwrap();
    assert_eq!(memory.path(guide).as_deref(), Some("rig_hrc|arm_L_upr_guide"));
    assert_eq!(memory.parent(guide), Some(root));
}

#[test]
fn test_deleting_a_subtree_leaves_no_dangling_nodes() {
    // --- 1. ARRANGE ---
    let mut scene = MemoryScene::new();
    let root = scene.create_node(NodeKind::Group, "rig_hrc").unwrap();
    let component = scene.create_node(NodeKind::Group, "arm_L_hrc").unwrap();
    scene.set_parent(component, Some(root)).unwrap();
    let mut previous = component;
    let mut joints = Vec::new();
    for id in ["upr", "mid", "end"] {
        let joint = scene
            .create_node(NodeKind::Joint, &format!("arm_L_{id}_jnt"))
            .unwrap();
        scene.set_parent(joint, Some(previous)).unwrap();
        joints.push(joint);
        previous = joint;
    }
    let before = scene.snapshot();

    // --- 2. ACT ---
    scene.delete_node(component).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(scene.len(), 1);
    assert!(joints.iter().all(|j| !scene.exists(*j)));
    assert!(scene.children(root).is_empty());
    let diff = before.diff(&scene.snapshot());
    assert_eq!(diff.len(), 4);
    assert!(diff.iter().all(|d| d.starts_with("removed rig_hrc|arm_L_hrc")));
}

#[test]
fn test_recycled_slot_does_not_alias_old_handle() {
    let mut scene = MemoryScene::new();
    let old = scene.create_node(NodeKind::Control, "a").unwrap();
    scene.delete_node(old).unwrap();
    let new = scene.create_node(NodeKind::Control, "b").unwrap();

    assert_eq!(new.index, old.index);
    assert_ne!(new, old);
    assert!(!scene.exists(old));
    assert_eq!(scene.world_transform(new).unwrap(), Mat4::IDENTITY);
    assert_eq!(
        scene.delete_node(old),
        Err(SceneError::InvalidHandle(old))
    );
}
