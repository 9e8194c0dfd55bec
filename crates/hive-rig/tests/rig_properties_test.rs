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

use hive_core::math::{Mat4, MirrorAxis, Quaternion, Transform, Vec3};
use hive_core::{AttributeValue, NodeHandle, NodeKind, SceneBackend, SceneError};
use std::any::Any;
use hive_data::{ComponentDefinition, ComponentKey, ComponentRef, ParentLink};
use hive_infra::MemoryScene;
use hive_rig::component::{BuildContext, RigLayers};
use hive_rig::components::{FkChain, VChain};
use hive_rig::{
    BuildError, ComponentBehavior, ComponentState, DuplicateRequest, Hive, MirrorDescriptor,
    RigError, Session,
};

fn memory(hive: &Hive) -> &MemoryScene {
    hive.scene().as_any().downcast_ref::<MemoryScene>().unwrap()
}

fn new_hive() -> Hive {
    Hive::new(Session::builder(MemoryScene::new()).build())
}

fn assert_same_guides(a: &ComponentDefinition, b: &ComponentDefinition) {
    assert_eq!(a.guide_layer.dag.ids(), b.guide_layer.dag.ids());
    for (ga, gb) in a.guide_layer.dag.iter().zip(b.guide_layer.dag.iter()) {
        assert_eq!(ga.parent, gb.parent, "parent of '{}'", ga.id);
        assert!(
            ga.transform.abs_diff_eq(&gb.transform, 1e-6),
            "transform of '{}': {:?} vs {:?}",
            ga.id,
            ga.transform,
            gb.transform
        );
        assert!(
            ga.shape_transform.abs_diff_eq(&gb.shape_transform, 1e-6),
            "shape transform of '{}'",
            ga.id
        );
    }
}

/// Fails every control-rig build.
struct Broken;

impl ComponentBehavior for Broken {
    fn component_type(&self) -> &str {
        "broken"
    }

    fn default_definition(&self, name: &str, side: &str) -> ComponentDefinition {
        let mut definition = FkChain.default_definition(name, side);
        definition.component_type = "broken".to_string();
        definition
    }

    fn build_rig_layer(
        &self,
        _ctx: &mut BuildContext<'_>,
        definition: &ComponentDefinition,
        _layers: RigLayers<'_>,
    ) -> Result<(), BuildError> {
        Err(BuildError::Behavior {
            component: definition.key().to_string(),
            reason: "no controls today".to_string(),
        })
    }
}

#[test]
fn test_definition_round_trips_through_the_scene() {
    // --- 1. ARRANGE ---
    let mut definition = VChain.default_definition("arm", "L");
    let mid = definition.guide_mut("mid").unwrap();
    mid.transform.rotation = Quaternion::from_axis_angle(Vec3::Z, 0.3);
    mid.transform.translation = Vec3::new(4.25, 0.5, -0.75);
    let end = definition.guide_mut("end").unwrap();
    end.shape_transform.translation = Vec3::new(0.0, 1.5, 0.0);
    end.shape_transform.rotation = Quaternion::from_axis_angle(Vec3::X, 1.1);

    let mut hive = new_hive();
    let id = hive.create_rig("round_trip").unwrap();

    // --- 2. ACT ---
    let reference = hive
        .with_rig(id, |rig, session| {
            let reference = rig.add_component(session, definition.clone())?;
            rig.build_guides(session, None)?;
            Ok::<_, RigError>(reference)
        })
        .unwrap();
    let serialized = hive.rig(id).unwrap().definition(hive.scene(), &reference).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(serialized.key(), definition.key());
    assert_eq!(serialized.guide_layer.settings, definition.guide_layer.settings);
    assert_eq!(serialized.rig_layer, definition.rig_layer);
    assert_same_guides(&definition, &serialized);
}

#[test]
fn test_mirroring_back_restores_the_original_guides() {
    // --- 1. ARRANGE ---
    let mut hive = new_hive();
    let id = hive.create_rig("mirror").unwrap();
    let left = ComponentRef::new("arm", "L");
    hive.with_rig(id, |rig, session| {
        rig.configuration_mut().auto_align_guides = false;
        rig.create_component(session, "vchaincomponent", "arm", "L")?;
        rig.build_guides(session, None)
    })
    .unwrap();
    let mid = memory(&hive).find("arm_L_mid_guide").unwrap();
    let posed = Transform::new(
        Vec3::new(4.0, 11.0, -1.5),
        Quaternion::from_axis_angle(Vec3::new(0.3, 1.0, 0.2).normalize(), 0.8),
        Vec3::ONE,
    )
    .to_mat4();
    hive.scene_mut().set_world_transform(mid, posed).unwrap();
    let original = hive.rig(id).unwrap().definition(hive.scene(), &left).unwrap();

    // --- 2. ACT ---
    hive.with_rig(id, |rig, session| {
        rig.mirror_components(session, &[MirrorDescriptor::new(left.clone(), MirrorAxis::X)])?;
        rig.mirror_components(
            session,
            &[MirrorDescriptor::new(ComponentRef::new("arm", "R"), MirrorAxis::X).overwrite_only()],
        )
    })
    .unwrap();

    // --- 3. ASSERT ---
    let restored = hive.rig(id).unwrap().definition(hive.scene(), &left).unwrap();
    assert_same_guides(&original, &restored);
}

#[test]
fn test_build_visits_ancestors_first() {
    // --- 1. ARRANGE ---
    let mut hive = new_hive();
    let id = hive.create_rig("order").unwrap();
    let names = ["d", "c", "b", "a"];
    hive.with_rig(id, |rig, session| {
        for name in names {
            rig.create_component(session, "fkchain", name, "M")?;
        }
        for (child, parent) in [("d", "c"), ("c", "b"), ("b", "a")] {
            rig.set_parent(
                session,
                &ComponentRef::new(child, "M"),
                Some(ParentLink::new(parent, "M", "fk02")),
            )?;
        }
        Ok::<_, RigError>(())
    })
    .unwrap();

    // --- 2. ACT ---
    let report = hive
        .with_rig(id, |rig, session| rig.build_guides(session, None))
        .unwrap();

    // --- 3. ASSERT ---
    let applied: Vec<&str> = report.applied.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(applied, vec!["a", "b", "c", "d"]);

    let log = memory(&hive).creation_log();
    let position = |name: &str| log.iter().position(|(_, n)| n == name).unwrap();
    assert!(position("a_M_hrc") < position("b_M_hrc"));
    assert!(position("b_M_hrc") < position("c_M_hrc"));
    assert!(position("c_M_hrc") < position("d_M_hrc"));
}

#[test]
fn test_subset_build_pulls_in_ancestors() {
    // --- 1. ARRANGE ---
    let mut hive = new_hive();
    let id = hive.create_rig("subset").unwrap();
    let leaf = ComponentRef::new("leaf", "M");
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "fkchain", "base", "M")?;
        rig.create_component(session, "fkchain", "leaf", "M")?;
        rig.create_component(session, "fkchain", "other", "M")?;
        rig.set_parent(session, &leaf, Some(ParentLink::new("base", "M", "fk01")))
    })
    .unwrap();

    // --- 2. ACT ---
    let report = hive
        .with_rig(id, |rig, session| rig.build_deform(session, Some(std::slice::from_ref(&leaf))))
        .unwrap();

    // --- 3. ASSERT ---
    let rig = hive.rig(id).unwrap();
    assert_eq!(report.applied, vec![ComponentRef::new("base", "M"), leaf.clone()]);
    assert_eq!(rig.component(&leaf).unwrap().state(), ComponentState::SkeletonBuilt);
    let other = rig.component(&ComponentRef::new("other", "M")).unwrap();
    assert_eq!(other.state(), ComponentState::Empty);
}

#[test]
fn test_component_identity_is_unique() {
    // --- 1. ARRANGE ---
    let mut hive = new_hive();
    let id = hive.create_rig("unique").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "vchaincomponent", "arm", "L")
    })
    .unwrap();

    // --- 2. ACT ---
    let again = hive.with_rig(id, |rig, session| {
        rig.create_component(session, "vchaincomponent", "arm", "L")
    });
    let other_side = hive.with_rig(id, |rig, session| {
        rig.create_component(session, "vchaincomponent", "arm", "R")
    });

    // --- 3. ASSERT ---
    assert!(matches!(
        again,
        Err(RigError::DuplicateComponent(ref key))
            if *key == ComponentKey::new("vchaincomponent", "arm", "L")
    ));
    assert!(other_side.is_ok());
    assert_eq!(hive.rig(id).unwrap().len(), 2);
}

#[test]
fn test_parenting_cycles_are_rejected() {
    // --- 1. ARRANGE ---
    let mut hive = new_hive();
    let id = hive.create_rig("cycle").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "fkchain", "a", "M")?;
        rig.create_component(session, "fkchain", "b", "M")?;
        rig.set_parent(
            session,
            &ComponentRef::new("b", "M"),
            Some(ParentLink::new("a", "M", "fk02")),
        )
    })
    .unwrap();

    // --- 2. ACT ---
    let result = hive.with_rig(id, |rig, session| {
        rig.set_parent(
            session,
            &ComponentRef::new("a", "M"),
            Some(ParentLink::new("b", "M", "fk00")),
        )
    });

    // --- 3. ASSERT ---
    assert!(matches!(result, Err(RigError::CyclicParent { .. })));
    let rig = hive.rig(id).unwrap();
    assert!(rig.component(&ComponentRef::new("a", "M")).unwrap().parent().is_none());
}

#[test]
fn test_duplicate_copies_the_subtree_with_remapped_links() {
    // --- 1. ARRANGE ---
    let mut hive = new_hive();
    let id = hive.create_rig("dup").unwrap();
    let arm = ComponentRef::new("arm", "L");
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "vchaincomponent", "arm", "L")?;
        rig.create_component(session, "fkchain", "hand", "L")?;
        rig.set_parent(
            session,
            &ComponentRef::new("hand", "L"),
            Some(ParentLink::new("arm", "L", "end")),
        )?;
        rig.build_guides(session, None)
    })
    .unwrap();

    // --- 2. ACT ---
    let pairs = hive
        .with_rig(id, |rig, session| {
            rig.duplicate_components(session, &[DuplicateRequest::new(arm.clone()).with_side("R")])
        })
        .unwrap();

    // --- 3. ASSERT ---
    let copies: Vec<ComponentRef> = pairs.iter().map(|(_, copy)| copy.clone()).collect();
    assert_eq!(
        copies,
        vec![ComponentRef::new("arm", "R"), ComponentRef::new("hand", "R")]
    );
    let rig = hive.rig(id).unwrap();
    let hand = rig.component(&ComponentRef::new("hand", "R")).unwrap();
    assert_eq!(hand.parent(), Some(&ParentLink::new("arm", "R", "end")));
    assert_eq!(hand.state(), ComponentState::GuideBuilt);
    assert_eq!(rig.len(), 4);
}

#[test]
fn test_duplicate_rejects_a_taken_name_before_changing_anything() {
    // --- 1. ARRANGE ---
    let mut hive = new_hive();
    let id = hive.create_rig("dup").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "fkchain", "tail", "M")?;
        rig.create_component(session, "fkchain", "spine", "M")
    })
    .unwrap();
    let before = memory(&hive).snapshot();

    // --- 2. ACT ---
    let result = hive.with_rig(id, |rig, session| {
        let request = DuplicateRequest::new(ComponentRef::new("tail", "M")).with_name("spine");
        rig.duplicate_components(session, &[request])
    });

    // --- 3. ASSERT ---
    assert!(matches!(result, Err(RigError::DuplicateComponent(_))));
    assert_eq!(hive.rig(id).unwrap().len(), 2);
    assert!(before.diff(&memory(&hive).snapshot()).is_empty());
}

#[test]
fn test_failed_batch_keeps_earlier_components_built() {
    // --- 1. ARRANGE ---
    let session = Session::builder(MemoryScene::new()).with_behavior(Broken).build();
    let mut hive = Hive::new(session);
    let id = hive.create_rig("batch").unwrap();
    let spine = ComponentRef::new("spine", "M");
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "fkchain", "spine", "M")?;
        rig.create_component(session, "broken", "neck", "M")?;
        rig.set_parent(
            session,
            &ComponentRef::new("neck", "M"),
            Some(ParentLink::new("spine", "M", "fk02")),
        )
    })
    .unwrap();

    // --- 2. ACT ---
    let result = hive.with_rig(id, |rig, session| rig.build_rigs(session, None));

    // --- 3. ASSERT ---
    match result {
        Err(RigError::BuildFailed {
            component, built, ..
        }) => {
            assert_eq!(component, ComponentKey::new("broken", "neck", "M"));
            assert_eq!(built, vec![spine.clone()]);
        }
        other => panic!("expected a batch failure, got {other:?}"),
    }
    let rig = hive.rig(id).unwrap();
    assert_eq!(rig.component(&spine).unwrap().state(), ComponentState::RigBuilt);
    let neck = rig.component(&ComponentRef::new("neck", "M")).unwrap();
    assert_eq!(neck.state(), ComponentState::SkeletonBuilt);
}

/// A host where moving a node carries its whole subtree along.
struct FollowingScene(MemoryScene);

impl SceneBackend for FollowingScene {
    fn create_node(&mut self, kind: NodeKind, name: &str) -> Result<NodeHandle, SceneError> {
        self.0.create_node(kind, name)
    }

    fn exists(&self, handle: NodeHandle) -> bool {
        self.0.exists(handle)
    }

    fn set_parent(&mut self, handle: NodeHandle, parent: Option<NodeHandle>) -> Result<(), SceneError> {
        self.0.set_parent(handle, parent)
    }

    fn parent_of(&self, handle: NodeHandle) -> Result<Option<NodeHandle>, SceneError> {
        self.0.parent_of(handle)
    }

    fn children_of(&self, handle: NodeHandle) -> Result<Vec<NodeHandle>, SceneError> {
        self.0.children_of(handle)
    }

    fn world_transform(&self, handle: NodeHandle) -> Result<Mat4, SceneError> {
        self.0.world_transform(handle)
    }

    fn set_world_transform(&mut self, handle: NodeHandle, matrix: Mat4) -> Result<(), SceneError> {
        let old = self.0.world_transform(handle)?;
        let delta = matrix * old.affine_inverse().unwrap_or(Mat4::IDENTITY);
        let mut stack = self.0.children_of(handle)?;
        while let Some(child) = stack.pop() {
            let world = self.0.world_transform(child)?;
            self.0.set_world_transform(child, delta * world)?;
            stack.extend(self.0.children_of(child)?);
        }
        self.0.set_world_transform(handle, matrix)
    }

    fn delete_node(&mut self, handle: NodeHandle) -> Result<(), SceneError> {
        self.0.delete_node(handle)
    }

    fn set_attribute(&mut self, handle: NodeHandle, name: &str, value: AttributeValue) -> Result<(), SceneError> {
        self.0.set_attribute(handle, name, value)
    }

    fn attribute(&self, handle: NodeHandle, name: &str) -> Result<Option<AttributeValue>, SceneError> {
        self.0.attribute(handle, name)
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.0
    }
}

#[test]
fn test_align_leaves_unaligned_guides_in_place_on_following_hosts() {
    // --- 1. ARRANGE ---
    let mut hive = Hive::new(Session::builder(FollowingScene(MemoryScene::new())).build());
    let id = hive.create_rig("follow").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "vchaincomponent", "arm", "L")?;
        rig.build_guides(session, None)
    })
    .unwrap();
    let end = memory(&hive).find("arm_L_end_guide").unwrap();
    let end_shape = memory(&hive).find("arm_L_end_guide_shape").unwrap();
    let before = (
        hive.scene().world_transform(end).unwrap(),
        hive.scene().world_transform(end_shape).unwrap(),
    );

    // --- 2. ACT ---
    let aligned = hive
        .with_rig(id, |rig, session| rig.align_guides(session, None, false))
        .unwrap();

    // --- 3. ASSERT ---
    let ids = &aligned[0].1;
    assert_eq!(ids, &vec!["upr".to_string(), "mid".to_string()]);
    let after = (
        hive.scene().world_transform(end).unwrap(),
        hive.scene().world_transform(end_shape).unwrap(),
    );
    assert_eq!(after, before);
    let mid = memory(&hive).find("arm_L_mid_guide").unwrap();
    assert!(hive
        .scene()
        .world_transform(mid)
        .unwrap()
        .translation()
        .abs_diff_eq(Vec3::new(4.0, 0.0, -0.5), 1e-9));
}

#[test]
fn test_mirror_recurses_into_children_once() {
    // --- 1. ARRANGE ---
    let mut hive = new_hive();
    let id = hive.create_rig("limbs").unwrap();
    let (arm, hand) = (ComponentRef::new("arm", "L"), ComponentRef::new("hand", "L"));
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "vchaincomponent", "arm", "L")?;
        rig.create_component(session, "fkchain", "hand", "L")?;
        rig.set_parent(session, &hand, Some(ParentLink::new("arm", "L", "end")))?;
        rig.build_guides(session, None)
    })
    .unwrap();

    // --- 2. ACT ---
    let report = hive
        .with_rig(id, |rig, session| {
            rig.mirror_components(
                session,
                &[
                    MirrorDescriptor::new(arm.clone(), MirrorAxis::X),
                    MirrorDescriptor::new(hand.clone(), MirrorAxis::X),
                ],
            )
        })
        .unwrap();

    // --- 3. ASSERT ---
    let (arm_r, hand_r) = (ComponentRef::new("arm", "R"), ComponentRef::new("hand", "R"));
    assert_eq!(report.created, vec![arm_r.clone(), hand_r.clone()]);
    assert!(report.updated.is_empty());
    let rig = hive.rig(id).unwrap();
    assert_eq!(rig.len(), 4);
    let mirrored_hand = rig.component(&hand_r).unwrap();
    assert_eq!(mirrored_hand.parent(), Some(&ParentLink::new("arm", "R", "end")));
    assert_eq!(mirrored_hand.state(), ComponentState::GuideBuilt);
    assert_eq!(rig.children(&arm_r), vec![hand_r]);
    assert_eq!(memory(&hive).find_kind(NodeKind::Guide).len(), 12);
}

#[test]
fn test_mirror_auto_aligns_the_created_guides() {
    // --- 1. ARRANGE ---
    let mut hive = new_hive();
    let id = hive.create_rig("aligned").unwrap();
    let left = ComponentRef::new("arm", "L");
    hive.with_rig(id, |rig, session| {
        rig.configuration_mut().auto_align_guides = true;
        rig.create_component(session, "vchaincomponent", "arm", "L")?;
        rig.build_guides(session, None)
    })
    .unwrap();
    let mid = memory(&hive).find("arm_L_mid_guide").unwrap();
    hive.scene_mut()
        .set_world_transform(mid, Mat4::from_translation(Vec3::new(4.0, 1.0, -2.0)))
        .unwrap();

    // --- 2. ACT ---
    hive.with_rig(id, |rig, session| {
        rig.mirror_components(session, &[MirrorDescriptor::new(left.clone(), MirrorAxis::X)])
    })
    .unwrap();

    // --- 3. ASSERT ---
    let right = ComponentRef::new("arm", "R");
    let definition = hive.rig(id).unwrap().definition(hive.scene(), &right).unwrap();
    let primary = definition.guide_layer.vec3_setting("primaryAxis", Vec3::X);
    let scene = memory(&hive);
    let world = |id: &str| scene.world_transform(scene.find(&format!("arm_R_{id}_guide")).unwrap()).unwrap();
    for (guide, child) in [("upr", "mid"), ("mid", "end")] {
        let (from, to) = (world(guide), world(child));
        let aim = from.transform_vector(primary).normalize();
        let expected = (to.translation() - from.translation()).normalize();
        assert!(
            aim.abs_diff_eq(expected, 1e-6),
            "'{guide}' aims along {aim:?}, expected {expected:?}"
        );
    }
    assert!(world("mid").translation().abs_diff_eq(Vec3::new(-4.0, 1.0, -2.0), 1e-9));
}
