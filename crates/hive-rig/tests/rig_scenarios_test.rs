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

use hive_core::math::{Mat4, MirrorAxis, Vec3};
use hive_core::{AttributeValue, SceneBackend};
use hive_data::{ComponentRef, ParentLink, SpaceSwitchDefinition, SpaceSwitchDriver};
use hive_infra::MemoryScene;
use hive_io::TemplateError;
use hive_rig::components::FkChain;
use hive_rig::space_switch::{DEFAULT_INDEX_ATTR, DRIVERS_ATTR, PARENT_SPACE_ATTR};
use hive_rig::{ComponentBehavior, ComponentState, Hive, MirrorDescriptor, RigError, RigId, Session};

fn memory(hive: &Hive) -> &MemoryScene {
    hive.scene().as_any().downcast_ref::<MemoryScene>().unwrap()
}

fn arm() -> ComponentRef {
    ComponentRef::new("arm", "L")
}

fn hive_with_arm() -> (Hive, RigId) {
    let mut hive = Hive::new(Session::builder(MemoryScene::new()).build());
    let id = hive.create_rig("biped").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "vchaincomponent", "arm", "L")
    })
    .unwrap();
    (hive, id)
}

#[test]
fn test_build_guides_creates_a_parented_guide_chain() {
    // --- 1. ARRANGE ---
    let (mut hive, id) = hive_with_arm();

    // --- 2. ACT ---
    let report = hive
        .with_rig(id, |rig, session| rig.build_guides(session, None))
        .unwrap();

    // --- 3. ASSERT ---
    assert_eq!(report.applied, vec![arm()]);
    let rig = hive.rig(id).unwrap();
    assert_eq!(rig.component(&arm()).unwrap().state(), ComponentState::GuideBuilt);

    let scene = memory(&hive);
    let upr = scene.find("arm_L_upr_guide").expect("upr guide");
    let mid = scene.find("arm_L_mid_guide").expect("mid guide");
    let end = scene.find("arm_L_end_guide").expect("end guide");
    assert_eq!(scene.parent(mid), Some(upr));
    assert_eq!(scene.parent(end), Some(mid));
    assert!(scene.path(upr).unwrap().starts_with("biped_hrc|"));
}

#[test]
fn test_mirror_creates_the_opposite_arm_with_negated_x() {
    // --- 1. ARRANGE ---
    let (mut hive, id) = hive_with_arm();
    hive.with_rig(id, |rig, session| rig.build_guides(session, None))
        .unwrap();
    let upr = memory(&hive).find("arm_L_upr_guide").unwrap();
    hive.scene_mut()
        .set_world_transform(upr, Mat4::from_translation(Vec3::new(3.0, 12.0, 0.5)))
        .unwrap();
    let original = hive
        .rig(id)
        .unwrap()
        .definition(hive.scene(), &arm())
        .unwrap();

    // --- 2. ACT ---
    let descriptor = MirrorDescriptor::new(arm(), MirrorAxis::X).with_side("R");
    let report = hive
        .with_rig(id, |rig, session| rig.mirror_components(session, &[descriptor]))
        .unwrap();

    // --- 3. ASSERT ---
    let right = ComponentRef::new("arm", "R");
    assert_eq!(report.created, vec![right.clone()]);
    let rig = hive.rig(id).unwrap();
    let mirrored = rig.definition(hive.scene(), &right).unwrap();
    assert_eq!(mirrored.side, "R");
    assert_eq!(mirrored.component_type, "vchaincomponent");

    let before = original.guide_layer.dag.iter().next().unwrap();
    let after = mirrored.guide_layer.dag.iter().next().unwrap();
    assert_eq!(before.id, after.id);
    assert!((after.transform.translation.x + before.transform.translation.x).abs() < 1e-9);
    assert!((after.transform.translation.y - before.transform.translation.y).abs() < 1e-9);
    assert_eq!(rig.component(&right).unwrap().state(), ComponentState::GuideBuilt);
    assert!(memory(&hive).find("arm_R_upr_guide").is_some());
}

#[test]
fn test_template_save_refuses_overwrite_then_loads_back() {
    // --- 1. ARRANGE ---
    let dir = tempfile::tempdir().unwrap();
    let session = Session::builder(MemoryScene::new())
        .with_templates(dir.path())
        .build();
    let mut hive = Hive::new(session);
    let id = hive.create_rig("biped").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "fkchain", "spine", "M")?;
        rig.create_component(session, "vchaincomponent", "arm", "L")?;
        rig.set_parent(
            session,
            &ComponentRef::new("arm", "L"),
            Some(ParentLink::new("spine", "M", "fk02")),
        )?;
        rig.build_guides(session, None)
    })
    .unwrap();
    let saved = hive.rig(id).unwrap().serialize(hive.scene()).unwrap();

    // --- 2. ACT ---
    let first = hive.save_template(id, "biped", false);
    let second = hive.save_template(id, "biped", false);
    let forced = hive.save_template(id, "biped", true);
    let (loaded_id, created) = hive.load_template("biped", Some("biped_copy"), None).unwrap();

    // --- 3. ASSERT ---
    assert!(first.is_ok());
    assert!(matches!(
        second,
        Err(RigError::Template(TemplateError::AlreadyExists(ref name))) if name == "biped"
    ));
    assert!(forced.is_ok());

    assert_ne!(loaded_id, id);
    assert_eq!(created.len(), 2);
    let loaded = hive.rig(loaded_id).unwrap();
    assert_eq!(loaded.name(), "biped_copy");
    let reloaded = loaded.serialize(hive.scene()).unwrap();
    assert_eq!(reloaded.len(), saved.len());
    for (a, b) in saved.iter().zip(&reloaded) {
        assert_eq!(a.key(), b.key());
        assert_eq!(a.parent, b.parent);
        assert_eq!(a.guide_layer.settings, b.guide_layer.settings);
        assert_eq!(a.guide_layer.dag.ids(), b.guide_layer.dag.ids());
        for (ga, gb) in a.guide_layer.dag.iter().zip(b.guide_layer.dag.iter()) {
            assert_eq!(ga.parent, gb.parent);
            assert!(ga.transform.abs_diff_eq(&gb.transform, 1e-6));
        }
    }
}

#[test]
fn test_delete_with_children_leaves_no_dangling_nodes() {
    // --- 1. ARRANGE ---
    let mut hive = Hive::new(Session::builder(MemoryScene::new()).build());
    let id = hive.create_rig("chain").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "fkchain", "a", "M")?;
        for (child, parent) in [("b", "a"), ("c", "b"), ("d", "c")] {
            rig.create_component(session, "fkchain", child, "M")?;
            rig.set_parent(
                session,
                &ComponentRef::new(child, "M"),
                Some(ParentLink::new(parent, "M", "fk02")),
            )?;
        }
        rig.build_guides(session, None)?;
        rig.build_deform(session, None)?;
        rig.build_rigs(session, None)
    })
    .unwrap();
    assert!(memory(&hive).find("d_M_fk00_anim").is_some());

    // --- 2. ACT ---
    let deleted = hive
        .with_rig(id, |rig, session| {
            rig.delete_component(session, &ComponentRef::new("b", "M"), true)
        })
        .unwrap();

    // --- 3. ASSERT ---
    let names: Vec<&str> = deleted.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["d", "c", "b"]);
    let rig = hive.rig(id).unwrap();
    assert_eq!(rig.references(), vec![ComponentRef::new("a", "M")]);

    let snapshot = memory(&hive).snapshot();
    for node in snapshot.nodes() {
        let leaf = node.path.rsplit('|').next().unwrap();
        assert!(
            !["b_", "c_", "d_"].iter().any(|p| leaf.starts_with(p)),
            "dangling node {}",
            node.path
        );
        assert!(node.path.starts_with("chain_hrc"));
    }
    assert!(memory(&hive).find("a_M_fk00_anim").is_some());
}

fn fk(name: &str) -> ComponentRef {
    ComponentRef::new(name, "M")
}

/// Three FK chains: `b` under `a.fk01`, `c` under `b.fk02`. `c` switches space
/// between its own root, `b` and `a`, defaulting to `b`.
fn three_level_chain() -> (Hive, RigId) {
    let mut hive = Hive::new(Session::builder(MemoryScene::new()).build());
    let id = hive.create_rig("chain").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "fkchain", "a", "M")?;
        rig.create_component(session, "fkchain", "b", "M")?;
        rig.set_parent(session, &fk("b"), Some(ParentLink::new("a", "M", "fk01")))?;

        let mut c = FkChain.default_definition("c", "M");
        c.parent = Some(ParentLink::new("b", "M", "fk02"));
        let driver = |label: &str, component: Option<ComponentRef>| SpaceSwitchDriver {
            label: label.into(),
            component,
            node: "fk00".into(),
        };
        c.space_switching.push(SpaceSwitchDefinition {
            label: "follow".into(),
            driven: "fk00".into(),
            controller: "fk00".into(),
            attribute: "space".into(),
            default_driver: 1,
            drivers: vec![
                driver("local", None),
                driver("middle", Some(fk("b"))),
                driver("top", Some(fk("a"))),
            ],
        });
        rig.add_component(session, c)?;
        rig.build_rigs(session, None)
    })
    .unwrap();
    (hive, id)
}

fn attribute(hive: &Hive, node: &str, name: &str) -> Option<AttributeValue> {
    let scene = memory(hive);
    scene.attribute(scene.find(node).unwrap(), name).unwrap()
}

#[test]
fn test_delete_without_children_repoints_orphans_to_the_grandparent() {
    // --- 1. ARRANGE ---
    let (mut hive, id) = three_level_chain();

    // --- 2. ACT ---
    let deleted = hive
        .with_rig(id, |rig, session| rig.delete_component(session, &fk("b"), false))
        .unwrap();

    // --- 3. ASSERT ---
    assert_eq!(deleted, vec![fk("b")]);
    let rig = hive.rig(id).unwrap();
    assert_eq!(
        rig.component(&fk("c")).unwrap().parent(),
        Some(&ParentLink::new("a", "M", "fk01"))
    );
    assert_eq!(rig.children(&fk("a")), vec![fk("c")]);
    assert_eq!(rig.build_order(), vec![fk("a"), fk("c")]);
    assert_eq!(rig.component(&fk("c")).unwrap().state(), ComponentState::RigBuilt);
}

#[test]
fn test_delete_without_children_rebuilds_orphan_rig_links() {
    // --- 1. ARRANGE ---
    let (mut hive, id) = three_level_chain();
    assert_eq!(
        attribute(&hive, "c_M_root_in", PARENT_SPACE_ATTR),
        Some(AttributeValue::String("b_M_fk02_out".to_string()))
    );

    // --- 2. ACT ---
    hive.with_rig(id, |rig, session| rig.delete_component(session, &fk("b"), false))
        .unwrap();

    // --- 3. ASSERT ---
    assert_eq!(
        attribute(&hive, "c_M_root_in", PARENT_SPACE_ATTR),
        Some(AttributeValue::String("a_M_fk01_out".to_string()))
    );
    assert_eq!(
        attribute(&hive, "c_M_follow_space", DRIVERS_ATTR),
        Some(AttributeValue::StringList(vec![
            "c_M_fk00_anim".to_string(),
            "a_M_fk00_anim".to_string(),
        ]))
    );
    assert_eq!(
        attribute(&hive, "c_M_follow_space", DEFAULT_INDEX_ATTR),
        Some(AttributeValue::Int(0))
    );

    let rig = hive.rig(id).unwrap();
    let switch = &rig.component(&fk("c")).unwrap().definition().space_switching[0];
    let labels: Vec<&str> = switch.drivers.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["local", "top"]);
    assert_eq!(switch.default_driver, 0);
    for node in memory(&hive).snapshot().nodes() {
        let leaf = node.path.rsplit('|').next().unwrap();
        assert!(!leaf.starts_with("b_"), "dangling node {}", node.path);
    }
}
