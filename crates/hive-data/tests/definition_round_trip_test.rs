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

use hive_core::math::{Quaternion, Transform, Vec3};
use hive_data::{
    ComponentDefinition, ComponentRef, GuideDefinition, ParentLink, RigConfiguration,
    SpaceSwitchDefinition, SpaceSwitchDriver, TemplateDocument, ROOT_GUIDE,
};
use serde_json::json;

fn leg(side: &str) -> ComponentDefinition {
    let mut def = ComponentDefinition::new("vchaincomponent", "leg", side);
    def.parent = Some(ParentLink::new("hips", "M", "pelvis"));
    let mut upr = GuideDefinition::new("upr", ROOT_GUIDE, Vec3::new(1.1, 9.5, 0.0))
        .with_shape("sphere")
        .with_setting("mirror", json!(true));
    upr.transform.rotation = Quaternion::from_axis_angle(Vec3::new(0.1, 0.2, 1.0), -1.3);
    upr.shape_transform = Transform::new(
        Vec3::new(0.0, 0.5, 0.0),
        Quaternion::IDENTITY,
        Vec3::new(0.3, 0.3, 0.3),
    );
    def.guide_layer.dag.push(upr);
    def.guide_layer
        .dag
        .push(GuideDefinition::new("mid", "upr", Vec3::new(1.2, 5.0, 0.7)));
    def.guide_layer
        .dag
        .push(GuideDefinition::new("end", "mid", Vec3::new(1.1, 1.0, -0.2)));
    def.guide_layer
        .dag
        .push(GuideDefinition::new("ball", "end", Vec3::new(1.1, 0.2, 1.4)));
    def.guide_layer
        .settings
        .insert("autoAlign".into(), json!(true));
    def.space_switching.push(SpaceSwitchDefinition {
        label: "ikSpace".into(),
        driven: "ikHandle".into(),
        controller: "ikControl".into(),
        attribute: "space".into(),
        default_driver: 1,
        drivers: vec![
            SpaceSwitchDriver {
                label: "world".into(),
                component: Some(ComponentRef::new("god", "M")),
                node: "world".into(),
            },
            SpaceSwitchDriver {
                label: "parent".into(),
                component: None,
                node: "ikBase".into(),
            },
        ],
    });
    def.info.description = "Three-joint limb".into();
    def
}

#[test]
fn test_definition_survives_a_document_round_trip() {
    // --- 1. ARRANGE ---
    let original = leg("L");
    assert!(original.validate().is_ok());

    // --- 2. ACT ---
    let text = serde_json::to_string_pretty(&original).unwrap();
    let parsed: ComponentDefinition = serde_json::from_str(&text).unwrap();
    let reserialized = serde_json::to_value(&parsed).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(parsed, original);
    assert_eq!(reserialized, serde_json::to_value(&original).unwrap());
    let ball = parsed.guide("ball").unwrap();
    assert_eq!(ball.parent, "end");
    assert!(ball.transform.abs_diff_eq(&original.guide("ball").unwrap().transform, 1e-6));
}

#[test]
fn test_template_document_round_trip() {
    let doc = TemplateDocument::from_components(
        "legs",
        RigConfiguration::default(),
        vec![leg("L"), leg("R")],
    );
    // The hips component is not part of the template.
    assert!(doc.components.iter().all(|c| c.parent.is_none()));

    let text = serde_json::to_string(&doc).unwrap();
    let back: TemplateDocument = serde_json::from_str(&text).unwrap();
    assert_eq!(back, doc);
    assert!(back.validate().is_ok());
}
