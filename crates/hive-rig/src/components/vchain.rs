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

//! `vchaincomponent`: a two-segment limb with FK and IK controls.

use crate::component::{
    build_control_chain, build_guides, build_outputs, build_root_input, BuildContext,
    ComponentBehavior, RigLayers,
};
use crate::layer::Layer;
use crate::BuildError;
use hive_core::math::{Mat4, Vec3, EPSILON};
use hive_core::naming::rules;
use hive_core::{AttributeValue, NodeKind};
use hive_data::{ComponentDefinition, GuideDefinition, ROOT_GUIDE};
use serde_json::json;

/// The guides every vchain needs, root to tip.
pub const VCHAIN_GUIDES: [&str; 3] = ["upr", "mid", "end"];

/// A limb of three joints with an FK chain, an IK end control and a pole vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct VChain;

impl VChain {
    fn require_guides(definition: &ComponentDefinition) -> Result<(), BuildError> {
        for id in VCHAIN_GUIDES {
            if definition.guide(id).is_none() {
                return Err(BuildError::MissingGuide {
                    component: definition.key().to_string(),
                    guide: id.to_string(),
                });
            }
        }
        Ok(())
    }

    fn joint_position(
        ctx: &BuildContext<'_>,
        definition: &ComponentDefinition,
        deform: &Layer,
        id: &str,
    ) -> Result<Vec3, BuildError> {
        let joint = deform.node(id).ok_or_else(|| BuildError::MissingJoint {
            component: definition.key().to_string(),
            joint: id.to_string(),
        })?;
        Ok(ctx.scene.world_transform(joint.handle)?.translation())
    }

    /// Places the pole vector in the plane of the limb, away from the bend.
    ///
    /// A straight limb has no bend; the guide-layer `upVector` setting (default Z)
    /// gives the direction instead.
    fn pole_position(definition: &ComponentDefinition, upr: Vec3, mid: Vec3, end: Vec3) -> Vec3 {
        let limb = end - upr;
        let length = limb.length();
        let along = if length > EPSILON {
            (mid - upr).dot(limb) / (length * length)
        } else {
            0.0
        };
        let bend = mid - (upr + limb * along);
        let direction = if bend.length() > EPSILON {
            bend.normalize()
        } else {
            definition
                .guide_layer
                .vec3_setting("upVector", Vec3::Z)
                .normalize()
        };
        mid + direction * (length * 0.5).max(1.0)
    }
}

impl ComponentBehavior for VChain {
    fn component_type(&self) -> &str {
        "vchaincomponent"
    }

    fn default_definition(&self, name: &str, side: &str) -> ComponentDefinition {
        let mut definition = ComponentDefinition::new(self.component_type(), name, side);
        let dag = &mut definition.guide_layer.dag;
        dag.push(GuideDefinition::new("upr", ROOT_GUIDE, Vec3::ZERO).with_shape("circle"));
        dag.push(GuideDefinition::new("mid", "upr", Vec3::new(4.0, 0.0, -0.5)).with_shape("circle"));
        dag.push(GuideDefinition::new("end", "mid", Vec3::new(8.0, 0.0, 0.0)).with_shape("circle"));
        let settings = &mut definition.guide_layer.settings;
        settings.insert("autoAlign".into(), json!(true));
        settings.insert("upVector".into(), json!([0.0, 0.0, -1.0]));
        definition
            .rig_layer
            .settings
            .insert("ikfk".into(), json!(0.0));
        definition.info.description = "Two-segment limb with FK/IK blending".to_string();
        definition
    }

    fn build_guide_layer(
        &self,
        ctx: &mut BuildContext<'_>,
        definition: &ComponentDefinition,
        layer: &mut Layer,
    ) -> Result<(), BuildError> {
        Self::require_guides(definition)?;
        build_guides(ctx, definition, layer)
    }

    fn build_rig_layer(
        &self,
        ctx: &mut BuildContext<'_>,
        definition: &ComponentDefinition,
        layers: RigLayers<'_>,
    ) -> Result<(), BuildError> {
        let upr = Self::joint_position(ctx, definition, layers.deform, "upr")?;
        let mid = Self::joint_position(ctx, definition, layers.deform, "mid")?;
        let end = Self::joint_position(ctx, definition, layers.deform, "end")?;

        let fk = build_control_chain(ctx, definition, layers.deform, layers.rig, "fk")?;

        let end_world = match layers.deform.handle("end") {
            Some(handle) => ctx.scene.world_transform(handle)?,
            None => Mat4::from_translation(end),
        };
        let ik_name = ctx.node_name(rules::CONTROL, definition, "endik")?;
        let ik = layers
            .rig
            .add_node(ctx.scene, "endik", NodeKind::Control, &ik_name, None, end_world)?;
        let blend = definition
            .rig_layer
            .settings
            .get("ikfk")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        ctx.scene
            .set_attribute(ik, "ikfk", AttributeValue::Float(blend))?;

        let pole_name = ctx.node_name(rules::CONTROL, definition, "upVec")?;
        let pole = Self::pole_position(definition, upr, mid, end);
        layers.rig.add_node(
            ctx.scene,
            "upVec",
            NodeKind::Control,
            &pole_name,
            Some("endik"),
            Mat4::from_translation(pole),
        )?;

        if ctx.configuration.use_proxy_attributes {
            for id in &fk {
                if let Some(handle) = layers.rig.handle(id) {
                    ctx.scene
                        .set_attribute(handle, "ikfkProxy", ik_name.as_str().into())?;
                }
            }
        }

        let root_world = match layers.deform.handle("upr") {
            Some(handle) => ctx.scene.world_transform(handle)?,
            None => Mat4::from_translation(upr),
        };
        build_root_input(ctx, definition, layers.input, root_world)?;
        build_outputs(ctx, definition, layers.deform, layers.output, &VCHAIN_GUIDES)
    }
}
