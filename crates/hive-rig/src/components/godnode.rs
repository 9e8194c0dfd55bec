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

//! `godnodecomponent`: the world-space root of a rig.

use crate::component::{
    build_control_chain, build_outputs, build_root_input, BuildContext, ComponentBehavior,
    RigLayers,
};
use crate::BuildError;
use hive_core::math::Vec3;
use hive_core::AttributeValue;
use hive_data::{ComponentDefinition, GuideDefinition, ROOT_GUIDE};
use serde_json::json;

/// A root control with an offset control under it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GodNode;

impl ComponentBehavior for GodNode {
    fn component_type(&self) -> &str {
        "godnodecomponent"
    }

    fn default_definition(&self, name: &str, side: &str) -> ComponentDefinition {
        let mut definition = ComponentDefinition::new(self.component_type(), name, side);
        let dag = &mut definition.guide_layer.dag;
        dag.push(GuideDefinition::new("godnode", ROOT_GUIDE, Vec3::ZERO).with_shape("godnode"));
        dag.push(GuideDefinition::new("offset", "godnode", Vec3::ZERO).with_shape("circle"));
        definition
            .rig_layer
            .settings
            .insert("globalScale".into(), json!(1.0));
        definition.info.description = "World-space root and offset controls".to_string();
        definition
    }

    fn build_rig_layer(
        &self,
        ctx: &mut BuildContext<'_>,
        definition: &ComponentDefinition,
        layers: RigLayers<'_>,
    ) -> Result<(), BuildError> {
        let controls = build_control_chain(ctx, definition, layers.deform, layers.rig, "")?;
        let Some(root) = controls.first().and_then(|id| layers.rig.handle(id)) else {
            return Err(BuildError::MissingGuide {
                component: definition.key().to_string(),
                guide: "godnode".to_string(),
            });
        };
        let scale = definition
            .rig_layer
            .settings
            .get("globalScale")
            .and_then(|v| v.as_f64())
            .unwrap_or(1.0);
        ctx.scene
            .set_attribute(root, "globalScale", AttributeValue::Float(scale))?;

        let world = ctx.scene.world_transform(root)?;
        build_root_input(ctx, definition, layers.input, world)?;
        let last: Vec<&str> = controls.last().map(String::as_str).into_iter().collect();
        build_outputs(ctx, definition, layers.deform, layers.output, &last)
    }
}
