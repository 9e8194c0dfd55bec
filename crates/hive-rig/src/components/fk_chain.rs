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

//! `fkchain`: a chain of forward-kinematics controls, one per guide.

use crate::component::{
    build_control_chain, build_outputs, build_root_input, BuildContext, ComponentBehavior,
    RigLayers,
};
use crate::BuildError;
use hive_core::math::Vec3;
use hive_data::{ComponentDefinition, GuideDefinition, ROOT_GUIDE};
use serde_json::json;

const DEFAULT_JOINT_COUNT: usize = 3;
const SPACING: f64 = 2.0;

/// One FK control per guide, parented like the guides.
#[derive(Debug, Clone, Copy, Default)]
pub struct FkChain;

impl FkChain {
    fn guide_id(index: usize) -> String {
        format!("fk{index:02}")
    }
}

impl ComponentBehavior for FkChain {
    fn component_type(&self) -> &str {
        "fkchain"
    }

    fn default_definition(&self, name: &str, side: &str) -> ComponentDefinition {
        let mut definition = ComponentDefinition::new(self.component_type(), name, side);
        let mut parent = ROOT_GUIDE.to_string();
        for i in 0..DEFAULT_JOINT_COUNT {
            let id = Self::guide_id(i);
            let position = Vec3::new(SPACING * i as f64, 0.0, 0.0);
            definition
                .guide_layer
                .dag
                .push(GuideDefinition::new(&id, &parent, position).with_shape("circle"));
            parent = id;
        }
        let settings = &mut definition.guide_layer.settings;
        settings.insert("jointCount".into(), json!(DEFAULT_JOINT_COUNT));
        settings.insert("autoAlign".into(), json!(true));
        definition.info.description = "Forward-kinematics chain".to_string();
        definition
    }

    fn build_rig_layer(
        &self,
        ctx: &mut BuildContext<'_>,
        definition: &ComponentDefinition,
        layers: RigLayers<'_>,
    ) -> Result<(), BuildError> {
        let controls = build_control_chain(ctx, definition, layers.deform, layers.rig, "")?;
        let Some(first) = controls.first().and_then(|id| layers.deform.node(id)) else {
            return Err(BuildError::MissingJoint {
                component: definition.key().to_string(),
                joint: Self::guide_id(0),
            });
        };
        let world = ctx.scene.world_transform(first.handle)?;
        build_root_input(ctx, definition, layers.input, world)?;

        let joints: Vec<&str> = controls.iter().map(String::as_str).collect();
        build_outputs(ctx, definition, layers.deform, layers.output, &joints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_definition_is_a_valid_chain() {
        let definition = FkChain.default_definition("tail", "M");
        definition.validate().unwrap();
        let ids: Vec<&str> = definition
            .guide_layer
            .dag
            .preorder()
            .into_iter()
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(ids, vec!["fk00", "fk01", "fk02"]);
        assert!(definition.guide_layer.bool_setting("autoAlign", false));
    }
}
