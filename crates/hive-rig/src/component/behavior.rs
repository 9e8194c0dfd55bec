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

//! The per-type capability set of a component and the helpers built-in types share.

use crate::layer::Layer;
use crate::BuildError;
use hive_core::math::{aim_rotation, Mat3, Mat4, Quaternion, Transform, Vec3};
use hive_core::naming::rules;
use hive_core::{AttributeValue, NamingError, NamingResolver, NodeKind, SceneBackend};
use hive_data::{ComponentDefinition, RigConfiguration};
use indexmap::IndexMap;
use std::collections::HashMap;

/// The attribute holding a guide's id on its scene node.
pub const GUIDE_ID_ATTR: &str = "hiveId";
/// The attribute holding a guide's shape name.
pub const SHAPE_ATTR: &str = "shape";
/// The attribute holding a guide's colour.
pub const COLOR_ATTR: &str = "color";

/// Returns the guide-layer id of the shape node of guide `id`.
pub fn shape_key(id: &str) -> String {
    format!("{id}/shape")
}

/// What a behaviour may touch while it builds a layer.
pub struct BuildContext<'a> {
    /// The scene being built into.
    pub scene: &'a mut dyn SceneBackend,
    /// The naming preset of the session.
    pub naming: &'a NamingResolver,
    /// The configuration of the rig being built.
    pub configuration: &'a RigConfiguration,
}

impl BuildContext<'_> {
    /// Resolves a per-node naming rule for a component.
    pub fn node_name(
        &self,
        rule: &str,
        definition: &ComponentDefinition,
        id: &str,
    ) -> Result<String, NamingError> {
        self.naming.resolve(
            rule,
            &[
                ("componentName", definition.name.as_str()),
                ("side", definition.side.as_str()),
                ("id", id),
            ],
        )
    }
}

/// The layers a behaviour fills when it builds the control rig.
pub struct RigLayers<'l> {
    /// The built skeleton, read-only.
    pub deform: &'l Layer,
    /// The control layer.
    pub rig: &'l mut Layer,
    /// The input layer.
    pub input: &'l mut Layer,
    /// The output layer.
    pub output: &'l mut Layer,
}

/// The build logic of one component type.
///
/// Behaviours are stateless; a rig looks one up by type name when it creates a
/// component and calls it at every phase boundary.
pub trait ComponentBehavior {
    /// The type name stored in definitions, such as `"fkchain"`.
    fn component_type(&self) -> &str;

    /// Returns the definition a new component of this type starts from.
    ///
    /// It is also the default schema older stored definitions are upgraded against.
    fn default_definition(&self, name: &str, side: &str) -> ComponentDefinition;

    /// Creates the guide nodes.
    fn build_guide_layer(
        &self,
        ctx: &mut BuildContext<'_>,
        definition: &ComponentDefinition,
        layer: &mut Layer,
    ) -> Result<(), BuildError> {
        build_guides(ctx, definition, layer)
    }

    /// Creates the skeleton from the guide world matrices, keyed by guide id.
    fn build_deform_layer(
        &self,
        ctx: &mut BuildContext<'_>,
        definition: &ComponentDefinition,
        guides: &IndexMap<String, Mat4>,
        layer: &mut Layer,
    ) -> Result<(), BuildError> {
        build_joints(ctx, definition, guides, layer)
    }

    /// Creates the controls, inputs and outputs.
    fn build_rig_layer(
        &self,
        ctx: &mut BuildContext<'_>,
        definition: &ComponentDefinition,
        layers: RigLayers<'_>,
    ) -> Result<(), BuildError>;

    /// Re-orients the guides of `definition` and returns the ids it changed.
    fn align_guides(&self, definition: &mut ComponentDefinition, include_end: bool) -> Vec<String> {
        align_chain(definition, include_end)
    }
}

/// Creates one guide node per guide, in pre-order, plus a shape node for guides
/// that have a shape.
pub fn build_guides(
    ctx: &mut BuildContext<'_>,
    definition: &ComponentDefinition,
    layer: &mut Layer,
) -> Result<(), BuildError> {
    for guide in definition.guide_layer.dag.preorder() {
        let name = ctx.node_name(rules::GUIDE, definition, &guide.id)?;
        let world = guide.transform.to_mat4();
        let parent = (!guide.is_root()).then_some(guide.parent.as_str());
        let handle = layer.add_node(ctx.scene, &guide.id, NodeKind::Guide, &name, parent, world)?;
        ctx.scene
            .set_attribute(handle, GUIDE_ID_ATTR, guide.id.as_str().into())?;
        if let Some(color) = guide.color {
            ctx.scene
                .set_attribute(handle, COLOR_ATTR, AttributeValue::Vec3(color))?;
        }
        if let Some(shape) = &guide.shape {
            ctx.scene
                .set_attribute(handle, SHAPE_ATTR, shape.as_str().into())?;
            let shape_name = ctx.node_name(rules::GUIDE_SHAPE, definition, &guide.id)?;
            layer.add_node(
                ctx.scene,
                &shape_key(&guide.id),
                NodeKind::GuideShape,
                &shape_name,
                Some(&guide.id),
                world * guide.shape_transform.to_mat4(),
            )?;
        }
    }
    Ok(())
}

/// Creates one joint per guide, placed at the guide with its scale removed.
pub fn build_joints(
    ctx: &mut BuildContext<'_>,
    definition: &ComponentDefinition,
    guides: &IndexMap<String, Mat4>,
    layer: &mut Layer,
) -> Result<(), BuildError> {
    for guide in definition.guide_layer.dag.preorder() {
        let Some(world) = guides.get(&guide.id) else {
            continue;
        };
        let name = ctx.node_name(rules::JOINT, definition, &guide.id)?;
        let parent = (!guide.is_root()).then_some(guide.parent.as_str());
        layer.add_node(ctx.scene, &guide.id, NodeKind::Joint, &name, parent, unscaled(world))?;
    }
    Ok(())
}

/// Creates one control per joint, parented like the joints, and returns their ids.
///
/// Control ids are the joint ids followed by `suffix`.
pub fn build_control_chain(
    ctx: &mut BuildContext<'_>,
    definition: &ComponentDefinition,
    deform: &Layer,
    rig: &mut Layer,
    suffix: &str,
) -> Result<Vec<String>, BuildError> {
    let mut ids = Vec::new();
    for (joint_id, joint) in deform.nodes() {
        let id = format!("{joint_id}{suffix}");
        let parent = definition
            .guide(joint_id)
            .filter(|g| !g.is_root())
            .map(|g| format!("{}{suffix}", g.parent));
        let name = ctx.node_name(rules::CONTROL, definition, &id)?;
        let world = ctx.scene.world_transform(joint.handle)?;
        rig.add_node(ctx.scene, &id, NodeKind::Control, &name, parent.as_deref(), world)?;
        ids.push(id);
    }
    Ok(ids)
}

/// Creates an output node for each listed joint.
pub fn build_outputs(
    ctx: &mut BuildContext<'_>,
    definition: &ComponentDefinition,
    deform: &Layer,
    output: &mut Layer,
    joints: &[&str],
) -> Result<(), BuildError> {
    for id in joints {
        let Some(joint) = deform.node(id) else {
            return Err(BuildError::MissingJoint {
                component: definition.key().to_string(),
                joint: id.to_string(),
            });
        };
        let name = ctx.node_name(rules::OUTPUT, definition, id)?;
        let world = ctx.scene.world_transform(joint.handle)?;
        output.add_node(ctx.scene, id, NodeKind::Output, &name, None, world)?;
    }
    Ok(())
}

/// Creates the `root` input node at `world`.
pub fn build_root_input(
    ctx: &mut BuildContext<'_>,
    definition: &ComponentDefinition,
    input: &mut Layer,
    world: Mat4,
) -> Result<(), BuildError> {
    let name = ctx.node_name(rules::INPUT, definition, "root")?;
    input.add_node(ctx.scene, "root", NodeKind::Input, &name, None, world)?;
    Ok(())
}

/// Aims every guide at its first child along the chain.
///
/// The local axes come from the guide-layer settings `primaryAxis` (default X),
/// `secondaryAxis` (default Y) and `upVector` (default world Y). A terminal guide
/// copies its parent's orientation when `include_end` is set and is left alone
/// otherwise. Guides whose aim is degenerate keep their rotation.
pub fn align_chain(definition: &mut ComponentDefinition, include_end: bool) -> Vec<String> {
    let layer = &definition.guide_layer;
    let primary = layer.vec3_setting("primaryAxis", Vec3::X);
    let secondary = layer.vec3_setting("secondaryAxis", Vec3::Y);
    let up = layer.vec3_setting("upVector", Vec3::Y);

    let mut rotations: HashMap<String, Mat3> = HashMap::new();
    let mut changes = Vec::new();
    for guide in layer.dag.preorder() {
        let target = layer.dag.children(&guide.id).first().map(|c| c.transform.translation);
        let rotation = match target {
            Some(target) => aim_rotation(
                target - guide.transform.translation,
                primary,
                secondary,
                up,
            ),
            None if include_end => rotations.get(&guide.parent).copied(),
            None => None,
        };
        match rotation {
            Some(rotation) => {
                rotations.insert(guide.id.clone(), rotation);
                changes.push((guide.id.clone(), Quaternion::from_rotation_matrix(&rotation)));
            }
            None => log::debug!("Guide '{}' keeps its orientation", guide.id),
        }
    }

    let mut aligned = Vec::with_capacity(changes.len());
    for (id, rotation) in changes {
        if let Some(guide) = definition.guide_mut(&id) {
            guide.transform.rotation = rotation;
            aligned.push(id);
        }
    }
    aligned
}

fn unscaled(world: &Mat4) -> Mat4 {
    let mut transform = Transform::from_mat4(world);
    transform.scale = Vec3::ONE;
    transform.to_mat4()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hive_data::{GuideDefinition, ROOT_GUIDE};

    fn chain() -> ComponentDefinition {
        let mut def = ComponentDefinition::new("fkchain", "tail", "M");
        let dag = &mut def.guide_layer.dag;
        dag.push(GuideDefinition::new("a", ROOT_GUIDE, Vec3::ZERO));
        dag.push(GuideDefinition::new("b", "a", Vec3::new(0.0, 0.0, 4.0)));
        dag.push(GuideDefinition::new("c", "b", Vec3::new(0.0, 0.0, 8.0)));
        def
    }

    #[test]
    fn test_align_aims_primary_axis_at_child() {
        let mut def = chain();
        let aligned = align_chain(&mut def, false);
        assert_eq!(aligned, vec!["a", "b"]);

        let a = def.guide("a").unwrap();
        let x = a.transform.rotation.rotate_vec3(Vec3::X);
        assert_relative_eq!(x.z, 1.0, epsilon = 1e-9);
        let y = a.transform.rotation.rotate_vec3(Vec3::Y);
        assert_relative_eq!(y.y, 1.0, epsilon = 1e-9);
        assert_eq!(def.guide("c").unwrap().transform.rotation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_align_end_copies_parent() {
        let mut def = chain();
        let aligned = align_chain(&mut def, true);
        assert_eq!(aligned.len(), 3);
        let b = def.guide("b").unwrap().transform.rotation;
        let c = def.guide("c").unwrap().transform.rotation;
        assert!(b.rotation_eq(c, 1e-9));
    }

    #[test]
    fn test_align_skips_guides_aiming_along_up() {
        let mut def = chain();
        def.guide_mut("b").unwrap().transform.translation = Vec3::new(0.0, 4.0, 0.0);
        let aligned = align_chain(&mut def, false);
        assert_eq!(aligned, vec!["b"]);
    }
}
