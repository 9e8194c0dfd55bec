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

//! Mirroring and duplication of component sets.

use super::Rig;
use crate::component::ComponentState;
use crate::{RigError, Session};
use hive_core::math::{reflect_matrix, MirrorAxis, MirrorBehavior, Transform};
use hive_core::NamingResolver;
use hive_data::{ComponentDefinition, ComponentKey, ComponentRef, GuideDag};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

fn default_axis() -> MirrorAxis {
    MirrorAxis::X
}

fn default_duplicate() -> bool {
    true
}

/// Requests a mirror of one component and, recursively, its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorDescriptor {
    /// The source component.
    pub component: ComponentRef,
    /// The axis to mirror across.
    #[serde(default = "default_axis")]
    pub axis: MirrorAxis,
    /// The target side. Defaults to the opposite side from the naming preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    /// Create the opposite component when it does not exist yet.
    #[serde(default = "default_duplicate")]
    pub duplicate: bool,
    /// How orientations are reflected.
    #[serde(default)]
    pub behavior: MirrorBehavior,
}

impl MirrorDescriptor {
    /// Mirrors `component` across `axis` onto the opposite side, creating it if needed.
    pub fn new(component: ComponentRef, axis: MirrorAxis) -> Self {
        Self {
            component,
            axis,
            side: None,
            duplicate: true,
            behavior: MirrorBehavior::default(),
        }
    }

    /// Sets the target side explicitly.
    pub fn with_side(mut self, side: impl Into<String>) -> Self {
        self.side = Some(side.into());
        self
    }

    /// Sets the orientation behaviour.
    pub fn with_behavior(mut self, behavior: MirrorBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Only overwrites existing opposite components.
    pub fn overwrite_only(mut self) -> Self {
        self.duplicate = false;
        self
    }
}

/// What a mirror changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    /// Opposite components created by the mirror.
    pub created: Vec<ComponentRef>,
    /// Existing opposite components whose guides were overwritten.
    pub updated: Vec<ComponentRef>,
}

/// Requests a copy of one component and its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRequest {
    /// The component to copy.
    pub source: ComponentRef,
    /// A new name. Without one a numeric suffix keeps the copy unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A new side. Descendants on the source side follow it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
}

impl DuplicateRequest {
    /// Copies `source` under a generated name.
    pub fn new(source: ComponentRef) -> Self {
        Self {
            source,
            name: None,
            side: None,
        }
    }

    /// Names the copy.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Puts the copy on another side.
    pub fn with_side(mut self, side: impl Into<String>) -> Self {
        self.side = Some(side.into());
        self
    }
}

/// Reflects every guide of a DAG in world space.
///
/// Shape offsets are recomputed so that each shape lands on the reflection of its
/// original world placement.
pub fn reflect_guides(dag: &GuideDag, axis: MirrorAxis, behavior: MirrorBehavior) -> GuideDag {
    let mut mirrored = dag.clone();
    for guide in mirrored.iter_mut() {
        let world = guide.transform.to_mat4();
        let shape_world = world * guide.shape_transform.to_mat4();
        let reflected = reflect_matrix(&world, axis, behavior);
        guide.transform = Transform::from_mat4(&reflected);
        if let Some(inverse) = reflected.affine_inverse() {
            let local = inverse * reflect_matrix(&shape_world, axis, behavior);
            guide.shape_transform = Transform::from_mat4(&local);
        }
    }
    mirrored
}

struct MirrorPlan {
    source: ComponentRef,
    target: ComponentRef,
    axis: MirrorAxis,
    behavior: MirrorBehavior,
    duplicate: bool,
}

pub(crate) fn target_side(naming: &NamingResolver, descriptor: &MirrorDescriptor) -> Result<String, RigError> {
    let source = &descriptor.component;
    let side = match &descriptor.side {
        Some(side) => Some(side.clone()),
        None => naming.opposite_side(&source.side).map(str::to_string),
    };
    match side {
        Some(side) if side != source.side => Ok(side),
        other => Err(RigError::InvalidMirrorSide {
            component: source.clone(),
            side: other.unwrap_or_default(),
        }),
    }
}

impl Rig {
    /// Mirrors components across an axis.
    ///
    /// Children of each source are mirrored too: a child on the source side goes to
    /// the target side, a sided child elsewhere goes to its own opposite side, and
    /// centre children are left alone. Existing opposite components get their guide
    /// transforms overwritten; missing ones are created when the descriptor allows
    /// it and rebuilt to the source state, up to a built rig. Every source is read
    /// before anything changes.
    pub fn mirror_components(
        &mut self,
        session: &mut Session,
        descriptors: &[MirrorDescriptor],
    ) -> Result<MirrorReport, RigError> {
        let mut queue = VecDeque::new();
        for descriptor in descriptors {
            self.require(&descriptor.component)?;
            let side = target_side(&session.naming, descriptor)?;
            queue.push_back((descriptor.component.clone(), side, descriptor));
        }

        let mut seen = HashSet::new();
        let mut plans = Vec::new();
        while let Some((source, side, descriptor)) = queue.pop_front() {
            if !seen.insert(source.clone()) {
                continue;
            }
            let target = ComponentRef::new(&source.name, &side);
            if !descriptor.duplicate && !self.components.contains_key(&target) {
                return Err(RigError::MissingMirrorTarget(target));
            }
            for child in self.children(&source) {
                let child_side = if child.side == source.side {
                    Some(side.clone())
                } else {
                    session.naming.opposite_side(&child.side).map(str::to_string)
                };
                match child_side {
                    Some(child_side) => queue.push_back((child, child_side, descriptor)),
                    None => log::debug!("Not mirroring centre child {} of {}", child, source),
                }
            }
            plans.push(MirrorPlan {
                source,
                target,
                axis: descriptor.axis,
                behavior: descriptor.behavior,
                duplicate: descriptor.duplicate,
            });
        }
        let order = self.build_order();
        plans.sort_by_key(|p| order.iter().position(|r| r == &p.source));

        let mut prepared = Vec::with_capacity(plans.len());
        for plan in &plans {
            let source = self.require(&plan.source)?;
            let definition = source.serialize(session.scene.as_ref())?;
            let dag = reflect_guides(&definition.guide_layer.dag, plan.axis, plan.behavior);
            prepared.push((definition, dag, source.state()));
        }
        let mapping: HashMap<ComponentRef, ComponentRef> = plans
            .iter()
            .map(|p| (p.source.clone(), p.target.clone()))
            .collect();

        let mut report = MirrorReport::default();
        let mut raise = Vec::new();
        for (plan, (definition, dag, state)) in plans.iter().zip(prepared) {
            if let Some(target) = self.components.get_mut(&plan.target) {
                target.apply_guide_transforms(session.scene.as_mut(), &dag)?;
                report.updated.push(plan.target.clone());
                continue;
            }
            debug_assert!(plan.duplicate);
            let mut definition = definition;
            definition.side = plan.target.side.clone();
            definition.guide_layer.dag = dag;
            self.remap_links(&mut definition, &mapping, &session.naming);
            self.add_component(session, definition)?;
            report.created.push(plan.target.clone());
            raise.push((plan.target.clone(), state.min(ComponentState::RigBuilt)));
        }

        if self.configuration.auto_align_guides {
            let scene = session.scene.as_mut();
            for target in report.created.iter().chain(&report.updated) {
                let Some(component) = self.components.get_mut(target) else {
                    continue;
                };
                if component.definition().guide_layer.bool_setting("autoAlign", false) {
                    component.align_guides(scene, false)?;
                }
            }
        }
        self.raise_components(session, &raise)?;

        log::info!(
            "Rig '{}': mirrored {} component(s), created {}, updated {}",
            self.name,
            plans.len(),
            report.created.len(),
            report.updated.len()
        );
        Ok(report)
    }

    /// Points parent links and space-switch drivers of a copied definition at the
    /// copies of their targets.
    ///
    /// A parent outside the copied set is swapped for its opposite-side counterpart
    /// when one exists in the rig.
    fn remap_links(
        &self,
        definition: &mut ComponentDefinition,
        mapping: &HashMap<ComponentRef, ComponentRef>,
        naming: &NamingResolver,
    ) {
        if let Some(link) = definition.parent.as_mut() {
            if let Some(copy) = mapping.get(&link.component) {
                link.component = copy.clone();
            } else if let Some(opposite) = naming.opposite_side(&link.component.side) {
                let counterpart = ComponentRef::new(&link.component.name, opposite);
                let has_guide = self
                    .components
                    .get(&counterpart)
                    .is_some_and(|c| c.definition().guide(&link.guide).is_some());
                if has_guide {
                    link.component = counterpart;
                }
            }
        }
        for driver in definition
            .space_switching
            .iter_mut()
            .flat_map(|s| s.drivers.iter_mut())
        {
            if let Some(copy) = driver.component.as_ref().and_then(|c| mapping.get(c)) {
                driver.component = Some(copy.clone());
            }
        }
    }

    /// Copies components together with their descendants.
    ///
    /// Copies are rebuilt to the state of their source, up to a built rig. An
    /// explicit name or side that is already taken fails before anything changes;
    /// other collisions get a numeric suffix. Returns source and copy pairs in
    /// build order.
    pub fn duplicate_components(
        &mut self,
        session: &mut Session,
        requests: &[DuplicateRequest],
    ) -> Result<Vec<(ComponentRef, ComponentRef)>, RigError> {
        let mut requested = HashMap::new();
        let mut members = HashSet::new();
        for request in requests {
            self.require(&request.source)?;
            if let Some(name) = &request.name {
                Self::validate_name(name)?;
            }
            requested.insert(request.source.clone(), request);
            members.insert(request.source.clone());
            members.extend(self.descendants(&request.source));
        }

        let mut taken: HashSet<ComponentRef> = self.components.keys().cloned().collect();
        let mut mapping: Vec<(ComponentRef, ComponentRef)> = Vec::new();
        for source in self.build_order().into_iter().filter(|r| members.contains(r)) {
            let (name, side, explicit) = match requested.get(&source) {
                Some(request) => (
                    request.name.clone().unwrap_or_else(|| source.name.clone()),
                    request.side.clone().unwrap_or_else(|| source.side.clone()),
                    request.name.is_some() || request.side.is_some(),
                ),
                None => (source.name.clone(), self.inherited_side(&source, &mapping), false),
            };

            let mut target = ComponentRef::new(&name, &side);
            if taken.contains(&target) {
                if explicit {
                    let component_type = self.require(&source)?.component_type();
                    return Err(RigError::DuplicateComponent(ComponentKey::new(
                        component_type,
                        &name,
                        &side,
                    )));
                }
                let mut suffix = 1;
                while taken.contains(&target) {
                    target = ComponentRef::new(format!("{name}{suffix}"), &side);
                    suffix += 1;
                }
            }
            taken.insert(target.clone());
            mapping.push((source, target));
        }

        let lookup: HashMap<ComponentRef, ComponentRef> = mapping.iter().cloned().collect();
        let mut raise = Vec::with_capacity(mapping.len());
        for (source, target) in &mapping {
            let component = self.require(source)?;
            let state = component.state().min(ComponentState::RigBuilt);
            let mut definition = component.serialize(session.scene.as_ref())?;
            definition.name = target.name.clone();
            definition.side = target.side.clone();
            if let Some(link) = definition.parent.as_mut() {
                if let Some(copy) = lookup.get(&link.component) {
                    link.component = copy.clone();
                }
            }
            for driver in definition
                .space_switching
                .iter_mut()
                .flat_map(|s| s.drivers.iter_mut())
            {
                if let Some(copy) = driver.component.as_ref().and_then(|c| lookup.get(c)) {
                    driver.component = Some(copy.clone());
                }
            }
            self.add_component(session, definition)?;
            raise.push((target.clone(), state));
        }
        self.raise_components(session, &raise)?;

        log::info!(
            "Rig '{}': duplicated {} component(s)",
            self.name,
            mapping.len()
        );
        Ok(mapping)
    }

    /// The side a descendant copy takes: a child on its parent's source side follows
    /// the parent's new side.
    fn inherited_side(
        &self,
        source: &ComponentRef,
        mapping: &[(ComponentRef, ComponentRef)],
    ) -> String {
        let parent = self.components.get(source).and_then(|c| c.parent());
        let copied_parent = parent.and_then(|link| {
            mapping
                .iter()
                .find(|(from, _)| from == &link.component)
        });
        match copied_parent {
            Some((from, to)) if from.side != to.side && source.side == from.side => to.side.clone(),
            _ => source.side.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use hive_core::math::{Quaternion, Vec3, FRAC_PI_4};
    use hive_data::{GuideDefinition, ROOT_GUIDE};

    #[test]
    fn test_reflect_guides_negates_translation_and_keeps_shapes_attached() {
        let mut guide = GuideDefinition::new("base", ROOT_GUIDE, Vec3::new(2.0, 1.0, 0.5));
        guide.transform.rotation = Quaternion::from_axis_angle(Vec3::Z, FRAC_PI_4);
        guide.shape_transform = Transform::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let dag = GuideDag::from_guides(vec![guide]);

        let mirrored = reflect_guides(&dag, MirrorAxis::X, MirrorBehavior::Behavior);
        let base = mirrored.get("base").unwrap();
        assert_abs_diff_eq!(base.transform.translation.x, -2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(base.transform.translation.y, 1.0, epsilon = 1e-9);

        let original_shape = (dag.get("base").unwrap().transform.to_mat4()
            * dag.get("base").unwrap().shape_transform.to_mat4())
        .translation();
        let mirrored_shape = (base.transform.to_mat4() * base.shape_transform.to_mat4()).translation();
        assert_abs_diff_eq!(mirrored_shape.x, -original_shape.x, epsilon = 1e-9);
        assert_abs_diff_eq!(mirrored_shape.y, original_shape.y, epsilon = 1e-9);
        assert_abs_diff_eq!(mirrored_shape.z, original_shape.z, epsilon = 1e-9);
    }

    #[test]
    fn test_reflect_guides_twice_is_identity() {
        let mut guide = GuideDefinition::new("base", ROOT_GUIDE, Vec3::new(3.0, -1.0, 2.0));
        guide.transform.rotation = Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.7);
        guide.shape_transform = Transform::from_translation(Vec3::new(0.5, 0.0, 0.25));
        let dag = GuideDag::from_guides(vec![guide]);

        for behavior in [MirrorBehavior::Behavior, MirrorBehavior::Orientation] {
            let twice = reflect_guides(
                &reflect_guides(&dag, MirrorAxis::X, behavior),
                MirrorAxis::X,
                behavior,
            );
            let (a, b) = (dag.get("base").unwrap(), twice.get("base").unwrap());
            assert!(a.transform.abs_diff_eq(&b.transform, 1e-6));
            assert!(a.shape_transform.abs_diff_eq(&b.shape_transform, 1e-6));
        }
    }

    #[test]
    fn test_descriptor_defaults_from_json() {
        let descriptor: MirrorDescriptor =
            serde_json::from_str(r#"{ "component": { "name": "arm", "side": "L" } }"#).unwrap();
        assert_eq!(descriptor.axis, MirrorAxis::X);
        assert!(descriptor.duplicate);
        assert_eq!(descriptor.side, None);
        assert_eq!(descriptor.behavior, MirrorBehavior::Behavior);
    }

    #[test]
    fn test_target_side_needs_an_opposite() {
        let naming = NamingResolver::default();
        let centre = MirrorDescriptor::new(ComponentRef::new("spine", "M"), MirrorAxis::X);
        assert!(matches!(
            target_side(&naming, &centre),
            Err(RigError::InvalidMirrorSide { .. })
        ));
        let left = MirrorDescriptor::new(ComponentRef::new("arm", "L"), MirrorAxis::X);
        assert_eq!(target_side(&naming, &left).unwrap(), "R");
        let same = left.clone().with_side("L");
        assert!(target_side(&naming, &same).is_err());
    }
}
