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

//! Turns space-switch descriptors into `SpaceSwitch` nodes once a control rig exists.
//!
//! A switch node records the driven node, the controller holding the selecting
//! attribute and the resolved driver nodes. Drivers that do not resolve are dropped
//! with a warning; a switch left without drivers is not created.

use crate::component::Component;
use crate::layer::{LayerKind, LayerNode};
use crate::BuildError;
use hive_core::math::Mat4;
use hive_core::naming::rules;
use hive_core::{AttributeValue, NamingResolver, NodeKind, SceneBackend};
use hive_data::{ComponentRef, SpaceSwitchDefinition};
use indexmap::IndexMap;

/// Name of the driven node.
pub const DRIVEN_ATTR: &str = "driven";
/// Name of the node carrying the selecting attribute.
pub const CONTROLLER_ATTR: &str = "controller";
/// The selecting attribute.
pub const SWITCH_ATTR: &str = "attribute";
/// Names of the driver nodes, in enum order.
pub const DRIVERS_ATTR: &str = "drivers";
/// Labels of the drivers, in enum order.
pub const DRIVER_LABELS_ATTR: &str = "driverLabels";
/// Index of the default driver.
pub const DEFAULT_INDEX_ATTR: &str = "defaultIndex";
/// On a component's `root` input: the parent node it follows.
pub const PARENT_SPACE_ATTR: &str = "parentSpace";

const SWITCH_LOOKUP: [LayerKind; 4] = [
    LayerKind::Rig,
    LayerKind::Output,
    LayerKind::Deform,
    LayerKind::Input,
];
const PARENT_LOOKUP: [LayerKind; 3] = [LayerKind::Output, LayerKind::Deform, LayerKind::Rig];

struct ResolvedSwitch {
    label: String,
    driven: String,
    controller: String,
    attribute: String,
    labels: Vec<String>,
    drivers: Vec<String>,
    default_index: i64,
}

fn find_node<'c>(component: &'c Component, id: &str, lookup: &[LayerKind]) -> Option<&'c LayerNode> {
    lookup
        .iter()
        .filter_map(|kind| component.layer(*kind))
        .find_map(|layer| layer.node(id))
}

fn resolve_switch(
    components: &IndexMap<ComponentRef, Component>,
    component: &Component,
    switch: &SpaceSwitchDefinition,
) -> Option<ResolvedSwitch> {
    let key = component.key();
    let Some(driven) = find_node(component, &switch.driven, &SWITCH_LOOKUP) else {
        log::warn!(
            "Space switch '{}' of {}: driven node '{}' not found, skipped",
            switch.label,
            key,
            switch.driven
        );
        return None;
    };
    let Some(controller) = find_node(component, &switch.controller, &SWITCH_LOOKUP) else {
        log::warn!(
            "Space switch '{}' of {}: controller '{}' not found, skipped",
            switch.label,
            key,
            switch.controller
        );
        return None;
    };

    let mut labels = Vec::new();
    let mut drivers = Vec::new();
    let mut default_index = 0;
    for (index, driver) in switch.drivers.iter().enumerate() {
        let owner = match &driver.component {
            Some(reference) => components.get(reference),
            None => Some(component),
        };
        match owner.and_then(|c| find_node(c, &driver.node, &SWITCH_LOOKUP)) {
            Some(node) => {
                if index == switch.default_driver {
                    default_index = drivers.len() as i64;
                }
                labels.push(driver.label.clone());
                drivers.push(node.name.clone());
            }
            None => log::warn!(
                "Space switch '{}' of {}: driver '{}' ({}) did not resolve, skipped",
                switch.label,
                key,
                driver.label,
                driver.node
            ),
        }
    }
    if drivers.is_empty() {
        log::warn!(
            "Space switch '{}' of {} has no resolvable driver, skipped",
            switch.label,
            key
        );
        return None;
    }

    Some(ResolvedSwitch {
        label: switch.label.clone(),
        driven: driven.name.clone(),
        controller: controller.name.clone(),
        attribute: switch.attribute.clone(),
        labels,
        drivers,
        default_index,
    })
}

/// Wires the space switches of `key` and records the node its parent link follows.
///
/// Returns the number of switch nodes created.
pub(crate) fn wire(
    components: &mut IndexMap<ComponentRef, Component>,
    key: &ComponentRef,
    scene: &mut dyn SceneBackend,
    naming: &NamingResolver,
) -> Result<usize, BuildError> {
    let Some(component) = components.get(key) else {
        return Ok(0);
    };
    let switches: Vec<ResolvedSwitch> = component
        .definition()
        .space_switching
        .iter()
        .filter_map(|switch| resolve_switch(components, component, switch))
        .collect();
    let parent_space = component.parent().and_then(|link| {
        let parent = components.get(&link.component)?;
        find_node(parent, &link.guide, &PARENT_LOOKUP).map(|n| n.name.clone())
    });
    let (name, side) = (component.name().to_string(), component.side().to_string());

    let Some(component) = components.get_mut(key) else {
        return Ok(0);
    };
    if let Some(space) = parent_space {
        let input = component
            .layer(LayerKind::Input)
            .and_then(|l| l.handle("root"));
        if let Some(handle) = input {
            scene.set_attribute(handle, PARENT_SPACE_ATTR, space.into())?;
        }
    }
    let Some(layer) = component.layer_mut(LayerKind::Rig) else {
        return Ok(0);
    };

    let count = switches.len();
    for switch in switches {
        let node_name = naming.resolve(
            rules::SPACE_SWITCH,
            &[
                ("componentName", name.as_str()),
                ("side", side.as_str()),
                ("id", switch.label.as_str()),
            ],
        )?;
        let handle = layer.add_node(
            scene,
            &format!("space:{}", switch.label),
            NodeKind::SpaceSwitch,
            &node_name,
            None,
            Mat4::IDENTITY,
        )?;
        scene.set_attribute(handle, DRIVEN_ATTR, switch.driven.into())?;
        scene.set_attribute(handle, CONTROLLER_ATTR, switch.controller.into())?;
        scene.set_attribute(handle, SWITCH_ATTR, switch.attribute.into())?;
        scene.set_attribute(handle, DRIVERS_ATTR, AttributeValue::StringList(switch.drivers))?;
        scene.set_attribute(handle, DRIVER_LABELS_ATTR, AttributeValue::StringList(switch.labels))?;
        scene.set_attribute(handle, DEFAULT_INDEX_ATTR, AttributeValue::Int(switch.default_index))?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{BuildContext, ComponentBehavior, Transition};
    use crate::components::{FkChain, VChain};
    use crate::RigId;
    use hive_data::{ParentLink, RigConfiguration, SpaceSwitchDriver};
    use hive_infra::MemoryScene;
    use std::sync::Arc;

    fn build(
        scene: &mut MemoryScene,
        naming: &NamingResolver,
        components: &mut IndexMap<ComponentRef, Component>,
        key: &ComponentRef,
    ) {
        let configuration = RigConfiguration::default();
        let rig_root = scene.create_node(NodeKind::Group, &format!("{}_rig", key.name)).unwrap();
        let mut ctx = BuildContext {
            scene,
            naming,
            configuration: &configuration,
        };
        let component = components.get_mut(key).unwrap();
        assert_eq!(component.build_guides(&mut ctx, rig_root, false).unwrap(), Transition::Applied);
        assert_eq!(component.build_deform(&mut ctx, false).unwrap(), Transition::Applied);
        assert_eq!(component.build_rigs(&mut ctx).unwrap(), Transition::Applied);
    }

    #[test]
    fn test_switch_drops_unresolved_drivers() {
        let mut scene = MemoryScene::new();
        let naming = NamingResolver::default();
        let mut components = IndexMap::new();

        let spine = ComponentRef::new("spine", "M");
        components.insert(
            spine.clone(),
            Component::new(FkChain.default_definition("spine", "M"), Arc::new(FkChain), RigId::new(0)),
        );
        let arm = ComponentRef::new("arm", "L");
        let mut definition = VChain.default_definition("arm", "L");
        definition.parent = Some(ParentLink::new("spine", "M", "fk02"));
        definition.space_switching.push(SpaceSwitchDefinition {
            label: "ik".into(),
            driven: "endik".into(),
            controller: "endik".into(),
            attribute: "space".into(),
            default_driver: 2,
            drivers: vec![
                SpaceSwitchDriver {
                    label: "local".into(),
                    component: None,
                    node: "upr".into(),
                },
                SpaceSwitchDriver {
                    label: "ghost".into(),
                    component: Some(ComponentRef::new("ghost", "M")),
                    node: "fk00".into(),
                },
                SpaceSwitchDriver {
                    label: "chest".into(),
                    component: Some(spine.clone()),
                    node: "fk02".into(),
                },
            ],
        });
        components.insert(arm.clone(), Component::new(definition, Arc::new(VChain), RigId::new(0)));

        build(&mut scene, &naming, &mut components, &spine);
        build(&mut scene, &naming, &mut components, &arm);
        let created = wire(&mut components, &arm, &mut scene, &naming).unwrap();
        assert_eq!(created, 1);

        let node = scene.find("arm_L_ik_space").unwrap();
        assert_eq!(scene.kind(node), Some(NodeKind::SpaceSwitch));
        assert_eq!(
            scene.attribute(node, DRIVERS_ATTR).unwrap(),
            Some(AttributeValue::StringList(vec![
                "arm_L_upr_out".to_string(),
                "spine_M_fk02_anim".to_string()
            ]))
        );
        assert_eq!(
            scene.attribute(node, DEFAULT_INDEX_ATTR).unwrap(),
            Some(AttributeValue::Int(1))
        );

        let input = scene.find("arm_L_root_in").unwrap();
        assert_eq!(
            scene.attribute(input, PARENT_SPACE_ATTR).unwrap(),
            Some(AttributeValue::String("spine_M_fk02_out".to_string()))
        );
    }
}
