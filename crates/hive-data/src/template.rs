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

//! Template documents: portable snapshots of component definitions.

use crate::{ComponentDefinition, ComponentKey, ComponentRef, DefinitionError, RigConfiguration};
use hive_core::graph::topological_sort;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The current template document format.
pub const TEMPLATE_FORMAT_VERSION: u32 = 1;

fn format_version() -> u32 {
    TEMPLATE_FORMAT_VERSION
}

/// A named set of component definitions with their relative parenting.
///
/// A template never references scene nodes. Parent links only point at components
/// inside the same document, so the template can be loaded into any rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    /// The template name.
    pub name: String,
    /// The document format version.
    #[serde(default = "format_version")]
    pub version: u32,
    /// The rig configuration captured with the components.
    #[serde(default)]
    pub configuration: RigConfiguration,
    /// The component definitions, parents before children.
    #[serde(default)]
    pub components: Vec<ComponentDefinition>,
}

impl TemplateDocument {
    /// Creates an empty template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: TEMPLATE_FORMAT_VERSION,
            configuration: RigConfiguration::default(),
            components: Vec::new(),
        }
    }

    /// Builds a template from a set of definitions.
    ///
    /// Parent links that point outside the set are dropped, which makes the
    /// captured components roots of the template.
    pub fn from_components(
        name: impl Into<String>,
        configuration: RigConfiguration,
        mut components: Vec<ComponentDefinition>,
    ) -> Self {
        let members: HashSet<ComponentRef> = components
            .iter()
            .map(|c| ComponentRef::new(&c.name, &c.side))
            .collect();
        for component in &mut components {
            let outside = component
                .parent
                .as_ref()
                .is_some_and(|link| !members.contains(&link.component));
            if outside {
                log::debug!(
                    "Dropping parent link of {} that points outside the template",
                    component.key()
                );
                component.parent = None;
            }
        }
        Self {
            name: name.into(),
            version: TEMPLATE_FORMAT_VERSION,
            configuration,
            components,
        }
    }

    /// Returns the first component with the given name and side.
    pub fn component(&self, name: &str, side: &str) -> Option<&ComponentDefinition> {
        self.components
            .iter()
            .find(|c| c.name == name && c.side == side)
    }

    /// Returns the component keys in document order.
    pub fn keys(&self) -> Vec<ComponentKey> {
        self.components.iter().map(|c| c.key()).collect()
    }

    /// Checks every definition, key uniqueness and that parent links stay inside
    /// the document without forming a cycle.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut keys = HashSet::new();
        for component in &self.components {
            component.validate()?;
            if !keys.insert(component.key()) {
                return Err(DefinitionError::DuplicateComponent(component.key()));
            }
        }

        let mut edges = Vec::new();
        for (child, component) in self.components.iter().enumerate() {
            let Some(link) = &component.parent else {
                continue;
            };
            let parent = self
                .components
                .iter()
                .position(|c| c.name == link.component.name && c.side == link.component.side)
                .ok_or_else(|| DefinitionError::InvalidComponent {
                    component: component.key().to_string(),
                    reason: format!("parent {} is not part of the template", link.component),
                })?;
            let parent_def = &self.components[parent];
            if !parent_def.guide_layer.dag.contains(&link.guide) {
                return Err(DefinitionError::InvalidComponent {
                    component: component.key().to_string(),
                    reason: format!(
                        "parent guide '{}' does not exist on {}",
                        link.guide,
                        parent_def.key()
                    ),
                });
            }
            edges.push((parent, child));
        }
        topological_sort(0..self.components.len(), edges)
            .map(|_| ())
            .map_err(|_| DefinitionError::CyclicComponents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GuideDefinition, ParentLink, ROOT_GUIDE};
    use hive_core::math::Vec3;

    fn component(name: &str, side: &str, parent: Option<ParentLink>) -> ComponentDefinition {
        let mut def = ComponentDefinition::new("fkchain", name, side);
        def.guide_layer
            .dag
            .push(GuideDefinition::new("base", ROOT_GUIDE, Vec3::ZERO));
        def.parent = parent;
        def
    }

    #[test]
    fn test_links_outside_the_set_are_dropped() {
        let doc = TemplateDocument::from_components(
            "arm",
            RigConfiguration::default(),
            vec![
                component("clavicle", "L", Some(ParentLink::new("spine", "M", "base"))),
                component("arm", "L", Some(ParentLink::new("clavicle", "L", "base"))),
            ],
        );
        assert!(doc.component("clavicle", "L").unwrap().parent.is_none());
        assert!(doc.component("arm", "L").unwrap().parent.is_some());
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_duplicate_components_rejected() {
        let mut doc = TemplateDocument::new("dup");
        doc.components.push(component("arm", "L", None));
        doc.components.push(component("arm", "L", None));
        assert!(matches!(
            doc.validate(),
            Err(DefinitionError::DuplicateComponent(_))
        ));
    }

    #[test]
    fn test_cyclic_components_rejected() {
        let mut doc = TemplateDocument::new("cycle");
        doc.components
            .push(component("a", "M", Some(ParentLink::new("b", "M", "base"))));
        doc.components
            .push(component("b", "M", Some(ParentLink::new("a", "M", "base"))));
        assert!(matches!(
            doc.validate(),
            Err(DefinitionError::CyclicComponents)
        ));
    }
}
