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

//! Guide descriptors and the guide DAG.
//!
//! In memory a [`GuideDag`] is a flat, ordered list where each guide names its
//! parent. On disk it is a nested tree: each entry carries its `children`, and the
//! top level holds the guides parented to the [`ROOT_GUIDE`] sentinel.

use crate::{DefinitionError, Settings};
use hive_core::math::{Transform, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The parent id of guides that sit directly under the component.
pub const ROOT_GUIDE: &str = "root";

fn root_parent() -> String {
    ROOT_GUIDE.to_string()
}

/// The desired placement and look of a single guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideDefinition {
    /// The guide id, unique within its component.
    pub id: String,
    /// The parent guide id, or [`ROOT_GUIDE`]. Implied by nesting on disk.
    #[serde(skip, default = "root_parent")]
    pub parent: String,
    /// The name of the guide's display shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    /// The display color as linear RGB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Vec3>,
    /// The world transform of the guide.
    #[serde(flatten)]
    pub transform: Transform,
    /// The transform of the display shape relative to the guide.
    #[serde(default)]
    pub shape_transform: Transform,
    /// Per-guide settings.
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
}

impl GuideDefinition {
    /// Creates a guide at `translation` under `parent`.
    pub fn new(id: impl Into<String>, parent: impl Into<String>, translation: Vec3) -> Self {
        Self {
            id: id.into(),
            parent: parent.into(),
            shape: None,
            color: None,
            transform: Transform::from_translation(translation),
            shape_transform: Transform::IDENTITY,
            settings: Settings::new(),
        }
    }

    /// Sets the display shape.
    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    /// Sets a per-guide setting.
    pub fn with_setting(mut self, key: &str, value: serde_json::Value) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }

    /// Returns `true` if the guide sits directly under the component.
    pub fn is_root(&self) -> bool {
        self.parent == ROOT_GUIDE
    }
}

// On-disk form of one guide and its subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GuideNode {
    #[serde(flatten)]
    guide: GuideDefinition,
    // Only written for guides whose parent could not be expressed by nesting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<GuideNode>,
}

/// The ordered guides of a component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<GuideNode>", into = "Vec<GuideNode>")]
pub struct GuideDag {
    guides: Vec<GuideDefinition>,
}

impl GuideDag {
    /// Creates an empty DAG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a DAG from a flat list, without validating it.
    pub fn from_guides(guides: Vec<GuideDefinition>) -> Self {
        Self { guides }
    }

    /// Appends a guide, without validating it.
    pub fn push(&mut self, guide: GuideDefinition) {
        self.guides.push(guide);
    }

    /// Returns the number of guides.
    pub fn len(&self) -> usize {
        self.guides.len()
    }

    /// Returns `true` if there are no guides.
    pub fn is_empty(&self) -> bool {
        self.guides.is_empty()
    }

    /// Iterates over the guides in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &GuideDefinition> {
        self.guides.iter()
    }

    /// Iterates mutably over the guides in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GuideDefinition> {
        self.guides.iter_mut()
    }

    /// Returns the guide with the given id.
    pub fn get(&self, id: &str) -> Option<&GuideDefinition> {
        self.guides.iter().find(|g| g.id == id)
    }

    /// Returns the guide with the given id, mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut GuideDefinition> {
        self.guides.iter_mut().find(|g| g.id == id)
    }

    /// Returns `true` if a guide with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Returns the ids in insertion order.
    pub fn ids(&self) -> Vec<&str> {
        self.guides.iter().map(|g| g.id.as_str()).collect()
    }

    /// Returns the direct children of `id`, in insertion order.
    pub fn children(&self, id: &str) -> Vec<&GuideDefinition> {
        self.guides.iter().filter(|g| g.parent == id).collect()
    }

    /// Returns the guides parented to the root sentinel.
    pub fn roots(&self) -> Vec<&GuideDefinition> {
        self.children(ROOT_GUIDE)
    }

    /// Removes a guide. Its children are re-parented to its parent.
    pub fn remove(&mut self, id: &str) -> Option<GuideDefinition> {
        let index = self.guides.iter().position(|g| g.id == id)?;
        let removed = self.guides.remove(index);
        for guide in self.guides.iter_mut().filter(|g| g.parent == id) {
            guide.parent = removed.parent.clone();
        }
        Some(removed)
    }

    /// Returns the guides in depth-first pre-order from the root sentinel.
    ///
    /// Guides that are not reachable from the root (dangling or cyclic) follow
    /// in insertion order.
    pub fn preorder(&self) -> Vec<&GuideDefinition> {
        let mut out = Vec::with_capacity(self.guides.len());
        let mut visited = HashSet::new();
        self.visit(ROOT_GUIDE, &mut visited, &mut out);
        for guide in &self.guides {
            if !visited.contains(guide.id.as_str()) {
                out.push(guide);
            }
        }
        out
    }

    fn visit<'a>(
        &'a self,
        parent: &str,
        visited: &mut HashSet<&'a str>,
        out: &mut Vec<&'a GuideDefinition>,
    ) {
        for guide in self.guides.iter().filter(|g| g.parent == parent) {
            if visited.insert(guide.id.as_str()) {
                out.push(guide);
                self.visit(&guide.id, visited, out);
            }
        }
    }

    /// Checks the structural invariants: ids are unique, every parent is a guide
    /// or the root sentinel, parent links are acyclic and at least one guide sits
    /// under the root.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut ids = HashSet::new();
        for guide in &self.guides {
            if guide.id == ROOT_GUIDE || !ids.insert(guide.id.as_str()) {
                return Err(DefinitionError::DuplicateGuide(guide.id.clone()));
            }
        }
        for guide in &self.guides {
            if guide.parent != ROOT_GUIDE && !ids.contains(guide.parent.as_str()) {
                return Err(DefinitionError::MissingParent {
                    guide: guide.id.clone(),
                    parent: guide.parent.clone(),
                });
            }
        }
        if self.roots().is_empty() {
            return Err(DefinitionError::NoRootGuide);
        }

        let reachable: HashSet<&str> = self.preorder_reachable();
        let cyclic: Vec<String> = self
            .guides
            .iter()
            .filter(|g| !reachable.contains(g.id.as_str()))
            .map(|g| g.id.clone())
            .collect();
        if !cyclic.is_empty() {
            return Err(DefinitionError::CyclicGuides(cyclic));
        }
        Ok(())
    }

    fn preorder_reachable(&self) -> HashSet<&str> {
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        self.visit(ROOT_GUIDE, &mut visited, &mut out);
        visited
    }
}

impl PartialEq for GuideDag {
    /// Two DAGs are equal when they hold the same guides in the same tree order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .preorder()
                .iter()
                .zip(other.preorder().iter())
                .all(|(a, b)| a == b)
    }
}

impl From<GuideDag> for Vec<GuideNode> {
    fn from(dag: GuideDag) -> Self {
        let mut by_parent: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, guide) in dag.guides.iter().enumerate() {
            by_parent.entry(guide.parent.as_str()).or_default().push(i);
        }

        fn build(
            index: usize,
            guides: &[GuideDefinition],
            by_parent: &HashMap<&str, Vec<usize>>,
            visited: &mut HashSet<usize>,
        ) -> GuideNode {
            visited.insert(index);
            let guide = guides[index].clone();
            let mut children = Vec::new();
            if let Some(child_indices) = by_parent.get(guide.id.as_str()) {
                for &child in child_indices {
                    if !visited.contains(&child) {
                        children.push(build(child, guides, by_parent, visited));
                    }
                }
            }
            GuideNode {
                guide,
                parent: None,
                children,
            }
        }

        let mut visited = HashSet::new();
        let mut nodes = Vec::new();
        if let Some(roots) = by_parent.get(ROOT_GUIDE) {
            for &root in roots {
                nodes.push(build(root, &dag.guides, &by_parent, &mut visited));
            }
        }
        // Dangling or cyclic guides keep their parent explicitly.
        for (i, guide) in dag.guides.iter().enumerate() {
            if !visited.contains(&i) {
                nodes.push(GuideNode {
                    guide: guide.clone(),
                    parent: Some(guide.parent.clone()),
                    children: Vec::new(),
                });
            }
        }
        nodes
    }
}

impl TryFrom<Vec<GuideNode>> for GuideDag {
    type Error = DefinitionError;

    fn try_from(nodes: Vec<GuideNode>) -> Result<Self, Self::Error> {
        fn flatten(node: GuideNode, parent: &str, out: &mut Vec<GuideDefinition>) {
            let mut guide = node.guide;
            guide.parent = node.parent.unwrap_or_else(|| parent.to_string());
            let id = guide.id.clone();
            out.push(guide);
            for child in node.children {
                flatten(child, &id, out);
            }
        }

        let mut guides = Vec::new();
        for node in nodes {
            flatten(node, ROOT_GUIDE, &mut guides);
        }

        let mut seen = HashSet::new();
        for guide in &guides {
            if !seen.insert(guide.id.as_str()) {
                return Err(DefinitionError::DuplicateGuide(guide.id.clone()));
            }
        }
        Ok(Self { guides })
    }
}

/// The guide layer section of a definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideLayerDefinition {
    /// The guides.
    pub dag: GuideDag,
    /// Component-level settings, such as `autoAlign`.
    pub settings: Settings,
    /// Free-form metadata.
    pub metadata: Settings,
}

impl GuideLayerDefinition {
    /// Reads a boolean setting, falling back to `default`.
    pub fn bool_setting(&self, key: &str, default: bool) -> bool {
        self.settings
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// Reads a `[x, y, z]` setting, falling back to `default`.
    pub fn vec3_setting(&self, key: &str, default: Vec3) -> Vec3 {
        self.settings
            .get(key)
            .and_then(|v| serde_json::from_value::<Vec3>(v.clone()).ok())
            .unwrap_or(default)
    }

    /// Reads a string setting.
    pub fn str_setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arm() -> GuideDag {
        GuideDag::from_guides(vec![
            GuideDefinition::new("upr", ROOT_GUIDE, Vec3::new(2.0, 14.0, 0.0)),
            GuideDefinition::new("mid", "upr", Vec3::new(5.0, 14.0, -0.5)),
            GuideDefinition::new("end", "mid", Vec3::new(8.0, 14.0, 0.0)),
        ])
    }

    #[test]
    fn test_serializes_as_nested_tree() {
        let value = serde_json::to_value(arm()).unwrap();
        assert_eq!(value[0]["id"], json!("upr"));
        assert_eq!(value[0]["children"][0]["id"], json!("mid"));
        assert_eq!(value[0]["children"][0]["children"][0]["id"], json!("end"));
        assert!(value[0].get("parent").is_none());

        let back: GuideDag = serde_json::from_value(value).unwrap();
        assert_eq!(back, arm());
        assert_eq!(back.get("end").unwrap().parent, "mid");
    }

    #[test]
    fn test_dangling_parent_survives_serialization() {
        let mut dag = arm();
        dag.push(GuideDefinition::new("lost", "ghost", Vec3::ZERO));
        let back: GuideDag = serde_json::from_value(serde_json::to_value(&dag).unwrap()).unwrap();
        assert_eq!(back.get("lost").unwrap().parent, "ghost");
        assert!(matches!(
            back.validate(),
            Err(DefinitionError::MissingParent { .. })
        ));
    }

    #[test]
    fn test_validate() {
        assert!(arm().validate().is_ok());

        let mut dup = arm();
        dup.push(GuideDefinition::new("mid", ROOT_GUIDE, Vec3::ZERO));
        assert!(matches!(dup.validate(), Err(DefinitionError::DuplicateGuide(id)) if id == "mid"));

        let cyclic = GuideDag::from_guides(vec![
            GuideDefinition::new("a", ROOT_GUIDE, Vec3::ZERO),
            GuideDefinition::new("b", "c", Vec3::ZERO),
            GuideDefinition::new("c", "b", Vec3::ZERO),
        ]);
        assert!(matches!(cyclic.validate(), Err(DefinitionError::CyclicGuides(ids)) if ids.len() == 2));

        assert!(matches!(
            GuideDag::new().validate(),
            Err(DefinitionError::NoRootGuide)
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected_on_read() {
        let doc = json!([{ "id": "a", "children": [{ "id": "a" }] }]);
        assert!(serde_json::from_value::<GuideDag>(doc).is_err());
    }

    #[test]
    fn test_remove_reparents_children() {
        let mut dag = arm();
        dag.remove("mid").unwrap();
        assert_eq!(dag.get("end").unwrap().parent, "upr");
    }
}
