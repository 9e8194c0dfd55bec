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

use hive_core::math::Mat4;
use hive_core::{AttributeValue, NodeKind};
use std::collections::{BTreeMap, BTreeSet};

/// The state of one node, keyed by its name path rather than its handle.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    /// The `|`-separated name path from the scene root.
    pub path: String,
    /// The node kind.
    pub kind: NodeKind,
    /// The world matrix.
    pub world: Mat4,
    /// All attributes, sorted by name.
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// A handle-independent capture of a whole scene.
///
/// Two snapshots compare equal when the scenes hold the same node paths with the
/// same kinds, bit-identical world matrices and equal attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneSnapshot {
    nodes: Vec<NodeSnapshot>,
}

impl SceneSnapshot {
    pub(crate) fn new(mut nodes: Vec<NodeSnapshot>) -> Self {
        nodes.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
                .then_with(|| {
                    a.world
                        .to_cols_array()
                        .partial_cmp(&b.world.to_cols_array())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });
        Self { nodes }
    }

    /// Returns the captured nodes, sorted by path.
    pub fn nodes(&self) -> &[NodeSnapshot] {
        &self.nodes
    }

    /// Returns the number of captured nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the snapshot holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the first node captured at `path`.
    pub fn get(&self, path: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.path == path)
    }

    /// Describes every difference between `self` (before) and `other` (after).
    ///
    /// An empty result means the scenes are identical.
    pub fn diff(&self, other: &SceneSnapshot) -> Vec<String> {
        let before = group(&self.nodes);
        let after = group(&other.nodes);
        let paths: BTreeSet<&str> = before.keys().chain(after.keys()).copied().collect();

        let mut out = Vec::new();
        for path in paths {
            let old = before.get(path).map(Vec::as_slice).unwrap_or_default();
            let new = after.get(path).map(Vec::as_slice).unwrap_or_default();
            for i in 0..old.len().max(new.len()) {
                match (old.get(i), new.get(i)) {
                    (Some(_), None) => out.push(format!("removed {path}")),
                    (None, Some(_)) => out.push(format!("added {path}")),
                    (Some(a), Some(b)) => describe_changes(a, b, &mut out),
                    (None, None) => {}
                }
            }
        }
        out
    }
}

fn group(nodes: &[NodeSnapshot]) -> BTreeMap<&str, Vec<&NodeSnapshot>> {
    let mut map: BTreeMap<&str, Vec<&NodeSnapshot>> = BTreeMap::new();
    for node in nodes {
        map.entry(node.path.as_str()).or_default().push(node);
    }
    map
}

fn describe_changes(a: &NodeSnapshot, b: &NodeSnapshot, out: &mut Vec<String>) {
    if a.kind != b.kind {
        out.push(format!("{}: kind {} -> {}", a.path, a.kind, b.kind));
    }
    if a.world != b.world {
        out.push(format!(
            "{}: world {:?} -> {:?}",
            a.path,
            a.world.to_cols_array(),
            b.world.to_cols_array()
        ));
    }
    let names: BTreeSet<&String> = a.attributes.keys().chain(b.attributes.keys()).collect();
    for name in names {
        let old = a.attributes.get(name);
        let new = b.attributes.get(name);
        if old != new {
            out.push(format!("{}.{}: {:?} -> {:?}", a.path, name, old, new));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::MemoryScene;
    use hive_core::math::{Mat4, Vec3};
    use hive_core::{AttributeValue, NodeKind, SceneBackend};

    #[test]
    fn test_snapshot_ignores_handle_values() {
        let mut first = MemoryScene::new();
        let mut second = MemoryScene::new();

        // Same scene, built in a different slot order.
        let _spare = second.create_node(NodeKind::Group, "spare").unwrap();
        for scene in [&mut first, &mut second] {
            let root = scene.create_node(NodeKind::Group, "rig_hrc").unwrap();
            let joint = scene.create_node(NodeKind::Joint, "arm_L_upr_jnt").unwrap();
            scene.set_parent(joint, Some(root)).unwrap();
        }
        let spare = second.find("spare").unwrap();
        second.delete_node(spare).unwrap();

        assert!(first.snapshot().diff(&second.snapshot()).is_empty());
        assert_eq!(first.snapshot(), second.snapshot());
    }

    #[test]
    fn test_diff_reports_changes() {
        let mut scene = MemoryScene::new();
        let a = scene.create_node(NodeKind::Guide, "a").unwrap();
        let before = scene.snapshot();

        scene
            .set_world_transform(a, Mat4::from_translation(Vec3::X))
            .unwrap();
        scene
            .set_attribute(a, "hivePinned", AttributeValue::Bool(true))
            .unwrap();
        scene.create_node(NodeKind::Guide, "b").unwrap();

        let diff = before.diff(&scene.snapshot());
        assert_eq!(diff.len(), 3);
        assert!(diff.iter().any(|d| d == "added b"));
        assert!(diff.iter().any(|d| d.starts_with("a: world")));
        assert!(diff.iter().any(|d| d.starts_with("a.hivePinned")));
    }
}
