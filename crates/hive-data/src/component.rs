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

//! The component definition document.

use crate::{
    merge_with_defaults, ComponentKey, ComponentRef, DefinitionError, GuideDefinition,
    GuideLayerDefinition, LayerDefinition, MergeReport, SpaceSwitchDefinition,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn first_version() -> u32 {
    1
}

/// The parent of a component: a guide of another component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentLink {
    /// The parent component.
    pub component: ComponentRef,
    /// The id of the guide on the parent component.
    pub guide: String,
}

impl ParentLink {
    /// Creates a link to `guide` on the component `name:side`.
    pub fn new(name: impl Into<String>, side: impl Into<String>, guide: impl Into<String>) -> Self {
        Self {
            component: ComponentRef::new(name, side),
            guide: guide.into(),
        }
    }
}

/// Descriptive information about a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoDefinition {
    /// A human-readable description.
    pub description: String,
    /// The version of the behaviour that wrote the definition.
    pub version: String,
}

/// The declarative description of one component.
///
/// Field names on disk are camelCase: `guideLayer`, `deformLayer`, `rigLayer`,
/// `inputLayer`, `outputLayer`, `spaceSwitch` and `info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinition {
    /// The component name.
    pub name: String,
    /// The side label.
    pub side: String,
    /// The behaviour type name.
    #[serde(rename = "type")]
    pub component_type: String,
    /// The definition schema version.
    #[serde(default = "first_version")]
    pub version: u32,
    /// The parent component and guide, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink>,
    /// Guides and component-level settings.
    #[serde(default)]
    pub guide_layer: GuideLayerDefinition,
    /// The skeleton.
    #[serde(default)]
    pub deform_layer: LayerDefinition,
    /// The control rig.
    #[serde(default)]
    pub rig_layer: LayerDefinition,
    /// Input nodes.
    #[serde(default)]
    pub input_layer: LayerDefinition,
    /// Output nodes.
    #[serde(default)]
    pub output_layer: LayerDefinition,
    /// Space switches wired at rig build.
    #[serde(default, rename = "spaceSwitch")]
    pub space_switching: Vec<SpaceSwitchDefinition>,
    /// Descriptive information.
    #[serde(default)]
    pub info: InfoDefinition,
}

impl ComponentDefinition {
    /// Creates an empty definition.
    pub fn new(
        component_type: impl Into<String>,
        name: impl Into<String>,
        side: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            side: side.into(),
            component_type: component_type.into(),
            version: first_version(),
            parent: None,
            guide_layer: GuideLayerDefinition::default(),
            deform_layer: LayerDefinition::default(),
            rig_layer: LayerDefinition::default(),
            input_layer: LayerDefinition::default(),
            output_layer: LayerDefinition::default(),
            space_switching: Vec::new(),
            info: InfoDefinition::default(),
        }
    }

    /// Returns the identity triple.
    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(&self.component_type, &self.name, &self.side)
    }

    /// Returns the guide with the given id.
    pub fn guide(&self, id: &str) -> Option<&GuideDefinition> {
        self.guide_layer.dag.get(id)
    }

    /// Returns the guide with the given id, mutably.
    pub fn guide_mut(&mut self, id: &str) -> Option<&mut GuideDefinition> {
        self.guide_layer.dag.get_mut(id)
    }

    /// Checks the definition invariants.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let invalid = |reason: &str| DefinitionError::InvalidComponent {
            component: self.key().to_string(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("the name is empty"));
        }
        if self.side.trim().is_empty() {
            return Err(invalid("the side is empty"));
        }
        if self.component_type.trim().is_empty() {
            return Err(invalid("the type is empty"));
        }
        if let Some(parent) = &self.parent {
            if parent.guide.is_empty() {
                return Err(invalid("the parent link names no guide"));
            }
        }
        self.guide_layer.dag.validate()?;
        for switch in &self.space_switching {
            switch.validate()?;
        }
        Ok(())
    }

    /// Parses a definition document.
    pub fn from_value(value: Value) -> Result<Self, DefinitionError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Converts the definition to its document form.
    pub fn to_value(&self) -> Result<Value, DefinitionError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parses a stored document after merging in every key it lacks from `defaults`.
    ///
    /// Values the stored document defines are never replaced. Keys whose type changed
    /// are kept as stored and listed in the returned report; if such a value no longer
    /// fits the typed model, parsing fails with [`DefinitionError::Corrupted`].
    pub fn upgrade(
        stored: &Value,
        defaults: &ComponentDefinition,
    ) -> Result<(Self, MergeReport), DefinitionError> {
        let (merged, report) = merge_with_defaults(stored, &defaults.to_value()?);
        if !report.added.is_empty() {
            log::debug!(
                "Upgraded definition with {} default key(s): {:?}",
                report.added.len(),
                report.added
            );
        }
        Ok((Self::from_value(merged)?, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ROOT_GUIDE;
    use hive_core::math::Vec3;
    use serde_json::json;

    fn arm() -> ComponentDefinition {
        let mut def = ComponentDefinition::new("vchaincomponent", "arm", "L");
        for (id, parent, x) in [("upr", ROOT_GUIDE, 2.0), ("mid", "upr", 5.0), ("end", "mid", 8.0)] {
            def.guide_layer
                .dag
                .push(GuideDefinition::new(id, parent, Vec3::new(x, 14.0, 0.0)));
        }
        def.guide_layer
            .settings
            .insert("autoAlign".into(), json!(true));
        def
    }

    #[test]
    fn test_document_round_trip() {
        let def = arm();
        let value = def.to_value().unwrap();
        assert_eq!(value["type"], json!("vchaincomponent"));
        assert!(value["guideLayer"]["dag"].is_array());
        assert!(value.get("spaceSwitch").is_some());
        let back = ComponentDefinition::from_value(value).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn test_upgrade_adds_new_settings_only() {
        let stored = json!({
            "name": "arm",
            "side": "L",
            "type": "vchaincomponent",
            "guideLayer": { "settings": { "autoAlign": false } }
        });
        let mut defaults = arm();
        defaults
            .guide_layer
            .settings
            .insert("primaryAxis".into(), json!([1.0, 0.0, 0.0]));

        let (def, report) = ComponentDefinition::upgrade(&stored, &defaults).unwrap();
        assert!(!def.guide_layer.bool_setting("autoAlign", true));
        assert!(def.guide_layer.settings.contains_key("primaryAxis"));
        // The stored document had no dag, so the default guides were merged in.
        assert_eq!(def.guide_layer.dag.len(), 3);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_upgrade_fills_guides_by_id() {
        // ARRANGE
        let mut stored = arm().to_value().unwrap();
        stored["guideLayer"]["dag"][0]["children"][0]["children"] = json!([]);
        let mut defaults = arm();
        defaults.guide_layer.dag.push(GuideDefinition::new("tip", "end", Vec3::ZERO));
        if let Some(mid) = defaults.guide_mut("mid") {
            mid.shape = Some("circle".into());
            mid.settings.insert("twist".into(), json!(0.5));
        }

        // ACT
        let (def, report) = ComponentDefinition::upgrade(&stored, &defaults).unwrap();

        // ASSERT
        let mid = def.guide("mid").unwrap();
        assert_eq!(mid.shape.as_deref(), Some("circle"));
        assert_eq!(mid.settings["twist"], json!(0.5));
        assert!(def.guide("end").is_none());
        assert!(def.guide("tip").is_none());
        assert_eq!(def.guide_layer.dag.len(), 2);
        assert_eq!(
            report.added,
            vec![
                "guideLayer.dag[upr].children[mid].shape",
                "guideLayer.dag[upr].children[mid].settings",
            ]
        );
    }

    #[test]
    fn test_upgrade_with_incompatible_type_is_corrupted() {
        let stored = json!({ "name": "arm", "side": "L", "type": "fkchain", "version": "two" });
        let result = ComponentDefinition::upgrade(&stored, &arm());
        assert!(matches!(result, Err(DefinitionError::Corrupted(_))));
    }

    #[test]
    fn test_validate_rejects_empty_side() {
        let mut def = arm();
        assert!(def.validate().is_ok());
        def.side = String::new();
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::InvalidComponent { .. })
        ));
    }
}
