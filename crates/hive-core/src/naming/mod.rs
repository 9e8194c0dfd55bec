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

//! Token-based node naming and side symmetry.
//!
//! Every scene node the engine creates gets its name from a rule such as
//! `"{componentName}_{side}_{id}_jnt"`. Rules and the side-symmetry table live in a
//! [`NamingConfig`] so studios can ship their own conventions as a JSON preset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known rule names used by the engine.
pub mod rules {
    /// The root group of a rig.
    pub const RIG_ROOT: &str = "rigRoot";
    /// The root group of a component.
    pub const COMPONENT_ROOT: &str = "componentRoot";
    /// The root group of a layer.
    pub const LAYER_ROOT: &str = "layerRoot";
    /// A guide node.
    pub const GUIDE: &str = "guide";
    /// The shape node of a guide.
    pub const GUIDE_SHAPE: &str = "guideShape";
    /// A skeleton joint.
    pub const JOINT: &str = "joint";
    /// An animation control.
    pub const CONTROL: &str = "control";
    /// An input node.
    pub const INPUT: &str = "input";
    /// An output node.
    pub const OUTPUT: &str = "output";
    /// A space switch node.
    pub const SPACE_SWITCH: &str = "spaceSwitch";
    /// A selection set.
    pub const SELECTION_SET: &str = "selectionSet";
}

/// An error produced while resolving a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    /// No rule with this name is configured.
    UnknownRule(String),
    /// The rule references a token that was not supplied.
    MissingToken {
        /// The rule being resolved.
        rule: String,
        /// The missing token.
        token: String,
    },
    /// The rule pattern has an unterminated `{`.
    MalformedPattern(String),
    /// A naming preset could not be parsed.
    InvalidConfig(String),
}

impl fmt::Display for NamingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingError::UnknownRule(rule) => write!(f, "Unknown naming rule '{rule}'"),
            NamingError::MissingToken { rule, token } => {
                write!(f, "Naming rule '{rule}' requires token '{token}'")
            }
            NamingError::MalformedPattern(pattern) => {
                write!(f, "Malformed naming pattern '{pattern}'")
            }
            NamingError::InvalidConfig(details) => {
                write!(f, "Invalid naming configuration: {details}")
            }
        }
    }
}

impl std::error::Error for NamingError {}

/// A naming preset: rule patterns plus the side-symmetry table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingConfig {
    /// Display name of the preset.
    pub name: String,
    /// Rule name to pattern. Patterns use `{token}` placeholders.
    pub rules: BTreeMap<String, String>,
    /// Pairs of opposite sides. Lookup works in both directions.
    pub symmetry: Vec<(String, String)>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        let rules = [
            (rules::RIG_ROOT, "{rigName}_hrc"),
            (rules::COMPONENT_ROOT, "{componentName}_{side}_hrc"),
            (rules::LAYER_ROOT, "{componentName}_{side}_{layerType}_hrc"),
            (rules::GUIDE, "{componentName}_{side}_{id}_guide"),
            (rules::GUIDE_SHAPE, "{componentName}_{side}_{id}_guide_shape"),
            (rules::JOINT, "{componentName}_{side}_{id}_jnt"),
            (rules::CONTROL, "{componentName}_{side}_{id}_anim"),
            (rules::INPUT, "{componentName}_{side}_{id}_in"),
            (rules::OUTPUT, "{componentName}_{side}_{id}_out"),
            (rules::SPACE_SWITCH, "{componentName}_{side}_{id}_space"),
            (rules::SELECTION_SET, "{rigName}_{id}_set"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let symmetry = [("L", "R"), ("l", "r"), ("left", "right"), ("lf", "rt")]
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();

        Self {
            name: "default".to_string(),
            rules,
            symmetry,
        }
    }
}

/// Resolves node names from a [`NamingConfig`].
#[derive(Debug, Clone, Default)]
pub struct NamingResolver {
    config: NamingConfig,
}

impl NamingResolver {
    /// Creates a resolver for the given preset.
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    /// Loads a preset from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, NamingError> {
        let config: NamingConfig =
            serde_json::from_str(json).map_err(|e| NamingError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(config))
    }

    /// Returns the active preset.
    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Resolves `rule` by substituting every `{token}` with its value from `tokens`.
    pub fn resolve(&self, rule: &str, tokens: &[(&str, &str)]) -> Result<String, NamingError> {
        let pattern = self
            .config
            .rules
            .get(rule)
            .ok_or_else(|| NamingError::UnknownRule(rule.to_string()))?;

        let mut out = String::with_capacity(pattern.len() + 16);
        let mut rest = pattern.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after
                .find('}')
                .ok_or_else(|| NamingError::MalformedPattern(pattern.clone()))?;
            let token = &after[..end];
            let value = tokens
                .iter()
                .find(|(name, _)| *name == token)
                .map(|(_, value)| *value)
                .ok_or_else(|| NamingError::MissingToken {
                    rule: rule.to_string(),
                    token: token.to_string(),
                })?;
            out.push_str(value);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Returns the side opposite to `side`, or `None` for centre sides such as `"M"`.
    pub fn opposite_side(&self, side: &str) -> Option<&str> {
        self.config.symmetry.iter().find_map(|(a, b)| {
            if a == side {
                Some(b.as_str())
            } else if b == side {
                Some(a.as_str())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joint_name() {
        let resolver = NamingResolver::default();
        let name = resolver
            .resolve(
                rules::JOINT,
                &[("componentName", "arm"), ("side", "L"), ("id", "upr")],
            )
            .unwrap();
        assert_eq!(name, "arm_L_upr_jnt");
    }

    #[test]
    fn test_missing_token_and_unknown_rule() {
        let resolver = NamingResolver::default();
        assert_eq!(
            resolver.resolve(rules::RIG_ROOT, &[]),
            Err(NamingError::MissingToken {
                rule: "rigRoot".to_string(),
                token: "rigName".to_string()
            })
        );
        assert!(matches!(
            resolver.resolve("nope", &[]),
            Err(NamingError::UnknownRule(_))
        ));
    }

    #[test]
    fn test_opposite_side_is_symmetric() {
        let resolver = NamingResolver::default();
        assert_eq!(resolver.opposite_side("L"), Some("R"));
        assert_eq!(resolver.opposite_side("R"), Some("L"));
        assert_eq!(resolver.opposite_side("right"), Some("left"));
        assert_eq!(resolver.opposite_side("M"), None);
    }

    #[test]
    fn test_from_json_preset() {
        let json = r#"{
            "name": "studio",
            "rules": { "joint": "{side}_{componentName}_{id}_JNT" },
            "symmetry": [["Lf", "Rt"]]
        }"#;
        let resolver = NamingResolver::from_json(json).unwrap();
        let name = resolver
            .resolve("joint", &[("componentName", "leg"), ("side", "Lf"), ("id", "knee")])
            .unwrap();
        assert_eq!(name, "Lf_leg_knee_JNT");
        assert_eq!(resolver.opposite_side("Rt"), Some("Lf"));
        assert!(NamingResolver::from_json("{").is_err());
    }

    #[test]
    fn test_malformed_pattern() {
        let mut config = NamingConfig::default();
        config.rules.insert("bad".to_string(), "{open".to_string());
        let resolver = NamingResolver::new(config);
        assert!(matches!(
            resolver.resolve("bad", &[]),
            Err(NamingError::MalformedPattern(_))
        ));
    }
}
