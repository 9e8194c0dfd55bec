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

use hive_core::math::Vec3;
use hive_data::{
    ComponentDefinition, GuideDefinition, ParentLink, RigConfiguration, TemplateDocument,
    ROOT_GUIDE,
};
use hive_io::{read_definition, write_definition, TemplateError, TemplateRegistry};
use serde_json::json;
use std::fs;

fn chain(name: &str, side: &str, parent: Option<ParentLink>) -> ComponentDefinition {
    let mut def = ComponentDefinition::new("fkchain", name, side);
    def.guide_layer
        .dag
        .push(GuideDefinition::new("base", ROOT_GUIDE, Vec3::new(0.0, 10.0, 0.0)));
    def.guide_layer
        .dag
        .push(GuideDefinition::new("tip", "base", Vec3::new(0.0, 12.0, 0.0)));
    def.parent = parent;
    def
}

fn biped() -> TemplateDocument {
    TemplateDocument::from_components(
        "biped",
        RigConfiguration::default(),
        vec![
            chain("spine", "M", None),
            chain("neck", "M", Some(ParentLink::new("spine", "M", "tip"))),
        ],
    )
}

#[test]
fn test_save_twice_requires_overwrite() {
    // --- 1. ARRANGE ---
    let dir = tempfile::tempdir().unwrap();
    let registry = TemplateRegistry::new(dir.path().join("templates"));
    let doc = biped();

    // --- 2. ACT ---
    registry.save("biped", &doc, false).unwrap();
    let second = registry.save("biped", &doc, false);
    let forced = registry.save("biped", &doc, true);

    // --- 3. ASSERT ---
    assert!(matches!(second, Err(TemplateError::AlreadyExists(name)) if name == "biped"));
    assert!(forced.is_ok());
    assert!(registry.exists("biped"));
    assert_eq!(registry.names().unwrap(), vec!["biped"]);
    assert_eq!(registry.load("biped").unwrap(), doc);
}

#[test]
fn test_delete_and_missing_templates() {
    let dir = tempfile::tempdir().unwrap();
    let registry = TemplateRegistry::new(dir.path());

    assert!(matches!(
        registry.delete("ghost"),
        Err(TemplateError::NotFound(_))
    ));
    assert!(matches!(registry.load("ghost"), Err(TemplateError::NotFound(_))));
    assert!(registry.names().unwrap().is_empty());

    registry.save("quad", &biped(), false).unwrap();
    registry.delete("quad").unwrap();
    assert!(!registry.exists("quad"));
}

#[test]
fn test_saved_name_follows_the_key() {
    let dir = tempfile::tempdir().unwrap();
    let registry = TemplateRegistry::new(dir.path());
    let path = registry.save("biped_v2", &biped(), false).unwrap();
    let loaded = TemplateRegistry::load_file(&path).unwrap();
    assert_eq!(loaded.name, "biped_v2");
}

#[test]
fn test_corrupted_and_invalid_files() {
    let dir = tempfile::tempdir().unwrap();
    let registry = TemplateRegistry::new(dir.path());

    fs::write(registry.path_of("broken").unwrap(), "{ not json").unwrap();
    assert!(matches!(
        registry.load("broken"),
        Err(TemplateError::Corrupted { .. })
    ));

    let mut doc = biped();
    doc.components.push(chain("spine", "M", None));
    let text = serde_json::to_string(&doc).unwrap();
    fs::write(registry.path_of("dupes").unwrap(), text).unwrap();
    assert!(matches!(
        registry.load("dupes"),
        Err(TemplateError::Invalid { .. })
    ));
}

#[test]
fn test_definition_file_upgrade_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("defs").join("spine.json");
    let stored = chain("spine", "M", None);
    write_definition(&path, &stored).unwrap();

    let mut defaults = chain("spine", "M", None);
    defaults
        .guide_layer
        .settings
        .insert("jointCount".into(), json!(4));

    let (plain, report) = read_definition(&path, None).unwrap();
    assert_eq!(plain, stored);
    assert!(report.is_clean());

    let (upgraded, report) = read_definition(&path, Some(&defaults)).unwrap();
    assert_eq!(upgraded.guide_layer.settings["jointCount"], json!(4));
    assert_eq!(report.added, vec!["guideLayer.settings.jointCount"]);
}
