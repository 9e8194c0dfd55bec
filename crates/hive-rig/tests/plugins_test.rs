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

use hive_core::{AttributeValue, SceneBackend};
use hive_data::{ComponentRef, Settings};
use hive_infra::MemoryScene;
use hive_io::TemplateRegistry;
use hive_rig::rig::{BLACK_BOX_ATTR, MEMBERS_ATTR};
use hive_rig::{
    BuildError, BuildScript, ComponentState, DefinitionExporter, ExportError, Exporter, Hive,
    Rig, RigError, ScriptContext, Session,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn memory(hive: &Hive) -> &MemoryScene {
    hive.scene().as_any().downcast_ref::<MemoryScene>().unwrap()
}

/// Records every hook it sees and counts calls in its properties.
struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn record(&self, hook: &str, properties: &mut Settings) {
        self.calls.lock().unwrap().push(hook.to_string());
        let count = properties.get("calls").and_then(Value::as_u64).unwrap_or(0);
        properties.insert("calls".into(), json!(count + 1));
    }
}

impl BuildScript for Recorder {
    fn id(&self) -> &str {
        "recorder"
    }

    fn default_properties(&self) -> Settings {
        let mut properties = Settings::new();
        properties.insert("calls".into(), json!(0));
        properties
    }

    fn pre_guide_build(&self, _: &mut ScriptContext<'_>, p: &mut Settings) -> Result<(), BuildError> {
        self.record("preGuideBuild", p);
        Ok(())
    }

    fn pre_deform_build(&self, _: &mut ScriptContext<'_>, p: &mut Settings) -> Result<(), BuildError> {
        self.record("preDeformBuild", p);
        Ok(())
    }

    fn pre_rig_build(&self, _: &mut ScriptContext<'_>, p: &mut Settings) -> Result<(), BuildError> {
        self.record("preRigBuild", p);
        Ok(())
    }

    fn post_rig_build(&self, ctx: &mut ScriptContext<'_>, p: &mut Settings) -> Result<(), BuildError> {
        self.record("postRigBuild", p);
        let built = ctx
            .rig
            .components()
            .filter(|c| c.state() == ComponentState::RigBuilt)
            .count();
        p.insert("rigged".into(), json!(built));
        Ok(())
    }

    fn pre_polish(&self, _: &mut ScriptContext<'_>, p: &mut Settings) -> Result<(), BuildError> {
        self.record("prePolish", p);
        Ok(())
    }

    fn post_polish_build(
        &self,
        _: &mut ScriptContext<'_>,
        p: &mut Settings,
    ) -> Result<(), BuildError> {
        self.record("postPolishBuild", p);
        Ok(())
    }
}

/// Refuses to let a rig be polished.
struct Gatekeeper;

impl BuildScript for Gatekeeper {
    fn id(&self) -> &str {
        "gatekeeper"
    }

    fn pre_polish(&self, _: &mut ScriptContext<'_>, _: &mut Settings) -> Result<(), BuildError> {
        Err(BuildError::Behavior {
            component: "rig".to_string(),
            reason: "not signed off".to_string(),
        })
    }
}

/// Counts components; fails when asked to.
struct Counter;

impl Exporter for Counter {
    fn id(&self) -> &str {
        "counter"
    }

    fn export_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("fail".into(), json!(false));
        settings
    }

    fn execute(
        &self,
        rig: &Rig,
        _scene: &dyn SceneBackend,
        settings: &Settings,
        progress: &mut dyn FnMut(u32, &str),
    ) -> Result<(), ExportError> {
        if settings.get("fail").and_then(Value::as_bool).unwrap_or(false) {
            return Err(ExportError::InvalidSetting("fail".to_string()));
        }
        progress(100, &format!("{} component(s)", rig.len()));
        Ok(())
    }
}

#[test]
fn test_build_scripts_run_in_phase_order() {
    // --- 1. ARRANGE ---
    let calls = Arc::new(Mutex::new(Vec::new()));
    let session = Session::builder(MemoryScene::new())
        .with_build_script(Recorder {
            calls: Arc::clone(&calls),
        })
        .build();
    let mut hive = Hive::new(session);
    let id = hive.create_rig("scripted").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.configuration_mut().build_scripts.push("recorder".to_string());
        rig.configuration_mut().build_scripts.push("unregistered".to_string());
        rig.create_component(session, "fkchain", "tail", "M")
    })
    .unwrap();

    // --- 2. ACT ---
    hive.with_rig(id, |rig, session| rig.polish(session, None))
        .unwrap();

    // --- 3. ASSERT ---
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "preGuideBuild",
            "preDeformBuild",
            "preRigBuild",
            "postRigBuild",
            "prePolish",
            "postPolishBuild"
        ]
    );
    let rig = hive.rig(id).unwrap();
    let properties = &rig.configuration().build_script_properties["recorder"];
    assert_eq!(properties["calls"], json!(6));
    assert_eq!(properties["rigged"], json!(1));
}

#[test]
fn test_a_failing_hook_stops_the_phase() {
    // --- 1. ARRANGE ---
    let session = Session::builder(MemoryScene::new())
        .with_build_script(Gatekeeper)
        .build();
    let mut hive = Hive::new(session);
    let id = hive.create_rig("gated").unwrap();
    let tail = ComponentRef::new("tail", "M");
    hive.with_rig(id, |rig, session| {
        rig.configuration_mut().build_scripts.push("gatekeeper".to_string());
        rig.create_component(session, "fkchain", "tail", "M")
    })
    .unwrap();

    // --- 2. ACT ---
    let result = hive.with_rig(id, |rig, session| rig.polish(session, None));

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(RigError::Build(BuildError::Script { hook: "prePolish", .. }))
    ));
    let rig = hive.rig(id).unwrap();
    assert_eq!(rig.component(&tail).unwrap().state(), ComponentState::RigBuilt);
    assert!(!rig.is_finalized());
}

#[test]
fn test_polish_builds_selection_sets_and_black_box() {
    // --- 1. ARRANGE ---
    let mut hive = Hive::new(Session::builder(MemoryScene::new()).build());
    let id = hive.create_rig("final").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.configuration_mut().black_box = true;
        rig.create_component(session, "fkchain", "tail", "M")
    })
    .unwrap();

    // --- 2. ACT ---
    hive.with_rig(id, |rig, session| rig.polish(session, None))
        .unwrap();

    // --- 3. ASSERT ---
    let scene = memory(&hive);
    let set = scene.find("final_ctrls_set").expect("control set");
    let members = scene.attribute(set, MEMBERS_ATTR).unwrap();
    assert_eq!(
        members,
        Some(AttributeValue::StringList(vec![
            "tail_M_fk00_anim".to_string(),
            "tail_M_fk01_anim".to_string(),
            "tail_M_fk02_anim".to_string(),
        ]))
    );
    assert!(scene.find("final_deform_set").is_some());
    let root = scene.find("final_hrc").unwrap();
    assert_eq!(
        scene.attribute(root, BLACK_BOX_ATTR).unwrap(),
        Some(AttributeValue::Bool(true))
    );
    assert!(hive.rig(id).unwrap().is_finalized());
}

#[test]
fn test_definition_exporter_writes_a_loadable_template() {
    // --- 1. ARRANGE ---
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("exports").join("biped.template");
    let mut hive = Hive::new(Session::builder(MemoryScene::new()).build());
    let id = hive.create_rig("biped").unwrap();
    hive.with_rig(id, |rig, session| {
        rig.create_component(session, "fkchain", "spine", "M")?;
        rig.create_component(session, "vchaincomponent", "arm", "L")?;
        rig.build_guides(session, None)
    })
    .unwrap();
    let mut settings = Settings::new();
    settings.insert("outputPath".into(), json!(output.to_string_lossy()));
    let mut progress = Vec::new();

    // --- 2. ACT ---
    hive.export(id, DefinitionExporter::ID, Some(&settings), &mut |percent, message| {
        progress.push((percent, message.to_string()))
    })
    .unwrap();

    // --- 3. ASSERT ---
    let document = TemplateRegistry::load_file(&output).unwrap();
    assert_eq!(document.name, "biped");
    assert_eq!(document.components.len(), 2);
    let percents: Vec<u32> = progress.iter().map(|(p, _)| *p).collect();
    assert_eq!(percents, vec![0, 45, 90, 100]);
}

#[test]
fn test_export_reports_bad_settings_and_unknown_exporters() {
    // --- 1. ARRANGE ---
    let session = Session::builder(MemoryScene::new())
        .with_exporter(Counter)
        .build();
    let mut hive = Hive::new(session);
    let id = hive.create_rig("biped").unwrap();
    let mut fail = Settings::new();
    fail.insert("fail".into(), json!(true));
    let mut messages = Vec::new();

    // --- 2. ACT ---
    let unknown = hive.export(id, "fbx", None, &mut |_, _| {});
    let missing_path = hive.export(id, DefinitionExporter::ID, None, &mut |_, _| {});
    let failed = hive.export(id, "counter", Some(&fail), &mut |_, _| {});
    let counted = hive.export(id, "counter", None, &mut |_, m| messages.push(m.to_string()));

    // --- 3. ASSERT ---
    assert!(matches!(unknown, Err(ExportError::UnknownExporter(ref id)) if id == "fbx"));
    assert!(matches!(missing_path, Err(ExportError::InvalidSetting(ref k)) if k == "outputPath"));
    assert!(matches!(failed, Err(ExportError::InvalidSetting(_))));
    assert!(counted.is_ok());
    assert_eq!(messages, vec!["0 component(s)"]);
    assert_eq!(hive.session().exporters().ids(), vec!["definition", "counter"]);
}
