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

// Hive Sandbox
// Assembles a biped through the command layer and walks it through every phase.

use anyhow::{bail, Context, Result};
use hive_core::math::MirrorAxis;
use hive_core::{SceneBackend, Transaction};
use hive_data::{ComponentRef, ParentLink, Settings};
use hive_infra::MemoryScene;
use hive_rig::commands::{BuildCommand, CreateComponent, CreateRig, MirrorComponents};
use hive_rig::{
    CommandExecutor, CommandReport, CommandStatus, DefinitionExporter, Hive, MirrorDescriptor,
    RigId, Session,
};
use serde_json::json;

/// Runs `command`, logging its report and turning anything but success into an error.
fn run<T>(commands: &mut CommandExecutor, hive: &mut Hive, command: T) -> Result<T::Output>
where
    T: Transaction<Hive> + 'static,
{
    let CommandReport {
        status,
        message,
        value,
    } = commands.execute(hive, command);
    match status {
        CommandStatus::Succeeded => {
            log::info!("{message}");
            value.context(message)
        }
        CommandStatus::Cancelled | CommandStatus::Failed => bail!(message),
    }
}

fn scene_size(hive: &Hive) -> usize {
    hive.scene()
        .as_any()
        .downcast_ref::<MemoryScene>()
        .map_or(0, MemoryScene::len)
}

fn assemble(commands: &mut CommandExecutor, hive: &mut Hive) -> Result<RigId> {
    let rig = run(commands, hive, CreateRig::new("biped"))?;
    run(
        commands,
        hive,
        CreateComponent::new(rig, "godnodecomponent", "world", "M"),
    )?;
    run(
        commands,
        hive,
        CreateComponent::new(rig, "fkchain", "spine", "M")
            .with_parent(ParentLink::new("world", "M", "offset")),
    )?;
    run(
        commands,
        hive,
        CreateComponent::new(rig, "vchaincomponent", "arm", "L")
            .with_parent(ParentLink::new("spine", "M", "fk02")),
    )?;
    Ok(rig)
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let workspace = std::env::temp_dir().join("hive-sandbox");
    let session = Session::builder(MemoryScene::new())
        .with_templates(workspace.join("templates"))
        .build();
    let mut hive = Hive::new(session);
    let mut commands = CommandExecutor::new();

    let rig = assemble(&mut commands, &mut hive)?;
    run(&mut commands, &mut hive, BuildCommand::build_rigs(rig))?;

    let arm = ComponentRef::new("arm", "L");
    let mirrored = run(
        &mut commands,
        &mut hive,
        MirrorComponents::new(rig, vec![MirrorDescriptor::new(arm, MirrorAxis::X)]),
    )?;
    log::info!("Mirror created {:?}", mirrored.created);

    let report = run(&mut commands, &mut hive, BuildCommand::polish(rig))?;
    log::info!(
        "Polished {} component(s); scene holds {} node(s)",
        report.applied.len(),
        scene_size(&hive)
    );

    // Step back through the polish and forward again.
    for report in [commands.undo(&mut hive), commands.redo(&mut hive)] {
        if !report.success() {
            bail!(report.message);
        }
        log::info!("{}", report.message);
    }
    log::info!("History: {}", commands.history().join(" > "));

    let template = hive.save_template(rig, "biped", true)?;
    log::info!("Template saved to {}", template.display());

    let mut settings = Settings::new();
    let output = workspace.join("exports").join("biped.template");
    settings.insert("outputPath".into(), json!(output.to_string_lossy()));
    hive.export(rig, DefinitionExporter::ID, Some(&settings), &mut |percent, message| {
        log::info!("[{percent:>3}%] {message}")
    })?;

    Ok(())
}
