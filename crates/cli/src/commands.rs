//! Subcommand handlers. Views go to stdout, notifications arrive on the
//! event bus and are printed to stderr by the caller.

use std::path::Path;

use aimg_app::{Console, ConsoleError, GenerationOutcome};
use aimg_core::backend_config::ServerEntry;
use aimg_core::prompts::random_example_prompt;
use aimg_core::render::{
    render_backend_config, render_catalog, render_history, render_result, render_server_status,
    render_workflows,
};
use aimg_core::request::{GenerationForm, GenerationMode};
use aimg_core::settings::UserSettings;
use aimg_core::workflow::format_workflow;
use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::form::{read_image, GenerationArgs};
use crate::{
    Commands, ConfigAction, HistoryAction, PresetAction, SettingsAction, WorkflowAction,
};

pub async fn run(console: &Console, command: Commands) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            console.login(&username, &password).await?;
        }
        Commands::Register {
            username,
            password,
            confirm,
        } => {
            console.register(&username, &password, &confirm).await?;
        }
        Commands::Logout => console.logout(),
        Commands::Status => status(console).await?,
        Commands::Txt2img(args) => {
            let form = prepare_form(console, &args)?;
            generate(console, GenerationMode::Text2Image, &form, args.out.as_deref()).await?;
        }
        Commands::Img2img { image, args } => {
            let mut form = prepare_form(console, &args)?;
            form.image = Some(read_image(&image)?);
            generate(console, GenerationMode::Image2Image, &form, args.out.as_deref()).await?;
        }
        Commands::History { action } => history(console, action).await?,
        Commands::Config { action } => config(console, action).await?,
        Commands::Workflows { action } => workflows(console, action).await?,
        Commands::Settings { action } => settings(console, action)?,
        Commands::Presets { action } => presets(console, action)?,
        Commands::ExamplePrompt => println!("{}", random_example_prompt()),
    }
    Ok(())
}

/// Commands other than login/register work on the persisted session.
async fn resume(console: &Console) -> Result<()> {
    if console.start().await.is_none() {
        bail!("Not logged in; run `aimg login <username>` first");
    }
    Ok(())
}

async fn status(console: &Console) -> Result<()> {
    resume(console).await?;
    print!("{}", render_server_status(&console.servers()));
    print!("{}", render_catalog(&console.catalog()));
    Ok(())
}

fn prepare_form(console: &Console, args: &GenerationArgs) -> Result<GenerationForm> {
    let mut form = console.settings().new_form();
    if let Some(name) = &args.preset {
        let preset = console
            .settings()
            .find_config(name)
            .with_context(|| format!("No saved configuration named '{name}'"))?;
        preset.apply_to(&mut form);
    }
    args.apply(&mut form);
    Ok(form)
}

async fn generate(
    console: &Console,
    mode: GenerationMode,
    form: &GenerationForm,
    out: Option<&Path>,
) -> Result<GenerationOutcome> {
    resume(console).await?;
    let outcome = console.generate(mode, form).await?;
    print!("{}", render_result(&outcome.result));
    if let Some(dir) = out {
        for path in console.download_images(&outcome.result, dir).await? {
            println!("Saved {}", path.display());
        }
    }
    Ok(outcome)
}

async fn history(console: &Console, action: HistoryAction) -> Result<()> {
    match action {
        HistoryAction::List => print!("{}", render_history(&console.history_entries())),
        HistoryAction::Show { id } => {
            let entry = console
                .history()
                .find_by_id(id)
                .ok_or(ConsoleError::HistoryEntryNotFound(id))?;
            println!("{}", serde_json::to_string_pretty(&entry.params)?);
            print!("{}", render_result(&entry.result));
        }
        HistoryAction::Replay { id, image, out } => {
            let mut replay = console.replay(id)?;
            if replay.mode == GenerationMode::Image2Image {
                let Some(path) = image else {
                    bail!("History entry {id} is image-to-image; pass --image");
                };
                replay.form.image = Some(read_image(&path)?);
            }
            generate(console, replay.mode, &replay.form, out.as_deref()).await?;
        }
    }
    Ok(())
}

async fn config(console: &Console, action: ConfigAction) -> Result<()> {
    resume(console).await?;
    let mut config = console.load_backend_config().await?;
    match action {
        ConfigAction::Show => {
            print!("{}", render_backend_config(&config));
            return Ok(());
        }
        ConfigAction::SetServer {
            address,
            weight,
            disabled,
        } => config.upsert_server(ServerEntry {
            address,
            weight,
            enabled: !disabled,
        }),
        ConfigAction::RemoveServer { address } => {
            if !config.remove_server(&address) {
                bail!("No server with address {address}");
            }
        }
        ConfigAction::Set {
            auto_save,
            auto_zip,
            default_workflow,
        } => {
            if let Some(v) = auto_save {
                config.auto_save = v;
            }
            if let Some(v) = auto_zip {
                config.auto_zip = v;
            }
            if let Some(v) = default_workflow {
                config.default_workflow = v;
            }
        }
    }
    console.save_backend_config(config).await?;
    Ok(())
}

async fn workflows(console: &Console, action: WorkflowAction) -> Result<()> {
    if let WorkflowAction::Format { file } = &action {
        let text = read_text(file)?;
        println!("{}", format_workflow(&text)?);
        return Ok(());
    }

    resume(console).await?;
    match action {
        WorkflowAction::List => print!("{}", render_workflows(&console.list_workflows().await?)),
        WorkflowAction::Show { prefix } => {
            let workflow = console.get_workflow(&prefix).await?;
            println!("{}", serde_json::to_string_pretty(&workflow)?);
        }
        WorkflowAction::Delete { prefix } => {
            console.delete_workflow(&prefix).await?;
        }
        WorkflowAction::Save { file } => {
            console.save_workflow(&read_text(&file)?).await?;
        }
        WorkflowAction::Format { .. } => {}
    }
    Ok(())
}

fn settings(console: &Console, action: SettingsAction) -> Result<()> {
    let store = console.settings();
    match action {
        SettingsAction::Show => {
            let current = store.user_settings();
            println!("Default width: {}", current.default_width);
            println!("Default height: {}", current.default_height);
        }
        SettingsAction::Set { width, height } => {
            let current = store.user_settings();
            store.save_user_settings(&UserSettings {
                default_width: width.unwrap_or(current.default_width),
                default_height: height.unwrap_or(current.default_height),
            })?;
            console
                .bus()
                .toast(aimg_events::ToastLevel::Success, "Settings saved");
        }
    }
    Ok(())
}

fn presets(console: &Console, action: PresetAction) -> Result<()> {
    let store = console.settings();
    match action {
        PresetAction::List => {
            let configs = store.saved_configs();
            if configs.is_empty() {
                println!("No saved configurations");
            }
            for config in configs {
                println!(
                    "{} ({}) {}",
                    config.name,
                    config.timestamp.format("%Y-%m-%d %H:%M"),
                    config.config.common.prompt
                );
            }
        }
        PresetAction::Save { name, args } => {
            let form = prepare_form(console, &args)?;
            store.save_config(&name, &form, Utc::now())?;
            console
                .bus()
                .toast(aimg_events::ToastLevel::Success, "Configuration saved");
        }
        PresetAction::Delete { name } => {
            if !store.delete_config(&name)? {
                bail!("No saved configuration named '{name}'");
            }
        }
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}
