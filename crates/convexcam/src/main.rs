mod cli;
mod paths;
mod render;
mod run;

use std::path::Path;

use anyhow::{Context, Result};
use cli::{Command, ConfigAction};
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    let paths = AppPaths::discover()?;
    let explicit_config = cli.config.as_deref();

    match cli.command {
        Some(Command::Render(args)) => {
            let (_, config) = run::load_config(&paths, explicit_config)?;
            let output = render::render_still(&config, &args)?;
            println!("{}", output.display());
            Ok(())
        }
        Some(Command::Devices) => run_devices(),
        Some(Command::Config(config_cmd)) => match config_cmd.action {
            ConfigAction::Where => run_config_where(&paths, explicit_config),
            ConfigAction::Show => run_config_show(&paths, explicit_config),
        },
        None => run::run(&paths, explicit_config, cli.run),
    }
}

fn run_devices() -> Result<()> {
    let devices = camera::list_devices().context("failed to enumerate cameras")?;
    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Cameras:");
    for device in devices {
        println!("  {device}");
    }
    Ok(())
}

fn run_config_where(paths: &AppPaths, explicit: Option<&Path>) -> Result<()> {
    let (config_path, config) = run::load_config(paths, explicit)?;
    let status = if config_path.is_file() {
        "present"
    } else {
        "missing, using defaults"
    };
    println!("config:     {} ({status})", config_path.display());
    println!("downloads:  {}", run::download_dir(paths, &config).display());
    println!("share:      {}", paths.share_dir().display());
    Ok(())
}

fn run_config_show(paths: &AppPaths, explicit: Option<&Path>) -> Result<()> {
    let (_, config) = run::load_config(paths, explicit)?;
    let rendered = config
        .to_toml_string()
        .context("failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}
