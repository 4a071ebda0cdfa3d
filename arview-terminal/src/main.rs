/// ARView Terminal - simulated AR placement
///
/// Runs the viewer against a simulated device standing on a flat floor.
/// Controls:
///   - Enter: Enter / exit AR
///   - Space: Place a model at the reticle
///   - WASD: Walk
///   - Arrow Keys: Look around
///   - Q/ESC: Quit
use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use arview_core::ViewerConfig;
use arview_terminal::{HostOptions, TerminalApp};
use clap::Parser;

#[derive(Parser)]
#[command(name = "arview-terminal")]
#[command(about = "Place AR models on a simulated floor, rendered as ASCII", long_about = None)]
struct Cli {
    /// Viewer configuration (JSON); defaults are used when omitted
    config: Option<PathBuf>,

    /// Behave like a device without immersive AR support
    #[arg(long)]
    no_ar: bool,

    /// Directory that model urls are resolved against
    #[arg(long, default_value = ".")]
    assets: PathBuf,

    /// Log file; stderr is hidden behind the alternate screen
    #[arg(long, default_value = "arview-terminal.log")]
    log_file: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = File::create(&cli.log_file)
        .with_context(|| format!("cannot create log file {}", cli.log_file.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            ViewerConfig::from_json(&json)?
        }
        None => ViewerConfig::default(),
    };

    let (width, height) = crossterm::terminal::size()?;
    let options = HostOptions {
        supported: !cli.no_ar,
        asset_root: cli.assets,
        width,
        height,
    };

    log::info!("starting terminal viewer with {} models", config.models.len());
    let mut app = TerminalApp::new(config, options)?;
    app.run()?;

    println!("Placed {} models.", app.viewer().placements().len());
    Ok(())
}
