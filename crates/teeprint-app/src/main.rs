//! # Teeprint
//!
//! Replays a scripted customizer session against the composition engine.
//!
//! ```bash
//! teeprint session.json
//! teeprint --config shirt.json --width 768 session.json
//! RUST_LOG=debug teeprint session.json
//! ```

use clap::Parser;
use std::path::PathBuf;

use teeprint_app::{AppError, Script, Session};
use teeprint_core::EngineConfig;

/// Teeprint - garment design composition replay
#[derive(Parser, Debug)]
#[command(name = "teeprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON list of session steps
    script: PathBuf,

    /// Engine configuration file (defaults are used when omitted)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Container width to start the session at
    #[arg(long)]
    width: Option<f64>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(width) = cli.width {
        config.initial_container_width = width;
    }

    let script = Script::load(&cli.script)?;
    log::info!("Replaying {} steps from {}", script.steps.len(), cli.script.display());

    let mut session = Session::new(config)?;
    let frames = session.run(&script)?;
    for (index, frame) in frames.iter().enumerate() {
        log::info!(
            "Frame {}: width {} ({}x), {} drawn, {} loading, {} outside the printable area",
            index,
            frame.container_width,
            frame.scale,
            frame.rendered,
            frame.pending,
            frame.outside_area.len()
        );
    }

    let elements: Vec<_> = session.composer().store().iter().collect();
    let json = serde_json::to_string_pretty(&elements).map_err(|e| AppError::Script(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
