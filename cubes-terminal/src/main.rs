//! Spinning Cubes - terminal demo
//!
//! Three cubes spinning under a directional light, drawn with truecolor
//! half blocks. Press Q or Esc to quit.

use anyhow::Context;
use clap::Parser;
use cubes_core::SceneConfig;
use cubes_terminal::TerminalApp;
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cubes-terminal", about = "Spinning cubes in the terminal")]
struct Cli {
    /// Target frames per second
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Scene configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Quit after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Write logs to this file (the terminal itself is the display)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, requires = "log")]
    verbose: bool,
}

impl Cli {
    fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

/// Logs only go to a file; stderr would draw over the frame.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let Some(path) = &cli.log else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SceneConfig::from_json(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SceneConfig::default(),
    };

    let mut app = TerminalApp::new(&config, cli.fps, cli.frames)?;
    app.run()?;
    Ok(())
}
