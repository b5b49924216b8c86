use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use lookout::{
    app::{self, Source},
    Config,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Watches a camera for AprilTags and reports every tag once, in the map frame.
///
/// Located tags and markers are written to stdout as JSON lines. Lines on stdin of the
/// form `reset 1` clear the memory of seen tags.
#[derive(Parser, Debug)]
#[command(name = "lookout", version)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tag family: 16h5, 25h7, 25h9, 36h9 or 36h11.
    #[arg(long)]
    family: Option<String>,

    /// Number of distinct tags to remember.
    #[arg(long)]
    capacity: Option<usize>,

    /// Replay recorded detections (one JSON array per frame) instead of opening the camera.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Write messages to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Don't show the camera image.
    #[arg(long)]
    no_draw: bool,

    /// Log how long tag extraction takes.
    #[arg(long)]
    timing: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(family) = &self.family {
            config.detector.family = family.parse()?;
        }
        if let Some(capacity) = self.capacity {
            config.node.capacity = capacity;
        }
        config.node.draw &= !self.no_draw;
        config.node.timing |= self.timing;
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config()?;

    let source = match &args.replay {
        Some(path) => Source::replay(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Source::camera(&config)?,
    };
    let requests = parrot::listen(BufReader::new(std::io::stdin()));

    let summary = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            app::run(&config, source, requests, BufWriter::new(file))?
        }
        None => app::run(&config, source, requests, std::io::stdout())?,
    };
    info!(
        frames = summary.frames,
        new = summary.detections.new,
        resets = summary.resets,
        "done"
    );
    Ok(())
}
