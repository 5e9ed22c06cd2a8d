//! Headless runner: starts one program in a rayframe session, feeds it a
//! scripted event sequence and stops it again.

mod console;

use anyhow::{bail, Context, Result};
use app::Pacing;
use clap::{Parser, ValueEnum};
use console::ConsolePlatform;
use hub::{Coordinator, Phase, RendererPlacement, SessionConfig};
use mock::StaticLoader;
use serde::Deserialize;
use service_abi::Event;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, EnvFilter};

const PHASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a rayframe program without a window.
#[derive(Parser, Debug)]
#[command(author, version, about = "Run a rayframe program headlessly", long_about = None)]
struct Cli {
    /// Program path, e.g. `bouncing_ball`.
    #[arg(value_name = "PROGRAM", required_unless_present = "list")]
    program: Option<String>,

    /// JSON session config; flags below override its fields.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Frame pacing strategy.
    #[arg(long, value_enum)]
    pacing: Option<PacingArg>,

    /// Where frames are presented.
    #[arg(long, value_enum)]
    renderer: Option<RendererArg>,

    /// Target frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// JSON event script played after the program starts.
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// How long to keep the program running after the script, in milliseconds.
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    run_for: u64,

    /// Directory resources are loaded from.
    #[arg(long, default_value = ".", value_name = "DIR")]
    assets: PathBuf,

    /// List the available programs and exit.
    #[arg(long)]
    list: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PacingArg {
    /// Free-running frames at the target rate.
    Blocking,
    /// One frame per input commit.
    Locking,
}

impl From<PacingArg> for Pacing {
    fn from(arg: PacingArg) -> Self {
        match arg {
            PacingArg::Blocking => Pacing::Blocking,
            PacingArg::Locking => Pacing::Locking,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RendererArg {
    Dispatcher,
    Dedicated,
}

impl From<RendererArg> for RendererPlacement {
    fn from(arg: RendererArg) -> Self {
        match arg {
            RendererArg::Dispatcher => RendererPlacement::Dispatcher,
            RendererArg::Dedicated => RendererPlacement::Dedicated,
        }
    }
}

/// One scripted step: wait, then send and commit `events`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct Step {
    #[serde(default)]
    wait_ms: u64,
    #[serde(default)]
    events: Vec<Event>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let programs = StaticLoader::demo();
    if cli.list {
        for path in programs.paths() {
            println!("{path}");
        }
        return Ok(());
    }
    let Some(program) = cli.program.as_deref() else {
        bail!("no program given");
    };

    let config = session_config(&cli)?;
    let script = match &cli.script {
        Some(path) => load_script(path)?,
        None => Vec::new(),
    };
    let platform = Arc::new(ConsolePlatform::new(cli.assets.clone()));
    let mut hub = Coordinator::new(platform.clone(), Arc::new(programs));
    hub.init(config.clone())?;

    let started = hub.start(program)?.wait_timeout(PHASE_TIMEOUT)?;
    if started.is_none() {
        bail!("`{program}` did not start within {PHASE_TIMEOUT:?}");
    }
    for step in &script {
        thread::sleep(Duration::from_millis(step.wait_ms));
        for event in &step.events {
            hub.send(event)?;
        }
        hub.commit_inputs()?;
    }
    keep_running(&mut hub, &config, Duration::from_millis(cli.run_for))?;

    match hub.stop()?.wait_timeout(PHASE_TIMEOUT)? {
        Some(Phase::Stopped) => {}
        _ => tracing::warn!("`{program}` did not stop within {PHASE_TIMEOUT:?}"),
    }
    hub.destroy();
    tracing::info!(frames = platform.frames_presented(), "session finished");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore error if already set (e.g., during tests).
    let _ = fmt().with_env_filter(env_filter).try_init();
}

/// Config file (if any) with command-line overrides applied.
fn session_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {path:?}"))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {path:?}"))?
        }
        None => SessionConfig::default(),
    };
    if let Some(pacing) = cli.pacing {
        config.pacing = pacing.into();
    }
    if let Some(renderer) = cli.renderer {
        config.renderer = renderer.into();
    }
    if let Some(fps) = cli.fps {
        config.target_fps = fps;
    }
    Ok(config)
}

fn load_script(path: &Path) -> Result<Vec<Step>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read script {path:?}"))?;
    parse_script(&text).with_context(|| format!("invalid script {path:?}"))
}

fn parse_script(text: &str) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(text)?)
}

/// Lets the program run for `duration`. Lockstep sessions get one commit per
/// frame budget so they keep advancing.
fn keep_running(hub: &mut Coordinator, config: &SessionConfig, duration: Duration) -> Result<()> {
    let deadline = Instant::now() + duration;
    let budget = Duration::from_secs_f64(1.0 / f64::from(config.target_fps.max(1)));
    while Instant::now() < deadline {
        if hub.state() == Phase::Stopped {
            tracing::info!("program exited on its own");
            break;
        }
        if config.pacing == Pacing::Locking {
            hub.commit_inputs()?;
        }
        thread::sleep(budget.min(deadline.saturating_duration_since(Instant::now())));
    }
    Ok(())
}
