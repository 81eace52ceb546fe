use anyhow::Context;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use kinetrace::{
    config::{Config, ConfigStore, FileConfigStore},
    fit::TrajectoryFit,
    frame_clock::FrameClock,
    runtime::{CrosstermEventSource, EventSource, Runner, ViewerEvent},
    script::{parse_script_file, ReplayStep},
    session::SessionController,
    ui::{summary_lines, PlotView},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 100;

/// measure projectile motion from clicks on video frames
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Replays a CSV script of calibration and data clicks (action,x,y,frame,time), prints the status of every step, and fits x(t) with a line and y(t) with a parabola on each plot request."
)]
pub struct Cli {
    /// CSV event script to replay
    script: PathBuf,

    /// real-world length of the calibration reference, in meters
    #[clap(short = 'd', long)]
    distance: Option<f64>,

    /// video frame rate used to turn frame numbers into seconds
    #[clap(short = 'f', long)]
    fps: Option<f64>,

    /// open the terminal chart viewer on every plot (needs a tty)
    #[clap(short = 'c', long)]
    chart: bool,

    /// print fit results as JSON instead of text
    #[clap(long)]
    json: bool,

    /// store the effective distance, fps and chart settings as new defaults
    #[clap(long)]
    save_config: bool,

    /// config file to use instead of the platform default
    #[clap(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Command line flags win over stored defaults
    fn effective_config(&self, stored: &Config) -> Config {
        Config {
            real_distance_m: self.distance.unwrap_or(stored.real_distance_m),
            fps: self.fps.unwrap_or(stored.fps),
            show_chart: self.chart || stored.show_chart,
        }
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kinetrace=error")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let store = cli.config_store();
    let cfg = cli.effective_config(&store.load());
    if cli.save_config {
        store
            .save(&cfg)
            .with_context(|| format!("saving config to {}", store.path().display()))?;
    }

    let clock = FrameClock::new(cfg.fps)?;
    let mut session = SessionController::new(&cfg.session_config())?;
    let parsed = parse_script_file(&cli.script, clock)
        .with_context(|| format!("reading script {}", cli.script.display()))?;
    for e in &parsed.errors {
        eprintln!("Skipped {e}");
    }

    let runner = (cfg.show_chart && !cli.json && io::stdout().is_tty()).then(|| {
        Runner::new(
            CrosstermEventSource::new(),
            Duration::from_millis(TICK_RATE_MS),
        )
    });

    let mut out = io::stdout();
    for event in &parsed.events {
        match event.apply(&mut session) {
            ReplayStep::Status(status) => writeln!(out, "{status}")?,
            ReplayStep::Plot(Ok(fit)) => {
                report_fit(&mut out, &fit, cli.json)?;
                if let Some(runner) = &runner {
                    view_chart(&fit, runner)?;
                }
            }
            ReplayStep::Plot(Err(e)) => writeln!(out, "{e}")?,
        }
    }

    Ok(())
}

fn report_fit<W: Write>(out: &mut W, fit: &TrajectoryFit, json: bool) -> anyhow::Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(fit)?)?;
    } else {
        for line in summary_lines(fit) {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

fn view_chart<E: EventSource>(fit: &TrajectoryFit, runner: &Runner<E>) -> anyhow::Result<()> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Restore the terminal even when drawing fails
    let result = run_viewer(&mut terminal, fit, runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_viewer<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    fit: &TrajectoryFit,
    runner: &Runner<E>,
) -> anyhow::Result<()> {
    let view = PlotView::new(fit);
    terminal.draw(|f| f.render_widget(&view, f.area()))?;

    loop {
        match runner.step() {
            ev if ev.is_quit() => break,
            ViewerEvent::Resize => {
                terminal.draw(|f| f.render_widget(&view, f.area()))?;
            }
            ViewerEvent::Key(_) | ViewerEvent::Tick => {}
        }
    }

    Ok(())
}
