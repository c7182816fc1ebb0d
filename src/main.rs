use std::{
    fs::File,
    path::PathBuf,
    sync::{mpsc, Mutex},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};

pub use utils::Pos;
mod utils;

pub use world::{Cell, Torus};
pub mod world;

pub use sim::{Session, SimCmd};
mod sim;

pub use view::Canvas;
mod view;

mod pattern;

#[derive(Parser, Debug)]
#[command(about = "game of life on a wrap-around grid, in the terminal")]
struct Args {
    /// ms between generations at start
    #[arg(long, default_value_t = sim::DEFAULT_TICK_INTERVAL.as_millis() as u64)]
    delay_ms: u64,

    /// ms added or removed by one speed change
    #[arg(long, default_value_t = sim::DEFAULT_TICK_STEP.as_millis() as u64)]
    step_ms: u64,

    /// seed file, `#` marks a live cell
    #[arg(long)]
    pattern: Option<PathBuf>,

    /// write logs to this file
    #[arg(long)]
    log: Option<PathBuf>,

    /// include per-generation debug logs
    #[arg(long)]
    verbose: bool,
}

/// the screen is the terminal, so logs only go to a file when asked for.
fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = &args.log else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let seed = match &args.pattern {
        Some(path) => pattern::load(path)?,
        None => vec![],
    };

    let size = termion::terminal_size().context("reading terminal size")?;
    let (columns, rows) = size;
    let Some((width, height)) = view::status::grid_size(columns as usize, rows as usize) else {
        bail!("terminal of {columns}x{rows} is too small");
    };
    let mut torus = Torus::new(width, height);
    torus.seed(seed);
    info!(width, height, population = torus.population(), "starting");
    let mut session = Session::new(
        torus,
        Duration::from_millis(args.delay_ms),
        Duration::from_millis(args.step_ms),
    );

    let mut canvas = Canvas::from_terminal().context("initializing terminal")?;
    let (sender, receiver) = mpsc::channel();
    let _input = view::spawn_input(sender.clone());
    let _resize = view::spawn_resize_watch(sender, size);

    session.run(receiver, &mut canvas)?;
    info!(
        generation = session.torus().generation(),
        running = session.is_running(),
        interval_ms = session.tick_interval().as_millis() as u64,
        "stopped"
    );
    Ok(())
}

pub fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    run(args)
}
