use std::{
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use cohere::{
    app::{self, App, Preset},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    cue::TerminalBell,
    error::ConfigError,
    history::SessionLog,
    logging::init_file_logging,
    runtime::{CrosstermEventSource, FixedTicker, Runner, Ticker},
    scheduler::Scheduler,
    wake_lock::{InhibitorWakeLock, NoWakeLock, WakeLock},
};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

/// paced breathing in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A paced breathing timer: follow the indicator up while you inhale and down while you exhale, optionally for a fixed number of minutes."
)]
pub struct Cli {
    /// session length in minutes; the session ends after the exhale that crosses it
    #[clap(short = 'm', long)]
    minutes: Option<u32>,

    /// seconds per inhale and per exhale
    #[clap(short = 'p', long)]
    phase_secs: Option<f64>,

    /// ring the terminal bell at every phase change
    #[clap(short = 's', long)]
    sound: bool,

    /// do not keep the display awake during a session
    #[clap(long)]
    no_wake_lock: bool,

    /// milliseconds between clock updates
    #[clap(long)]
    tick_ms: Option<u64>,

    /// path to a config file (default: the platform config dir)
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// start a preset session right away
    #[clap(long, value_enum)]
    preset: Option<Preset>,

    /// do not append finished sessions to the history log
    #[clap(long)]
    no_history: bool,
}

impl Cli {
    /// Layers command line flags over the loaded config.
    fn apply(&self, mut config: Config) -> Result<Config, ConfigError> {
        if let Some(secs) = self.phase_secs {
            config.phase_secs = secs;
        }
        if let Some(ms) = self.tick_ms {
            config.tick_ms = ms;
        }
        config.sound |= self.sound;
        config.keep_awake &= !self.no_wake_lock;
        config.history &= !self.no_history;
        config.validate()?;
        Ok(config)
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

fn build_app(settings: &Config, ticker: &FixedTicker) -> App {
    let wake_lock: Box<dyn WakeLock> = if settings.keep_awake {
        Box::new(InhibitorWakeLock::new())
    } else {
        Box::new(NoWakeLock)
    };
    let mut scheduler = Scheduler::new(
        settings.phase_secs,
        ticker.interval(),
        Box::new(TerminalBell),
        wake_lock,
    );
    scheduler.set_sound(settings.sound);

    let history = if settings.history {
        SessionLog::new()
            .map_err(|e| warn!("session history disabled: {e}"))
            .ok()
    } else {
        None
    };
    App::new(scheduler, history)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = AppDirs::log_path() {
        if let Err(e) = init_file_logging(&path) {
            eprintln!("cohere: logging disabled ({}): {e}", path.display());
        }
    }

    let settings = match cli.apply(cli.config_store().load()) {
        Ok(settings) => settings,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, e.to_string()).exit();
        }
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let ticker = FixedTicker::new(Duration::from_millis(settings.tick_ms));
    let mut app = build_app(&settings, &ticker);
    app.set_time_limit(cli.minutes);
    info!(?settings, "starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    if let Some(preset) = cli.preset {
        app.start_preset(preset, Instant::now());
    }
    let runner = Runner::new(CrosstermEventSource::new(), ticker);
    let result = app::run(&mut terminal, &mut app, &runner);

    // restore the terminal before reporting anything
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.context("terminal session failed")?;
    info!("exiting");
    Ok(())
}
