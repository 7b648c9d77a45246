use std::io;
use std::time::{Duration, Instant};

use chrono::Local;
use clap::ValueEnum;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, Terminal};
use tracing::{debug, info, warn};

use crate::clock::Snapshot;
use crate::history::{SessionLog, SessionRecord};
use crate::input::TimeLimitField;
use crate::runtime::{AppEvent, EventSource, Runner, Ticker};
use crate::scheduler::{LoopState, Scheduler};
use crate::ui;

/// One-key session lengths offered on the setup screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
pub enum Preset {
    #[strum(to_string = "2 min")]
    Two,
    #[strum(to_string = "5 min")]
    Five,
    #[strum(to_string = "10 min")]
    Ten,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Two, Preset::Five, Preset::Ten];

    pub fn minutes(self) -> u32 {
        match self {
            Preset::Two => 2,
            Preset::Five => 5,
            Preset::Ten => 10,
        }
    }

    pub fn key(self) -> char {
        match self {
            Preset::Two => 'a',
            Preset::Five => 'b',
            Preset::Ten => 'c',
        }
    }

    fn from_key(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Setup,
    Breathing,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    scheduler: Scheduler,
    time_limit: TimeLimitField,
    history: Option<SessionLog>,
    pulse: f64,
    recorded: bool,
}

impl App {
    pub fn new(scheduler: Scheduler, history: Option<SessionLog>) -> Self {
        Self {
            scheduler,
            time_limit: TimeLimitField::default(),
            history,
            pulse: 0.0,
            recorded: false,
        }
    }

    pub fn state(&self) -> AppState {
        match self.scheduler.state() {
            LoopState::Idle => AppState::Setup,
            LoopState::Running | LoopState::Paused => AppState::Breathing,
            LoopState::Completed => AppState::Complete,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.scheduler.state() == LoopState::Paused
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.scheduler.snapshot()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn time_limit(&self) -> &TimeLimitField {
        &self.time_limit
    }

    pub fn set_time_limit(&mut self, minutes: Option<u32>) {
        match minutes {
            Some(m) => self.time_limit.set_minutes(m),
            None => self.time_limit.clear(),
        }
    }

    pub fn sound(&self) -> bool {
        self.scheduler.sound()
    }

    pub fn toggle_sound(&mut self) {
        let enabled = !self.scheduler.sound();
        self.scheduler.set_sound(enabled);
        debug!(enabled, "sound toggled");
    }

    /// Indicator highlight level captured at the last update.
    pub fn pulse(&self) -> f64 {
        self.pulse
    }

    /// Space/enter: start from setup, otherwise pause or resume.
    pub fn toggle(&mut self, now: Instant) {
        match self.scheduler.state() {
            LoopState::Idle => self.start(now),
            LoopState::Running => self.scheduler.pause(now),
            LoopState::Paused => self.scheduler.resume(now),
            LoopState::Completed => {}
        }
        self.settle(now);
    }

    pub fn start_preset(&mut self, preset: Preset, now: Instant) {
        self.time_limit.set_minutes(preset.minutes());
        self.start(now);
        self.settle(now);
    }

    /// Back to setup. The time-limit field is cleared too.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.time_limit.clear();
        self.pulse = 0.0;
        self.recorded = false;
    }

    /// Releases anything the running session holds before exit.
    pub fn shutdown(&mut self) {
        self.scheduler.reset();
    }

    /// Returns whether the screen needs a redraw.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        let ticked = self.scheduler.tick(now).is_some();
        self.settle(now);
        ticked
    }

    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.scheduler.time_until_tick(now)
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> AppAction {
        if key.kind != KeyEventKind::Press {
            return AppAction::Continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppAction::Quit;
        }

        match (self.state(), key.code) {
            (_, KeyCode::Esc | KeyCode::Char('q')) => return AppAction::Quit,
            (_, KeyCode::Char(' ') | KeyCode::Enter) => self.toggle(now),
            (AppState::Setup, KeyCode::Char(c)) if c.is_ascii_digit() => {
                self.time_limit.push(c);
            }
            (AppState::Setup, KeyCode::Backspace) => self.time_limit.backspace(),
            (AppState::Setup, KeyCode::Char('s')) => self.toggle_sound(),
            (AppState::Setup, KeyCode::Char(c)) => {
                if let Some(preset) = Preset::from_key(c) {
                    self.start_preset(preset, now);
                }
            }
            (AppState::Breathing, KeyCode::Char('r')) if self.is_paused() => self.reset(),
            (AppState::Complete, KeyCode::Char('r')) => self.reset(),
            _ => {}
        }
        AppAction::Continue
    }

    fn start(&mut self, now: Instant) {
        self.recorded = false;
        self.scheduler.start(now, self.time_limit.minutes());
    }

    fn settle(&mut self, now: Instant) {
        self.pulse = self.scheduler.pulse_level(now);
        if self.scheduler.state() == LoopState::Completed && !self.recorded {
            self.recorded = true;
            self.record_session();
        }
    }

    fn record_session(&self) {
        let (Some(log), Some(snapshot)) = (&self.history, self.scheduler.snapshot()) else {
            return;
        };
        let record = SessionRecord::from_snapshot(&snapshot, Local::now());
        match log.append(&record) {
            Ok(()) => info!(path = %log.path().display(), "session recorded"),
            Err(e) => warn!("could not record session: {e}"),
        }
    }
}

/// Drives `app` until the user quits or the event source closes.
pub fn run<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> io::Result<()> {
    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        let until_tick = app.time_until_tick(Instant::now());
        match runner.step(until_tick) {
            AppEvent::Tick => {
                if app.on_tick(Instant::now()) {
                    terminal.draw(|f| ui::draw(app, f))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| ui::draw(app, f))?;
            }
            AppEvent::Key(key) => {
                if app.on_key(key, Instant::now()) == AppAction::Quit {
                    break;
                }
                terminal.draw(|f| ui::draw(app, f))?;
            }
            AppEvent::Closed => break,
        }
    }

    app.shutdown();
    Ok(())
}
