use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use cohere::app::{self, App, AppState};
use cohere::cue::Silent;
use cohere::history::SessionLog;
use cohere::runtime::{AppEvent, FixedTicker, Runner, TestEventSource};
use cohere::scheduler::{LoopState, Scheduler};
use cohere::wake_lock::NoWakeLock;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, Terminal};

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn fast_app(phase_secs: f64, history: Option<SessionLog>) -> App {
    let scheduler = Scheduler::new(
        phase_secs,
        Duration::from_millis(5),
        Box::new(Silent),
        Box::new(NoWakeLock),
    );
    App::new(scheduler, history)
}

// Headless session driven through Runner/TestEventSource without a TTY.
#[test]
fn headless_limited_session_completes() {
    let mut app = fast_app(0.05, None);
    app.set_time_limit(Some(0));

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(key(' ')).unwrap();

    let mut phase_changes = 0;
    let mut last_phase = None;
    for _ in 0..500u32 {
        match runner.step(app.time_until_tick(Instant::now())) {
            AppEvent::Tick => {
                app.on_tick(Instant::now());
            }
            AppEvent::Key(k) => {
                app.on_key(k, Instant::now());
            }
            AppEvent::Resize | AppEvent::Closed => {}
        }
        if let Some(snapshot) = app.snapshot() {
            if last_phase.is_some_and(|p| p != snapshot.phase) {
                phase_changes += 1;
            }
            last_phase = Some(snapshot.phase);
            assert!(snapshot.phase_elapsed_secs <= snapshot.phase_duration_secs);
        }
        if app.state() == AppState::Complete {
            break;
        }
    }

    assert_eq!(app.state(), AppState::Complete);
    let snapshot = app.snapshot().unwrap();
    assert!(snapshot.complete);
    assert!(!snapshot.running);
    assert_eq!(snapshot.cycles_completed, 1);
    assert_eq!(phase_changes, 1, "only Inhale -> Exhale before completion");
    // nothing left to tick once complete
    assert_eq!(app.time_until_tick(Instant::now()), None);
}

#[test]
fn headless_open_session_keeps_cycling() {
    let mut app = fast_app(0.02, None);
    let (_tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    app.toggle(Instant::now());
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(300) {
        if let AppEvent::Tick = runner.step(app.time_until_tick(Instant::now())) {
            app.on_tick(Instant::now());
        }
    }

    assert_eq!(app.state(), AppState::Breathing);
    let snapshot = app.snapshot().unwrap();
    assert!(snapshot.running);
    assert!(snapshot.cycles_completed >= 1);
}

#[test]
fn headless_pause_freezes_counters() {
    let mut app = fast_app(5.5, None);
    let t0 = Instant::now();
    app.toggle(t0);
    app.on_tick(t0 + Duration::from_millis(1200));
    app.toggle(t0 + Duration::from_millis(1500));
    let paused = app.snapshot().unwrap();

    // a late tick while paused is dropped
    assert!(!app.on_tick(t0 + Duration::from_secs(30)));
    app.toggle(t0 + Duration::from_secs(40));

    let resumed = app.snapshot().unwrap();
    assert_eq!(paused.session_elapsed_secs, resumed.session_elapsed_secs);
    assert_eq!(paused.phase_elapsed_secs, resumed.phase_elapsed_secs);
    assert_eq!(app.scheduler().state(), LoopState::Running);
}

#[test]
fn run_loop_records_completed_session() {
    let dir = tempfile::tempdir().unwrap();
    let log = SessionLog::with_path(dir.path().join("sessions.csv"));
    let mut app = fast_app(0.03, Some(log.clone()));
    app.set_time_limit(Some(0));

    let (tx, rx) = mpsc::channel();
    let producer = thread::spawn(move || {
        tx.send(key(' ')).unwrap();
        thread::sleep(Duration::from_millis(400));
        tx.send(key('q')).unwrap();
    });

    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
    app::run(&mut terminal, &mut app, &runner).unwrap();
    producer.join().unwrap();

    let records = log.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].time_limit_min, Some(0));
    assert_eq!(records[0].cycles, 1);
    assert_eq!(records[0].phase_secs, 0.03);
}
