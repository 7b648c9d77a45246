//! The scheduler loop: the only thing that advances a [`SessionClock`].
//!
//! The host event loop asks [`Scheduler::time_until_tick`] how long it may
//! block, then calls [`Scheduler::tick`] with a freshly sampled instant. A
//! pending tick exists only while a session runs; pausing, resetting or
//! completing cancels it, and a tick delivered without one is dropped.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::clock::{ClockEvent, Phase, SessionClock, Snapshot};
use crate::cue::{Cue, CuePlayer};
use crate::wake_lock::{WakeGuard, WakeLock};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// How long the indicator stays highlighted after a phase boundary.
pub const PULSE_SECS: f64 = 0.4;

/// During this much of a phase the countdown shows the full phase length.
const FULL_DISPLAY_SECS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Paused,
    Completed,
}

pub struct Scheduler {
    state: LoopState,
    clock: Option<SessionClock>,
    phase_duration_secs: f64,
    tick_interval: Duration,
    next_tick: Option<Instant>,
    pulse_started_at: Option<Instant>,
    sound: bool,
    cue: Box<dyn CuePlayer>,
    wake: WakeGuard,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("next_tick", &self.next_tick)
            .field("sound", &self.sound)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        phase_duration_secs: f64,
        tick_interval: Duration,
        cue: Box<dyn CuePlayer>,
        wake_lock: Box<dyn WakeLock>,
    ) -> Self {
        Self {
            state: LoopState::Idle,
            clock: None,
            phase_duration_secs,
            tick_interval,
            next_tick: None,
            pulse_started_at: None,
            sound: false,
            cue,
            wake: WakeGuard::new(wake_lock),
        }
    }

    /// Starts a new session, discarding whatever session was active.
    pub fn start(&mut self, now: Instant, time_limit_minutes: Option<u32>) -> Snapshot {
        // the previous tick stream must be gone before the new anchor exists
        self.cancel_tick();

        let time_limit_secs = time_limit_minutes.map(|m| u64::from(m) * 60);
        let mut clock = SessionClock::new(self.phase_duration_secs);
        clock.start(now, time_limit_secs);
        let snapshot = clock.snapshot();
        self.clock = Some(clock);
        self.state = LoopState::Running;
        info!(
            phase_secs = self.phase_duration_secs,
            ?time_limit_secs,
            "session started"
        );

        self.wake.acquire();
        self.pulse_started_at = Some(now);
        self.play(Cue::Phase);
        self.schedule_tick(now);
        snapshot
    }

    pub fn pause(&mut self, now: Instant) {
        if self.state != LoopState::Running {
            return;
        }
        let events = match self.clock.as_mut() {
            Some(clock) => clock.pause(now),
            None => return,
        };
        self.dispatch(&events, now);
        if self.state == LoopState::Running {
            self.state = LoopState::Paused;
            self.cancel_tick();
            self.wake.release();
            info!("session paused");
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if self.state != LoopState::Paused {
            return;
        }
        let resumed = self.clock.as_mut().is_some_and(|clock| clock.resume(now));
        if !resumed {
            return;
        }
        self.state = LoopState::Running;
        self.wake.acquire();
        self.schedule_tick(now);
        info!("session resumed");
    }

    /// Discards the session and stops all scheduling.
    pub fn reset(&mut self) {
        if self.state != LoopState::Idle {
            info!(state = ?self.state, "session reset");
        }
        self.cancel_tick();
        self.clock = None;
        self.pulse_started_at = None;
        self.state = LoopState::Idle;
        self.wake.release();
    }

    /// Advances the clock to `now` and fires boundary side effects.
    ///
    /// Returns the snapshot to redraw with, or `None` when no tick was pending.
    pub fn tick(&mut self, now: Instant) -> Option<Snapshot> {
        self.next_tick?;
        if self.state != LoopState::Running {
            return None;
        }
        let (events, snapshot) = {
            let clock = self.clock.as_mut()?;
            let events = clock.advance(now);
            (events, clock.snapshot())
        };
        self.dispatch(&events, now);
        if self.state == LoopState::Running {
            self.schedule_tick(now);
        }
        Some(snapshot)
    }

    fn dispatch(&mut self, events: &[ClockEvent], now: Instant) {
        for event in events {
            match *event {
                ClockEvent::PhaseCompleted { completed, next } => {
                    debug!(%completed, ?next, "phase completed");
                    self.pulse_started_at = Some(now);
                    self.play(Cue::Phase);
                }
                ClockEvent::SessionCompleted => {
                    self.play(Cue::Complete);
                    self.cancel_tick();
                    self.wake.release();
                    self.state = LoopState::Completed;
                    if let Some(clock) = &self.clock {
                        let snap = clock.snapshot();
                        info!(
                            elapsed_secs = snap.session_elapsed_secs,
                            cycles = snap.cycles_completed,
                            "session complete"
                        );
                    }
                }
            }
        }
    }

    fn play(&mut self, cue: Cue) {
        if !self.sound {
            return;
        }
        if let Err(e) = self.cue.play(cue) {
            warn!("cue playback failed: {e}");
        }
    }

    fn schedule_tick(&mut self, now: Instant) {
        self.next_tick = Some(now + self.tick_interval);
    }

    fn cancel_tick(&mut self) {
        self.next_tick = None;
    }

    /// How long the caller may wait before the next tick is due, if one is.
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.next_tick
            .map(|due| due.saturating_duration_since(now))
    }

    /// 1.0 right at a phase boundary, fading linearly to 0.0 after [`PULSE_SECS`].
    pub fn pulse_level(&self, now: Instant) -> f64 {
        match (self.state, self.pulse_started_at) {
            (LoopState::Running, Some(at)) => {
                let age = now.saturating_duration_since(at).as_secs_f64();
                (1.0 - age / PULSE_SECS).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.clock.as_ref().map(SessionClock::snapshot)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn set_sound(&mut self, enabled: bool) {
        self.sound = enabled;
    }

    pub fn sound(&self) -> bool {
        self.sound
    }

    pub fn phase_duration_secs(&self) -> f64 {
        self.phase_duration_secs
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn wake_lock_held(&self) -> bool {
        self.wake.is_held()
    }
}

/// Countdown shown for the current phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Countdown {
    /// The full phase length, shown briefly as a phase begins.
    Full(f64),
    /// Whole seconds remaining, rounded up.
    Seconds(u64),
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Countdown::Full(secs) => write!(f, "{secs:.1}"),
            Countdown::Seconds(secs) => write!(f, "{secs}"),
        }
    }
}

pub fn countdown_display(phase_elapsed_secs: f64, phase_duration_secs: f64) -> Countdown {
    if phase_elapsed_secs < FULL_DISPLAY_SECS {
        return Countdown::Full(phase_duration_secs);
    }
    let remaining = (phase_duration_secs - phase_elapsed_secs).max(0.0);
    Countdown::Seconds(remaining.ceil() as u64)
}

pub fn progress(phase_elapsed_secs: f64, phase_duration_secs: f64) -> f64 {
    if phase_duration_secs <= 0.0 {
        return 1.0;
    }
    (phase_elapsed_secs / phase_duration_secs).clamp(0.0, 1.0)
}

/// Position of the indicator on a vertical track running from `top` to `bottom`.
///
/// Inhale rises from the bottom to the top; Exhale falls back down.
pub fn indicator_position(phase: Phase, progress: f64, top: f64, bottom: f64) -> f64 {
    let span = bottom - top;
    match phase {
        Phase::Inhale => bottom - progress * span,
        Phase::Exhale => top + progress * span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::DEFAULT_PHASE_SECS;
    use crate::error::CapabilityError;
    use crate::wake_lock::NoWakeLock;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct RecordingCue {
        played: Rc<RefCell<Vec<Cue>>>,
    }

    impl CuePlayer for RecordingCue {
        fn play(&mut self, cue: Cue) -> Result<(), CapabilityError> {
            self.played.borrow_mut().push(cue);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FlagLock(Rc<RefCell<bool>>);

    impl WakeLock for FlagLock {
        fn acquire(&mut self) -> Result<(), CapabilityError> {
            *self.0.borrow_mut() = true;
            Ok(())
        }

        fn release(&mut self) -> Result<(), CapabilityError> {
            *self.0.borrow_mut() = false;
            Ok(())
        }
    }

    fn at(t0: Instant, secs: f64) -> Instant {
        t0 + Duration::from_secs_f64(secs)
    }

    fn scheduler() -> (Scheduler, Rc<RefCell<Vec<Cue>>>, Rc<RefCell<bool>>) {
        let played = Rc::new(RefCell::new(Vec::new()));
        let awake = Rc::new(RefCell::new(false));
        let mut scheduler = Scheduler::new(
            DEFAULT_PHASE_SECS,
            DEFAULT_TICK_INTERVAL,
            Box::new(RecordingCue {
                played: played.clone(),
            }),
            Box::new(FlagLock(awake.clone())),
        );
        scheduler.set_sound(true);
        (scheduler, played, awake)
    }

    #[test]
    fn test_start_plays_initial_cue_and_acquires_wake_lock() {
        let (mut scheduler, played, awake) = scheduler();
        let t0 = Instant::now();

        let snap = scheduler.start(t0, None);

        assert_eq!(scheduler.state(), LoopState::Running);
        assert_eq!(snap.phase, Phase::Inhale);
        assert_eq!(*played.borrow(), vec![Cue::Phase]);
        assert!(*awake.borrow());
        assert_eq!(scheduler.time_until_tick(t0), Some(DEFAULT_TICK_INTERVAL));
    }

    #[test]
    fn test_tick_without_pending_tick_is_ignored() {
        let (mut scheduler, _, _) = scheduler();
        assert!(scheduler.tick(Instant::now()).is_none());
        assert_eq!(scheduler.time_until_tick(Instant::now()), None);
    }

    #[test]
    fn test_tick_fires_cue_and_pulse_on_boundary() {
        let (mut scheduler, played, _) = scheduler();
        let t0 = Instant::now();
        scheduler.start(t0, None);

        let snap = scheduler.tick(at(t0, 2.0)).unwrap();
        assert_eq!(snap.phase, Phase::Inhale);
        assert_eq!(played.borrow().len(), 1);
        assert_eq!(scheduler.pulse_level(at(t0, 2.0)), 0.0);

        let snap = scheduler.tick(at(t0, 5.6)).unwrap();
        assert_eq!(snap.phase, Phase::Exhale);
        assert_eq!(*played.borrow(), vec![Cue::Phase, Cue::Phase]);
        assert_eq!(scheduler.pulse_level(at(t0, 5.6)), 1.0);
        assert!(scheduler.pulse_level(at(t0, 5.8)) > 0.0);
        assert_eq!(scheduler.pulse_level(at(t0, 6.1)), 0.0);
    }

    #[test]
    fn test_completion_orders_cues_and_stops_scheduling() {
        let (mut scheduler, played, awake) = scheduler();
        let t0 = Instant::now();
        // one minute limit: the exhale ending at 66.0s is the first at/after 60s
        scheduler.start(t0, Some(1));

        let mut t = 0.0;
        while scheduler.state() == LoopState::Running && t < 120.0 {
            t += 0.05;
            scheduler.tick(at(t0, t));
        }

        assert_eq!(scheduler.state(), LoopState::Completed);
        assert!((65.99..66.11).contains(&t));
        assert_eq!(played.borrow().last(), Some(&Cue::Complete));
        let cues = played.borrow();
        assert_eq!(cues[cues.len() - 2], Cue::Phase);
        assert!(!*awake.borrow());
        assert_eq!(scheduler.time_until_tick(at(t0, t)), None);
        assert!(scheduler.tick(at(t0, t + 1.0)).is_none());
        assert!(scheduler.snapshot().unwrap().complete);
    }

    #[test]
    fn test_pause_cancels_tick_and_releases_wake_lock() {
        let (mut scheduler, _, awake) = scheduler();
        let t0 = Instant::now();
        scheduler.start(t0, None);
        scheduler.tick(at(t0, 1.0));

        scheduler.pause(at(t0, 2.0));

        assert_eq!(scheduler.state(), LoopState::Paused);
        assert!(!*awake.borrow());
        assert_eq!(scheduler.time_until_tick(at(t0, 2.0)), None);
        // a tick queued before the pause must not move the clock
        assert!(scheduler.tick(at(t0, 3.0)).is_none());
        let snap = scheduler.snapshot().unwrap();
        assert!((snap.session_elapsed_secs - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_resume_continues_without_counting_pause() {
        let (mut scheduler, _, awake) = scheduler();
        let t0 = Instant::now();
        scheduler.start(t0, None);
        scheduler.pause(at(t0, 2.0));

        scheduler.resume(at(t0, 30.0));
        assert!(*awake.borrow());
        let snap = scheduler.tick(at(t0, 31.0)).unwrap();

        assert!((snap.session_elapsed_secs - 3.0).abs() < 1e-6);
        assert!((snap.phase_elapsed_secs - 3.0).abs() < 1e-6);
        assert_eq!(snap.phase, Phase::Inhale);
    }

    #[test]
    fn test_commands_in_wrong_state_are_ignored() {
        let (mut scheduler, played, _) = scheduler();
        let t0 = Instant::now();

        scheduler.pause(t0);
        scheduler.resume(t0);
        assert_eq!(scheduler.state(), LoopState::Idle);

        scheduler.start(t0, None);
        scheduler.resume(t0);
        assert_eq!(scheduler.state(), LoopState::Running);
        assert_eq!(played.borrow().len(), 1);
    }

    #[test]
    fn test_reset_discards_session() {
        let (mut scheduler, _, awake) = scheduler();
        let t0 = Instant::now();
        scheduler.start(t0, Some(1));
        scheduler.tick(at(t0, 3.0));

        scheduler.reset();

        assert_eq!(scheduler.state(), LoopState::Idle);
        assert!(scheduler.snapshot().is_none());
        assert!(!*awake.borrow());
        assert!(scheduler.tick(at(t0, 4.0)).is_none());
    }

    #[test]
    fn test_restart_replaces_running_session() {
        let (mut scheduler, _, _) = scheduler();
        let t0 = Instant::now();
        scheduler.start(t0, None);
        scheduler.tick(at(t0, 7.0));

        let t1 = at(t0, 8.0);
        scheduler.start(t1, Some(5));
        let snap = scheduler.tick(at(t1, 1.0)).unwrap();

        assert_eq!(snap.phase, Phase::Inhale);
        assert!((snap.session_elapsed_secs - 1.0).abs() < 1e-6);
        assert_eq!(snap.time_limit_secs, Some(300));
    }

    #[test]
    fn test_sound_disabled_plays_nothing() {
        let (mut scheduler, played, _) = scheduler();
        scheduler.set_sound(false);
        let t0 = Instant::now();

        scheduler.start(t0, None);
        scheduler.tick(at(t0, 6.0));

        assert!(played.borrow().is_empty());
    }

    #[test]
    fn test_no_wake_lock_still_runs() {
        let mut scheduler = Scheduler::new(
            DEFAULT_PHASE_SECS,
            DEFAULT_TICK_INTERVAL,
            Box::new(RecordingCue::default()),
            Box::new(NoWakeLock),
        );
        let t0 = Instant::now();
        scheduler.start(t0, None);
        assert!(scheduler.wake_lock_held());
        scheduler.reset();
        assert!(!scheduler.wake_lock_held());
    }

    #[test]
    fn test_countdown_shows_full_duration_first() {
        assert_eq!(countdown_display(0.0, 5.5), Countdown::Full(5.5));
        assert_eq!(countdown_display(0.49, 5.5), Countdown::Full(5.5));
        assert_eq!(countdown_display(0.5, 5.5), Countdown::Seconds(5));
        assert_eq!(countdown_display(1.6, 5.5), Countdown::Seconds(4));
        assert_eq!(countdown_display(5.4, 5.5), Countdown::Seconds(1));
        assert_eq!(countdown_display(5.5, 5.5), Countdown::Seconds(0));
    }

    #[test]
    fn test_countdown_display_format() {
        assert_eq!(Countdown::Full(5.5).to_string(), "5.5");
        assert_eq!(Countdown::Full(6.0).to_string(), "6.0");
        assert_eq!(Countdown::Seconds(3).to_string(), "3");
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(progress(0.0, 5.5), 0.0);
        assert_eq!(progress(2.75, 5.5), 0.5);
        assert_eq!(progress(9.0, 5.5), 1.0);
        assert_eq!(progress(-1.0, 5.5), 0.0);
    }

    #[test]
    fn test_indicator_moves_opposite_ways_per_phase() {
        assert_eq!(indicator_position(Phase::Inhale, 0.0, 2.0, 12.0), 12.0);
        assert_eq!(indicator_position(Phase::Inhale, 1.0, 2.0, 12.0), 2.0);
        assert_eq!(indicator_position(Phase::Exhale, 0.0, 2.0, 12.0), 2.0);
        assert_eq!(indicator_position(Phase::Exhale, 0.5, 2.0, 12.0), 7.0);
    }
}
