//! The session clock: one anchor-based time basis for a breathing session.
//!
//! Every elapsed quantity is recomputed from a wall-clock anchor plus the value
//! frozen when that anchor was set. Nothing here sleeps, reads the system
//! clock, or performs I/O; callers pass the current [`Instant`] in.

use std::time::Instant;

/// Default length of one inhale or exhale, in seconds.
pub const DEFAULT_PHASE_SECS: f64 = 5.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Inhale,
    Exhale,
}

impl Phase {
    pub fn next(self) -> Self {
        match self {
            Phase::Inhale => Phase::Exhale,
            Phase::Exhale => Phase::Inhale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    NotStarted,
    Running,
    Paused,
    Complete,
}

/// Boundary reported by [`SessionClock::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// `completed` just ended. `next` is `None` when the session ended with it.
    PhaseCompleted {
        completed: Phase,
        next: Option<Phase>,
    },
    SessionCompleted,
}

/// Read-only view of the clock handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub phase_elapsed_secs: f64,
    pub phase_duration_secs: f64,
    pub session_elapsed_secs: f64,
    pub time_limit_secs: Option<u64>,
    pub cycles_completed: u32,
    pub running: bool,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct SessionClock {
    status: ClockStatus,
    phase: Phase,
    phase_duration_secs: f64,
    phase_elapsed_secs: f64,
    session_elapsed_secs: f64,
    time_limit_secs: Option<u64>,
    cycles_completed: u32,
    // values frozen when the matching anchor was last set
    phase_base_secs: f64,
    session_base_secs: f64,
    phase_anchor: Option<Instant>,
    session_anchor: Option<Instant>,
}

impl SessionClock {
    pub fn new(phase_duration_secs: f64) -> Self {
        debug_assert!(
            phase_duration_secs.is_finite() && phase_duration_secs > 0.0,
            "phase duration must be positive"
        );
        Self {
            status: ClockStatus::NotStarted,
            phase: Phase::Inhale,
            phase_duration_secs,
            phase_elapsed_secs: 0.0,
            session_elapsed_secs: 0.0,
            time_limit_secs: None,
            cycles_completed: 0,
            phase_base_secs: 0.0,
            session_base_secs: 0.0,
            phase_anchor: None,
            session_anchor: None,
        }
    }

    /// Begins a fresh session anchored at `now`.
    ///
    /// Returns `false` and changes nothing when a session is already running.
    pub fn start(&mut self, now: Instant, time_limit_secs: Option<u64>) -> bool {
        if self.status == ClockStatus::Running {
            return false;
        }
        *self = Self {
            status: ClockStatus::Running,
            time_limit_secs,
            phase_anchor: Some(now),
            session_anchor: Some(now),
            ..Self::new(self.phase_duration_secs)
        };
        true
    }

    /// Freezes both counters at their values at `now`.
    ///
    /// Any boundary crossed since the last advance is resolved first, so the
    /// returned events must be dispatched like those of [`Self::advance`]. If
    /// that resolution completes the session the clock ends up `Complete`
    /// rather than `Paused`.
    pub fn pause(&mut self, now: Instant) -> Vec<ClockEvent> {
        if self.status != ClockStatus::Running {
            return Vec::new();
        }
        let events = self.advance(now);
        if self.status == ClockStatus::Running {
            self.freeze();
            self.status = ClockStatus::Paused;
        }
        events
    }

    /// Continues a paused session, re-anchoring at `now`.
    pub fn resume(&mut self, now: Instant) -> bool {
        if self.status != ClockStatus::Paused {
            return false;
        }
        self.phase_base_secs = self.phase_elapsed_secs;
        self.session_base_secs = self.session_elapsed_secs;
        self.phase_anchor = Some(now);
        self.session_anchor = Some(now);
        self.status = ClockStatus::Running;
        true
    }

    /// Recomputes elapsed time from the anchors and resolves a phase boundary.
    ///
    /// At most one transition happens per call. When the time since the phase
    /// anchor spans more than one full phase, the new phase starts at the
    /// remainder modulo the phase duration.
    pub fn advance(&mut self, now: Instant) -> Vec<ClockEvent> {
        if self.status != ClockStatus::Running {
            return Vec::new();
        }
        let (Some(session_anchor), Some(phase_anchor)) = (self.session_anchor, self.phase_anchor)
        else {
            return Vec::new();
        };

        // an instant older than the last sample never winds the counters back
        self.session_elapsed_secs = self
            .session_elapsed_secs
            .max(self.session_base_secs + secs_since(session_anchor, now));
        self.phase_elapsed_secs = self
            .phase_elapsed_secs
            .max(self.phase_base_secs + secs_since(phase_anchor, now));

        if self.phase_elapsed_secs < self.phase_duration_secs {
            return Vec::new();
        }

        let overshoot = self.phase_elapsed_secs - self.phase_duration_secs;
        let completed = self.phase;
        if completed == Phase::Exhale {
            self.cycles_completed = self.cycles_completed.saturating_add(1);
        }

        if completed == Phase::Exhale && self.time_limit_reached() {
            self.phase_elapsed_secs = self.phase_duration_secs;
            self.freeze();
            self.status = ClockStatus::Complete;
            return vec![
                ClockEvent::PhaseCompleted {
                    completed,
                    next: None,
                },
                ClockEvent::SessionCompleted,
            ];
        }

        self.phase = completed.next();
        self.phase_elapsed_secs = overshoot % self.phase_duration_secs;
        self.phase_base_secs = self.phase_elapsed_secs;
        self.phase_anchor = Some(now);

        vec![ClockEvent::PhaseCompleted {
            completed,
            next: Some(self.phase),
        }]
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            phase_elapsed_secs: self.phase_elapsed_secs,
            phase_duration_secs: self.phase_duration_secs,
            session_elapsed_secs: self.session_elapsed_secs,
            time_limit_secs: self.time_limit_secs,
            cycles_completed: self.cycles_completed,
            running: self.is_running(),
            complete: self.is_complete(),
        }
    }

    /// Back to a not-started clock with the same phase duration.
    pub fn reset(&mut self) {
        *self = Self::new(self.phase_duration_secs);
    }

    pub fn status(&self) -> ClockStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ClockStatus::Running
    }

    pub fn is_complete(&self) -> bool {
        self.status == ClockStatus::Complete
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_duration_secs(&self) -> f64 {
        self.phase_duration_secs
    }

    fn time_limit_reached(&self) -> bool {
        self.time_limit_secs
            .is_some_and(|limit| self.session_elapsed_secs >= limit as f64)
    }

    fn freeze(&mut self) {
        self.phase_base_secs = self.phase_elapsed_secs;
        self.session_base_secs = self.session_elapsed_secs;
        self.phase_anchor = None;
        self.session_anchor = None;
    }
}

fn secs_since(anchor: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(anchor).as_secs_f64()
}
