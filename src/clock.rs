//! Countdown state machine for the active session.
//!
//! The clock never reads the wall clock itself: callers hand it the current
//! [`Instant`] through [`SessionClock::poll`], and every tick that has become
//! due since the last poll is applied, one at a time, in order.

use std::time::{Duration, Instant};

pub const TICK: Duration = Duration::from_secs(1);

pub const EXPIRED_LABEL: &str = "Time is up!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ClockState {
    Idle,
    Running,
    Expired,
}

/// How close the session is to running out, relative to its full duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Urgency {
    Normal,
    Warning,
    Alert,
    Expired,
}

impl Urgency {
    /// Alert at 10% of `total` or less, warning at 30% or less (both rounded
    /// down to whole seconds).
    pub fn from_remaining(remaining_secs: u64, total_secs: u64) -> Self {
        // floor(total * 3 / 10) without overflowing near u64::MAX
        let warning_secs = total_secs / 10 * 3 + total_secs % 10 * 3 / 10;
        if remaining_secs == 0 {
            Urgency::Expired
        } else if remaining_secs <= total_secs / 10 {
            Urgency::Alert
        } else if remaining_secs <= warning_secs {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}

/// The one pending tick deadline. Dropping it cancels the tick stream.
#[derive(Debug, Clone, Copy)]
struct TickSchedule {
    next_due: Instant,
}

#[derive(Debug)]
pub struct SessionClock {
    state: ClockState,
    total_secs: u64,
    remaining_secs: u64,
    schedule: Option<TickSchedule>,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            state: ClockState::Idle,
            total_secs: 0,
            remaining_secs: 0,
            schedule: None,
        }
    }

    /// Restarts the countdown from `total_secs`, discarding any schedule in
    /// flight. Non-positive durations go straight to `Expired`.
    pub fn start(&mut self, total_secs: i64, now: Instant) {
        self.schedule = None;

        let total = total_secs.max(0) as u64;
        self.total_secs = total;
        self.remaining_secs = total;

        if total == 0 {
            self.state = ClockState::Expired;
        } else {
            self.state = ClockState::Running;
            self.schedule = Some(TickSchedule {
                next_due: now + TICK,
            });
        }
    }

    pub fn stop(&mut self) {
        self.schedule = None;
        self.state = ClockState::Idle;
        self.total_secs = 0;
        self.remaining_secs = 0;
    }

    /// Applies every tick due at `now` and returns how many fired.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while let Some(TickSchedule { next_due }) = self.schedule {
            if now < next_due {
                break;
            }
            self.schedule = Some(TickSchedule {
                next_due: next_due + TICK,
            });
            self.tick();
            fired += 1;
        }
        fired
    }

    fn tick(&mut self) {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.schedule = None;
            self.state = ClockState::Expired;
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// Whether a tick stream is currently scheduled
    pub fn is_ticking(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn urgency(&self) -> Urgency {
        Urgency::from_remaining(self.remaining_secs, self.total_secs)
    }

    /// `m:ss` while time remains, [`EXPIRED_LABEL`] afterwards
    pub fn timer_text(&self) -> String {
        if self.remaining_secs == 0 {
            return EXPIRED_LABEL.to_string();
        }
        format!("{}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }
}
