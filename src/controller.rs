use crate::clock::{ClockState, SessionClock, Urgency};
use crate::config::{Block, TestDefinition};
use crate::error::{ExamError, Result};
use crate::selector::{SelectedTask, TaskSelector};
use chrono::{DateTime, Local};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Read-only snapshot of the session handed to listeners
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    tasks: &'a [SelectedTask],
    clock: &'a SessionClock,
    started_at: Option<DateTime<Local>>,
}

impl<'a> SessionView<'a> {
    pub fn tasks(&self) -> &'a [SelectedTask] {
        self.tasks
    }

    pub fn state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.clock.remaining_secs()
    }

    pub fn total_secs(&self) -> u64 {
        self.clock.total_secs()
    }

    pub fn urgency(&self) -> Urgency {
        self.clock.urgency()
    }

    pub fn timer_text(&self) -> String {
        self.clock.timer_text()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }
}

/// Presentation boundary: told about every change to the session
pub trait SessionListener {
    fn session_changed(&mut self, session: &SessionView<'_>);
}

pub struct NoopListener;

impl SessionListener for NoopListener {
    fn session_changed(&mut self, _session: &SessionView<'_>) {}
}

/// Listener that only records that something changed. Cloned handles share
/// the flag, so the view can check it while the controller owns a copy.
#[derive(Debug, Clone, Default)]
pub struct RedrawFlag(Rc<Cell<bool>>);

impl RedrawFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a redraw was requested and resets the flag
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }

    pub fn request(&self) {
        self.0.set(true);
    }
}

impl SessionListener for RedrawFlag {
    fn session_changed(&mut self, _session: &SessionView<'_>) {
        self.request();
    }
}

/// Owns the single active session: its tasks and its countdown.
#[derive(Debug)]
pub struct SessionController<L: SessionListener> {
    tasks: Vec<SelectedTask>,
    clock: SessionClock,
    started_at: Option<DateTime<Local>>,
    listener: L,
}

impl<L: SessionListener> SessionController<L> {
    pub fn new(listener: L) -> Self {
        Self {
            tasks: Vec::new(),
            clock: SessionClock::new(),
            started_at: None,
            listener,
        }
    }

    /// Replaces whatever session is active with a new one and notifies once.
    pub fn start(&mut self, tasks: Vec<SelectedTask>, duration_secs: i64, now: Instant) {
        if self.clock.state() != ClockState::Idle {
            tracing::info!(
                remaining_secs = self.clock.remaining_secs(),
                "replacing active session"
            );
        }
        self.clock.stop();

        self.tasks = tasks;
        self.started_at = Some(Local::now());
        self.clock.start(duration_secs, now);
        tracing::info!(
            tasks = self.tasks.len(),
            duration_secs,
            state = %self.clock.state(),
            "session started"
        );

        self.notify();
    }

    /// Draws tasks for `test` and starts a session with them. Returns the
    /// number of tasks drawn.
    pub fn start_test<S: TaskSelector>(
        &mut self,
        selector: &S,
        catalog: &[Block],
        test: &TestDefinition,
        now: Instant,
    ) -> usize {
        let tasks = selector.select_tasks(catalog, test);
        let drawn = tasks.len();
        self.start(tasks, test.duration_secs, now);
        drawn
    }

    pub fn clear(&mut self) {
        self.clock.stop();
        self.tasks.clear();
        self.started_at = None;
        tracing::info!("session cleared");
        self.notify();
    }

    /// Applies due ticks, notifying once per tick. Returns the tick count.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let was_running = self.clock.state() == ClockState::Running;
        let urgency = self.clock.urgency();
        let fired = self.clock.poll(now);
        for _ in 0..fired {
            self.notify();
        }
        if was_running && self.clock.state() == ClockState::Expired {
            tracing::info!(tasks = self.tasks.len(), "session time expired");
        } else if was_running && self.clock.urgency() != urgency {
            tracing::info!(
                urgency = %self.clock.urgency(),
                remaining_secs = self.clock.remaining_secs(),
                "session urgency raised"
            );
        }
        fired
    }

    pub fn current_tasks(&self) -> &[SelectedTask] {
        &self.tasks
    }

    pub fn task(&self, index: usize) -> Result<&SelectedTask> {
        self.tasks.get(index).ok_or(ExamError::TaskNotFound(index))
    }

    pub fn remaining_secs(&self) -> u64 {
        self.clock.remaining_secs()
    }

    pub fn urgency(&self) -> Urgency {
        self.clock.urgency()
    }

    pub fn state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn is_ticking(&self) -> bool {
        self.clock.is_ticking()
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            tasks: &self.tasks,
            clock: &self.clock,
            started_at: self.started_at,
        }
    }

    #[cfg(test)]
    pub(crate) fn listener(&self) -> &L {
        &self.listener
    }

    fn notify(&mut self) {
        let view = SessionView {
            tasks: &self.tasks,
            clock: &self.clock,
            started_at: self.started_at,
        };
        self.listener.session_changed(&view);
    }
}
