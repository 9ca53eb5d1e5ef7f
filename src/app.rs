use crate::config::{Config, ConfigStore};
use crate::controller::{RedrawFlag, SessionController};
use crate::error::Result;
use crate::selector::{RandomSelector, SelectedTask};
use crate::workspace::Workspace;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Blocks,
    Tests,
    Session,
}

impl Pane {
    fn next(self) -> Self {
        match self {
            Pane::Blocks => Pane::Tests,
            Pane::Tests => Pane::Session,
            Pane::Session => Pane::Blocks,
        }
    }

    fn prev(self) -> Self {
        match self {
            Pane::Blocks => Pane::Session,
            Pane::Tests => Pane::Blocks,
            Pane::Session => Pane::Tests,
        }
    }
}

/// Work the event loop has to do outside the terminal UI
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Quit,
    OpenTask(SelectedTask),
    RunTest(SelectedTask),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    pub block: usize,
    pub test: usize,
    pub task: usize,
}

#[derive(Debug)]
pub struct App {
    pub workspace: Workspace,
    pub config: Config,
    pub session: SessionController<RedrawFlag>,
    pub pane: Pane,
    pub cursors: Cursors,
    pub status: Option<String>,
    redraw: RedrawFlag,
}

impl App {
    pub fn new(workspace: Workspace) -> Self {
        let config = workspace.config_store().load();
        let redraw = RedrawFlag::new();
        redraw.request();
        Self {
            workspace,
            config,
            session: SessionController::new(redraw.clone()),
            pane: Pane::Tests,
            cursors: Cursors::default(),
            status: None,
            redraw,
        }
    }

    pub fn reload(&mut self) {
        self.config = self.workspace.config_store().load();
        self.clamp_cursors();
        self.set_status(format!(
            "Loaded {} blocks and {} tests",
            self.config.blocks.len(),
            self.config.tests.len()
        ));
    }

    /// Starts test `index`, replacing any running session.
    pub fn start_test(&mut self, index: usize, now: Instant) -> Result<usize> {
        let test = self.config.test(index)?.clone();
        let drawn = self
            .session
            .start_test(&RandomSelector, &self.config.blocks, &test, now);
        self.cursors.task = 0;
        self.pane = Pane::Session;
        self.set_status(format!("{} started with {drawn} tasks", test.label(index)));
        Ok(drawn)
    }

    pub fn clear_session(&mut self) {
        self.session.clear();
        self.cursors.task = 0;
        self.set_status("Session cleared");
    }

    /// Adds a task to the highlighted block and creates its files. Returns
    /// the new task so it can be opened for editing.
    pub fn add_task_to_selected_block(&mut self) -> Result<Option<SelectedTask>> {
        let Some(name) = self
            .config
            .blocks
            .get(self.cursors.block)
            .map(|b| b.name.clone())
        else {
            return Ok(None);
        };

        let index = self.config.add_task(&name)?;
        let Some(block) = self.config.block(&name) else {
            return Ok(None);
        };
        let task = SelectedTask::new(block, index);
        let saved = self
            .workspace
            .create_task_files(block, index)
            .and_then(|_| self.workspace.config_store().save(&self.config));
        if let Err(err) = saved {
            // keep the in-memory catalog in step with what is on disk
            self.config = self.workspace.config_store().load();
            return Err(err);
        }
        self.set_status(format!("Added task {index} to {name}"));
        Ok(Some(task))
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.session.poll(now);
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Effect {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Effect::Quit;
        }
        self.redraw.request();

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Effect::Quit,
            KeyCode::Tab => self.pane = self.pane.next(),
            KeyCode::BackTab => self.pane = self.pane.prev(),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Char('c') => self.clear_session(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('a') if self.pane == Pane::Blocks => {
                match self.add_task_to_selected_block() {
                    Ok(Some(task)) => return Effect::OpenTask(task),
                    Ok(None) => {}
                    Err(err) => self.set_status(err.to_string()),
                }
            }
            KeyCode::Char('t') if self.pane == Pane::Session => {
                if let Some(task) = self.selected_task() {
                    return Effect::RunTest(task.clone());
                }
            }
            KeyCode::Enter => match self.pane {
                Pane::Tests => {
                    if let Err(err) = self.start_test(self.cursors.test, now) {
                        self.set_status(err.to_string());
                    }
                }
                Pane::Session => {
                    if let Some(task) = self.selected_task() {
                        return Effect::OpenTask(task.clone());
                    }
                }
                Pane::Blocks => {}
            },
            _ => {}
        }
        Effect::None
    }

    pub fn selected_task(&self) -> Option<&SelectedTask> {
        self.session.task(self.cursors.task).ok()
    }

    /// Whether anything changed since the last call
    pub fn needs_redraw(&self) -> bool {
        self.redraw.take()
    }

    pub fn request_redraw(&self) {
        self.redraw.request();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
        self.redraw.request();
    }

    fn move_cursor(&mut self, delta: isize) {
        let (cursor, len) = match self.pane {
            Pane::Blocks => (&mut self.cursors.block, self.config.blocks.len()),
            Pane::Tests => (&mut self.cursors.test, self.config.tests.len()),
            Pane::Session => (&mut self.cursors.task, self.session.current_tasks().len()),
        };
        if len == 0 {
            *cursor = 0;
            return;
        }
        *cursor = cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn clamp_cursors(&mut self) {
        self.cursors.block = self
            .cursors
            .block
            .min(self.config.blocks.len().saturating_sub(1));
        self.cursors.test = self
            .cursors
            .test
            .min(self.config.tests.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockState;
    use crate::config::{Block, Requirement, TestDefinition};
    use assert_matches::assert_matches;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with_config() -> (TempDir, App) {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let cfg = Config {
            blocks: vec![Block::new("algo", 5), Block::new("sql", 0)],
            tests: vec![
                TestDefinition::new(600, vec![Requirement::new("algo", 3)]),
                TestDefinition::new(60, vec![Requirement::new("algo", 1)]),
            ],
        };
        ws.config_store().save(&cfg).unwrap();
        (dir, App::new(ws))
    }

    #[test]
    fn loads_config_from_workspace() {
        let (_dir, app) = app_with_config();
        assert_eq!(app.config.blocks.len(), 2);
        assert_eq!(app.pane, Pane::Tests);
        assert!(app.needs_redraw());
        assert!(!app.needs_redraw());
    }

    #[test]
    fn enter_on_test_starts_session() {
        let (_dir, mut app) = app_with_config();
        let now = Instant::now();
        assert_eq!(app.on_key(key(KeyCode::Enter), now), Effect::None);
        assert_eq!(app.session.current_tasks().len(), 3);
        assert_eq!(app.session.state(), ClockState::Running);
        assert_eq!(app.pane, Pane::Session);
    }

    #[test]
    fn starting_another_test_replaces_the_session() {
        let (_dir, mut app) = app_with_config();
        let t0 = Instant::now();
        app.start_test(0, t0).unwrap();
        app.start_test(1, t0).unwrap();

        app.on_tick(t0 + Duration::from_secs(1));
        assert_eq!(app.session.remaining_secs(), 59);
        assert_eq!(app.session.current_tasks().len(), 1);
    }

    #[test]
    fn unknown_test_is_reported() {
        let (_dir, mut app) = app_with_config();
        assert_matches!(
            app.start_test(9, Instant::now()),
            Err(crate::error::ExamError::TestNotFound(9))
        );
    }

    #[test]
    fn session_keys_produce_effects() {
        let (_dir, mut app) = app_with_config();
        let now = Instant::now();
        app.start_test(0, now).unwrap();
        app.on_key(key(KeyCode::Down), now);
        let expected = app.session.current_tasks()[1].clone();

        assert_eq!(
            app.on_key(key(KeyCode::Enter), now),
            Effect::OpenTask(expected.clone())
        );
        assert_eq!(app.on_key(key(KeyCode::Char('t')), now), Effect::RunTest(expected));
        assert_eq!(app.on_key(key(KeyCode::Char('q')), now), Effect::Quit);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let (_dir, mut app) = app_with_config();
        let now = Instant::now();
        for _ in 0..5 {
            app.on_key(key(KeyCode::Down), now);
        }
        assert_eq!(app.cursors.test, 1);
        for _ in 0..5 {
            app.on_key(key(KeyCode::Up), now);
        }
        assert_eq!(app.cursors.test, 0);

        app.on_key(key(KeyCode::Tab), now);
        app.on_key(key(KeyCode::Down), now);
        assert_eq!(app.pane, Pane::Session);
        assert_eq!(app.cursors.task, 0);
    }

    #[test]
    fn clear_key_empties_session() {
        let (_dir, mut app) = app_with_config();
        let now = Instant::now();
        app.start_test(0, now).unwrap();
        app.on_key(key(KeyCode::Char('c')), now);
        assert!(app.session.current_tasks().is_empty());
        assert_eq!(app.session.state(), ClockState::Idle);
    }

    #[test]
    fn add_task_persists_and_creates_files() {
        let (dir, mut app) = app_with_config();
        let now = Instant::now();
        app.on_key(key(KeyCode::BackTab), now);
        assert_eq!(app.pane, Pane::Blocks);
        app.on_key(key(KeyCode::Down), now);
        let effect = app.on_key(key(KeyCode::Char('a')), now);

        assert_matches!(effect, Effect::OpenTask(task) if task.name == "sql01");
        assert_eq!(app.config.block("sql").unwrap().task_count, 1);
        assert!(dir.path().join("src/sql/sql01.ts").is_file());
        assert!(dir.path().join("src/sql/sql01.test.ts").is_file());
        let saved = app.workspace.config_store().load();
        assert_eq!(saved.block("sql").unwrap().task_count, 1);
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let (_dir, mut app) = app_with_config();
        let mut cfg = app.config.clone();
        cfg.add_test(30).unwrap();
        app.workspace.config_store().save(&cfg).unwrap();

        app.on_key(key(KeyCode::Char('r')), Instant::now());
        assert_eq!(app.config.tests.len(), 3);
        assert_eq!(app.status.as_deref(), Some("Loaded 2 blocks and 3 tests"));
    }
}
