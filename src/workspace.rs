use crate::config::{Block, FileConfigStore};
use crate::error::Result;
use crate::selector::SelectedTask;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

pub const DEFAULT_RUNNER: &str = "npm run test";
pub const FALLBACK_EDITOR: &str = "vi";

/// Where task sources live, relative to the workspace root
const SOURCE_DIR: &str = "src";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFiles {
    pub task: PathBuf,
    pub test: PathBuf,
}

/// Materializes tasks on disk and launches the tools that work on them
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    runner: String,
    editor: String,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let editor = std::env::var("EDITOR")
            .ok()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_EDITOR.to_string());
        Self {
            root: root.as_ref().to_path_buf(),
            runner: DEFAULT_RUNNER.to_string(),
            editor,
        }
    }

    pub fn with_runner(mut self, runner: impl Into<String>) -> Self {
        self.runner = runner.into();
        self
    }

    pub fn with_editor(mut self, editor: impl Into<String>) -> Self {
        self.editor = editor.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_store(&self) -> FileConfigStore {
        FileConfigStore::for_workspace(&self.root)
    }

    pub fn block_dir(&self, block: &str) -> PathBuf {
        self.root.join(SOURCE_DIR).join(block)
    }

    pub fn create_block_dir(&self, block: &str) -> Result<PathBuf> {
        let dir = self.block_dir(block);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn task_files(&self, task: &SelectedTask) -> TaskFiles {
        let dir = self.block_dir(&task.block);
        TaskFiles {
            task: dir.join(task.task_file()),
            test: dir.join(task.test_file()),
        }
    }

    /// Creates empty task and test files for task `index` of `block`.
    /// Existing files are left untouched.
    pub fn create_task_files(&self, block: &Block, index: u32) -> Result<TaskFiles> {
        self.create_block_dir(&block.name)?;
        let files = self.task_files(&SelectedTask::new(block, index));
        for path in [&files.task, &files.test] {
            if !path.exists() {
                fs::write(path, b"")?;
                tracing::debug!(path = %path.display(), "created task file");
            }
        }
        Ok(files)
    }

    /// `<runner> <test name>`, run from the workspace root
    pub fn test_command(&self, task: &SelectedTask) -> Command {
        let mut cmd = command_line(&self.runner);
        cmd.arg(task.test_name()).current_dir(&self.root);
        cmd
    }

    /// The editor opened on the task file and its test
    pub fn editor_command(&self, task: &SelectedTask) -> Command {
        let files = self.task_files(task);
        let mut cmd = command_line(&self.editor);
        cmd.arg(files.task).arg(files.test).current_dir(&self.root);
        cmd
    }

    pub fn open_task(&self, task: &SelectedTask) -> Result<ExitStatus> {
        tracing::info!(task = %task.name, editor = %self.editor, "opening task");
        Ok(self.editor_command(task).status()?)
    }

    pub fn run_test(&self, task: &SelectedTask) -> Result<ExitStatus> {
        tracing::info!(task = %task.name, runner = %self.runner, "running test");
        let status = self.test_command(task).status()?;
        tracing::info!(task = %task.name, %status, "test finished");
        Ok(status)
    }
}

fn command_line(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let mut cmd = Command::new(parts.next().unwrap_or_default());
    cmd.args(parts);
    cmd
}
