use crate::error::{ExamError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

/// Upper bound on the number of tasks a single block may hold
pub const MAX_TASKS_PER_BLOCK: u32 = 100;

/// A named category of tasks. Task indices run from 1 to `task_count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    #[serde(rename = "task")]
    pub task_count: u32,
    #[serde(rename = "template", default, skip_serializing_if = "Option::is_none")]
    pub task_template: Option<String>,
    #[serde(rename = "testTemplate", default, skip_serializing_if = "Option::is_none")]
    pub test_template: Option<String>,
}

impl Block {
    pub fn new(name: impl Into<String>, task_count: u32) -> Self {
        Self {
            name: name.into(),
            task_count,
            task_template: None,
            test_template: None,
        }
    }

    pub fn label(&self) -> String {
        format!("{} (tasks: {})", self.name, self.task_count)
    }
}

/// One `(block group, count)` pair of a test definition.
///
/// `blocks` is a whitespace-separated group of block names whose tasks are
/// pooled together before sampling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirement {
    #[serde(rename = "block")]
    pub blocks: String,
    #[serde(rename = "task")]
    pub count: u32,
}

impl Requirement {
    pub fn new(blocks: impl Into<String>, count: u32) -> Self {
        Self {
            blocks: blocks.into(),
            count,
        }
    }

    pub fn block_names(&self) -> impl Iterator<Item = &str> {
        self.blocks.split_whitespace()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestDefinition {
    #[serde(rename = "time")]
    pub duration_secs: i64,
    #[serde(rename = "blocks", default)]
    pub requirements: Vec<Requirement>,
}

impl TestDefinition {
    pub fn new(duration_secs: i64, requirements: Vec<Requirement>) -> Self {
        Self {
            duration_secs,
            requirements,
        }
    }

    /// Label shown in listings, numbered from 1
    pub fn label(&self, index: usize) -> String {
        format!("Test {} ({} sec)", index + 1, self.duration_secs)
    }

    pub fn summary(&self) -> String {
        if self.requirements.is_empty() {
            return "no blocks".to_string();
        }
        self.requirements
            .iter()
            .map(|r| format!("{}: {} tasks", r.blocks, r.count))
            .join(", ")
    }
}

/// The persisted workspace configuration: the task catalog plus the tests
/// that draw from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub tests: Vec<TestDefinition>,
}

impl Config {
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn test(&self, index: usize) -> Result<&TestDefinition> {
        self.tests.get(index).ok_or(ExamError::TestNotFound(index))
    }

    pub fn add_block(&mut self, name: &str) -> Result<&Block> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ExamError::InvalidBlockName(name.to_string()));
        }
        if self.block(name).is_some() {
            return Err(ExamError::BlockExists(name.to_string()));
        }
        self.blocks.push(Block::new(name, 0));
        tracing::info!(block = name, "block added");
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    /// Grows the block by one task and returns the new task's index.
    pub fn add_task(&mut self, block: &str) -> Result<u32> {
        let entry = self
            .blocks
            .iter_mut()
            .find(|b| b.name == block)
            .ok_or_else(|| ExamError::BlockNotFound(block.to_string()))?;

        if entry.task_count >= MAX_TASKS_PER_BLOCK {
            return Err(ExamError::TaskLimit {
                block: block.to_string(),
                limit: MAX_TASKS_PER_BLOCK,
            });
        }
        entry.task_count += 1;
        tracing::info!(block, task = entry.task_count, "task added");
        Ok(entry.task_count)
    }

    /// Appends a test with no requirements and returns its index.
    pub fn add_test(&mut self, duration_secs: i64) -> Result<usize> {
        if duration_secs <= 0 {
            return Err(ExamError::InvalidDuration(duration_secs));
        }
        self.tests.push(TestDefinition::new(duration_secs, Vec::new()));
        tracing::info!(duration_secs, "test added");
        Ok(self.tests.len() - 1)
    }

    pub fn add_requirement(&mut self, test: usize, blocks: &str, count: u32) -> Result<()> {
        let unknown = blocks
            .split_whitespace()
            .filter(|name| self.block(name).is_none())
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            tracing::warn!(?unknown, "requirement names blocks missing from the catalog");
        }

        let definition = self
            .tests
            .get_mut(test)
            .ok_or(ExamError::TestNotFound(test))?;
        definition.requirements.push(Requirement::new(blocks, count));
        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store backed by `config.json` at the root of `workspace`
    pub fn for_workspace<P: AsRef<Path>>(workspace: P) -> Self {
        Self {
            path: workspace.as_ref().join(CONFIG_FILE),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or malformed files yield an empty config.
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), %err, "no config, using empty");
                return Config::default();
            }
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "unreadable config, using empty");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
