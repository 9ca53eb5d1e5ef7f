use crate::config::{Block, Requirement, TestDefinition};
use crate::template::{self, DEFAULT_TASK_TEMPLATE, DEFAULT_TEST_TEMPLATE};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

/// A concrete task drawn for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedTask {
    pub block: String,
    pub task: u32,
    pub name: String,
    pub task_template: String,
    pub test_template: String,
}

impl SelectedTask {
    pub fn new(block: &Block, task: u32) -> Self {
        Self {
            block: block.name.clone(),
            task,
            name: template::display_name(&block.name, task),
            task_template: block
                .task_template
                .clone()
                .unwrap_or_else(|| DEFAULT_TASK_TEMPLATE.to_string()),
            test_template: block
                .test_template
                .clone()
                .unwrap_or_else(|| DEFAULT_TEST_TEMPLATE.to_string()),
        }
    }

    pub fn task_file(&self) -> String {
        template::render(&self.task_template, &self.block, self.task)
    }

    pub fn test_file(&self) -> String {
        template::render(&self.test_template, &self.block, self.task)
    }

    pub fn test_name(&self) -> String {
        template::test_name(&self.test_file())
    }
}

/// Strategy for turning a test definition into concrete tasks
pub trait TaskSelector {
    fn select_tasks(&self, catalog: &[Block], test: &TestDefinition) -> Vec<SelectedTask>;
}

/// Uniform sampling without replacement, per requirement
pub struct RandomSelector;

impl TaskSelector for RandomSelector {
    fn select_tasks(&self, catalog: &[Block], test: &TestDefinition) -> Vec<SelectedTask> {
        let mut rng = rand::thread_rng();
        select_with_rng(catalog, test, &mut rng)
    }
}

pub fn select(catalog: &[Block], test: &TestDefinition) -> Vec<SelectedTask> {
    RandomSelector.select_tasks(catalog, test)
}

/// Pooled tasks of one requirement: every task of every named block that
/// exists in the catalog. Unknown and empty blocks contribute nothing, and a
/// block named twice in the same group is pooled once.
pub fn available_tasks(catalog: &[Block], requirement: &Requirement) -> Vec<SelectedTask> {
    requirement
        .block_names()
        .unique()
        .filter_map(|name| catalog.iter().find(|b| b.name == name))
        .flat_map(|block| (1..=block.task_count).map(move |task| SelectedTask::new(block, task)))
        .collect()
}

pub fn select_with_rng<R: Rng + ?Sized>(
    catalog: &[Block],
    test: &TestDefinition,
    rng: &mut R,
) -> Vec<SelectedTask> {
    let mut selected = Vec::new();

    for requirement in &test.requirements {
        let mut pool = available_tasks(catalog, requirement);
        let amount = (requirement.count as usize).min(pool.len());
        if amount < requirement.count as usize {
            tracing::debug!(
                group = %requirement.blocks,
                requested = requirement.count,
                available = pool.len(),
                "requirement capped to available tasks"
            );
        }

        // Partial Fisher-Yates: the first slice holds the drawn tasks in draw order
        let (drawn, _) = pool.partial_shuffle(rng, amount);
        selected.extend(drawn.iter().cloned());
    }

    selected
}
