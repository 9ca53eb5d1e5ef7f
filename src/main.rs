use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use examview::{
    app::{App, Effect},
    app_dirs::AppDirs,
    config::{Config, ConfigStore},
    runtime::{CrosstermEventSource, EventSource, ExamEvent, FixedTicker, Runner, Ticker},
    selector,
    ui::ui,
    workspace::{Workspace, DEFAULT_RUNNER},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, BufRead, Stdout, Write},
    path::PathBuf,
    sync::Mutex,
    time::Instant,
};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "EXAMVIEW_LOG";
const DEFAULT_LOG_FILTER: &str = "examview=info";

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// timed coding-exam sessions with randomized tasks and a live countdown
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Keeps a bank of task blocks in a workspace, draws randomized exam sessions from it and runs them against a countdown."
)]
pub struct Cli {
    /// workspace root holding config.json and the src/ task tree
    #[clap(short = 'w', long, default_value = ".")]
    workspace: PathBuf,

    /// command used to run a task's tests; the test name is appended
    #[clap(short = 'r', long, default_value = DEFAULT_RUNNER)]
    runner: String,

    /// editor for task files; falls back to $EDITOR, then vi
    #[clap(short = 'e', long)]
    editor: Option<String>,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// write an empty config.json
    Init {
        /// overwrite an existing config
        #[clap(long)]
        force: bool,
    },
    /// add a block of tasks and create its directory
    AddBlock { name: String },
    /// add the next task to a block and create its empty files
    AddTask { block: String },
    /// add a test with the given time budget in seconds
    AddTest { seconds: i64 },
    /// require COUNT tasks drawn from a group of blocks ("algo graphs")
    AddRequirement {
        #[clap(value_parser = test_number)]
        test: usize,
        blocks: String,
        count: u32,
    },
    /// list blocks and tests
    List,
    /// draw tasks for a test once and print them
    Select {
        #[clap(value_parser = test_number)]
        test: usize,
    },
    /// open the session view, optionally starting a test right away
    Run {
        #[clap(value_parser = test_number)]
        test: Option<usize>,
    },
}

/// Tests are numbered from 1 on the command line
fn test_number(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    n.checked_sub(1)
        .ok_or_else(|| "tests are numbered from 1".to_string())
}

impl Cli {
    fn workspace(&self) -> Workspace {
        let workspace = Workspace::new(&self.workspace).with_runner(self.runner.clone());
        match &self.editor {
            Some(editor) => workspace.with_editor(editor.clone()),
            None => workspace,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let workspace = cli.workspace();

    init_tracing(matches!(cli.command, None | Some(Commands::Run { .. })));

    match cli.command {
        None => run_tui(workspace, None),
        Some(command) => execute_command(command, &workspace, &mut io::stdout()),
    }
}

/// The TUI owns the terminal, so its log goes to a file.
fn init_tracing(tui: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if !tui {
        builder.with_writer(io::stderr).init();
        return;
    }

    let log_file = AppDirs::log_path().and_then(|path| {
        fs::create_dir_all(path.parent()?).ok()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match log_file {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        None => builder.with_writer(io::sink).init(),
    }
}

fn execute_command(
    command: Commands,
    workspace: &Workspace,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let store = workspace.config_store();

    match command {
        Commands::Init { force } => {
            if store.path().exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    store.path().display()
                )
                .into());
            }
            store.save(&Config::default())?;
            writeln!(out, "Created {}", store.path().display())?;
        }
        Commands::AddBlock { name } => {
            let mut config = store.load();
            config.add_block(&name)?;
            let dir = workspace.create_block_dir(&name)?;
            store.save(&config)?;
            writeln!(out, "Added block {name} ({})", dir.display())?;
        }
        Commands::AddTask { block } => {
            let mut config = store.load();
            let index = config.add_task(&block)?;
            if let Some(entry) = config.block(&block) {
                let files = workspace.create_task_files(entry, index)?;
                writeln!(out, "Added task {index} to {block}")?;
                writeln!(out, "  {}", files.task.display())?;
                writeln!(out, "  {}", files.test.display())?;
            }
            store.save(&config)?;
        }
        Commands::AddTest { seconds } => {
            let mut config = store.load();
            let index = config.add_test(seconds)?;
            store.save(&config)?;
            writeln!(out, "Added {}", config.test(index)?.label(index))?;
        }
        Commands::AddRequirement {
            test,
            blocks,
            count,
        } => {
            let mut config = store.load();
            config.add_requirement(test, &blocks, count)?;
            store.save(&config)?;
            let definition = config.test(test)?;
            writeln!(out, "{}: {}", definition.label(test), definition.summary())?;
        }
        Commands::List => {
            let config = store.load();
            writeln!(out, "Blocks:")?;
            for block in &config.blocks {
                writeln!(out, "  {}", block.label())?;
            }
            writeln!(out, "Tests:")?;
            for (i, test) in config.tests.iter().enumerate() {
                writeln!(out, "  {}: {}", test.label(i), test.summary())?;
            }
        }
        Commands::Select { test } => {
            let config = store.load();
            let definition = config.test(test)?;
            for task in selector::select(&config.blocks, definition) {
                let files = workspace.task_files(&task);
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    task.name,
                    files.task.display(),
                    files.test.display()
                )?;
            }
        }
        Commands::Run { test } => return run_tui(workspace.clone(), test),
    }

    Ok(())
}

fn run_tui(workspace: Workspace, test: Option<usize>) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut app = App::new(workspace);
    if let Some(index) = test {
        app.start_test(index, Instant::now())?;
    }

    let mut terminal = enter_terminal()?;
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let result = event_loop(&mut terminal, &mut app, &runner);
    leave_terminal(&mut terminal)?;
    result
}

fn event_loop<E: EventSource, T: Ticker>(
    terminal: &mut Tui,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        if app.needs_redraw() {
            terminal.draw(|f| ui(app, f))?;
        }

        let event = runner.step();
        let now = Instant::now();
        app.on_tick(now);

        let effect = match event {
            ExamEvent::Key(key) => app.on_key(key, now),
            ExamEvent::Resize => {
                app.request_redraw();
                Effect::None
            }
            ExamEvent::Tick => Effect::None,
        };

        match effect {
            Effect::None => {}
            Effect::Quit => break,
            Effect::OpenTask(task) => {
                let workspace = app.workspace.clone();
                let outcome = suspended(terminal, || workspace.open_task(&task))?;
                if let Err(err) = outcome {
                    app.set_status(err.to_string());
                }
                app.request_redraw();
            }
            Effect::RunTest(task) => {
                let workspace = app.workspace.clone();
                let outcome = suspended(terminal, || {
                    let status = workspace.run_test(&task)?;
                    println!("\n{} finished: {status}", task.name);
                    println!("Press enter to return to the session");
                    let mut line = String::new();
                    stdin().lock().read_line(&mut line)?;
                    Ok(status)
                })?;
                match outcome {
                    Ok(status) => app.set_status(format!("{}: {status}", task.name)),
                    Err(err) => app.set_status(err.to_string()),
                }
            }
        }
    }

    Ok(())
}

/// Hands the terminal to `f`, restoring the TUI afterwards. The countdown
/// keeps running; missed ticks are applied on the next poll.
fn suspended<R>(
    terminal: &mut Tui,
    f: impl FnOnce() -> examview::Result<R>,
) -> Result<examview::Result<R>, Box<dyn Error>> {
    leave_terminal(terminal)?;
    let outcome = f();
    enable_raw_mode()?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal.clear()?;
    Ok(outcome)
}

fn enter_terminal() -> Result<Tui, Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn leave_terminal(terminal: &mut Tui) -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn run(workspace: &Workspace, args: &[&str]) -> Result<String, Box<dyn Error>> {
        let cli = Cli::try_parse_from(std::iter::once("examview").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        execute_command(cli.command.unwrap(), workspace, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["examview"]).unwrap();
        assert_eq!(cli.workspace, PathBuf::from("."));
        assert_eq!(cli.runner, DEFAULT_RUNNER);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_cli_test_numbers_start_at_one() {
        let cli = Cli::try_parse_from(["examview", "select", "2"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Select { test: 1 }));
        assert!(Cli::try_parse_from(["examview", "select", "0"]).is_err());
        assert!(Cli::try_parse_from(["examview", "select", "x"]).is_err());
    }

    #[test]
    fn test_cli_run_without_test() {
        let cli = Cli::try_parse_from(["examview", "-w", "/exam", "run"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run { test: None }));
        assert_eq!(cli.workspace().root(), std::path::Path::new("/exam"));
    }

    #[test]
    fn test_cli_custom_runner() {
        let cli = Cli::try_parse_from(["examview", "--runner", "cargo test", "list"]).unwrap();
        assert_eq!(cli.runner, "cargo test");
    }

    #[test]
    fn test_cli_custom_editor() {
        let cli = Cli::try_parse_from(["examview", "-e", "code -w", "list"]).unwrap();
        assert_eq!(cli.editor.as_deref(), Some("code -w"));

        let block = examview::config::Block::new("algo", 1);
        let task = examview::selector::SelectedTask::new(&block, 1);
        let cmd = cli.workspace().editor_command(&task);
        assert_eq!(cmd.get_program(), "code");
        assert_eq!(cmd.get_args().next().and_then(|a| a.to_str()), Some("-w"));
    }

    #[test]
    fn test_building_a_catalog() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());

        run(&ws, &["init"]).unwrap();
        run(&ws, &["add-block", "algo"]).unwrap();
        let out = run(&ws, &["add-task", "algo"]).unwrap();
        assert!(out.contains("algo01.ts"));
        run(&ws, &["add-task", "algo"]).unwrap();
        run(&ws, &["add-test", "600"]).unwrap();
        let out = run(&ws, &["add-requirement", "1", "algo", "1"]).unwrap();
        assert_eq!(out.trim(), "Test 1 (600 sec): algo: 1 tasks");

        let listing = run(&ws, &["list"]).unwrap();
        assert!(listing.contains("algo (tasks: 2)"));
        assert!(listing.contains("Test 1 (600 sec)"));
        assert!(dir.path().join("src/algo/algo02.test.ts").is_file());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        run(&ws, &["init"]).unwrap();
        run(&ws, &["add-block", "algo"]).unwrap();

        assert!(run(&ws, &["init"]).is_err());
        assert_eq!(ws.config_store().load().blocks.len(), 1);

        run(&ws, &["init", "--force"]).unwrap();
        assert!(ws.config_store().load().blocks.is_empty());
    }

    #[test]
    fn test_select_prints_one_line_per_task() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        run(&ws, &["add-block", "algo"]).unwrap();
        for _ in 0..4 {
            run(&ws, &["add-task", "algo"]).unwrap();
        }
        run(&ws, &["add-test", "60"]).unwrap();
        run(&ws, &["add-requirement", "1", "algo missing", "10"]).unwrap();

        let out = run(&ws, &["select", "1"]).unwrap();
        assert_eq!(out.lines().count(), 4);
        assert!(out.lines().all(|l| l.starts_with("algo0")));
    }

    #[test]
    fn test_errors_surface_from_commands() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        assert!(run(&ws, &["add-task", "nope"]).is_err());
        assert!(run(&ws, &["add-test", "0"]).is_err());
        assert!(run(&ws, &["select", "3"]).is_err());
    }
}
