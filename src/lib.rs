// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod runtime;
pub mod selector;
pub mod template;
pub mod ui;
pub mod workspace;

pub use error::{ExamError, Result};
