use directories::ProjectDirs;
use std::path::PathBuf;

pub const LOG_FILE: &str = "examview.log";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where the TUI writes its log, since it owns the terminal
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("examview");
            Some(state_dir.join(LOG_FILE))
        } else {
            ProjectDirs::from("", "", "examview")
                .map(|proj_dirs| proj_dirs.data_local_dir().join(LOG_FILE))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_names_the_log_file() {
        if let Some(path) = AppDirs::log_path() {
            assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(LOG_FILE));
            assert!(path.to_string_lossy().contains("examview"));
        }
    }
}
