//! Where asciiforge keeps its config file, stored documents and logs.
//!
//! Everything hangs off two roots. `ASCIIFORGE_HOME`, when set, is used for
//! both. Otherwise development builds use the working directory and installed
//! builds use the platform config and data directories from `dirs`.

use std::path::{Path, PathBuf};

/// Environment variable that pins both roots to one directory
pub const HOME_ENV: &str = "ASCIIFORGE_HOME";

const APP_DIR: &str = "asciiforge";

/// True under `cargo run` or in a debug build
pub fn is_dev_mode() -> bool {
    std::env::var("CARGO").is_ok() || cfg!(debug_assertions)
}

/// The config and data roots for one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    pub config: PathBuf,
    pub data: PathBuf,
}

impl AppDirs {
    pub fn resolve() -> Self {
        let home = std::env::var_os(HOME_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::from_sources(home, is_dev_mode())
    }

    fn from_sources(home: Option<PathBuf>, dev_mode: bool) -> Self {
        if let Some(home) = home {
            return Self::single(home);
        }
        if dev_mode {
            return Self::single(PathBuf::from("."));
        }
        let data = dirs::data_dir()
            .map(|p| p.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."));
        // Only Linux separates config from data
        let config = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .map(|p| p.join(APP_DIR))
                .unwrap_or_else(|| data.clone())
        } else {
            data.clone()
        };
        Self { config, data }
    }

    fn single(root: PathBuf) -> Self {
        Self {
            config: root.clone(),
            data: root,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// One `<key>.json` per document lives here unless the config names another directory
    pub fn documents_dir(&self) -> PathBuf {
        self.data.join("documents")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data.join("logs")
    }

    /// Create the config root plus the documents and logs directories
    pub fn create_all(&self) -> std::io::Result<()> {
        let documents = self.documents_dir();
        let logs = self.logs_dir();
        for dir in [&self.config, &documents, &logs] {
            create_dir(dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> std::io::Result<()> {
    if dir.as_os_str().is_empty() || dir == Path::new(".") {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
}

pub fn config_file() -> PathBuf {
    AppDirs::resolve().config_file()
}

pub fn documents_dir() -> PathBuf {
    AppDirs::resolve().documents_dir()
}

pub fn logs_dir() -> PathBuf {
    AppDirs::resolve().logs_dir()
}

/// Create the directories asciiforge writes into. The documents directory is
/// created lazily by the file store in development builds.
pub fn ensure_directories() -> std::io::Result<()> {
    let dirs = AppDirs::resolve();
    if dirs.data == Path::new(".") {
        return Ok(());
    }
    dirs.create_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_mode_uses_working_directory() {
        let dirs = AppDirs::from_sources(None, true);
        assert_eq!(dirs.config_file(), PathBuf::from("./config.json"));
        assert_eq!(dirs.documents_dir(), PathBuf::from("./documents"));
        assert_eq!(dirs.logs_dir(), PathBuf::from("./logs"));
    }

    #[test]
    fn test_home_override_wins_over_dev_mode() {
        let dirs = AppDirs::from_sources(Some(PathBuf::from("/srv/ascii")), true);
        assert_eq!(dirs.config, dirs.data);
        assert_eq!(dirs.config_file(), PathBuf::from("/srv/ascii/config.json"));
        assert_eq!(dirs.documents_dir(), PathBuf::from("/srv/ascii/documents"));
    }

    #[test]
    fn test_installed_paths_are_namespaced() {
        let dirs = AppDirs::from_sources(None, false);
        if dirs.data != Path::new(".") {
            assert!(dirs.data.ends_with(APP_DIR));
            assert!(dirs.config.ends_with(APP_DIR));
        }
    }

    #[test]
    fn test_create_all_builds_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = AppDirs::from_sources(Some(tmp.path().join("home")), false);
        dirs.create_all().unwrap();
        assert!(dirs.documents_dir().is_dir());
        assert!(dirs.logs_dir().is_dir());
        assert!(dirs.config.is_dir());
    }
}
