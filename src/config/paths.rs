use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

const APP_DIR: &str = "onyxia";

#[derive(Debug, Clone)]
pub struct AppPaths {
    profiles_dir: PathBuf,
    tokens_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> AppResult<Self> {
        let config_root = dirs::config_dir()
            .ok_or_else(|| AppError::Config("unable to resolve config directory".to_string()))?;
        let data_root = dirs::data_dir()
            .ok_or_else(|| AppError::Config("unable to resolve data directory".to_string()))?;

        let paths = Self::with_roots(config_root.join(APP_DIR), data_root.join(APP_DIR));
        fs::create_dir_all(&paths.profiles_dir)?;
        fs::create_dir_all(&paths.tokens_dir)?;

        Ok(paths)
    }

    /// Keeps both settings and tokens below `root`; directories are created
    /// lazily on first write.
    pub fn rooted_at(root: &Path) -> Self {
        Self::with_roots(root.join("config"), root.join("data"))
    }

    fn with_roots(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            profiles_dir: config_dir.join("profiles"),
            tokens_dir: data_dir.join("tokens"),
        }
    }

    pub fn settings_file(&self, profile: &str) -> PathBuf {
        self.profiles_dir.join(format!("{profile}.json"))
    }

    pub fn token_file(&self, profile: &str) -> PathBuf {
        self.tokens_dir.join(format!("{profile}.json"))
    }
}
