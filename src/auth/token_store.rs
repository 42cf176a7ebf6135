use std::fs;

use crate::config::AppPaths;
use crate::error::AppResult;

use super::TokenSet;

pub trait TokenStore: Send + Sync + 'static {
    fn load(&self, profile: &str) -> AppResult<Option<TokenSet>>;
    fn save(&self, profile: &str, token: &TokenSet) -> AppResult<()>;
    fn clear(&self, profile: &str) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    paths: AppPaths,
}

impl FileTokenStore {
    pub fn new(paths: AppPaths) -> Self {
        Self { paths }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, profile: &str) -> AppResult<Option<TokenSet>> {
        let path = self.paths.token_file(profile);
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, profile: &str, token: &TokenSet) -> AppResult<()> {
        let path = self.paths.token_file(profile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, serde_json::to_string_pretty(token)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn clear(&self, profile: &str) -> AppResult<()> {
        let path = self.paths.token_file(profile);
        if path.exists() {
            fs::remove_file(path)?;
        }

        Ok(())
    }
}
