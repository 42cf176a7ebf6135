use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_at_unix: Option<u64>,
    pub refresh_expires_at_unix: Option<u64>,
    pub scope: Option<String>,
}

impl TokenSet {
    /// Whether the access token stays valid for at least `min_validity_secs`.
    /// Tokens without a known expiry are treated as needing a refresh.
    pub fn is_valid_for(&self, min_validity_secs: u64, now: SystemTime) -> bool {
        let Some(expires_at) = self.expires_at_unix else {
            return false;
        };

        let Ok(duration) = now.duration_since(UNIX_EPOCH) else {
            return false;
        };

        duration.as_secs().saturating_add(min_validity_secs) < expires_at
    }
}
