use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedToken {
    pub expires_at_epoch_ms: i64,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Reads the `exp` claim of a JWT. The signature is not verified: the token
/// was handed to us by the identity provider and is only inspected for
/// scheduling.
pub fn decode(access_token: &str) -> AppResult<DecodedToken> {
    let mut segments = access_token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) if segments.next().is_none() => payload,
        _ => {
            return Err(AppError::Token(
                "expected three dot-separated segments".to_string(),
            ));
        }
    };

    let raw = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claim: ExpiryClaim = serde_json::from_slice(&raw)?;

    Ok(DecodedToken {
        expires_at_epoch_ms: claim.exp.saturating_mul(1000),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn reads_expiry_in_milliseconds() {
        let token = token_with_payload(r#"{"exp":1700000000,"sub":"jdoe"}"#);
        let decoded = decode(&token).expect("token should decode");
        assert_eq!(decoded.expires_at_epoch_ms, 1_700_000_000_000);
    }

    #[test]
    fn rejects_opaque_tokens() {
        assert!(matches!(decode("not-a-jwt"), Err(AppError::Token(_))));
    }

    #[test]
    fn rejects_payload_without_exp() {
        let token = token_with_payload(r#"{"sub":"jdoe"}"#);
        assert!(matches!(decode(&token), Err(AppError::Json(_))));
    }
}
