use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

/// Either one text for every language or a text per language tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermsOfServices {
    Single(String),
    Localized(BTreeMap<String, String>),
}

impl TermsOfServices {
    pub fn resolve(&self, language: Option<&str>) -> Option<&str> {
        match self {
            Self::Single(text) => Some(text),
            Self::Localized(texts) => language
                .and_then(|language| texts.get(language))
                .or_else(|| texts.get(FALLBACK_LANGUAGE))
                .or_else(|| texts.values().next())
                .map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmParams {
    pub url: String,
    pub realm: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub terms_of_services: Option<TermsOfServices>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcParams {
    /// Absent when the platform does not authenticate through Keycloak.
    #[serde(default)]
    pub keycloak_params: Option<RealmParams>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localized() -> TermsOfServices {
        TermsOfServices::Localized(BTreeMap::from([
            ("de".to_string(), "Nutzungsbedingungen".to_string()),
            ("en".to_string(), "Terms".to_string()),
            ("fr".to_string(), "Conditions".to_string()),
        ]))
    }

    #[test]
    fn picks_requested_language() {
        assert_eq!(localized().resolve(Some("fr")), Some("Conditions"));
    }

    #[test]
    fn falls_back_to_english_then_any() {
        assert_eq!(localized().resolve(Some("it")), Some("Terms"));

        let german_only =
            TermsOfServices::Localized(BTreeMap::from([("de".to_string(), "AGB".to_string())]));
        assert_eq!(german_only.resolve(None), Some("AGB"));
    }

    #[test]
    fn deserializes_both_shapes() {
        let single: TermsOfServices = serde_json::from_str(r#""https://tos""#).expect("single");
        assert_eq!(single, TermsOfServices::Single("https://tos".to_string()));

        let params: OidcParams = serde_json::from_str(
            r#"{"keycloakParams":{"url":"https://auth.example.org","realm":"datalab","termsOfServices":{"en":"tos.md"}}}"#,
        )
        .expect("params");
        let realm = params.keycloak_params.expect("keycloak params");
        assert_eq!(
            realm.terms_of_services.and_then(|tos| tos.resolve(None).map(str::to_string)),
            Some("tos.md".to_string())
        );
    }
}
