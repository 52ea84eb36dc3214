use crate::models::DateWatchedPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_DATABASE: &str = "(default)";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Configuration {
    pub firestore: Option<FirestoreConfig>,
    pub settings: Option<SettingsConfig>,
    pub http: Option<HttpConfig>,
    #[serde(rename = "dateWatchedPolicy", default)]
    pub date_watched_policy: DateWatchedPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FirestoreConfig {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettingsConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(rename = "timeoutSeconds")]
    pub timeout_seconds: u64,
}

impl Configuration {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Configuration = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings
            .as_ref()
            .map(|s| s.path.clone())
            .unwrap_or_else(|| PathBuf::from("settings.json"))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(
            self.http
                .as_ref()
                .map(|h| h.timeout_seconds)
                .unwrap_or(30)
        )
    }
}

impl FirestoreConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_FIRESTORE_URL)
    }

    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Configuration::from_yaml("{}").unwrap();
        assert!(config.firestore.is_none());
        assert_eq!(config.settings_path(), PathBuf::from("settings.json"));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.date_watched_policy, DateWatchedPolicy::Keep);
    }

    #[test]
    fn parses_full_file() {
        let config = Configuration::from_yaml(
            r#"
firestore:
  projectId: movie-cataloger
  apiKey: secret
  accessToken: token
  baseUrl: http://localhost:8080/v1
settings:
  path: /tmp/prefs.json
http:
  timeoutSeconds: 5
dateWatchedPolicy: clear
"#,
        )
        .unwrap();

        let firestore = config.firestore.as_ref().unwrap();
        assert_eq!(firestore.project_id, "movie-cataloger");
        assert_eq!(firestore.api_key.as_deref(), Some("secret"));
        assert_eq!(firestore.access_token.as_deref(), Some("token"));
        assert_eq!(firestore.base_url(), "http://localhost:8080/v1");
        assert_eq!(firestore.database(), "(default)");
        assert_eq!(config.settings_path(), PathBuf::from("/tmp/prefs.json"));
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.date_watched_policy, DateWatchedPolicy::Clear);
    }
}
