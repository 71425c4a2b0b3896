/// Configuration resolution: settings file first, environment second.
///
/// The settings file is a flat JSON object in the VS Code `settings.json`
/// style, with dotted keys under the `pipelineAlarm.` prefix. A missing or
/// malformed file is tolerated (the environment takes over); a missing
/// access token is fatal before any polling starts.
use serde_json::Value;
use std::path::Path;

pub const SETTING_API_BASE: &str = "pipelineAlarm.gitlabApiBase";
pub const SETTING_PROJECT_ID: &str = "pipelineAlarm.projectId";
pub const SETTING_TOKEN: &str = "pipelineAlarm.personalAccessToken";

pub const ENV_API_BASE: &str = "GITLAB_API_BASE";
pub const ENV_PROJECT_ID: &str = "PROJECT_ID";
pub const ENV_TOKEN: &str = "GITLAB_PAT";

pub const DEFAULT_API_BASE: &str = "https://gitlab.com/api/v4";

/// Resolved configuration for one monitoring run.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub project_id: String,
    pub token: String,
}

/// Fatal configuration problems.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingToken,
    MissingProjectId,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingToken => write!(
                f,
                "Personal Access Token not found. Set {SETTING_TOKEN} in the settings file \
                 or the {ENV_TOKEN} environment variable."
            ),
            ConfigError::MissingProjectId => write!(
                f,
                "Project id not found. Set {SETTING_PROJECT_ID} in the settings file \
                 or the {ENV_PROJECT_ID} environment variable."
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from a settings file, falling back to the environment.
pub fn load(settings_path: &Path) -> Result<Config, ConfigError> {
    resolve(load_settings(settings_path).as_ref(), &|key| {
        std::env::var(key).ok()
    })
}

/// Read the settings file, tolerating absence and malformed content.
fn load_settings(path: &Path) -> Option<Value> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(
                path = %path.display(),
                error = %e,
                "settings file not readable, using environment only"
            );
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "settings file is not valid JSON, using environment only"
            );
            None
        }
    }
}

/// Settings-file values win over environment variables. Empty strings count
/// as absent so a blank settings entry does not mask the environment.
fn resolve(
    settings: Option<&Value>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let from_file = |key: &str| {
        settings
            .and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    };

    let token = from_file(SETTING_TOKEN)
        .or_else(|| env(ENV_TOKEN))
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingToken)?;

    let project_id = from_file(SETTING_PROJECT_ID)
        .or_else(|| env(ENV_PROJECT_ID))
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingProjectId)?;

    let api_base = from_file(SETTING_API_BASE)
        .or_else(|| env(ENV_API_BASE))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    Ok(Config {
        api_base,
        project_id,
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_all_from_settings_file() {
        let settings = serde_json::json!({
            "pipelineAlarm.gitlabApiBase": "https://gitlab.example.com/api/v4",
            "pipelineAlarm.projectId": "20275",
            "pipelineAlarm.personalAccessToken": "glpat-abc",
        });

        let config = resolve(Some(&settings), &no_env).unwrap();
        assert_eq!(config.api_base, "https://gitlab.example.com/api/v4");
        assert_eq!(config.project_id, "20275");
        assert_eq!(config.token, "glpat-abc");
    }

    #[test]
    fn test_resolve_falls_back_to_environment() {
        let env = |key: &str| match key {
            ENV_PROJECT_ID => Some("42".to_string()),
            ENV_TOKEN => Some("glpat-env".to_string()),
            _ => None,
        };

        let config = resolve(None, &env).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.project_id, "42");
        assert_eq!(config.token, "glpat-env");
    }

    #[test]
    fn test_settings_file_wins_over_environment() {
        let settings = serde_json::json!({
            "pipelineAlarm.projectId": "from-file",
            "pipelineAlarm.personalAccessToken": "token-from-file",
        });
        let env = |key: &str| match key {
            ENV_PROJECT_ID => Some("from-env".to_string()),
            ENV_TOKEN => Some("token-from-env".to_string()),
            _ => None,
        };

        let config = resolve(Some(&settings), &env).unwrap();
        assert_eq!(config.project_id, "from-file");
        assert_eq!(config.token, "token-from-file");
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let settings = serde_json::json!({
            "pipelineAlarm.projectId": "20275",
        });
        let err = resolve(Some(&settings), &no_env).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
        assert!(err.to_string().contains("Personal Access Token"));
    }

    #[test]
    fn test_missing_project_id_is_fatal() {
        let settings = serde_json::json!({
            "pipelineAlarm.personalAccessToken": "glpat-abc",
        });
        let err = resolve(Some(&settings), &no_env).unwrap_err();
        assert_eq!(err, ConfigError::MissingProjectId);
    }

    #[test]
    fn test_empty_settings_value_does_not_mask_environment() {
        let settings = serde_json::json!({
            "pipelineAlarm.projectId": "",
            "pipelineAlarm.personalAccessToken": "",
        });
        let env = |key: &str| match key {
            ENV_PROJECT_ID => Some("42".to_string()),
            ENV_TOKEN => Some("glpat-env".to_string()),
            _ => None,
        };

        let config = resolve(Some(&settings), &env).unwrap();
        assert_eq!(config.project_id, "42");
        assert_eq!(config.token, "glpat-env");
    }

    #[test]
    fn test_load_settings_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_settings(&dir.path().join("nope.json")).is_none());
    }

    #[test]
    fn test_load_settings_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_settings(&path).is_none());
    }

    #[test]
    fn test_load_settings_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"pipelineAlarm.projectId": "7", "editor.fontSize": 14}"#,
        )
        .unwrap();

        let value = load_settings(&path).unwrap();
        assert_eq!(
            value.get(SETTING_PROJECT_ID).and_then(Value::as_str),
            Some("7")
        );
    }
}
