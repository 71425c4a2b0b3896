/// GitLab status provider: fetches one pipeline's status over HTTP.
use crate::config::Config;
use crate::status::PipelineStatus;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Per-request timeout so a stuck fetch cannot stall cancellation for long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from fetching a pipeline's status.
#[derive(Debug)]
pub enum FetchError {
    /// The API answered, but not with this pipeline (unknown id, bad token).
    NotFound { pipeline_id: String },
    /// Transport-level failure; the monitor retries these.
    Network {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The API answered 2xx with a body we could not decode.
    Decode { source: reqwest::Error },
}

impl FetchError {
    /// Transient errors are retried by the monitor; everything else is fatal.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::NotFound { pipeline_id } => {
                write!(f, "Pipeline {pipeline_id} not found")
            }
            FetchError::Network { source } => write!(f, "network error: {source}"),
            FetchError::Decode { source } => {
                write!(f, "failed to decode pipeline response: {source}")
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::NotFound { .. } => None,
            FetchError::Network { source } => Some(source.as_ref()),
            FetchError::Decode { source } => Some(source),
        }
    }
}

/// Seam between the monitor loop and the HTTP layer.
///
/// Tests substitute scripted providers; production uses `GitlabProvider`.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn fetch_status(&self, pipeline_id: &str) -> Result<PipelineStatus, FetchError>;
}

/// The subset of the pipeline payload we care about.
#[derive(Debug, Deserialize)]
struct PipelineResponse {
    status: String,
}

pub struct GitlabProvider {
    client: reqwest::Client,
    api_base: String,
    project_id: String,
    token: String,
}

impl GitlabProvider {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network {
                source: Box::new(e),
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl StatusProvider for GitlabProvider {
    async fn fetch_status(&self, pipeline_id: &str) -> Result<PipelineStatus, FetchError> {
        let url = format!(
            "{}/projects/{}/pipelines/{}",
            self.api_base, self.project_id, pipeline_id
        );
        tracing::debug!(%url, "fetching pipeline status");

        let resp = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                source: Box::new(e),
            })?;

        if !resp.status().is_success() {
            tracing::debug!(status = %resp.status(), pipeline_id, "non-success response");
            return Err(FetchError::NotFound {
                pipeline_id: pipeline_id.to_string(),
            });
        }

        let body: PipelineResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::Decode { source: e })?;

        Ok(PipelineStatus::parse(&body.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_error() -> FetchError {
        FetchError::Network {
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connection timed out",
            )),
        }
    }

    #[test]
    fn test_only_network_errors_are_transient() {
        assert!(network_error().is_transient());
        assert!(!FetchError::NotFound {
            pipeline_id: "12345".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_not_found_message_names_the_pipeline() {
        let err = FetchError::NotFound {
            pipeline_id: "12345".to_string(),
        };
        assert_eq!(err.to_string(), "Pipeline 12345 not found");
    }

    #[test]
    fn test_network_error_keeps_its_source() {
        let err = network_error();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("network error:"));
    }

    #[test]
    fn test_provider_trims_trailing_slash_on_api_base() {
        let config = Config {
            api_base: "https://gitlab.example.com/api/v4/".to_string(),
            project_id: "7".to_string(),
            token: "glpat-abc".to_string(),
        };
        let provider = GitlabProvider::new(&config).unwrap();
        assert_eq!(provider.api_base, "https://gitlab.example.com/api/v4");
    }

    #[test]
    fn test_pipeline_response_parses_status_field() {
        let body: PipelineResponse =
            serde_json::from_str(r#"{"id": 12345, "status": "running", "ref": "main"}"#).unwrap();
        assert_eq!(body.status, "running");
    }
}
