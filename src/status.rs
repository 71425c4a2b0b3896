/// Pipeline status domain type and pipeline-id extraction.
use std::fmt;

/// Status reported by the API for a pipeline.
///
/// The five terminal variants form a closed set; every other value the API
/// may return (running, pending, created, ...) is non-terminal and kept
/// verbatim in `Running`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    Success,
    Manual,
    Failed,
    Canceled,
    Skipped,
    Running(String),
}

impl PipelineStatus {
    /// Parse the provider's status string. Unknown values are non-terminal.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "success" => PipelineStatus::Success,
            "manual" => PipelineStatus::Manual,
            "failed" => PipelineStatus::Failed,
            "canceled" => PipelineStatus::Canceled,
            "skipped" => PipelineStatus::Skipped,
            other => PipelineStatus::Running(other.to_string()),
        }
    }

    /// True for statuses the pipeline will never transition out of.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineStatus::Running(_))
    }

    /// The user-facing verdict line for a terminal status.
    pub fn verdict(&self, pipeline_id: &str) -> Option<String> {
        let line = match self {
            PipelineStatus::Success => {
                format!("[SUCCESS] Pipeline {pipeline_id} completed successfully!")
            }
            PipelineStatus::Manual => {
                format!("[MANUAL] Pipeline {pipeline_id} is paused, awaiting manual action")
            }
            PipelineStatus::Failed => format!("[FAILED] Pipeline {pipeline_id} failed"),
            PipelineStatus::Canceled => format!("[CANCELED] Pipeline {pipeline_id} was canceled"),
            PipelineStatus::Skipped => format!("[SKIPPED] Pipeline {pipeline_id} was skipped"),
            PipelineStatus::Running(_) => return None,
        };
        Some(line)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Success => "success",
            PipelineStatus::Manual => "manual",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Canceled => "canceled",
            PipelineStatus::Skipped => "skipped",
            PipelineStatus::Running(other) => other,
        };
        f.write_str(s)
    }
}

/// Pull the pipeline id out of a bare id or a URL ending in the id.
///
/// Inputs with a path separator have trailing slashes stripped, then the
/// last segment is taken; bare ids pass through unchanged.
pub fn extract_pipeline_id(input: &str) -> &str {
    if input.contains('/') {
        input
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(input)
    } else {
        input
    }
}
