/// The poll/cancel/alarm loop.
///
/// Polls the status provider until the pipeline settles, the attempt budget
/// runs out, or the user cancels. User-facing lines go to stdout because the
/// wrapping extension scrapes them; diagnostics go through tracing.
use crate::alert::{run_alarm, AlertSink};
use crate::cancel::CancelToken;
use crate::gitlab::{FetchError, StatusProvider};
use crate::status::{extract_pipeline_id, PipelineStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tunables for one monitoring session.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause between status polls.
    pub wait_interval: Duration,
    /// Poll attempts after the initial fetch before giving up.
    pub max_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            wait_interval: Duration::from_secs(30),
            max_attempts: 60,
        }
    }
}

/// How a monitoring session ended, short of a fatal error.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The pipeline reached a terminal status and the alarm ran its course.
    Completed(PipelineStatus),
    /// The user cancelled monitoring; not an error.
    Cancelled,
}

/// Fatal monitoring failures.
#[derive(Debug)]
pub enum MonitorError {
    Fetch { source: FetchError },
    Timeout {
        pipeline_id: String,
        attempts: u32,
        minutes: f64,
    },
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorError::Fetch { source } => write!(f, "{source}"),
            MonitorError::Timeout {
                pipeline_id,
                attempts,
                minutes,
            } => write!(
                f,
                "Pipeline {pipeline_id} monitoring timed out after {attempts} attempts \
                 ({minutes:.1} minutes)"
            ),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Fetch { source } => Some(source),
            MonitorError::Timeout { .. } => None,
        }
    }
}

/// Poll until the pipeline settles, then sound the alarm and block on it.
///
/// The status observed by each iteration is the one fetched at the end of
/// the previous iteration, so a terminal status triggers the alarm at the
/// top of the following pass. Cancellation is honored at every suspension
/// point and is a normal return, not an error.
pub async fn run(
    provider: &dyn StatusProvider,
    pipeline_input: &str,
    cfg: &MonitorConfig,
    cancel: CancelToken,
    sink: Arc<dyn AlertSink>,
) -> Result<Outcome, MonitorError> {
    let start = Instant::now();
    let pipeline_id = extract_pipeline_id(pipeline_input);
    let wait_secs = cfg.wait_interval.as_secs();

    // Initial fetch: any failure here is fatal, including network errors.
    let mut status = provider
        .fetch_status(pipeline_id)
        .await
        .map_err(|e| MonitorError::Fetch { source: e })?;
    tracing::debug!(pipeline_id, %status, "initial status");

    for attempt in 1..=cfg.max_attempts {
        if cancel.is_cancelled() {
            println!("Monitoring stopped by user.");
            return Ok(Outcome::Cancelled);
        }

        if status.is_terminal() {
            if let Some(verdict) = status.verdict(pipeline_id) {
                println!("{verdict}");
            }
            println!(
                "Elapsed time: {:.1} seconds",
                start.elapsed().as_secs_f64()
            );

            // The alarm task ends only on cancellation; block on it so the
            // process does not exit mid-alert.
            let alarm = run_alarm(sink, cancel.clone());
            if let Err(e) = alarm.await {
                tracing::warn!(error = %e, "alarm task failed");
            }
            return Ok(Outcome::Completed(status));
        }

        if cancel.sleep_unless_cancelled(cfg.wait_interval).await {
            println!("Monitoring stopped by user.");
            return Ok(Outcome::Cancelled);
        }

        match provider.fetch_status(pipeline_id).await {
            Ok(next) => {
                status = next;
                println!(
                    "Attempt {attempt}/{}: Pipeline {pipeline_id} status: {status}",
                    cfg.max_attempts
                );
            }
            Err(e) if e.is_transient() && attempt < cfg.max_attempts => {
                println!("Network error on attempt {attempt}: {e}");
                println!("Retrying in {wait_secs} seconds...");
                tracing::warn!(attempt, error = %e, "transient fetch failure, retrying");
                if cancel.sleep_unless_cancelled(cfg.wait_interval).await {
                    println!("Monitoring stopped by user.");
                    return Ok(Outcome::Cancelled);
                }
            }
            Err(e) => {
                if e.is_transient() {
                    // Last attempt: the transient failure becomes fatal.
                    println!("Network error on attempt {attempt}: {e}");
                }
                return Err(MonitorError::Fetch { source: e });
            }
        }
    }

    Err(MonitorError::Timeout {
        pipeline_id: pipeline_id.to_string(),
        attempts: cfg.max_attempts,
        minutes: f64::from(cfg.max_attempts) * cfg.wait_interval.as_secs_f64() / 60.0,
    })
}
