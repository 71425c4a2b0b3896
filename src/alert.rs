/// Alert sinks and the repeating alarm task.
use crate::cancel::CancelToken;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cadence of the repeating attention signal.
const BEEP_INTERVAL: Duration = Duration::from_millis(500);

/// One attention-getting signal.
///
/// Implementations must return quickly; the alarm cadence is driven by the
/// task, not the sink.
pub trait AlertSink: Send + Sync {
    /// Human-readable sink name (for logs).
    fn name(&self) -> &str;

    /// Emit one signal.
    fn beep(&self);
}

/// Writes the terminal bell character straight to stdout.
pub struct TerminalBell;

impl AlertSink for TerminalBell {
    fn name(&self) -> &str {
        "terminal-bell"
    }

    fn beep(&self) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
    }
}

/// Rings the bell via `tput bel`, which respects the user's terminfo.
#[cfg(unix)]
pub struct ShellBell;

#[cfg(unix)]
impl AlertSink for ShellBell {
    fn name(&self) -> &str {
        "tput-bel"
    }

    fn beep(&self) {
        // Fire and forget: the runtime reaps the child when the handle is
        // dropped, and the alarm cadence never waits on tput.
        match tokio::process::Command::new("tput").arg("bel").spawn() {
            Ok(child) => drop(child),
            Err(e) => tracing::debug!(error = %e, "tput bel failed"),
        }
    }
}

/// Pick the alert mechanism for this platform at startup.
pub fn default_sink() -> Arc<dyn AlertSink> {
    #[cfg(unix)]
    {
        // tput needs a terminal description to look up the bell capability.
        if std::env::var_os("TERM").is_some() {
            return Arc::new(ShellBell);
        }
    }
    Arc::new(TerminalBell)
}

/// Start the repeating alarm.
///
/// Prints the `ALARM!` marker once (the wrapping extension scrapes stdout
/// for it), then beeps every half second until cancellation is requested.
/// The task ends silently; callers that need to outlive the alarm await the
/// returned handle.
pub fn run_alarm(sink: Arc<dyn AlertSink>, cancel: CancelToken) -> JoinHandle<()> {
    println!("ALARM! Pipeline is no longer running...");
    tracing::info!(sink = sink.name(), "alarm started");

    tokio::spawn(async move {
        while !cancel.is_cancelled() {
            sink.beep();
            if cancel.sleep_unless_cancelled(BEEP_INTERVAL).await {
                break;
            }
        }
        tracing::debug!("alarm task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct CountingSink {
        beeps: AtomicUsize,
    }

    impl CountingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                beeps: AtomicUsize::new(0),
            })
        }
    }

    impl AlertSink for CountingSink {
        fn name(&self) -> &str {
            "counting"
        }

        fn beep(&self) {
            self.beeps.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_alarm_beeps_until_cancelled() {
        let sink = CountingSink::new();
        let cancel = CancelToken::new();

        let waker = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            waker.cancel();
        });

        let handle = run_alarm(sink.clone(), cancel);
        handle.await.unwrap();

        assert!(sink.beeps.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_alarm_stops_promptly_after_cancel() {
        let sink = CountingSink::new();
        let cancel = CancelToken::new();
        let handle = run_alarm(sink, cancel.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let start = Instant::now();
        cancel.cancel();
        handle.await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_alarm_with_already_cancelled_token_exits_immediately() {
        let sink = CountingSink::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let handle = run_alarm(sink.clone(), cancel);
        handle.await.unwrap();

        assert_eq!(sink.beeps.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_bell_does_not_block_the_cadence() {
        let bell = ShellBell;
        let start = Instant::now();
        for _ in 0..5 {
            bell.beep();
        }
        assert!(start.elapsed() < BEEP_INTERVAL);
    }

    #[test]
    fn test_default_sink_exists() {
        // Whatever the platform, startup must yield a usable sink.
        let sink = default_sink();
        assert!(!sink.name().is_empty());
    }
}
