/// Stdin sentinel listener.
///
/// Reads lines for the lifetime of the process; the sentinel is the only
/// recognized command. The listener is the writer side of the shared
/// cancellation token; the monitor and alarm are readers.
use crate::cancel::CancelToken;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// The exact line (after trimming surrounding whitespace) that requests
/// cancellation. Case-sensitive.
pub const STOP_SENTINEL: &str = "STOP_ALARM";

/// Read lines until the sentinel arrives, the stream closes, or the token
/// is cancelled elsewhere (Ctrl-C, alarm wind-down). The read is raced
/// against the token so cancellation is honored even while no input is
/// arriving.
pub async fn listen_for_stop<R>(reader: R, cancel: CancelToken)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                if line.trim() == STOP_SENTINEL {
                    tracing::info!("stop requested on input stream");
                    cancel.cancel();
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read input stream");
                break;
            }
        }
    }
}
