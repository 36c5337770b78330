//! Video generation polling sub-protocol.
//!
//! Start the long-running operation, then poll its status on a fixed
//! interval until terminal. The start call, every status check and the final
//! download each run under the bounded retry wrapper. A status check that
//! still fails after its own retries counts as one polling failure; the run
//! aborts once cumulative failures reach the ceiling.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{GenerationError, Result};
use crate::provider::client::GenerationTransport;
use crate::provider::retry::{call_with_retry, Sleeper};

pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const MAX_POLL_FAILURES: u32 = 10;

/// Coarse progress states surfaced to the caller while a video generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStatus {
    Generating,
    Processing,
    Ready,
}

impl VideoStatus {
    /// Stable key the presentation layer translates to localized text.
    pub fn key(&self) -> &'static str {
        match self {
            VideoStatus::Generating => "generating_video",
            VideoStatus::Processing => "processing_video",
            VideoStatus::Ready => "video_ready",
        }
    }
}

/// Progress events from a video run: coarse status changes, and rate-limit
/// backoff countdowns from the wrapped provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    Status(VideoStatus),
    Retry { seconds: u64 },
}

/// Run the full video sub-protocol and return the downloaded bytes.
pub async fn generate_video(
    transport: &dyn GenerationTransport,
    sleeper: &dyn Sleeper,
    prompt: &str,
    mut on_event: impl FnMut(VideoEvent) + Send,
) -> Result<Vec<u8>> {
    on_event(VideoEvent::Status(VideoStatus::Generating));
    let mut operation = call_with_retry(
        sleeper,
        || transport.start_video(prompt),
        |seconds| on_event(VideoEvent::Retry { seconds }),
    )
    .await?;
    info!(operation = %operation.name, "video generation started");
    on_event(VideoEvent::Status(VideoStatus::Processing));

    let mut failures = 0u32;
    while !operation.done {
        sleeper.sleep(POLL_INTERVAL).await;
        let name = operation.name.clone();
        let poll = call_with_retry(
            sleeper,
            || transport.poll_video(&name),
            |seconds| on_event(VideoEvent::Retry { seconds }),
        )
        .await;
        match poll {
            Ok(refreshed) => operation = refreshed,
            Err(err) => {
                failures += 1;
                warn!(failures, error = %err, "video status check failed");
                if failures >= MAX_POLL_FAILURES {
                    return Err(GenerationError::PollingExhausted { failures });
                }
            }
        }
    }

    if let Some(error) = &operation.error {
        return Err(GenerationError::VideoOperation(error.message.clone()));
    }
    let uri = operation.download_uri().ok_or_else(|| {
        GenerationError::VideoOperation(
            "operation completed but no download URI was found".to_string(),
        )
    })?;
    debug!(uri, "downloading generated video");

    let bytes = call_with_retry(
        sleeper,
        || transport.download_video(uri),
        |seconds| on_event(VideoEvent::Retry { seconds }),
    )
    .await?;
    on_event(VideoEvent::Status(VideoStatus::Ready));
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_keys_are_stable() {
        assert_eq!(VideoStatus::Generating.key(), "generating_video");
        assert_eq!(VideoStatus::Processing.key(), "processing_video");
        assert_eq!(VideoStatus::Ready.key(), "video_ready");
    }
}
