//! Tool orchestrator.
//!
//! One submission flows strictly: build prompt, call the provider (under the
//! bounded retry wrapper), normalize, persist. Branches per tool class —
//! video sub-protocol, grounded streaming, grounded blocking, structured
//! JSON. History persistence is best-effort: a failed append is logged and
//! swallowed, never surfaced to the caller.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{GenerationError, Result};
use crate::history::{GenerationOutput, HistoryStore, NewGeneration};
use crate::identity::Identity;
use crate::normalize::{normalize_grounded, normalize_json, GeneratedContentData};
use crate::provider::client::{GenerationTransport, StreamChunk};
use crate::provider::retry::{call_with_retry, Sleeper};
use crate::provider::video::{generate_video, VideoEvent, VideoStatus};
use crate::tools::prompts::{build_prompt, PromptSpec};
use crate::tools::{text_inputs, GenerationInputs, Language, ToolId};

/// Progress updates surfaced while a run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Rate limited; retrying after the given whole-second delay.
    Retrying { seconds: u64 },
    /// Video sub-protocol progress.
    Video(VideoStatus),
}

/// Final result of one tool run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput {
    Content(GeneratedContentData),
    Video { bytes: Vec<u8>, prompt: String },
}

/// Orchestrates one tool submission end to end.
pub struct ToolRunner {
    transport: Arc<dyn GenerationTransport>,
    history: Arc<dyn HistoryStore>,
    identity: Arc<dyn Identity>,
    sleeper: Arc<dyn Sleeper>,
}

impl ToolRunner {
    pub fn new(
        transport: Arc<dyn GenerationTransport>,
        history: Arc<dyn HistoryStore>,
        identity: Arc<dyn Identity>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            history,
            identity,
            sleeper,
        }
    }

    /// Run one tool submission.
    ///
    /// `on_status` receives retry countdowns and video progress. When
    /// `on_chunk` is supplied and the tool is grounded, the streaming path
    /// is used and each text delta is forwarded as it arrives.
    pub async fn run(
        &self,
        tool: ToolId,
        inputs: &GenerationInputs,
        language: Language,
        mut on_status: impl FnMut(RunStatus) + Send,
        mut on_chunk: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> Result<RunOutput> {
        let spec = build_prompt(tool, inputs, language)?;
        let output = match spec {
            PromptSpec::Video { prompt } => {
                let bytes = generate_video(
                    self.transport.as_ref(),
                    self.sleeper.as_ref(),
                    &prompt,
                    |event| {
                        on_status(match event {
                            VideoEvent::Status(status) => RunStatus::Video(status),
                            VideoEvent::Retry { seconds } => RunStatus::Retrying { seconds },
                        })
                    },
                )
                .await?;
                RunOutput::Video { bytes, prompt }
            }
            PromptSpec::Grounded { prompt, title } => {
                let data = match on_chunk.as_deref_mut() {
                    Some(chunk_cb) => {
                        self.run_grounded_streaming(&prompt, &title, &mut on_status, chunk_cb)
                            .await?
                    }
                    None => self.run_grounded(&prompt, &title, &mut on_status).await?,
                };
                RunOutput::Content(data)
            }
            PromptSpec::Structured { prompt, image } => {
                let raw = call_with_retry(
                    self.sleeper.as_ref(),
                    || self.transport.generate_structured(&prompt, image.as_ref()),
                    |seconds| on_status(RunStatus::Retrying { seconds }),
                )
                .await?;
                RunOutput::Content(normalize_json(&raw)?)
            }
        };

        self.persist(tool, inputs, &output);
        Ok(output)
    }

    /// Blocking grounded call: text plus citation sources in one response.
    async fn run_grounded(
        &self,
        prompt: &str,
        title: &str,
        on_status: &mut (impl FnMut(RunStatus) + Send),
    ) -> Result<GeneratedContentData> {
        let reply = call_with_retry(
            self.sleeper.as_ref(),
            || self.transport.generate_grounded(prompt),
            |seconds| on_status(RunStatus::Retrying { seconds }),
        )
        .await?;
        let mut data = normalize_grounded(&reply.text, title);
        if !reply.sources.is_empty() {
            data.sources = Some(reply.sources);
        }
        Ok(data)
    }

    /// Streaming grounded call. The retry wrapper governs the initial
    /// connection only; a failure mid-stream is fatal and discards the
    /// partial text. Citation sources come from a best-effort secondary
    /// call after the stream ends and are omitted if it fails.
    async fn run_grounded_streaming(
        &self,
        prompt: &str,
        title: &str,
        on_status: &mut (impl FnMut(RunStatus) + Send),
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<GeneratedContentData> {
        let mut handle = call_with_retry(
            self.sleeper.as_ref(),
            || self.transport.generate_grounded_stream(prompt),
            |seconds| on_status(RunStatus::Retrying { seconds }),
        )
        .await?;

        let mut text = String::new();
        while let Some(chunk) = handle.rx.recv().await {
            match chunk {
                StreamChunk::TextDelta(delta) => {
                    on_chunk(&delta);
                    text.push_str(&delta);
                }
                StreamChunk::Done => break,
                StreamChunk::Error(message) => {
                    return Err(GenerationError::Stream(message));
                }
            }
        }

        let mut data = normalize_grounded(&text, title);
        match self.transport.generate_grounded(prompt).await {
            Ok(reply) if !reply.sources.is_empty() => data.sources = Some(reply.sources),
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "secondary sources fetch failed; omitting sources");
            }
        }
        Ok(data)
    }

    /// Append the run to history. Skipped silently when signed out; append
    /// failures are logged and swallowed so they never fail the generation.
    fn persist(&self, tool: ToolId, inputs: &GenerationInputs, output: &RunOutput) {
        let Some(user_id) = self.identity.current_user_id() else {
            debug!("no signed-in user; skipping history save");
            return;
        };
        let output = match output {
            RunOutput::Content(data) => GenerationOutput::Content(data.clone()),
            RunOutput::Video { prompt, .. } => GenerationOutput::VideoPrompt(prompt.clone()),
        };
        let record = NewGeneration {
            user_id,
            tool_id: tool,
            inputs: text_inputs(inputs),
            output,
        };
        if let Err(e) = self.history.append(record) {
            warn!("Failed to save generation to history: {}", e);
        }
    }
}
