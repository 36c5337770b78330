//! Provider transport: Gemini client, bounded retry, video polling.

pub mod client;
pub mod retry;
pub mod video;

pub use client::{
    GeminiClient, GenerationTransport, GroundedReply, Operation, OperationError, StreamChunk,
    StreamHandle,
};
pub use retry::{call_with_retry, Sleeper, TokioSleeper};
pub use video::{generate_video, VideoEvent, VideoStatus};
