//! Ollama streaming implementation
//!
//! `POST /api/chat` with `stream: true` answers with one JSON object per
//! line. Lines that do not parse are skipped, `message.content` becomes the
//! next fragment, and `done: true` ends the stream even if more lines are
//! already buffered.

use futures_util::StreamExt;

use super::types::ChatChunk;
use crate::error::LlmError;
use crate::streaming::{LineStream, TokenStream};

/// Convert NDJSON lines from the chat endpoint into text fragments.
pub fn chat_fragments(lines: LineStream) -> TokenStream {
    let out = async_stream::stream! {
        let mut lines = lines;
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let chunk: ChatChunk = match serde_json::from_str(&line) {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!("skipping malformed Ollama stream line: {}", e);
                    continue;
                }
            };

            if let Some(error) = chunk.error {
                yield Err(LlmError::StreamError(format!("Ollama reported: {error}")));
                return;
            }

            if let Some(content) = chunk
                .message
                .and_then(|m| m.content)
                .filter(|content| !content.is_empty())
            {
                yield Ok(content);
            }

            if chunk.done == Some(true) {
                return;
            }
        }
    };

    Box::pin(out)
}
