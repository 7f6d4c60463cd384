//! SSE JSON streaming helpers
//!
//! Decodes `data:` payloads of a server-sent-events body into JSON values
//! using `eventsource-stream`. Comments, `event:`/`id:` fields and other
//! non-data lines never reach the caller.

use eventsource_stream::Eventsource;
use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

use crate::error::LlmError;

pub type JsonSseStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value, LlmError>> + Send>>;

/// `data` payloads that mark end-of-stream and carry no JSON.
const DONE_MARKERS: &[&str] = &["[DONE]"];

/// Convert a bytes stream into a JSON stream by parsing SSE `data:` payloads.
///
/// Empty payloads and done markers are skipped; a payload that is not JSON
/// ends the stream with [`LlmError::ParseError`].
pub fn sse_json_values<S, B>(byte_stream: S, label: &'static str) -> JsonSseStream
where
    S: Stream<Item = Result<B, LlmError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut events = Box::pin(byte_stream.eventsource());

        while let Some(item) = events.next().await {
            let event = match item {
                Ok(ev) => ev,
                Err(eventsource_stream::EventStreamError::Transport(e)) => {
                    yield Err(e);
                    return;
                }
                Err(e) => {
                    yield Err(LlmError::StreamError(format!("SSE stream error ({label}): {e}")));
                    return;
                }
            };

            let data = event.data.trim();
            if data.is_empty() || DONE_MARKERS.contains(&data) {
                continue;
            }

            match serde_json::from_str::<serde_json::Value>(data) {
                Ok(payload) => yield Ok(payload),
                Err(e) => {
                    yield Err(LlmError::ParseError(format!(
                        "Failed to parse SSE JSON ({label}): {e}"
                    )));
                    return;
                }
            }
        }
    };

    Box::pin(out)
}
