//! Newline-delimited JSON helpers
//!
//! Splits a byte stream into text lines. Chunks may end mid-line or mid
//! character; bytes are buffered until a newline arrives, and a trailing
//! line without a newline is flushed when the body ends.

use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

use crate::error::LlmError;

pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Convert a byte stream into a stream of non-empty, trimmed lines.
pub fn ndjson_lines<S, B>(byte_stream: S) -> LineStream
where
    S: Stream<Item = Result<B, LlmError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    yield Ok(line);
                }
            }
        }

        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
        if !rest.is_empty() {
            yield Ok(rest);
        }
    };

    Box::pin(out)
}
