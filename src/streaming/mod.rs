//! Streaming Module
//!
//! Every backend streams plain text fragments through [`TokenStream`]:
//! - NDJSON line splitting (remote model server)
//! - SSE `data:` payload decoding (hosted inference)
//! - The blocking bridge used by the synchronous facade

mod bridge;
mod ndjson;
mod sse;

pub use bridge::*;
pub use ndjson::*;
pub use sse::*;

use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

use crate::error::LlmError;

/// Token Stream - the streaming session handed to callers
///
/// A pinned, boxed, single-use stream of text fragments. Dropping it closes
/// the underlying HTTP body or stops local generation.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Drain a stream, concatenating its fragments in order.
pub async fn collect_text(mut stream: TokenStream) -> Result<String, LlmError> {
    let mut out = String::new();
    while let Some(fragment) = stream.next().await {
        out.push_str(&fragment?);
    }
    Ok(out)
}
