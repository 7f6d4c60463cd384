//! Blocking bridge over an asynchronous token stream
//!
//! The async stream is driven on a dedicated worker thread that owns its own
//! current-thread Tokio runtime, so the bridge works whether or not the
//! caller is inside a runtime. Fragments travel over an unbounded FIFO
//! channel as [`BridgeItem`]s; the worker always finishes with
//! [`BridgeItem::End`], even when it panics.

use futures_util::StreamExt;
use std::future::Future;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::TokenStream;
use crate::error::LlmError;

/// Message passed from the bridge worker to the blocking consumer.
#[derive(Debug)]
pub enum BridgeItem {
    /// Next text fragment
    Fragment(String),
    /// Terminal failure; nothing but `End` follows
    Error(LlmError),
    /// End-of-stream sentinel
    End,
}

/// Sends the sentinel when the worker leaves its body, however it leaves.
struct EndGuard(mpsc::Sender<BridgeItem>);

impl Drop for EndGuard {
    fn drop(&mut self) {
        let _ = self.0.send(BridgeItem::End);
    }
}

/// A plain blocking iterator over an asynchronous token stream.
///
/// Iteration yields fragments in order, then at most one error, then stops.
/// The worker thread is joined before the iterator reports exhaustion and
/// when the iterator is dropped early; dropping early also cancels the
/// underlying stream, closing its HTTP body or generation thread.
pub struct BlockingTokenStream {
    rx: Option<mpsc::Receiver<BridgeItem>>,
    worker: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    finished: bool,
}

impl BlockingTokenStream {
    /// Start a worker that builds the stream with `make_stream` and drives it.
    pub fn spawn<F, Fut>(make_stream: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<TokenStream, LlmError>> + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let worker_tx = tx.clone();

        let worker = std::thread::Builder::new()
            .name("lcm-stream-bridge".to_string())
            .spawn(move || drive(make_stream, worker_tx, worker_cancel));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                let _ = tx.send(BridgeItem::Error(LlmError::InternalError(format!(
                    "failed to spawn stream worker: {e}"
                ))));
                let _ = tx.send(BridgeItem::End);
                None
            }
        };

        Self {
            rx: Some(rx),
            worker,
            cancel,
            finished: false,
        }
    }

    /// Whether the stream has been fully consumed.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain the remaining fragments into one string.
    pub fn collect_text(self) -> Result<String, LlmError> {
        let mut out = String::new();
        for fragment in self {
            out.push_str(&fragment?);
        }
        Ok(out)
    }

    /// Stop receiving and wait for the worker. Returns an error if it panicked.
    fn finish(&mut self) -> Option<LlmError> {
        self.finished = true;
        self.rx = None;
        let handle = self.worker.take()?;
        match handle.join() {
            Ok(()) => None,
            Err(_) => Some(LlmError::InternalError(
                "stream worker panicked".to_string(),
            )),
        }
    }
}

impl Iterator for BlockingTokenStream {
    type Item = Result<String, LlmError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        // A disconnected channel means the worker is gone; treat it as the end.
        let item = self
            .rx
            .as_ref()
            .and_then(|rx| rx.recv().ok())
            .unwrap_or(BridgeItem::End);

        match item {
            BridgeItem::Fragment(text) => Some(Ok(text)),
            BridgeItem::Error(e) => {
                self.finish();
                Some(Err(e))
            }
            BridgeItem::End => self.finish().map(Err),
        }
    }
}

impl Drop for BlockingTokenStream {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.cancel.cancel();
            self.finish();
        }
    }
}

impl std::fmt::Debug for BlockingTokenStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingTokenStream")
            .field("finished", &self.finished)
            .field("worker_running", &self.worker.is_some())
            .finish()
    }
}

fn drive<F, Fut>(make_stream: F, tx: mpsc::Sender<BridgeItem>, cancel: CancellationToken)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<TokenStream, LlmError>>,
{
    let guard = EndGuard(tx);
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = guard.0.send(BridgeItem::Error(LlmError::InternalError(format!(
                "failed to start stream worker runtime: {e}"
            ))));
            return;
        }
    };

    runtime.block_on(async {
        let stream = tokio::select! {
            _ = cancel.cancelled() => return,
            stream = make_stream() => stream,
        };
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                let _ = guard.0.send(BridgeItem::Error(e));
                return;
            }
        };

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = stream.next() => next,
            };
            match next {
                Some(Ok(text)) => {
                    if guard.0.send(BridgeItem::Fragment(text)).is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    let _ = guard.0.send(BridgeItem::Error(e));
                    break;
                }
                None => break,
            }
        }
        tracing::trace!("stream bridge worker finished");
    });
}
