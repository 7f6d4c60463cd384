//! Private scheduler for the synchronous entry points

use std::future::Future;

use crate::error::LlmError;

/// Run `future` to completion on a fresh current-thread runtime.
///
/// Inside an existing runtime the private one runs on a scoped helper
/// thread, since a runtime cannot block the thread of another runtime.
pub fn block_on_private<F>(future: F) -> Result<F::Output, LlmError>
where
    F: Future + Send,
    F::Output: Send,
{
    let run = move || -> Result<F::Output, LlmError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LlmError::InternalError(format!("failed to start runtime: {e}")))?;
        Ok(runtime.block_on(future))
    };

    if tokio::runtime::Handle::try_current().is_ok() {
        std::thread::scope(|scope| scope.spawn(run).join())
            .map_err(|_| LlmError::InternalError("blocking call panicked".to_string()))?
    } else {
        run()
    }
}
