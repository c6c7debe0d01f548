use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One-shot delayed callback that ends a preview.
///
/// Cancelling is idempotent and harmless after the callback has run.
/// Dropping the timer cancels it, so a replaced session can never leave an
/// armed timer behind.
pub struct PreviewTimer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PreviewTimer {
    pub fn arm<F, Fut>(after: Duration, on_fire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => debug!("preview timer: cancelled"),
                _ = tokio::time::sleep(after) => {
                    debug!("preview timer: fired after {:?}", after);
                    on_fire().await;
                }
            }
        });
        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PreviewTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
