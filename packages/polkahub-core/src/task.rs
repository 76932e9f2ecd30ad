use futures::{
    future::{select, AbortHandle, Abortable, Either},
    Future,
};
use std::time::Duration;

/// Aborts its task when dropped
#[derive(Debug)]
pub struct TaskGuard {
    handle: AbortHandle,
}

impl TaskGuard {
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.handle.is_aborted()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a background task which lives exactly as long as the returned guard
pub fn spawn<F>(fut: F) -> TaskGuard
where
    F: Future<Output = ()> + Send + 'static,
{
    let (handle, registration) = AbortHandle::new_pair();
    let fut = Abortable::new(fut, registration);

    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            wasm_bindgen_futures::spawn_local(async move {
                let _ = fut.await;
            });
        } else {
            tokio::spawn(async move {
                let _ = fut.await;
            });
        }
    }

    TaskGuard { handle }
}

pub async fn sleep(duration: Duration) {
    futures_timer::Delay::new(duration).await;
}

/// `None` if the future didn't finish in time
pub async fn timeout<F: Future>(duration: Duration, fut: F) -> Option<F::Output> {
    let fut = std::pin::pin!(fut);
    let delay = futures_timer::Delay::new(duration);

    match select(fut, delay).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}
