use std::{
    any::Any,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::errors::Error;

/// Counters of supervised tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub spawned: usize,
    pub panicked: usize,
}

/// Tracks background tasks bound to the container's cancellation token
pub(crate) struct Supervisor {
    token: CancellationToken,
    tasks: Mutex<JoinSet<()>>,
    spawned: AtomicUsize,
    panicked: Arc<AtomicUsize>,
}

impl Supervisor {
    pub(crate) fn new() -> Self {
        Supervisor {
            token: CancellationToken::new(),
            tasks: Mutex::new(JoinSet::new()),
            spawned: AtomicUsize::new(0),
            panicked: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawns `task` on the current tokio runtime.
    ///
    /// A panic inside the task is caught, logged and counted.
    pub(crate) fn go<F, Fut>(&self, task: F) -> Result<(), Error>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.token.is_cancelled() {
            return Err(Error::Supervisor("container is closing".into()));
        }
        let handle = Handle::try_current()
            .map_err(|e| Error::Supervisor(format!("no tokio runtime to run the task on: {e}")))?;

        let id = self.spawned.fetch_add(1, Ordering::SeqCst) + 1;
        let panicked = self.panicked.clone();
        let task = AssertUnwindSafe(task(self.token.clone())).catch_unwind();

        let mut tasks = self.tasks.lock();
        while let Some(result) = tasks.try_join_next() {
            self.reap(result);
        }
        tasks.spawn_on(
            async move {
                match task.await {
                    Ok(()) => tracing::debug!(task = id, "supervised task finished"),
                    Err(panic) => {
                        panicked.fetch_add(1, Ordering::SeqCst);
                        tracing::error!(
                            task = id,
                            "supervised task panicked: {}",
                            panic_message(panic.as_ref())
                        );
                    }
                }
            },
            &handle,
        );
        tracing::debug!(task = id, "supervised task started");
        Ok(())
    }

    /// Cancels the token and waits until every task returned
    pub(crate) async fn shutdown(&self) {
        self.token.cancel();

        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        tracing::debug!("waiting for {} supervised tasks", tasks.len());
        while let Some(result) = tasks.join_next().await {
            self.reap(result);
        }
    }

    fn reap(&self, result: Result<(), JoinError>) {
        if let Err(err) = result {
            if err.is_panic() {
                self.panicked.fetch_add(1, Ordering::SeqCst);
                tracing::error!("supervised task panicked: {err}");
            } else {
                tracing::debug!("supervised task aborted: {err}");
            }
        }
    }

    pub(crate) fn stats(&self) -> TaskStats {
        TaskStats {
            spawned: self.spawned.load(Ordering::SeqCst),
            panicked: self.panicked.load(Ordering::SeqCst),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
