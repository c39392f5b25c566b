use std::{fmt, future::Future, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::{
    errors::Error, factories::Arg, inject::Resolve, supervisor::Supervisor, types::DependencyInfo,
    wiring::Wiring,
};

/// The container's cancellable context, injectable into beans.
///
/// Cancelled when the container closes, before any destroy hook runs.
#[derive(Clone)]
pub struct Context {
    supervisor: Arc<Supervisor>,
}

impl Context {
    pub(crate) fn new(supervisor: Arc<Supervisor>) -> Self {
        Context { supervisor }
    }

    pub fn token(&self) -> CancellationToken {
        self.supervisor.token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.supervisor.token().is_cancelled()
    }

    /// Resolves once the container starts closing
    pub async fn cancelled(&self) {
        self.supervisor.token().cancelled_owned().await
    }

    /// Launches a task supervised by the container
    pub fn go<F, Fut>(&self, task: F) -> Result<(), Error>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.supervisor.go(task)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Resolve for Context {
    fn resolve(ctx: &mut Wiring<'_>, _: &Arg) -> Result<Option<Self>, Error> {
        ctx.mark_context_aware();
        Ok(Some(Context::new(ctx.supervisor())))
    }

    fn dependency() -> DependencyInfo {
        DependencyInfo::other::<Context>()
    }
}
