use tracing::Span;

use crate::{
    errors::Error, factories::Arg, inject::Resolve, types::DependencyInfo, wiring::Wiring,
};

/// Logger scoped to the bean it was injected into.
///
/// Events recorded inside [`Logger::in_scope`] carry the bean's type.
#[derive(Debug, Clone)]
pub struct Logger {
    bean: String,
    span: Span,
}

impl Logger {
    pub fn new(bean: impl Into<String>) -> Self {
        let bean = bean.into();
        let span = tracing::info_span!("bean", r#type = %bean);
        Logger { bean, span }
    }

    /// Type name of the owning bean
    pub fn bean(&self) -> &str {
        &self.bean
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        self.span.in_scope(f)
    }
}

impl Resolve for Logger {
    fn resolve(ctx: &mut Wiring<'_>, _: &Arg) -> Result<Option<Self>, Error> {
        let bean = ctx.current().map_or("container", |bean| bean.type_name());
        Ok(Some(Logger::new(bean)))
    }

    fn dependency() -> DependencyInfo {
        DependencyInfo::other::<Logger>()
    }
}
