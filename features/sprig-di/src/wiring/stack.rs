use crate::{bean::BeanDefinition, errors::Error, wiring::Wiring};

/// Field injection postponed until every bean is wired
pub(crate) struct LazyField {
    /// `bean id` and selector, for diagnostics
    pub(crate) field: String,
    pub(crate) fill: Box<dyn FnOnce(&mut Wiring<'_>) -> Result<(), Error>>,
}

/// Beans currently being wired, outermost first
#[derive(Default)]
pub(crate) struct WiringStack<'c> {
    beans: Vec<&'c BeanDefinition>,
    lazy: Vec<LazyField>,
}

impl<'c> WiringStack<'c> {
    pub(crate) fn push(&mut self, bean: &'c BeanDefinition) {
        tracing::trace!(bean = %bean.id(), depth = self.beans.len(), "wiring");
        self.beans.push(bean);
    }

    pub(crate) fn pop(&mut self) {
        self.beans.pop();
    }

    pub(crate) fn top(&self) -> Option<&'c BeanDefinition> {
        self.beans.last().copied()
    }

    /// The bean that requested the top one
    pub(crate) fn previous(&self) -> Option<&'c BeanDefinition> {
        self.beans.iter().rev().nth(1).copied()
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.beans.iter().map(|bean| bean.id()).collect()
    }

    /// One `=> bean (file:line)` line per frame
    pub(crate) fn path(&self) -> String {
        self.beans
            .iter()
            .map(|bean| format!("=> {bean}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Attaches the current path, unless an inner frame already did
    pub(crate) fn annotate(&self, err: Error) -> Error {
        match err {
            Error::Wiring { .. } => err,
            err => Error::Wiring {
                path: self.path(),
                source: Box::new(err),
            },
        }
    }

    pub(crate) fn defer(&mut self, field: LazyField) {
        tracing::debug!(field = %field.field, "lazy field deferred");
        self.lazy.push(field);
    }

    pub(crate) fn take_lazy(&mut self) -> Vec<LazyField> {
        std::mem::take(&mut self.lazy)
    }
}
