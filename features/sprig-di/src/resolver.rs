use sprig_config::Properties;

use crate::{
    bean::{BeanDefinition, BeanStatus},
    cond::ConditionContext,
    config::ContainerConfig,
    errors::Error,
    tag::{Selector, WireTag},
};

/// Decides which definitions survive: missing parents and failed
/// conditions mark a bean `Deleted`.
///
/// Conditions may ask for other beans, which are resolved on demand.
pub(crate) struct Resolver<'c> {
    beans: &'c [BeanDefinition],
    properties: &'c Properties,
    config: &'c ContainerConfig,
}

impl<'c> Resolver<'c> {
    pub(crate) fn new(
        beans: &'c [BeanDefinition],
        properties: &'c Properties,
        config: &'c ContainerConfig,
    ) -> Self {
        Resolver {
            beans,
            properties,
            config,
        }
    }

    pub(crate) fn resolve_all(&self) -> Result<(), Error> {
        for bean in self.beans {
            self.resolve(bean).map_err(|err| match err {
                Error::Wiring { .. } => err,
                err => Error::Wiring {
                    path: format!("=> {bean}"),
                    source: Box::new(err),
                },
            })?;
        }

        let deleted = self
            .beans
            .iter()
            .filter(|bean| bean.status() == BeanStatus::Deleted)
            .count();
        tracing::debug!(
            "resolved {} beans, {deleted} deleted",
            self.beans.len() - deleted
        );
        Ok(())
    }

    fn resolve(&self, bean: &'c BeanDefinition) -> Result<(), Error> {
        if bean.status() >= BeanStatus::Resolving {
            return Ok(());
        }
        bean.set_status(BeanStatus::Resolving);

        if let Some((selector, param)) = bean.parent() {
            let selector = if selector.trim_start().starts_with("${") {
                self.properties.resolve(selector)?
            } else {
                selector.to_string()
            };
            let tag = WireTag::parse(&selector);
            let type_id = param.type_info.type_id;
            let parents = self.candidates(|b| b.provides(type_id) && tag.matches(b))?;

            match parents.as_slice() {
                [] => {
                    tracing::debug!(bean = %bean.id(), "parent '{tag}' is missing, bean deleted");
                    bean.set_status(BeanStatus::Deleted);
                    return Ok(());
                }
                [_] => {}
                _ => {
                    return Err(Error::AmbiguousParent {
                        bean: bean.id(),
                        candidates: parents.iter().map(|b| b.id()).collect(),
                    })
                }
            }
        }

        for condition in &bean.conditions {
            if !condition.matches(self)? {
                tracing::debug!(bean = %bean.id(), "condition not met, bean deleted");
                bean.set_status(BeanStatus::Deleted);
                return Ok(());
            }
        }

        bean.set_status(BeanStatus::Resolved);
        Ok(())
    }

    /// Resolves the beans passing `filter` and returns the survivors.
    ///
    /// Beans still being resolved are skipped.
    fn candidates(
        &self,
        filter: impl Fn(&BeanDefinition) -> bool,
    ) -> Result<Vec<&'c BeanDefinition>, Error> {
        let mut found = Vec::new();
        for bean in self.beans {
            if !filter(bean) {
                continue;
            }
            if matches!(bean.status(), BeanStatus::Resolving | BeanStatus::Deleted) {
                continue;
            }
            self.resolve(bean)?;
            if bean.status() != BeanStatus::Deleted {
                found.push(bean);
            }
        }
        Ok(found)
    }
}

impl ConditionContext for Resolver<'_> {
    fn properties(&self) -> &Properties {
        self.properties
    }

    fn profiles(&self) -> Vec<String> {
        self.config.active_profiles(self.properties)
    }

    fn find(&self, selector: &Selector) -> Result<Vec<&BeanDefinition>, Error> {
        self.candidates(|bean| selector.matches(bean))
    }
}
