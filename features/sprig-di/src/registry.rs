use std::{
    any::TypeId,
    collections::{BTreeMap, HashMap},
};

use crate::{
    bean::{BeanDefinition, BeanStatus},
    errors::Error,
};

/// Indexes of the surviving beans, built once resolution finished.
///
/// Entries are positions into the container's bean list, kept in
/// registration order.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    by_id: BTreeMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
    by_type: HashMap<TypeId, Vec<usize>>,
}

impl Registry {
    pub(crate) fn build(beans: &[BeanDefinition]) -> Result<Registry, Error> {
        let mut registry = Registry::default();

        for (index, bean) in beans.iter().enumerate() {
            if bean.status() == BeanStatus::Deleted {
                continue;
            }

            let id = bean.id();
            if registry.by_id.insert(id.clone(), index).is_some() {
                return Err(Error::DuplicateBean(id));
            }
            registry
                .by_name
                .entry(bean.name().to_string())
                .or_default()
                .push(index);
            registry
                .by_type
                .entry(bean.info.type_id)
                .or_default()
                .push(index);
            for export in &bean.exports {
                registry
                    .by_type
                    .entry(export.info.type_id)
                    .or_default()
                    .push(index);
            }
        }

        tracing::debug!(beans = registry.by_id.len(), "registry built");
        Ok(registry)
    }

    /// Positions sorted by bean id
    pub(crate) fn sorted(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_id.values().copied()
    }

    pub(crate) fn by_name(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn by_type(&self, type_id: TypeId) -> &[usize] {
        self.by_type.get(&type_id).map_or(&[], Vec::as_slice)
    }
}
