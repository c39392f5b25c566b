use std::{
    any::{type_name, TypeId},
    sync::{atomic::Ordering, Arc},
};

use sprig_config::{Bind, Properties};

use crate::{
    bean::{Bean, BeanDefinition, BeanStatus, Source},
    cond::ConditionContext,
    container::Core,
    destroyer::Destroyers,
    errors::Error,
    factories::{Arg, Args},
    inject::{Context, Inject, Resolve},
    logger::Logger,
    supervisor::Supervisor,
    tag::{CollectionTag, FieldTag, Selector, WireTag},
    types::{AnyArc, TypeInfo},
};

mod collect;
mod stack;

use stack::{LazyField, WiringStack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// The one pass over all beans; lazy fields are deferred
    Refresh,
    /// Lookups after refresh; every surviving bean is wired already
    Lookup,
}

/// Wires beans and hands their dependencies to constructors and fields.
///
/// Passed to [`Bean::wire`], where each injected field is filled by one call:
///
/// ```ignore
/// fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
///     ctx.autowire(&self.repo, "")?;
///     ctx.autowire(&self.nodes, "n1,*,n3")?;
///     ctx.value(&self.port, "${server.port:=8080}")?;
///     ctx.logger(&self.log)
/// }
/// ```
pub struct Wiring<'c> {
    core: &'c Core,
    mode: Mode,
    stack: WiringStack<'c>,
    destroyers: Destroyers,
}

impl<'c> Wiring<'c> {
    pub(crate) fn refresh(core: &'c Core) -> Self {
        Wiring {
            core,
            mode: Mode::Refresh,
            stack: WiringStack::default(),
            destroyers: Destroyers::default(),
        }
    }

    pub(crate) fn lookup(core: &'c Core) -> Self {
        Wiring {
            core,
            mode: Mode::Lookup,
            stack: WiringStack::default(),
            destroyers: Destroyers::default(),
        }
    }

    // ###############################################
    // Field injection

    /// Injects beans or properties selected by `<selector>[,lazy]`.
    ///
    /// Lazy fields are filled after every bean has been wired.
    pub fn autowire<V: Resolve>(&mut self, cell: &Inject<V>, tag: &str) -> Result<(), Error> {
        let field = FieldTag::parse(tag);
        if !field.lazy || self.mode == Mode::Lookup {
            return self.fill(cell, field.selector);
        }

        let owner = self.current().map_or_else(|| "container".to_string(), |b| b.id());
        let cell = cell.clone();
        let selector = field.selector.to_string();
        self.stack.defer(LazyField {
            field: format!("{owner} <- {} '{selector}'", type_name::<V>()),
            fill: Box::new(move |ctx: &mut Wiring<'_>| ctx.fill(&cell, &selector)),
        });
        Ok(())
    }

    /// Binds a `${key[:=default]}` property
    pub fn value<V: Resolve>(&mut self, cell: &Inject<V>, tag: &str) -> Result<(), Error> {
        self.fill(cell, tag)
    }

    /// Injects a logger scoped to the bean being wired
    pub fn logger(&mut self, cell: &Inject<Logger>) -> Result<(), Error> {
        self.fill(cell, "")
    }

    /// Injects the container context and marks the container context-aware
    pub fn context(&mut self, cell: &Inject<Context>) -> Result<(), Error> {
        self.fill(cell, "")
    }

    /// Wires the fields of an embedded value as if they were the bean's own
    pub fn nested<B: Bean>(&mut self, inner: &B) -> Result<(), Error> {
        inner.wire(self)
    }

    fn fill<V: Resolve>(&mut self, cell: &Inject<V>, selector: &str) -> Result<(), Error> {
        if let Some(value) = V::resolve(self, &Arg::Tag(selector.to_string()))? {
            cell.set(value);
        }
        Ok(())
    }

    // ###############################################
    // Dependency lookups

    pub fn properties(&self) -> &'c Properties {
        &self.core.properties
    }

    /// The bean currently being wired
    pub fn current(&self) -> Option<&'c BeanDefinition> {
        self.stack.top()
    }

    /// Selector of a bean argument, resolved through the properties when it
    /// starts with `${`
    pub fn selector(&self, arg: &Arg) -> Result<String, Error> {
        match arg {
            Arg::Tag(tag) | Arg::Parent(tag) if tag.trim_start().starts_with("${") => {
                Ok(self.core.properties.resolve(tag)?)
            }
            Arg::Tag(tag) | Arg::Parent(tag) => Ok(tag.clone()),
            other => Err(Error::InvalidTag {
                tag: format!("{other:?}"),
                reason: "bean parameters take a selector",
            }),
        }
    }

    /// Binds a property argument
    pub fn bind<T: Bind>(&self, arg: &Arg) -> Result<T, Error> {
        match arg {
            Arg::Tag(tag) if tag.trim().is_empty() => Err(Error::InvalidTag {
                tag: tag.clone(),
                reason: "property parameters need a '${key}' tag",
            }),
            Arg::Tag(tag) => Ok(self.core.properties.bind::<T>(tag)?),
            other => Err(Error::InvalidTag {
                tag: format!("{other:?}"),
                reason: "property parameters take a '${key}' tag",
            }),
        }
    }

    /// Finds, wires and returns the one bean matching `tag`.
    ///
    /// `Ok(None)` when a nullable tag matches nothing.
    pub fn bean<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        tag: &WireTag,
    ) -> Result<Option<Arc<T>>, Error> {
        let Some(bean) = self.find_bean(TypeInfo::of::<T>(), tag)? else {
            return Ok(None);
        };
        self.wire_bean(bean)?;
        self.cast::<T>(bean).map(Some)
    }

    /// Finds, wires and returns the beans of a collection in their final order
    pub fn beans<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        tag: &CollectionTag,
    ) -> Result<Vec<(&'c BeanDefinition, Arc<T>)>, Error> {
        let info = TypeInfo::of::<T>();
        let pool = self.candidates(info);
        let arranged = collect::arrange(&pool, tag, info.type_name)?;
        if arranged.is_empty() && !tag.nullable {
            return Err(Error::NoSuchBean {
                selector: tag.to_string(),
                type_name: info.type_name,
            });
        }

        let mut beans = Vec::with_capacity(arranged.len());
        for bean in arranged {
            self.wire_bean(bean)?;
            beans.push((bean, self.cast::<T>(bean)?));
        }
        Ok(beans)
    }

    pub(crate) fn supervisor(&self) -> Arc<Supervisor> {
        self.core.supervisor.clone()
    }

    pub(crate) fn mark_context_aware(&self) {
        self.core.context_aware.store(true, Ordering::SeqCst);
    }

    /// Surviving beans that lookups for `info` may return, in registration order
    fn candidates(&self, info: TypeInfo) -> Vec<&'c BeanDefinition> {
        let core = self.core;
        core.registry
            .by_type(info.type_id)
            .iter()
            .map(|index| &core.beans[*index])
            .filter(|bean| bean.status() != BeanStatus::Deleted)
            .collect()
    }

    /// Picks the one bean for a single-valued lookup
    pub(crate) fn find_bean(
        &self,
        info: TypeInfo,
        tag: &WireTag,
    ) -> Result<Option<&'c BeanDefinition>, Error> {
        let candidates: Vec<_> = self
            .candidates(info)
            .into_iter()
            .filter(|bean| tag.matches(bean))
            .collect();

        match candidates.as_slice() {
            [] => {
                if info.is_interface() && !tag.bean_name.is_empty() {
                    self.warn_missing_export(info, tag);
                }
                if tag.nullable {
                    return Ok(None);
                }
                Err(Error::NoSuchBean {
                    selector: tag.to_string(),
                    type_name: info.type_name,
                })
            }
            [bean] => Ok(Some(*bean)),
            _ => {
                let primaries: Vec<_> = candidates.iter().filter(|b| b.primary()).collect();
                match primaries.as_slice() {
                    [primary] => Ok(Some(**primary)),
                    [] => Err(Error::AmbiguousBean {
                        selector: tag.to_string(),
                        type_name: info.type_name,
                        candidates: candidates.iter().map(|b| b.id()).collect(),
                    }),
                    _ => Err(Error::AmbiguousPrimary {
                        selector: tag.to_string(),
                        candidates: primaries.iter().map(|b| b.id()).collect(),
                    }),
                }
            }
        }
    }

    /// Beans found by name for a trait lookup they never exported
    fn warn_missing_export(&self, info: TypeInfo, tag: &WireTag) {
        let core = self.core;
        for index in core.registry.by_name(&tag.bean_name) {
            let bean = &core.beans[*index];
            if !bean.provides(info.type_id) {
                tracing::warn!(
                    bean = %bean.id(),
                    "bean matches '{tag}' by name but doesn't export {info}, it should call export"
                );
            }
        }
    }

    // ###############################################
    // Wiring

    /// Wires every surviving bean in id order, then fills lazy fields.
    ///
    /// Returns the destroy order.
    pub(crate) fn wire_all(&mut self) -> Result<Vec<usize>, Error> {
        let core = self.core;
        for index in core.registry.sorted() {
            self.wire_bean(&core.beans[index])?;
        }

        let lazy = self.stack.take_lazy();
        if !lazy.is_empty() {
            if !core.config.allow_circular_references {
                let fields = lazy.into_iter().map(|field| field.field).collect();
                return Err(Error::CircularReferences(fields));
            }
            for field in lazy {
                (field.fill)(self)?;
            }
        }

        let order = self.destroyers.order().map_err(|cycle| {
            Error::DestroyerCycle(cycle.iter().map(|index| core.beans[*index].id()).collect())
        })?;
        tracing::debug!(
            "destroy order: [{}]",
            order
                .iter()
                .map(|index| core.beans[*index].name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(order)
    }

    /// Wires one bean unless it is already being or has been wired
    pub(crate) fn wire_bean(&mut self, bean: &'c BeanDefinition) -> Result<(), Error> {
        let status = bean.status();
        if status == BeanStatus::Deleted {
            return Err(Error::BeanDeleted(bean.id()));
        }
        if self.mode == Mode::Lookup && status == BeanStatus::Wired {
            return Ok(());
        }

        let destroyer = self.mode == Mode::Refresh && bean.destroy.is_some();
        if destroyer {
            self.destroyers.enter(bean.handle.index());
        }
        self.stack.push(bean);

        let result = self
            .wire_current(bean, status)
            .map_err(|err| self.stack.annotate(err));

        self.stack.pop();
        if destroyer {
            self.destroyers.exit();
        }
        result
    }

    fn wire_current(&mut self, bean: &'c BeanDefinition, status: BeanStatus) -> Result<(), Error> {
        if status == BeanStatus::Creating && bean.has_constructor() {
            let requester = self.stack.previous().map(BeanDefinition::status);
            if requester == Some(BeanStatus::Creating) {
                return Err(Error::CircularConstruction {
                    path: self.stack.ids(),
                });
            }
        }
        if status >= BeanStatus::Creating {
            return Ok(());
        }
        self.create(bean)
    }

    fn create(&mut self, bean: &'c BeanDefinition) -> Result<(), Error> {
        bean.set_status(BeanStatus::Creating);

        let core = self.core;
        for selector in &bean.depends_on {
            for dependency in core.find(selector) {
                if dependency.handle != bean.handle {
                    self.wire_bean(dependency)?;
                }
            }
        }

        let value = self.materialize(bean)?;
        bean.set_value(value.clone());
        bean.set_status(BeanStatus::Created);

        for export in &bean.exports {
            if (export.cast)(&value).is_none() {
                return Err(Error::export_conflict(
                    bean.id(),
                    format!("value doesn't implement {}", export.info),
                ));
            }
        }

        (bean.wire_fields)(&value, self)?;

        if let Some(init) = &bean.init {
            init(&value).map_err(|source| Error::Hook {
                bean: bean.id(),
                hook: "init",
                source,
            })?;
        }

        bean.set_status(BeanStatus::Wired);
        tracing::debug!(bean = %bean.id(), "bean wired");
        Ok(())
    }

    /// Runs the constructor or hands out the registered value
    fn materialize(&mut self, bean: &'c BeanDefinition) -> Result<AnyArc, Error> {
        match &bean.source {
            Source::Value(value) => Ok(value.clone()),
            Source::Constructor {
                construct, args, ..
            } => {
                tracing::trace!(bean = %bean.id(), "calling constructor");
                let mut call_args = Args::new(self, args);
                construct(&mut call_args)
            }
        }
    }

    /// Typed view of a bean's value
    pub(crate) fn cast<T: ?Sized + Send + Sync + 'static>(
        &self,
        bean: &BeanDefinition,
    ) -> Result<Arc<T>, Error> {
        let Some(value) = bean.value() else {
            // Requested while its own constructor is still running
            let mut path = self.stack.ids();
            path.push(bean.id());
            return Err(Error::CircularConstruction { path });
        };

        bean.cast_to(&value, TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<Arc<T>>().ok())
            .map(|arc| *arc)
            .ok_or_else(|| Error::DowncastFailed {
                required_type: type_name::<T>(),
                actual_type: bean.type_name(),
            })
    }
}

impl ConditionContext for Wiring<'_> {
    fn properties(&self) -> &Properties {
        &self.core.properties
    }

    fn profiles(&self) -> Vec<String> {
        self.core.config.active_profiles(&self.core.properties)
    }

    fn find(&self, selector: &Selector) -> Result<Vec<&BeanDefinition>, Error> {
        Ok(self.core.find(selector))
    }
}
