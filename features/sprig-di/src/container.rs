use std::{
    any::type_name,
    future::Future,
    panic::Location,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use sprig_config::Properties;
use tokio_util::sync::CancellationToken;

use crate::{
    bean::{Bean, BeanBuilder, BeanDefinition, BeanHandle, BeanStatus, Construct, Source},
    config::ContainerConfig,
    errors::Error,
    factories::{check_args, Arg, Args, Callable},
    inject::Resolve,
    registry::Registry,
    resolver::Resolver,
    supervisor::{Supervisor, TaskStats},
    tag::Selector,
    types::{AnyArc, DependencyInfo, DynError},
    wiring::Wiring,
};

/// State shared by the refresh pass and lookups
pub(crate) struct Core {
    pub(crate) beans: Vec<BeanDefinition>,
    pub(crate) properties: Properties,
    pub(crate) config: ContainerConfig,
    pub(crate) registry: Registry,
    pub(crate) supervisor: Arc<Supervisor>,
    pub(crate) context_aware: AtomicBool,
}

impl Core {
    /// Surviving beans matching `selector`, in registration order
    pub(crate) fn find(&self, selector: &Selector) -> Vec<&BeanDefinition> {
        let alive = |bean: &&BeanDefinition| bean.status() != BeanStatus::Deleted;
        match selector {
            Selector::Type(info) => self
                .registry
                .by_type(info.type_id)
                .iter()
                .map(|index| &self.beans[*index])
                .filter(alive)
                .collect(),
            selector => self
                .beans
                .iter()
                .filter(alive)
                .filter(|bean| selector.matches(bean))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Registering,
    Refreshing,
    Refreshed,
    Failed,
}

/// The IoC container.
///
/// Beans are registered with [`Container::object`] and [`Container::provide`],
/// then [`Container::refresh`] decides which survive and wires them once.
/// Lookups take `&self` and may run from several threads after that.
///
/// ```ignore
/// let mut container = Container::new();
/// container.property("server.port", "8080")?;
/// container.object(Repo::default())?;
/// container.provide(Service::new, args!["", "${server.port}"])?;
/// container.refresh()?;
///
/// let service: Arc<Service> = container.get("")?;
/// container.close().await;
/// ```
pub struct Container {
    core: Core,
    phase: Phase,
    /// Set through [`Container::with_config`], wins over properties
    explicit_config: Option<ContainerConfig>,
    destroy_order: Vec<usize>,
    closed: AtomicBool,
}

impl Default for Container {
    fn default() -> Self {
        Container::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Container::with_properties(Properties::new())
    }

    pub fn with_properties(properties: Properties) -> Self {
        Container {
            core: Core {
                beans: Vec::new(),
                properties,
                config: ContainerConfig::default(),
                registry: Registry::default(),
                supervisor: Arc::new(Supervisor::new()),
                context_aware: AtomicBool::new(false),
            },
            phase: Phase::Registering,
            explicit_config: None,
            destroy_order: Vec::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.explicit_config = Some(config);
        self
    }

    // ###############################################
    // Registration

    pub fn property(&mut self, key: &str, value: impl Into<String>) -> Result<(), Error> {
        self.check_registering()?;
        self.core.properties.set(key, value)?;
        Ok(())
    }

    pub fn properties(&self) -> &Properties {
        &self.core.properties
    }

    /// Registers a pre-built value
    #[track_caller]
    pub fn object<T: Bean>(&mut self, value: T) -> Result<BeanBuilder<'_, T>, Error> {
        self.object_arc(Arc::new(value))
    }

    /// Registers a value that is already shared
    #[track_caller]
    pub fn object_arc<T: Bean>(&mut self, value: Arc<T>) -> Result<BeanBuilder<'_, T>, Error> {
        self.check_registering()?;
        let value: AnyArc = value;
        let source = Source::Value(value);
        let def = BeanDefinition::new::<T>(self.next_handle(), source, Location::caller());
        Ok(self.register(def))
    }

    /// Registers a constructor, called once during refresh.
    ///
    /// `args` bind the constructor's parameters in order; missing trailing
    /// arguments select by type.
    #[track_caller]
    pub fn provide<F, M, T>(
        &mut self,
        ctor: F,
        args: Vec<Arg>,
    ) -> Result<BeanBuilder<'_, T>, Error>
    where
        F: Callable<M, Output = T>,
        T: Bean,
        M: 'static,
    {
        let construct: Construct = Arc::new(move |args: &mut Args<'_, '_>| {
            let value = ctor.call(args)?;
            Ok(Arc::new(value) as AnyArc)
        });
        self.register_constructor::<T>(construct, F::params(), args)
    }

    /// Registers a fallible constructor; its error fails the refresh
    #[track_caller]
    pub fn try_provide<F, M, T, E>(
        &mut self,
        ctor: F,
        args: Vec<Arg>,
    ) -> Result<BeanBuilder<'_, T>, Error>
    where
        F: Callable<M, Output = Result<T, E>>,
        T: Bean,
        E: Into<DynError> + 'static,
        M: 'static,
    {
        let construct: Construct = Arc::new(move |args: &mut Args<'_, '_>| {
            let value = ctor.call(args)?.map_err(|err| Error::Construct {
                bean: type_name::<T>().to_string(),
                source: err.into(),
            })?;
            Ok(Arc::new(value) as AnyArc)
        });
        self.register_constructor::<T>(construct, F::params(), args)
    }

    #[track_caller]
    fn register_constructor<T: Bean>(
        &mut self,
        construct: Construct,
        params: Vec<DependencyInfo>,
        args: Vec<Arg>,
    ) -> Result<BeanBuilder<'_, T>, Error> {
        self.check_registering()?;
        check_args(type_name::<T>(), &params, &args)?;
        let source = Source::Constructor {
            construct,
            args,
            params,
        };
        let def = BeanDefinition::new::<T>(self.next_handle(), source, Location::caller());
        Ok(self.register(def))
    }

    fn register<T: Bean>(&mut self, def: BeanDefinition) -> BeanBuilder<'_, T> {
        tracing::debug!(bean = %def, "bean registered");
        let index = self.core.beans.len();
        self.core.beans.push(def);

        let mut builder = BeanBuilder::new(&mut self.core.beans[index]);
        T::describe(&mut builder);
        builder
    }

    fn next_handle(&self) -> BeanHandle {
        BeanHandle(self.core.beans.len())
    }

    fn check_registering(&self) -> Result<(), Error> {
        match self.phase {
            Phase::Registering => Ok(()),
            _ => Err(Error::RegisterAfterRefresh),
        }
    }

    // ###############################################
    // Refresh

    /// Resolves conditions, indexes the surviving beans and wires them.
    ///
    /// Can only run once. After a failure the container is unusable,
    /// but [`Container::close`] is still safe.
    pub fn refresh(&mut self) -> Result<(), Error> {
        if self.phase != Phase::Registering {
            return Err(Error::AlreadyRefreshed);
        }
        self.phase = Phase::Refreshing;
        tracing::debug!(beans = self.core.beans.len(), "refreshing container");

        match self.try_refresh() {
            Ok(destroy_order) => {
                self.destroy_order = destroy_order;
                self.phase = Phase::Refreshed;
                tracing::info!("container refreshed");
                Ok(())
            }
            Err(err) => {
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    fn try_refresh(&mut self) -> Result<Vec<usize>, Error> {
        let mut problems = self
            .core
            .beans
            .iter_mut()
            .flat_map(|bean| std::mem::take(&mut bean.problems));
        if let Some(problem) = problems.next() {
            return Err(problem);
        }

        self.core.config = match &self.explicit_config {
            Some(config) => config.clone(),
            None => ContainerConfig::from_properties(&self.core.properties)?,
        };

        let core = &self.core;
        Resolver::new(&core.beans, &core.properties, &core.config).resolve_all()?;
        self.core.registry = Registry::build(&self.core.beans)?;

        Wiring::refresh(&self.core).wire_all()
    }

    fn check_refreshed(&self) -> Result<(), Error> {
        match self.phase {
            Phase::Refreshed => Ok(()),
            _ => Err(Error::NotRefreshed),
        }
    }

    // ###############################################
    // Lookups

    /// Resolves `V` the way a constructor parameter with `tag` would be.
    ///
    /// ```ignore
    /// let two: Arc<Two> = container.get("")?;
    /// let nodes: Vec<Arc<Node>> = container.get("n1,*")?;
    /// let port: u16 = container.get("${server.port}")?;
    /// ```
    pub fn get<V: Resolve>(&self, tag: &str) -> Result<V, Error> {
        self.check_refreshed()?;
        let mut wiring = Wiring::lookup(&self.core);
        V::resolve(&mut wiring, &Arg::from(tag))?.ok_or_else(|| Error::NoSuchBean {
            selector: tag.to_string(),
            type_name: type_name::<V>(),
        })
    }

    /// Surviving definitions matching `selector`; never wires
    pub fn find(&self, selector: impl Into<Selector>) -> Result<Vec<&BeanDefinition>, Error> {
        self.check_refreshed()?;
        Ok(self.core.find(&selector.into()))
    }

    /// Wires an ad-hoc value against the container; it is not registered
    #[track_caller]
    pub fn wire<T: Bean>(&self, value: T) -> Result<Arc<T>, Error> {
        self.check_refreshed()?;
        let source = Source::Value(Arc::new(value));
        let def = BeanDefinition::new::<T>(self.next_handle(), source, Location::caller());
        self.wire_transient::<T>(def)
    }

    /// Builds an ad-hoc bean with `ctor`; it is not registered
    #[track_caller]
    pub fn wire_with<F, M, T>(&self, ctor: F, args: Vec<Arg>) -> Result<Arc<T>, Error>
    where
        F: Callable<M, Output = T>,
        T: Bean,
        M: 'static,
    {
        self.check_refreshed()?;
        let params = F::params();
        check_args(type_name::<T>(), &params, &args)?;
        let construct: Construct = Arc::new(move |args: &mut Args<'_, '_>| {
            let value = ctor.call(args)?;
            Ok(Arc::new(value) as AnyArc)
        });
        let source = Source::Constructor {
            construct,
            args,
            params,
        };
        let def = BeanDefinition::new::<T>(self.next_handle(), source, Location::caller());
        self.wire_transient::<T>(def)
    }

    fn wire_transient<T: Bean>(&self, mut def: BeanDefinition) -> Result<Arc<T>, Error> {
        T::describe(&mut BeanBuilder::new(&mut def));
        if let Some(problem) = def.problems.pop() {
            return Err(problem);
        }

        let mut wiring = Wiring::lookup(&self.core);
        wiring.wire_bean(&def)?;
        wiring.cast::<T>(&def)
    }

    /// Calls `f` with its parameters resolved from `args`
    pub fn invoke<F, M>(&self, f: F, args: Vec<Arg>) -> Result<F::Output, Error>
    where
        F: Callable<M>,
    {
        self.check_refreshed()?;
        check_args(type_name::<F>(), &F::params(), &args)?;
        let mut wiring = Wiring::lookup(&self.core);
        let mut call_args = Args::new(&mut wiring, &args);
        f.call(&mut call_args)
    }

    // ###############################################
    // Tasks

    /// Launches a task bound to the container's cancellation token.
    ///
    /// Needs a tokio runtime. Panics inside the task are logged and counted.
    pub fn go<F, Fut>(&self, task: F) -> Result<(), Error>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.core.supervisor.go(task)
    }

    pub fn task_stats(&self) -> TaskStats {
        self.core.supervisor.stats()
    }

    /// True once a bean received the container [`crate::Context`]
    pub fn is_context_aware(&self) -> bool {
        self.core.context_aware.load(Ordering::SeqCst)
    }

    /// Cancels and drains supervised tasks, then runs destroy hooks,
    /// dependents first. Hook errors are logged. Only the first call acts.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.core.supervisor.shutdown().await;

        for index in &self.destroy_order {
            let bean = &self.core.beans[*index];
            let (Some(destroy), Some(value)) = (&bean.destroy, bean.value()) else {
                continue;
            };
            match destroy(&value) {
                Ok(()) => tracing::debug!(bean = %bean.id(), "bean destroyed"),
                Err(err) => tracing::error!(bean = %bean.id(), "destroy hook failed: {err}"),
            }
        }
        tracing::info!("container closed");
    }
}
