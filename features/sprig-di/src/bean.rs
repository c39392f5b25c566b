use std::{
    any::{type_name, Any, TypeId},
    fmt,
    marker::PhantomData,
    panic::Location,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    cond::Condition,
    errors::Error,
    factories::{Arg, Args},
    tag::Selector,
    types::{AnyArc, DependencyInfo, DynError, Injectable, TypeInfo},
    wiring::Wiring,
};

/// A type the container can manage.
///
/// `describe` declares what is implied by the type itself: exported traits
/// and default lifecycle hooks. It runs once at registration, before any
/// setter on the returned [`BeanBuilder`].
///
/// `wire` injects the fields of an allocated value. Implementations call one
/// [`Wiring`] method per injected field:
///
/// ```ignore
/// impl Bean for Service {
///     fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
///         ctx.autowire(&self.repo, "")?;
///         ctx.value(&self.port, "${server.port:=8080}")
///     }
/// }
/// ```
pub trait Bean: Injectable + Sized {
    fn describe(bean: &mut BeanBuilder<'_, Self>) {
        let _ = bean;
    }

    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        let _ = ctx;
        Ok(())
    }
}

/// Lifecycle of a definition. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BeanStatus {
    Default,
    Resolving,
    Resolved,
    Creating,
    Created,
    Wired,
    Deleted,
}

/// Reference to a definition inside the container that registered it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BeanHandle(pub(crate) usize);

impl BeanHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Result of an init or destroy hook: `()` or `Result<(), E>`
pub trait HookResult {
    fn into_result(self) -> Result<(), DynError>;
}

impl HookResult for () {
    fn into_result(self) -> Result<(), DynError> {
        Ok(())
    }
}

impl<E: Into<DynError>> HookResult for Result<(), E> {
    fn into_result(self) -> Result<(), DynError> {
        self.map_err(Into::into)
    }
}

/// Produces a boxed `Arc<I>` view of a bean value
pub(crate) type Caster = Arc<dyn Fn(&AnyArc) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;
pub(crate) type Hook = Arc<dyn Fn(&AnyArc) -> Result<(), DynError> + Send + Sync>;
pub(crate) type Construct = Arc<dyn Fn(&mut Args<'_, '_>) -> Result<AnyArc, Error> + Send + Sync>;
pub(crate) type WireFn = fn(&AnyArc, &mut Wiring<'_>) -> Result<(), Error>;

pub(crate) enum Source {
    Value(AnyArc),
    Constructor {
        construct: Construct,
        args: Vec<Arg>,
        params: Vec<DependencyInfo>,
    },
}

pub(crate) struct Export {
    pub(crate) info: TypeInfo,
    pub(crate) cast: Caster,
}

struct BeanState {
    status: BeanStatus,
    value: Option<AnyArc>,
}

/// Descriptor of one registered bean
pub struct BeanDefinition {
    pub(crate) handle: BeanHandle,
    pub(crate) info: TypeInfo,
    name: String,
    pub(crate) source: Source,
    pub(crate) conditions: Vec<Arc<dyn Condition>>,
    pub(crate) primary: bool,
    pub(crate) order: i32,
    pub(crate) depends_on: Vec<Selector>,
    pub(crate) exports: Vec<Export>,
    cast: Caster,
    pub(crate) init: Option<Hook>,
    pub(crate) destroy: Option<Hook>,
    location: &'static Location<'static>,
    pub(crate) wire_fields: WireFn,
    /// Setter misuse, reported when refresh starts
    pub(crate) problems: Vec<Error>,
    state: Mutex<BeanState>,
}

impl BeanDefinition {
    pub(crate) fn new<T: Bean>(
        handle: BeanHandle,
        source: Source,
        location: &'static Location<'static>,
    ) -> Self {
        let info = TypeInfo::of::<T>();
        BeanDefinition {
            handle,
            info,
            name: info.short_name().to_string(),
            source,
            conditions: Vec::new(),
            primary: false,
            order: 0,
            depends_on: Vec::new(),
            exports: Vec::new(),
            cast: Arc::new(|value: &AnyArc| {
                value
                    .clone()
                    .downcast::<T>()
                    .ok()
                    .map(|bean| Box::new(bean) as Box<dyn Any + Send + Sync>)
            }),
            init: None,
            destroy: None,
            location,
            wire_fields: wire_fields::<T>,
            problems: Vec::new(),
            state: Mutex::new(BeanState {
                status: BeanStatus::Default,
                value: None,
            }),
        }
    }

    /// `type_name:name`, unique among surviving beans
    pub fn id(&self) -> String {
        format!("{}:{}", self.info.type_name, self.name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.info.type_name
    }

    pub fn type_info(&self) -> TypeInfo {
        self.info
    }

    pub fn handle(&self) -> BeanHandle {
        self.handle
    }

    pub fn status(&self) -> BeanStatus {
        self.state.lock().status
    }

    pub fn primary(&self) -> bool {
        self.primary
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    /// Registration site
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn exports(&self) -> Vec<TypeInfo> {
        self.exports.iter().map(|export| export.info).collect()
    }

    /// True when the constructor's first argument selects a parent bean
    pub fn is_method(&self) -> bool {
        self.parent().is_some()
    }

    pub fn has_constructor(&self) -> bool {
        matches!(self.source, Source::Constructor { .. })
    }

    /// Selector and parameter of the parent bean of a method bean
    pub(crate) fn parent(&self) -> Option<(&str, &DependencyInfo)> {
        match &self.source {
            Source::Constructor { args, params, .. } => match (args.first(), params.first()) {
                (Some(Arg::Parent(selector)), Some(param)) => Some((selector.as_str(), param)),
                _ => None,
            },
            Source::Value(_) => None,
        }
    }

    /// True when lookups for `type_id` may return this bean
    pub(crate) fn provides(&self, type_id: TypeId) -> bool {
        self.info.type_id == type_id || self.exports.iter().any(|e| e.info.type_id == type_id)
    }

    pub(crate) fn set_status(&self, status: BeanStatus) {
        self.state.lock().status = status;
    }

    pub(crate) fn value(&self) -> Option<AnyArc> {
        self.state.lock().value.clone()
    }

    pub(crate) fn set_value(&self, value: AnyArc) {
        self.state.lock().value = Some(value);
    }

    /// Boxed `Arc<I>` for the bean type itself or one of its exports
    pub(crate) fn cast_to(
        &self,
        value: &AnyArc,
        target: TypeId,
    ) -> Option<Box<dyn Any + Send + Sync>> {
        if self.info.type_id == target {
            return (self.cast)(value);
        }
        self.exports
            .iter()
            .find(|export| export.info.type_id == target)
            .and_then(|export| (export.cast)(value))
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("id", &self.id())
            .field("status", &self.status())
            .field("primary", &self.primary)
            .field("order", &self.order)
            .field("location", &format_args!("{}", self.location))
            .finish()
    }
}

impl fmt::Display for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.location)
    }
}

fn wire_fields<T: Bean>(value: &AnyArc, ctx: &mut Wiring<'_>) -> Result<(), Error> {
    match value.downcast_ref::<T>() {
        Some(bean) => bean.wire(ctx),
        None => Err(Error::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type: "unknown",
        }),
    }
}

fn hook<T, R, F>(f: F) -> Hook
where
    T: Bean,
    R: HookResult,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    Arc::new(move |value: &AnyArc| match value.downcast_ref::<T>() {
        Some(bean) => f(bean).into_result(),
        None => Err(Error::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type: "unknown",
        }
        .into()),
    })
}

/// Fluent setters on a freshly registered definition
pub struct BeanBuilder<'c, T> {
    def: &'c mut BeanDefinition,
    _marker: PhantomData<fn() -> T>,
}

impl<'c, T: Bean> BeanBuilder<'c, T> {
    pub(crate) fn new(def: &'c mut BeanDefinition) -> Self {
        BeanBuilder {
            def,
            _marker: PhantomData,
        }
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if name.trim().is_empty() {
            let problem = Error::invalid_bean(self.def.id(), "bean name can't be empty");
            self.def.problems.push(problem);
        } else {
            self.def.name = name;
        }
        self
    }

    /// Adds a condition; all conditions must hold for the bean to survive
    pub fn on(&mut self, condition: impl Condition) -> &mut Self {
        self.def.conditions.push(Arc::new(condition));
        self
    }

    /// Position inside unordered collections, ascending
    pub fn order(&mut self, order: i32) -> &mut Self {
        self.def.order = order;
        self
    }

    pub fn primary(&mut self) -> &mut Self {
        self.def.primary = true;
        self
    }

    /// Beans matched by `selector` are wired before this one
    pub fn depends_on(&mut self, selector: impl Into<Selector>) -> &mut Self {
        self.def.depends_on.push(selector.into());
        self
    }

    pub fn init<R: HookResult>(&mut self, f: impl Fn(&T) -> R + Send + Sync + 'static) -> &mut Self {
        self.def.init = Some(hook(f));
        self
    }

    pub fn destroy<R: HookResult>(
        &mut self,
        f: impl Fn(&T) -> R + Send + Sync + 'static,
    ) -> &mut Self {
        self.def.destroy = Some(hook(f));
        self
    }

    /// Lets lookups for the trait object `I` find this bean.
    ///
    /// ```ignore
    /// container.object(Greeter)?.export(|g| g as Arc<dyn Greet>);
    /// ```
    pub fn export<I: ?Sized + Send + Sync + 'static>(
        &mut self,
        cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    ) -> &mut Self {
        let info = TypeInfo::of::<I>();
        if !info.is_interface() || info.type_id == self.def.info.type_id {
            let reason = format!("export target '{info}' is not a trait object");
            let problem = Error::export_conflict(self.def.id(), reason);
            self.def.problems.push(problem);
            return self;
        }
        if self.def.provides(info.type_id) {
            return self;
        }

        self.def.exports.push(Export {
            info,
            cast: Arc::new(move |value: &AnyArc| {
                value
                    .clone()
                    .downcast::<T>()
                    .ok()
                    .map(|bean| Box::new(cast(bean)) as Box<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    pub fn handle(&self) -> BeanHandle {
        self.def.handle
    }

    pub fn id(&self) -> String {
        self.def.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greet: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Greeter;
    impl Greet for Greeter {
        fn greet(&self) -> String {
            "hi".into()
        }
    }
    impl Bean for Greeter {}

    fn definition() -> BeanDefinition {
        let value: AnyArc = Arc::new(Greeter);
        BeanDefinition::new::<Greeter>(BeanHandle(0), Source::Value(value), Location::caller())
    }

    #[test]
    fn derives_name_and_id() {
        let def = definition();
        assert_eq!(def.name(), "Greeter");
        assert_eq!(def.id(), format!("{}:Greeter", type_name::<Greeter>()));
        assert_eq!(def.status(), BeanStatus::Default);
    }

    #[test]
    fn exports_trait_objects() {
        let mut def = definition();
        BeanBuilder::<Greeter>::new(&mut def)
            .export(|g| g as Arc<dyn Greet>)
            .export(|g| g as Arc<dyn Greet>);
        assert!(def.problems.is_empty());
        assert_eq!(def.exports().len(), 1);

        let value: AnyArc = Arc::new(Greeter);
        let boxed = def.cast_to(&value, TypeId::of::<dyn Greet>()).unwrap();
        let greet = boxed.downcast::<Arc<dyn Greet>>().unwrap();
        assert_eq!(greet.greet(), "hi");
    }

    #[test]
    fn rejects_concrete_exports() {
        let mut def = definition();
        BeanBuilder::<Greeter>::new(&mut def).export(|g| g);
        assert!(matches!(def.problems[0], Error::ExportConflict { .. }));
    }

    #[test]
    fn hooks_accept_unit_and_results() {
        let mut def = definition();
        BeanBuilder::<Greeter>::new(&mut def)
            .init(|_: &Greeter| ())
            .destroy(|_: &Greeter| Err::<(), _>("boom"));

        let value: AnyArc = Arc::new(Greeter);
        assert!((def.init.as_ref().unwrap())(&value).is_ok());
        let err = (def.destroy.as_ref().unwrap())(&value).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
