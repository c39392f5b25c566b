use std::{
    any::{type_name, Any},
    fmt,
    sync::Arc,
};

use crate::{
    cond::Condition,
    errors::Error,
    inject::Resolve,
    types::{DependencyInfo, DependencyKind},
    wiring::Wiring,
};

/// A constructor or invocable function.
///
/// Implemented for every `Fn(A1, …, A8) -> R` whose parameters implement
/// [`Resolve`]. `M` is the parameter tuple and only exists to keep the
/// implementations apart.
pub trait Callable<M>: Send + Sync + 'static {
    type Output;

    /// Returns a list of parameters the callable requires
    fn params() -> Vec<DependencyInfo>;

    /// Resolves every parameter from `args` and calls through
    fn call(&self, args: &mut Args<'_, '_>) -> Result<Self::Output, Error>;
}

macro_rules! impl_callable {
    ($($param:ident),*) => {
        impl<Func, Out, $($param,)*> Callable<($($param,)*)> for Func
        where
            Func: Fn($($param),*) -> Out + Send + Sync + 'static,
            $($param: Resolve,)*
        {
            type Output = Out;

            fn params() -> Vec<DependencyInfo> {
                vec![$(<$param as Resolve>::dependency(),)*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, args: &mut Args<'_, '_>) -> Result<Out, Error> {
                $(let $param = args.next::<$param>()?;)*
                Ok((self)($($param),*))
            }
        }
    };
}

impl_callable!();
impl_callable!(A1);
impl_callable!(A1, A2);
impl_callable!(A1, A2, A3);
impl_callable!(A1, A2, A3, A4);
impl_callable!(A1, A2, A3, A4, A5);
impl_callable!(A1, A2, A3, A4, A5, A6);
impl_callable!(A1, A2, A3, A4, A5, A6, A7);
impl_callable!(A1, A2, A3, A4, A5, A6, A7, A8);

/// One bound argument of a constructor or invocation
pub enum Arg {
    /// Selector, collection selector or `${…}` property reference.
    /// The empty tag selects by parameter type alone.
    Tag(String),
    /// Literal handed to the parameter as-is
    Value(Literal),
    /// Selector of the parent bean; only valid as the first argument
    Parent(String),
    /// Option group for an [`crate::Options`] parameter
    Options(Vec<OptionArg>),
}

impl Arg {
    pub fn value<T: Clone + Send + Sync + 'static>(value: T) -> Arg {
        Arg::Value(Literal {
            type_name: type_name::<T>(),
            make: Arc::new(move || Box::new(value.clone()) as Box<dyn Any + Send>),
        })
    }

    pub fn parent(selector: impl Into<String>) -> Arg {
        Arg::Parent(selector.into())
    }

    pub fn options(options: impl IntoIterator<Item = OptionArg>) -> Arg {
        Arg::Options(options.into_iter().collect())
    }

    pub(crate) fn empty() -> Arg {
        Arg::Tag(String::new())
    }
}

impl From<&str> for Arg {
    fn from(tag: &str) -> Self {
        Arg::Tag(tag.to_string())
    }
}

impl From<String> for Arg {
    fn from(tag: String) -> Self {
        Arg::Tag(tag)
    }
}

impl From<OptionArg> for Arg {
    fn from(option: OptionArg) -> Self {
        Arg::Options(vec![option])
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            Arg::Value(literal) => f.debug_tuple("Value").field(&literal.type_name).finish(),
            Arg::Parent(tag) => f.debug_tuple("Parent").field(tag).finish(),
            Arg::Options(options) => f.debug_tuple("Options").field(&options.len()).finish(),
        }
    }
}

/// Builds a `Vec<Arg>` from tags, literals and option groups
///
/// ```ignore
/// container.provide(Server::new, args!["${server.port}", Arg::value(4)])?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),+]
    };
}

/// Cloneable literal argument
#[derive(Clone)]
pub struct Literal {
    type_name: &'static str,
    make: Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>,
}

impl Literal {
    pub(crate) fn take<A: 'static>(&self) -> Result<A, Error> {
        (self.make)()
            .downcast::<A>()
            .map(|value| *value)
            .map_err(|_| Error::DowncastFailed {
                required_type: type_name::<A>(),
                actual_type: self.type_name,
            })
    }
}

type OptionCall =
    Arc<dyn Fn(&mut Args<'_, '_>) -> Result<Box<dyn Any + Send>, Error> + Send + Sync>;

/// A callable producing one option, with its own arguments and conditions.
///
/// The option is only built when every condition holds.
pub struct OptionArg {
    call: OptionCall,
    output: &'static str,
    pub(crate) params: Vec<DependencyInfo>,
    pub(crate) args: Vec<Arg>,
    conditions: Vec<Arc<dyn Condition>>,
}

impl OptionArg {
    pub fn new<F, M>(f: F, args: Vec<Arg>) -> OptionArg
    where
        F: Callable<M>,
        F::Output: Send + 'static,
        M: 'static,
    {
        OptionArg {
            call: Arc::new(move |call_args: &mut Args<'_, '_>| {
                f.call(call_args)
                    .map(|option| Box::new(option) as Box<dyn Any + Send>)
            }),
            output: type_name::<F::Output>(),
            params: F::params(),
            args,
            conditions: Vec::new(),
        }
    }

    pub fn on(mut self, condition: impl Condition) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }

    /// Builds the option, or `None` when a condition doesn't hold
    pub(crate) fn build<O: 'static>(&self, ctx: &mut Wiring<'_>) -> Result<Option<O>, Error> {
        for condition in &self.conditions {
            if !condition.matches(&*ctx)? {
                return Ok(None);
            }
        }

        let mut args = Args::new(ctx, &self.args);
        let option = (self.call)(&mut args)?;
        option
            .downcast::<O>()
            .map(|option| Some(*option))
            .map_err(|_| Error::DowncastFailed {
                required_type: type_name::<O>(),
                actual_type: self.output,
            })
    }
}

/// Argument cursor handed to [`Callable::call`]
pub struct Args<'a, 'c> {
    wiring: &'a mut Wiring<'c>,
    args: &'a [Arg],
    next: usize,
}

impl<'a, 'c> Args<'a, 'c> {
    pub(crate) fn new(wiring: &'a mut Wiring<'c>, args: &'a [Arg]) -> Self {
        Args {
            wiring,
            args,
            next: 0,
        }
    }

    /// Resolves the next parameter; missing arguments select by type
    pub fn next<A: Resolve>(&mut self) -> Result<A, Error> {
        let index = self.next;
        self.next += 1;

        let empty = Arg::empty();
        let arg = self.args.get(index).unwrap_or(&empty);
        if let Arg::Value(literal) = arg {
            return literal.take::<A>();
        }

        A::resolve(self.wiring, arg)?.ok_or_else(|| Error::NoSuchBean {
            selector: format!("{arg:?}"),
            type_name: type_name::<A>(),
        })
    }

    pub fn wiring(&mut self) -> &mut Wiring<'c> {
        self.wiring
    }
}

/// Checks an argument list against the parameters it will be bound to
pub(crate) fn check_args(
    bean: &str,
    params: &[DependencyInfo],
    args: &[Arg],
) -> Result<(), Error> {
    if args.len() > params.len() {
        return Err(Error::invalid_bean(
            bean,
            format!(
                "takes {} parameters but {} arguments were given",
                params.len(),
                args.len()
            ),
        ));
    }

    for (index, (arg, param)) in args.iter().zip(params).enumerate() {
        match arg {
            Arg::Parent(_) if index > 0 => {
                return Err(Error::invalid_bean(
                    bean,
                    format!("argument #{index} selects a parent, only the first argument can"),
                ));
            }
            Arg::Parent(_) if param.kind != DependencyKind::Bean => {
                return Err(Error::invalid_bean(
                    bean,
                    format!("parent parameter {} is not a bean", param.type_info),
                ));
            }
            Arg::Options(options) => {
                for option in options {
                    check_args(bean, &option.params, &option.args)?;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Repo;

    fn params_of<F: Callable<M>, M>(_: &F) -> Vec<DependencyInfo> {
        F::params()
    }

    #[test]
    fn lists_parameters() {
        let ctor = |_: Arc<Repo>, _: Option<Arc<Repo>>, _: String| ();
        let params = params_of(&ctor);
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].kind, DependencyKind::Bean);
        assert!(params[1].optional);
        assert_eq!(params[2].kind, DependencyKind::Property);
    }

    #[test]
    fn checks_argument_lists() {
        let params = params_of(&|_: Arc<Repo>, _: u16| ());
        assert!(check_args("b", &params, &args!["", "${port}"]).is_ok());
        assert!(check_args("b", &params, &args![Arg::parent("repo")]).is_ok());

        let too_many = check_args("b", &params, &args!["", "", ""]).unwrap_err();
        assert!(matches!(too_many, Error::InvalidBean { .. }));

        let misplaced = check_args("b", &params, &args!["", Arg::parent("repo")]).unwrap_err();
        assert!(matches!(misplaced, Error::InvalidBean { .. }));
    }

    #[test]
    fn literals_check_their_type() {
        let Arg::Value(literal) = Arg::value(7u16) else {
            unreachable!()
        };
        assert_eq!(literal.take::<u16>().unwrap(), 7);
        assert_eq!(literal.take::<u16>().unwrap(), 7);
        assert!(matches!(
            literal.take::<String>(),
            Err(Error::DowncastFailed { .. })
        ));
    }
}
