use crate::{errors::Error, factories::Arg, types::DependencyInfo, wiring::Wiring};

mod arc;
mod cell;
mod context;
mod options;
mod property;

pub use cell::Inject;
pub use context::Context;
pub use options::Options;

/// A parameter or field type the container knows how to produce
pub trait Resolve: Sized + 'static {
    /// Produces the value selected by `arg`.
    ///
    /// `Ok(None)` is a miss on a nullable selector.
    fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error>;

    /// Describes the parameter for argument validation
    fn dependency() -> DependencyInfo;
}
