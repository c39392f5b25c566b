//! Runtime IoC container.
//!
//! Beans are registered as values or constructors, filtered by conditions
//! on refresh, wired once in a deterministic order and destroyed in reverse
//! dependency order on close.

mod bean;
pub mod cond;
mod config;
mod container;
mod destroyer;
mod errors;
mod factories;
mod inject;
mod logger;
mod registry;
mod resolver;
mod supervisor;
mod tag;
pub mod types;
mod wiring;

pub use bean::{Bean, BeanBuilder, BeanDefinition, BeanHandle, BeanStatus, HookResult};
pub use config::{ContainerConfig, ALLOW_CIRCULAR_REFERENCES, DEFAULT_PROFILE_KEY};
pub use container::Container;
pub use errors::{Error, ErrorKind};
pub use factories::{Arg, Args, Callable, Literal, OptionArg};
pub use inject::{Context, Inject, Options, Resolve};
pub use logger::Logger;
pub use supervisor::TaskStats;
pub use tag::{CollectionTag, FieldTag, Selector, WireTag};
pub use wiring::Wiring;

pub use sprig_config::{Properties, PropertyError};
pub use tokio_util::sync::CancellationToken;
