//! Flat property store with `${key:=default}` references and typed binding.
//!
//! Keys are dotted paths (`server.http.port`) with optional list indexes
//! (`server.hosts[0]`). Comparison is case-insensitive.

mod bind;
mod errors;
mod properties;

pub use bind::{Bind, BindTag, FromProperty};
pub use errors::PropertyError;
pub use properties::Properties;
