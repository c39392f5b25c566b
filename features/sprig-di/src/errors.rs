use sprig_config::PropertyError;
use thiserror::Error;

use crate::types::DynError;

/// Errors raised by the container
#[derive(Error, Debug)]
pub enum Error {
    /// Registered subject or its argument list is unusable
    #[error("invalid bean '{bean}': {reason}")]
    InvalidBean { bean: String, reason: String },

    /// An export is not a trait object, or the value doesn't satisfy it
    #[error("export conflict on '{bean}': {reason}")]
    ExportConflict { bean: String, reason: String },

    /// Two surviving definitions share an id
    #[error("found duplicate bean id '{0}'")]
    DuplicateBean(String),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("can't find bean '{selector}' of type {type_name}")]
    NoSuchBean {
        selector: String,
        type_name: &'static str,
    },

    #[error("found {} beans for '{selector}' of type {type_name}: {}", .candidates.len(), .candidates.join(", "))]
    AmbiguousBean {
        selector: String,
        type_name: &'static str,
        candidates: Vec<String>,
    },

    #[error("found more than one primary bean for '{selector}': {}", .candidates.join(", "))]
    AmbiguousPrimary {
        selector: String,
        candidates: Vec<String>,
    },

    #[error("found more than one parent bean for '{bean}': {}", .candidates.join(", "))]
    AmbiguousParent {
        bean: String,
        candidates: Vec<String>,
    },

    /// Constructor beans depend on each other through their arguments
    #[error("found circular construction: {}", .path.join(" -> "))]
    CircularConstruction { path: Vec<String> },

    #[error("destroy order can't be linearised: {}", .0.join(" -> "))]
    DestroyerCycle(Vec<String>),

    #[error("container is refreshing or refreshed, registration is closed")]
    RegisterAfterRefresh,

    #[error("container already refreshed")]
    AlreadyRefreshed,

    #[error("container is not refreshed")]
    NotRefreshed,

    /// Lazy fields remained while circular references are disallowed
    #[error("found circular references on lazy fields: {}", .0.join(", "))]
    CircularReferences(Vec<String>),

    #[error("bean '{0}' has been deleted")]
    BeanDeleted(String),

    #[error("invalid tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: &'static str },

    #[error("constructor of '{bean}' failed: {source}")]
    Construct { bean: String, source: DynError },

    #[error("{hook} hook of '{bean}' failed: {source}")]
    Hook {
        bean: String,
        hook: &'static str,
        source: DynError,
    },

    #[error("failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    #[error("invalid expression '{expr}': {reason}")]
    Expression { expr: String, reason: String },

    #[error("supervisor: {0}")]
    Supervisor(String),

    /// Refresh error annotated with the wiring stack at the failure point
    #[error("{source}\nwiring path:\n{path}")]
    Wiring { path: String, source: Box<Error> },
}

/// Semantic classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidBean,
    ExportConflict,
    DuplicateBean,
    MissingProperty,
    PropertyCycle,
    InvalidProperty,
    NoSuchBean,
    AmbiguousBean,
    AmbiguousPrimary,
    AmbiguousParent,
    CircularConstruction,
    DestroyerCycle,
    RegisterAfterRefresh,
    AlreadyRefreshed,
    NotRefreshed,
    BindFailure,
    CircularReferences,
    InvalidTag,
    Construct,
    Hook,
    Expression,
    Supervisor,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidBean { .. } | Error::DowncastFailed { .. } => ErrorKind::InvalidBean,
            Error::ExportConflict { .. } => ErrorKind::ExportConflict,
            Error::DuplicateBean(_) => ErrorKind::DuplicateBean,
            Error::Property(err) => match err {
                PropertyError::Missing(_) => ErrorKind::MissingProperty,
                PropertyError::Cycle(_) => ErrorKind::PropertyCycle,
                PropertyError::Bind { .. } => ErrorKind::BindFailure,
                PropertyError::Syntax { .. } | PropertyError::Conflict { .. } => {
                    ErrorKind::InvalidProperty
                }
            },
            Error::NoSuchBean { .. } | Error::BeanDeleted(_) => ErrorKind::NoSuchBean,
            Error::AmbiguousBean { .. } => ErrorKind::AmbiguousBean,
            Error::AmbiguousPrimary { .. } => ErrorKind::AmbiguousPrimary,
            Error::AmbiguousParent { .. } => ErrorKind::AmbiguousParent,
            Error::CircularConstruction { .. } => ErrorKind::CircularConstruction,
            Error::DestroyerCycle(_) => ErrorKind::DestroyerCycle,
            Error::RegisterAfterRefresh => ErrorKind::RegisterAfterRefresh,
            Error::AlreadyRefreshed => ErrorKind::AlreadyRefreshed,
            Error::NotRefreshed => ErrorKind::NotRefreshed,
            Error::CircularReferences(_) => ErrorKind::CircularReferences,
            Error::InvalidTag { .. } => ErrorKind::InvalidTag,
            Error::Construct { .. } => ErrorKind::Construct,
            Error::Hook { .. } => ErrorKind::Hook,
            Error::Expression { .. } => ErrorKind::Expression,
            Error::Supervisor(_) => ErrorKind::Supervisor,
            Error::Wiring { source, .. } => source.kind(),
        }
    }

    /// The error without its wiring path annotation
    pub fn root(&self) -> &Error {
        match self {
            Error::Wiring { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn invalid_bean(bean: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidBean {
            bean: bean.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn export_conflict(bean: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ExportConflict {
            bean: bean.into(),
            reason: reason.into(),
        }
    }
}
