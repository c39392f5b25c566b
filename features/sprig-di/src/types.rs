use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// Boxed error returned by user constructors and hooks
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased, shared bean value
pub type AnyArc = Arc<dyn Any + Send + Sync + 'static>;

/// Beans are shared across threads after refresh,
/// so anything managed needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Information about a constructor parameter
#[derive(Debug, Clone, Copy)]
pub struct DependencyInfo {
    /// The required type; the element type for collections
    pub type_info: TypeInfo,
    /// If a miss yields `None` instead of an error
    pub optional: bool,
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Bean,
    Collection,
    Property,
    /// Literal-only or container provided values
    Other,
}

impl DependencyInfo {
    pub fn bean<T: ?Sized + 'static>(optional: bool) -> Self {
        DependencyInfo {
            type_info: TypeInfo::of::<T>(),
            optional,
            kind: DependencyKind::Bean,
        }
    }

    pub fn collection<T: ?Sized + 'static>() -> Self {
        DependencyInfo {
            type_info: TypeInfo::of::<T>(),
            optional: false,
            kind: DependencyKind::Collection,
        }
    }

    pub fn property<T: 'static>() -> Self {
        DependencyInfo {
            type_info: TypeInfo::of::<T>(),
            optional: false,
            kind: DependencyKind::Property,
        }
    }

    pub fn other<T: 'static>() -> Self {
        DependencyInfo {
            type_info: TypeInfo::of::<T>(),
            optional: false,
            kind: DependencyKind::Other,
        }
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// True for trait object types such as `dyn Service`
    pub fn is_interface(&self) -> bool {
        self.type_name.starts_with("dyn ")
    }

    /// Final path segment without generics or auto-trait bounds.
    ///
    /// `dyn app::Service + Send + Sync` becomes `Service`,
    /// `app::Pool<app::Conn>` becomes `Pool`.
    pub fn short_name(&self) -> &'static str {
        short_name(self.type_name)
    }
}

pub(crate) fn short_name(type_name: &str) -> &str {
    let name = type_name.strip_prefix("dyn ").unwrap_or(type_name);
    let name = name.split(" + ").next().unwrap_or(name);
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}
