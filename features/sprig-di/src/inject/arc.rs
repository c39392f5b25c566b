use std::{collections::HashMap, sync::Arc};

use crate::{
    errors::Error,
    factories::Arg,
    inject::Resolve,
    tag::{CollectionTag, WireTag},
    types::DependencyInfo,
    wiring::Wiring,
};

impl<T: ?Sized + Send + Sync + 'static> Resolve for Arc<T> {
    fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error> {
        let tag = WireTag::parse(&ctx.selector(arg)?);
        ctx.bean::<T>(&tag)
    }

    fn dependency() -> DependencyInfo {
        DependencyInfo::bean::<T>(false)
    }
}

impl<T: ?Sized + Send + Sync + 'static> Resolve for Option<Arc<T>> {
    fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error> {
        let mut tag = WireTag::parse(&ctx.selector(arg)?);
        tag.nullable = true;
        ctx.bean::<T>(&tag).map(Some)
    }

    fn dependency() -> DependencyInfo {
        DependencyInfo::bean::<T>(true)
    }
}

impl<T: ?Sized + Send + Sync + 'static> Resolve for Vec<Arc<T>> {
    fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error> {
        let tag = CollectionTag::parse(&ctx.selector(arg)?)?;
        let beans = ctx.beans::<T>(&tag)?;
        Ok(Some(beans.into_iter().map(|(_, bean)| bean).collect()))
    }

    fn dependency() -> DependencyInfo {
        DependencyInfo::collection::<T>()
    }
}

/// Collected beans keyed by bean name
impl<T: ?Sized + Send + Sync + 'static> Resolve for HashMap<String, Arc<T>> {
    fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error> {
        let tag = CollectionTag::parse(&ctx.selector(arg)?)?;
        let beans = ctx.beans::<T>(&tag)?;
        Ok(Some(
            beans
                .into_iter()
                .map(|(def, bean)| (def.name().to_string(), bean))
                .collect(),
        ))
    }

    fn dependency() -> DependencyInfo {
        DependencyInfo::collection::<T>()
    }
}
