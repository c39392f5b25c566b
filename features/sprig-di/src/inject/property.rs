use std::{collections::HashMap, time::Duration};

use crate::{
    errors::Error, factories::Arg, inject::Resolve, types::DependencyInfo, wiring::Wiring,
};

macro_rules! property_resolvers {
    ($($ty:ty),*) => {
        $(
            impl Resolve for $ty {
                fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error> {
                    ctx.bind::<$ty>(arg).map(Some)
                }

                fn dependency() -> DependencyInfo {
                    DependencyInfo::property::<$ty>()
                }
            }

            impl Resolve for Option<$ty> {
                fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error> {
                    ctx.bind::<Option<$ty>>(arg).map(Some)
                }

                fn dependency() -> DependencyInfo {
                    DependencyInfo {
                        optional: true,
                        ..DependencyInfo::property::<$ty>()
                    }
                }
            }

            impl Resolve for Vec<$ty> {
                fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error> {
                    ctx.bind::<Vec<$ty>>(arg).map(Some)
                }

                fn dependency() -> DependencyInfo {
                    DependencyInfo::property::<Vec<$ty>>()
                }
            }

            impl Resolve for HashMap<String, $ty> {
                fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error> {
                    ctx.bind::<HashMap<String, $ty>>(arg).map(Some)
                }

                fn dependency() -> DependencyInfo {
                    DependencyInfo::property::<HashMap<String, $ty>>()
                }
            }
        )*
    };
}

property_resolvers!(
    String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32,
    f64, Duration
);
