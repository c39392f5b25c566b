use std::{ops::Deref, slice, vec};

use crate::{
    errors::Error, factories::Arg, inject::Resolve, types::DependencyInfo, wiring::Wiring,
};

/// Options built from an option group argument.
///
/// Each [`crate::OptionArg`] whose conditions hold contributes one `O`,
/// in argument order. Without an option group the list is empty.
#[derive(Debug)]
pub struct Options<O>(Vec<O>);

impl<O> Options<O> {
    pub fn into_inner(self) -> Vec<O> {
        self.0
    }
}

impl<O> Deref for Options<O> {
    type Target = [O];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<O> IntoIterator for Options<O> {
    type Item = O;
    type IntoIter = vec::IntoIter<O>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, O> IntoIterator for &'a Options<O> {
    type Item = &'a O;
    type IntoIter = slice::Iter<'a, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<O: 'static> Resolve for Options<O> {
    fn resolve(ctx: &mut Wiring<'_>, arg: &Arg) -> Result<Option<Self>, Error> {
        match arg {
            Arg::Options(options) => {
                let mut built = Vec::with_capacity(options.len());
                for option in options {
                    if let Some(value) = option.build::<O>(ctx)? {
                        built.push(value);
                    }
                }
                Ok(Some(Options(built)))
            }
            Arg::Tag(tag) if tag.is_empty() => Ok(Some(Options(Vec::new()))),
            other => Err(Error::InvalidTag {
                tag: format!("{other:?}"),
                reason: "option parameters take an option group",
            }),
        }
    }

    fn dependency() -> DependencyInfo {
        DependencyInfo::other::<O>()
    }
}
