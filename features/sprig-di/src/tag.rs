use std::fmt;

use crate::{
    bean::{BeanDefinition, BeanHandle},
    errors::Error,
    types::{short_name, TypeInfo},
};

/// Parsed selector of the form `[typeName][:beanName][?]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireTag {
    pub type_name: String,
    pub bean_name: String,
    pub nullable: bool,
}

impl WireTag {
    pub fn parse(raw: &str) -> WireTag {
        let mut raw = raw.trim();
        let mut nullable = false;
        if let Some(stripped) = raw.strip_suffix('?') {
            raw = stripped;
            nullable = true;
        }

        let (type_name, bean_name) = match split_selector(raw) {
            Some((type_name, bean_name)) => (type_name.trim(), bean_name.trim()),
            None => ("", raw),
        };

        WireTag {
            type_name: type_name.to_string(),
            bean_name: bean_name.to_string(),
            nullable,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.type_name.is_empty() && self.bean_name.is_empty()
    }

    /// The `*` placeholder of collection tags
    pub fn is_any(&self) -> bool {
        self.type_name.is_empty() && self.bean_name == "*"
    }

    /// Type part matches by full type name, path suffix or short name of the
    /// bean type or one of its exports; bean part by exact name.
    /// Empty parts match everything.
    pub fn matches(&self, bean: &BeanDefinition) -> bool {
        let type_matches = self.type_name.is_empty()
            || type_name_matches(bean.type_name(), &self.type_name)
            || bean
                .exports
                .iter()
                .any(|export| type_name_matches(export.info.type_name, &self.type_name));
        let name_matches = self.bean_name.is_empty() || bean.name() == self.bean_name;
        type_matches && name_matches
    }
}

impl fmt::Display for WireTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_name.is_empty() {
            write!(f, "{}:", self.type_name)?;
        }
        f.write_str(&self.bean_name)?;
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

/// Splits at the first `:` that is not part of a `::` path separator
fn split_selector(raw: &str) -> Option<(&str, &str)> {
    let bytes = raw.as_bytes();
    (0..bytes.len())
        .find(|&i| {
            bytes[i] == b':'
                && bytes.get(i + 1) != Some(&b':')
                && (i == 0 || bytes[i - 1] != b':')
        })
        .map(|i| (&raw[..i], &raw[i + 1..]))
}

pub(crate) fn type_name_matches(full: &str, wanted: &str) -> bool {
    let full = trim_trait_object(full);
    let wanted = trim_trait_object(wanted);
    full == wanted
        || short_name(full) == wanted
        || full
            .strip_suffix(wanted)
            .is_some_and(|head| head.ends_with("::"))
}

/// `dyn a::B + Send` becomes `a::B`
fn trim_trait_object(name: &str) -> &str {
    let name = name.strip_prefix("dyn ").unwrap_or(name);
    name.split(" + ").next().unwrap_or(name)
}

/// Ordered selector list for collections, e.g. `a,*,b?`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionTag {
    pub items: Vec<WireTag>,
    pub nullable: bool,
}

impl CollectionTag {
    pub fn parse(raw: &str) -> Result<CollectionTag, Error> {
        let mut raw = raw.trim();
        let mut nullable = false;
        if let Some(stripped) = raw.strip_suffix('?') {
            raw = stripped;
            nullable = true;
        }

        let items: Vec<WireTag> = if raw.is_empty() {
            Vec::new()
        } else {
            raw.split(',').map(WireTag::parse).collect()
        };

        if items.iter().filter(|item| item.is_any()).count() > 1 {
            return Err(Error::InvalidTag {
                tag: raw.to_string(),
                reason: "more than one '*'",
            });
        }

        Ok(CollectionTag { items, nullable })
    }
}

impl fmt::Display for CollectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, item) in self.items.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            item.fmt(f)?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

/// Selector on a field tag: `<selector>[,lazy]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTag<'a> {
    pub selector: &'a str,
    pub lazy: bool,
}

impl<'a> FieldTag<'a> {
    pub fn parse(raw: &'a str) -> FieldTag<'a> {
        let raw = raw.trim();
        match raw.strip_suffix(",lazy") {
            Some(selector) => FieldTag {
                selector: selector.trim(),
                lazy: true,
            },
            None => FieldTag {
                selector: raw,
                lazy: false,
            },
        }
    }
}

/// What a lookup is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(WireTag),
    Type(TypeInfo),
    Bean(BeanHandle),
}

impl Selector {
    pub fn of<T: ?Sized + 'static>() -> Selector {
        Selector::Type(TypeInfo::of::<T>())
    }

    pub(crate) fn matches(&self, bean: &BeanDefinition) -> bool {
        match self {
            Selector::Tag(tag) => tag.matches(bean),
            Selector::Type(info) => bean.provides(info.type_id),
            Selector::Bean(handle) => bean.handle() == *handle,
        }
    }
}

impl From<&str> for Selector {
    fn from(raw: &str) -> Self {
        Selector::Tag(WireTag::parse(raw))
    }
}

impl From<String> for Selector {
    fn from(raw: String) -> Self {
        Selector::Tag(WireTag::parse(&raw))
    }
}

impl From<BeanHandle> for Selector {
    fn from(handle: BeanHandle) -> Self {
        Selector::Bean(handle)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Tag(tag) => tag.fmt(f),
            Selector::Type(info) => info.fmt(f),
            Selector::Bean(handle) => write!(f, "bean #{}", handle.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_tags() {
        assert_eq!(
            WireTag::parse("app::Zero:z?"),
            WireTag {
                type_name: "app::Zero".into(),
                bean_name: "z".into(),
                nullable: true
            }
        );
        assert_eq!(
            WireTag::parse("Zero:z"),
            WireTag {
                type_name: "Zero".into(),
                bean_name: "z".into(),
                nullable: false
            }
        );
        assert_eq!(WireTag::parse("z").bean_name, "z");
        assert_eq!(WireTag::parse(":z").type_name, "");
        assert_eq!(WireTag::parse("Zero:").bean_name, "");
        assert!(WireTag::parse("").is_empty());
        assert!(WireTag::parse("*").is_any());
        assert_eq!(WireTag::parse("Zero:z?").to_string(), "Zero:z?");
    }

    #[test]
    fn matches_type_names() {
        let full = "my_app::nodes::Node";
        assert!(type_name_matches(full, full));
        assert!(type_name_matches(full, "Node"));
        assert!(type_name_matches(full, "nodes::Node"));
        assert!(!type_name_matches(full, "ode"));
        assert!(!type_name_matches(full, "Nodes"));
        assert!(type_name_matches("dyn my_app::Greet + Send", "Greet"));
        assert!(type_name_matches("dyn my_app::Greet", "dyn my_app::Greet"));
        assert!(type_name_matches("dyn my_app::Greet", "my_app::Greet"));
    }

    #[test]
    fn parses_collection_tags() {
        let tag = CollectionTag::parse("n1, *, n3?").unwrap();
        assert_eq!(tag.items.len(), 3);
        assert!(tag.items[1].is_any());
        assert!(tag.nullable);
        assert!(!tag.items[2].nullable);

        assert!(CollectionTag::parse("").unwrap().items.is_empty());
        let err = CollectionTag::parse("*,a,*").unwrap_err();
        assert!(matches!(err, Error::InvalidTag { .. }));
    }

    #[test]
    fn parses_field_tags() {
        assert_eq!(
            FieldTag::parse("a:b?,lazy"),
            FieldTag {
                selector: "a:b?",
                lazy: true
            }
        );
        assert!(!FieldTag::parse("${x}").lazy);
    }
}
