use std::{any::type_name, collections::HashMap, time::Duration};

use crate::{
    errors::PropertyError,
    properties::{normalize, Properties},
};

/// Parsed `${key[:=default]}` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindTag {
    pub key: String,
    pub default: Option<String>,
}

impl BindTag {
    /// Parses a tag consisting of exactly one `${…}` reference
    pub fn parse(tag: &str) -> Result<Self, PropertyError> {
        let tag = tag.trim();
        let syntax = |reason| PropertyError::Syntax {
            reference: tag.to_string(),
            reason,
        };

        let inner = tag
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| syntax("expected '${key[:=default]}'"))?;

        let (key, default) = match inner.split_once(":=") {
            Some((key, default)) => (key.trim(), Some(default.to_string())),
            None => (inner.trim(), None),
        };
        if key.is_empty() {
            return Err(syntax("empty key"));
        }
        if key.contains("${") || key.contains('}') {
            return Err(syntax("nested reference in key"));
        }

        Ok(BindTag {
            key: key.to_string(),
            default,
        })
    }
}

/// Conversion from a single resolved property string
pub trait FromProperty: Sized {
    fn from_property(raw: &str) -> Result<Self, String>;
}

/// Types that can be filled from the property store
pub trait Bind: Sized {
    fn bind(properties: &Properties, tag: &BindTag) -> Result<Self, PropertyError>;
}

impl<T: Bind> Bind for Option<T> {
    fn bind(properties: &Properties, tag: &BindTag) -> Result<Self, PropertyError> {
        match T::bind(properties, tag) {
            Ok(value) => Ok(Some(value)),
            Err(PropertyError::Missing(key)) if key == normalize(&tag.key) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn convert<T: FromProperty>(key: &str, raw: &str) -> Result<T, PropertyError> {
    T::from_property(raw).map_err(|reason| PropertyError::Bind {
        key: key.to_string(),
        value: raw.to_string(),
        target: type_name::<T>(),
        reason,
    })
}

fn bind_scalar<T: FromProperty>(properties: &Properties, tag: &BindTag) -> Result<T, PropertyError> {
    let raw = properties
        .lookup(&tag.key, tag.default.as_deref())?
        .ok_or_else(|| PropertyError::Missing(tag.key.to_lowercase()))?;
    convert(&tag.key, &raw)
}

/// Lists come from `key[0]`, `key[1]`, … or from a comma separated value
fn bind_list<T: FromProperty>(
    properties: &Properties,
    tag: &BindTag,
) -> Result<Vec<T>, PropertyError> {
    let indexed = properties.indexed(&tag.key);
    if !indexed.is_empty() {
        return indexed
            .into_iter()
            .map(|raw| properties.resolve(raw).and_then(|raw| convert(&tag.key, &raw)))
            .collect();
    }

    let raw = properties
        .lookup(&tag.key, tag.default.as_deref())?
        .ok_or_else(|| PropertyError::Missing(tag.key.to_lowercase()))?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',').map(|item| convert(&tag.key, item.trim())).collect()
}

/// Maps come from the direct children of `key`; an empty default yields an empty map
fn bind_map<T: FromProperty>(
    properties: &Properties,
    tag: &BindTag,
) -> Result<HashMap<String, T>, PropertyError> {
    let mut map = HashMap::new();
    for (name, raw) in properties.children(&tag.key) {
        let raw = properties.resolve(raw)?;
        map.insert(name.to_string(), convert(&tag.key, &raw)?);
    }

    if map.is_empty() {
        match tag.default.as_deref() {
            Some(default) if properties.resolve(default)?.trim().is_empty() => {}
            _ => return Err(PropertyError::Missing(tag.key.to_lowercase())),
        }
    }
    Ok(map)
}

macro_rules! from_str_property {
    ($($ty:ty),*) => {
        $(
            impl FromProperty for $ty {
                fn from_property(raw: &str) -> Result<Self, String> {
                    raw.trim().parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )*
    };
}

from_str_property!(
    char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl FromProperty for String {
    fn from_property(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl FromProperty for bool {
    fn from_property(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(format!("'{other}' is not a boolean")),
        }
    }
}

impl FromProperty for Duration {
    /// Accepts `1h30m`, `250ms`, `1.5s`; units are `ns`, `us`, `ms`, `s`, `m`, `h`
    fn from_property(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw == "0" {
            return Ok(Duration::ZERO);
        }

        let mut total = 0f64;
        let mut rest = raw;
        while !rest.is_empty() {
            let number_len = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .ok_or_else(|| format!("missing unit in duration '{raw}'"))?;
            let number: f64 = rest[..number_len]
                .parse()
                .map_err(|_| format!("invalid number in duration '{raw}'"))?;
            rest = &rest[number_len..];

            let unit_len = rest
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(rest.len());
            let seconds = match &rest[..unit_len] {
                "ns" => 1e-9,
                "us" | "µs" => 1e-6,
                "ms" => 1e-3,
                "s" => 1.0,
                "m" => 60.0,
                "h" => 3600.0,
                unit => return Err(format!("unknown unit '{unit}' in duration '{raw}'")),
            };
            total += number * seconds;
            rest = &rest[unit_len..];
        }

        Duration::try_from_secs_f64(total).map_err(|err| format!("{err} in duration '{raw}'"))
    }
}

macro_rules! bind_via_from_property {
    ($($ty:ty),*) => {
        $(
            impl Bind for $ty {
                fn bind(properties: &Properties, tag: &BindTag) -> Result<Self, PropertyError> {
                    bind_scalar(properties, tag)
                }
            }

            impl Bind for Vec<$ty> {
                fn bind(properties: &Properties, tag: &BindTag) -> Result<Self, PropertyError> {
                    bind_list(properties, tag)
                }
            }

            impl Bind for HashMap<String, $ty> {
                fn bind(properties: &Properties, tag: &BindTag) -> Result<Self, PropertyError> {
                    bind_map(properties, tag)
                }
            }
        )*
    };
}

bind_via_from_property!(
    String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32,
    f64, Duration
);
