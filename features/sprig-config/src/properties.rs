use std::collections::{BTreeMap, BTreeSet};

use crate::{
    bind::{Bind, BindTag},
    errors::PropertyError,
};

/// Keyed string store the container reads configuration from.
///
/// Every key is stored lower-cased. A key is either a leaf holding a value or
/// the parent of other keys, never both: `a.b` and `a.b.c` can't coexist.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    values: BTreeMap<String, String>,
    /// Proper prefixes of stored keys, split at `.` and `[`
    parents: BTreeSet<String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, replacing an existing leaf with the same key
    pub fn set(
        &mut self,
        key: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Result<&mut Self, PropertyError> {
        let key = normalize(key.as_ref());
        if key.is_empty() {
            return Err(PropertyError::Syntax {
                reference: key,
                reason: "empty key",
            });
        }

        if self.parents.contains(&key) {
            let existing = self
                .first_descendant(&key)
                .unwrap_or_default()
                .to_string();
            return Err(PropertyError::Conflict { key, existing });
        }

        for prefix in prefixes(&key) {
            if self.values.contains_key(prefix) {
                return Err(PropertyError::Conflict {
                    key: key.clone(),
                    existing: prefix.to_string(),
                });
            }
        }

        for prefix in prefixes(&key) {
            self.parents.insert(prefix.to_string());
        }

        tracing::trace!(key = %key, "property set");
        self.values.insert(key, value.into());
        Ok(self)
    }

    /// Raw value of a leaf key, without `${…}` expansion
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize(key)).map(String::as_str)
    }

    /// Raw value of a leaf key or `default` when it is missing
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// True when the key is a leaf or the parent of other keys
    pub fn has(&self, key: &str) -> bool {
        let key = normalize(key);
        self.values.contains_key(&key) || self.parents.contains(&key)
    }

    /// All leaf keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Expands every `${key[:=default]}` span in `template`.
    ///
    /// Values and defaults are expanded recursively. A reference that
    /// comes back to a key still being expanded fails with
    /// [`PropertyError::Cycle`].
    pub fn resolve(&self, template: &str) -> Result<String, PropertyError> {
        self.expand(template, &mut Vec::new())
    }

    /// Binds the value referenced by a `${key[:=default]}` tag to `T`
    pub fn bind<T: Bind>(&self, tag: &str) -> Result<T, PropertyError> {
        let tag = BindTag::parse(tag)?;
        T::bind(self, &tag)
    }

    /// Resolved value of `key`, falling back to the resolved `default`
    pub(crate) fn lookup(
        &self,
        key: &str,
        default: Option<&str>,
    ) -> Result<Option<String>, PropertyError> {
        let mut stack = Vec::new();
        match self.get(key) {
            Some(_) => self.expand_key(key, None, &mut stack).map(Some),
            None => default.map(|d| self.expand(d, &mut stack)).transpose(),
        }
    }

    /// Direct leaf children of `key` as `(segment, value)`, e.g. `a.x` for `a`
    pub(crate) fn children<'a>(
        &'a self,
        key: &str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let prefix = format!("{}.", normalize(key));
        let len = prefix.len();
        self.values
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(prefix.as_str()))
            .map(move |(k, v)| (&k[len..], v.as_str()))
            .filter(|(segment, _)| !segment.contains(['.', '[']))
    }

    /// Values of `key[0]`, `key[1]`, … up to the first gap
    pub(crate) fn indexed(&self, key: &str) -> Vec<&str> {
        let key = normalize(key);
        (0..)
            .map_while(|i| self.values.get(&format!("{key}[{i}]")))
            .map(String::as_str)
            .collect()
    }

    /// Any stored key nested below `key`
    fn first_descendant(&self, key: &str) -> Option<&str> {
        self.values
            .range(key.to_string()..)
            .map(|(k, _)| k.as_str())
            .find(|k| {
                k.len() > key.len()
                    && k.starts_with(key)
                    && matches!(k.as_bytes()[key.len()], b'.' | b'[')
            })
    }

    fn expand(&self, template: &str, stack: &mut Vec<String>) -> Result<String, PropertyError> {
        let Some(start) = template.find("${") else {
            return Ok(template.to_string());
        };

        let end = closing_brace(template, start)?;
        let inner = &template[start + 2..end];
        let (key, default) = match inner.split_once(":=") {
            Some((key, default)) => (key.trim(), Some(default)),
            None => (inner.trim(), None),
        };
        if key.is_empty() {
            return Err(PropertyError::Syntax {
                reference: template.to_string(),
                reason: "empty key",
            });
        }

        let value = self.expand_key(key, default, stack)?;
        let rest = self.expand(&template[end + 1..], stack)?;
        Ok(format!("{}{}{}", &template[..start], value, rest))
    }

    fn expand_key(
        &self,
        key: &str,
        default: Option<&str>,
        stack: &mut Vec<String>,
    ) -> Result<String, PropertyError> {
        let key = normalize(key);
        match self.values.get(&key) {
            Some(value) => {
                if stack.contains(&key) {
                    let mut chain = stack.clone();
                    chain.push(key);
                    return Err(PropertyError::Cycle(chain));
                }
                stack.push(key);
                let expanded = self.expand(value, stack);
                stack.pop();
                expanded
            }
            None => match default {
                Some(default) => self.expand(default, stack),
                None => Err(PropertyError::Missing(key)),
            },
        }
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Properties {
    /// Collects pairs, skipping with a warning the ones that conflict with earlier keys
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (key, value) in iter {
            if let Err(err) = properties.set(key, value) {
                tracing::warn!("skipping property: {err}");
            }
        }
        properties
    }
}

pub(crate) fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Proper prefixes of a key: `a.b[0]` yields `a` and `a.b`
fn prefixes(key: &str) -> impl Iterator<Item = &str> {
    key.char_indices()
        .filter(|(i, c)| *i > 0 && (*c == '.' || *c == '['))
        .map(move |(i, _)| &key[..i])
}

/// Index of the `}` closing the `${` at `start`, honouring nested references
fn closing_brace(template: &str, start: usize) -> Result<usize, PropertyError> {
    let bytes = template.as_bytes();
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            depth += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'}' {
            depth -= 1;
            if depth == 0 {
                return Ok(i);
            }
        }
        i += 1;
    }

    Err(PropertyError::Syntax {
        reference: template.to_string(),
        reason: "unclosed '${'",
    })
}
