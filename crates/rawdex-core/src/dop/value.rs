//! DOP value tree and typed accessors.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::DopError;

/// Keyed entries of a DOP group. Duplicate keys keep the last value.
pub type DopGroup = BTreeMap<String, DopValue>;

/// A value in a DOP document.
#[derive(Debug, Clone, PartialEq)]
pub enum DopValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    List(Vec<DopValue>),
    Group(DopGroup),
}

impl DopValue {
    /// Human-readable name of the variant, used in access errors.
    pub fn variant_name(&self) -> &'static str {
        match self {
            DopValue::Bool(_) => "bool",
            DopValue::Int(_) => "integer",
            DopValue::Real(_) => "real",
            DopValue::Text(_) => "string",
            DopValue::List(_) => "list",
            DopValue::Group(_) => "group",
        }
    }

    /// Walk a chain of group keys starting from this value.
    pub fn get_path<'a, T: FromDopValue<'a>>(&'a self, path: &[&str]) -> Result<T, DopError> {
        get_map_value(get::<&DopGroup>(self)?, path)
    }
}

/// A top-level document: one key bound to one value.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValuePair {
    pub key: String,
    pub value: DopValue,
}

/// Narrowing from a [`DopValue`] to one of its variants.
pub trait FromDopValue<'a>: Sized {
    /// Variant name reported when narrowing fails.
    const EXPECTED: &'static str;

    fn narrow(value: &'a DopValue) -> Option<Self>;
}

impl<'a> FromDopValue<'a> for bool {
    const EXPECTED: &'static str = "bool";

    fn narrow(value: &'a DopValue) -> Option<Self> {
        match value {
            DopValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl<'a> FromDopValue<'a> for i64 {
    const EXPECTED: &'static str = "integer";

    fn narrow(value: &'a DopValue) -> Option<Self> {
        match value {
            DopValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl<'a> FromDopValue<'a> for f64 {
    const EXPECTED: &'static str = "real";

    fn narrow(value: &'a DopValue) -> Option<Self> {
        match value {
            DopValue::Real(r) => Some(*r),
            _ => None,
        }
    }
}

impl<'a> FromDopValue<'a> for &'a str {
    const EXPECTED: &'static str = "string";

    fn narrow(value: &'a DopValue) -> Option<Self> {
        match value {
            DopValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl<'a> FromDopValue<'a> for &'a [DopValue] {
    const EXPECTED: &'static str = "list";

    fn narrow(value: &'a DopValue) -> Option<Self> {
        match value {
            DopValue::List(l) => Some(l.as_slice()),
            _ => None,
        }
    }
}

impl<'a> FromDopValue<'a> for &'a DopGroup {
    const EXPECTED: &'static str = "group";

    fn narrow(value: &'a DopValue) -> Option<Self> {
        match value {
            DopValue::Group(g) => Some(g),
            _ => None,
        }
    }
}

/// Narrow a value to a specific variant.
pub fn get<'a, T: FromDopValue<'a>>(value: &'a DopValue) -> Result<T, DopError> {
    T::narrow(value).ok_or(DopError::BadVariantAccess {
        expected: T::EXPECTED,
        found: value.variant_name(),
    })
}

/// Walk `path` through nested groups and narrow the value at its end.
///
/// Every key but the last must name a group.
pub fn get_map_value<'a, T: FromDopValue<'a>>(
    group: &'a DopGroup,
    path: &[&str],
) -> Result<T, DopError> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| DopError::MissingKey(String::new()))?;

    let mut current = group;
    for key in parents {
        let value = current
            .get(*key)
            .ok_or_else(|| DopError::MissingKey((*key).to_string()))?;
        current = get::<&DopGroup>(value)?;
    }

    let value = current
        .get(*last)
        .ok_or_else(|| DopError::MissingKey((*last).to_string()))?;
    get(value)
}

// Printing produces DOP syntax, so printed documents parse back to the same
// tree. An empty group prints as `{}`, which parses as an empty list.

impl fmt::Display for DopValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DopValue::Bool(b) => write!(f, "{b}"),
            DopValue::Int(i) => write!(f, "{i}"),
            // Debug keeps a decimal point or an exponent, as a real requires.
            DopValue::Real(r) => write!(f, "{r:?}"),
            DopValue::Text(s) => write!(f, "\"{s}\""),
            DopValue::List(entries) => {
                f.write_str("{")?;
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{entry}")?;
                }
                f.write_str("}")
            }
            DopValue::Group(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for KeyValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}
