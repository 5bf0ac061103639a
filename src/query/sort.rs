//! Sort queries: stable ordering by property path or opaque comparator.

use super::QuerySerializer;
use crate::error::{Result, StoreError};
use crate::path::PropertyPath;
use crate::types::Item;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

enum SortKey<T> {
    Path(PropertyPath),
    /// Opaque comparator; not serializable.
    Custom(Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>),
}

impl<T> Clone for SortKey<T> {
    fn clone(&self) -> Self {
        match self {
            SortKey::Path(path) => SortKey::Path(path.clone()),
            SortKey::Custom(cmp) => SortKey::Custom(Arc::clone(cmp)),
        }
    }
}

/// Stable sort over items. Null and missing values order before
/// defined values; `descending` reverses non-equal outcomes without
/// disturbing tie-breaks.
pub struct Sort<T> {
    key: SortKey<T>,
    descending: bool,
}

impl<T> Clone for Sort<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            descending: self.descending,
        }
    }
}

impl<T> fmt::Debug for Sort<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.descending { "-" } else { "+" };
        match &self.key {
            SortKey::Path(path) => write!(f, "sort({direction}{path})"),
            SortKey::Custom(_) => write!(f, "sort({direction}<custom>)"),
        }
    }
}

impl<T: Item> Sort<T> {
    /// Ascending sort by property path.
    pub fn by(path: impl Into<PropertyPath>) -> Self {
        Self {
            key: SortKey::Path(path.into()),
            descending: false,
        }
    }

    /// Descending sort by property path.
    pub fn by_desc(path: impl Into<PropertyPath>) -> Self {
        Self::by(path).descending(true)
    }

    /// Sort with an arbitrary comparator. The resulting sort cannot be
    /// rendered to a query string.
    pub fn custom(cmp: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        Self {
            key: SortKey::Custom(Arc::new(cmp)),
            descending: false,
        }
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    /// Compare two items under this sort, direction applied.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        let base = match &self.key {
            SortKey::Path(path) => {
                let left = serde_json::to_value(a).unwrap_or(Value::Null);
                let right = serde_json::to_value(b).unwrap_or(Value::Null);
                compare_values(path.get(&left), path.get(&right))
            }
            SortKey::Custom(cmp) => cmp(a, b),
        };
        if self.descending {
            base.reverse()
        } else {
            base
        }
    }

    pub fn apply(&self, items: &[T]) -> Vec<T> {
        match &self.key {
            SortKey::Path(path) => {
                // Project each key once rather than per comparison.
                let mut keyed: Vec<(Option<Value>, T)> = items
                    .iter()
                    .map(|item| {
                        let projected = serde_json::to_value(item).unwrap_or(Value::Null);
                        (path.get(&projected).cloned(), item.clone())
                    })
                    .collect();
                keyed.sort_by(|(a, _), (b, _)| {
                    let base = compare_values(a.as_ref(), b.as_ref());
                    if self.descending {
                        base.reverse()
                    } else {
                        base
                    }
                });
                keyed.into_iter().map(|(_, item)| item).collect()
            }
            SortKey::Custom(cmp) => {
                let mut out = items.to_vec();
                out.sort_by(|a, b| {
                    let base = cmp(a, b);
                    if self.descending {
                        base.reverse()
                    } else {
                        base
                    }
                });
                out
            }
        }
    }

    pub fn serialize_with(&self, serializer: &dyn QuerySerializer) -> Result<String> {
        match &self.key {
            SortKey::Path(path) => Ok(serializer.sort(path, self.descending)),
            SortKey::Custom(_) => Err(StoreError::NotSerializable("a custom sort comparator")),
        }
    }
}

/// Total order over optional JSON values: null/missing first, then
/// booleans, numbers, strings, arrays, objects; mixed kinds order by
/// that rank.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(_)), Some(Value::Array(_)))
        | (Some(Value::Object(_)), Some(Value::Object(_))) => {
            a.map(Value::to_string).cmp(&b.map(Value::to_string))
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
