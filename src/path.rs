//! Structural paths into an item's JSON projection.
//!
//! Shared by the query algebra (property filters and sorts) and the
//! patch engine (op addresses). A path is a sequence of object keys and
//! array indices, written `a.b.0.c` in string form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One step of a structural path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Debug for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{k}"),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A dot-separated structural path. The empty path addresses the whole
/// value.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// The empty path, addressing the value itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dot-separated path. All-digit segments address array
    /// indices.
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        let segments = path
            .split('.')
            .map(|segment| match segment.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(segment.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Resolve the path against a value.
    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for segment in &self.segments {
            current = match segment {
                PathSegment::Key(k) => current.get(k)?,
                PathSegment::Index(i) => current.get(i)?,
            };
        }
        Some(current)
    }

    /// Set the value addressed by the path, creating missing
    /// intermediate objects for key segments. Indexing past the end of
    /// an array or into a non-container is rejected.
    pub fn set(&self, target: &mut Value, new_value: Value) -> crate::Result<()> {
        if self.is_root() {
            *target = new_value;
            return Ok(());
        }

        let mut current = target;
        let (last, parents) = self.segments.split_last().expect("non-root path");
        for segment in parents {
            current = match segment {
                PathSegment::Key(k) => {
                    if !current.is_object() {
                        return Err(self.type_error());
                    }
                    current
                        .as_object_mut()
                        .expect("checked object")
                        .entry(k.clone())
                        .or_insert(Value::Object(Default::default()))
                }
                PathSegment::Index(i) => current.get_mut(i).ok_or_else(|| self.type_error())?,
            };
        }

        match last {
            PathSegment::Key(k) => {
                let map = current.as_object_mut().ok_or_else(|| self.type_error())?;
                map.insert(k.clone(), new_value);
            }
            PathSegment::Index(i) => {
                let arr = current.as_array_mut().ok_or_else(|| self.type_error())?;
                if *i < arr.len() {
                    arr[*i] = new_value;
                } else if *i == arr.len() {
                    arr.push(new_value);
                } else {
                    return Err(self.type_error());
                }
            }
        }
        Ok(())
    }

    /// Remove the value addressed by the path. Returns whether anything
    /// was removed; a missing path is a no-op.
    pub fn remove(&self, target: &mut Value) -> bool {
        if self.is_root() {
            let removed = !target.is_null();
            *target = Value::Null;
            return removed;
        }

        let mut current = target;
        let (last, parents) = self.segments.split_last().expect("non-root path");
        for segment in parents {
            let next = match segment {
                PathSegment::Key(k) => current.get_mut(k),
                PathSegment::Index(i) => current.get_mut(i),
            };
            current = match next {
                Some(v) => v,
                None => return false,
            };
        }

        match last {
            PathSegment::Key(k) => current
                .as_object_mut()
                .map(|map| map.remove(k).is_some())
                .unwrap_or(false),
            PathSegment::Index(i) => current
                .as_array_mut()
                .map(|arr| {
                    if *i < arr.len() {
                        arr.remove(*i);
                        true
                    } else {
                        false
                    }
                })
                .unwrap_or(false),
        }
    }

    fn type_error(&self) -> crate::StoreError {
        crate::StoreError::InvalidPatch(format!("path {self} does not address a settable slot"))
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{segment:?}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<&str> for PropertyPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for PropertyPath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}
