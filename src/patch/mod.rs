//! Structural patches: ordered, path-addressed partial updates.
//!
//! A `Patch` is the unit of both diff output and partial-update input:
//! `diff` computes one from two versions of an item, `apply` replays it
//! onto an item, and `merge` folds two patches into one so that
//! applying A then B equals applying `A.merge(B)`.

mod diff;

pub use diff::diff_values;

use crate::error::Result;
use crate::path::PropertyPath;
use crate::types::Item;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One path-addressed operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    /// Set the value at a path, creating missing object intermediates.
    Set { path: PropertyPath, value: Value },
    /// Remove the value at a path; missing paths are a no-op.
    Remove { path: PropertyPath },
}

impl PatchOp {
    pub fn path(&self) -> &PropertyPath {
        match self {
            PatchOp::Set { path, .. } => path,
            PatchOp::Remove { path } => path,
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOp::Set { path, value } => write!(f, "set({path},{value})"),
            PatchOp::Remove { path } => write!(f, "remove({path})"),
        }
    }
}

/// An ordered sequence of path-addressed operations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a set op.
    pub fn set(mut self, path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Set {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    /// Builder: append a remove op.
    pub fn remove(mut self, path: impl Into<PropertyPath>) -> Self {
        self.ops.push(PatchOp::Remove { path: path.into() });
        self
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Structural difference between two values, as ops transforming
    /// `old` into `new`.
    pub fn diff(old: &Value, new: &Value) -> Self {
        Self {
            ops: diff_values(old, new),
        }
    }

    /// `diff` lifted to any item type through its JSON projection.
    pub fn diff_items<T: Item>(old: &T, new: &T) -> Result<Self> {
        Ok(Self::diff(
            &serde_json::to_value(old)?,
            &serde_json::to_value(new)?,
        ))
    }

    /// Apply the ops in order to a copy of `value`. The input is never
    /// mutated.
    pub fn apply_value(&self, value: &Value) -> Result<Value> {
        let mut out = value.clone();
        for op in &self.ops {
            match op {
                PatchOp::Set { path, value } => path.set(&mut out, value.clone())?,
                PatchOp::Remove { path } => {
                    path.remove(&mut out);
                }
            }
        }
        Ok(out)
    }

    /// `apply_value` lifted to any item type through its JSON
    /// projection.
    pub fn apply<T: Item>(&self, item: &T) -> Result<T> {
        let projected = serde_json::to_value(item)?;
        Ok(serde_json::from_value(self.apply_value(&projected)?)?)
    }

    /// Merge a later patch into this one. Ops from `later` supersede
    /// ops here addressing an equal path; disjoint paths concatenate in
    /// emission order.
    pub fn merge(self, later: Patch) -> Patch {
        let mut ops: Vec<PatchOp> = self
            .ops
            .into_iter()
            .filter(|op| !later.ops.iter().any(|l| l.path() == op.path()))
            .collect();
        ops.extend(later.ops);
        Patch { ops }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, "&")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl FromIterator<PatchOp> for Patch {
    fn from_iter<I: IntoIterator<Item = PatchOp>>(iter: I) -> Self {
        Patch {
            ops: iter.into_iter().collect(),
        }
    }
}
