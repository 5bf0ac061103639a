//! Query algebra: composable, immutable filter/sort/range transforms.
//!
//! Each query is a pure function over an ordered item sequence. A
//! derived view accumulates a list of queries and applies them
//! left-to-right on every recomputation. Structured queries render to a
//! query-string form for remote-backed storage primitives; opaque
//! function-based queries refuse to serialize.

mod filter;
mod sort;

pub use filter::{CompareOp, Filter, FilterExpr};
pub use sort::{compare_values, Sort};

use crate::error::Result;
use crate::path::PropertyPath;
use crate::types::Item;
use serde_json::Value;
use std::fmt;

/// Tagged query variant attached to a derived view.
pub enum Query<T> {
    Filter(Filter<T>),
    Sort(Sort<T>),
    Range(Range),
}

impl<T: Item> Query<T> {
    /// Apply this query to an ordered sequence, producing a new one.
    pub fn apply(&self, items: &[T]) -> Vec<T> {
        match self {
            Query::Filter(filter) => filter.apply(items),
            Query::Sort(sort) => sort.apply(items),
            Query::Range(range) => range.apply(items),
        }
    }

    /// Render with the default RQL-flavored serializer.
    pub fn to_query_string(&self) -> Result<String> {
        self.serialize_with(&RqlSerializer)
    }

    /// Render with a caller-provided serializer. Fails with
    /// `NotSerializable` on opaque predicates and comparators.
    pub fn serialize_with(&self, serializer: &dyn QuerySerializer) -> Result<String> {
        match self {
            Query::Filter(filter) => filter.serialize_with(serializer),
            Query::Sort(sort) => sort.serialize_with(serializer),
            Query::Range(range) => Ok(serializer.range(range)),
        }
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        match self {
            Query::Filter(filter) => Query::Filter(filter.clone()),
            Query::Sort(sort) => Query::Sort(sort.clone()),
            Query::Range(range) => Query::Range(range.clone()),
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Filter(filter) => write!(f, "Query::Filter({filter:?})"),
            Query::Sort(sort) => write!(f, "Query::Sort({sort:?})"),
            Query::Range(range) => write!(f, "Query::Range({range:?})"),
        }
    }
}

impl<T> From<Filter<T>> for Query<T> {
    fn from(filter: Filter<T>) -> Self {
        Query::Filter(filter)
    }
}

impl<T> From<Sort<T>> for Query<T> {
    fn from(sort: Sort<T>) -> Self {
        Query::Sort(sort)
    }
}

impl<T> From<Range> for Query<T> {
    fn from(range: Range) -> Self {
        Query::Range(range)
    }
}

/// Contiguous window `[start, start + count)`, clamped to the
/// available length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub count: usize,
}

impl Range {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.start)
            .take(self.count)
            .cloned()
            .collect()
    }
}

/// Pluggable query-string rendering, used by remote-backed storage
/// primitives to build request strings.
pub trait QuerySerializer: Send + Sync {
    fn comparison(&self, op: CompareOp, path: &PropertyPath, value: &Value) -> String;
    fn combinator(&self, name: &'static str, parts: &[String]) -> String;
    fn sort(&self, path: &PropertyPath, descending: bool) -> String;
    fn range(&self, range: &Range) -> String;
}

/// Default RQL-flavored serializer: `eq(path,value)`, `and(a,b)`,
/// `sort(+path)`, `range(start,count)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RqlSerializer;

impl QuerySerializer for RqlSerializer {
    fn comparison(&self, op: CompareOp, path: &PropertyPath, value: &Value) -> String {
        format!("{}({path},{value})", op.name())
    }

    fn combinator(&self, name: &'static str, parts: &[String]) -> String {
        format!("{name}({})", parts.join(","))
    }

    fn sort(&self, path: &PropertyPath, descending: bool) -> String {
        let direction = if descending { '-' } else { '+' };
        format!("sort({direction}{path})")
    }

    fn range(&self, range: &Range) -> String {
        format!("range({},{})", range.start, range.count)
    }
}

/// Join rendered queries into one query string.
pub fn to_query_string<T: Item>(queries: &[Query<T>]) -> Result<String> {
    let parts: Result<Vec<String>> = queries.iter().map(Query::to_query_string).collect();
    Ok(parts?.join("&"))
}
