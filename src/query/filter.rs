//! Filter queries: structured comparisons, boolean combinators, and
//! opaque predicates.

use super::sort::compare_values;
use super::QuerySerializer;
use crate::error::{Result, StoreError};
use crate::path::PropertyPath;
use crate::types::Item;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Comparison operator for structured filter leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Property value is one of the given values.
    In,
    /// Property array contains the value, or property string contains
    /// the substring.
    Contains,
}

impl CompareOp {
    pub fn name(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::In => "in",
            CompareOp::Contains => "contains",
        }
    }
}

/// Filter expression tree.
pub enum FilterExpr<T> {
    Compare {
        op: CompareOp,
        path: PropertyPath,
        value: Value,
    },
    And(Vec<FilterExpr<T>>),
    Or(Vec<FilterExpr<T>>),
    Not(Box<FilterExpr<T>>),
    /// Opaque predicate; not serializable.
    Custom(Arc<dyn Fn(&T) -> bool + Send + Sync>),
}

impl<T> Clone for FilterExpr<T> {
    fn clone(&self) -> Self {
        match self {
            FilterExpr::Compare { op, path, value } => FilterExpr::Compare {
                op: *op,
                path: path.clone(),
                value: value.clone(),
            },
            FilterExpr::And(parts) => FilterExpr::And(parts.clone()),
            FilterExpr::Or(parts) => FilterExpr::Or(parts.clone()),
            FilterExpr::Not(inner) => FilterExpr::Not(inner.clone()),
            FilterExpr::Custom(f) => FilterExpr::Custom(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for FilterExpr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Compare { op, path, value } => {
                write!(f, "{}({path},{value})", op.name())
            }
            FilterExpr::And(parts) => f.debug_tuple("And").field(parts).finish(),
            FilterExpr::Or(parts) => f.debug_tuple("Or").field(parts).finish(),
            FilterExpr::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            FilterExpr::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Boolean predicate over items.
pub struct Filter<T> {
    expr: FilterExpr<T>,
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self {
            expr: self.expr.clone(),
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.expr, f)
    }
}

impl<T: Item> Filter<T> {
    fn compare(op: CompareOp, path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        Self {
            expr: FilterExpr::Compare {
                op,
                path: path.into(),
                value: value.into(),
            },
        }
    }

    pub fn eq(path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Eq, path, value)
    }

    pub fn ne(path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Ne, path, value)
    }

    pub fn lt(path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Lt, path, value)
    }

    pub fn lte(path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Lte, path, value)
    }

    pub fn gt(path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Gt, path, value)
    }

    pub fn gte(path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Gte, path, value)
    }

    pub fn one_of(path: impl Into<PropertyPath>, values: impl IntoIterator<Item = Value>) -> Self {
        Self::compare(
            CompareOp::In,
            path,
            Value::Array(values.into_iter().collect()),
        )
    }

    pub fn contains(path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Contains, path, value)
    }

    /// Wrap an arbitrary predicate. The resulting filter cannot be
    /// rendered to a query string.
    pub fn custom(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            expr: FilterExpr::Custom(Arc::new(predicate)),
        }
    }

    pub fn and(self, other: Filter<T>) -> Self {
        Self {
            expr: FilterExpr::And(vec![self.expr, other.expr]),
        }
    }

    pub fn or(self, other: Filter<T>) -> Self {
        Self {
            expr: FilterExpr::Or(vec![self.expr, other.expr]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self {
            expr: FilterExpr::Not(Box::new(self.expr)),
        }
    }

    pub fn expr(&self) -> &FilterExpr<T> {
        &self.expr
    }

    /// Evaluate the predicate against one item.
    pub fn matches(&self, item: &T) -> bool {
        let projected = serde_json::to_value(item).unwrap_or(Value::Null);
        eval(&self.expr, item, &projected)
    }

    pub fn apply(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .filter(|item| self.matches(item))
            .cloned()
            .collect()
    }

    pub fn serialize_with(&self, serializer: &dyn QuerySerializer) -> Result<String> {
        serialize_expr(&self.expr, serializer)
    }
}

fn eval<T>(expr: &FilterExpr<T>, item: &T, projected: &Value) -> bool {
    match expr {
        FilterExpr::Compare { op, path, value } => {
            let field = path.get(projected);
            compare(*op, field, value)
        }
        FilterExpr::And(parts) => parts.iter().all(|part| eval(part, item, projected)),
        FilterExpr::Or(parts) => parts.iter().any(|part| eval(part, item, projected)),
        FilterExpr::Not(inner) => !eval(inner, item, projected),
        FilterExpr::Custom(predicate) => predicate(item),
    }
}

fn compare(op: CompareOp, field: Option<&Value>, value: &Value) -> bool {
    match op {
        CompareOp::Eq => field == Some(value),
        CompareOp::Ne => field != Some(value),
        CompareOp::Lt => compare_values(field, Some(value)) == Ordering::Less,
        CompareOp::Lte => compare_values(field, Some(value)) != Ordering::Greater,
        CompareOp::Gt => compare_values(field, Some(value)) == Ordering::Greater,
        CompareOp::Gte => compare_values(field, Some(value)) != Ordering::Less,
        CompareOp::In => match value {
            Value::Array(candidates) => field.is_some_and(|f| candidates.contains(f)),
            _ => false,
        },
        CompareOp::Contains => match field {
            Some(Value::Array(elements)) => elements.contains(value),
            Some(Value::String(s)) => value.as_str().is_some_and(|needle| s.contains(needle)),
            _ => false,
        },
    }
}

fn serialize_expr<T>(expr: &FilterExpr<T>, serializer: &dyn QuerySerializer) -> Result<String> {
    match expr {
        FilterExpr::Compare { op, path, value } => Ok(serializer.comparison(*op, path, value)),
        FilterExpr::And(parts) => {
            let rendered = parts
                .iter()
                .map(|part| serialize_expr(part, serializer))
                .collect::<Result<Vec<_>>>()?;
            Ok(serializer.combinator("and", &rendered))
        }
        FilterExpr::Or(parts) => {
            let rendered = parts
                .iter()
                .map(|part| serialize_expr(part, serializer))
                .collect::<Result<Vec<_>>>()?;
            Ok(serializer.combinator("or", &rendered))
        }
        FilterExpr::Not(inner) => {
            let rendered = vec![serialize_expr(inner, serializer)?];
            Ok(serializer.combinator("not", &rendered))
        }
        FilterExpr::Custom(_) => Err(StoreError::NotSerializable("a custom filter predicate")),
    }
}
