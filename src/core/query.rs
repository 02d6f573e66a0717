//! Filter predicates, ordering and limits for collection queries

use crate::core::document::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Number of documents a list returns when no limit is given
pub const DEFAULT_LIST_LIMIT: usize = 15;

/// Comparison applied by a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equal,
    GreaterThan,
    LessThan,
    LessOrEqual,
    ArrayContains,
}

/// A single `field <op> value` predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Whether a document satisfies this predicate
    ///
    /// A document lacking the field never matches. Ordered comparisons only
    /// match values of the same JSON type (numbers with numbers, strings with
    /// strings).
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = field_value(doc, &self.field) else {
            return false;
        };
        let actual: &Value = &actual;

        match self.op {
            FilterOp::Equal => json_eq(actual, &self.value),
            FilterOp::GreaterThan => compare(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::LessThan => compare(actual, &self.value) == Some(Ordering::Less),
            FilterOp::LessOrEqual => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.iter().any(|item| json_eq(item, &self.value))),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering on a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Whether a document has the ordered field at all
    ///
    /// Ordered queries only return documents for which this holds.
    pub fn covers(&self, doc: &Document) -> bool {
        field_value(doc, &self.field).is_some()
    }

    /// Compare two documents on this ordering; missing fields sort first
    ///
    /// Values of different JSON types order by type rank: null, booleans,
    /// numbers, strings, arrays, objects.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ord = match (field_value(a, &self.field), field_value(b, &self.field)) {
            (Some(x), Some(y)) => total_cmp(&x, &y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        match self.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

/// Everything the store needs to run a collection query
///
/// Filters combine conjunctively. Without an ordering the store's own order
/// applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreQuery {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl StoreQuery {
    /// Whether a document passes every filter
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Apply filters, ordering and limit to an iterator of documents
    ///
    /// With an ordering, documents lacking the ordered field are left out.
    pub fn apply<'a>(&self, docs: impl Iterator<Item = &'a Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .filter(|d| self.matches(d))
            .filter(|d| self.order_by.as_ref().is_none_or(|order| order.covers(d)))
            .cloned()
            .collect();
        if let Some(order) = &self.order_by {
            matched.sort_by(|a, b| order.compare(a, b));
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Input of the generated list operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListInput {
    /// The number of results to return
    #[serde(default)]
    pub limit: Option<usize>,

    /// Extra filter fields of a custom list shape
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ListInput {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            extra: serde_json::Map::new(),
        }
    }

    /// Effective limit, falling back to [`DEFAULT_LIST_LIMIT`]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

/// A document's value for `field`, with `id` resolving to the document id
fn field_value<'d>(doc: &'d Document, field: &str) -> Option<Cow<'d, Value>> {
    if field == "id" {
        return Some(Cow::Owned(Value::String(doc.id.clone())));
    }
    doc.get(field).map(Cow::Borrowed)
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values, ranking by type first
fn total_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| total_cmp(l, r))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| total_cmp(lv, rv)))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
