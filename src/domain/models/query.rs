//! Structural query vocabulary: filters, sorts and aggregation stages.
//!
//! Filters are built by callers and evaluated identically by every store
//! backend, so the in-memory and SQLite stores agree on results.

use regex::{Regex, RegexBuilder};
use serde_json::{Number, Value};
use std::cmp::Ordering;

use super::document::{lookup, Document, ID_FIELD};

/// A field/operator/value filter over documents.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Matches every document.
    All,
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    Gt { field: String, value: Value },
    Gte { field: String, value: Value },
    Lt { field: String, value: Value },
    Lte { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    Exists { field: String, exists: bool },
    Regex { field: String, regex: Regex },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// Equality on the primary key.
    pub fn id(id: impl Into<String>) -> Self {
        Self::Eq {
            field: ID_FIELD.to_string(),
            value: Value::String(id.into()),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Self::Exists {
            field: field.into(),
            exists,
        }
    }

    /// Regex match on a string field.
    pub fn regex(
        field: impl Into<String>,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self::Regex {
            field: field.into(),
            regex,
        })
    }

    /// Case-insensitive whole-value text match.
    pub fn equals_ignore_case(field: impl Into<String>, value: &str) -> Self {
        let pattern = format!("^{}$", regex::escape(value));
        // An escaped literal only fails to compile past the size limit; match nothing then.
        Self::regex(field, &pattern, true).unwrap_or(Self::Or(Vec::new()))
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    /// The `_id` this filter pins, if it is (or conjunctively contains) an `_id` equality.
    pub fn id_equality(&self) -> Option<&str> {
        match self {
            Self::Eq { field, value } if field == ID_FIELD => value.as_str(),
            Self::And(filters) => filters.iter().find_map(Filter::id_equality),
            _ => None,
        }
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => field_equals(lookup(doc, field), value),
            Self::Ne { field, value } => !field_equals(lookup(doc, field), value),
            Self::Gt { field, value } => ordered(doc, field, value, |o| o == Ordering::Greater),
            Self::Gte { field, value } => ordered(doc, field, value, |o| o != Ordering::Less),
            Self::Lt { field, value } => ordered(doc, field, value, |o| o == Ordering::Less),
            Self::Lte { field, value } => ordered(doc, field, value, |o| o != Ordering::Greater),
            Self::In { field, values } => {
                let actual = lookup(doc, field);
                values.iter().any(|v| field_equals(actual, v))
            }
            Self::Exists { field, exists } => lookup(doc, field).is_some() == *exists,
            Self::Regex { field, regex } => match lookup(doc, field) {
                Some(Value::String(s)) => regex.is_match(s),
                Some(Value::Array(items)) => items
                    .iter()
                    .any(|item| item.as_str().is_some_and(|s| regex.is_match(s))),
                _ => false,
            },
            Self::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::All
    }
}

/// Equality with array membership: a scalar query value matches any element of an array field.
fn field_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn ordered(doc: &Document, field: &str, value: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    lookup(doc, field)
        .and_then(|actual| compare_values(actual, value))
        .is_some_and(accept)
}

fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

/// Ordering between two values of the same kind.
///
/// Strings that both parse as integers compare numerically so that wide
/// integers stored as strings still order correctly.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => {
            match (x.parse::<i128>(), y.parse::<i128>()) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Canonical cross-type rank used when sorting heterogeneous values.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Multi-key sort order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    keys: Vec<(String, SortOrder)>,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortOrder::Ascending)],
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortOrder::Descending)],
        }
    }

    pub fn then_ascending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Ascending));
        self
    }

    pub fn then_descending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Descending));
        self
    }

    pub fn keys(&self) -> &[(String, SortOrder)] {
        &self.keys
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, order) in &self.keys {
            let left = lookup(a, field);
            let right = lookup(b, field);
            let ordering = type_rank(left).cmp(&type_rank(right)).then_with(|| {
                match (left, right) {
                    (Some(l), Some(r)) => compare_values(l, r).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                }
            });
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort of a document batch.
    pub fn apply(&self, docs: &mut [Document]) {
        docs.sort_by(|a, b| self.compare(a, b));
    }
}

/// One stage of an aggregation pipeline.
#[derive(Debug, Clone)]
pub enum Stage {
    Match(Filter),
    Sort(Sort),
    Skip(usize),
    Limit(usize),
    /// Keep only the listed top-level fields (plus `_id`).
    Project(Vec<String>),
    /// Replace the batch with a single `{field: count}` document.
    Count(String),
}

/// Filter, sort and truncate a batch, the way a store answers `find`.
pub fn select(
    docs: impl IntoIterator<Item = Document>,
    filter: &Filter,
    sort: Option<&Sort>,
    limit: Option<usize>,
) -> Vec<Document> {
    let mut selected: Vec<Document> = docs.into_iter().filter(|d| filter.matches(d)).collect();
    if let Some(sort) = sort {
        sort.apply(&mut selected);
    }
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}

/// Run a pipeline over an in-memory batch.
pub fn apply_pipeline(mut docs: Vec<Document>, stages: &[Stage]) -> Vec<Document> {
    for stage in stages {
        docs = match stage {
            Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Sort(sort) => {
                sort.apply(&mut docs);
                docs
            }
            Stage::Skip(n) => docs.into_iter().skip(*n).collect(),
            Stage::Limit(n) => docs.into_iter().take(*n).collect(),
            Stage::Project(fields) => docs
                .into_iter()
                .map(|doc| {
                    doc.into_iter()
                        .filter(|(k, _)| k == ID_FIELD || fields.iter().any(|f| f == k))
                        .collect()
                })
                .collect(),
            Stage::Count(field) => {
                let mut out = Document::new();
                out.insert(field.clone(), Value::from(docs.len() as u64));
                vec![out]
            }
        };
    }
    docs
}
