//! Structured queries: equality and array-contains filters, one optional
//! ordering, one optional cursor, one optional limit.

use std::cmp::Ordering;

use super::path::DocPath;
use super::value::{Document, Value};

/// Filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    ArrayContains,
}

/// A single field filter. `field` may be a dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Equal,
            value: value.into(),
        }
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::ArrayContains,
            value: value.into(),
        }
    }

    /// Whether a document satisfies this filter. Missing fields never match.
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(field) = doc.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Equal => field.query_eq(&self.value),
            FilterOp::ArrayContains => field.contains(&self.value),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Position in an ordered result: the ordering-field value of a document
/// and the document itself, which breaks ties.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub value: Value,
    pub doc: DocPath,
}

/// A collection query. Filters are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub start_after: Option<Cursor>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Resume after `cursor`. Only meaningful together with `order_by`.
    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate the query over an in-memory document list (already in id
    /// order). Documents missing the ordering field are dropped, like the
    /// hosted store does. Ties on the ordering field are broken by document
    /// id in the same direction.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.filters.iter().all(|f| f.matches(doc)))
            .collect();

        if let Some((field, direction)) = &self.order_by {
            let key = |doc: &Document| doc.get(field).cloned();
            matched.retain(|doc| doc.get(field).is_some());
            matched.sort_by(|a, b| match (key(a), key(b)) {
                (Some(x), Some(y)) => ordered(*direction, &x, &a.id, &y, &b.id),
                _ => Ordering::Equal,
            });

            if let Some(cursor) = &self.start_after {
                matched.retain(|doc| {
                    key(doc).is_some_and(|value| {
                        ordered(*direction, &value, &doc.id, &cursor.value, cursor.doc.id())
                            == Ordering::Greater
                    })
                });
            }
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Compare `(value, id)` pairs in result order.
fn ordered(direction: Direction, a: &Value, a_id: &str, b: &Value, b_id: &str) -> Ordering {
    let natural = a.query_cmp(b).then_with(|| a_id.cmp(b_id));
    match direction {
        Direction::Ascending => natural,
        Direction::Descending => natural.reverse(),
    }
}
