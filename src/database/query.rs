use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::stack::QueryParams;

const DEFAULT_LIMIT: usize = 10;
const DEFAULT_SORT: &str = "createdAt";

/// Paging, sorting and filtering options for list actions.
///
/// Read from the query string: `page`, `limit`, `sortBy`, `sortOrder` and
/// `filters[field]=value` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: usize,
    pub limit: usize,
    pub sort_by: String,
    pub descending: bool,
    pub filters: BTreeMap<String, String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            sort_by: DEFAULT_SORT.to_string(),
            descending: false,
            filters: BTreeMap::new(),
        }
    }
}

impl ListQuery {
    pub fn from_query(query: &QueryParams) -> Self {
        let mut list = Self::default();

        if let Some(page) = query.get("page").and_then(|v| v.trim().parse::<usize>().ok()) {
            list.page = page.max(1);
        }
        if let Some(limit) = query.get("limit").and_then(|v| v.trim().parse::<usize>().ok()) {
            list.limit = limit.max(1);
        }
        if let Some(sort_by) = query.get("sortBy").filter(|v| !v.trim().is_empty()) {
            list.sort_by = sort_by.trim().to_string();
        }
        list.descending = query.get("sortOrder") == Some("desc");

        for (key, value) in query.iter() {
            let field = key
                .strip_prefix("filters[")
                .and_then(|rest| rest.strip_suffix(']'));
            // Empty filter values are ignored
            if let Some(field) = field.filter(|f| !f.is_empty()) {
                if !value.is_empty() {
                    list.filters.insert(field.to_string(), value.to_string());
                }
            }
        }

        list
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn skip(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Strings match case-insensitively by substring, everything else by its text form
    pub fn matches(&self, record: &Value) -> bool {
        self.filters.iter().all(|(field, wanted)| match record.get(field) {
            Some(Value::String(s)) => s.to_lowercase().contains(&wanted.to_lowercase()),
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == *wanted,
        })
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = compare_values(a.get(&self.sort_by), b.get(&self.sort_by));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// One page of serialized records plus the unpaged match count
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_records: usize,
    pub total_pages: usize,
    pub next_page: Option<usize>,
    pub prev_page: Option<usize>,
}

impl Pagination {
    pub fn new(total_records: usize, page: usize, limit: usize) -> Self {
        let total_pages = total_records.div_ceil(limit.max(1));
        Self {
            total_records,
            total_pages,
            next_page: (page < total_pages).then_some(page + 1),
            prev_page: (page > 1).then(|| page - 1),
        }
    }
}
