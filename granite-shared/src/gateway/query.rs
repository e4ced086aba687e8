/// Table query builder
///
/// Queries are a conjunction of equality filters plus an optional ordering,
/// which is everything the dashboard asks of the gateway.
///
/// # Example
///
/// ```
/// use granite_shared::gateway::Query;
///
/// let query = Query::new()
///     .eq("assigned_to", "6b1f0c7e-0000-0000-0000-000000000000")
///     .order_desc("created_at");
///
/// assert_eq!(
///     query.to_params(),
///     vec![
///         ("select".to_string(), "*".to_string()),
///         ("assigned_to".to_string(), "eq.6b1f0c7e-0000-0000-0000-000000000000".to_string()),
///         ("order".to_string(), "created_at.desc".to_string()),
///     ]
/// );
/// ```

use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// Equality filter on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    /// Checks a JSON row against this filter
    pub fn matches(&self, row: &JsonValue) -> bool {
        match row.get(&self.column) {
            Some(JsonValue::String(s)) => s == &self.value,
            Some(JsonValue::Null) | None => self.value == "null",
            Some(other) => other.to_string() == self.value,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    /// Compares two rows on the order column
    ///
    /// Timestamps are compared chronologically, everything else as text.
    pub fn compare(&self, a: &JsonValue, b: &JsonValue) -> Ordering {
        let ordering = compare_cells(a.get(&self.column), b.get(&self.column));
        match self.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

fn compare_cells(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    let a = a.and_then(JsonValue::as_str);
    let b = b.and_then(JsonValue::as_str);
    match (a, b) {
        (Some(a), Some(b)) => {
            let parsed = (
                chrono::DateTime::parse_from_rfc3339(a),
                chrono::DateTime::parse_from_rfc3339(b),
            );
            match parsed {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Select/update/delete query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub columns: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the returned columns (comma separated)
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction: Direction::Descending,
        });
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction: Direction::Ascending,
        });
        self
    }

    /// Checks a JSON row against every filter
    pub fn matches(&self, row: &JsonValue) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Query-string parameters in the gateway's REST dialect
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![(
            "select".to_string(),
            self.columns.clone().unwrap_or_else(|| "*".to_string()),
        )];
        params.extend(self.filter_params());
        if let Some(order) = &self.order {
            let direction = match order.direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        params
    }

    /// Filter parameters only (for update and delete)
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
            .collect()
    }
}
