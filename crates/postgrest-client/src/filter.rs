//! Horizontal filters in PostgREST query syntax.
//!
//! A [`Filter`] is a conjunction of `column=op.value` conditions. It renders
//! to query pairs for the HTTP client and evaluates against JSON rows for
//! the in-memory endpoint.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Op {
    /// Operator keyword as it appears in the query string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Neq => ordering != Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A single `column=op.value` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    pub value: String,
}

impl Condition {
    /// Evaluate the condition against a row. Missing or null columns never match.
    pub fn matches(&self, row: &Value) -> bool {
        let cell = match row.get(&self.column) {
            None | Some(Value::Null) => return false,
            Some(cell) => cell,
        };

        let ordering = match cell {
            Value::Number(n) => match (n.as_f64(), self.value.parse::<f64>()) {
                (Some(lhs), Ok(rhs)) => lhs.partial_cmp(&rhs),
                _ => Some(n.to_string().as_str().cmp(self.value.as_str())),
            },
            Value::String(s) => Some(s.as_str().cmp(self.value.as_str())),
            Value::Bool(b) => Some(b.to_string().as_str().cmp(self.value.as_str())),
            other => Some(other.to_string().as_str().cmp(self.value.as_str())),
        };

        ordering.is_some_and(|o| self.op.accepts(o))
    }
}

/// Conjunction of conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Create an empty filter (matches every row).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition with an arbitrary operator.
    pub fn with(mut self, column: impl Into<String>, op: Op, value: impl fmt::Display) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            op,
            value: value.to_string(),
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.with(column, Op::Eq, value)
    }

    pub fn neq(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.with(column, Op::Neq, value)
    }

    pub fn gt(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.with(column, Op::Gt, value)
    }

    pub fn gte(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.with(column, Op::Gte, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.with(column, Op::Lt, value)
    }

    pub fn lte(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.with(column, Op::Lte, value)
    }

    /// The conditions in insertion order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as query pairs, e.g. `("sid", "eq.abc")`.
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.conditions
            .iter()
            .map(|c| (c.column.clone(), format!("{}.{}", c.op.as_str(), c.value)))
            .collect()
    }

    /// Check whether every condition holds for the row.
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}.{}", c.column, c.op.as_str(), c.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_rendering() {
        let filter = Filter::new().eq("sid", "abc").gte("expire", 1700000000);

        assert_eq!(
            filter.to_query(),
            vec![
                ("sid".to_string(), "eq.abc".to_string()),
                ("expire".to_string(), "gte.1700000000".to_string()),
            ]
        );
        assert_eq!(filter.to_string(), "sid=eq.abc&expire=gte.1700000000");
    }

    #[test]
    fn test_numeric_comparison() {
        let row = json!({"sid": "a", "expire": 100});

        assert!(Filter::new().lte("expire", 100).matches(&row));
        assert!(Filter::new().gte("expire", 100).matches(&row));
        assert!(!Filter::new().lt("expire", 100).matches(&row));
        assert!(Filter::new().gt("expire", 99).matches(&row));
        // 100 vs "9" must compare numerically, not lexically
        assert!(Filter::new().gt("expire", 9).matches(&row));
    }

    #[test]
    fn test_string_equality() {
        let row = json!({"sid": "session-1"});

        assert!(Filter::new().eq("sid", "session-1").matches(&row));
        assert!(!Filter::new().eq("sid", "session-2").matches(&row));
        assert!(Filter::new().neq("sid", "session-2").matches(&row));
    }

    #[test]
    fn test_missing_column_never_matches() {
        let row = json!({"sid": "a", "expire": null});

        assert!(!Filter::new().lte("expire", 10).matches(&row));
        assert!(!Filter::new().eq("other", "a").matches(&row));
        assert!(Filter::new().matches(&row));
    }
}
