//! Structured query descriptor.
//!
//! A descriptor names a table, the projected expressions and the filter
//! predicates. Routing and fan-out treat it as opaque payload: only a
//! connection renders it into something executable. It is serialisable so
//! remote job transports can ship it to their workers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A projected expression, optionally aliased (`SUM(amount) AS amount`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub expr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Projection {
    /// Name of the column this projection produces.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.expr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicateOp {
    Eq,
    In,
}

/// `column = value` or `column IN (values...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub op: PredicateOp,
    pub values: Vec<Value>,
}

impl Predicate {
    /// Whether `value` satisfies this predicate.
    pub fn matches(&self, value: &Value) -> bool {
        match self.op {
            PredicateOp::Eq => self.values.first() == Some(value),
            PredicateOp::In => self.values.contains(value),
        }
    }
}

/// A select-style query sent unchanged to every shard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub table: String,
    #[serde(default)]
    pub projections: Vec<Projection>,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

impl QueryDescriptor {
    /// Start a query against `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Project an expression under its own name.
    pub fn select(mut self, expr: impl Into<String>) -> Self {
        self.projections.push(Projection {
            expr: expr.into(),
            alias: None,
        });
        self
    }

    /// Project an expression under `alias`.
    pub fn select_as(mut self, expr: impl Into<String>, alias: impl Into<String>) -> Self {
        self.projections.push(Projection {
            expr: expr.into(),
            alias: Some(alias.into()),
        });
        self
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate {
            column: column.into(),
            op: PredicateOp::Eq,
            values: vec![value.into()],
        });
        self
    }

    pub fn where_in<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.predicates.push(Predicate {
            column: column.into(),
            op: PredicateOp::In,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let query = QueryDescriptor::new("orders")
            .select_as("SUM(amount)", "amount")
            .where_in("store_id", [1, 2]);

        assert_eq!(query.table, "orders");
        assert_eq!(query.projections.len(), 1);
        assert_eq!(query.projections[0].output_name(), "amount");
        assert_eq!(query.predicates[0].op, PredicateOp::In);
        assert_eq!(query.predicates[0].values, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_predicate_matching() {
        let eq = Predicate {
            column: "store_id".to_string(),
            op: PredicateOp::Eq,
            values: vec![json!(1)],
        };
        assert!(eq.matches(&json!(1)));
        assert!(!eq.matches(&json!(2)));

        let within = Predicate {
            column: "store_id".to_string(),
            op: PredicateOp::In,
            values: vec![json!(1), json!(2)],
        };
        assert!(within.matches(&json!(2)));
        assert!(!within.matches(&json!(3)));
    }

    #[test]
    fn test_unaliased_projection_uses_expression() {
        let query = QueryDescriptor::new("orders").select("amount");
        assert_eq!(query.projections[0].output_name(), "amount");
    }

    #[test]
    fn test_serde_round_trip() {
        let query = QueryDescriptor::new("orders")
            .select("id")
            .where_eq("store_id", 7);
        let json = serde_json::to_string(&query).unwrap();
        let back: QueryDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, query);
    }
}
