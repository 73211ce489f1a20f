//! In-memory connection.
//!
//! Holds rows per table and evaluates a query descriptor with plain
//! column projections, `COUNT(*)`, `COUNT(col)` and `SUM(col)`. Predicates
//! are applied before projection. Useful for tests and for running the
//! fan-out path without a database.

use super::{Connection, ConnectionError};
use async_trait::async_trait;
use serde_json::{Number, Value};
use shardkit_core::query::{Projection, QueryDescriptor};
use shardkit_core::types::Row;
use std::collections::HashMap;
use std::sync::RwLock;

/// Connection backed by in-memory tables.
///
/// ```rust
/// use shardkit_distributed::connection::{Connection, MemoryConnection};
/// use shardkit_core::query::QueryDescriptor;
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() {
///     let conn = MemoryConnection::new();
///     conn.insert("orders", json!({"store_id": 1, "amount": 200}));
///
///     let query = QueryDescriptor::new("orders").select_as("SUM(amount)", "amount");
///     let rows = conn.execute(&query).await.unwrap();
///     assert_eq!(rows[0]["amount"], json!(200));
/// }
/// ```
#[derive(Debug, Default)]
pub struct MemoryConnection {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

enum Aggregate<'a> {
    CountAll,
    Count(&'a str),
    Sum(&'a str),
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to a table. Non-object values are ignored.
    pub fn insert(&self, table: impl Into<String>, row: Value) {
        if let Value::Object(row) = row {
            self.tables
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .entry(table.into())
                .or_default()
                .push(row);
        }
    }

    /// Number of rows stored in a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(table)
            .map_or(0, Vec::len)
    }

    fn parse_aggregate(expr: &str) -> Result<Option<Aggregate<'_>>, ConnectionError> {
        let Some(open) = expr.find('(') else {
            return Ok(None);
        };
        let inner = expr[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| ConnectionError::Unsupported(expr.to_string()))?
            .trim();

        match expr[..open].trim().to_ascii_uppercase().as_str() {
            "COUNT" if inner == "*" => Ok(Some(Aggregate::CountAll)),
            "COUNT" => Ok(Some(Aggregate::Count(inner))),
            "SUM" => Ok(Some(Aggregate::Sum(inner))),
            _ => Err(ConnectionError::Unsupported(expr.to_string())),
        }
    }

    fn aggregate(aggregate: &Aggregate<'_>, rows: &[&Row]) -> Value {
        match aggregate {
            Aggregate::CountAll => Value::from(rows.len()),
            Aggregate::Count(column) => Value::from(
                rows.iter()
                    .filter(|r| r.get(*column).is_some_and(|v| !v.is_null()))
                    .count(),
            ),
            Aggregate::Sum(column) => {
                let values: Vec<&Value> = rows
                    .iter()
                    .filter_map(|r| r.get(*column))
                    .filter(|v| !v.is_null())
                    .collect();
                // SUM over no values is NULL, as in SQL.
                if values.is_empty() {
                    return Value::Null;
                }
                if values.iter().all(|v| v.is_i64()) {
                    let exact = values
                        .iter()
                        .filter_map(|v| v.as_i64())
                        .try_fold(0i64, i64::checked_add);
                    if let Some(sum) = exact {
                        return Value::from(sum);
                    }
                }
                // Mixed numbers or i64 overflow: sum as floats.
                let sum: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
                Number::from_f64(sum).map_or(Value::Null, Value::Number)
            }
        }
    }

    fn project(projections: &[Projection], rows: Vec<&Row>) -> Result<Vec<Row>, ConnectionError> {
        if projections.is_empty() {
            return Ok(rows.into_iter().cloned().collect());
        }

        let mut aggregates = Vec::with_capacity(projections.len());
        for projection in projections {
            aggregates.push(Self::parse_aggregate(&projection.expr)?);
        }

        if aggregates.iter().all(Option::is_some) {
            let mut out = Row::new();
            for (projection, aggregate) in projections.iter().zip(&aggregates) {
                if let Some(aggregate) = aggregate {
                    out.insert(
                        projection.output_name().to_string(),
                        Self::aggregate(aggregate, &rows),
                    );
                }
            }
            return Ok(vec![out]);
        }

        if aggregates.iter().any(Option::is_some) {
            return Err(ConnectionError::Unsupported(
                "mixing aggregates and plain columns needs GROUP BY".to_string(),
            ));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                projections
                    .iter()
                    .map(|p| {
                        let value = row.get(&p.expr).cloned().unwrap_or(Value::Null);
                        (p.output_name().to_string(), value)
                    })
                    .collect()
            })
            .collect())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn execute(&self, query: &QueryDescriptor) -> Result<Vec<Row>, ConnectionError> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let empty = Vec::new();
        let rows = tables.get(&query.table).unwrap_or(&empty);

        let matching: Vec<&Row> = rows
            .iter()
            .filter(|row| {
                query
                    .predicates
                    .iter()
                    .all(|p| row.get(&p.column).is_some_and(|v| p.matches(v)))
            })
            .collect();

        Self::project(&query.projections, matching)
    }
}
