use serde::{Deserialize, Serialize};
use time::Date;

use crate::format_date;

/// A bound value for a `?` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlParam {
    Null,
    Integer(i64),
    Text(String),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<Date> for SqlParam {
    fn from(value: Date) -> Self {
        Self::Text(format_date(value))
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A row-selection condition with its bound parameters, in placeholder order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Predicate {
    pub clause: String,
    pub params: Vec<SqlParam>,
}

impl Predicate {
    #[must_use]
    pub fn new(clause: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self { clause: clause.into(), params }
    }

    #[must_use]
    pub fn raw(clause: impl Into<String>) -> Self {
        Self::new(clause, Vec::new())
    }

    /// Conjunction of two predicates; each side is parenthesized.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut params = self.params;
        params.extend(other.params);
        Self { clause: format!("({}) AND ({})", self.clause, other.clause), params }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatementKind {
    Delete,
    Update { assignments: String, params: Vec<SqlParam> },
}

/// One bulk statement against a single table.
///
/// Statements carry their filter separately so a dry run can preview the
/// affected row count without executing the mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statement {
    pub table: String,
    pub kind: StatementKind,
    pub filter: Option<Predicate>,
}

impl Statement {
    #[must_use]
    pub fn delete(table: &str, filter: Predicate) -> Self {
        Self { table: table.to_string(), kind: StatementKind::Delete, filter: Some(filter) }
    }

    #[must_use]
    pub fn delete_all(table: &str) -> Self {
        Self { table: table.to_string(), kind: StatementKind::Delete, filter: None }
    }

    #[must_use]
    pub fn update(
        table: &str,
        assignments: &str,
        params: Vec<SqlParam>,
        filter: Option<Predicate>,
    ) -> Self {
        Self {
            table: table.to_string(),
            kind: StatementKind::Update { assignments: assignments.to_string(), params },
            filter,
        }
    }

    #[must_use]
    pub fn sql(&self) -> String {
        let head = match &self.kind {
            StatementKind::Delete => format!("DELETE FROM {}", self.table),
            StatementKind::Update { assignments, .. } => {
                format!("UPDATE {} SET {assignments}", self.table)
            }
        };
        match &self.filter {
            Some(filter) => format!("{head} WHERE {}", filter.clause),
            None => head,
        }
    }

    #[must_use]
    pub fn params(&self) -> Vec<SqlParam> {
        let mut params = match &self.kind {
            StatementKind::Delete => Vec::new(),
            StatementKind::Update { params, .. } => params.clone(),
        };
        if let Some(filter) = &self.filter {
            params.extend(filter.params.iter().cloned());
        }
        params
    }

    /// `SELECT COUNT(*)` over the rows this statement would touch.
    #[must_use]
    pub fn preview_sql(&self) -> String {
        match &self.filter {
            Some(filter) => format!("SELECT COUNT(*) FROM {} WHERE {}", self.table, filter.clause),
            None => format!("SELECT COUNT(*) FROM {}", self.table),
        }
    }

    #[must_use]
    pub fn preview_params(&self) -> Vec<SqlParam> {
        self.filter.as_ref().map(|filter| filter.params.clone()).unwrap_or_default()
    }
}
