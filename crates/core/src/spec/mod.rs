//! Immutable query descriptions.
//!
//! A [`QuerySpec`] captures the shape of one logical read query:
//! predicates, ordering, pagination, eager-loaded relations, named
//! scopes and the select shape. Specs are built fresh per query,
//! fingerprinted into a cache key, and never persisted.

pub mod fingerprint;

use chrono::{DateTime, SecondsFormat, Utc};

/// A single bound value inside a predicate clause.
///
/// Values that are not naturally string-representable (dates,
/// booleans) get a canonical textual form so that value-equal
/// bindings always fingerprint identically.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<Utc>),
}

impl BindValue {
    /// Canonical textual form used for fingerprinting.
    pub fn canonical(&self) -> String {
        match self {
            BindValue::Null => "null".to_string(),
            BindValue::Bool(false) => "0".to_string(),
            BindValue::Bool(true) => "1".to_string(),
            BindValue::Int(n) => n.to_string(),
            BindValue::Float(f) => format!("{f:?}"),
            BindValue::Str(s) => s.clone(),
            BindValue::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

impl From<bool> for BindValue {
    fn from(v: bool) -> Self {
        BindValue::Bool(v)
    }
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        BindValue::Int(v)
    }
}

impl From<f64> for BindValue {
    fn from(v: f64) -> Self {
        BindValue::Float(v)
    }
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        BindValue::Str(v.to_string())
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        BindValue::Str(v)
    }
}

impl From<DateTime<Utc>> for BindValue {
    fn from(v: DateTime<Utc>) -> Self {
        BindValue::DateTime(v)
    }
}

/// One predicate clause: `column operator bindings`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: String,
    pub bindings: Vec<BindValue>,
}

/// Sort direction for an ordering clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// One ordering clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub column: String,
    pub direction: Direction,
}

/// Pagination position of the query.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Pagination {
    #[default]
    None,
    LimitOffset {
        limit: Option<u64>,
        offset: Option<u64>,
    },
    Cursor(String),
}

/// Projection of the query: every column, an explicit list, or a
/// single aggregate.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SelectShape {
    #[default]
    All,
    Columns(Vec<String>),
    Aggregate {
        function: String,
        column: String,
    },
}

/// Immutable description of one logical read query.
///
/// Predicate and ordering clauses are positional: two specs with the
/// same clauses in a different order are distinct queries and cache
/// under distinct keys. Eager-load and scope sets are the exception;
/// see [`fingerprint`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    entity: String,
    predicates: Vec<Predicate>,
    ordering: Vec<Ordering>,
    pagination: Pagination,
    eager: Vec<String>,
    eager_excluded: Vec<String>,
    scopes: Vec<String>,
    select: SelectShape,
}

impl QuerySpec {
    /// Start a spec for the given entity type.
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicates: Vec::new(),
            ordering: Vec::new(),
            pagination: Pagination::None,
            eager: Vec::new(),
            eager_excluded: Vec::new(),
            scopes: Vec::new(),
            select: SelectShape::All,
        }
    }

    /// Add a single-binding predicate clause.
    pub fn filter(self, column: impl Into<String>, operator: impl Into<String>, value: impl Into<BindValue>) -> Self {
        self.filter_bound(column, operator, vec![value.into()])
    }

    /// Add a predicate clause with an explicit binding list (IN,
    /// BETWEEN and friends).
    pub fn filter_bound(
        mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        bindings: Vec<BindValue>,
    ) -> Self {
        self.predicates.push(Predicate { column: column.into(), operator: operator.into(), bindings });
        self
    }

    /// Add an ordering clause.
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.ordering.push(Ordering { column: column.into(), direction });
        self
    }

    /// Cap the result set size.
    pub fn limit(mut self, limit: u64) -> Self {
        self.pagination = match self.pagination {
            Pagination::LimitOffset { offset, .. } => Pagination::LimitOffset { limit: Some(limit), offset },
            _ => Pagination::LimitOffset { limit: Some(limit), offset: None },
        };
        self
    }

    /// Skip the first `offset` rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.pagination = match self.pagination {
            Pagination::LimitOffset { limit, .. } => Pagination::LimitOffset { limit, offset: Some(offset) },
            _ => Pagination::LimitOffset { limit: None, offset: Some(offset) },
        };
        self
    }

    /// Position the query at an opaque cursor token.
    pub fn cursor(mut self, token: impl Into<String>) -> Self {
        self.pagination = Pagination::Cursor(token.into());
        self
    }

    /// Eager-load a relation alongside the primary result.
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.eager.push(relation.into());
        self
    }

    /// Explicitly exclude a relation that a default scope would load.
    pub fn without_relation(mut self, relation: impl Into<String>) -> Self {
        self.eager_excluded.push(relation.into());
        self
    }

    /// Apply a named scope.
    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scopes.push(name.into());
        self
    }

    /// Restrict the projection to an explicit column list.
    pub fn select(mut self, columns: Vec<String>) -> Self {
        self.select = SelectShape::Columns(columns);
        self
    }

    /// Replace the projection with a single aggregate.
    pub fn aggregate(mut self, function: impl Into<String>, column: impl Into<String>) -> Self {
        self.select = SelectShape::Aggregate { function: function.into(), column: column.into() };
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn ordering(&self) -> &[Ordering] {
        &self.ordering
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn eager(&self) -> &[String] {
        &self.eager
    }

    pub fn eager_excluded(&self) -> &[String] {
        &self.eager_excluded
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn select_shape(&self) -> &SelectShape {
        &self.select
    }
}
