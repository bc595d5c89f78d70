//! Storage trait definitions and filter types.

use crate::error::Result;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Filter operations for querying records.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Field equals value
    Eq,
    /// Field does not equal value
    Ne,
    /// Field contains value (string/array)
    Contains,
    /// Numeric field is less than or equal to value (missing/null passes)
    AtMost,
}

/// A filter for querying records.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Field name to filter on
    pub field: String,
    /// Filter operation
    pub op: FilterOp,
    /// Value to compare against
    pub value: Value,
}

impl Filter {
    fn with_op(field: impl Into<String>, op: FilterOp, value: impl Serialize) -> Self {
        Self {
            field: field.into(),
            op,
            value: serde_json::to_value(value).unwrap_or(Value::Null),
        }
    }

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Serialize) -> Self {
        Self::with_op(field, FilterOp::Eq, value)
    }

    /// Create a not-equal filter.
    pub fn ne(field: impl Into<String>, value: impl Serialize) -> Self {
        Self::with_op(field, FilterOp::Ne, value)
    }

    /// Create a contains filter.
    pub fn contains(field: impl Into<String>, value: impl Serialize) -> Self {
        Self::with_op(field, FilterOp::Contains, value)
    }

    /// Create an upper-bound filter on a numeric field.
    pub fn at_most(field: impl Into<String>, value: i64) -> Self {
        Self::with_op(field, FilterOp::AtMost, value)
    }

    /// Check if a record matches this filter.
    pub fn matches(&self, record: &Value) -> bool {
        let field_value = record.get(&self.field);

        match &self.op {
            FilterOp::Eq => match field_value {
                Some(v) => *v == self.value,
                None => self.value.is_null(),
            },
            FilterOp::Ne => match field_value {
                Some(v) => *v != self.value,
                None => !self.value.is_null(),
            },
            FilterOp::Contains => match field_value {
                Some(Value::String(s)) => match &self.value {
                    Value::String(needle) => s.contains(needle.as_str()),
                    _ => false,
                },
                Some(Value::Array(arr)) => arr.contains(&self.value),
                _ => false,
            },
            FilterOp::AtMost => match (field_value, self.value.as_i64()) {
                (None, _) | (Some(Value::Null), _) => true,
                (Some(v), Some(bound)) => v.as_i64().is_some_and(|n| n <= bound),
                _ => false,
            },
        }
    }
}

/// Trait for records that live in a named collection and have an ID field.
pub trait HasId {
    /// Get the record's unique identifier.
    fn id(&self) -> &str;

    /// Collection the record is stored in.
    fn collection() -> &'static str;
}

/// Storage trait for CRUD operations on records.
pub trait Storage: Send + Sync {
    /// Create a new record.
    fn create<T: Serialize + HasId>(&self, record: &T) -> Result<()>;

    /// Get a record by ID.
    fn get<T: DeserializeOwned + HasId>(&self, id: &str) -> Result<Option<T>>;

    /// Replace an existing record.
    fn update<T: Serialize + HasId>(&self, record: &T) -> Result<()>;

    /// Create the record, or replace it if the ID already exists.
    fn upsert<T: Serialize + HasId>(&self, record: &T) -> Result<()>;

    /// Delete a record by ID.
    fn delete<T: HasId>(&self, id: &str) -> Result<()>;

    /// Query records with filters, in insertion order.
    fn query<T: DeserializeOwned + HasId>(&self, filters: &[Filter]) -> Result<Vec<T>>;

    /// List all records in a collection.
    fn list<T: DeserializeOwned + HasId>(&self) -> Result<Vec<T>> {
        self.query(&[])
    }
}
