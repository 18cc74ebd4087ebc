//! The result of running a query, serialized as `{ data?, errors? }`.

use serde::ser::Serializer;
use serde::Serialize;

use crate::data::error::{QueryError, QueryExecutionError};
use crate::data::value::Value;

fn serialize_data<S: Serializer>(data: &Option<Value>, serializer: S) -> Result<S::Ok, S::Error> {
    // Unwrap: data is only serialized if it is `Some`.
    data.as_ref().unwrap().serialize(serializer)
}

/// The outcome of executing one operation. `data` is absent (not `null`)
/// when the request failed before execution started, and `null` when a
/// non-null violation propagated to the root.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryResult {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_data"
    )]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<QueryError>,
}

impl QueryResult {
    pub fn new(data: Option<Value>) -> Self {
        QueryResult {
            data,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(data: Option<Value>, errors: Vec<QueryError>) -> Self {
        QueryResult { data, errors }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn errors(&self) -> &[QueryError] {
        &self.errors
    }

    pub fn to_result(self) -> Result<Option<Value>, Vec<QueryError>> {
        if self.errors.is_empty() {
            Ok(self.data)
        } else {
            Err(self.errors)
        }
    }
}

impl From<QueryError> for QueryResult {
    fn from(e: QueryError) -> Self {
        QueryResult {
            data: None,
            errors: vec![e],
        }
    }
}

impl From<Vec<QueryError>> for QueryResult {
    fn from(errors: Vec<QueryError>) -> Self {
        QueryResult { data: None, errors }
    }
}

impl From<QueryExecutionError> for QueryResult {
    fn from(e: QueryExecutionError) -> Self {
        QueryResult {
            data: None,
            errors: vec![e.into()],
        }
    }
}

impl From<Vec<QueryExecutionError>> for QueryResult {
    fn from(errors: Vec<QueryExecutionError>) -> Self {
        QueryResult {
            data: None,
            errors: errors.into_iter().map(QueryError::from).collect(),
        }
    }
}
