//! Error kinds raised while executing a query, and the wire-level error
//! entry they serialize into.

use std::collections::HashMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use thiserror::Error;

use crate::ast::Pos;
use crate::data::value::{Object, Value};
use crate::parser::ParseError;

/// One step of a response path: a response key or a list index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PathSegment::Field(name) => serializer.serialize_str(name),
            PathSegment::Index(ix) => serializer.serialize_u64(*ix as u64),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(ix) => write!(f, "{}", ix),
        }
    }
}

/// Error caused while executing a query.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum QueryExecutionError {
    #[error("Operation name required when the document has multiple operations")]
    OperationNameRequired,
    #[error("Operation name not found: {0}")]
    OperationNotFound(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("No root Query type defined in the schema")]
    NoRootQueryObjectType,
    #[error("No root Subscription type defined in the schema")]
    NoRootSubscriptionObjectType,
    #[error("schema created without resolvers, can not exec")]
    SchemaWithoutResolvers,
    #[error("graphql-ws protocol header is missing")]
    SubscriptionNotOverWebsocket,
    #[error("graphql: got nil for non-null \"{1}\"")]
    NonNullError(Pos, String),
    #[error("Non-list value resolved for list field \"{1}\"")]
    ListValueError(Pos, String),
    #[error("Failed to resolve named type: {0}")]
    NamedTypeError(String),
    #[error("could not determine the concrete type of abstract type \"{1}\"")]
    AbstractTypeError(Pos, String),
    #[error("unknown concrete type \"{1}\" for abstract type \"{2}\"")]
    UnknownConcreteTypeError(Pos, String, String),
    #[error("Type \"{1}\" has no field \"{2}\"")]
    UnknownField(Pos, String, String),
    #[error("Invalid value {1}.\nExpected type {2}, found {1}.")]
    EnumCoercionError(Pos, Value, String),
    #[error("Invalid value {1}.\nExpected type {2}, found {1}.")]
    ScalarCoercionError(Pos, Value, String),
    #[error("could not pack arguments: {1}")]
    PackingError(Pos, String),
    #[error("Variable \"{1}\" has invalid value {2}.\n{3}")]
    VariableCoercionError(Pos, String, String, String),
    #[error("{message}")]
    ResolverError {
        position: Pos,
        message: String,
        extensions: Option<Object>,
    },
    #[error("Query timed out")]
    Timeout,
    #[error("Query execution was cancelled")]
    Cancelled,
    #[error("The query is empty")]
    EmptyQuery,
    #[error("Only a single top-level field is allowed in subscriptions")]
    MultipleSubscriptionFields,
}

impl QueryExecutionError {
    fn position(&self) -> Option<Pos> {
        use QueryExecutionError::*;
        match self {
            NonNullError(pos, _)
            | ListValueError(pos, _)
            | AbstractTypeError(pos, _)
            | UnknownConcreteTypeError(pos, _, _)
            | UnknownField(pos, _, _)
            | EnumCoercionError(pos, _, _)
            | ScalarCoercionError(pos, _, _)
            | PackingError(pos, _)
            | VariableCoercionError(pos, _, _, _)
            | ResolverError { position: pos, .. } => Some(*pos),
            _ => None,
        }
    }

    fn extensions(&self) -> Option<Object> {
        match self {
            QueryExecutionError::ResolverError { extensions, .. } => extensions.clone(),
            _ => None,
        }
    }
}

impl From<QueryExecutionError> for Vec<QueryExecutionError> {
    fn from(e: QueryExecutionError) -> Self {
        vec![e]
    }
}

/// A single entry of a response's `errors` list.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryError {
    pub message: String,
    pub locations: Vec<Pos>,
    pub path: Vec<PathSegment>,
    /// Name of the validation rule that produced the error, if any.
    pub rule: Option<&'static str>,
    pub extensions: Option<Object>,
}

impl QueryError {
    pub fn new(message: String) -> Self {
        QueryError {
            message,
            locations: vec![],
            path: vec![],
            rule: None,
            extensions: None,
        }
    }

    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }
}

impl From<QueryExecutionError> for QueryError {
    fn from(e: QueryExecutionError) -> Self {
        QueryError {
            message: e.to_string(),
            locations: e.position().into_iter().collect(),
            path: vec![],
            rule: None,
            extensions: e.extensions(),
        }
    }
}

impl From<ParseError> for QueryError {
    fn from(e: ParseError) -> Self {
        QueryError {
            message: e.message.clone(),
            locations: vec![e.pos],
            path: vec![],
            rule: None,
            extensions: None,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryError {}

impl Serialize for QueryError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("message", &self.message)?;
        if !self.locations.is_empty() {
            let locations: Vec<HashMap<&str, usize>> = self
                .locations
                .iter()
                .map(|pos| {
                    let mut location = HashMap::new();
                    location.insert("line", pos.line);
                    location.insert("column", pos.column);
                    location
                })
                .collect();
            map.serialize_entry("locations", &locations)?;
        }
        if !self.path.is_empty() {
            map.serialize_entry("path", &self.path)?;
        }
        if let Some(rule) = self.rule {
            map.serialize_entry("rule", rule)?;
        }
        if let Some(extensions) = &self.extensions {
            map.serialize_entry("extensions", extensions)?;
        }
        map.end()
    }
}

/// Error caused while processing a subscription request.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("query parse error")]
    ParseError(#[from] ParseError),
    #[error("graphql error")]
    GraphQLError(Vec<QueryError>),
}

impl From<QueryExecutionError> for SubscriptionError {
    fn from(e: QueryExecutionError) -> Self {
        SubscriptionError::GraphQLError(vec![e.into()])
    }
}

impl From<Vec<QueryError>> for SubscriptionError {
    fn from(e: Vec<QueryError>) -> Self {
        SubscriptionError::GraphQLError(e)
    }
}
