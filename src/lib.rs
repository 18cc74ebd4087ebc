//! A GraphQL server library: schema compilation, query validation,
//! execution and subscriptions.
//!
//! A schema is built from an SDL document plus a [`resolvers::Resolvers`]
//! registry, then serves requests through [`schema::Schema::exec`] and
//! [`schema::Schema::subscribe`]:
//!
//! ```
//! use graphql_server::prelude::*;
//!
//! # futures::executor::block_on(async {
//! let schema = Schema::must_parse(
//!     "type Query { hello: String! }",
//!     Resolvers::new().field_fn("Query", "hello", |_| Ok(Value::String("Hello world!".into()))),
//! );
//! let result = schema.exec(Context::new(), "{ hello }", None, None).await;
//! assert_eq!(
//!     serde_json::to_string(&result).unwrap(),
//!     r#"{"data":{"hello":"Hello world!"}}"#
//! );
//! # });
//! ```

/// Typed ASTs for both GraphQL grammars.
pub mod ast;

/// The tokenizer shared by both grammars.
pub mod lexer;

/// Recursive-descent parsers for SDL and executable documents.
pub mod parser;

/// Dynamic values, errors, results and variables.
pub mod data;

/// Utilities for working with GraphQL schemas.
pub mod schema;

/// Utilities for working with query ASTs.
pub mod query;

/// The resolver registry schemas are bound against.
pub mod resolvers;

/// Validation of executable documents.
pub mod validation;

/// Utilities for working with GraphQL values.
pub mod values;

/// Observation hooks around query and field execution.
pub mod trace;

/// Utilities for schema introspection.
mod introspection;

/// Utilities for executing GraphQL queries.
mod execution;

/// Utilities for executing GraphQL subscriptions.
mod subscription;

mod env;

use data::query::QueryVariables;
use data::result::QueryResult;
use resolvers::{Context, Resolvers};
use schema::{Schema, SchemaError};

/// Parses and compiles a schema bound to the given resolvers.
pub fn parse_schema(sdl: &str, resolvers: Resolvers) -> Result<Schema, SchemaError> {
    Schema::parse(sdl, resolvers)
}

/// Like [`parse_schema`] but panics on failure.
pub fn must_parse_schema(sdl: &str, resolvers: Resolvers) -> Schema {
    Schema::must_parse(sdl, resolvers)
}

/// Executes a query against a schema; a convenience wrapper around
/// [`Schema::exec`].
pub async fn exec(
    schema: &Schema,
    ctx: Context,
    document: &str,
    operation_name: Option<&str>,
    variables: Option<QueryVariables>,
) -> QueryResult {
    schema.exec(ctx, document, operation_name, variables).await
}

/// Prelude that exports the most important traits and types.
pub mod prelude {
    pub use crate::data::error::{PathSegment, QueryError, SubscriptionError};
    pub use crate::data::query::QueryVariables;
    pub use crate::data::result::QueryResult;
    pub use crate::data::value::{object_value, IntoValue, Object, Value};
    pub use crate::object;
    pub use crate::resolvers::{
        Context, FieldContext, FieldResult, Resolvers, ResolverError, ScalarUnmarshaler,
    };
    pub use crate::schema::{Schema, SchemaError, SchemaOptions};
    pub use crate::trace::{LogTracer, NoopTracer, Tracer};
    pub use crate::values::coercion::MaybeCoercible;
}
