//! Schema compilation: parsing SDL, interning types, validating the type
//! system and binding fields to resolvers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use futures::stream::BoxStream;
use slog::{o, Discard, Logger};
use thiserror::Error;

use crate::ast::schema as s;
use crate::data::query::QueryVariables;
use crate::data::result::QueryResult;
use crate::parser::{parse_schema, ParseError};
use crate::resolvers::{Context, Resolvers};
use crate::trace::{NoopTracer, Tracer};

/// Utilities for working with schema ASTs.
pub mod ast;

pub(crate) mod bind;
mod validation;

pub use bind::BindingError;
pub use validation::SchemaValidationError;

use ast as sast;

/// Schema-wide options, fixed at build time.
#[derive(Clone)]
pub struct SchemaOptions {
    /// Root logger; component loggers derive from it.
    pub logger: Logger,
    /// Fall back to reading members off the parent value when no resolver
    /// is registered for a field.
    pub use_field_resolvers: bool,
    /// Hide `__schema` and `__type`. `__typename` keeps working.
    pub disable_introspection: bool,
    /// Reject operations nesting selections deeper than this.
    pub max_depth: Option<usize>,
    /// Reject raw documents longer than this many bytes, before parsing.
    pub max_query_length: Option<usize>,
    /// Cap on concurrently resolving fields per request.
    pub max_parallelism: Option<usize>,
    pub tracer: Arc<dyn Tracer>,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        SchemaOptions {
            logger: Logger::root(Discard, o!()),
            use_field_resolvers: false,
            disable_introspection: false,
            max_depth: None,
            max_query_length: None,
            max_parallelism: None,
            tracer: Arc::new(NoopTracer),
        }
    }
}

/// A list of build errors displayed on one line.
#[derive(Clone, Debug, PartialEq)]
pub struct Strings(pub Vec<String>);

impl fmt::Display for Strings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.0.join(", "))
    }
}

/// Fatal errors raised while building a schema.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("invalid schema: {0}")]
    Validation(Strings),
    #[error("{0}")]
    Binding(#[from] BindingError),
}

impl From<Vec<SchemaValidationError>> for SchemaError {
    fn from(errors: Vec<SchemaValidationError>) -> Self {
        SchemaError::Validation(Strings(errors.iter().map(|e| e.to_string()).collect()))
    }
}

/// The compiled schema: immutable, cheap to clone, safe to share across
/// requests.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaData>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("query_type", &self.query_type)
            .field("mutation_type", &self.mutation_type)
            .field("subscription_type", &self.subscription_type)
            .finish()
    }
}

pub struct SchemaData {
    pub(crate) document: s::Document,
    pub(crate) types: HashMap<String, s::TypeDefinition>,
    pub(crate) query_type: String,
    pub(crate) mutation_type: Option<String>,
    pub(crate) subscription_type: Option<String>,
    /// Declared plus built-in directive definitions, declaration order.
    pub(crate) directives: Vec<s::DirectiveDefinition>,
    /// interface name -> names of object types implementing it
    pub(crate) types_for_interface: BTreeMap<String, Vec<String>>,
    pub(crate) bound: bind::BoundSchema,
    pub(crate) options: SchemaOptions,
    /// The meta schema serving `__schema`/`__type`; `None` when
    /// introspection is disabled (and for the meta schema itself).
    pub(crate) introspection: Option<Schema>,
}

impl Deref for Schema {
    type Target = SchemaData;

    fn deref(&self) -> &SchemaData {
        &self.inner
    }
}

impl Schema {
    /// Parses and compiles a schema, binding it against `resolvers`. An
    /// empty registry yields a schema that serves only introspection.
    pub fn parse(sdl: &str, resolvers: Resolvers) -> Result<Schema, SchemaError> {
        Schema::with_options(sdl, resolvers, SchemaOptions::default())
    }

    /// Like [`Schema::parse`] but panics on failure. For schemas known at
    /// compile time.
    pub fn must_parse(sdl: &str, resolvers: Resolvers) -> Schema {
        match Schema::parse(sdl, resolvers) {
            Ok(schema) => schema,
            Err(e) => panic!("graphql: {}", e),
        }
    }

    pub fn with_options(
        sdl: &str,
        resolvers: Resolvers,
        options: SchemaOptions,
    ) -> Result<Schema, SchemaError> {
        Schema::build(sdl, resolvers, options, false)
    }

    /// Builds the introspection meta schema, whose type names are exactly
    /// the ones user schemas may not claim.
    pub(crate) fn build_meta(
        sdl: &str,
        resolvers: Resolvers,
        options: SchemaOptions,
    ) -> Result<Schema, SchemaError> {
        Schema::build(sdl, resolvers, options, true)
    }

    fn build(
        sdl: &str,
        resolvers: Resolvers,
        options: SchemaOptions,
        meta: bool,
    ) -> Result<Schema, SchemaError> {
        let document = parse_schema(sdl)?;

        // Pass 1: intern every named type, then add the built-in scalars
        let mut types: HashMap<String, s::TypeDefinition> = HashMap::new();
        let mut errors: Vec<SchemaValidationError> = vec![];
        for typedef in sast::get_type_definitions(&document) {
            let name = typedef.name();
            if name.starts_with("__") && !meta {
                errors.push(SchemaValidationError::ReservedTypeName(name.clone()));
                continue;
            }
            if types.insert(name.clone(), typedef.clone()).is_some() {
                errors.push(SchemaValidationError::DuplicateTypeName(name.clone()));
            }
        }
        for name in sast::BUILTIN_SCALARS {
            types
                .entry(name.to_owned())
                .or_insert_with(|| s::TypeDefinition::Scalar(s::ScalarType::new(name.to_owned())));
        }

        // Root operation types: the `schema` block wins, otherwise types
        // named Query/Mutation/Subscription take the slots
        let schema_definition = sast::get_schema_definition(&document);
        let root = |explicit: Option<&String>, fallback: &str| -> Option<String> {
            match explicit {
                Some(name) => Some(name.clone()),
                None => types.contains_key(fallback).then(|| fallback.to_owned()),
            }
        };
        let query_type = root(schema_definition.and_then(|sd| sd.query.as_ref()), "Query");
        let mutation_type = root(
            schema_definition.and_then(|sd| sd.mutation.as_ref()),
            "Mutation",
        );
        let subscription_type = root(
            schema_definition.and_then(|sd| sd.subscription.as_ref()),
            "Subscription",
        );
        for root_type in [&query_type, &mutation_type, &subscription_type]
            .into_iter()
            .flatten()
        {
            match types.get(root_type) {
                None => errors.push(SchemaValidationError::UndefinedType(
                    root_type.clone(),
                    "schema".to_owned(),
                )),
                Some(s::TypeDefinition::Object(_)) => {}
                Some(_) => errors.push(SchemaValidationError::RootTypeNotObject(root_type.clone())),
            }
        }
        if query_type.is_none() {
            errors.push(SchemaValidationError::NoQueryRoot);
        }

        // Pass 2: resolve references and check the type system invariants
        errors.extend(validation::validate_schema(&types));
        if !errors.is_empty() {
            return Err(errors.into());
        }
        let query_type = query_type.expect("checked above");

        let mut types_for_interface: BTreeMap<String, Vec<String>> = types
            .values()
            .filter_map(|td| match td {
                s::TypeDefinition::Interface(i) => Some((i.name.clone(), vec![])),
                _ => None,
            })
            .collect();
        let mut object_names: Vec<&String> = types
            .values()
            .filter_map(|td| match td {
                s::TypeDefinition::Object(o) => Some(&o.name),
                _ => None,
            })
            .collect();
        object_names.sort();
        for name in object_names {
            if let Some(s::TypeDefinition::Object(object)) = types.get(name) {
                for interface in &object.implements_interfaces {
                    if let Some(implementors) = types_for_interface.get_mut(interface) {
                        implementors.push(object.name.clone());
                    }
                }
            }
        }

        let mut directives: Vec<s::DirectiveDefinition> = sast::get_directive_definitions(&document)
            .into_iter()
            .cloned()
            .collect();
        for builtin in builtin_directives() {
            if !directives.iter().any(|d| d.name == builtin.name) {
                directives.push(builtin);
            }
        }

        let bound = bind::bind(
            &types,
            &query_type,
            mutation_type.as_deref(),
            subscription_type.as_deref(),
            resolvers,
            options.use_field_resolvers,
        )?;

        let introspection = if meta || options.disable_introspection {
            None
        } else {
            Some(crate::introspection::meta_schema(
                &types,
                &directives,
                &types_for_interface,
                &query_type,
                mutation_type.as_deref(),
                subscription_type.as_deref(),
                &options,
            )?)
        };

        Ok(Schema {
            inner: Arc::new(SchemaData {
                document,
                types,
                query_type,
                mutation_type,
                subscription_type,
                directives,
                types_for_interface,
                bound,
                options,
                introspection,
            }),
        })
    }

    /// The parsed schema AST, exactly as written. Printing it with
    /// `to_string` yields SDL that re-parses to an equivalent schema.
    pub fn ast(&self) -> &s::Document {
        &self.document
    }

    /// Executes a query or mutation against the schema. The response is
    /// ready to serialize as the body of a GraphQL HTTP response.
    pub async fn exec(
        &self,
        ctx: Context,
        document: &str,
        operation_name: Option<&str>,
        variables: Option<QueryVariables>,
    ) -> QueryResult {
        crate::execution::execute_query(self, ctx, document, operation_name, variables).await
    }

    /// Resolves a subscription into a stream of responses, one per source
    /// event. Dropping the stream or cancelling `ctx` ends the
    /// subscription.
    pub fn subscribe(
        &self,
        ctx: Context,
        document: &str,
        operation_name: Option<&str>,
        variables: Option<QueryVariables>,
    ) -> Result<BoxStream<'static, QueryResult>, crate::data::error::SubscriptionError> {
        crate::subscription::execute_subscription(self, ctx, document, operation_name, variables)
    }

    pub(crate) fn get_named_type(&self, name: &str) -> Option<&s::TypeDefinition> {
        self.types.get(name)
    }

    pub(crate) fn query_object_type(&self) -> &s::ObjectType {
        match self.types.get(&self.query_type) {
            Some(s::TypeDefinition::Object(object)) => object,
            _ => unreachable!("the query root was checked at build time"),
        }
    }

    pub(crate) fn object_type(&self, name: &str) -> Option<&s::ObjectType> {
        match self.types.get(name) {
            Some(s::TypeDefinition::Object(object)) => Some(object),
            _ => None,
        }
    }
}

/// The directive definitions every schema carries.
fn builtin_directives() -> Vec<s::DirectiveDefinition> {
    use crate::ast::Pos;

    let input_value = |name: &str, ty: s::Type, default: Option<s::Value>| s::InputValue {
        position: Pos::default(),
        description: None,
        name: name.to_owned(),
        value_type: ty,
        default_value: default,
        directives: vec![],
    };
    let non_null = |name: &str| s::Type::NonNullType(Box::new(s::Type::NamedType(name.to_owned())));

    vec![
        s::DirectiveDefinition {
            position: Pos::default(),
            description: Some("Directs the executor to skip this field or fragment when the `if` argument is true.".to_owned()),
            name: "skip".to_owned(),
            arguments: vec![input_value("if", non_null("Boolean"), None)],
            repeatable: false,
            locations: vec![
                s::DirectiveLocation::Field,
                s::DirectiveLocation::FragmentSpread,
                s::DirectiveLocation::InlineFragment,
            ],
        },
        s::DirectiveDefinition {
            position: Pos::default(),
            description: Some("Directs the executor to include this field or fragment only when the `if` argument is true.".to_owned()),
            name: "include".to_owned(),
            arguments: vec![input_value("if", non_null("Boolean"), None)],
            repeatable: false,
            locations: vec![
                s::DirectiveLocation::Field,
                s::DirectiveLocation::FragmentSpread,
                s::DirectiveLocation::InlineFragment,
            ],
        },
        s::DirectiveDefinition {
            position: Pos::default(),
            description: Some("Marks an element of a GraphQL schema as no longer supported.".to_owned()),
            name: "deprecated".to_owned(),
            arguments: vec![input_value(
                "reason",
                s::Type::NamedType("String".to_owned()),
                Some(s::Value::String("No longer supported".to_owned())),
            )],
            repeatable: false,
            locations: vec![
                s::DirectiveLocation::FieldDefinition,
                s::DirectiveLocation::EnumValue,
            ],
        },
        s::DirectiveDefinition {
            position: Pos::default(),
            description: Some("Exposes a URL that specifies the behavior of this scalar.".to_owned()),
            name: "specifiedBy".to_owned(),
            arguments: vec![input_value("url", non_null("String"), None)],
            repeatable: false,
            locations: vec![s::DirectiveLocation::Scalar],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_schema() {
        let schema = Schema::parse(
            "type Query { hello: String! }",
            Resolvers::new().field_fn("Query", "hello", |_| {
                Ok(crate::data::value::Value::String("Hello world!".to_owned()))
            }),
        )
        .unwrap();
        assert_eq!(schema.query_type, "Query");
        assert!(schema.mutation_type.is_none());
    }

    #[test]
    fn schema_block_overrides_root_names() {
        let schema = Schema::parse(
            "
            schema { query: Root }
            type Root { ok: Boolean! }
            ",
            Resolvers::new()
                .field_fn("Root", "ok", |_| Ok(crate::data::value::Value::Boolean(true))),
        )
        .unwrap();
        assert_eq!(schema.query_type, "Root");
    }

    #[test]
    fn missing_resolver_is_a_build_error() {
        let err = Schema::parse(
            "type Query { hello: String! greeting: String! }",
            Resolvers::new().field_fn("Query", "hello", |_| {
                Ok(crate::data::value::Value::String("hi".to_owned()))
            }),
        )
        .unwrap_err();
        match err {
            SchemaError::Binding(BindingError::MissingFieldResolver {
                type_name, field, ..
            }) => {
                assert_eq!(type_name, "Query");
                assert_eq!(field, "greeting");
            }
            other => panic!("expected a binding error, got {}", other),
        }
    }

    #[test]
    fn resolver_names_match_after_normalization() {
        // `say_hello` binds the schema field `sayHello`
        let schema = Schema::parse(
            "type Query { sayHello: String! }",
            Resolvers::new().field_fn("Query", "say_hello", |_| {
                Ok(crate::data::value::Value::String("hi".to_owned()))
            }),
        );
        assert!(schema.is_ok());
    }

    #[test]
    fn ambiguous_resolvers_are_rejected() {
        let err = Schema::parse(
            "type Query { sayHello: String! }",
            Resolvers::new()
                .field_fn("Query", "say_hello", |_| {
                    Ok(crate::data::value::Value::Null)
                })
                .field_fn("Query", "sayHello", |_| {
                    Ok(crate::data::value::Value::Null)
                }),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Binding(BindingError::AmbiguousResolver(..))
        ));
    }

    #[test]
    fn reserved_names_are_rejected() {
        let err = Schema::parse(
            "
            type __Reserved { x: Int }
            type Query { r: __Reserved }
            ",
            Resolvers::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("reserved"), "{}", err);
    }

    #[test]
    fn missing_query_root_is_rejected() {
        let err = Schema::parse("type Mutation { inc: Int! }", Resolvers::new()).unwrap_err();
        assert!(err.to_string().contains("query root"), "{}", err);
    }

    #[test]
    fn ast_round_trips_through_printing() {
        let sdl = "
            schema { query: Query }
            type Query { droid(id: ID!): Droid }
            type Droid { name: String! friends(first: Int = 5): [Droid!] }
            enum Color { RED GREEN }
        ";
        let schema = Schema::parse(sdl, Resolvers::new()).unwrap();
        let printed = schema.ast().to_string();
        let reparsed = Schema::parse(&printed, Resolvers::new()).unwrap();
        assert_eq!(printed, reparsed.ast().to_string());
    }
}
