//! Introspection: `__schema`, `__type` and `__typename` over a compiled
//! schema.
//!
//! The meta schema is itself a compiled [`Schema`]: its resolvers close
//! over read-only views (`type_objects`) generated from the user schema at
//! build time, and introspection selections run through the ordinary
//! executor. Named type references inside those views are stored as plain
//! strings and dereferenced lazily, which keeps recursive types finite.

mod resolver;

use crate::schema::{Schema, SchemaError, SchemaOptions};

pub(crate) const META_SCHEMA: &str = include_str!("schema.graphql");

/// Builds the per-schema meta schema. Called once at the end of a user
/// schema build; `None` when introspection is disabled.
pub(crate) fn meta_schema(
    types: &std::collections::HashMap<String, crate::ast::schema::TypeDefinition>,
    directives: &[crate::ast::schema::DirectiveDefinition],
    types_for_interface: &std::collections::BTreeMap<String, Vec<String>>,
    query_type: &str,
    mutation_type: Option<&str>,
    subscription_type: Option<&str>,
    options: &SchemaOptions,
) -> Result<Schema, SchemaError> {
    let resolvers = resolver::introspection_resolvers(
        types,
        directives,
        types_for_interface,
        query_type,
        mutation_type,
        subscription_type,
    );
    let meta_options = SchemaOptions {
        logger: options.logger.clone(),
        use_field_resolvers: true,
        ..SchemaOptions::default()
    };
    Schema::build_meta(META_SCHEMA, resolvers, meta_options)
}
