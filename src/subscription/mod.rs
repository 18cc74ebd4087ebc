//! Subscription execution: resolve the root field once into an event
//! stream, then run the rest of the selection set as a query per event.

use futures::future;
use futures::stream::{BoxStream, StreamExt};

use crate::ast::query as q;
use crate::data::error::{PathSegment, QueryError, QueryExecutionError, SubscriptionError};
use crate::data::query::QueryVariables;
use crate::data::result::QueryResult;
use crate::data::value::{Object, Value};
use crate::execution::{
    coerce_variable_values, collect_fields, complete_value, ExecutionContext, PropagateNull,
};
use crate::parser::parse_query;
use crate::query::ast as qast;
use crate::resolvers::{Context, FieldContext, ResolverError};
use crate::schema::Schema;
use crate::validation;

pub(crate) fn execute_subscription(
    schema: &Schema,
    ctx: Context,
    document_text: &str,
    operation_name: Option<&str>,
    variables: Option<QueryVariables>,
) -> Result<BoxStream<'static, QueryResult>, SubscriptionError> {
    if let Some(max) = schema.options.max_query_length {
        if document_text.len() > max {
            return Err(SubscriptionError::GraphQLError(vec![QueryError::new(
                format!(
                    "query length {} exceeds the maximum allowed query length of {} bytes",
                    document_text.len(),
                    max
                ),
            )]));
        }
    }

    let document = parse_query(document_text)?;

    let validation_errors = validation::validate(schema, &document);
    if !validation_errors.is_empty() {
        return Err(SubscriptionError::GraphQLError(
            validation_errors.into_iter().map(QueryError::from).collect(),
        ));
    }

    let operation = qast::find_operation(&document, operation_name)
        .map(qast::parts)
        .map_err(SubscriptionError::from)?;
    if operation.kind != qast::OperationKind::Subscription {
        return Err(SubscriptionError::from(QueryExecutionError::NotSupported(
            "Only subscriptions are supported".to_owned(),
        )));
    }
    let selection_set = operation.selection_set;

    let subscription_type = schema
        .subscription_type
        .as_ref()
        .and_then(|name| schema.object_type(name))
        .ok_or(QueryExecutionError::NoRootSubscriptionObjectType)?
        .clone();

    if !schema.bound.has_resolvers {
        return Err(SubscriptionError::from(
            QueryExecutionError::SchemaWithoutResolvers,
        ));
    }

    let coerced_variables =
        match coerce_variable_values(schema, operation.variable_definitions, &variables) {
            Ok(coerced) => coerced,
            Err(errors) => {
                return Err(SubscriptionError::GraphQLError(
                    errors.into_iter().map(QueryError::from).collect(),
                ))
            }
        };

    let ectx = ExecutionContext::new(
        schema.options.logger.clone(),
        schema,
        ctx.clone(),
        &document,
        coerced_variables,
    );

    // Exactly one top-level field produces the event stream
    let grouped = collect_fields(&ectx, &subscription_type, vec![selection_set], None);
    if grouped.is_empty() {
        return Err(SubscriptionError::from(QueryExecutionError::EmptyQuery));
    }
    if grouped.len() > 1 {
        return Err(SubscriptionError::from(
            QueryExecutionError::MultipleSubscriptionFields,
        ));
    }
    let (response_key, fields) = grouped.get_index(0).expect("one group");
    let response_key = (*response_key).to_owned();
    let fields: Vec<q::Field> = fields.iter().map(|f| (*f).clone()).collect();
    let field = fields[0].clone();

    let binding = ectx
        .schema
        .bound
        .field(&subscription_type.name, &field.name)
        .cloned()
        .ok_or_else(|| {
            QueryExecutionError::UnknownField(
                field.position,
                subscription_type.name.clone(),
                field.name.clone(),
            )
        })?;
    let stream_resolver = ectx
        .schema
        .bound
        .streams
        .get(&field.name)
        .cloned()
        .ok_or_else(|| {
            QueryExecutionError::NotSupported(format!(
                "subscription field \"{}\" has no stream resolver",
                field.name
            ))
        })?;

    let args = match binding.packer {
        None => Object::new(),
        Some(packer) => ectx
            .schema
            .bound
            .packers
            .pack_arguments(packer, &field.arguments, &ectx.variables)
            .map_err(|reason| {
                QueryExecutionError::PackingError(field.position, reason)
            })?,
    };

    let source_stream = stream_resolver(FieldContext {
        ctx: ctx.clone(),
        parent: Value::Null,
        args,
    });

    let cancel = ctx.clone();
    let response_stream = source_stream
        .take_while(move |_| future::ready(!cancel.is_cancelled()))
        .then(move |event| {
            let ectx = ectx.fresh();
            let response_key = response_key.clone();
            let fields = fields.clone();
            let binding = binding.clone();
            async move {
                execute_subscription_event(ectx, response_key, fields, binding, event).await
            }
        });

    Ok(Box::pin(response_stream))
}

/// One emitted event: the resolved value runs through ordinary completion
/// as if the subscription field's resolver had just returned it.
async fn execute_subscription_event(
    ectx: ExecutionContext,
    response_key: String,
    fields: Vec<q::Field>,
    binding: std::sync::Arc<crate::schema::bind::FieldBinding>,
    event: Result<Value, ResolverError>,
) -> QueryResult {
    let field = &fields[0];
    let field_ctx = ectx.down(PathSegment::Field(response_key.clone()));

    let data = match event {
        Err(resolver_error) => {
            field_ctx.record(QueryExecutionError::ResolverError {
                position: field.position,
                message: resolver_error.message,
                extensions: resolver_error.extensions,
            });
            Value::Null
        }
        Ok(value) => {
            let field_refs: Vec<&q::Field> = fields.iter().collect();
            match complete_value(
                &field_ctx,
                field,
                &binding.field.field_type,
                &field_refs,
                value,
            )
            .await
            {
                Ok(completed) => {
                    let mut payload = Object::new();
                    payload.insert(response_key, completed);
                    Value::Object(payload)
                }
                Err(PropagateNull) => Value::Null,
            }
        }
    };

    QueryResult::with_errors(Some(data), ectx.take_errors())
}
