//! Request entry: length gate, parse, validate, coerce variables, execute.

use std::collections::HashMap;
use std::time::Instant;

use slog::{info, o};
use uuid::Uuid;

use crate::ast::query as q;
use crate::data::error::{QueryError, QueryExecutionError};
use crate::data::query::QueryVariables;
use crate::data::result::QueryResult;
use crate::data::value::{Object, Value};
use crate::execution::execution::{
    coerce_variable_values, collect_fields, execute_selection_set, ExecutionContext, PropagateNull,
};
use crate::parser::parse_query;
use crate::query::ast as qast;
use crate::resolvers::Context;
use crate::schema::Schema;
use crate::validation;

pub(crate) async fn execute_query(
    schema: &Schema,
    ctx: Context,
    document_text: &str,
    operation_name: Option<&str>,
    variables: Option<QueryVariables>,
) -> QueryResult {
    if let Some(max) = schema.options.max_query_length {
        if document_text.len() > max {
            return QueryResult::from(QueryError::new(format!(
                "query length {} exceeds the maximum allowed query length of {} bytes",
                document_text.len(),
                max
            )));
        }
    }

    let document = match parse_query(document_text) {
        Ok(document) => document,
        Err(e) => return QueryResult::from(QueryError::from(e)),
    };

    // Execution only runs on a clean document
    let validation_errors = validation::validate(schema, &document);
    if !validation_errors.is_empty() {
        return QueryResult::from(
            validation_errors
                .into_iter()
                .map(QueryError::from)
                .collect::<Vec<_>>(),
        );
    }

    let operation = match qast::find_operation(&document, operation_name) {
        Ok(operation) => qast::parts(operation),
        Err(e) => return QueryResult::from(e),
    };

    let (root_type, serial) = match operation.kind {
        qast::OperationKind::Query => (schema.query_type.clone(), false),
        qast::OperationKind::Mutation => match &schema.mutation_type {
            Some(mutation_type) => (mutation_type.clone(), true),
            None => {
                return QueryResult::from(QueryExecutionError::NotSupported(
                    "mutations".to_owned(),
                ))
            }
        },
        qast::OperationKind::Subscription => {
            // Subscriptions need a streaming transport
            return QueryResult::from(QueryExecutionError::SubscriptionNotOverWebsocket);
        }
    };

    let coerced_variables =
        match coerce_variable_values(schema, operation.variable_definitions, &variables) {
            Ok(coerced) => coerced,
            Err(errors) => {
                let errors: Vec<QueryError> = errors
                    .into_iter()
                    .map(|e| {
                        let mut entry = QueryError::from(e);
                        entry.rule = Some(validation::VARIABLES_OF_CORRECT_TYPE);
                        entry
                    })
                    .collect();
                return QueryResult::from(errors);
            }
        };

    let query_id = Uuid::new_v4().to_string();
    let logger = schema.options.logger.new(o!("query_id" => query_id));

    let variable_types: HashMap<String, String> = operation
        .variable_definitions
        .iter()
        .map(|def| (def.name.clone(), def.var_type.to_string()))
        .collect();
    let finish_trace = schema.options.tracer.trace_query(
        document_text,
        operation_name,
        &coerced_variables,
        &variable_types,
    );

    let ectx = ExecutionContext::new(logger.clone(), schema, ctx, &document, coerced_variables);

    let start = Instant::now();
    let data =
        execute_root_selection_set(&ectx, operation.selection_set, &root_type, serial).await;
    let errors = ectx.take_errors();
    finish_trace(&errors);

    if *crate::env::LOG_GQL_TIMING {
        info!(
            logger,
            "Query timing (GraphQL)";
            "query" => document_text.replace('\n', " "),
            "query_time_ms" => start.elapsed().as_millis(),
        );
    }

    QueryResult::with_errors(Some(data), errors)
}

/// Executes the root selection set, splitting introspection fields from
/// data fields: the former run against the meta schema, the latter against
/// the user schema, and the response reassembles them in selection order.
async fn execute_root_selection_set(
    ctx: &ExecutionContext,
    selection_set: &q::SelectionSet,
    root_type: &str,
    serial: bool,
) -> Value {
    let root_object = match ctx.schema.object_type(root_type) {
        Some(object_type) => object_type,
        None => {
            ctx.record(QueryExecutionError::NoRootQueryObjectType);
            return Value::Null;
        }
    };

    let mut order: Vec<String> = vec![];
    let mut data_items: Vec<q::Selection> = vec![];
    let mut intro_items: Vec<q::Selection> = vec![];
    for (response_key, fields) in collect_fields(ctx, root_object, vec![selection_set], None) {
        order.push(response_key.to_owned());
        let name = fields[0].name.as_str();
        let selections = fields
            .iter()
            .map(|field| q::Selection::Field((*field).clone()));
        if name == "__schema" || name == "__type" {
            intro_items.extend(selections);
        } else {
            data_items.extend(selections);
        }
    }

    let mut data_map = Object::new();
    let mut propagated = false;
    if !data_items.is_empty() {
        let data_set = q::SelectionSet {
            span: selection_set.span,
            items: data_items,
        };
        let parent = Value::Object(Object::new());
        match execute_selection_set(ctx, vec![&data_set], root_object, &parent, serial).await {
            Ok(Value::Object(map)) => data_map = map,
            Ok(_) => {}
            Err(PropagateNull) => propagated = true,
        }
    }

    let mut intro_map = Object::new();
    if !intro_items.is_empty() {
        match &ctx.schema.introspection {
            // Disabled introspection: `__schema` and `__type` are silently
            // omitted from the result
            None => {}
            Some(meta_schema) => {
                let intro_set = q::SelectionSet {
                    span: selection_set.span,
                    items: intro_items,
                };
                let mut meta_ctx = ctx.clone();
                meta_ctx.schema = meta_schema.clone();
                let parent = Value::Object(Object::new());
                match execute_selection_set(
                    &meta_ctx,
                    vec![&intro_set],
                    meta_schema.query_object_type(),
                    &parent,
                    false,
                )
                .await
                {
                    Ok(Value::Object(map)) => intro_map = map,
                    Ok(_) => {}
                    Err(PropagateNull) => propagated = true,
                }
            }
        }
    }

    if propagated {
        return Value::Null;
    }

    // Response keys keep the order of their first appearance
    let mut result = Object::new();
    for key in order {
        if let Some(value) = data_map.remove(&key).or_else(|| intro_map.remove(&key)) {
            result.insert(key, value);
        }
    }
    Value::Object(result)
}
