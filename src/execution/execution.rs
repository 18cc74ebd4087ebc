//! The executor: walks a validated selection set against a compiled schema,
//! dispatching resolvers and completing their values.
//!
//! Null propagation is a first-class signal: an `Err(PropagateNull)` means
//! "a field error was recorded below, bubble null upwards". It is absorbed
//! at the nearest nullable boundary; if none exists the response `data`
//! becomes null. Exactly one error is recorded per propagation chain.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use indexmap::IndexMap;
use slog::Logger;
use tokio::sync::Semaphore;

use crate::ast::query as q;
use crate::ast::schema as s;
use crate::data::error::{PathSegment, QueryError, QueryExecutionError};
use crate::data::query::QueryVariables;
use crate::data::value::{Object, Value};
use crate::query::ast as qast;
use crate::resolvers::{Context, FieldContext};
use crate::schema::ast as sast;
use crate::schema::bind::{FieldBinding, FieldResolverKind};
use crate::schema::Schema;
use crate::values::coercion::{self, MaybeCoercible};

/// The "bubble null upwards" signal. The error it stands for has already
/// been recorded.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PropagateNull;

/// Contextual information passed around during query execution. Cloning is
/// cheap; clones share the schema, the variables and the error sink.
#[derive(Clone)]
pub(crate) struct ExecutionContext {
    pub logger: Logger,
    pub schema: Schema,
    pub ctx: Context,
    pub fragments: Arc<HashMap<String, q::FragmentDefinition>>,
    pub variables: Arc<HashMap<String, Value>>,
    /// Errors in detection order; shared by concurrent siblings.
    pub errors: Arc<Mutex<Vec<QueryError>>>,
    /// The response path to the field being worked on.
    pub path: Vec<PathSegment>,
    /// Caps concurrently resolving fields per request.
    pub semaphore: Option<Arc<Semaphore>>,
    cancellation_reported: Arc<AtomicBool>,
}

impl ExecutionContext {
    pub fn new(
        logger: Logger,
        schema: &Schema,
        ctx: Context,
        document: &q::Document,
        variables: HashMap<String, Value>,
    ) -> Self {
        let fragments = qast::get_fragments(document)
            .into_iter()
            .map(|(name, fragment)| (name.to_owned(), fragment.clone()))
            .collect();
        ExecutionContext {
            logger,
            schema: schema.clone(),
            ctx,
            fragments: Arc::new(fragments),
            variables: Arc::new(variables),
            errors: Arc::new(Mutex::new(Vec::new())),
            path: vec![],
            semaphore: schema
                .options
                .max_parallelism
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
            cancellation_reported: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A derived context for a child of the current position.
    pub(crate) fn down(&self, segment: PathSegment) -> Self {
        let mut child = self.clone();
        child.path.push(segment);
        child
    }

    /// A context for an independent execution sharing this one's schema,
    /// variables and fragments, with its own error sink and path.
    pub(crate) fn fresh(&self) -> Self {
        let mut fresh = self.clone();
        fresh.errors = Arc::new(Mutex::new(Vec::new()));
        fresh.path = vec![];
        fresh.cancellation_reported = Arc::new(AtomicBool::new(false));
        fresh
    }

    /// Records an error at the current path and returns it for the tracer.
    pub(crate) fn record(&self, error: QueryExecutionError) -> QueryError {
        let entry = QueryError::from(error).with_path(self.path.clone());
        self.errors.lock().unwrap().push(entry.clone());
        entry
    }

    pub fn take_errors(&self) -> Vec<QueryError> {
        std::mem::take(&mut *self.errors.lock().unwrap())
    }

    /// The cancellation error is recorded once per request.
    fn report_cancellation(&self) {
        if !self.cancellation_reported.swap(true, Ordering::SeqCst) {
            let error = match self.ctx.deadline {
                Some(deadline) if deadline < std::time::Instant::now() => {
                    QueryExecutionError::Timeout
                }
                _ => QueryExecutionError::Cancelled,
            };
            self.record(error);
        }
    }

    fn fragment(&self, name: &str) -> Option<&q::FragmentDefinition> {
        self.fragments.get(name)
    }
}

/// Collects the fields of a selection set into ordered groups sharing a
/// response key, flattening fragments and applying `@skip` and `@include`
/// (skip wins when both are present).
pub(crate) fn collect_fields<'a>(
    ctx: &'a ExecutionContext,
    object_type: &s::ObjectType,
    selection_sets: Vec<&'a q::SelectionSet>,
    visited_fragments: Option<HashSet<&'a str>>,
) -> IndexMap<&'a str, Vec<&'a q::Field>> {
    let mut visited_fragments = visited_fragments.unwrap_or_default();
    let mut grouped_fields: IndexMap<&str, Vec<&q::Field>> = IndexMap::new();

    for selection_set in selection_sets {
        // Only consider selections that are not skipped and are included
        let selections = selection_set
            .items
            .iter()
            .filter(|selection| !qast::skip_selection(selection, &ctx.variables))
            .filter(|selection| qast::include_selection(selection, &ctx.variables));

        for selection in selections {
            match selection {
                q::Selection::Field(field) => {
                    grouped_fields
                        .entry(field.response_key())
                        .or_default()
                        .push(field);
                }

                q::Selection::FragmentSpread(spread) => {
                    // A fragment spread twice in one selection set only
                    // applies once
                    if !visited_fragments.insert(&spread.fragment_name) {
                        continue;
                    }
                    let fragment = match ctx.fragment(&spread.fragment_name) {
                        Some(fragment) => fragment,
                        None => continue,
                    };
                    if !does_fragment_type_apply(ctx, object_type, Some(&fragment.type_condition))
                    {
                        continue;
                    }
                    let fragment_groups = collect_fields(
                        ctx,
                        object_type,
                        vec![&fragment.selection_set],
                        Some(visited_fragments.clone()),
                    );
                    for (response_key, mut group) in fragment_groups {
                        grouped_fields
                            .entry(response_key)
                            .or_default()
                            .append(&mut group);
                    }
                }

                q::Selection::InlineFragment(fragment) => {
                    if !does_fragment_type_apply(ctx, object_type, fragment.type_condition.as_ref())
                    {
                        continue;
                    }
                    let fragment_groups = collect_fields(
                        ctx,
                        object_type,
                        vec![&fragment.selection_set],
                        Some(visited_fragments.clone()),
                    );
                    for (response_key, mut group) in fragment_groups {
                        grouped_fields
                            .entry(response_key)
                            .or_default()
                            .append(&mut group);
                    }
                }
            }
        }
    }

    grouped_fields
}

/// Whether a fragment's type condition matches the given concrete type.
fn does_fragment_type_apply(
    ctx: &ExecutionContext,
    object_type: &s::ObjectType,
    condition: Option<&q::TypeCondition>,
) -> bool {
    let name = match condition {
        None => return true,
        Some(q::TypeCondition::On(name)) => name,
    };
    match ctx.schema.get_named_type(name) {
        Some(s::TypeDefinition::Object(ot)) => object_type.name == ot.name,
        Some(s::TypeDefinition::Interface(it)) => {
            object_type.implements_interfaces.contains(&it.name)
        }
        Some(s::TypeDefinition::Union(ut)) => ut.types.contains(&object_type.name),
        _ => false,
    }
}

/// Executes the grouped fields of one object value. Sibling fields resolve
/// concurrently unless `serial` is set (mutation roots). Returns the
/// response object or the propagation signal when a non-null field failed.
pub(crate) fn execute_selection_set<'a>(
    ctx: &'a ExecutionContext,
    selection_sets: Vec<&'a q::SelectionSet>,
    object_type: &'a s::ObjectType,
    object_value: &'a Value,
    serial: bool,
) -> BoxFuture<'a, Result<Value, PropagateNull>> {
    async move {
        let grouped_field_set = collect_fields(ctx, object_type, selection_sets, None);

        let mut result_map = Object::new();
        let mut propagate = false;

        if serial {
            // Mutation roots: each field group completes, including nested
            // selection sets, before the next begins
            for (response_key, fields) in grouped_field_set {
                match execute_field_group(ctx, object_type, object_value, response_key, &fields)
                    .await
                {
                    Ok(Some(value)) => {
                        result_map.insert(response_key.to_owned(), value);
                    }
                    Ok(None) => {}
                    Err(PropagateNull) => propagate = true,
                }
            }
        } else {
            let futures = grouped_field_set
                .into_iter()
                .map(|(response_key, fields)| async move {
                    let value =
                        execute_field_group(ctx, object_type, object_value, response_key, &fields)
                            .await;
                    (response_key, value)
                });
            for (response_key, value) in join_all(futures).await {
                match value {
                    Ok(Some(value)) => {
                        result_map.insert(response_key.to_owned(), value);
                    }
                    Ok(None) => {}
                    Err(PropagateNull) => propagate = true,
                }
            }
        }

        if propagate {
            Err(PropagateNull)
        } else {
            Ok(Value::Object(result_map))
        }
    }
    .boxed()
}

/// Resolves one response key of an object. `Ok(None)` means the key is
/// omitted from the result (disabled introspection).
async fn execute_field_group(
    ctx: &ExecutionContext,
    object_type: &s::ObjectType,
    object_value: &Value,
    response_key: &str,
    fields: &[&q::Field],
) -> Result<Option<Value>, PropagateNull> {
    let field = fields[0];
    let ctx = ctx.down(PathSegment::Field(response_key.to_owned()));

    // Meta fields never reach user resolvers
    if field.name == "__typename" {
        return Ok(Some(Value::String(object_type.name.clone())));
    }

    let binding = match ctx.schema.bound.field(&object_type.name, &field.name) {
        Some(binding) => binding.clone(),
        None => {
            ctx.record(QueryExecutionError::UnknownField(
                field.position,
                object_type.name.clone(),
                field.name.clone(),
            ));
            return Err(PropagateNull);
        }
    };

    if !ctx.schema.bound.has_resolvers {
        ctx.record(QueryExecutionError::SchemaWithoutResolvers);
        return Err(PropagateNull);
    }

    // Once cancelled, no further field tasks launch; already-resolved
    // siblings keep their partial data
    if ctx.ctx.is_cancelled() {
        ctx.report_cancellation();
        return if sast::is_non_null_type(&binding.field.field_type) {
            Err(PropagateNull)
        } else {
            Ok(Some(Value::Null))
        };
    }

    execute_field(&ctx, object_value, field, binding.as_ref(), fields)
        .await
        .map(Some)
}

/// Packs arguments, dispatches the resolver and completes the value.
async fn execute_field(
    ctx: &ExecutionContext,
    object_value: &Value,
    field: &q::Field,
    binding: &FieldBinding,
    fields: &[&q::Field],
) -> Result<Value, PropagateNull> {
    let args = match binding.packer {
        None => Object::new(),
        Some(packer) => {
            match ctx
                .schema
                .bound
                .packers
                .pack_arguments(packer, &field.arguments, &ctx.variables)
            {
                Ok(args) => args,
                Err(reason) => {
                    ctx.record(QueryExecutionError::PackingError(field.position, reason));
                    return Err(PropagateNull);
                }
            }
        }
    };

    let finish = if binding.is_trivial {
        None
    } else {
        Some(ctx.schema.options.tracer.trace_field(
            &binding.trace_label,
            &binding.parent_type,
            &field.name,
            &args,
        ))
    };

    let resolved = match &binding.resolver {
        FieldResolverKind::MemberRead => Ok(object_value
            .get(&field.name)
            .cloned()
            .unwrap_or(Value::Null)),
        FieldResolverKind::Registered(resolver) => {
            // The parallelism permit covers only the resolver call; value
            // completion below recurses and must not hold it
            let _permit = match &ctx.semaphore {
                Some(semaphore) => Some(
                    semaphore
                        .clone()
                        .acquire_owned()
                        .await
                        .expect("field semaphore is never closed"),
                ),
                None => None,
            };
            resolver(FieldContext {
                ctx: ctx.ctx.clone(),
                parent: object_value.clone(),
                args,
            })
            .await
        }
    };

    let result = match resolved {
        Err(resolver_error) => {
            let recorded = ctx.record(QueryExecutionError::ResolverError {
                position: field.position,
                message: resolver_error.message,
                extensions: resolver_error.extensions,
            });
            if let Some(finish) = finish {
                finish(&[recorded]);
            }
            // The resolver error is the only entry for this chain; null
            // bubbles from here without a got-nil error
            return if sast::is_non_null_type(&binding.field.field_type) {
                Err(PropagateNull)
            } else {
                Ok(Value::Null)
            };
        }
        Ok(value) => {
            complete_value(ctx, field, &binding.field.field_type, fields, value).await
        }
    };

    if let Some(finish) = finish {
        // Attribute the errors recorded at or below this field's path
        let own_errors: Vec<QueryError> = ctx
            .errors
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.path.starts_with(&ctx.path))
            .cloned()
            .collect();
        finish(&own_errors);
    }
    result
}

/// Ensures a resolved value matches the field type, recursing into lists
/// and objects. The heart of null propagation.
pub(crate) fn complete_value<'a>(
    ctx: &'a ExecutionContext,
    field: &'a q::Field,
    field_type: &'a q::Type,
    fields: &'a [&'a q::Field],
    resolved_value: Value,
) -> BoxFuture<'a, Result<Value, PropagateNull>> {
    async move {
        match field_type {
            q::Type::NonNullType(inner_type) => {
                let completed =
                    complete_value_inner(ctx, field, inner_type, fields, resolved_value).await?;
                if completed.is_null() {
                    ctx.record(QueryExecutionError::NonNullError(
                        field.position,
                        inner_type.to_string(),
                    ));
                    Err(PropagateNull)
                } else {
                    Ok(completed)
                }
            }
            nullable => {
                // The nearest nullable boundary absorbs propagation
                match complete_value_inner(ctx, field, nullable, fields, resolved_value).await {
                    Ok(value) => Ok(value),
                    Err(PropagateNull) => Ok(Value::Null),
                }
            }
        }
    }
    .boxed()
}

async fn complete_value_inner(
    ctx: &ExecutionContext,
    field: &q::Field,
    field_type: &q::Type,
    fields: &[&q::Field],
    resolved_value: Value,
) -> Result<Value, PropagateNull> {
    if resolved_value.is_null() {
        return Ok(Value::Null);
    }

    match field_type {
        q::Type::NonNullType(_) => unreachable!("unwrapped by complete_value"),

        q::Type::ListType(inner_type) => {
            let values = match resolved_value {
                Value::List(values) => values,
                _ => {
                    ctx.record(QueryExecutionError::ListValueError(
                        field.position,
                        field.name.clone(),
                    ));
                    return Err(PropagateNull);
                }
            };
            let futures = values.into_iter().enumerate().map(|(index, value)| {
                let ctx = ctx.down(PathSegment::Index(index));
                async move { complete_value(&ctx, field, inner_type, fields, value).await }
            });
            let mut out = Vec::new();
            let mut propagate = false;
            for completed in join_all(futures).await {
                match completed {
                    Ok(value) => out.push(value),
                    // A non-null element failed; the list itself bubbles
                    Err(PropagateNull) => propagate = true,
                }
            }
            if propagate {
                Err(PropagateNull)
            } else {
                Ok(Value::List(out))
            }
        }

        q::Type::NamedType(name) => {
            let named_type = match ctx.schema.get_named_type(name) {
                Some(named_type) => named_type,
                None => {
                    ctx.record(QueryExecutionError::NamedTypeError(name.clone()));
                    return Err(PropagateNull);
                }
            };
            match named_type {
                s::TypeDefinition::Scalar(scalar_type) => {
                    match resolved_value.coerce(scalar_type) {
                        Some(value) => Ok(value),
                        None => {
                            ctx.record(QueryExecutionError::ScalarCoercionError(
                                field.position,
                                resolved_value,
                                scalar_type.name.clone(),
                            ));
                            Err(PropagateNull)
                        }
                    }
                }

                s::TypeDefinition::Enum(enum_type) => match resolved_value.coerce(enum_type) {
                    Some(value) => Ok(value),
                    None => {
                        ctx.record(QueryExecutionError::EnumCoercionError(
                            field.position,
                            resolved_value,
                            enum_type.name.clone(),
                        ));
                        Err(PropagateNull)
                    }
                },

                s::TypeDefinition::Object(object_type) => {
                    execute_selection_set(
                        ctx,
                        fields.iter().map(|f| &f.selection_set).collect(),
                        object_type,
                        &resolved_value,
                        false,
                    )
                    .await
                }

                s::TypeDefinition::Interface(_) | s::TypeDefinition::Union(_) => {
                    let object_type =
                        resolve_abstract_type(ctx, field, named_type, &resolved_value)?;
                    execute_selection_set(
                        ctx,
                        fields.iter().map(|f| &f.selection_set).collect(),
                        object_type,
                        &resolved_value,
                        false,
                    )
                    .await
                }

                s::TypeDefinition::InputObject(_) => {
                    ctx.record(QueryExecutionError::NamedTypeError(name.clone()));
                    Err(PropagateNull)
                }
            }
        }
    }
}

/// Selects the concrete object type of an abstract-typed value: the
/// registered type assertion first, the value's own `__typename` otherwise.
fn resolve_abstract_type<'a>(
    ctx: &'a ExecutionContext,
    field: &q::Field,
    abstract_type: &s::TypeDefinition,
    object_value: &Value,
) -> Result<&'a s::ObjectType, PropagateNull> {
    let abstract_name = abstract_type.name();
    let concrete = match ctx.schema.bound.asserters.get(abstract_name) {
        Some(asserter) => asserter(object_value),
        None => object_value
            .get("__typename")
            .and_then(|v| v.as_str())
            .map(str::to_owned),
    };
    let concrete = match concrete {
        Some(concrete) => concrete,
        None => {
            ctx.record(QueryExecutionError::AbstractTypeError(
                field.position,
                abstract_name.clone(),
            ));
            return Err(PropagateNull);
        }
    };
    match ctx.schema.object_type(&concrete) {
        Some(object_type) => Ok(object_type),
        None => {
            ctx.record(QueryExecutionError::UnknownConcreteTypeError(
                field.position,
                concrete,
                abstract_name.clone(),
            ));
            Err(PropagateNull)
        }
    }
}

/// Coerces the caller-supplied variable values against the operation's
/// variable definitions.
pub(crate) fn coerce_variable_values(
    schema: &Schema,
    variable_definitions: &[q::VariableDefinition],
    variables: &Option<QueryVariables>,
) -> Result<HashMap<String, Value>, Vec<QueryExecutionError>> {
    let mut coerced_values = HashMap::new();
    let mut errors = vec![];

    for variable_def in variable_definitions {
        let value = variables
            .as_ref()
            .and_then(|vars| vars.get(&variable_def.name))
            .cloned();

        let value = match value {
            Some(value) => value,
            None => match &variable_def.default_value {
                Some(default) => Value::try_from(default.clone())
                    .expect("variable defaults contain no variables"),
                None => {
                    if sast::is_non_null_type(&variable_def.var_type) {
                        errors.push(QueryExecutionError::VariableCoercionError(
                            variable_def.position,
                            variable_def.name.clone(),
                            "null".to_owned(),
                            format!("Expected type \"{}\", found null.", variable_def.var_type),
                        ));
                    }
                    continue;
                }
            },
        };

        let resolver = |name: &str| schema.get_named_type(name);
        match coercion::coerce_value(&value, &variable_def.var_type, &resolver) {
            Ok(coerced) => {
                coerced_values.insert(variable_def.name.clone(), coerced);
            }
            Err(reason) => errors.push(QueryExecutionError::VariableCoercionError(
                variable_def.position,
                variable_def.name.clone(),
                value.found(),
                reason,
            )),
        }
    }

    if errors.is_empty() {
        Ok(coerced_values)
    } else {
        Err(errors)
    }
}
