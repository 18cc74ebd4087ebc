/// The core executor: selection collection, field resolution and value
/// completion.
mod execution;

/// Request entry: parse, validate, coerce variables, run.
mod query;

pub(crate) use execution::{
    coerce_variable_values, collect_fields, complete_value, execute_selection_set,
    ExecutionContext, PropagateNull,
};
pub(crate) use query::execute_query;
