//! Validation of executable documents against a compiled schema.
//!
//! All rules run and every failure is reported; execution starts only on a
//! clean document. Each error carries the name of the rule that produced
//! it, its message and the source locations involved.

use std::collections::{HashMap, HashSet};

use crate::ast::query as q;
use crate::ast::schema as s;
use crate::ast::Pos;
use crate::data::error::QueryError;
use crate::query::ast as qast;
use crate::schema::ast as sast;
use crate::schema::Schema;
use crate::values::coercion;

pub const ARGUMENTS_OF_CORRECT_TYPE: &str = "ArgumentsOfCorrectType";
pub const VARIABLES_OF_CORRECT_TYPE: &str = "VariablesOfCorrectType";
pub const VARIABLES_ARE_INPUT_TYPES: &str = "VariablesAreInputTypes";
pub const NO_FRAGMENT_CYCLES: &str = "NoFragmentCycles";
pub const NO_UNDEFINED_VARIABLES: &str = "NoUndefinedVariables";
pub const KNOWN_TYPE_NAMES: &str = "KnownTypeNames";
pub const KNOWN_ARGUMENT_NAMES: &str = "KnownArgumentNames";
pub const KNOWN_FRAGMENT_NAMES: &str = "KnownFragmentNames";
pub const FIELDS_ON_CORRECT_TYPE: &str = "FieldsOnCorrectType";
pub const OVERLAPPING_FIELDS: &str = "OverlappingFieldsCanBeMerged";
pub const MAX_DEPTH_EXCEEDED: &str = "MaxDepthExceeded";

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    pub rule: &'static str,
    pub message: String,
    pub locations: Vec<Pos>,
}

impl ValidationError {
    fn new(rule: &'static str, message: String, locations: Vec<Pos>) -> Self {
        ValidationError {
            rule,
            message,
            locations,
        }
    }
}

impl From<ValidationError> for QueryError {
    fn from(e: ValidationError) -> Self {
        QueryError {
            message: e.message,
            locations: e.locations,
            path: vec![],
            rule: Some(e.rule),
            extensions: None,
        }
    }
}

/// Validates every operation and fragment of the document.
pub(crate) fn validate(schema: &Schema, document: &q::Document) -> Vec<ValidationError> {
    let mut ctx = ValidationContext {
        schema,
        fragments: qast::get_fragments(document),
        errors: vec![],
        depth_reported: false,
    };

    ctx.check_fragment_cycles();

    for definition in &document.definitions {
        if let q::Definition::Operation(operation) = definition {
            ctx.check_operation(operation);
        }
    }

    for fragment in ctx.fragments.clone().values() {
        let q::TypeCondition::On(type_name) = &fragment.type_condition;
        if ctx.schema.get_named_type(type_name).is_none() {
            ctx.errors.push(ValidationError::new(
                KNOWN_TYPE_NAMES,
                format!("Unknown type \"{}\".", type_name),
                vec![fragment.position],
            ));
        }
    }

    ctx.errors
}

struct ValidationContext<'a> {
    schema: &'a Schema,
    fragments: HashMap<&'a str, &'a q::FragmentDefinition>,
    errors: Vec<ValidationError>,
    depth_reported: bool,
}

impl<'a> ValidationContext<'a> {
    fn check_operation(&mut self, operation: &'a q::OperationDefinition) {
        let operation = qast::parts(operation);
        let root_type = match operation.kind {
            qast::OperationKind::Query => self.schema.query_type.clone(),
            // the executor reports unsupported operation kinds
            qast::OperationKind::Mutation => match &self.schema.mutation_type {
                Some(root) => root.clone(),
                None => return,
            },
            qast::OperationKind::Subscription => match &self.schema.subscription_type {
                Some(root) => root.clone(),
                None => return,
            },
        };

        let mut variables: HashMap<String, q::Type> = HashMap::new();
        for definition in operation.variable_definitions {
            if !sast::is_input_type_by(
                &definition.var_type,
                &|name| self.schema.get_named_type(name),
            ) {
                self.errors.push(ValidationError::new(
                    VARIABLES_ARE_INPUT_TYPES,
                    format!(
                        "Variable \"${}\" cannot be non-input type \"{}\".",
                        definition.name, definition.var_type
                    ),
                    vec![definition.position],
                ));
            }
            variables.insert(definition.name.clone(), definition.var_type.clone());
        }

        let mut used_variables: Vec<(String, Pos)> = vec![];
        self.check_selection_set(
            &root_type,
            operation.selection_set,
            &variables,
            &mut used_variables,
            1,
            &mut HashSet::new(),
        );

        let mut reported: HashSet<&str> = HashSet::new();
        for (name, pos) in &used_variables {
            if !variables.contains_key(name) && reported.insert(name) {
                self.errors.push(ValidationError::new(
                    NO_UNDEFINED_VARIABLES,
                    format!("Variable \"${}\" is not defined.", name),
                    vec![*pos],
                ));
            }
        }
    }

    fn check_selection_set(
        &mut self,
        parent_type: &str,
        selection_set: &'a q::SelectionSet,
        variables: &HashMap<String, q::Type>,
        used_variables: &mut Vec<(String, Pos)>,
        depth: usize,
        visited_fragments: &mut HashSet<&'a str>,
    ) {
        self.check_overlaps(selection_set);

        for selection in &selection_set.items {
            match selection {
                q::Selection::Field(field) => {
                    self.check_field(
                        parent_type,
                        field,
                        variables,
                        used_variables,
                        depth,
                        visited_fragments,
                    );
                }
                q::Selection::FragmentSpread(spread) => {
                    collect_directive_variables(&spread.directives, used_variables);
                    let fragment = match self.fragments.get(spread.fragment_name.as_str()) {
                        Some(fragment) => *fragment,
                        None => {
                            self.errors.push(ValidationError::new(
                                KNOWN_FRAGMENT_NAMES,
                                format!("Unknown fragment \"{}\".", spread.fragment_name),
                                vec![spread.position],
                            ));
                            continue;
                        }
                    };
                    if !visited_fragments.insert(fragment.name.as_str()) {
                        // a cycle; reported by its own rule
                        continue;
                    }
                    let q::TypeCondition::On(type_name) = &fragment.type_condition;
                    if self.schema.get_named_type(type_name).is_some() {
                        // spreads are followed without adding depth
                        self.check_selection_set(
                            type_name,
                            &fragment.selection_set,
                            variables,
                            used_variables,
                            depth,
                            visited_fragments,
                        );
                    }
                    visited_fragments.remove(fragment.name.as_str());
                }
                q::Selection::InlineFragment(fragment) => {
                    collect_directive_variables(&fragment.directives, used_variables);
                    let type_name = match &fragment.type_condition {
                        Some(q::TypeCondition::On(type_name)) => {
                            if self.schema.get_named_type(type_name).is_none() {
                                self.errors.push(ValidationError::new(
                                    KNOWN_TYPE_NAMES,
                                    format!("Unknown type \"{}\".", type_name),
                                    vec![fragment.position],
                                ));
                                continue;
                            }
                            type_name.as_str()
                        }
                        None => parent_type,
                    };
                    // inline fragments do not count against depth
                    self.check_selection_set(
                        type_name,
                        &fragment.selection_set,
                        variables,
                        used_variables,
                        depth,
                        visited_fragments,
                    );
                }
            }
        }
    }

    fn check_field(
        &mut self,
        parent_type: &str,
        field: &'a q::Field,
        variables: &HashMap<String, q::Type>,
        used_variables: &mut Vec<(String, Pos)>,
        depth: usize,
        visited_fragments: &mut HashSet<&'a str>,
    ) {
        for (_, value) in &field.arguments {
            collect_value_variables(value, field.position, used_variables);
        }
        collect_directive_variables(&field.directives, used_variables);

        if let Some(max_depth) = self.schema.options.max_depth {
            if depth > max_depth {
                if !self.depth_reported {
                    self.depth_reported = true;
                    self.errors.push(ValidationError::new(
                        MAX_DEPTH_EXCEEDED,
                        format!("The query exceeds the maximum depth of {}", max_depth),
                        vec![field.position],
                    ));
                }
                return;
            }
        }

        // Meta fields dispatch to introspection, never to user types
        if field.name == "__typename" {
            return;
        }
        if (field.name == "__schema" || field.name == "__type")
            && parent_type == self.schema.query_type
        {
            return;
        }

        // Copy the schema reference out of `self` so borrows of type data
        // survive the recursive calls below
        let schema: &'a Schema = self.schema;
        let parent = match schema.get_named_type(parent_type) {
            Some(parent) => parent,
            None => return,
        };
        let field_definition = match parent {
            s::TypeDefinition::Object(t) => sast::get_field(t, &field.name),
            s::TypeDefinition::Interface(t) => sast::get_field(t, &field.name),
            _ => None,
        };
        let field_definition = match field_definition {
            Some(definition) => definition,
            None => {
                self.errors.push(ValidationError::new(
                    FIELDS_ON_CORRECT_TYPE,
                    format!("Type \"{}\" has no field \"{}\"", parent_type, field.name),
                    vec![field.position],
                ));
                return;
            }
        };

        for (name, value) in &field.arguments {
            let argument_definition = field_definition
                .arguments
                .iter()
                .find(|a| &a.name == name);
            match argument_definition {
                None => self.errors.push(ValidationError::new(
                    KNOWN_ARGUMENT_NAMES,
                    format!(
                        "Unknown argument \"{}\" on field \"{}\" of type \"{}\".",
                        name, field.name, parent_type
                    ),
                    vec![field.position],
                )),
                Some(definition) => {
                    let resolver = |name: &str| schema.get_named_type(name);
                    if let Err(reason) = coercion::validate_literal(
                        value,
                        &definition.value_type,
                        &resolver,
                        variables,
                    ) {
                        self.errors.push(ValidationError::new(
                            ARGUMENTS_OF_CORRECT_TYPE,
                            format!(
                                "Argument \"{}\" has invalid value {}.\n{}",
                                name,
                                coercion::literal_found(value),
                                reason
                            ),
                            vec![field.position],
                        ));
                    }
                }
            }
        }

        if !field.selection_set.items.is_empty() {
            let base = field_definition.field_type.get_base_type();
            if schema.get_named_type(base).is_some() {
                self.check_selection_set(
                    base,
                    &field.selection_set,
                    variables,
                    used_variables,
                    depth + 1,
                    visited_fragments,
                );
            }
        }
    }

    /// Same response key must select the same field with the same
    /// arguments. Fragments are flattened into the scope they spread into.
    fn check_overlaps(&mut self, selection_set: &'a q::SelectionSet) {
        let mut seen: HashMap<&'a str, &'a q::Field> = HashMap::new();
        let mut fields: Vec<&'a q::Field> = vec![];
        collect_flat_fields(
            &self.fragments,
            selection_set,
            &mut fields,
            &mut HashSet::new(),
        );
        for field in fields {
            let key = field.response_key();
            match seen.get(key) {
                None => {
                    seen.insert(key, field);
                }
                Some(existing) => {
                    if existing.name != field.name {
                        self.errors.push(ValidationError::new(
                            OVERLAPPING_FIELDS,
                            format!(
                                "Fields \"{}\" conflict because \"{}\" and \"{}\" are different fields.",
                                key, existing.name, field.name
                            ),
                            vec![existing.position, field.position],
                        ));
                    } else if existing.arguments != field.arguments {
                        self.errors.push(ValidationError::new(
                            OVERLAPPING_FIELDS,
                            format!(
                                "Fields \"{}\" conflict because they have differing arguments.",
                                key
                            ),
                            vec![existing.position, field.position],
                        ));
                    }
                }
            }
        }
    }

    /// Detects spread chains that reach their own origin, reporting each
    /// cycle once. The error names the fragment whose spread closes the
    /// cycle and lists the spreads in between as the `via` chain, with the
    /// locations of every spread involved.
    fn check_fragment_cycles(&mut self) {
        let mut visited: HashSet<&'a str> = HashSet::new();
        let fragments = self.fragments.clone();
        let mut names: Vec<&&str> = fragments.keys().collect();
        names.sort();
        for name in names {
            if !visited.contains(*name) {
                let mut spread_path: Vec<&'a q::FragmentSpread> = vec![];
                let mut path_index: HashMap<&'a str, usize> = HashMap::new();
                self.detect_cycle_from(
                    fragments[*name],
                    &mut visited,
                    &mut spread_path,
                    &mut path_index,
                );
            }
        }
    }

    fn detect_cycle_from(
        &mut self,
        fragment: &'a q::FragmentDefinition,
        visited: &mut HashSet<&'a str>,
        spread_path: &mut Vec<&'a q::FragmentSpread>,
        path_index: &mut HashMap<&'a str, usize>,
    ) {
        visited.insert(fragment.name.as_str());
        path_index.insert(fragment.name.as_str(), spread_path.len());
        for spread in collect_spreads(&fragment.selection_set) {
            match path_index.get(spread.fragment_name.as_str()) {
                None => {
                    spread_path.push(spread);
                    if !visited.contains(spread.fragment_name.as_str()) {
                        if let Some(next) = self.fragments.get(spread.fragment_name.as_str()) {
                            let next = *next;
                            self.detect_cycle_from(next, visited, spread_path, path_index);
                        }
                    }
                    spread_path.pop();
                }
                Some(cycle_index) => {
                    let cycle: Vec<&q::FragmentSpread> = spread_path[*cycle_index..]
                        .iter()
                        .copied()
                        .chain(std::iter::once(spread))
                        .collect();
                    let via = cycle[..cycle.len() - 1]
                        .iter()
                        .map(|s| format!("\"{}\"", s.fragment_name))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let message = if via.is_empty() {
                        format!(
                            "Cannot spread fragment \"{}\" within itself.",
                            spread.fragment_name
                        )
                    } else {
                        format!(
                            "Cannot spread fragment \"{}\" within itself via {}.",
                            spread.fragment_name, via
                        )
                    };
                    let locations = cycle.iter().map(|s| s.position).collect();
                    self.errors
                        .push(ValidationError::new(NO_FRAGMENT_CYCLES, message, locations));
                }
            }
        }
        path_index.remove(fragment.name.as_str());
    }
}

fn collect_spreads<'a>(selection_set: &'a q::SelectionSet) -> Vec<&'a q::FragmentSpread> {
    let mut spreads = vec![];
    for selection in &selection_set.items {
        match selection {
            q::Selection::Field(field) => {
                spreads.extend(collect_spreads(&field.selection_set));
            }
            q::Selection::FragmentSpread(spread) => spreads.push(spread),
            q::Selection::InlineFragment(fragment) => {
                spreads.extend(collect_spreads(&fragment.selection_set));
            }
        }
    }
    spreads
}

fn collect_flat_fields<'a>(
    fragments: &HashMap<&'a str, &'a q::FragmentDefinition>,
    selection_set: &'a q::SelectionSet,
    out: &mut Vec<&'a q::Field>,
    visited: &mut HashSet<&'a str>,
) {
    for selection in &selection_set.items {
        match selection {
            q::Selection::Field(field) => out.push(field),
            q::Selection::FragmentSpread(spread) => {
                if let Some(fragment) = fragments.get(spread.fragment_name.as_str()) {
                    if visited.insert(fragment.name.as_str()) {
                        collect_flat_fields(fragments, &fragment.selection_set, out, visited);
                    }
                }
            }
            q::Selection::InlineFragment(fragment) => {
                collect_flat_fields(fragments, &fragment.selection_set, out, visited);
            }
        }
    }
}

fn collect_value_variables(value: &q::Value, pos: Pos, out: &mut Vec<(String, Pos)>) {
    match value {
        q::Value::Variable(name) => out.push((name.clone(), pos)),
        q::Value::List(items) => {
            for item in items {
                collect_value_variables(item, pos, out);
            }
        }
        q::Value::Object(fields) => {
            for value in fields.values() {
                collect_value_variables(value, pos, out);
            }
        }
        _ => {}
    }
}

fn collect_directive_variables(directives: &[q::Directive], out: &mut Vec<(String, Pos)>) {
    for directive in directives {
        for (_, value) in &directive.arguments {
            collect_value_variables(value, directive.position, out);
        }
    }
}
