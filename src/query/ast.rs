//! Helper functions for working with executable-document ASTs.

use std::collections::HashMap;

use crate::ast::query::*;
use crate::data::error::QueryExecutionError;
use crate::data::value as r;

/// The three executable operation kinds. Shorthand `{ ... }` documents
/// count as queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// A kind-agnostic view of an operation. The four `OperationDefinition`
/// variants carry the same payload in different shapes; the request
/// pipeline only ever needs this flattened form.
#[derive(Clone, Copy, Debug)]
pub struct OperationParts<'a> {
    pub kind: OperationKind,
    pub name: Option<&'a str>,
    pub variable_definitions: &'a [VariableDefinition],
    pub selection_set: &'a SelectionSet,
}

/// Flattens an operation into its [`OperationParts`].
pub fn parts(operation: &OperationDefinition) -> OperationParts<'_> {
    match operation {
        OperationDefinition::SelectionSet(set) => OperationParts {
            kind: OperationKind::Query,
            name: None,
            variable_definitions: &[],
            selection_set: set,
        },
        OperationDefinition::Query(op) => OperationParts {
            kind: OperationKind::Query,
            name: op.name.as_deref(),
            variable_definitions: &op.variable_definitions,
            selection_set: &op.selection_set,
        },
        OperationDefinition::Mutation(op) => OperationParts {
            kind: OperationKind::Mutation,
            name: op.name.as_deref(),
            variable_definitions: &op.variable_definitions,
            selection_set: &op.selection_set,
        },
        OperationDefinition::Subscription(op) => OperationParts {
            kind: OperationKind::Subscription,
            name: op.name.as_deref(),
            variable_definitions: &op.variable_definitions,
            selection_set: &op.selection_set,
        },
    }
}

/// Selects the operation to execute: the named one, or the document's only
/// operation when the request names none. A document without operations is
/// an empty query; several unnamed candidates need a name to pick between.
pub fn find_operation<'a>(
    document: &'a Document,
    name: Option<&str>,
) -> Result<&'a OperationDefinition, QueryExecutionError> {
    let mut operations = document.definitions.iter().filter_map(|def| match def {
        Definition::Operation(op) => Some(op),
        Definition::Fragment(_) => None,
    });

    match name {
        Some(wanted) => operations
            .find(|op| parts(op).name == Some(wanted))
            .ok_or_else(|| QueryExecutionError::OperationNotFound(wanted.to_owned())),
        None => {
            let only = operations.next().ok_or(QueryExecutionError::EmptyQuery)?;
            if operations.next().is_some() {
                return Err(QueryExecutionError::OperationNameRequired);
            }
            Ok(only)
        }
    }
}

/// Returns all fragments of the document, keyed by name.
pub fn get_fragments(document: &Document) -> HashMap<&str, &FragmentDefinition> {
    document
        .definitions
        .iter()
        .filter_map(|d| match d {
            Definition::Fragment(fd) => Some((fd.name.as_str(), fd)),
            _ => None,
        })
        .collect()
}

/// Looks up a directive on a selection, if it is provided.
pub fn get_directive<'a>(selection: &'a Selection, name: &str) -> Option<&'a Directive> {
    let directives = match selection {
        Selection::Field(field) => &field.directives,
        Selection::FragmentSpread(spread) => &spread.directives,
        Selection::InlineFragment(fragment) => &fragment.directives,
    };
    directives.iter().find(|directive| directive.name == name)
}

fn directive_if_value(
    selection: &Selection,
    directive_name: &str,
    variables: &HashMap<String, r::Value>,
) -> Option<bool> {
    let directive = get_directive(selection, directive_name)?;
    let condition = directive
        .arguments
        .iter()
        .find(|(name, _)| name == "if")
        .map(|(_, value)| value)?;
    match condition {
        Value::Boolean(b) => Some(*b),
        Value::Variable(name) => match variables.get(name) {
            Some(r::Value::Boolean(b)) => Some(*b),
            _ => Some(false),
        },
        _ => None,
    }
}

/// Returns true if a selection should be skipped (as per the `@skip`
/// directive). A `@skip` without an `if` argument skips.
pub fn skip_selection(selection: &Selection, variables: &HashMap<String, r::Value>) -> bool {
    match get_directive(selection, "skip") {
        None => false,
        Some(_) => directive_if_value(selection, "skip", variables).unwrap_or(true),
    }
}

/// Returns true if a selection should be included (as per the `@include`
/// directive). `@skip` wins when both are present; callers apply both.
pub fn include_selection(selection: &Selection, variables: &HashMap<String, r::Value>) -> bool {
    match get_directive(selection, "include") {
        None => true,
        Some(_) => directive_if_value(selection, "include", variables).unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;

    fn first_selection(document: &Document) -> &Selection {
        match &document.definitions[0] {
            Definition::Operation(op) => &parts(op).selection_set.items[0],
            _ => panic!("expected an operation"),
        }
    }

    #[test]
    fn finds_operations_by_name() {
        let document = parse_query(
            "query First { hello }
             mutation Second { inc }",
        )
        .unwrap();
        assert_eq!(
            parts(find_operation(&document, Some("Second")).unwrap()).kind,
            OperationKind::Mutation
        );
        assert_eq!(
            find_operation(&document, Some("Third")).unwrap_err(),
            QueryExecutionError::OperationNotFound("Third".to_owned())
        );
        assert_eq!(
            find_operation(&document, None).unwrap_err(),
            QueryExecutionError::OperationNameRequired
        );
    }

    #[test]
    fn an_unnamed_single_operation_is_found_without_a_name() {
        let document = parse_query("{ hello }").unwrap();
        let operation = parts(find_operation(&document, None).unwrap());
        assert_eq!(operation.kind, OperationKind::Query);
        assert_eq!(operation.name, None);
    }

    #[test]
    fn skip_wins_over_include() {
        let document = parse_query("{ hello @skip(if: true) @include(if: true) }").unwrap();
        let selection = first_selection(&document);
        let variables = HashMap::new();
        assert!(skip_selection(selection, &variables));
        assert!(include_selection(selection, &variables));
    }

    #[test]
    fn directive_conditions_read_variables() {
        let document = parse_query("{ hello @skip(if: $flag) }").unwrap();
        let selection = first_selection(&document);
        let mut variables = HashMap::new();
        variables.insert("flag".to_owned(), r::Value::Boolean(true));
        assert!(skip_selection(selection, &variables));
        variables.insert("flag".to_owned(), r::Value::Boolean(false));
        assert!(!skip_selection(selection, &variables));
    }

    #[test]
    fn response_keys_prefer_aliases() {
        let document = parse_query("{ renamed: hello plain }").unwrap();
        let operation = parts(find_operation(&document, None).unwrap());
        let keys: Vec<&str> = operation
            .selection_set
            .items
            .iter()
            .filter_map(|selection| match selection {
                Selection::Field(field) => Some(field.response_key()),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec!["renamed", "plain"]);
    }
}
