//! Type system validation: the invariants a schema must satisfy before it
//! can be bound and executed.

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::query as q;
use crate::ast::schema as s;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SchemaValidationError {
    #[error("Type \"{0}\" is defined more than once")]
    DuplicateTypeName(String),
    #[error("Type name \"{0}\" is reserved for introspection")]
    ReservedTypeName(String),
    #[error("Type \"{0}\" used by \"{1}\" is not defined")]
    UndefinedType(String, String),
    #[error("The schema must define a query root type")]
    NoQueryRoot,
    #[error("Root operation type \"{0}\" must be an Object type")]
    RootTypeNotObject(String),
    #[error("Type \"{0}\" implements \"{1}\" which is not an interface")]
    NotAnInterface(String, String),
    #[error("Type \"{0}\" must define field \"{2}\" of interface \"{1}\"")]
    InterfaceFieldMissing(String, String, String),
    #[error(
        "Field \"{2}\" of type \"{0}\" is not compatible with its declaration on interface \"{1}\""
    )]
    InterfaceFieldTypeMismatch(String, String, String),
    #[error("Field \"{2}\" of type \"{0}\" must accept argument \"{3}\" of interface \"{1}\"")]
    InterfaceFieldArgumentMissing(String, String, String, String),
    #[error("Member \"{1}\" of union \"{0}\" must be an Object type")]
    UnionMemberNotObject(String, String),
    #[error("Field \"{1}\" of input object \"{0}\" must be an input type")]
    InputFieldNotInputType(String, String),
    #[error("Argument \"{2}\" of \"{0}.{1}\" must be an input type")]
    ArgumentNotInputType(String, String, String),
}

/// Runs all type system checks against the interned type table.
pub(crate) fn validate_schema(
    types: &HashMap<String, s::TypeDefinition>,
) -> Vec<SchemaValidationError> {
    let mut errors = vec![];
    for typedef in types.values() {
        match typedef {
            s::TypeDefinition::Object(object) => {
                validate_field_types(types, &object.name, &object.fields, &mut errors);
                validate_interfaces(
                    types,
                    &object.name,
                    &object.implements_interfaces,
                    &object.fields,
                    &mut errors,
                );
            }
            s::TypeDefinition::Interface(interface) => {
                validate_field_types(types, &interface.name, &interface.fields, &mut errors);
                validate_interfaces(
                    types,
                    &interface.name,
                    &interface.implements_interfaces,
                    &interface.fields,
                    &mut errors,
                );
            }
            s::TypeDefinition::Union(union_type) => {
                for member in &union_type.types {
                    match types.get(member) {
                        None => errors.push(SchemaValidationError::UndefinedType(
                            member.clone(),
                            union_type.name.clone(),
                        )),
                        Some(s::TypeDefinition::Object(_)) => {}
                        Some(_) => errors.push(SchemaValidationError::UnionMemberNotObject(
                            union_type.name.clone(),
                            member.clone(),
                        )),
                    }
                }
            }
            s::TypeDefinition::InputObject(input_object) => {
                for field in &input_object.fields {
                    let base = field.value_type.get_base_type();
                    if types.get(base).is_none() {
                        errors.push(SchemaValidationError::UndefinedType(
                            base.clone(),
                            format!("{}.{}", input_object.name, field.name),
                        ));
                    } else if !is_input_type(types, &field.value_type) {
                        errors.push(SchemaValidationError::InputFieldNotInputType(
                            input_object.name.clone(),
                            field.name.clone(),
                        ));
                    }
                }
            }
            s::TypeDefinition::Scalar(_) | s::TypeDefinition::Enum(_) => {}
        }
    }
    errors
}

fn validate_field_types(
    types: &HashMap<String, s::TypeDefinition>,
    type_name: &str,
    fields: &[s::Field],
    errors: &mut Vec<SchemaValidationError>,
) {
    for field in fields {
        let base = field.field_type.get_base_type();
        if types.get(base).is_none() {
            errors.push(SchemaValidationError::UndefinedType(
                base.clone(),
                format!("{}.{}", type_name, field.name),
            ));
        }
        for argument in &field.arguments {
            let base = argument.value_type.get_base_type();
            if types.get(base).is_none() {
                errors.push(SchemaValidationError::UndefinedType(
                    base.clone(),
                    format!("{}.{}({}:)", type_name, field.name, argument.name),
                ));
            } else if !is_input_type(types, &argument.value_type) {
                errors.push(SchemaValidationError::ArgumentNotInputType(
                    type_name.to_owned(),
                    field.name.clone(),
                    argument.name.clone(),
                ));
            }
        }
    }
}

/// Checks that a type structurally satisfies the interfaces it declares:
/// every interface field appears with a matching or covariant type and every
/// interface argument is accepted.
fn validate_interfaces(
    types: &HashMap<String, s::TypeDefinition>,
    type_name: &str,
    implements: &[String],
    fields: &[s::Field],
    errors: &mut Vec<SchemaValidationError>,
) {
    for interface_name in implements {
        let interface = match types.get(interface_name) {
            None => {
                errors.push(SchemaValidationError::UndefinedType(
                    interface_name.clone(),
                    type_name.to_owned(),
                ));
                continue;
            }
            Some(s::TypeDefinition::Interface(interface)) => interface,
            Some(_) => {
                errors.push(SchemaValidationError::NotAnInterface(
                    type_name.to_owned(),
                    interface_name.clone(),
                ));
                continue;
            }
        };
        for interface_field in &interface.fields {
            let field = match fields.iter().find(|f| f.name == interface_field.name) {
                None => {
                    errors.push(SchemaValidationError::InterfaceFieldMissing(
                        type_name.to_owned(),
                        interface_name.clone(),
                        interface_field.name.clone(),
                    ));
                    continue;
                }
                Some(field) => field,
            };
            if !is_subtype(types, &field.field_type, &interface_field.field_type) {
                errors.push(SchemaValidationError::InterfaceFieldTypeMismatch(
                    type_name.to_owned(),
                    interface_name.clone(),
                    field.name.clone(),
                ));
            }
            for interface_argument in &interface_field.arguments {
                let matches = field.arguments.iter().any(|a| {
                    a.name == interface_argument.name
                        && a.value_type == interface_argument.value_type
                });
                if !matches {
                    errors.push(SchemaValidationError::InterfaceFieldArgumentMissing(
                        type_name.to_owned(),
                        interface_name.clone(),
                        field.name.clone(),
                        interface_argument.name.clone(),
                    ));
                }
            }
        }
    }
}

fn is_input_type(types: &HashMap<String, s::TypeDefinition>, ty: &q::Type) -> bool {
    match ty {
        q::Type::NamedType(name) => matches!(
            types.get(name),
            Some(
                s::TypeDefinition::Scalar(_)
                    | s::TypeDefinition::Enum(_)
                    | s::TypeDefinition::InputObject(_)
            )
        ),
        q::Type::ListType(inner) | q::Type::NonNullType(inner) => is_input_type(types, inner),
    }
}

/// Output-type covariance: `T` is a subtype of `U` when they are equal,
/// when `T!` wraps a subtype of `U`, when both are lists of subtypes, or
/// when `T` is an object implementing the interface `U` (or a member of the
/// union `U`).
fn is_subtype(
    types: &HashMap<String, s::TypeDefinition>,
    maybe_subtype: &q::Type,
    supertype: &q::Type,
) -> bool {
    match (maybe_subtype, supertype) {
        (q::Type::NonNullType(sub), q::Type::NonNullType(sup)) => is_subtype(types, sub, sup),
        // Non-null is assignable where nullable is expected
        (q::Type::NonNullType(sub), sup) => is_subtype(types, sub, sup),
        (q::Type::ListType(sub), q::Type::ListType(sup)) => is_subtype(types, sub, sup),
        (q::Type::NamedType(sub), q::Type::NamedType(sup)) => {
            if sub == sup {
                return true;
            }
            match (types.get(sub), types.get(sup)) {
                (Some(s::TypeDefinition::Object(object)), Some(s::TypeDefinition::Interface(_))) => {
                    object.implements_interfaces.contains(sup)
                }
                (Some(s::TypeDefinition::Object(_)), Some(s::TypeDefinition::Union(union_type))) => {
                    union_type.types.contains(sub)
                }
                _ => false,
            }
        }
        _ => false,
    }
}
