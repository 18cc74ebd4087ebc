//! Helper functions for working with schema ASTs.

use crate::ast::query as q;
use crate::ast::schema as s;

/// An object or interface type; the two places fields live.
#[derive(Copy, Clone, Debug)]
pub enum ObjectOrInterface<'a> {
    Object(&'a s::ObjectType),
    Interface(&'a s::InterfaceType),
}

impl<'a> From<&'a s::ObjectType> for ObjectOrInterface<'a> {
    fn from(object: &'a s::ObjectType) -> Self {
        ObjectOrInterface::Object(object)
    }
}

impl<'a> From<&'a s::InterfaceType> for ObjectOrInterface<'a> {
    fn from(interface: &'a s::InterfaceType) -> Self {
        ObjectOrInterface::Interface(interface)
    }
}

impl<'a> ObjectOrInterface<'a> {
    pub fn name(self) -> &'a str {
        match self {
            ObjectOrInterface::Object(object) => &object.name,
            ObjectOrInterface::Interface(interface) => &interface.name,
        }
    }

    pub fn fields(self) -> &'a [s::Field] {
        match self {
            ObjectOrInterface::Object(object) => &object.fields,
            ObjectOrInterface::Interface(interface) => &interface.fields,
        }
    }
}

/// Returns the type definition with the given name from a document.
pub fn get_named_type<'a>(schema: &'a s::Document, name: &str) -> Option<&'a s::TypeDefinition> {
    schema
        .definitions
        .iter()
        .filter_map(|d| match d {
            s::Definition::TypeDefinition(typedef) => Some(typedef),
            _ => None,
        })
        .find(|typedef| typedef.name() == name)
}

/// Returns all type definitions in the document.
pub fn get_type_definitions(schema: &s::Document) -> Vec<&s::TypeDefinition> {
    schema
        .definitions
        .iter()
        .filter_map(|d| match d {
            s::Definition::TypeDefinition(typedef) => Some(typedef),
            _ => None,
        })
        .collect()
}

/// Returns all object type definitions in the document.
pub fn get_object_type_definitions(schema: &s::Document) -> Vec<&s::ObjectType> {
    schema
        .definitions
        .iter()
        .filter_map(|d| match d {
            s::Definition::TypeDefinition(s::TypeDefinition::Object(t)) => Some(t),
            _ => None,
        })
        .collect()
}

/// Returns the `schema { ... }` block of the document, if present.
pub fn get_schema_definition(schema: &s::Document) -> Option<&s::SchemaDefinition> {
    schema.definitions.iter().find_map(|d| match d {
        s::Definition::SchemaDefinition(sd) => Some(sd),
        _ => None,
    })
}

/// Returns all directive definitions in the document.
pub fn get_directive_definitions(schema: &s::Document) -> Vec<&s::DirectiveDefinition> {
    schema
        .definitions
        .iter()
        .filter_map(|d| match d {
            s::Definition::DirectiveDefinition(dd) => Some(dd),
            _ => None,
        })
        .collect()
}

/// Returns the field with the given name on an object or interface type.
pub fn get_field<'a>(
    object_type: impl Into<ObjectOrInterface<'a>>,
    name: &str,
) -> Option<&'a s::Field> {
    object_type.into().fields().iter().find(|f| f.name == name)
}

/// Looks up a directive on a list of directives, e.g. a field's.
pub fn get_directive<'a>(directives: &'a [s::Directive], name: &str) -> Option<&'a s::Directive> {
    directives.iter().find(|directive| directive.name == name)
}

/// Deprecation status of a field or enum value: `None` when not deprecated,
/// otherwise the reason (defaulted to "No longer supported").
pub fn get_deprecation(directives: &[s::Directive]) -> Option<String> {
    get_directive(directives, "deprecated").map(|directive| {
        directive
            .arguments
            .iter()
            .find(|(name, _)| name == "reason")
            .and_then(|(_, value)| match value {
                q::Value::String(reason) => Some(reason.clone()),
                _ => None,
            })
            .unwrap_or_else(|| "No longer supported".to_owned())
    })
}

pub fn is_non_null_type(ty: &q::Type) -> bool {
    matches!(ty, q::Type::NonNullType(_))
}

pub fn is_list_type(ty: &q::Type) -> bool {
    match ty {
        q::Type::ListType(_) => true,
        q::Type::NonNullType(inner) => is_list_type(inner),
        q::Type::NamedType(_) => false,
    }
}

/// Whether a type may appear in input position: scalar, enum, input object,
/// or wrappers thereof.
pub fn is_input_type(schema: &s::Document, ty: &q::Type) -> bool {
    is_input_type_by(ty, &|name| get_named_type(schema, name))
}

/// `is_input_type` against an arbitrary type lookup.
pub fn is_input_type_by<'a>(
    ty: &q::Type,
    resolver: &impl Fn(&str) -> Option<&'a s::TypeDefinition>,
) -> bool {
    match ty {
        q::Type::NamedType(name) => {
            matches!(
                resolver(name),
                Some(
                    s::TypeDefinition::Scalar(_)
                        | s::TypeDefinition::Enum(_)
                        | s::TypeDefinition::InputObject(_)
                )
            )
        }
        q::Type::ListType(inner) | q::Type::NonNullType(inner) => is_input_type_by(inner, resolver),
    }
}

/// The names of the built-in scalar types every schema carries.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}
