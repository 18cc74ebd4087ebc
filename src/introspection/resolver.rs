//! Generation of the read-only views behind introspection, and the
//! resolvers that serve them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::ast::query as q;
use crate::ast::schema as s;
use crate::data::value::{Object, Value};
use crate::object;
use crate::resolvers::Resolvers;
use crate::schema::ast as sast;

type TypeObjectsMap = BTreeMap<String, Value>;

/// A named type reference is stored as a bare string and dereferenced when
/// a selection asks for it; wrapping types are nested objects.
fn type_ref(ty: &q::Type) -> Value {
    match ty {
        q::Type::NamedType(name) => Value::String(name.clone()),
        q::Type::ListType(inner) => object! {
            kind: Value::Enum(String::from("LIST")),
            ofType: type_ref(inner),
        },
        q::Type::NonNullType(inner) => object! {
            kind: Value::Enum(String::from("NON_NULL")),
            ofType: type_ref(inner),
        },
    }
}

fn description_value(description: &Option<String>) -> Value {
    match description {
        Some(d) => Value::String(d.clone()),
        None => Value::Null,
    }
}

fn deprecation_values(directives: &[s::Directive]) -> (Value, Value) {
    match sast::get_deprecation(directives) {
        Some(reason) => (Value::Boolean(true), Value::String(reason)),
        None => (Value::Boolean(false), Value::Null),
    }
}

fn input_value_object(value: &s::InputValue) -> Value {
    object! {
        name: value.name.clone(),
        description: description_value(&value.description),
        type: type_ref(&value.value_type),
        defaultValue: value
            .default_value
            .as_ref()
            .map_or(Value::Null, |default| Value::String(format!("{}", default))),
    }
}

fn field_object(field: &s::Field) -> Value {
    let (is_deprecated, deprecation_reason) = deprecation_values(&field.directives);
    object! {
        name: field.name.clone(),
        description: description_value(&field.description),
        args: Value::List(field.arguments.iter().map(input_value_object).collect()),
        type: type_ref(&field.field_type),
        isDeprecated: is_deprecated,
        deprecationReason: deprecation_reason,
    }
}

fn enum_value_object(value: &s::EnumValue) -> Value {
    let (is_deprecated, deprecation_reason) = deprecation_values(&value.directives);
    object! {
        name: value.name.clone(),
        description: description_value(&value.description),
        isDeprecated: is_deprecated,
        deprecationReason: deprecation_reason,
    }
}

fn specified_by_url(scalar: &s::ScalarType) -> Value {
    sast::get_directive(&scalar.directives, "specifiedBy")
        .and_then(|directive| {
            directive
                .arguments
                .iter()
                .find(|(name, _)| name == "url")
                .and_then(|(_, value)| match value {
                    q::Value::String(url) => Some(Value::String(url.clone())),
                    _ => None,
                })
        })
        .unwrap_or(Value::Null)
}

fn type_definition_object(
    typedef: &s::TypeDefinition,
    types_for_interface: &BTreeMap<String, Vec<String>>,
) -> Value {
    match typedef {
        s::TypeDefinition::Scalar(scalar_type) => object! {
            kind: Value::Enum(String::from("SCALAR")),
            name: scalar_type.name.clone(),
            description: description_value(&scalar_type.description),
            specifiedByURL: specified_by_url(scalar_type),
        },
        s::TypeDefinition::Object(object_type) => object! {
            kind: Value::Enum(String::from("OBJECT")),
            name: object_type.name.clone(),
            description: description_value(&object_type.description),
            fields: Value::List(object_type.fields.iter().map(field_object).collect()),
            interfaces: Value::List(
                object_type
                    .implements_interfaces
                    .iter()
                    .map(|name| Value::String(name.clone()))
                    .collect(),
            ),
        },
        s::TypeDefinition::Interface(interface_type) => object! {
            kind: Value::Enum(String::from("INTERFACE")),
            name: interface_type.name.clone(),
            description: description_value(&interface_type.description),
            fields: Value::List(interface_type.fields.iter().map(field_object).collect()),
            interfaces: Value::List(
                interface_type
                    .implements_interfaces
                    .iter()
                    .map(|name| Value::String(name.clone()))
                    .collect(),
            ),
            possibleTypes: Value::List(
                types_for_interface
                    .get(&interface_type.name)
                    .map(|implementors| {
                        implementors
                            .iter()
                            .map(|name| Value::String(name.clone()))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
        },
        s::TypeDefinition::Union(union_type) => object! {
            kind: Value::Enum(String::from("UNION")),
            name: union_type.name.clone(),
            description: description_value(&union_type.description),
            possibleTypes: Value::List(
                union_type
                    .types
                    .iter()
                    .map(|name| Value::String(name.clone()))
                    .collect(),
            ),
        },
        s::TypeDefinition::Enum(enum_type) => object! {
            kind: Value::Enum(String::from("ENUM")),
            name: enum_type.name.clone(),
            description: description_value(&enum_type.description),
            enumValues: Value::List(enum_type.values.iter().map(enum_value_object).collect()),
        },
        s::TypeDefinition::InputObject(input_object_type) => object! {
            kind: Value::Enum(String::from("INPUT_OBJECT")),
            name: input_object_type.name.clone(),
            description: description_value(&input_object_type.description),
            inputFields: Value::List(
                input_object_type
                    .fields
                    .iter()
                    .map(input_value_object)
                    .collect(),
            ),
        },
    }
}

fn directive_object(directive: &s::DirectiveDefinition) -> Value {
    object! {
        name: directive.name.clone(),
        description: description_value(&directive.description),
        locations: Value::List(
            directive
                .locations
                .iter()
                .map(|location| Value::Enum(location.as_str().to_owned()))
                .collect(),
        ),
        args: Value::List(directive.arguments.iter().map(input_value_object).collect()),
        isRepeatable: directive.repeatable,
    }
}

/// Dereferences a stored type reference through the type objects map.
fn deref_type(map: &TypeObjectsMap, value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(name)) => map.get(name).cloned().unwrap_or(Value::Null),
        Some(other) => other.clone(),
    }
}

fn deref_type_list(map: &TypeObjectsMap, value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(Value::List(items)) => Value::List(
            items
                .iter()
                .map(|item| deref_type(map, Some(item)))
                .collect(),
        ),
        Some(_) => Value::Null,
    }
}

fn filter_deprecated(value: Option<&Value>, include_deprecated: bool) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(Value::List(items)) => Value::List(
            items
                .iter()
                .filter(|item| {
                    include_deprecated
                        || item.get("isDeprecated").and_then(Value::as_bool) != Some(true)
                })
                .cloned()
                .collect(),
        ),
        Some(_) => Value::Null,
    }
}

/// Builds the resolver registry of the meta schema: read-only views of the
/// user schema plus the handful of fields that need arguments or lazy
/// dereferencing. Everything else is a member read.
pub(crate) fn introspection_resolvers(
    types: &HashMap<String, s::TypeDefinition>,
    directives: &[s::DirectiveDefinition],
    types_for_interface: &BTreeMap<String, Vec<String>>,
    query_type: &str,
    mutation_type: Option<&str>,
    subscription_type: Option<&str>,
) -> Resolvers {
    // The meta types list themselves in `__schema.types`
    let meta_document = crate::parser::parse_schema(super::META_SCHEMA)
        .expect("the introspection schema parses");

    let mut type_objects: TypeObjectsMap = BTreeMap::new();
    for typedef in types.values() {
        type_objects.insert(
            typedef.name().clone(),
            type_definition_object(typedef, types_for_interface),
        );
    }
    for typedef in sast::get_type_definitions(&meta_document) {
        if typedef.name() == "Query" {
            continue;
        }
        type_objects.insert(
            typedef.name().clone(),
            type_definition_object(typedef, types_for_interface),
        );
    }

    let schema_object = object! {
        description: Value::Null,
        queryType: type_objects.get(query_type).cloned().unwrap_or(Value::Null),
        mutationType: mutation_type
            .and_then(|name| type_objects.get(name).cloned())
            .unwrap_or(Value::Null),
        subscriptionType: subscription_type
            .and_then(|name| type_objects.get(name).cloned())
            .unwrap_or(Value::Null),
        types: Value::List(type_objects.values().cloned().collect()),
        directives: Value::List(directives.iter().map(directive_object).collect()),
    };

    let type_objects = Arc::new(type_objects);

    let by_name = type_objects.clone();
    let of_type = type_objects.clone();
    let interfaces = type_objects.clone();
    let possible = type_objects.clone();
    let field_type = type_objects.clone();
    let input_type = type_objects.clone();

    Resolvers::new()
        .field_fn("Query", "__schema", move |_| Ok(schema_object.clone()))
        .field_fn("Query", "__type", move |ctx| {
            Ok(ctx
                .arg("name")
                .and_then(Value::as_str)
                .and_then(|name| by_name.get(name).cloned())
                .unwrap_or(Value::Null))
        })
        .field_fn("__Type", "ofType", move |ctx| {
            Ok(deref_type(&of_type, ctx.parent.get("ofType")))
        })
        .field_fn("__Type", "interfaces", move |ctx| {
            Ok(deref_type_list(&interfaces, ctx.parent.get("interfaces")))
        })
        .field_fn("__Type", "possibleTypes", move |ctx| {
            Ok(deref_type_list(&possible, ctx.parent.get("possibleTypes")))
        })
        .field_fn("__Type", "fields", move |ctx| {
            let include = ctx.arg("includeDeprecated").and_then(Value::as_bool) == Some(true);
            Ok(filter_deprecated(ctx.parent.get("fields"), include))
        })
        .field_fn("__Type", "enumValues", move |ctx| {
            let include = ctx.arg("includeDeprecated").and_then(Value::as_bool) == Some(true);
            Ok(filter_deprecated(ctx.parent.get("enumValues"), include))
        })
        .field_fn("__Field", "type", move |ctx| {
            Ok(deref_type(&field_type, ctx.parent.get("type")))
        })
        .field_fn("__InputValue", "type", move |ctx| {
            Ok(deref_type(&input_type, ctx.parent.get("type")))
        })
}
