//! Input coercion: checking and converting values against input types.
//!
//! Two callers share this module: the validator checks argument literals
//! before execution, and the executor coerces variable values at operation
//! entry. Failures carry the human-readable reason that ends up after the
//! first line of the validation message.

use std::collections::HashMap;

use crate::ast::query as q;
use crate::ast::schema as s;
use crate::data::value::{Object, Value};

/// A value that can be coerced according to a type definition.
pub trait MaybeCoercible<T> {
    fn coerce(&self, using_type: &T) -> Option<Value>;
}

impl MaybeCoercible<s::EnumType> for Value {
    fn coerce(&self, using_type: &s::EnumType) -> Option<Value> {
        match self {
            Value::String(name) | Value::Enum(name) => using_type
                .values
                .iter()
                .find(|value| &value.name == name)
                .map(|_| Value::Enum(name.clone())),
            _ => None,
        }
    }
}

impl MaybeCoercible<s::ScalarType> for Value {
    fn coerce(&self, using_type: &s::ScalarType) -> Option<Value> {
        match (using_type.name.as_str(), self) {
            ("Boolean", v @ Value::Boolean(_)) => Some(v.clone()),
            ("Float", v @ Value::Float(_)) => Some(v.clone()),
            ("Float", Value::Int(num)) => Some(Value::Float(*num as f64)),
            ("Int", Value::Int(num)) => {
                if i32::MIN as i64 <= *num && *num <= i32::MAX as i64 {
                    Some(Value::Int(*num))
                } else {
                    None
                }
            }
            // JSON transports integers as doubles; accept them when exact
            ("Int", Value::Float(num)) => {
                let coerced = *num as i64;
                if coerced as f64 == *num
                    && i32::MIN as i64 <= coerced
                    && coerced <= i32::MAX as i64
                {
                    Some(Value::Int(coerced))
                } else {
                    None
                }
            }
            ("String", v @ Value::String(_)) => Some(v.clone()),
            ("ID", v @ Value::String(_)) => Some(v.clone()),
            ("ID", Value::Int(num)) => Some(Value::String(num.to_string())),
            // Custom scalars accept any non-null input as-is; a registered
            // unmarshaler refines this in the packer
            (name, v) if !crate::schema::ast::is_builtin_scalar(name) => Some(v.clone()),
            _ => None,
        }
    }
}

fn expected(ty: impl std::fmt::Display, value: &Value) -> String {
    format!("Expected type \"{}\", found {}.", ty, value.found())
}

/// Coerces a runtime value (e.g. a variable) against an input type,
/// applying input-object defaults and the list singleton rule. `resolver`
/// maps a type name to its definition.
pub(crate) fn coerce_value<'a>(
    value: &Value,
    ty: &q::Type,
    resolver: &impl Fn(&str) -> Option<&'a s::TypeDefinition>,
) -> Result<Value, String> {
    match (ty, value) {
        (q::Type::NonNullType(_), Value::Null) => Err(expected(ty, value)),
        (q::Type::NonNullType(inner), _) => coerce_value(value, inner, resolver)
            .map_err(|_| expected(ty, value)),
        (_, Value::Null) => Ok(Value::Null),
        (q::Type::NamedType(name), _) => coerce_to_definition(value, name, resolver),
        (q::Type::ListType(inner), Value::List(values)) => {
            let mut coerced_values = Vec::with_capacity(values.len());
            for value in values {
                coerced_values.push(coerce_value(value, inner, resolver)?);
            }
            Ok(Value::List(coerced_values))
        }
        // A single value coerces to a singleton list of it
        (q::Type::ListType(inner), _) => {
            Ok(Value::List(vec![coerce_value(value, inner, resolver)?]))
        }
    }
}

fn coerce_to_definition<'a>(
    value: &Value,
    definition: &str,
    resolver: &impl Fn(&str) -> Option<&'a s::TypeDefinition>,
) -> Result<Value, String> {
    match resolver(definition) {
        None => Err(format!("Unknown type \"{}\".", definition)),
        Some(s::TypeDefinition::Enum(t)) => {
            value.coerce(t).ok_or_else(|| expected(&t.name, value))
        }
        Some(s::TypeDefinition::Scalar(t)) => {
            value.coerce(t).ok_or_else(|| expected(&t.name, value))
        }
        Some(s::TypeDefinition::InputObject(t)) => coerce_input_object(value, t, resolver),
        Some(_) => Err(format!(
            "Type \"{}\" is not an input type.",
            definition
        )),
    }
}

fn coerce_input_object<'a>(
    value: &Value,
    input_object: &s::InputObjectType,
    resolver: &impl Fn(&str) -> Option<&'a s::TypeDefinition>,
) -> Result<Value, String> {
    let object = match value {
        Value::Object(object) => object,
        _ => return Err(expected(&input_object.name, value)),
    };
    for (key, _) in object.iter() {
        if !input_object.fields.iter().any(|f| &f.name == key) {
            return Err(format!(
                "Unknown field \"{}\" on input object \"{}\".",
                key, input_object.name
            ));
        }
    }
    let mut coerced = Object::new();
    for field in &input_object.fields {
        match object.get(&field.name) {
            Some(value) => {
                let value = coerce_value(value, &field.value_type, resolver)
                    .map_err(|e| format!("In field \"{}\": {}", field.name, e))?;
                coerced.insert(field.name.clone(), value);
            }
            None => match &field.default_value {
                Some(default) => {
                    let default = Value::try_from(default.clone())
                        .expect("SDL default values contain no variables");
                    coerced.insert(field.name.clone(), default);
                }
                None => {
                    if crate::schema::ast::is_non_null_type(&field.value_type) {
                        return Err(format!(
                            "In field \"{}\": Expected type \"{}\", found null.",
                            field.name, field.value_type
                        ));
                    }
                }
            },
        }
    }
    Ok(Value::Object(coerced))
}

/// Checks an argument literal against its declared type without executing
/// it. Variable references are assumed valid here; dedicated rules check
/// that they are declared and typed.
pub(crate) fn validate_literal<'a>(
    value: &q::Value,
    ty: &q::Type,
    resolver: &impl Fn(&str) -> Option<&'a s::TypeDefinition>,
    variables: &HashMap<String, q::Type>,
) -> Result<(), String> {
    match (ty, value) {
        (_, q::Value::Variable(name)) => {
            // Undefined variables are reported by their own rule
            let _ = variables.get(name);
            Ok(())
        }
        (q::Type::NonNullType(_), q::Value::Null) => {
            Err(format!("Expected type \"{}\", found null.", ty))
        }
        (q::Type::NonNullType(inner), _) => validate_literal(value, inner, resolver, variables),
        (_, q::Value::Null) => Ok(()),
        (q::Type::ListType(inner), q::Value::List(items)) => {
            for item in items {
                validate_literal(item, inner, resolver, variables)?;
            }
            Ok(())
        }
        (q::Type::ListType(inner), _) => validate_literal(value, inner, resolver, variables),
        (q::Type::NamedType(name), _) => match resolver(name) {
            None => Err(format!("Unknown type \"{}\".", name)),
            Some(s::TypeDefinition::InputObject(input_object)) => {
                let fields = match value {
                    q::Value::Object(fields) => fields,
                    other => {
                        return Err(format!(
                            "Expected type \"{}\", found {}.",
                            input_object.name,
                            literal_found(other)
                        ))
                    }
                };
                for (key, _) in fields {
                    if !input_object.fields.iter().any(|f| &f.name == key) {
                        return Err(format!(
                            "Unknown field \"{}\" on input object \"{}\".",
                            key, input_object.name
                        ));
                    }
                }
                for field in &input_object.fields {
                    match fields.get(&field.name) {
                        Some(value) => {
                            validate_literal(value, &field.value_type, resolver, variables)
                                .map_err(|e| format!("In field \"{}\": {}", field.name, e))?
                        }
                        None => {
                            if crate::schema::ast::is_non_null_type(&field.value_type)
                                && field.default_value.is_none()
                            {
                                return Err(format!(
                                    "In field \"{}\": Expected type \"{}\", found null.",
                                    field.name, field.value_type
                                ));
                            }
                        }
                    }
                }
                Ok(())
            }
            Some(typedef) => {
                let runtime = Value::try_from(value.clone()).map_err(|_| {
                    format!("Expected type \"{}\", found {}.", name, literal_found(value))
                })?;
                match typedef {
                    s::TypeDefinition::Enum(t) => runtime.coerce(t).map(|_| ()).ok_or_else(|| {
                        format!("Expected type \"{}\", found {}.", name, literal_found(value))
                    }),
                    s::TypeDefinition::Scalar(t) => {
                        runtime.coerce(t).map(|_| ()).ok_or_else(|| {
                            format!("Expected type \"{}\", found {}.", name, literal_found(value))
                        })
                    }
                    _ => Err(format!("Type \"{}\" is not an input type.", name)),
                }
            }
        },
    }
}

/// The literal form of a query value for error messages.
pub(crate) fn literal_found(value: &q::Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Pos;

    fn enum_type() -> s::TypeDefinition {
        s::TypeDefinition::Enum(s::EnumType {
            position: Pos::default(),
            description: None,
            name: "Episode".to_owned(),
            directives: vec![],
            values: vec![s::EnumValue {
                position: Pos::default(),
                description: None,
                name: "EMPIRE".to_owned(),
                directives: vec![],
            }],
        })
    }

    #[test]
    fn coerces_valid_enum_values() {
        let typedef = enum_type();
        let resolver = |_: &str| Some(&typedef);
        assert_eq!(
            coerce_value(
                &Value::String("EMPIRE".to_owned()),
                &q::Type::NamedType("Episode".to_owned()),
                &resolver
            ),
            Ok(Value::Enum("EMPIRE".to_owned()))
        );
        assert_eq!(
            coerce_value(
                &Value::String("JEDI".to_owned()),
                &q::Type::NamedType("Episode".to_owned()),
                &resolver
            ),
            Err("Expected type \"Episode\", found \"JEDI\".".to_owned())
        );
    }

    #[test]
    fn int_accepts_exact_integer_floats_only() {
        let typedef = s::TypeDefinition::Scalar(s::ScalarType::new("Int".to_owned()));
        let resolver = |_: &str| Some(&typedef);
        let int = q::Type::NamedType("Int".to_owned());
        assert_eq!(
            coerce_value(&Value::Float(3.0), &int, &resolver),
            Ok(Value::Int(3))
        );
        assert!(coerce_value(&Value::Float(3.5), &int, &resolver).is_err());
        assert!(coerce_value(&Value::Int(1 << 33), &int, &resolver).is_err());
    }

    #[test]
    fn wraps_single_values_into_lists() {
        let typedef = s::TypeDefinition::Scalar(s::ScalarType::new("Int".to_owned()));
        let resolver = |_: &str| Some(&typedef);
        let list = q::Type::ListType(Box::new(q::Type::NamedType("Int".to_owned())));
        assert_eq!(
            coerce_value(&Value::Int(7), &list, &resolver),
            Ok(Value::List(vec![Value::Int(7)]))
        );
    }

    #[test]
    fn non_null_rejects_null() {
        let typedef = s::TypeDefinition::Scalar(s::ScalarType::new("Int".to_owned()));
        let resolver = |_: &str| Some(&typedef);
        let ty = q::Type::NonNullType(Box::new(q::Type::NamedType("Int".to_owned())));
        assert_eq!(
            coerce_value(&Value::Null, &ty, &resolver),
            Err("Expected type \"Int!\", found null.".to_owned())
        );
    }
}
