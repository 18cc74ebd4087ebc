//! Source-form printing for AST nodes.
//!
//! Values and types print in their literal GraphQL form (used by error
//! messages and introspection's `defaultValue`); a schema `Document` prints
//! as SDL that re-parses to an equivalent document.

use std::fmt;

use super::query::{Directive, Type, Value};
use super::schema as s;

fn write_string_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04X}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Variable(name) => write!(f, "${}", name),
            Value::Int(n) => write!(f, "{}", n.as_i64()),
            Value::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::String(s) => write_string_literal(f, s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Enum(name) => write!(f, "{}", name),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::NamedType(name) => write!(f, "{}", name),
            Type::ListType(inner) => write!(f, "[{}]", inner),
            Type::NonNullType(inner) => write!(f, "{}!", inner),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        write_arguments(f, &self.arguments)
    }
}

fn write_arguments(f: &mut fmt::Formatter<'_>, arguments: &[(String, Value)]) -> fmt::Result {
    if arguments.is_empty() {
        return Ok(());
    }
    f.write_str("(")?;
    for (i, (name, value)) in arguments.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", name, value)?;
    }
    f.write_str(")")
}

fn write_description(f: &mut fmt::Formatter<'_>, description: &Option<String>, indent: &str) -> fmt::Result {
    if let Some(desc) = description {
        write!(f, "{}", indent)?;
        write_string_literal(f, desc)?;
        writeln!(f)?;
    }
    Ok(())
}

fn write_directives(f: &mut fmt::Formatter<'_>, directives: &[Directive]) -> fmt::Result {
    for directive in directives {
        write!(f, " {}", directive)?;
    }
    Ok(())
}

fn write_input_value(f: &mut fmt::Formatter<'_>, value: &s::InputValue) -> fmt::Result {
    write!(f, "{}: {}", value.name, value.value_type)?;
    if let Some(default) = &value.default_value {
        write!(f, " = {}", default)?;
    }
    write_directives(f, &value.directives)
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &s::Field) -> fmt::Result {
    write_description(f, &field.description, "  ")?;
    write!(f, "  {}", field.name)?;
    if !field.arguments.is_empty() {
        f.write_str("(")?;
        for (i, arg) in field.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_input_value(f, arg)?;
        }
        f.write_str(")")?;
    }
    write!(f, ": {}", field.field_type)?;
    write_directives(f, &field.directives)?;
    writeln!(f)
}

impl fmt::Display for s::Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, definition) in self.definitions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", definition)?;
        }
        Ok(())
    }
}

impl fmt::Display for s::Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            s::Definition::SchemaDefinition(d) => write!(f, "{}", d),
            s::Definition::TypeDefinition(d) => write!(f, "{}", d),
            s::Definition::DirectiveDefinition(d) => write!(f, "{}", d),
        }
    }
}

impl fmt::Display for s::SchemaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("schema")?;
        write_directives(f, &self.directives)?;
        writeln!(f, " {{")?;
        if let Some(query) = &self.query {
            writeln!(f, "  query: {}", query)?;
        }
        if let Some(mutation) = &self.mutation {
            writeln!(f, "  mutation: {}", mutation)?;
        }
        if let Some(subscription) = &self.subscription {
            writeln!(f, "  subscription: {}", subscription)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for s::TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            s::TypeDefinition::Scalar(t) => {
                write_description(f, &t.description, "")?;
                write!(f, "scalar {}", t.name)?;
                write_directives(f, &t.directives)?;
                writeln!(f)
            }
            s::TypeDefinition::Object(t) => {
                write_description(f, &t.description, "")?;
                write!(f, "type {}", t.name)?;
                if !t.implements_interfaces.is_empty() {
                    write!(f, " implements {}", t.implements_interfaces.join(" & "))?;
                }
                write_directives(f, &t.directives)?;
                writeln!(f, " {{")?;
                for field in &t.fields {
                    write_field(f, field)?;
                }
                writeln!(f, "}}")
            }
            s::TypeDefinition::Interface(t) => {
                write_description(f, &t.description, "")?;
                write!(f, "interface {}", t.name)?;
                if !t.implements_interfaces.is_empty() {
                    write!(f, " implements {}", t.implements_interfaces.join(" & "))?;
                }
                write_directives(f, &t.directives)?;
                writeln!(f, " {{")?;
                for field in &t.fields {
                    write_field(f, field)?;
                }
                writeln!(f, "}}")
            }
            s::TypeDefinition::Union(t) => {
                write_description(f, &t.description, "")?;
                write!(f, "union {}", t.name)?;
                write_directives(f, &t.directives)?;
                writeln!(f, " = {}", t.types.join(" | "))
            }
            s::TypeDefinition::Enum(t) => {
                write_description(f, &t.description, "")?;
                write!(f, "enum {}", t.name)?;
                write_directives(f, &t.directives)?;
                writeln!(f, " {{")?;
                for value in &t.values {
                    write_description(f, &value.description, "  ")?;
                    write!(f, "  {}", value.name)?;
                    write_directives(f, &value.directives)?;
                    writeln!(f)?;
                }
                writeln!(f, "}}")
            }
            s::TypeDefinition::InputObject(t) => {
                write_description(f, &t.description, "")?;
                write!(f, "input {}", t.name)?;
                write_directives(f, &t.directives)?;
                writeln!(f, " {{")?;
                for field in &t.fields {
                    write_description(f, &field.description, "  ")?;
                    f.write_str("  ")?;
                    write_input_value(f, field)?;
                    writeln!(f)?;
                }
                writeln!(f, "}}")
            }
        }
    }
}

impl fmt::Display for s::DirectiveDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_description(f, &self.description, "")?;
        write!(f, "directive @{}", self.name)?;
        if !self.arguments.is_empty() {
            f.write_str("(")?;
            for (i, arg) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_input_value(f, arg)?;
            }
            f.write_str(")")?;
        }
        if self.repeatable {
            f.write_str(" repeatable")?;
        }
        let locations = self
            .locations
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(f, " on {}", locations)
    }
}
