//! Pre-built input coercers ("packers").
//!
//! For every argument list and input object type reachable from a bound
//! field, the schema build constructs a tree of packers that turn raw input
//! (literals with variables substituted, or variable values) into the
//! argument object a resolver receives. Recursive input types are handled
//! with a two-phase arena build: the first visit of a type reserves a slot,
//! back-edges refer to the slot index, and the node is stored once built.
//! Input-object default prototypes are computed only after every reachable
//! node exists.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::query as q;
use crate::ast::schema as s;
use crate::data::value::{Object, Value};
use crate::resolvers::ScalarUnmarshaler;
use crate::values::coercion::MaybeCoercible;

pub(crate) type PackerId = usize;

pub(crate) enum PackerNode {
    /// Built-in scalar coercion by type name.
    Scalar { name: String },
    /// A user-registered unmarshaler for a custom scalar.
    CustomScalar {
        unmarshaler: Arc<dyn ScalarUnmarshaler>,
    },
    Enum { name: String, values: Vec<String> },
    List { elem: PackerId },
    /// Packs null to null and otherwise delegates.
    Nullable { elem: PackerId },
    /// An input object or a field's argument list; both pack the same way.
    InputObject {
        fields: Vec<FieldPacker>,
        /// Coerced default values, applied before present fields override.
        prototype: Object,
    },
}

pub(crate) struct FieldPacker {
    pub name: String,
    pub packer: PackerId,
    pub default: Option<q::Value>,
    /// Absent and no default: reject if the declared type is non-null.
    pub required: bool,
}

pub(crate) struct PackerArena {
    nodes: Vec<PackerNode>,
}

impl Default for PackerArena {
    fn default() -> Self {
        PackerArena { nodes: Vec::new() }
    }
}

pub(crate) struct PackerBuilder<'a> {
    types: &'a HashMap<String, s::TypeDefinition>,
    unmarshalers: &'a HashMap<String, Arc<dyn ScalarUnmarshaler>>,
    nodes: Vec<Option<PackerNode>>,
    by_type: HashMap<String, PackerId>,
}

impl<'a> PackerBuilder<'a> {
    pub fn new(
        types: &'a HashMap<String, s::TypeDefinition>,
        unmarshalers: &'a HashMap<String, Arc<dyn ScalarUnmarshaler>>,
    ) -> Self {
        PackerBuilder {
            types,
            unmarshalers,
            nodes: Vec::new(),
            by_type: HashMap::new(),
        }
    }

    /// Builds (or reuses) the packer for an input type.
    pub fn packer_for(&mut self, ty: &q::Type) -> Result<PackerId, String> {
        let key = ty.to_string();
        if let Some(id) = self.by_type.get(&key) {
            return Ok(*id);
        }
        let id = self.reserve();
        self.by_type.insert(key, id);
        let node = match ty {
            q::Type::NonNullType(inner) => self.non_null_node(inner)?,
            nullable => {
                let elem = self.non_null_packer_for(nullable)?;
                PackerNode::Nullable { elem }
            }
        };
        self.nodes[id] = Some(node);
        Ok(id)
    }

    /// Builds a packer for the arguments of a field. Not cached: argument
    /// lists are per-field.
    pub fn arguments_packer(&mut self, arguments: &[s::InputValue]) -> Result<PackerId, String> {
        let id = self.reserve();
        let fields = self.field_packers(arguments)?;
        self.nodes[id] = Some(PackerNode::InputObject {
            fields,
            prototype: Object::new(),
        });
        Ok(id)
    }

    fn reserve(&mut self) -> PackerId {
        self.nodes.push(None);
        self.nodes.len() - 1
    }

    /// A cached node for the non-null rendition of a type.
    fn non_null_packer_for(&mut self, ty: &q::Type) -> Result<PackerId, String> {
        let key = format!("{}!", ty);
        if let Some(id) = self.by_type.get(&key) {
            return Ok(*id);
        }
        let id = self.reserve();
        self.by_type.insert(key, id);
        let node = self.non_null_node(ty)?;
        self.nodes[id] = Some(node);
        Ok(id)
    }

    fn non_null_node(&mut self, ty: &q::Type) -> Result<PackerNode, String> {
        match ty {
            // `T!!` cannot be written; unwrap defensively for defaults
            q::Type::NonNullType(inner) => self.non_null_node(inner),
            q::Type::ListType(inner) => {
                let elem = self.packer_for(inner)?;
                Ok(PackerNode::List { elem })
            }
            q::Type::NamedType(name) => {
                if let Some(unmarshaler) = self.unmarshalers.get(name) {
                    if !unmarshaler.implements_graphql_type(name) {
                        return Err(format!(
                            "the registered unmarshaler does not implement type \"{}\"",
                            name
                        ));
                    }
                    return Ok(PackerNode::CustomScalar {
                        unmarshaler: unmarshaler.clone(),
                    });
                }
                // Decouple the type table borrow from `self` so the
                // recursive builder calls below may borrow mutably
                let types: &'a HashMap<String, s::TypeDefinition> = self.types;
                match types.get(name) {
                    Some(s::TypeDefinition::Scalar(t)) => Ok(PackerNode::Scalar {
                        name: t.name.clone(),
                    }),
                    Some(s::TypeDefinition::Enum(t)) => Ok(PackerNode::Enum {
                        name: t.name.clone(),
                        values: t.values.iter().map(|v| v.name.clone()).collect(),
                    }),
                    Some(s::TypeDefinition::InputObject(t)) => {
                        let fields = self.field_packers(&t.fields)?;
                        Ok(PackerNode::InputObject {
                            fields,
                            prototype: Object::new(),
                        })
                    }
                    Some(other) => Err(format!(
                        "type of kind {} can not be used as input",
                        other.kind()
                    )),
                    None => Err(format!("unknown type \"{}\"", name)),
                }
            }
        }
    }

    fn field_packers(&mut self, values: &[s::InputValue]) -> Result<Vec<FieldPacker>, String> {
        let mut fields = Vec::with_capacity(values.len());
        for value in values {
            // A defaulted field packs through the non-null rendition of its
            // type: the default covers absence, so an explicit null is an
            // error rather than a fallback.
            let packer = if value.default_value.is_some() {
                self.non_null_packer_for(strip_non_null(&value.value_type))?
            } else {
                self.packer_for(&value.value_type)?
            };
            fields.push(FieldPacker {
                name: value.name.clone(),
                packer,
                default: value.default_value.clone(),
                required: crate::schema::ast::is_non_null_type(&value.value_type)
                    && value.default_value.is_none(),
            });
        }
        Ok(fields)
    }

    /// Finishes the arena: all nodes must be filled, then input-object
    /// prototypes are computed from their field defaults. This runs only
    /// after every reachable packer exists, so defaults may use recursive
    /// types freely.
    pub fn finish(self) -> Result<PackerArena, String> {
        let nodes: Vec<PackerNode> = self
            .nodes
            .into_iter()
            .map(|node| node.expect("all reserved packer slots are filled"))
            .collect();
        let mut arena = PackerArena { nodes };

        let mut prototypes: Vec<(PackerId, Object)> = Vec::new();
        for (id, node) in arena.nodes.iter().enumerate() {
            if let PackerNode::InputObject { fields, .. } = node {
                let mut prototype = Object::new();
                for field in fields {
                    if let Some(default) = &field.default {
                        let default = Value::try_from(default.clone())
                            .map_err(|_| "default values contain no variables".to_owned())?;
                        let packed = arena
                            .pack(field.packer, Some(default))
                            .map_err(|e| format!("default value of \"{}\": {}", field.name, e))?;
                        prototype.insert(field.name.clone(), packed);
                    }
                }
                if !prototype.is_empty() {
                    prototypes.push((id, prototype));
                }
            }
        }
        for (id, prototype) in prototypes {
            if let PackerNode::InputObject {
                prototype: slot, ..
            } = &mut arena.nodes[id]
            {
                *slot = prototype;
            }
        }
        Ok(arena)
    }
}

fn strip_non_null(ty: &q::Type) -> &q::Type {
    match ty {
        q::Type::NonNullType(inner) => inner,
        other => other,
    }
}

impl PackerArena {
    /// Packs a field's argument literals into the object its resolver sees.
    /// Variables are substituted first; an argument naming an absent
    /// variable counts as not provided.
    pub fn pack_arguments(
        &self,
        id: PackerId,
        arguments: &[(String, q::Value)],
        variables: &HashMap<String, Value>,
    ) -> Result<Object, String> {
        let mut input = Object::new();
        for (name, literal) in arguments {
            if let Some(value) = substitute_variables(literal, variables) {
                input.insert(name.clone(), value);
            }
        }
        match self.pack(id, Some(Value::Object(input)))? {
            Value::Object(packed) => Ok(packed),
            other => Err(format!("packed arguments must be an object, got {}", other)),
        }
    }

    pub fn pack(&self, id: PackerId, value: Option<Value>) -> Result<Value, String> {
        match &self.nodes[id] {
            PackerNode::Nullable { elem } => match value {
                None | Some(Value::Null) => Ok(Value::Null),
                Some(value) => self.pack(*elem, Some(value)),
            },
            PackerNode::Scalar { name } => {
                let value = non_null(value)?;
                let scalar = s::ScalarType::new(name.clone());
                value
                    .coerce(&scalar)
                    .ok_or_else(|| format!("Expected type \"{}\", found {}.", name, value.found()))
            }
            PackerNode::CustomScalar { unmarshaler } => {
                let value = non_null(value)?;
                unmarshaler.unmarshal(value).map_err(|e| e.to_string())
            }
            PackerNode::Enum { name, values } => {
                let value = non_null(value)?;
                match value.as_str() {
                    Some(candidate) if values.iter().any(|v| v.as_str() == candidate) => {
                        Ok(Value::Enum(candidate.to_owned()))
                    }
                    _ => Err(format!(
                        "Expected type \"{}\", found {}.",
                        name,
                        value.found()
                    )),
                }
            }
            PackerNode::List { elem } => {
                let value = non_null(value)?;
                // A single value packs as a singleton list
                let items = match value {
                    Value::List(items) => items,
                    other => vec![other],
                };
                let mut packed = Vec::with_capacity(items.len());
                for item in items {
                    packed.push(self.pack(*elem, Some(item))?);
                }
                Ok(Value::List(packed))
            }
            PackerNode::InputObject { fields, prototype } => {
                let value = non_null(value)?;
                let input = match value {
                    Value::Object(input) => input,
                    other => return Err(format!("Expected an object, found {}.", other.found())),
                };
                let mut packed = prototype.clone();
                for field in fields {
                    match input.get(&field.name) {
                        Some(value) => {
                            let value = self
                                .pack(field.packer, Some(value.clone()))
                                .map_err(|e| format!("field \"{}\": {}", field.name, e))?;
                            packed.insert(field.name.clone(), value);
                        }
                        None if field.required => {
                            return Err(format!(
                                "field \"{}\": got null for non-null",
                                field.name
                            ));
                        }
                        None => {}
                    }
                }
                Ok(Value::Object(packed))
            }
        }
    }
}

fn non_null(value: Option<Value>) -> Result<Value, String> {
    match value {
        None | Some(Value::Null) => Err("got null for non-null".to_owned()),
        Some(value) => Ok(value),
    }
}

/// Resolves variable references inside a literal. Returns `None` when the
/// literal is a reference to a variable the caller did not provide.
fn substitute_variables(
    literal: &q::Value,
    variables: &HashMap<String, Value>,
) -> Option<Value> {
    match literal {
        q::Value::Variable(name) => variables.get(name).cloned(),
        q::Value::List(items) => Some(Value::List(
            items
                .iter()
                .map(|item| substitute_variables(item, variables).unwrap_or(Value::Null))
                .collect(),
        )),
        q::Value::Object(fields) => {
            let mut object = Object::new();
            for (key, value) in fields {
                if let Some(value) = substitute_variables(value, variables) {
                    object.insert(key.clone(), value);
                }
            }
            Some(Value::Object(object))
        }
        other => Value::try_from(other.clone()).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Pos;

    fn types_with(defs: Vec<s::TypeDefinition>) -> HashMap<String, s::TypeDefinition> {
        let mut types: HashMap<String, s::TypeDefinition> = crate::schema::ast::BUILTIN_SCALARS
            .iter()
            .map(|name| {
                (
                    (*name).to_owned(),
                    s::TypeDefinition::Scalar(s::ScalarType::new((*name).to_owned())),
                )
            })
            .collect();
        for def in defs {
            types.insert(def.name().clone(), def);
        }
        types
    }

    fn input_value(name: &str, ty: q::Type, default: Option<q::Value>) -> s::InputValue {
        s::InputValue {
            position: Pos::default(),
            description: None,
            name: name.to_owned(),
            value_type: ty,
            default_value: default,
            directives: vec![],
        }
    }

    fn non_null(name: &str) -> q::Type {
        q::Type::NonNullType(Box::new(q::Type::NamedType(name.to_owned())))
    }

    #[test]
    fn packs_arguments_with_defaults() {
        let types = types_with(vec![]);
        let unmarshalers = HashMap::new();
        let mut builder = PackerBuilder::new(&types, &unmarshalers);
        let id = builder
            .arguments_packer(&[
                input_value("first", non_null("Int"), None),
                input_value(
                    "language",
                    q::Type::NamedType("String".to_owned()),
                    Some(q::Value::String("English".to_owned())),
                ),
            ])
            .unwrap();
        let arena = builder.finish().unwrap();

        let args = arena
            .pack_arguments(
                id,
                &[("first".to_owned(), q::Value::Int(q::Number::from(3)))],
                &HashMap::new(),
            )
            .unwrap();
        assert_eq!(args.get("first"), Some(&Value::Int(3)));
        assert_eq!(
            args.get("language"),
            Some(&Value::String("English".to_owned()))
        );
    }

    #[test]
    fn missing_required_argument_is_rejected() {
        let types = types_with(vec![]);
        let unmarshalers = HashMap::new();
        let mut builder = PackerBuilder::new(&types, &unmarshalers);
        let id = builder
            .arguments_packer(&[input_value("first", non_null("Int"), None)])
            .unwrap();
        let arena = builder.finish().unwrap();

        let err = arena
            .pack_arguments(id, &[], &HashMap::new())
            .unwrap_err();
        assert!(err.contains("got null for non-null"), "{}", err);
    }

    #[test]
    fn recursive_input_objects_build_and_pack() {
        let node = s::TypeDefinition::InputObject(s::InputObjectType {
            position: Pos::default(),
            description: None,
            name: "Filter".to_owned(),
            directives: vec![],
            fields: vec![
                input_value("name", q::Type::NamedType("String".to_owned()), None),
                input_value("not", q::Type::NamedType("Filter".to_owned()), None),
            ],
        });
        let types = types_with(vec![node]);
        let unmarshalers = HashMap::new();
        let mut builder = PackerBuilder::new(&types, &unmarshalers);
        let id = builder
            .arguments_packer(&[input_value(
                "filter",
                q::Type::NamedType("Filter".to_owned()),
                None,
            )])
            .unwrap();
        let arena = builder.finish().unwrap();

        let mut inner = std::collections::BTreeMap::new();
        inner.insert(
            "name".to_owned(),
            q::Value::String("R2-D2".to_owned()),
        );
        let mut outer = std::collections::BTreeMap::new();
        outer.insert("not".to_owned(), q::Value::Object(inner));

        let args = arena
            .pack_arguments(
                id,
                &[("filter".to_owned(), q::Value::Object(outer))],
                &HashMap::new(),
            )
            .unwrap();
        let filter = args.get("filter").unwrap();
        assert_eq!(
            filter.get("not").unwrap().get("name"),
            Some(&Value::String("R2-D2".to_owned()))
        );
    }

    #[test]
    fn singleton_list_coercion() {
        let types = types_with(vec![]);
        let unmarshalers = HashMap::new();
        let mut builder = PackerBuilder::new(&types, &unmarshalers);
        let id = builder
            .arguments_packer(&[input_value(
                "ids",
                q::Type::ListType(Box::new(q::Type::NamedType("ID".to_owned()))),
                None,
            )])
            .unwrap();
        let arena = builder.finish().unwrap();

        let args = arena
            .pack_arguments(
                id,
                &[("ids".to_owned(), q::Value::Int(q::Number::from(4)))],
                &HashMap::new(),
            )
            .unwrap();
        assert_eq!(
            args.get("ids"),
            Some(&Value::List(vec![Value::String("4".to_owned())]))
        );
    }

    #[test]
    fn explicit_null_for_defaulted_field_is_rejected() {
        let types = types_with(vec![]);
        let unmarshalers = HashMap::new();
        let mut builder = PackerBuilder::new(&types, &unmarshalers);
        let id = builder
            .arguments_packer(&[input_value(
                "language",
                q::Type::NamedType("String".to_owned()),
                Some(q::Value::String("English".to_owned())),
            )])
            .unwrap();
        let arena = builder.finish().unwrap();

        let err = arena
            .pack_arguments(id, &[("language".to_owned(), q::Value::Null)], &HashMap::new())
            .unwrap_err();
        assert!(err.contains("got null for non-null"), "{}", err);
    }
}
