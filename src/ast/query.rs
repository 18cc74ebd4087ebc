//! The executable grammar: operations, fragments, selections and values.

use std::collections::BTreeMap;

use super::Pos;

pub type Name = String;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub definitions: Vec<Definition>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Definition {
    Operation(OperationDefinition),
    Fragment(FragmentDefinition),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OperationDefinition {
    /// A bare `{ ... }` shorthand query.
    SelectionSet(SelectionSet),
    Query(Query),
    Mutation(Mutation),
    Subscription(Subscription),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub position: Pos,
    pub name: Option<Name>,
    pub variable_definitions: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mutation {
    pub position: Pos,
    pub name: Option<Name>,
    pub variable_definitions: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Subscription {
    pub position: Pos,
    pub name: Option<Name>,
    pub variable_definitions: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionSet {
    /// Start and end position of the braced selection list.
    pub span: (Pos, Pos),
    pub items: Vec<Selection>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    Field(Field),
    FragmentSpread(FragmentSpread),
    InlineFragment(InlineFragment),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub position: Pos,
    pub alias: Option<Name>,
    pub name: Name,
    pub arguments: Vec<(Name, Value)>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

impl Field {
    /// The key this field appears under in the response: its alias, or the
    /// field name when it has none.
    pub fn response_key(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => &self.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FragmentSpread {
    pub position: Pos,
    pub fragment_name: Name,
    pub directives: Vec<Directive>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InlineFragment {
    pub position: Pos,
    pub type_condition: Option<TypeCondition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FragmentDefinition {
    pub position: Pos,
    pub name: Name,
    pub type_condition: TypeCondition,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeCondition {
    On(Name),
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableDefinition {
    pub position: Pos,
    pub name: Name,
    pub var_type: Type,
    pub default_value: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    pub position: Pos,
    pub name: Name,
    pub arguments: Vec<(Name, Value)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    NamedType(Name),
    ListType(Box<Type>),
    NonNullType(Box<Type>),
}

impl Type {
    /// The named type at the bottom of any list/non-null wrapping.
    pub fn get_base_type(&self) -> &Name {
        match self {
            Type::NamedType(name) => name,
            Type::ListType(inner) => inner.get_base_type(),
            Type::NonNullType(inner) => inner.get_base_type(),
        }
    }
}

/// An integer literal. GraphQL `Int` is 32-bit on the wire but literals are
/// kept wide so out-of-range values fail coercion, not parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Number(pub(crate) i64);

impl Number {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Number(n as i64)
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number(n)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Variable(Name),
    Int(Number),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(Name),
    List(Vec<Value>),
    Object(BTreeMap<Name, Value>),
}
