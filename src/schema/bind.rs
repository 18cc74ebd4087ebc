//! Binding a parsed schema against the resolver registry.
//!
//! Binding happens once, at schema build. Every object field ends up with a
//! `FieldBinding` holding its resolver, its pre-built argument packer and
//! its trace label, so execution is pure table lookup. Binding failures are
//! fatal and name the root-path chain that reaches the offending field.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::ast::schema as s;
use crate::resolvers::{
    normalize_name, FieldResolverFn, Resolvers, StreamResolverFn, TypeAsserterFn,
};
use crate::schema::ast as sast;
use crate::values::packer::{PackerArena, PackerBuilder, PackerId};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum BindingError {
    #[error("no resolver registered for \"{type_name}.{field}\"{used_by}")]
    MissingFieldResolver {
        type_name: String,
        field: String,
        used_by: String,
    },
    #[error("no stream resolver registered for subscription field \"{0}.{1}\"")]
    MissingStreamResolver(String, String),
    #[error("resolver registered for unknown type \"{0}\"")]
    UnknownResolverType(String),
    #[error("resolver registered for \"{0}.{1}\" does not match any schema field")]
    UnknownResolverField(String, String),
    #[error("resolvers \"{1}\" and \"{2}\" on type \"{0}\" bind the same schema field")]
    AmbiguousResolver(String, String, String),
    #[error("type asserter registered for \"{0}\" which is not an interface or union")]
    InvalidAsserterType(String),
    #[error("arguments of \"{0}.{1}\": {2}")]
    Packer(String, String, String),
}

pub(crate) enum FieldResolverKind {
    Registered(Arc<FieldResolverFn>),
    /// Read the member with the field's name off the parent object value.
    MemberRead,
}

pub(crate) struct FieldBinding {
    pub parent_type: String,
    pub field: s::Field,
    pub resolver: FieldResolverKind,
    pub packer: Option<PackerId>,
    pub trace_label: String,
    /// A pure member read with no arguments; elided from field tracing.
    pub is_trivial: bool,
}

#[derive(Default)]
pub(crate) struct BoundSchema {
    /// type name -> field name -> binding
    pub fields: HashMap<String, HashMap<String, Arc<FieldBinding>>>,
    /// subscription root field name -> stream resolver
    pub streams: HashMap<String, Arc<StreamResolverFn>>,
    pub asserters: HashMap<String, Arc<TypeAsserterFn>>,
    pub packers: PackerArena,
    /// False when the schema was parsed without resolvers; execution of
    /// user fields is rejected, introspection still works.
    pub has_resolvers: bool,
}

impl BoundSchema {
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&Arc<FieldBinding>> {
        self.fields.get(type_name)?.get(field_name)
    }
}

/// Walks the type graph from the roots and remembers, for every reachable
/// type, one field path that reaches it. Binding errors use this to point
/// back at why a resolver is needed.
fn used_by_chains(
    types: &HashMap<String, s::TypeDefinition>,
    roots: &[&str],
) -> HashMap<String, String> {
    let mut chains: HashMap<String, String> = HashMap::new();
    let mut queue: Vec<String> = roots.iter().map(|r| (*r).to_string()).collect();
    while let Some(type_name) = queue.pop() {
        let mut reach = |target: String, chain: String, chains: &mut HashMap<String, String>, queue: &mut Vec<String>| {
            if !chains.contains_key(&target) && !roots.contains(&target.as_str()) {
                chains.insert(target.clone(), chain);
                queue.push(target);
            }
        };
        match types.get(&type_name) {
            Some(s::TypeDefinition::Object(t)) => {
                for field in &t.fields {
                    let base = field.field_type.get_base_type().clone();
                    let chain = format!("{}.{}", type_name, field.name);
                    reach(base, chain, &mut chains, &mut queue);
                }
            }
            Some(s::TypeDefinition::Interface(t)) => {
                for field in &t.fields {
                    let base = field.field_type.get_base_type().clone();
                    let chain = format!("{}.{}", type_name, field.name);
                    reach(base, chain, &mut chains, &mut queue);
                }
                // implementations are reachable through their interface
                let via = chains.get(&type_name).cloned().unwrap_or_default();
                for typedef in types.values() {
                    if let s::TypeDefinition::Object(o) = typedef {
                        if o.implements_interfaces.contains(&t.name) {
                            reach(o.name.clone(), via.clone(), &mut chains, &mut queue);
                        }
                    }
                }
            }
            Some(s::TypeDefinition::Union(t)) => {
                let via = chains.get(&type_name).cloned().unwrap_or_default();
                for member in &t.types {
                    reach(member.clone(), via.clone(), &mut chains, &mut queue);
                }
            }
            _ => {}
        }
    }
    chains
}

pub(crate) fn bind(
    types: &HashMap<String, s::TypeDefinition>,
    query_type: &str,
    mutation_type: Option<&str>,
    subscription_type: Option<&str>,
    resolvers: Resolvers,
    use_field_resolvers: bool,
) -> Result<BoundSchema, BindingError> {
    let has_resolvers = !resolvers.is_empty();
    let mut builder = PackerBuilder::new(types, &resolvers.unmarshalers);
    let mut fields: HashMap<String, HashMap<String, Arc<FieldBinding>>> = HashMap::new();
    let mut streams: HashMap<String, Arc<StreamResolverFn>> = HashMap::new();

    let mut roots = vec![query_type];
    roots.extend(mutation_type);
    roots.extend(subscription_type);
    let chains = used_by_chains(types, &roots);

    for registered_type in resolvers.objects.keys() {
        if !types.contains_key(registered_type) {
            return Err(BindingError::UnknownResolverType(registered_type.clone()));
        }
    }
    for asserter_type in resolvers.asserters.keys() {
        match types.get(asserter_type) {
            Some(s::TypeDefinition::Interface(_)) | Some(s::TypeDefinition::Union(_)) => {}
            _ => return Err(BindingError::InvalidAsserterType(asserter_type.clone())),
        }
    }

    // Deterministic traversal so build errors are stable across runs
    let mut type_names: Vec<&String> = types.keys().collect();
    type_names.sort();
    for type_name in type_names {
        let typedef = &types[type_name];
        let object = match typedef {
            s::TypeDefinition::Object(object) => object,
            _ => continue,
        };
        let is_subscription_root = Some(type_name.as_str()) == subscription_type;
        let registered = resolvers.objects.get(type_name);

        // Normalized view of the registrations for this type, rejecting two
        // names that collapse to the same key
        let mut by_normalized: HashMap<String, (&String, &Arc<FieldResolverFn>)> = HashMap::new();
        if let Some(object_resolvers) = registered {
            for (name, resolver) in &object_resolvers.fields {
                let key = normalize_name(name);
                if let Some((existing, _)) = by_normalized.get(&key) {
                    return Err(BindingError::AmbiguousResolver(
                        type_name.clone(),
                        (*existing).clone(),
                        name.clone(),
                    ));
                }
                by_normalized.insert(key, (name, resolver));
            }
        }

        let mut bound_fields: HashMap<String, Arc<FieldBinding>> = HashMap::new();
        let mut matched: Vec<String> = vec![];
        for field in &object.fields {
            let packer = if field.arguments.is_empty() {
                None
            } else {
                Some(
                    builder
                        .arguments_packer(&field.arguments)
                        .map_err(|e| {
                            BindingError::Packer(type_name.clone(), field.name.clone(), e)
                        })?,
                )
            };

            if is_subscription_root {
                let stream = registered
                    .and_then(|r| {
                        r.streams
                            .iter()
                            .find(|(name, _)| normalize_name(name) == normalize_name(&field.name))
                            .map(|(name, stream)| (name.clone(), stream.clone()))
                    });
                match stream {
                    Some((name, stream)) => {
                        matched.push(name);
                        streams.insert(field.name.clone(), stream);
                    }
                    None if !has_resolvers => {}
                    None => {
                        return Err(BindingError::MissingStreamResolver(
                            type_name.clone(),
                            field.name.clone(),
                        ))
                    }
                }
            }

            let resolver = match by_normalized.get(&normalize_name(&field.name)) {
                Some((name, resolver)) => {
                    matched.push((*name).clone());
                    FieldResolverKind::Registered((*resolver).clone())
                }
                None if is_subscription_root => {
                    // events run through the member-read path per emission
                    FieldResolverKind::MemberRead
                }
                None if use_field_resolvers || !has_resolvers => FieldResolverKind::MemberRead,
                None => {
                    let used_by = chains
                        .get(type_name)
                        .map(|chain| format!(" (used by {})", chain))
                        .unwrap_or_default();
                    return Err(BindingError::MissingFieldResolver {
                        type_name: type_name.clone(),
                        field: field.name.clone(),
                        used_by,
                    });
                }
            };
            let is_trivial =
                matches!(resolver, FieldResolverKind::MemberRead) && field.arguments.is_empty();
            bound_fields.insert(
                field.name.clone(),
                Arc::new(FieldBinding {
                    parent_type: type_name.clone(),
                    field: field.clone(),
                    resolver,
                    packer,
                    trace_label: format!("GraphQL field: {}.{}", type_name, field.name),
                    is_trivial,
                }),
            );
        }

        // Registrations that bound nothing are typos
        if let Some(object_resolvers) = registered {
            for name in object_resolvers.fields.keys() {
                if !matched.contains(name) {
                    return Err(BindingError::UnknownResolverField(
                        type_name.clone(),
                        name.clone(),
                    ));
                }
            }
            for name in object_resolvers.streams.keys() {
                if !matched.contains(name) {
                    return Err(BindingError::UnknownResolverField(
                        type_name.clone(),
                        name.clone(),
                    ));
                }
            }
        }

        fields.insert(type_name.clone(), bound_fields);
    }

    let packers = builder
        .finish()
        .map_err(|e| BindingError::Packer(String::new(), String::new(), e))?;

    Ok(BoundSchema {
        fields,
        streams,
        asserters: resolvers.asserters,
        packers,
        has_resolvers,
    })
}
