//! The resolver registry a schema is bound against.
//!
//! Resolvers are async closures keyed by type and field name. They receive
//! the request context, the parent value and their packed arguments, and
//! return a dynamic value the executor completes against the schema. The
//! registry is consulted once, at schema build; execution dispatches through
//! the resulting tables without any further lookup by name.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::FutureExt;

use crate::data::value::{Object, Value};

/// Per-request context handed to every resolver. Cheap to clone; clones
/// share the cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    pub deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Context {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Requests cancellation: in-flight resolvers should observe this and
    /// abort; the executor stops launching new field tasks.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.map_or(false, |d| d < Instant::now())
    }
}

/// An error returned from a resolver, surfaced as a field error. The
/// optional extensions map is attached verbatim to the error entry.
#[derive(Clone, Debug)]
pub struct ResolverError {
    pub message: String,
    pub extensions: Option<Object>,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        ResolverError {
            message: message.into(),
            extensions: None,
        }
    }

    pub fn with_extensions(mut self, extensions: Object) -> Self {
        self.extensions = Some(extensions);
        self
    }
}

impl std::fmt::Display for ResolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ResolverError {}

impl From<anyhow::Error> for ResolverError {
    fn from(e: anyhow::Error) -> Self {
        ResolverError::new(e.to_string())
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        ResolverError::new(message)
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        ResolverError::new(message)
    }
}

pub type FieldResult = Result<Value, ResolverError>;

/// Everything a field resolver gets to see. Owned so resolver futures can
/// outlive the executor's stack frame.
#[derive(Clone, Debug)]
pub struct FieldContext {
    pub ctx: Context,
    /// The value the enclosing object resolved to.
    pub parent: Value,
    /// Arguments, packed against the field's declared argument types.
    pub args: Object,
}

impl FieldContext {
    /// Convenience accessor for a packed argument.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }
}

pub(crate) type FieldResolverFn =
    dyn Fn(FieldContext) -> BoxFuture<'static, FieldResult> + Send + Sync;

pub(crate) type StreamResolverFn =
    dyn Fn(FieldContext) -> BoxStream<'static, FieldResult> + Send + Sync;

pub(crate) type TypeAsserterFn = dyn Fn(&Value) -> Option<String> + Send + Sync;

/// Custom input scalars implement this pair: a type check consulted at
/// schema build and the conversion applied to raw input at pack time.
pub trait ScalarUnmarshaler: Send + Sync {
    /// Whether this unmarshaler can represent the named GraphQL type.
    fn implements_graphql_type(&self, name: &str) -> bool;

    /// Converts raw input into the value handed to resolvers.
    fn unmarshal(&self, value: Value) -> Result<Value, anyhow::Error>;
}

#[derive(Clone, Default)]
pub(crate) struct ObjectResolvers {
    pub fields: HashMap<String, Arc<FieldResolverFn>>,
    pub streams: HashMap<String, Arc<StreamResolverFn>>,
}

/// The registry handed to `Schema::parse`. Field registrations are matched
/// against schema fields case-insensitively after stripping underscores, so
/// a registration for `say_hello` binds the schema field `sayHello`.
#[derive(Clone, Default)]
pub struct Resolvers {
    pub(crate) objects: HashMap<String, ObjectResolvers>,
    pub(crate) asserters: HashMap<String, Arc<TypeAsserterFn>>,
    pub(crate) unmarshalers: HashMap<String, Arc<dyn ScalarUnmarshaler>>,
}

impl Resolvers {
    pub fn new() -> Self {
        Resolvers::default()
    }

    /// Registers an async resolver for `type_name.field_name`.
    pub fn field<F, Fut>(mut self, type_name: &str, field_name: &str, f: F) -> Self
    where
        F: Fn(FieldContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FieldResult> + Send + 'static,
    {
        let entry = self.objects.entry(type_name.to_owned()).or_default();
        entry
            .fields
            .insert(field_name.to_owned(), Arc::new(move |ctx| f(ctx).boxed()));
        self
    }

    /// Registers a synchronous resolver for `type_name.field_name`.
    pub fn field_fn<F>(self, type_name: &str, field_name: &str, f: F) -> Self
    where
        F: Fn(FieldContext) -> FieldResult + Send + Sync + 'static,
    {
        self.field(type_name, field_name, move |ctx| {
            std::future::ready(f(ctx))
        })
    }

    /// Registers the event stream behind a subscription root field.
    pub fn stream<F>(mut self, type_name: &str, field_name: &str, f: F) -> Self
    where
        F: Fn(FieldContext) -> BoxStream<'static, FieldResult> + Send + Sync + 'static,
    {
        let entry = self.objects.entry(type_name.to_owned()).or_default();
        entry
            .streams
            .insert(field_name.to_owned(), Arc::new(f));
        self
    }

    /// Registers the concrete-type assertion for an interface or union.
    /// Without one, the executor falls back to the value's own `__typename`
    /// member.
    pub fn type_asserter<F>(mut self, abstract_type: &str, f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.asserters.insert(abstract_type.to_owned(), Arc::new(f));
        self
    }

    /// Registers a custom unmarshaler for the named scalar type.
    pub fn scalar(mut self, scalar_name: &str, unmarshaler: impl ScalarUnmarshaler + 'static) -> Self {
        self.unmarshalers
            .insert(scalar_name.to_owned(), Arc::new(unmarshaler));
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.asserters.is_empty()
    }
}

/// The name normalization used to match registrations against schema
/// fields: case-insensitive, underscores stripped.
pub(crate) fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_name("say_hello"), "sayhello");
        assert_eq!(normalize_name("sayHello"), "sayhello");
        assert_eq!(normalize_name("HelloHTML"), "hellohtml");
        assert_eq!(normalize_name("hello_html"), "hellohtml");
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let ctx = Context::new();
        let other = ctx.clone();
        assert!(!other.is_cancelled());
        ctx.cancel();
        assert!(other.is_cancelled());
    }
}
