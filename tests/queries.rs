#[macro_use]
extern crate pretty_assertions;

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use serde_json::json;

use graphql_server::object;
use graphql_server::prelude::*;
use graphql_server::trace::RecordingTracer;

async fn exec(schema: &Schema, query: &str) -> serde_json::Value {
    let result = schema.exec(Context::new(), query, None, None).await;
    serde_json::to_value(&result).unwrap()
}

async fn exec_with_variables(
    schema: &Schema,
    query: &str,
    variables: serde_json::Value,
) -> serde_json::Value {
    let variables: QueryVariables = serde_json::from_value(variables).unwrap();
    let result = schema
        .exec(Context::new(), query, None, Some(variables))
        .await;
    serde_json::to_value(&result).unwrap()
}

fn hello_schema() -> Schema {
    Schema::must_parse(
        "
        schema {
            query: Query
        }

        type Query {
            hello: String!
        }
        ",
        Resolvers::new().field_fn("Query", "hello", |_| {
            Ok(Value::String("Hello world!".to_owned()))
        }),
    )
}

#[tokio::test]
async fn hello_world() {
    let schema = hello_schema();
    assert_eq!(
        exec(&schema, "{ hello }").await,
        json!({"data": {"hello": "Hello world!"}})
    );
}

#[tokio::test]
async fn aliases() {
    let schema = hello_schema();
    assert_eq!(
        exec(&schema, "{ first: hello second: hello }").await,
        json!({"data": {"first": "Hello world!", "second": "Hello world!"}})
    );
}

#[tokio::test]
async fn response_keys_preserve_selection_order() {
    let schema = Schema::must_parse(
        "type Query { a: Int! b: Int! c: Int! }",
        Resolvers::new()
            .field_fn("Query", "a", |_| Ok(Value::Int(1)))
            .field_fn("Query", "b", |_| Ok(Value::Int(2)))
            .field_fn("Query", "c", |_| Ok(Value::Int(3))),
    );
    let result = schema.exec(Context::new(), "{ c a b }", None, None).await;
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"c":3,"a":1,"b":2}}"#
    );
}

fn luke() -> Value {
    object! {
        __typename: "Human",
        name: "Luke Skywalker",
        height: 1.72,
    }
}

fn artoo() -> Value {
    object! {
        __typename: "Droid",
        name: "R2-D2",
        primaryFunction: "Astromech",
    }
}

fn starwars_schema() -> Schema {
    Schema::must_parse(
        "
        type Query {
            hero(episode: Episode = NEWHOPE): Character
            search(text: String!): [SearchResult!]!
        }

        enum Episode {
            NEWHOPE
            EMPIRE
        }

        interface Character {
            name: String!
        }

        type Human implements Character {
            name: String!
            height: Float!
        }

        type Droid implements Character {
            name: String!
            primaryFunction: String!
        }

        union SearchResult = Human | Droid
        ",
        Resolvers::new()
            .field_fn("Query", "hero", |ctx| {
                match ctx.arg("episode").and_then(Value::as_str) {
                    Some("EMPIRE") => Ok(luke()),
                    _ => Ok(artoo()),
                }
            })
            .field_fn("Query", "search", |_| {
                Ok(Value::List(vec![luke(), artoo()]))
            })
            .field_fn("Human", "name", |ctx| {
                Ok(ctx.parent.get("name").cloned().unwrap_or(Value::Null))
            })
            .field_fn("Human", "height", |ctx| {
                Ok(ctx.parent.get("height").cloned().unwrap_or(Value::Null))
            })
            .field_fn("Droid", "name", |ctx| {
                Ok(ctx.parent.get("name").cloned().unwrap_or(Value::Null))
            })
            .field_fn("Droid", "primaryFunction", |ctx| {
                Ok(ctx.parent.get("primaryFunction").cloned().unwrap_or(Value::Null))
            }),
    )
}

#[tokio::test]
async fn fragments_compose_across_interfaces() {
    let schema = starwars_schema();
    assert_eq!(
        exec(
            &schema,
            r#"
            {
                hero {
                    ...characterFields
                    ... on Droid { primaryFunction }
                }
            }
            fragment characterFields on Character { name }
            "#,
        )
        .await,
        json!({"data": {"hero": {"name": "R2-D2", "primaryFunction": "Astromech"}}})
    );
}

#[tokio::test]
async fn unions_resolve_through_typename() {
    let schema = starwars_schema();
    assert_eq!(
        exec(
            &schema,
            r#"
            {
                search(text: "a") {
                    __typename
                    ... on Human { name height }
                    ... on Droid { name primaryFunction }
                }
            }
            "#,
        )
        .await,
        json!({"data": {"search": [
            {"__typename": "Human", "name": "Luke Skywalker", "height": 1.72},
            {"__typename": "Droid", "name": "R2-D2", "primaryFunction": "Astromech"}
        ]}})
    );
}

#[tokio::test]
async fn enum_arguments_with_defaults() {
    let schema = starwars_schema();
    assert_eq!(
        exec(&schema, "{ hero { name } }").await,
        json!({"data": {"hero": {"name": "R2-D2"}}})
    );
    assert_eq!(
        exec(&schema, "{ hero(episode: EMPIRE) { name } }").await,
        json!({"data": {"hero": {"name": "Luke Skywalker"}}})
    );
}

#[tokio::test]
async fn variables_are_coerced_and_substituted() {
    let schema = starwars_schema();
    assert_eq!(
        exec_with_variables(
            &schema,
            "query Hero($episode: Episode) { hero(episode: $episode) { name } }",
            json!({"episode": "EMPIRE"}),
        )
        .await,
        json!({"data": {"hero": {"name": "Luke Skywalker"}}})
    );
}

#[tokio::test]
async fn missing_required_variable_is_reported() {
    let schema = starwars_schema();
    let result = exec_with_variables(
        &schema,
        "query Search($text: String!) { search(text: $text) { __typename } }",
        json!({}),
    )
    .await;
    assert_eq!(
        result["errors"][0]["message"],
        json!("Variable \"text\" has invalid value null.\nExpected type \"String!\", found null.")
    );
    assert_eq!(result["errors"][0]["rule"], json!("VariablesOfCorrectType"));
    assert_eq!(result.get("data"), None);
}

#[tokio::test]
async fn invalid_literal_arguments_are_reported() {
    let schema = starwars_schema();
    let result = exec(&schema, "{ search(text: 3) { __typename } }").await;
    assert_eq!(
        result["errors"][0]["message"],
        json!("Argument \"text\" has invalid value 3.\nExpected type \"String\", found 3.")
    );
    assert_eq!(
        result["errors"][0]["rule"],
        json!("ArgumentsOfCorrectType")
    );
}

#[tokio::test]
async fn undefined_variables_are_reported() {
    let schema = starwars_schema();
    let result = exec(&schema, "query { search(text: $text) { __typename } }").await;
    assert_eq!(
        result["errors"][0]["message"],
        json!("Variable \"$text\" is not defined.")
    );
    assert_eq!(result["errors"][0]["rule"], json!("NoUndefinedVariables"));
}

#[tokio::test]
async fn unknown_fields_are_reported() {
    let schema = hello_schema();
    let result = exec(&schema, "{ goodbye }").await;
    assert_eq!(
        result["errors"][0]["message"],
        json!("Type \"Query\" has no field \"goodbye\"")
    );
    assert_eq!(result["errors"][0]["rule"], json!("FieldsOnCorrectType"));
}

#[tokio::test]
async fn skip_and_include_directives() {
    let schema = hello_schema();
    assert_eq!(
        exec(&schema, "{ hello @skip(if: true) }").await,
        json!({"data": {}})
    );
    assert_eq!(
        exec(&schema, "{ hello @include(if: false) }").await,
        json!({"data": {}})
    );
    // skip wins when both are present
    assert_eq!(
        exec(&schema, "{ hello @skip(if: true) @include(if: true) }").await,
        json!({"data": {}})
    );
    assert_eq!(
        exec_with_variables(
            &schema,
            "query Q($yes: Boolean!) { hello @include(if: $yes) }",
            json!({"yes": true}),
        )
        .await,
        json!({"data": {"hello": "Hello world!"}})
    );
}

fn droids_schema() -> Schema {
    let droid = |name: &str| {
        object! {
            name: name,
        }
    };
    let not_found = || {
        object! {
            error: true,
        }
    };
    let list = move || Value::List(vec![droid("R2-D2"), not_found(), droid("C-3PO")]);
    let find = list.clone();
    let find_nil = list;
    Schema::must_parse(
        "
        type Query {
            findDroids: [Droid!]!
            findNilDroids: [Droid]!
        }

        type Droid {
            name: String!
        }
        ",
        Resolvers::new()
            .field_fn("Query", "findDroids", move |_| Ok(find()))
            .field_fn("Query", "findNilDroids", move |_| Ok(find_nil()))
            .field_fn("Droid", "name", |ctx| {
                if ctx.parent.get("error").is_some() {
                    let mut extensions = Object::new();
                    extensions.insert("code".to_owned(), Value::String("NotFound".to_owned()));
                    extensions.insert(
                        "message".to_owned(),
                        Value::String("This is not the droid you are looking for".to_owned()),
                    );
                    Err(ResolverError::new(
                        "Error [NotFound]: This is not the droid you are looking for",
                    )
                    .with_extensions(extensions))
                } else {
                    Ok(ctx.parent.get("name").cloned().unwrap_or(Value::Null))
                }
            }),
    )
}

#[tokio::test]
async fn error_in_non_null_list_element_nulls_the_response() {
    let schema = droids_schema();
    let result = exec(&schema, "{ findDroids { name } }").await;
    assert_eq!(result["data"], json!(null));
    let errors = result["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], json!(["findDroids", 1, "name"]));
    assert_eq!(
        errors[0]["extensions"],
        json!({"code": "NotFound", "message": "This is not the droid you are looking for"})
    );
}

#[tokio::test]
async fn error_in_nullable_list_element_stays_local() {
    let schema = droids_schema();
    let result = exec(&schema, "{ findNilDroids { name } }").await;
    assert_eq!(
        result["data"],
        json!({"findNilDroids": [{"name": "R2-D2"}, null, {"name": "C-3PO"}]})
    );
    let errors = result["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], json!(["findNilDroids", 1, "name"]));
}

#[tokio::test]
async fn null_for_non_null_field_propagates_once() {
    let schema = Schema::must_parse(
        "type Query { hello: String! }",
        Resolvers::new().field_fn("Query", "hello", |_| Ok(Value::Null)),
    );
    let result = exec(&schema, "{ hello }").await;
    assert_eq!(result["data"], json!(null));
    let errors = result["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0]["message"],
        json!("graphql: got nil for non-null \"String\"")
    );
}

#[tokio::test]
async fn mutations_execute_in_source_order() {
    let number = Arc::new(Mutex::new(0i64));
    let set = number.clone();
    let get = number.clone();
    let schema = Schema::must_parse(
        "
        schema {
            query: Query
            mutation: Mutation
        }

        type Query {
            theNumber: Int!
        }

        type Mutation {
            changeTheNumber(newNumber: Int!): Query
        }
        ",
        Resolvers::new()
            .field_fn("Query", "theNumber", move |_| {
                Ok(Value::Int(*get.lock().unwrap()))
            })
            .field_fn("Mutation", "changeTheNumber", move |ctx| {
                let new_number = ctx.arg("newNumber").and_then(Value::as_int).unwrap_or(0);
                *set.lock().unwrap() = new_number;
                Ok(object! {})
            }),
    );
    let result = schema
        .exec(
            Context::new(),
            "mutation {
                first: changeTheNumber(newNumber: 1) { theNumber }
                second: changeTheNumber(newNumber: 3) { theNumber }
                third: changeTheNumber(newNumber: 2) { theNumber }
            }",
            None,
            None,
        )
        .await;
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"first":{"theNumber":1},"second":{"theNumber":3},"third":{"theNumber":2}}}"#
    );
}

#[tokio::test]
async fn mutations_without_mutation_root_are_rejected() {
    let schema = hello_schema();
    let result = exec(&schema, "mutation { anything }").await;
    assert_eq!(
        result["errors"][0]["message"],
        json!("Not supported: mutations")
    );
}

#[tokio::test]
async fn subscriptions_require_a_streaming_transport() {
    let schema = Schema::must_parse(
        "
        type Query { hello: String! }
        type Subscription { ticks: Int! }
        ",
        Resolvers::new()
            .field_fn("Query", "hello", |_| Ok(Value::String("hi".to_owned())))
            .stream("Subscription", "ticks", |_| {
                futures::stream::iter(vec![Ok(Value::Int(1))]).boxed()
            }),
    );
    let result = exec(&schema, "subscription { ticks }").await;
    assert_eq!(
        result["errors"][0]["message"],
        json!("graphql-ws protocol header is missing")
    );
}

#[tokio::test]
async fn max_depth_bounds_nesting() {
    let luke = object! { name: "Luke" };
    let schema = Schema::with_options(
        "
        type Query { hero: Character }
        type Character { name: String! friend: Character }
        ",
        Resolvers::new()
            .field_fn("Query", "hero", move |_| Ok(luke.clone()))
            .field_fn("Character", "name", |ctx| {
                Ok(ctx.parent.get("name").cloned().unwrap_or(Value::Null))
            })
            .field_fn("Character", "friend", |_| Ok(Value::Null)),
        SchemaOptions {
            max_depth: Some(3),
            ..SchemaOptions::default()
        },
    )
    .unwrap();

    let ok = exec(&schema, "{ hero { friend { name } } }").await;
    assert_eq!(ok.get("errors"), None);

    let too_deep = exec(&schema, "{ hero { friend { friend { name } } } }").await;
    assert_eq!(
        too_deep["errors"][0]["message"],
        json!("The query exceeds the maximum depth of 3")
    );
    assert_eq!(too_deep["errors"][0]["rule"], json!("MaxDepthExceeded"));
}

#[tokio::test]
async fn max_query_length_rejects_before_parsing() {
    let schema = Schema::with_options(
        "type Query { hello: String! }",
        Resolvers::new().field_fn("Query", "hello", |_| {
            Ok(Value::String("Hello world!".to_owned()))
        }),
        SchemaOptions {
            max_query_length: Some(10),
            ..SchemaOptions::default()
        },
    )
    .unwrap();
    let query = "{ hello }    ";
    let result = exec(&schema, query).await;
    assert_eq!(
        result["errors"][0]["message"],
        json!(format!(
            "query length {} exceeds the maximum allowed query length of 10 bytes",
            query.len()
        ))
    );
}

#[tokio::test]
async fn fragment_cycles_are_rejected() {
    let schema = hello_schema();
    let result = exec(
        &schema,
        "
        { hello ...a }
        fragment a on Query { ...b }
        fragment b on Query { ...a }
        ",
    )
    .await;
    assert_eq!(
        result["errors"][0]["message"],
        json!("Cannot spread fragment \"a\" within itself via \"b\".")
    );
    assert_eq!(result["errors"][0]["rule"], json!("NoFragmentCycles"));
    let locations = result["errors"][0]["locations"].as_array().unwrap();
    assert_eq!(locations.len(), 2);
}

#[tokio::test]
async fn self_spread_is_rejected_without_via() {
    let schema = hello_schema();
    let result = exec(
        &schema,
        "
        { hello ...a }
        fragment a on Query { ...a }
        ",
    )
    .await;
    assert_eq!(
        result["errors"][0]["message"],
        json!("Cannot spread fragment \"a\" within itself.")
    );
}

#[tokio::test]
async fn conflicting_response_keys_are_rejected() {
    let schema = starwars_schema();
    let result = exec(
        &schema,
        "{ hero { name } hero(episode: EMPIRE) { name } }",
    )
    .await;
    assert_eq!(
        result["errors"][0]["rule"],
        json!("OverlappingFieldsCanBeMerged")
    );
}

#[tokio::test]
async fn unknown_type_conditions_are_rejected() {
    let schema = hello_schema();
    let result = exec(&schema, "{ ... on Unknown { hello } }").await;
    assert_eq!(result["errors"][0]["message"], json!("Unknown type \"Unknown\"."));
    assert_eq!(result["errors"][0]["rule"], json!("KnownTypeNames"));
}

#[tokio::test]
async fn invalid_enum_output_is_a_field_error() {
    let schema = Schema::must_parse(
        "
        type Query { mood: Mood }
        enum Mood { HAPPY GRUMPY }
        ",
        Resolvers::new().field_fn("Query", "mood", |_| {
            Ok(Value::String("SLEEPY".to_owned()))
        }),
    );
    let result = exec(&schema, "{ mood }").await;
    assert_eq!(result["data"], json!({"mood": null}));
    assert_eq!(
        result["errors"][0]["message"],
        json!("Invalid value \"SLEEPY\".\nExpected type Mood, found \"SLEEPY\".")
    );
}

#[tokio::test]
async fn input_objects_pack_defaults_and_overrides() {
    let schema = Schema::must_parse(
        "
        type Query {
            echo(filter: Filter!): String!
        }

        input Filter {
            name: String!
            limit: Int = 10
        }
        ",
        Resolvers::new().field_fn("Query", "echo", |ctx| {
            let filter = ctx.arg("filter").cloned().unwrap_or(Value::Null);
            let name = filter.get("name").and_then(Value::as_str).unwrap_or("").to_owned();
            let limit = filter.get("limit").and_then(Value::as_int).unwrap_or(0);
            Ok(Value::String(format!("{}:{}", name, limit)))
        }),
    );
    assert_eq!(
        exec(&schema, r#"{ echo(filter: {name: "x"}) }"#).await,
        json!({"data": {"echo": "x:10"}})
    );
    assert_eq!(
        exec(&schema, r#"{ echo(filter: {name: "x", limit: 3}) }"#).await,
        json!({"data": {"echo": "x:3"}})
    );
    let missing = exec(&schema, r#"{ echo(filter: {limit: 3}) }"#).await;
    assert_eq!(missing["errors"][0]["rule"], json!("ArgumentsOfCorrectType"));
}

struct UpperScalar;

impl ScalarUnmarshaler for UpperScalar {
    fn implements_graphql_type(&self, name: &str) -> bool {
        name == "Upper"
    }

    fn unmarshal(&self, value: Value) -> Result<Value, anyhow::Error> {
        match value.as_str() {
            Some(s) => Ok(Value::String(s.to_uppercase())),
            None => Err(anyhow::anyhow!("Upper must be a string")),
        }
    }
}

#[tokio::test]
async fn custom_scalars_unmarshal_input() {
    let schema = Schema::must_parse(
        "
        scalar Upper

        type Query {
            shout(word: Upper!): String!
        }
        ",
        Resolvers::new()
            .scalar("Upper", UpperScalar)
            .field_fn("Query", "shout", |ctx| {
                Ok(ctx.arg("word").cloned().unwrap_or(Value::Null))
            }),
    );
    assert_eq!(
        exec(&schema, r#"{ shout(word: "quiet") }"#).await,
        json!({"data": {"shout": "QUIET"}})
    );
}

#[tokio::test]
async fn schemas_without_resolvers_reject_execution() {
    let schema = Schema::parse("type Query { hello: String! }", Resolvers::new()).unwrap();
    let result = exec(&schema, "{ hello }").await;
    assert_eq!(
        result["errors"][0]["message"],
        json!("schema created without resolvers, can not exec")
    );
    // __typename still works
    assert_eq!(
        exec(&schema, "{ __typename }").await["data"],
        json!({"__typename": "Query"})
    );
}

#[tokio::test]
async fn trivial_member_reads_are_elided_from_tracing() {
    let tracer = RecordingTracer::new();
    let droid = object! { name: "R2-D2" };
    let schema = Schema::with_options(
        "
        type Query { droid: Droid! }
        type Droid { name: String! }
        ",
        Resolvers::new().field_fn("Query", "droid", move |_| Ok(droid.clone())),
        SchemaOptions {
            use_field_resolvers: true,
            tracer: Arc::new(tracer.clone()),
            ..SchemaOptions::default()
        },
    )
    .unwrap();
    let result = exec(&schema, "{ droid { name } }").await;
    assert_eq!(result["data"], json!({"droid": {"name": "R2-D2"}}));

    let labels = tracer.labels();
    assert!(labels.iter().any(|l| l == "GraphQL field: Query.droid"));
    assert!(!labels.iter().any(|l| l.contains("Droid.name")));
}

#[tokio::test]
async fn cancellation_stops_execution() {
    let ctx = Context::new();
    ctx.cancel();
    let schema = hello_schema();
    let result = schema.exec(ctx, "{ hello }", None, None).await;
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(
        value["errors"][0]["message"],
        json!("Query execution was cancelled")
    );
}

#[tokio::test]
async fn execution_is_idempotent() {
    let schema = starwars_schema();
    let query = "{ hero { name } search(text: \"a\") { __typename } }";
    let first = exec(&schema, query).await;
    let second = exec(&schema, query).await;
    assert_eq!(first, second);
}
