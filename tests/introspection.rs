#[macro_use]
extern crate pretty_assertions;

use serde_json::json;

use graphql_server::prelude::*;

async fn exec(schema: &Schema, query: &str) -> serde_json::Value {
    let result = schema.exec(Context::new(), query, None, None).await;
    serde_json::to_value(&result).unwrap()
}

/// A schema exercising scalars, enums, interfaces, unions, input objects
/// and deprecation.
fn mock_schema() -> Schema {
    Schema::must_parse(
        r#"
        schema {
            query: Query
        }

        "A point in time"
        scalar Time @specifiedBy(url: "https://scalars.example/time")

        enum Role {
            USER
            ADMIN @deprecated(reason: "all users are equal now")
        }

        interface Node {
            id: ID!
        }

        type User implements Node {
            id: ID!
            name: String!
            role: Role!
        }

        input UserFilter {
            nameEq: String = "any"
        }

        type Query {
            allUsers(filter: UserFilter): [User!]
            node(id: ID!): Node
        }
        "#,
        Resolvers::new()
            .field_fn("Query", "allUsers", |_| Ok(Value::Null))
            .field_fn("Query", "node", |_| Ok(Value::Null))
            .field_fn("User", "id", |_| Ok(Value::Null))
            .field_fn("User", "name", |_| Ok(Value::Null))
            .field_fn("User", "role", |_| Ok(Value::Null)),
    )
}

#[tokio::test]
async fn schema_lists_all_named_types() {
    let schema = mock_schema();
    let result = exec(&schema, "{ __schema { types { name } } }").await;
    let names: Vec<&str> = result["data"]["__schema"]["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();

    // user-declared types
    for name in ["Time", "Role", "Node", "User", "UserFilter", "Query"] {
        assert!(names.contains(&name), "missing {} in {:?}", name, names);
    }
    // built-in scalars
    for name in ["Int", "Float", "String", "Boolean", "ID"] {
        assert!(names.contains(&name), "missing {} in {:?}", name, names);
    }
    // introspection types
    for name in ["__Schema", "__Type", "__Field", "__InputValue", "__EnumValue", "__Directive"] {
        assert!(names.contains(&name), "missing {} in {:?}", name, names);
    }
}

#[tokio::test]
async fn root_types_and_directives_are_reported() {
    let schema = mock_schema();
    let result = exec(
        &schema,
        "{ __schema {
            queryType { name }
            mutationType { name }
            directives { name }
        } }",
    )
    .await;
    assert_eq!(result["data"]["__schema"]["queryType"]["name"], json!("Query"));
    assert_eq!(result["data"]["__schema"]["mutationType"], json!(null));
    let directives: Vec<&str> = result["data"]["__schema"]["directives"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    for name in ["skip", "include", "deprecated", "specifiedBy"] {
        assert!(directives.contains(&name), "missing {:?}", name);
    }
}

#[tokio::test]
async fn type_lookup_resolves_wrapped_types() {
    let schema = mock_schema();
    let result = exec(
        &schema,
        r#"{ __type(name: "Query") {
            kind
            name
            fields {
                name
                type { kind ofType { kind name } }
            }
        } }"#,
    )
    .await;
    let fields = result["data"]["__type"]["fields"].as_array().unwrap();
    let all_users = fields.iter().find(|f| f["name"] == "allUsers").unwrap();
    assert_eq!(all_users["type"]["kind"], json!("LIST"));
    assert_eq!(all_users["type"]["ofType"]["kind"], json!("NON_NULL"));
}

#[tokio::test]
async fn deprecated_fields_are_filtered_by_default() {
    let schema = Schema::must_parse(
        r#"
        type Query {
            a: String
            b: String @deprecated
            c: String @deprecated(reason: "We don't like it")
        }
        "#,
        Resolvers::new()
            .field_fn("Query", "a", |_| Ok(Value::Null))
            .field_fn("Query", "b", |_| Ok(Value::Null))
            .field_fn("Query", "c", |_| Ok(Value::Null)),
    );

    let visible = exec(
        &schema,
        r#"{ __type(name: "Query") { fields { name } } }"#,
    )
    .await;
    let names: Vec<&str> = visible["data"]["__type"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a"]);

    let all = exec(
        &schema,
        r#"{ __type(name: "Query") {
            allFields: fields(includeDeprecated: true) {
                name
                isDeprecated
                deprecationReason
            }
        } }"#,
    )
    .await;
    assert_eq!(
        all["data"]["__type"]["allFields"],
        json!([
            {"name": "a", "isDeprecated": false, "deprecationReason": null},
            {"name": "b", "isDeprecated": true, "deprecationReason": "No longer supported"},
            {"name": "c", "isDeprecated": true, "deprecationReason": "We don't like it"}
        ])
    );
}

#[tokio::test]
async fn deprecated_enum_values_carry_reasons() {
    let schema = mock_schema();
    let result = exec(
        &schema,
        r#"{ __type(name: "Role") {
            enumValues(includeDeprecated: true) { name isDeprecated deprecationReason }
        } }"#,
    )
    .await;
    assert_eq!(
        result["data"]["__type"]["enumValues"],
        json!([
            {"name": "USER", "isDeprecated": false, "deprecationReason": null},
            {"name": "ADMIN", "isDeprecated": true, "deprecationReason": "all users are equal now"}
        ])
    );
}

#[tokio::test]
async fn specified_by_url_is_exposed() {
    let schema = mock_schema();
    let result = exec(
        &schema,
        r#"{ __type(name: "Time") { kind specifiedByURL } }"#,
    )
    .await;
    assert_eq!(
        result["data"]["__type"]["specifiedByURL"],
        json!("https://scalars.example/time")
    );
}

#[tokio::test]
async fn interfaces_report_possible_types() {
    let schema = mock_schema();
    let result = exec(
        &schema,
        r#"{ __type(name: "Node") { kind possibleTypes { name } } }"#,
    )
    .await;
    assert_eq!(
        result["data"]["__type"]["possibleTypes"],
        json!([{"name": "User"}])
    );
}

#[tokio::test]
async fn input_objects_report_fields_and_defaults() {
    let schema = mock_schema();
    let result = exec(
        &schema,
        r#"{ __type(name: "UserFilter") {
            inputFields { name defaultValue type { name } }
        } }"#,
    )
    .await;
    assert_eq!(
        result["data"]["__type"]["inputFields"],
        json!([{"name": "nameEq", "defaultValue": "\"any\"", "type": {"name": "String"}}])
    );
}

#[tokio::test]
async fn disabling_introspection_hides_the_meta_fields() {
    let schema = Schema::with_options(
        "type Query { hello: String! }",
        Resolvers::new().field_fn("Query", "hello", |_| {
            Ok(Value::String("Hello world!".to_owned()))
        }),
        SchemaOptions {
            disable_introspection: true,
            ..SchemaOptions::default()
        },
    )
    .unwrap();

    // __schema and __type are silently omitted
    assert_eq!(
        exec(&schema, "{ __schema { types { name } } hello }").await,
        json!({"data": {"hello": "Hello world!"}})
    );
    // __typename keeps working
    assert_eq!(
        exec(&schema, "{ __typename hello }").await,
        json!({"data": {"__typename": "Query", "hello": "Hello world!"}})
    );
}
