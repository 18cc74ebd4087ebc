#[macro_use]
extern crate pretty_assertions;

use futures::stream;
use futures::StreamExt;
use serde_json::json;

use graphql_server::prelude::*;

fn subscription_schema(events: Vec<FieldResult>) -> Schema {
    Schema::must_parse(
        "
        schema {
            query: Query
            subscription: Subscription
        }

        type Query {
            hello: String!
        }

        type Subscription {
            msg: String!
        }
        ",
        Resolvers::new()
            .field_fn("Query", "hello", |_| Ok(Value::String("hi".to_owned())))
            .stream("Subscription", "msg", move |_| {
                stream::iter(events.clone()).boxed()
            }),
    )
}

async fn collect(schema: &Schema, query: &str) -> Vec<serde_json::Value> {
    let responses = schema
        .subscribe(Context::new(), query, None, None)
        .unwrap();
    responses
        .map(|r| serde_json::to_value(&r).unwrap())
        .collect()
        .await
}

#[tokio::test]
async fn events_flow_through_the_selection_set() {
    let schema = subscription_schema(vec![
        Ok(Value::String("first".to_owned())),
        Ok(Value::String("second".to_owned())),
    ]);
    assert_eq!(
        collect(&schema, "subscription { msg }").await,
        vec![
            json!({"data": {"msg": "first"}}),
            json!({"data": {"msg": "second"}}),
        ]
    );
}

#[tokio::test]
async fn a_mid_stream_error_produces_an_error_payload() {
    let schema = subscription_schema(vec![
        Ok(Value::String("Hello subscription!".to_owned())),
        Err(ResolverError::new("resolver error")),
        Ok(Value::String("Hello again!".to_owned())),
    ]);
    let payloads = collect(&schema, "subscription { msg }").await;
    assert_eq!(payloads.len(), 3);
    assert_eq!(payloads[0], json!({"data": {"msg": "Hello subscription!"}}));
    assert_eq!(payloads[1]["data"], json!(null));
    assert_eq!(payloads[1]["errors"][0]["message"], json!("resolver error"));
    assert_eq!(payloads[2], json!({"data": {"msg": "Hello again!"}}));
}

#[tokio::test]
async fn aliases_apply_to_subscription_payloads() {
    let schema = subscription_schema(vec![Ok(Value::String("first".to_owned()))]);
    assert_eq!(
        collect(&schema, "subscription { renamed: msg }").await,
        vec![json!({"data": {"renamed": "first"}})]
    );
}

#[tokio::test]
async fn only_a_single_top_level_field_is_allowed() {
    let schema = subscription_schema(vec![]);
    let err = schema
        .subscribe(Context::new(), "subscription { msg again: msg }", None, None)
        .err()
        .unwrap();
    match err {
        SubscriptionError::GraphQLError(errors) => {
            assert_eq!(
                errors[0].message,
                "Only a single top-level field is allowed in subscriptions"
            );
        }
        other => panic!("expected a graphql error, got {:?}", other),
    }
}

#[tokio::test]
async fn queries_are_rejected_on_the_subscription_path() {
    let schema = subscription_schema(vec![]);
    let err = schema
        .subscribe(Context::new(), "{ hello }", None, None)
        .err()
        .unwrap();
    match err {
        SubscriptionError::GraphQLError(errors) => {
            assert_eq!(errors[0].message, "Not supported: Only subscriptions are supported");
        }
        other => panic!("expected a graphql error, got {:?}", other),
    }
}

#[tokio::test]
async fn cancellation_ends_the_stream() {
    let ctx = Context::new();
    let schema = subscription_schema(vec![
        Ok(Value::String("first".to_owned())),
        Ok(Value::String("second".to_owned())),
    ]);
    let responses = schema
        .subscribe(ctx.clone(), "subscription { msg }", None, None)
        .unwrap();
    ctx.cancel();
    let payloads: Vec<_> = responses.collect().await;
    assert_eq!(payloads.len(), 0);
}
