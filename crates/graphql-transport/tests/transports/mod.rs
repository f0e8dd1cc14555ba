use axum::{body::Body, Router};
use graphql_transport::{
    transport::{Get, Post},
    Server,
};
use http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use crate::harness::{get, get_with, post_json, send, EchoExecutor};

fn server() -> (EchoExecutor, Server) {
    let executor = EchoExecutor::default();
    (executor.clone(), Server::new_default(executor))
}

#[tokio::test]
async fn options_lists_allowed_methods() {
    let (executor, server) = server();

    let request = Request::options("/query").body(Body::empty()).unwrap();
    let response = send(&server, request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::ALLOW], "OPTIONS, GET, POST");
    assert!(response.body.is_empty());
    assert_eq!(executor.prepared(), 0);
}

#[tokio::test]
async fn head_is_not_allowed() {
    let (executor, server) = server();

    let request = Request::head("/query").body(Body::empty()).unwrap();
    let response = send(&server, request).await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.body.is_empty());
    assert_eq!(executor.prepared(), 0);
}

#[tokio::test]
async fn get_query() {
    let (executor, server) = server();

    let response = send(
        &server,
        get_with(&[
            ("query", "query Hello($name: String) { hello(name: $name) }"),
            ("operationName", "Hello"),
            ("variables", r#"{"name":"world"}"#),
            ("extensions", r#"{"tracing":true}"#),
        ]),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type(), Some("application/json"));
    insta::assert_json_snapshot!(response.json(), @r###"
    {
      "data": {
        "operationType": "query",
        "operationName": "Hello",
        "query": "query Hello($name: String) { hello(name: $name) }",
        "variables": {
          "name": "world"
        },
        "uploads": {}
      }
    }
    "###);
    assert_eq!(executor.dispatched(), 1);
}

#[tokio::test]
async fn get_is_deterministic() {
    let (_, server) = server();

    let first = send(&server, get_with(&[("query", "{ hello }")])).await;
    let second = send(&server, get_with(&[("query", "{ hello }")])).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn get_with_invalid_variables() {
    let (executor, server) = server();

    let response = send(&server, get_with(&[("query", "{ hello }"), ("variables", "{")])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text(),
        r#"{"errors":[{"message":"variables could not be decoded"}],"data":null}"#
    );
    assert_eq!(executor.prepared(), 0);
}

#[tokio::test]
async fn get_with_invalid_extensions() {
    let (executor, server) = server();

    let response = send(&server, get_with(&[("query", "{ hello }"), ("extensions", "[1, 2]")])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text(),
        r#"{"errors":[{"message":"extensions could not be decoded"}],"data":null}"#
    );
    assert_eq!(executor.prepared(), 0);
}

#[tokio::test]
async fn get_with_duplicated_parameters() {
    let (executor, server) = server();

    let response = send(&server, get("/query?query=%7Ba%7D&query=%7Bb%7D")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text(),
        r#"{"errors":[{"message":"query parameters could not be decoded"}],"data":null}"#
    );
    assert_eq!(executor.prepared(), 0);
}

#[tokio::test]
async fn get_only_runs_queries() {
    let (executor, server) = server();

    let response = send(&server, get_with(&[("query", "mutation { hello }")])).await;

    assert_eq!(response.status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(
        response.text(),
        r#"{"errors":[{"message":"GET requests only allow query operations"}],"data":null}"#
    );
    assert_eq!(executor.prepared(), 1);
    assert_eq!(executor.dispatched(), 0);
}

#[tokio::test]
async fn get_without_query() {
    let (executor, server) = server();

    let response = send(&server, get("/query")).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.text(),
        r#"{"errors":[{"message":"no operation provided"}],"data":null}"#
    );
    assert_eq!(executor.dispatched(), 0);
}

#[tokio::test]
async fn websocket_upgrades_are_not_supported() {
    let (executor, server) = server();

    let request = Request::get("/query")
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .body(Body::empty())
        .unwrap();
    let response = send(&server, request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text(),
        r#"{"errors":[{"message":"transport not supported"}],"data":null}"#
    );
    assert_eq!(executor.prepared(), 0);
}

#[tokio::test]
async fn post_json_request() {
    let (_, server) = server();

    let response = send(
        &server,
        post_json(r#"{"query": "mutation Add { add }", "variables": null, "operationName": "Add"}"#),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    insta::assert_json_snapshot!(response.json(), @r###"
    {
      "data": {
        "operationType": "mutation",
        "operationName": "Add",
        "query": "mutation Add { add }",
        "variables": {},
        "uploads": {}
      }
    }
    "###);
}

#[tokio::test]
async fn post_accepts_content_type_parameters() {
    let (_, server) = server();

    let request = Request::post("/query")
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from(r#"{"query": "{ hello }"}"#))
        .unwrap();
    let response = send(&server, request).await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn post_with_invalid_json() {
    let (executor, server) = server();

    let response = send(&server, post_json(r#"{"query": "#)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let body = response.json();
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("json body could not be decoded: "));
    assert_eq!(executor.prepared(), 0);
}

#[tokio::test]
async fn post_with_wrongly_typed_fields() {
    let (_, server) = server();

    let response = send(&server, post_json(r#"{"query": "{ hello }", "variables": []}"#)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protocol_errors_are_unprocessable() {
    let (executor, server) = server();

    let response = send(&server, post_json(r#"{"query": "invalid"}"#)).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.text(),
        r#"{"errors":[{"message":"syntax error"}],"data":null}"#
    );
    assert_eq!(executor.dispatched(), 0);
}

#[tokio::test]
async fn unsupported_requests() {
    let (executor, server) = server();

    let text = Request::post("/query")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("{ hello }"))
        .unwrap();
    let put = Request::builder()
        .method(Method::PUT)
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"query": "{ hello }"}"#))
        .unwrap();

    for request in [text, put] {
        let response = send(&server, request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.text(),
            r#"{"errors":[{"message":"transport not supported"}],"data":null}"#
        );
    }
    assert_eq!(executor.prepared(), 0);
}

#[tokio::test]
async fn panics_are_recovered() {
    let (executor, server) = server();

    let response = send(&server, post_json(r#"{"query": "{ panic }"}"#)).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.text(),
        r#"{"errors":[{"message":"internal system error"}],"data":null}"#
    );
    assert_eq!(executor.dispatched(), 1);

    // The server keeps serving afterwards.
    let response = send(&server, post_json(r#"{"query": "{ hello }"}"#)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn transports_are_tried_in_registration_order() {
    let executor = EchoExecutor::default();
    let server = Server::builder(executor.clone()).transport(Get).build();

    let response = send(&server, post_json(r#"{"query": "{ hello }"}"#)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(&server, get_with(&[("query", "{ hello }")])).await;
    assert_eq!(response.status, StatusCode::OK);

    let server = Server::builder(executor.clone()).build();
    let response = send(&server, get_with(&[("query", "{ hello }")])).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let server = Server::builder(executor).transport(Post).transport(Get).build();
    let response = send(&server, post_json(r#"{"query": "{ hello }"}"#)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn mounted_on_a_router() {
    let (_, server) = server();
    let router = Router::new().route_service("/graphql", server);

    let request = Request::post("/graphql")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"query": "{ hello }"}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
}
