// bridge-server/tests/resolve.rs
mod support;

use actix_web::{test, web, App, ResponseError};
use bridge_server::api::{self, RATE_LIMITED_PATHS};
use bridge_server::middleware::RateLimiter;
use serde_json::{json, Value};
use support::*;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

macro_rules! app {
    ($state:expr, $limit:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .wrap(RateLimiter::new(
                    RATE_LIMITED_PATHS.iter().map(|p| p.to_string()).collect(),
                    $limit,
                ))
                .configure(api::configure),
        )
        .await
    };
}

fn run_query() -> String {
    format!("{}:runQuery", DOCS)
}

async fn mount_query(server: &MockServer, field: &str, response: Value) {
    Mock::given(method("POST"))
        .and(path(run_query()))
        .and(body_partial_json(json!({
            "structuredQuery": { "where": { "fieldFilter": { "field": { "fieldPath": field } } } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(server)
        .await;
}

fn no_match() -> Value {
    json!([{ "readTime": "2024-05-01T00:00:00Z" }])
}

fn resolve_request(user_id: &str) -> test::TestRequest {
    test::TestRequest::get().uri(&format!("/resolve-userid?userId={}", user_id))
}

#[actix_web::test]
async fn test_missing_user_id() {
    let google = google().await;
    let app = app!(state(&google, None).await, 30);

    for uri in ["/resolve-userid", "/resolve-userid?userId=", "/resolve-userid?userId=%20%20"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status().as_u16(), 400, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Missing userId" }));
    }
}

#[actix_web::test]
async fn test_unparseable_query_gets_json_error() {
    let google = google().await;
    let app = app!(state(&google, None).await, 30);

    let req = test::TestRequest::get().uri("/resolve-userid?userId=a&userId=b").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "Missing userId" }));
}

#[actix_web::test]
async fn test_dot_segment_id_is_not_found() {
    let google = google().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/userIdIndex", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "documents": [] })))
        .expect(0)
        .mount(&google)
        .await;
    mount_query(&google, "userId", no_match()).await;
    mount_query(&google, "id", no_match()).await;
    let app = app!(state(&google, None).await, 30);

    let resp = test::call_service(&app, resolve_request("..").to_request()).await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "User not found" }));
}

#[actix_web::test]
async fn test_index_hit() {
    let google = google().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/userIdIndex/CS2101", DOCS)))
        .and(header("authorization", "Bearer ya29.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(firestore_doc(
            "userIdIndex",
            "CS2101",
            &[("email", "a@b.com"), ("uid", "u123"), ("userName", "Ada"), ("role", "student")],
        )))
        .expect(1)
        .mount(&google)
        .await;
    Mock::given(method("POST"))
        .and(path(run_query()))
        .respond_with(ResponseTemplate::new(200).set_body_json(no_match()))
        .expect(0)
        .mount(&google)
        .await;
    let app = app!(state(&google, None).await, 30);

    let resp = test::call_service(&app, resolve_request("CS2101").to_request()).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "email": "a@b.com",
            "uid": "u123",
            "userId": "CS2101",
            "userName": "Ada",
            "role": "student",
        })
    );
}

#[actix_web::test]
async fn test_legacy_field_fallback() {
    let google = google().await;
    mount_query(&google, "userId", no_match()).await;
    mount_query(
        &google,
        "id",
        json!([{
            "document": firestore_doc("users", "u777", &[("id", "CS2101"), ("email", "legacy@b.com"), ("name", "Grace")]),
            "readTime": "2024-05-01T00:00:00Z",
        }]),
    )
    .await;
    let app = app!(state(&google, None).await, 30);

    let resp = test::call_service(&app, resolve_request("CS2101").to_request()).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], "legacy@b.com");
    assert_eq!(body["uid"], "u777");
    assert_eq!(body["userId"], "CS2101");
    assert_eq!(body["userName"], "Grace");
}

#[actix_web::test]
async fn test_unknown_user_id() {
    let google = google().await;
    mount_query(&google, "userId", no_match()).await;
    mount_query(&google, "id", no_match()).await;
    let app = app!(state(&google, None).await, 30);

    let resp = test::call_service(&app, resolve_request("ghost").to_request()).await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "User not found" }));
}

#[actix_web::test]
async fn test_record_without_email() {
    let google = google().await;
    mount_query(
        &google,
        "userId",
        json!([{ "document": firestore_doc("users", "u1", &[("userId", "CS2101"), ("name", "Ada")]) }]),
    )
    .await;
    let app = app!(state(&google, None).await, 30);

    let resp = test::call_service(&app, resolve_request("CS2101").to_request()).await;
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "User record is missing an email");
}

#[actix_web::test]
async fn test_directory_failure() {
    let google = google().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/userIdIndex/CS2101", DOCS)))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&google)
        .await;
    let app = app!(state(&google, None).await, 30);

    let resp = test::call_service(&app, resolve_request("CS2101").to_request()).await;
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "User lookup failed");
    assert!(body["details"].as_str().unwrap().contains("500"));
}

#[actix_web::test]
async fn test_lookups_are_rate_limited() {
    let google = google().await;
    mount_query(&google, "userId", no_match()).await;
    mount_query(&google, "id", no_match()).await;
    let app = app!(state(&google, None).await, 2);

    for _ in 0..2 {
        let resp = test::call_service(&app, resolve_request("ghost").to_request()).await;
        assert_eq!(resp.status().as_u16(), 404);
    }

    let err = test::try_call_service(&app, resolve_request("ghost").to_request())
        .await
        .err()
        .expect("third lookup should be limited");
    assert_eq!(err.as_response_error().status_code().as_u16(), 429);

    // Other routes stay open
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status().as_u16(), 200);
}
