use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use miniscrape_client::build_service;
use miniscrape_core::config::{AppConfig, CacheConfig};
use miniscrape_server::routes;
use miniscrape_server::state::AppState;

use crate::common::{LINKS, TEST_ADMIN_TOKEN, setup_app, setup_test_app, setup_test_app_no_auth};

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn delete_cache(query: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::delete(format!("/api/v1/cache{query}"));
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn categories_list_pages_and_tags() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(
            Request::get("/api/v1/categories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json[0]["name"], "links");
    assert_eq!(
        json[0]["pages"],
        serde_json::json!(["weekly-pdf", "canteen", "closed"])
    );
    assert_eq!(json[0]["tags"], serde_json::json!(["brno", "pdf", "prague"]));
}

#[tokio::test]
async fn missing_categories_dir_is_a_config_error() {
    let root = tempfile::tempdir().unwrap();
    let config = AppConfig {
        categories_dir: root.path().join("missing"),
        cache: CacheConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let state = Arc::new(AppState {
        service: build_service(&config).unwrap(),
        admin_token: None,
    });

    let response = routes::router(state)
        .oneshot(
            Request::get("/api/v1/categories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "config_error");
    assert!(json["message"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn pages_return_full_definitions() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(Request::get("/api/v1/pages").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json[0]["pages"][0]["url"], "https://pub.example/menu.pdf");
    assert_eq!(json[0]["pages"][0]["category"], "links");
}

#[tokio::test]
async fn content_skips_disabled_pages() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(Request::get("/api/v1/content").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item["page"]["codename"] != "closed"));
    assert!(items.iter().all(|item| item["status"] == "ok"));
}

#[tokio::test]
async fn content_filters_by_tags_and_shapes_the_page() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(
            Request::get("/api/v1/content?t=brno&t=pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = json_body(response).await;
    assert_eq!(
        json,
        serde_json::json!([{
            "content": "https://pub.example/menu.pdf",
            "status": "ok",
            "kind": "pdf",
            "page": {
                "name": "Weekly PDF",
                "codename": "weekly-pdf",
                "homepage": "https://pub.example",
                "tags": ["brno", "pdf"],
                "category": "links"
            }
        }])
    );
}

#[tokio::test]
async fn content_force_includes_disabled_pages() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(
            Request::get("/api/v1/content?n=closed&f=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = json_body(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["content"], "https://closed.example");
}

#[tokio::test]
async fn content_unknown_category_is_empty() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(
            Request::get("/api/v1/content?c=drinks")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn invalidate_without_token_returns_401() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(delete_cache("?c=links", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn invalidate_with_wrong_token_returns_401() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(delete_cache("?c=links", Some("wrong-token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn no_admin_token_returns_403() {
    let app = setup_test_app_no_auth();

    let response = app
        .router
        .oneshot(delete_cache("", Some("any-token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "forbidden");
}

#[tokio::test]
async fn invalidate_drops_cached_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/menu"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><div class="menu"><p>Polévka</p></div></body></html>"#),
        )
        .expect(2)
        .mount(&server)
        .await;

    let food = format!(
        "pages:\n  - codename: bistro\n    url: {}/menu\n    query: div.menu\n    filters:\n      html:\n        textOnly: true\n",
        server.uri()
    );
    let app = setup_app(&[("food", &food), ("links", LINKS)], Some(TEST_ADMIN_TOKEN));

    // Two reads hit the upstream once; after invalidation it is fetched again.
    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/v1/content?c=food")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json[0]["content"], "Polévka");
        assert_eq!(json[0]["kind"], "content");
    }

    let response = app
        .router
        .clone()
        .oneshot(delete_cache("?c=food&n=bistro", Some(TEST_ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .oneshot(
            Request::get("/api/v1/content?c=food")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(json_body(response).await[0]["content"], "Polévka");
    assert!(app.cache_root.read_dir().unwrap().next().is_some());
}
