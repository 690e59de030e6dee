//! HTTP tests for publishing and published static pages.

use axum::http::{header, StatusCode};
use pagewright_core::new_entity_id;
use pagewright_storage::ContentStore;
use pagewright_template::BEHAVIOR_MARKER;
use serde_json::json;

#[path = "support/app.rs"]
mod app;
use app::test_app;

#[tokio::test]
async fn static_page_is_404_until_published() -> Result<(), String> {
    let app = test_app()?;

    let before = app.get("/p/about").await?;
    assert_eq!(before.status, StatusCode::NOT_FOUND);

    let response = app
        .post_json(
            "/api/v1/publish",
            json!({"pageId": app.scenario.about.page_id, "pageType": "static"}),
        )
        .await?;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json()?;
    assert_eq!(body["success"], true);
    assert_eq!(body["pageType"], "static");
    assert_eq!(body["pageId"], app.scenario.about.page_id.to_string());
    assert!(body["publishedAt"].is_string());

    let after = app.get("/p/about").await?;
    assert_eq!(after.status, StatusCode::OK);
    assert!(after
        .header(header::CONTENT_TYPE)
        .unwrap_or_default()
        .starts_with("text/html"));
    let html = after.text();
    assert!(html.contains("<h1>About Acme Roofing</h1>"));
    assert!(html.contains("25 years serving"));
    assert!(html.contains("#1d4ed8"));
    assert!(!html.contains("{{"));
    assert_eq!(html.matches(BEHAVIOR_MARKER).count(), 1);
    Ok(())
}

#[tokio::test]
async fn service_publish_falls_back_to_template() -> Result<(), String> {
    let app = test_app()?;
    let service_id = app.scenario.service.service_id;

    let response = app
        .post_json(
            "/api/v1/publish",
            json!({"pageId": service_id, "pageType": "service"}),
        )
        .await?;
    assert_eq!(response.status, StatusCode::OK);

    let service = app
        .scenario
        .store
        .service_get(service_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("missing service")?;
    let published = service.published_html.ok_or("not published")?;
    assert!(published.contains("Starting at $1,500"));
    assert!(published.contains(BEHAVIOR_MARKER));
    assert!(service.published_at.is_some());
    Ok(())
}

#[tokio::test]
async fn publish_missing_arguments_is_400() -> Result<(), String> {
    let app = test_app()?;

    let no_type = app
        .post_json(
            "/api/v1/publish",
            json!({"pageId": app.scenario.about.page_id}),
        )
        .await?;
    assert_eq!(no_type.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_type.json()?["code"], "MISSING_FIELD");

    let no_id = app
        .post_json("/api/v1/publish", json!({"pageType": "static"}))
        .await?;
    assert_eq!(no_id.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn publish_invalid_arguments_is_400() -> Result<(), String> {
    let app = test_app()?;

    let bad_id = app
        .post_json(
            "/api/v1/publish",
            json!({"pageId": "not-a-uuid", "pageType": "static"}),
        )
        .await?;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);

    let bad_type = app
        .post_json(
            "/api/v1/publish",
            json!({"pageId": app.scenario.about.page_id, "pageType": "blog"}),
        )
        .await?;
    assert_eq!(bad_type.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn publish_unknown_record_is_404() -> Result<(), String> {
    let app = test_app()?;

    for page_type in ["static", "service"] {
        let response = app
            .post_json(
                "/api/v1/publish",
                json!({"pageId": new_entity_id(), "pageType": page_type}),
            )
            .await?;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", page_type);
        assert!(response.json()?["error"].is_string());
    }
    Ok(())
}

#[tokio::test]
async fn publish_persistence_failure_is_500() -> Result<(), String> {
    let app = test_app()?;
    app.scenario.store.set_fail_persistence(true);

    let response = app
        .post_json(
            "/api/v1/publish",
            json!({"pageId": app.scenario.about.page_id, "pageType": "static"}),
        )
        .await?;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()?["code"], "PERSISTENCE_FAILED");

    app.scenario.store.set_fail_persistence(false);
    assert_eq!(app.get("/p/about").await?.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn republish_replaces_served_static_page() -> Result<(), String> {
    let app = test_app()?;
    let publish = json!({"pageId": app.scenario.about.page_id, "pageType": "static"});

    app.post_json("/api/v1/publish", publish.clone()).await?;
    assert!(app.get("/p/about").await?.text().contains("About Acme Roofing"));

    let mut about = app.scenario.about.clone();
    about.html_draft = Some("<html><body><h1>About {{business_name}}, est. 1999</h1></body></html>".to_string());
    app.scenario
        .store
        .put_static_page(about)
        .map_err(|e| e.to_string())?;

    app.post_json("/api/v1/publish", publish).await?;
    assert!(app.get("/p/about").await?.text().contains("est. 1999"));
    Ok(())
}
