//! Admin content CRUD, public mirrors, and session pooling through the router.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

/// Cookie header for an admin with a fixed browser session.
async fn admin_session(app: &axum::Router) -> String {
    let jwt = login(app, "admin", "admin123").await;
    format!("{jwt}; session_id=browser-1")
}

#[tokio::test]
async fn crud_round_through_admin_api() {
    let (app, _) = app().await;
    let cookie = admin_session(&app).await;

    let event = json!({
        "title": {"en": "Winter clothing drive", "ur": "سرمائی کپڑوں کی مہم"},
        "date": "2026-12-05",
        "category": "relief",
        "showOnHome": true
    });
    let resp = send(&app, request("POST", "/api/admin/events", Some(&cookie), Some(event))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await;
    assert_eq!(created["success"], true);
    assert_eq!(created["message"], "Event created successfully");
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert!(created["data"]["createdAt"].is_string());

    let resp = send(
        &app,
        request("GET", &format!("/api/admin/events?id={id}"), Some(&cookie), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = json_body(resp).await;
    assert_eq!(fetched["data"]["title"]["en"], "Winter clothing drive");

    let resp = send(
        &app,
        request(
            "PUT",
            &format!("/api/admin/events?id={id}"),
            Some(&cookie),
            Some(json!({"venue": "Lahore", "id": "hijack"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = json_body(resp).await;
    assert_eq!(updated["data"]["id"], id.as_str());
    assert_eq!(updated["data"]["venue"], "Lahore");
    assert_eq!(updated["data"]["date"], "2026-12-05");

    let resp = send(&app, request("GET", "/api/admin/events", Some(&cookie), None)).await;
    let listed = json_body(resp).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let uri = format!("/api/admin/events?id={id}");
    let resp = send(&app, request("DELETE", &uri, Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["message"], "Event deleted successfully");

    let resp = send(&app, request("DELETE", &uri, Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"], "Event not found");
}

#[tokio::test]
async fn validation_and_lookup_errors() {
    let (app, _) = app().await;
    let cookie = admin_session(&app).await;

    let resp = send(
        &app,
        request("POST", "/api/admin/blogs", Some(&cookie), Some(json!({"title": "Only a title"}))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].as_str().unwrap().contains("content"));

    let resp = send(
        &app,
        request("PUT", "/api/admin/blogs", Some(&cookie), Some(json!({"title": "x"}))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Blog post ID is required");

    let resp = send(&app, request("DELETE", "/api/admin/blogs", Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
        &app,
        request("GET", "/api/admin/blogs?id=does-not-exist", Some(&cookie), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"], "Blog post not found");

    let resp = send(&app, request("GET", "/api/admin/donations", Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_mirror_filters() {
    let (app, _) = app().await;
    let cookie = admin_session(&app).await;

    for (title, home, category) in [
        ("Literacy", true, "education"),
        ("Clean water", false, "health"),
        ("Scholarships", true, "education"),
        ("Mobile clinic", true, "health"),
    ] {
        let body = json!({
            "title": title,
            "description": "d",
            "showOnHome": home,
            "category": category,
            "status": "active"
        });
        let resp = send(
            &app,
            request("POST", "/api/admin/programs", Some(&cookie), Some(body)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let titles = |json: serde_json::Value| -> Vec<String> {
        json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["title"].as_str().unwrap().to_string())
            .collect()
    };

    let resp = send(&app, request("GET", "/api/programs", None, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        titles(json_body(resp).await),
        ["Mobile clinic", "Scholarships", "Clean water", "Literacy"]
    );

    let resp = send(
        &app,
        request("GET", "/api/programs?showOnHome=true&limit=2", None, None),
    )
    .await;
    assert_eq!(titles(json_body(resp).await), ["Mobile clinic", "Scholarships"]);

    let resp = send(
        &app,
        request("GET", "/api/programs?homepage=true&category=education", None, None),
    )
    .await;
    assert_eq!(titles(json_body(resp).await), ["Scholarships", "Literacy"]);

    let resp = send(&app, request("GET", "/api/programs?status=archived", None, None)).await;
    assert!(titles(json_body(resp).await).is_empty());

    let resp = send(&app, request("GET", "/api/partners", None, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(titles(json_body(resp).await).is_empty());

    let resp = send(&app, request("GET", "/api/donations", None, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_get_one() {
    let (app, _) = app().await;
    let cookie = admin_session(&app).await;
    let resp = send(
        &app,
        request(
            "POST",
            "/api/admin/testimonials",
            Some(&cookie),
            Some(json!({"name": "Ayesha", "message": "Changed my family's life"})),
        ),
    )
    .await;
    let id = json_body(resp).await["data"]["id"].as_str().unwrap().to_string();

    let resp = send(&app, request("GET", &format!("/api/testimonials/{id}"), None, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"]["name"], "Ayesha");

    let resp = send(&app, request("GET", "/api/testimonials/missing", None, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"], "Testimonial not found");
}

#[tokio::test]
async fn session_cookie_is_issued_when_absent() {
    let (app, _) = app().await;
    let resp = send(&app, request("GET", "/api/hero", None, None)).await;
    let sid = cookie_value(&resp, "session_id").expect("session cookie");
    assert_eq!(sid.len(), 32);
    let raw = set_cookies(&resp)
        .into_iter()
        .find(|c| c.starts_with("session_id="))
        .unwrap();
    assert!(raw.contains("Max-Age=2592000"), "{raw}");

    let resp = send(
        &app,
        request("GET", "/api/hero", Some(&format!("session_id={sid}")), None),
    )
    .await;
    assert!(cookie_value(&resp, "session_id").is_none());
}

#[tokio::test]
async fn requests_release_their_lease() {
    let (app, state) = app().await;
    let cookie = admin_session(&app).await;
    for _ in 0..3 {
        let resp = send(&app, request("GET", "/api/admin/hero", Some(&cookie), None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = send(
        &app,
        request("POST", "/api/admin/hero", Some(&cookie), Some(json!({"subtitle": "no title"}))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(state.sessions.request_count("browser-1").await, Some(0));
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_session_handle_is_torn_down() {
    let (app, state) = app().await;
    let resp = send(
        &app,
        request("GET", "/api/navbar", Some("session_id=visitor-7"), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(state.sessions.request_count("visitor-7").await, Some(0));

    tokio::time::sleep(state.sessions.idle_timeout() + Duration::from_millis(1)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(state.sessions.is_empty());

    // The next request reconnects transparently.
    let resp = send(
        &app,
        request("GET", "/api/navbar", Some("session_id=visitor-7"), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(state.sessions.len(), 1);
}
