use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use revue_api::auth::{self, AppState, AppStateInner};
use revue_api::middleware::require_auth;
use revue_api::{feed, follows, media, posts, reviews, tickets};
use revue_db::Database;

fn test_app() -> Router {
    let db = Database::open_in_memory().unwrap();
    let media_dir = std::env::temp_dir().join(format!("revue-test-{}", Uuid::new_v4()));

    let state: AppState = Arc::new(AppStateInner {
        db,
        // must match the middleware's fallback secret
        jwt_secret: "dev-secret-change-me".into(),
        media_dir,
    });

    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/feed", get(feed::get_feed))
        .route("/posts", get(posts::get_posts))
        .route("/tickets", post(tickets::create_ticket))
        .route("/tickets/{ticket_id}", put(tickets::update_ticket))
        .route("/tickets/{ticket_id}", delete(tickets::delete_ticket))
        .route("/tickets/{ticket_id}/reviews", post(reviews::create_review))
        .route("/reviews", post(reviews::create_ticket_with_review))
        .route("/reviews/{review_id}", put(reviews::update_review))
        .route("/reviews/{review_id}", delete(reviews::delete_review))
        .route("/subscriptions", get(follows::get_subscriptions))
        .route("/subscriptions", post(follows::follow))
        .route("/subscriptions/{user_id}", delete(follows::unfollow))
        .route("/media", post(media::upload_image))
        .route("/media/{image_id}", get(media::download_image))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send_raw(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(app, req).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Registers a user and returns (user_id, token).
async fn register(app: &Router, username: &str) -> (String, String) {
    let body = json!({ "username": username, "password": "hunter2hunter2" });
    let (status, value) = send(app, request("POST", "/auth/register", None, Some(body))).await;
    assert_eq!(status, StatusCode::CREATED);
    (
        value["user_id"].as_str().unwrap().to_string(),
        value["token"].as_str().unwrap().to_string(),
    )
}

async fn create_ticket(app: &Router, token: &str, title: &str) -> Value {
    let (status, value) = send(
        app,
        request("POST", "/tickets", Some(token), Some(json!({ "title": title }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    value
}

async fn create_review(app: &Router, token: &str, ticket_id: &str, rating: u8) -> (StatusCode, Value) {
    send(
        app,
        request(
            "POST",
            &format!("/tickets/{}/reviews", ticket_id),
            Some(token),
            Some(json!({ "rating": rating, "headline": "A classic" })),
        ),
    )
    .await
}

async fn get_feed(app: &Router, token: &str) -> Vec<Value> {
    let (status, value) = send(app, request("GET", "/feed", Some(token), None)).await;
    assert_eq!(status, StatusCode::OK);
    value.as_array().unwrap().clone()
}

#[tokio::test]
async fn register_login_roundtrip() {
    let app = test_app();
    register(&app, "alice").await;

    let (status, value) = send(
        &app,
        request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "hunter2hunter2" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["username"], "alice");
    assert!(value["token"].as_str().is_some());

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong-password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_short_password_and_taken_username() {
    let app = test_app();
    register(&app, "alice").await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "bob", "password": "short" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "alice", "password": "hunter2hunter2" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = test_app();

    let (status, _) = send(&app, request("GET", "/feed", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/feed", Some("not-a-jwt"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn feed_contains_own_and_followed_posts_most_recent_first() {
    let app = test_app();
    let (_, token_a) = register(&app, "alice").await;
    let (_, token_b) = register(&app, "bob").await;

    // Alice follows Bob; Bob posts a ticket; Alice reviews it afterwards
    let (status, _) = send(
        &app,
        request("POST", "/subscriptions", Some(&token_a), Some(json!({ "username": "bob" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let ticket = create_ticket(&app, &token_b, "Dune").await;
    let ticket_id = ticket["id"].as_str().unwrap();

    let (status, _) = create_review(&app, &token_a, ticket_id, 5).await;
    assert_eq!(status, StatusCode::CREATED);

    // Alice: her review (newer) first, then Bob's ticket, flagged reviewed
    let feed_a = get_feed(&app, &token_a).await;
    assert_eq!(feed_a.len(), 2);
    assert_eq!(feed_a[0]["kind"], "review");
    assert_eq!(feed_a[1]["kind"], "ticket");
    assert_eq!(feed_a[1]["already_reviewed"], true);

    // Bob follows nobody, so Alice's review is not in his feed
    let feed_b = get_feed(&app, &token_b).await;
    assert_eq!(feed_b.len(), 1);
    assert_eq!(feed_b[0]["kind"], "ticket");
    assert_eq!(feed_b[0]["already_reviewed"], false);
}

#[tokio::test]
async fn follow_validates_target_self_and_duplicates() {
    let app = test_app();
    let (_, token_a) = register(&app, "alice").await;
    let (user_b, _) = register(&app, "bob").await;

    let (status, value) = send(
        &app,
        request("POST", "/subscriptions", Some(&token_a), Some(json!({ "username": "nonexistent" }))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["error"], "user does not exist");

    let (status, value) = send(
        &app,
        request("POST", "/subscriptions", Some(&token_a), Some(json!({ "username": "alice" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "cannot follow self");

    let (status, _) = send(
        &app,
        request("POST", "/subscriptions", Some(&token_a), Some(json!({ "username": "bob" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, value) = send(
        &app,
        request("POST", "/subscriptions", Some(&token_a), Some(json!({ "username": "bob" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(value["error"], "already following");

    let (status, value) = send(&app, request("GET", "/subscriptions", Some(&token_a), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["following"][0]["username"], "bob");
    assert!(value["followers"].as_array().unwrap().is_empty());

    // Unfollow removes the edge; a second unfollow finds nothing
    let (status, _) = send(
        &app,
        request("DELETE", &format!("/subscriptions/{}", user_b), Some(&token_a), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/subscriptions/{}", user_b), Some(&token_a), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let feed_after = get_feed(&app, &token_a).await;
    assert!(feed_after.is_empty());
}

#[tokio::test]
async fn duplicate_review_is_silently_skipped() {
    let app = test_app();
    let (_, token) = register(&app, "alice").await;

    let ticket = create_ticket(&app, &token, "Dune").await;
    let ticket_id = ticket["id"].as_str().unwrap();

    let (status, first) = create_review(&app, &token, ticket_id, 4).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = create_review(&app, &token, ticket_id, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["rating"], 4);

    // exactly one review row: the feed holds the ticket plus one review
    let feed = get_feed(&app, &token).await;
    assert_eq!(feed.len(), 2);
}

#[tokio::test]
async fn combined_create_persists_neither_on_invalid_review() {
    let app = test_app();
    let (_, token) = register(&app, "alice").await;

    let body = json!({
        "ticket": { "title": "Dune" },
        "review": { "rating": 7, "headline": "Out of range" },
    });
    let (status, _) = send(&app, request("POST", "/reviews", Some(&token), Some(body))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert!(get_feed(&app, &token).await.is_empty());
}

#[tokio::test]
async fn combined_create_persists_both_atomically() {
    let app = test_app();
    let (_, token) = register(&app, "alice").await;

    let body = json!({
        "ticket": { "title": "Dune", "description": "Worth a read?" },
        "review": { "rating": 5, "headline": "A classic", "body": "Yes." },
    });
    let (status, value) = send(&app, request("POST", "/reviews", Some(&token), Some(body))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(value["ticket"]["title"], "Dune");
    assert_eq!(value["review"]["rating"], 5);

    // both share a timestamp; the ticket wins the tie and is already reviewed
    let feed = get_feed(&app, &token).await;
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0]["kind"], "ticket");
    assert_eq!(feed[0]["already_reviewed"], true);
    assert_eq!(feed[1]["kind"], "review");
}

#[tokio::test]
async fn deleting_a_ticket_cascades_to_its_reviews() {
    let app = test_app();
    let (_, token_a) = register(&app, "alice").await;
    let (_, token_b) = register(&app, "bob").await;

    let ticket = create_ticket(&app, &token_b, "Dune").await;
    let ticket_id = ticket["id"].as_str().unwrap();

    let (status, _) = create_review(&app, &token_a, ticket_id, 3).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/tickets/{}", ticket_id), Some(&token_b), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Alice's review went down with the ticket
    assert!(get_feed(&app, &token_a).await.is_empty());
    assert!(get_feed(&app, &token_b).await.is_empty());
}

#[tokio::test]
async fn edit_and_delete_are_author_scoped() {
    let app = test_app();
    let (_, token_a) = register(&app, "alice").await;
    let (_, token_b) = register(&app, "bob").await;

    let ticket = create_ticket(&app, &token_a, "Dune").await;
    let ticket_id = ticket["id"].as_str().unwrap();

    // someone else's ticket is indistinguishable from a missing one
    let (status, _) = send(
        &app,
        request(
            "PUT",
            &format!("/tickets/{}", ticket_id),
            Some(&token_b),
            Some(json!({ "title": "Hijacked" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/tickets/{}", ticket_id), Some(&token_b), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the author can edit
    let (status, value) = send(
        &app,
        request(
            "PUT",
            &format!("/tickets/{}", ticket_id),
            Some(&token_a),
            Some(json!({ "title": "Dune Messiah" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["title"], "Dune Messiah");
}

#[tokio::test]
async fn review_edit_and_delete_lifecycle() {
    let app = test_app();
    let (_, token) = register(&app, "alice").await;

    let ticket = create_ticket(&app, &token, "Dune").await;
    let ticket_id = ticket["id"].as_str().unwrap();

    let (_, review) = create_review(&app, &token, ticket_id, 4).await;
    let review_id = review["id"].as_str().unwrap();

    let (status, value) = send(
        &app,
        request(
            "PUT",
            &format!("/reviews/{}", review_id),
            Some(&token),
            Some(json!({ "rating": 2, "headline": "On reflection" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["rating"], 2);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/reviews/{}", review_id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/reviews/{}", review_id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn posts_view_groups_own_tickets_with_reviews() {
    let app = test_app();
    let (_, token_a) = register(&app, "alice").await;
    let (_, token_b) = register(&app, "bob").await;

    let ticket = create_ticket(&app, &token_a, "Dune").await;
    let ticket_id = ticket["id"].as_str().unwrap();

    create_review(&app, &token_b, ticket_id, 3).await;
    create_review(&app, &token_a, ticket_id, 5).await;

    let (status, value) = send(&app, request("GET", "/posts", Some(&token_a), None)).await;
    assert_eq!(status, StatusCode::OK);

    let groups = value.as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["ticket"]["title"], "Dune");
    assert_eq!(groups[0]["my_review"]["rating"], 5);
    assert_eq!(groups[0]["other_reviews"].as_array().unwrap().len(), 1);
    assert_eq!(groups[0]["other_reviews"][0]["author_username"], "bob");

    // Bob authored no tickets, only a review: his posts view is empty
    let (_, value) = send(&app, request("GET", "/posts", Some(&token_b), None)).await;
    assert!(value.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn image_upload_attach_and_download() {
    let app = test_app();
    let (_, token) = register(&app, "alice").await;

    let image = vec![0x89u8, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];
    let req = Request::builder()
        .method("POST")
        .uri("/media")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(image.clone()))
        .unwrap();
    let (status, value) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let image_id = value["image_id"].as_str().unwrap().to_string();
    assert_eq!(value["size"], image.len());

    let (status, ticket) = send(
        &app,
        request(
            "POST",
            "/tickets",
            Some(&token),
            Some(json!({ "title": "Dune", "image_id": image_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["image_id"], image_id.as_str());

    let (status, bytes) = send_raw(
        &app,
        request("GET", &format!("/media/{}", image_id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, image);

    // a ticket referencing an unknown image is rejected
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/tickets",
            Some(&token),
            Some(json!({ "title": "Dune", "image_id": Uuid::new_v4() })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn field_constraints_are_enforced() {
    let app = test_app();
    let (_, token) = register(&app, "alice").await;

    let (status, _) = send(
        &app,
        request("POST", "/tickets", Some(&token), Some(json!({ "title": "  " }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        request("POST", "/tickets", Some(&token), Some(json!({ "title": "x".repeat(129) }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let ticket = create_ticket(&app, &token, "Dune").await;
    let ticket_id = ticket["id"].as_str().unwrap();

    let (status, _) = create_review(&app, &token, ticket_id, 6).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/tickets/{}/reviews", ticket_id),
            Some(&token),
            Some(json!({ "rating": 3, "headline": "" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
