use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use revue_api::auth::{self, AppState, AppStateInner};
use revue_api::middleware::require_auth;
use revue_api::{feed, follows, media, posts, reviews, tickets};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revue=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("REVUE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("REVUE_DB_PATH").unwrap_or_else(|_| "revue.db".into());
    let media_dir = std::env::var("REVUE_MEDIA_DIR").unwrap_or_else(|_| "media".into());
    let host = std::env::var("REVUE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("REVUE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = revue_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        media_dir: PathBuf::from(media_dir),
    });

    // Routes
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
        .layer(DefaultBodyLimit::max(media::MAX_IMAGE_SIZE + 1024))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Revue server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
