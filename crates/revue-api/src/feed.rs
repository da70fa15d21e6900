use std::collections::HashSet;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::error;

use revue_types::api::Claims;
use revue_types::models::Post;

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

/// The main feed: every ticket and review authored by the caller or by
/// anyone the caller follows, most recent first.
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // Run all blocking DB queries off the async runtime
    let db = state.clone();
    let uid = claims.sub.to_string();
    let (tickets, reviews, reviewed) = tokio::task::spawn_blocking(move || {
        let mut scope = db.db.followed_ids(&uid)?;
        scope.push(uid.clone());

        let tickets = db.db.tickets_by_authors(&scope)?;
        let reviews = db.db.reviews_by_authors(&scope)?;

        let ticket_ids: Vec<String> = tickets.iter().map(|t| t.id.clone()).collect();
        let reviewed = db.db.reviewed_ticket_ids(&uid, &ticket_ids)?;

        Ok::<_, anyhow::Error>((tickets, reviews, reviewed))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("feed query task failed"))
    })??;

    let reviewed: HashSet<String> = reviewed.into_iter().collect();

    let mut posts: Vec<Post> = Vec::with_capacity(tickets.len() + reviews.len());
    for row in tickets {
        let already_reviewed = reviewed.contains(&row.id);
        posts.push(Post::Ticket {
            ticket: convert::ticket_from_row(row),
            already_reviewed,
        });
    }
    for row in reviews {
        posts.push(Post::Review {
            review: convert::review_from_row(row),
        });
    }

    // Merge the two streams: most recent first. The sort is stable, so
    // equal timestamps keep their per-table order.
    posts.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

    Ok(Json(posts))
}
