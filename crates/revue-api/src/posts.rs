use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::error;

use revue_db::models::ReviewRow;
use revue_types::api::{Claims, TicketPosts};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

/// The caller's own tickets, newest first, each paired with their own review
/// (if any) and everyone else's reviews.
pub async fn get_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();

    let db = state.clone();
    let uid = user_id.clone();
    let (tickets, review_rows) = tokio::task::spawn_blocking(move || {
        let tickets = db.db.tickets_by_author(&uid)?;

        let ticket_ids: Vec<String> = tickets.iter().map(|t| t.id.clone()).collect();
        let reviews = db.db.reviews_for_tickets(&ticket_ids)?;

        Ok::<_, anyhow::Error>((tickets, reviews))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("posts query task failed"))
    })??;

    // Group reviews by ticket (cheap in-memory work, fine on the async thread)
    let mut by_ticket: HashMap<String, Vec<ReviewRow>> = HashMap::new();
    for row in review_rows {
        by_ticket.entry(row.ticket_id.clone()).or_default().push(row);
    }

    let groups: Vec<TicketPosts> = tickets
        .into_iter()
        .map(|ticket_row| {
            let mut my_review = None;
            let mut other_reviews = Vec::new();

            for row in by_ticket.remove(&ticket_row.id).unwrap_or_default() {
                if row.author_id == user_id {
                    my_review = Some(convert::review_from_row(row));
                } else {
                    other_reviews.push(convert::review_from_row(row));
                }
            }

            TicketPosts {
                ticket: convert::ticket_from_row(ticket_row),
                my_review,
                other_reviews,
            }
        })
        .collect();

    Ok(Json(groups))
}
