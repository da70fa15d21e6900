use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use revue_db::models::{NewReview, NewTicket};
use revue_types::api::{Claims, ReviewRequest, TicketWithReviewRequest, TicketWithReviewResponse};
use revue_types::models::{BODY_MAX_LEN, HEADLINE_MAX_LEN, RATING_MAX};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::tickets::{ensure_image_exists, validate_ticket};

/// Respond to an existing ticket. When the caller already has a review on
/// this ticket the submission is skipped and the existing review comes back
/// unchanged — a duplicate is success, not an error.
pub async fn create_review(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tid = ticket_id.to_string();
    let author_id = claims.sub.to_string();

    state
        .db
        .get_ticket(&tid)?
        .ok_or(ApiError::NotFound("ticket not found"))?;

    if let Some(existing) = state.db.review_for_ticket_by_author(&tid, &author_id)? {
        return Ok((StatusCode::OK, Json(convert::review_from_row(existing))));
    }

    validate_review(&req)?;

    let review_id = Uuid::new_v4().to_string();
    let created_at = revue_db::timestamp();

    let inserted = state.db.insert_review(&NewReview {
        id: &review_id,
        ticket_id: &tid,
        rating: req.rating,
        headline: &req.headline,
        body: req.body.as_deref(),
        author_id: &author_id,
        created_at: &created_at,
    })?;

    if inserted {
        let row = state
            .db
            .get_review(&review_id)?
            .ok_or(ApiError::NotFound("review not found"))?;
        Ok((StatusCode::CREATED, Json(convert::review_from_row(row))))
    } else {
        // Lost a race against a concurrent submit; the earlier row wins.
        let row = state
            .db
            .review_for_ticket_by_author(&tid, &author_id)?
            .ok_or(ApiError::NotFound("review not found"))?;
        Ok((StatusCode::OK, Json(convert::review_from_row(row))))
    }
}

/// Create a ticket and its first review in one submission. Both parts must
/// validate; the two inserts run in one transaction, so a failure persists
/// neither.
pub async fn create_ticket_with_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TicketWithReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_ticket(&req.ticket)?;
    validate_review(&req.review)?;
    ensure_image_exists(&state, req.ticket.image_id)?;

    let ticket_id = Uuid::new_v4().to_string();
    let review_id = Uuid::new_v4().to_string();
    let author_id = claims.sub.to_string();
    let image_id = req.ticket.image_id.map(|id| id.to_string());
    let created_at = revue_db::timestamp();

    state.db.create_ticket_with_review(
        &NewTicket {
            id: &ticket_id,
            title: &req.ticket.title,
            description: req.ticket.description.as_deref(),
            image_id: image_id.as_deref(),
            author_id: &author_id,
            created_at: &created_at,
        },
        &NewReview {
            id: &review_id,
            ticket_id: &ticket_id,
            rating: req.review.rating,
            headline: &req.review.headline,
            body: req.review.body.as_deref(),
            author_id: &author_id,
            created_at: &created_at,
        },
    )?;

    let ticket_row = state
        .db
        .get_ticket(&ticket_id)?
        .ok_or(ApiError::NotFound("ticket not found"))?;
    let review_row = state
        .db
        .get_review(&review_id)?
        .ok_or(ApiError::NotFound("review not found"))?;

    Ok((
        StatusCode::CREATED,
        Json(TicketWithReviewResponse {
            ticket: convert::ticket_from_row(ticket_row),
            review: convert::review_from_row(review_row),
        }),
    ))
}

pub async fn update_review(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_review(&req)?;

    let rid = review_id.to_string();

    let updated = state.db.update_review(
        &rid,
        &claims.sub.to_string(),
        req.rating,
        &req.headline,
        req.body.as_deref(),
    )?;
    if !updated {
        return Err(ApiError::NotFound("review not found"));
    }

    let row = state
        .db
        .get_review(&rid)?
        .ok_or(ApiError::NotFound("review not found"))?;

    Ok(Json(convert::review_from_row(row)))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .delete_review(&review_id.to_string(), &claims.sub.to_string())?;
    if !deleted {
        return Err(ApiError::NotFound("review not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn validate_review(req: &ReviewRequest) -> Result<(), ApiError> {
    if req.rating > RATING_MAX {
        return Err(ApiError::Validation("rating must be between 0 and 5"));
    }
    if req.headline.trim().is_empty() {
        return Err(ApiError::Validation("headline must not be empty"));
    }
    if req.headline.len() > HEADLINE_MAX_LEN {
        return Err(ApiError::Validation("headline too long"));
    }
    if let Some(body) = &req.body {
        if body.len() > BODY_MAX_LEN {
            return Err(ApiError::Validation("body too long"));
        }
    }
    Ok(())
}
