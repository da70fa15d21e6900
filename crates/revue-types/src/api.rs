use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Review, Ticket};

// -- JWT Claims --

/// JWT claims shared between token creation (auth handlers) and validation
/// (middleware). Canonical definition lives here in revue-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Tickets --

/// Payload for ticket create and edit — the two take the same fields.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketRequest {
    pub title: String,
    pub description: Option<String>,
    pub image_id: Option<Uuid>,
}

// -- Reviews --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub rating: u8,
    pub headline: String,
    pub body: Option<String>,
}

/// Combined submission: a new ticket plus its first review, persisted
/// atomically — both rows or neither.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketWithReviewRequest {
    pub ticket: TicketRequest,
    pub review: ReviewRequest,
}

#[derive(Debug, Serialize)]
pub struct TicketWithReviewResponse {
    pub ticket: Ticket,
    pub review: Review,
}

// -- Posts --

/// One of the caller's tickets paired with their own review (if any) and
/// everyone else's.
#[derive(Debug, Serialize)]
pub struct TicketPosts {
    pub ticket: Ticket,
    pub my_review: Option<Review>,
    pub other_reviews: Vec<Review>,
}

// -- Subscriptions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowEntry {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionsResponse {
    pub following: Vec<FollowEntry>,
    pub followers: Vec<FollowEntry>,
}

// -- Media --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub image_id: Uuid,
    pub size: u64,
}
