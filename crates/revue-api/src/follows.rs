use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use revue_types::api::{Claims, FollowEntry, FollowRequest, SubscriptionsResponse};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

/// Both sides of the caller's follow graph: who they follow, who follows them.
pub async fn get_subscriptions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();

    let following = state.db.following(&user_id)?;
    let followers = state.db.followers(&user_id)?;

    Ok(Json(SubscriptionsResponse {
        following: following.into_iter().map(entry_from_row).collect(),
        followers: followers.into_iter().map(entry_from_row).collect(),
    }))
}

/// Follow by username. Checked in order: the user must exist, must not be
/// the caller, and must not already be followed.
pub async fn follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FollowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let follower_id = claims.sub.to_string();

    let target = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::NotFound("user does not exist"))?;

    if target.id == follower_id {
        return Err(ApiError::InvalidOperation("cannot follow self"));
    }

    if state.db.follow_exists(&follower_id, &target.id)? {
        return Err(ApiError::Conflict("already following"));
    }

    let inserted = state.db.insert_follow(
        &Uuid::new_v4().to_string(),
        &follower_id,
        &target.id,
        &revue_db::timestamp(),
    )?;
    if !inserted {
        // Lost a race against a concurrent follow of the same user
        return Err(ApiError::Conflict("already following"));
    }

    Ok(StatusCode::CREATED)
}

pub async fn unfollow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .delete_follow(&claims.sub.to_string(), &user_id.to_string())?;
    if !deleted {
        return Err(ApiError::NotFound("subscription not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn entry_from_row(row: revue_db::models::FollowUserRow) -> FollowEntry {
    FollowEntry {
        user_id: convert::parse_uuid(&row.user_id, "user id"),
        username: row.username,
    }
}
