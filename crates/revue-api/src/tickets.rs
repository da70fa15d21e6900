use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use revue_db::models::NewTicket;
use revue_types::api::{Claims, TicketRequest};
use revue_types::models::{DESCRIPTION_MAX_LEN, TITLE_MAX_LEN};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_ticket(&req)?;
    ensure_image_exists(&state, req.image_id)?;

    let ticket_id = Uuid::new_v4().to_string();
    let author_id = claims.sub.to_string();
    let image_id = req.image_id.map(|id| id.to_string());
    let created_at = revue_db::timestamp();

    state.db.insert_ticket(&NewTicket {
        id: &ticket_id,
        title: &req.title,
        description: req.description.as_deref(),
        image_id: image_id.as_deref(),
        author_id: &author_id,
        created_at: &created_at,
    })?;

    let row = state
        .db
        .get_ticket(&ticket_id)?
        .ok_or(ApiError::NotFound("ticket not found"))?;

    Ok((StatusCode::CREATED, Json(convert::ticket_from_row(row))))
}

/// Author-scoped edit: a missing ticket and someone else's ticket both come
/// back 404.
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_ticket(&req)?;
    ensure_image_exists(&state, req.image_id)?;

    let tid = ticket_id.to_string();
    let image_id = req.image_id.map(|id| id.to_string());

    let updated = state.db.update_ticket(
        &tid,
        &claims.sub.to_string(),
        &req.title,
        req.description.as_deref(),
        image_id.as_deref(),
    )?;
    if !updated {
        return Err(ApiError::NotFound("ticket not found"));
    }

    let row = state
        .db
        .get_ticket(&tid)?
        .ok_or(ApiError::NotFound("ticket not found"))?;

    Ok(Json(convert::ticket_from_row(row)))
}

/// Author-scoped delete; the ticket's reviews cascade with it.
pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .delete_ticket(&ticket_id.to_string(), &claims.sub.to_string())?;
    if !deleted {
        return Err(ApiError::NotFound("ticket not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn validate_ticket(req: &TicketRequest) -> Result<(), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty"));
    }
    if req.title.len() > TITLE_MAX_LEN {
        return Err(ApiError::Validation("title too long"));
    }
    if let Some(description) = &req.description {
        if description.len() > DESCRIPTION_MAX_LEN {
            return Err(ApiError::Validation("description too long"));
        }
    }
    Ok(())
}

pub(crate) fn ensure_image_exists(state: &AppState, image_id: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(image_id) = image_id {
        if state.db.get_media(&image_id.to_string())?.is_none() {
            return Err(ApiError::Validation("unknown image"));
        }
    }
    Ok(())
}
