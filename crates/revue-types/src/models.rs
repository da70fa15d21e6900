use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field length limits, shared by handler validation and tests.
pub const TITLE_MAX_LEN: usize = 128;
pub const DESCRIPTION_MAX_LEN: usize = 2048;
pub const HEADLINE_MAX_LEN: usize = 128;
pub const BODY_MAX_LEN: usize = 8192;
pub const RATING_MAX: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A request for review of a book or article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_id: Option<Uuid>,
    pub author_id: Uuid,
    pub author_username: String,
    pub created_at: DateTime<Utc>,
}

/// A rated, written response to a ticket. At most one review per
/// (ticket, author) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub rating: u8,
    pub headline: String,
    pub body: Option<String>,
    pub author_id: Uuid,
    pub author_username: String,
    pub created_at: DateTime<Utc>,
}

/// Feed item: a ticket or a review, merged into one reverse-chronological
/// stream. Tickets carry `already_reviewed` so a client knows whether to
/// offer a "respond" action.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Post {
    Ticket {
        #[serde(flatten)]
        ticket: Ticket,
        already_reviewed: bool,
    },
    Review {
        #[serde(flatten)]
        review: Review,
    },
}

impl Post {
    /// Common sort key for the feed merge.
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Post::Ticket { ticket, .. } => ticket.created_at,
            Post::Review { review } => review.created_at,
        }
    }
}
