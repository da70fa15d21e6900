//! Row-to-model conversion. DB rows carry TEXT ids and timestamps; the API
//! models are typed. Corrupt values are logged and defaulted rather than
//! failing the whole request.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use revue_db::models::{ReviewRow, TicketRow};
use revue_types::models::{Review, Ticket};

pub(crate) fn parse_uuid(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_created_at(value: &str, id: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's "YYYY-MM-DD HH:MM:SS" form, no timezone. Parse as
            // naive UTC and convert.
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on '{}': {}", value, id, e);
            DateTime::default()
        })
}

pub(crate) fn ticket_from_row(row: TicketRow) -> Ticket {
    let id = parse_uuid(&row.id, "ticket id");
    let created_at = parse_created_at(&row.created_at, &row.id);
    let image_id = row.image_id.as_deref().map(|v| parse_uuid(v, "image id"));
    let author_id = parse_uuid(&row.author_id, "author id");

    Ticket {
        id,
        title: row.title,
        description: row.description,
        image_id,
        author_id,
        author_username: row.author_username,
        created_at,
    }
}

pub(crate) fn review_from_row(row: ReviewRow) -> Review {
    let id = parse_uuid(&row.id, "review id");
    let created_at = parse_created_at(&row.created_at, &row.id);
    let ticket_id = parse_uuid(&row.ticket_id, "ticket id");
    let author_id = parse_uuid(&row.author_id, "author id");

    Review {
        id,
        ticket_id,
        rating: row.rating,
        headline: row.headline,
        body: row.body,
        author_id,
        author_username: row.author_username,
        created_at,
    }
}
