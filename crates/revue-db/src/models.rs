/// Database row types — these map directly to SQLite rows.
/// Distinct from revue-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: String,
}

pub struct TicketRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_id: Option<String>,
    pub author_id: String,
    pub author_username: String,
    pub created_at: String,
}

pub struct ReviewRow {
    pub id: String,
    pub ticket_id: String,
    pub rating: u8,
    pub headline: String,
    pub body: Option<String>,
    pub author_id: String,
    pub author_username: String,
    pub created_at: String,
}

pub struct FollowUserRow {
    pub user_id: String,
    pub username: String,
}

pub struct MediaRow {
    pub id: String,
    pub owner_id: String,
    pub size: i64,
    pub created_at: String,
}

/// Insert parameters for a ticket.
pub struct NewTicket<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub image_id: Option<&'a str>,
    pub author_id: &'a str,
    pub created_at: &'a str,
}

/// Insert parameters for a review.
pub struct NewReview<'a> {
    pub id: &'a str,
    pub ticket_id: &'a str,
    pub rating: u8,
    pub headline: &'a str,
    pub body: Option<&'a str>,
    pub author_id: &'a str,
    pub created_at: &'a str,
}
