use crate::Database;
use crate::models::{FollowUserRow, MediaRow, NewReview, NewTicket, ReviewRow, TicketRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

const TICKET_SELECT: &str = "SELECT t.id, t.title, t.description, t.image_id, t.author_id, u.username, t.created_at
     FROM tickets t
     LEFT JOIN users u ON t.author_id = u.id";

const REVIEW_SELECT: &str = "SELECT r.id, r.ticket_id, r.rating, r.headline, r.body, r.author_id, u.username, r.created_at
     FROM reviews r
     LEFT JOIN users u ON r.author_id = u.id";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str, created_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, created_at),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Tickets --

    pub fn insert_ticket(&self, ticket: &NewTicket) -> Result<()> {
        self.with_conn(|conn| {
            insert_ticket(conn, ticket)?;
            Ok(())
        })
    }

    pub fn get_ticket(&self, id: &str) -> Result<Option<TicketRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE t.id = ?1", TICKET_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], ticket_from_row).optional()?;
            Ok(row)
        })
    }

    /// Author-scoped update. Returns false when the ticket does not exist or
    /// the caller is not its author — the two cases are indistinguishable.
    pub fn update_ticket(
        &self,
        id: &str,
        author_id: &str,
        title: &str,
        description: Option<&str>,
        image_id: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE tickets SET title = ?1, description = ?2, image_id = ?3
                 WHERE id = ?4 AND author_id = ?5",
                rusqlite::params![title, description, image_id, id, author_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Author-scoped delete. Reviews referencing the ticket go with it
    /// (ON DELETE CASCADE).
    pub fn delete_ticket(&self, id: &str, author_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM tickets WHERE id = ?1 AND author_id = ?2",
                (id, author_id),
            )?;
            Ok(n > 0)
        })
    }

    pub fn tickets_by_author(&self, author_id: &str) -> Result<Vec<TicketRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE t.author_id = ?1 ORDER BY t.created_at DESC, t.rowid DESC",
                TICKET_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([author_id], ticket_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch tickets for a set of author ids (the feed scope).
    pub fn tickets_by_authors(&self, author_ids: &[String]) -> Result<Vec<TicketRow>> {
        if author_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE t.author_id IN ({}) ORDER BY t.created_at DESC, t.rowid DESC",
                TICKET_SELECT,
                placeholders(author_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = author_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), ticket_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reviews --

    /// Insert a review unless the (ticket, author) pair already has one.
    /// Returns true when a row was inserted. The UNIQUE constraint makes
    /// this safe against a concurrent double-submit.
    pub fn insert_review(&self, review: &NewReview) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO reviews (id, ticket_id, rating, headline, body, author_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    review.id,
                    review.ticket_id,
                    review.rating,
                    review.headline,
                    review.body,
                    review.author_id,
                    review.created_at
                ],
            )?;
            Ok(n > 0)
        })
    }

    /// Insert a ticket and its first review in one transaction — both rows
    /// or neither.
    pub fn create_ticket_with_review(&self, ticket: &NewTicket, review: &NewReview) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_ticket(&tx, ticket)?;
            tx.execute(
                "INSERT INTO reviews (id, ticket_id, rating, headline, body, author_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    review.id,
                    review.ticket_id,
                    review.rating,
                    review.headline,
                    review.body,
                    review.author_id,
                    review.created_at
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_review(&self, id: &str) -> Result<Option<ReviewRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE r.id = ?1", REVIEW_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], review_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn review_for_ticket_by_author(&self, ticket_id: &str, author_id: &str) -> Result<Option<ReviewRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE r.ticket_id = ?1 AND r.author_id = ?2", REVIEW_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row((ticket_id, author_id), review_from_row).optional()?;
            Ok(row)
        })
    }

    /// Author-scoped update, same NotFound conflation as tickets.
    pub fn update_review(
        &self,
        id: &str,
        author_id: &str,
        rating: u8,
        headline: &str,
        body: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE reviews SET rating = ?1, headline = ?2, body = ?3
                 WHERE id = ?4 AND author_id = ?5",
                rusqlite::params![rating, headline, body, id, author_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_review(&self, id: &str, author_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM reviews WHERE id = ?1 AND author_id = ?2",
                (id, author_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Batch-fetch reviews for a set of author ids (the feed scope).
    pub fn reviews_by_authors(&self, author_ids: &[String]) -> Result<Vec<ReviewRow>> {
        if author_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE r.author_id IN ({}) ORDER BY r.created_at DESC, r.rowid DESC",
                REVIEW_SELECT,
                placeholders(author_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = author_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), review_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch all reviews attached to a set of tickets (eliminates N+1
    /// in the posts view).
    pub fn reviews_for_tickets(&self, ticket_ids: &[String]) -> Result<Vec<ReviewRow>> {
        if ticket_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE r.ticket_id IN ({}) ORDER BY r.created_at DESC, r.rowid DESC",
                REVIEW_SELECT,
                placeholders(ticket_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = ticket_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), review_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Which of the given tickets has this author already reviewed?
    pub fn reviewed_ticket_ids(&self, author_id: &str, ticket_ids: &[String]) -> Result<Vec<String>> {
        if ticket_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT ticket_id FROM reviews WHERE author_id = ? AND ticket_id IN ({})",
                placeholders(ticket_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;

            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&author_id];
            for id in ticket_ids {
                params.push(id as &dyn rusqlite::types::ToSql);
            }

            let rows = stmt
                .query_map(params.as_slice(), |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follows --

    /// Insert a follow edge. Returns false when the edge already exists;
    /// the UNIQUE constraint closes the race between check and insert.
    pub fn insert_follow(&self, id: &str, follower_id: &str, followed_id: &str, created_at: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO follows (id, follower_id, followed_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, follower_id, followed_id, created_at),
            )?;
            Ok(n > 0)
        })
    }

    /// Returns false when there was no such edge.
    pub fn delete_follow(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                (follower_id, followed_id),
            )?;
            Ok(n > 0)
        })
    }

    pub fn follow_exists(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                    (follower_id, followed_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(exists.is_some())
        })
    }

    /// Users this user follows, with usernames resolved.
    pub fn following(&self, user_id: &str) -> Result<Vec<FollowUserRow>> {
        self.with_conn(|conn| query_follow_users(conn, "followed_id", "follower_id", user_id))
    }

    /// Users following this user, with usernames resolved.
    pub fn followers(&self, user_id: &str) -> Result<Vec<FollowUserRow>> {
        self.with_conn(|conn| query_follow_users(conn, "follower_id", "followed_id", user_id))
    }

    /// Ids of followed users — the feed scope, minus self.
    pub fn followed_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT followed_id FROM follows WHERE follower_id = ?1")?;
            let rows = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    // -- Media --

    pub fn insert_media(&self, id: &str, owner_id: &str, size: i64, created_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO media (id, owner_id, size, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, owner_id, size, created_at),
            )?;
            Ok(())
        })
    }

    pub fn get_media(&self, id: &str) -> Result<Option<MediaRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, owner_id, size, created_at FROM media WHERE id = ?1")?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(MediaRow {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        size: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }
}

fn insert_ticket(conn: &Connection, ticket: &NewTicket) -> Result<()> {
    conn.execute(
        "INSERT INTO tickets (id, title, description, image_id, author_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            ticket.id,
            ticket.title,
            ticket.description,
            ticket.image_id,
            ticket.author_id,
            ticket.created_at
        ],
    )?;
    Ok(())
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password, is_active, is_staff, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                is_active: row.get(3)?,
                is_staff: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_follow_users(
    conn: &Connection,
    select_col: &str,
    where_col: &str,
    user_id: &str,
) -> Result<Vec<FollowUserRow>> {
    let sql = format!(
        "SELECT f.{}, u.username
         FROM follows f
         LEFT JOIN users u ON f.{} = u.id
         WHERE f.{} = ?1
         ORDER BY u.username",
        select_col, select_col, where_col
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(FollowUserRow {
                user_id: row.get(0)?,
                username: row.get::<_, Option<String>>(1)?.unwrap_or_else(|| "unknown".to_string()),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn ticket_from_row(row: &rusqlite::Row) -> rusqlite::Result<TicketRow> {
    Ok(TicketRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_id: row.get(3)?,
        author_id: row.get(4)?,
        author_username: row.get::<_, Option<String>>(5)?.unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(6)?,
    })
}

fn review_from_row(row: &rusqlite::Row) -> rusqlite::Result<ReviewRow> {
    Ok(ReviewRow {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        rating: row.get(2)?,
        headline: row.get(3)?,
        body: row.get(4)?,
        author_id: row.get(5)?,
        author_username: row.get::<_, Option<String>>(6)?.unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(7)?,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
