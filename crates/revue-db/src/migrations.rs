use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            is_active   INTEGER NOT NULL DEFAULT 1,
            is_staff    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tickets (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT,
            image_id    TEXT,
            author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_author
            ON tickets(author_id, created_at);

        CREATE TABLE IF NOT EXISTS reviews (
            id          TEXT PRIMARY KEY,
            ticket_id   TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
            rating      INTEGER NOT NULL CHECK (rating BETWEEN 0 AND 5),
            headline    TEXT NOT NULL,
            body        TEXT,
            author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            UNIQUE(ticket_id, author_id)
        );

        CREATE INDEX IF NOT EXISTS idx_reviews_author
            ON reviews(author_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_reviews_ticket
            ON reviews(ticket_id);

        CREATE TABLE IF NOT EXISTS follows (
            id          TEXT PRIMARY KEY,
            follower_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            followed_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            CHECK (follower_id <> followed_id),
            UNIQUE(follower_id, followed_id)
        );

        CREATE TABLE IF NOT EXISTS media (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            size        INTEGER NOT NULL,
            created_at  TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
