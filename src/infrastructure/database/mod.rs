//! SQLite-backed store for users, streams and the song queue

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::application::errors::StorageError;
use crate::domain::entities::{SongInfo, SongRequest, User};
use crate::domain::traits::Store;

/// Timestamps are stored as unix milliseconds
fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!("Opened database at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    /// One lock per logical operation; never held across an await
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_tables(&self) -> Result<(), StorageError> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                login TEXT NOT NULL,
                name TEXT NOT NULL,
                level INTEGER NOT NULL DEFAULT 100,
                points INTEGER NOT NULL DEFAULT 0,
                last_active INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_users_login ON users(login);
            CREATE INDEX IF NOT EXISTS idx_users_last_active ON users(last_active);

            CREATE TABLE IF NOT EXISTS streams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                ended_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS song_info (
                youtube_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                duration INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS song_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stream_id INTEGER NOT NULL,
                youtube_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                date_added INTEGER NOT NULL,
                date_played INTEGER,
                skip_after INTEGER,
                FOREIGN KEY (stream_id) REFERENCES streams(id)
            );
            CREATE INDEX IF NOT EXISTS idx_song_requests_user ON song_requests(stream_id, user_id);",
        )?;
        Ok(())
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        let last_active: Option<i64> = row.get(5)?;
        Ok(User {
            id: row.get(0)?,
            login: row.get(1)?,
            name: row.get(2)?,
            level: row.get(3)?,
            points: row.get(4)?,
            last_active: last_active.and_then(from_millis),
        })
    }
}

const USER_COLUMNS: &str = "id, login, name, level, points, last_active";

#[async_trait]
impl Store for SqliteStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let user = self
            .conn()
            .query_row(&sql, [id], Self::user_from_row)
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StorageError> {
        let sql = format!(
            "SELECT {} FROM users WHERE login = ?1 ORDER BY last_active DESC LIMIT 1",
            USER_COLUMNS
        );
        let user = self
            .conn()
            .query_row(&sql, [login.to_lowercase()], Self::user_from_row)
            .optional()?;
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO users (id, login, name, level, points, last_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                login = excluded.login,
                name = excluded.name,
                level = excluded.level,
                points = excluded.points,
                last_active = excluded.last_active",
            params![
                user.id,
                user.login,
                user.name,
                user.level,
                user.points,
                user.last_active.map(to_millis),
            ],
        )?;
        Ok(())
    }

    async fn touch_user(&self, user: &User, now: DateTime<Utc>) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO users (id, login, name, level, points, last_active)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)
             ON CONFLICT(id) DO UPDATE SET
                login = excluded.login,
                name = excluded.name,
                last_active = excluded.last_active",
            params![user.id, user.login, user.name, user.level, to_millis(now)],
        )?;
        Ok(())
    }

    async fn add_points_to_active(&self, amount: i64, since: DateTime<Utc>) -> Result<u64, StorageError> {
        let rows = self.conn().execute(
            "UPDATE users SET points = points + ?1 WHERE last_active >= ?2",
            params![amount, to_millis(since)],
        )?;
        Ok(rows as u64)
    }

    async fn charge_points(&self, user_id: &str, cost: i64) -> Result<bool, StorageError> {
        if cost <= 0 {
            return Ok(true);
        }
        let rows = self.conn().execute(
            "UPDATE users SET points = points - ?1 WHERE id = ?2 AND points >= ?1",
            params![cost, user_id],
        )?;
        Ok(rows == 1)
    }

    async fn refund_points(&self, user_id: &str, amount: i64) -> Result<(), StorageError> {
        if amount <= 0 {
            return Ok(());
        }
        self.conn().execute(
            "UPDATE users SET points = points + ?1 WHERE id = ?2",
            params![amount, user_id],
        )?;
        Ok(())
    }

    async fn current_stream_id(&self) -> Result<Option<i64>, StorageError> {
        let id = self
            .conn()
            .query_row(
                "SELECT id FROM streams WHERE ended_at IS NULL ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    async fn start_stream(&self, title: &str) -> Result<i64, StorageError> {
        let conn = self.conn();
        let live: Option<i64> = conn
            .query_row(
                "SELECT id FROM streams WHERE ended_at IS NULL ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = live {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO streams (title, started_at) VALUES (?1, ?2)",
            params![title, to_millis(Utc::now())],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn end_stream(&self) -> Result<bool, StorageError> {
        let rows = self.conn().execute(
            "UPDATE streams SET ended_at = ?1 WHERE ended_at IS NULL",
            [to_millis(Utc::now())],
        )?;
        Ok(rows > 0)
    }

    async fn find_song_info(&self, youtube_id: &str) -> Result<Option<SongInfo>, StorageError> {
        let info = self
            .conn()
            .query_row(
                "SELECT youtube_id, title, duration FROM song_info WHERE youtube_id = ?1",
                [youtube_id],
                |row| {
                    Ok(SongInfo {
                        youtube_id: row.get(0)?,
                        title: row.get(1)?,
                        duration: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }

    async fn save_song_info(&self, info: &SongInfo) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO song_info (youtube_id, title, duration) VALUES (?1, ?2, ?3)",
            params![info.youtube_id, info.title, info.duration],
        )?;
        Ok(())
    }

    async fn count_unplayed_songs(&self, stream_id: i64, user_id: &str) -> Result<u32, StorageError> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM song_requests
             WHERE stream_id = ?1 AND user_id = ?2 AND date_played IS NULL",
            params![stream_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn add_song_request(&self, request: &SongRequest) -> Result<i64, StorageError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO song_requests (stream_id, youtube_id, user_id, date_added, date_played, skip_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                request.stream_id,
                request.youtube_id,
                request.user_id,
                to_millis(request.date_added),
                request.date_played.map(to_millis),
                request.skip_after,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
