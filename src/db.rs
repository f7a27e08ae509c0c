//! Postgres storage adapter: players, bans, warnings, tickets, matches,
//! lobby membership, friends and the admin action log.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use tracing::info;

use crate::config;

/// A registered player
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub tg_id: i64,
    pub nickname: String,
    pub game_id: String,
    pub zf: i32,
    pub matches: i32,
    pub wins: i32,
    pub losses: i32,
    pub kills: i32,
    pub deaths: i32,
    pub reg_date: DateTime<Utc>,
}

impl User {
    /// Win rate in percent; 0 when no matches were played
    pub fn win_rate(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            f64::from(self.wins) * 100.0 / f64::from(self.matches)
        }
    }

    /// Kills per death; kills count as-is when the player never died
    pub fn kd(&self) -> f64 {
        if self.deaths == 0 {
            f64::from(self.kills)
        } else {
            f64::from(self.kills) / f64::from(self.deaths)
        }
    }

    /// Average kills per match; 0 when no matches were played
    pub fn avg_kills(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            f64::from(self.kills) / f64::from(self.matches)
        }
    }
}

/// A ban row; `expires_at = NULL` means the ban is permanent
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BanRecord {
    pub id: i64,
    pub nickname: String,
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One played game of one player
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MatchRecord {
    pub id: i64,
    pub nickname: String,
    pub result: String,
    pub kills: i32,
    pub deaths: i32,
    pub played_at: DateTime<Utc>,
}

/// An admin action log row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LogRecord {
    pub id: i64,
    pub actor: i64,
    pub action: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a lobby join attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
    Full,
}

/// Outcome of a friend-add attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FriendOutcome {
    Added,
    NotFound,
    SelfAdd,
    Duplicate,
}

/// Initialize the database schema
///
/// Idempotent; runs at startup before the dispatcher is built.
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            tg_id BIGINT PRIMARY KEY,
            nickname TEXT NOT NULL UNIQUE,
            game_id TEXT NOT NULL,
            zf INTEGER NOT NULL DEFAULT 0,
            matches INTEGER NOT NULL DEFAULT 0,
            wins INTEGER NOT NULL DEFAULT 0,
            losses INTEGER NOT NULL DEFAULT 0,
            kills INTEGER NOT NULL DEFAULT 0,
            deaths INTEGER NOT NULL DEFAULT 0,
            reg_date TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bans (
            id BIGSERIAL PRIMARY KEY,
            nickname TEXT NOT NULL,
            reason TEXT NOT NULL,
            expires_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create bans table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS warnings (
            id BIGSERIAL PRIMARY KEY,
            nickname TEXT NOT NULL,
            reason TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create warnings table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tickets (
            id BIGSERIAL PRIMARY KEY,
            tg_id BIGINT NOT NULL,
            subject TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create tickets table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS matches (
            id BIGSERIAL PRIMARY KEY,
            nickname TEXT NOT NULL,
            result TEXT NOT NULL,
            kills INTEGER NOT NULL,
            deaths INTEGER NOT NULL,
            played_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create matches table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS lobby_members (
            lobby_id INTEGER NOT NULL,
            tg_id BIGINT NOT NULL,
            joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (lobby_id, tg_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create lobby_members table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS friends (
            tg_id BIGINT NOT NULL,
            friend_tg_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (tg_id, friend_tg_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create friends table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS logs (
            id BIGSERIAL PRIMARY KEY,
            actor BIGINT NOT NULL,
            action TEXT NOT NULL,
            details TEXT NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create logs table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

// ---- users ----

pub async fn get_user_by_tg_id(pool: &PgPool, tg_id: i64) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE tg_id = $1")
        .bind(tg_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read user by tg_id")
}

pub async fn get_user_by_nickname(pool: &PgPool, nickname: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE nickname = $1")
        .bind(nickname)
        .fetch_optional(pool)
        .await
        .context("Failed to read user by nickname")
}

pub async fn nickname_taken(pool: &PgPool, nickname: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE nickname = $1")
        .bind(nickname)
        .fetch_one(pool)
        .await
        .context("Failed to check nickname")?;
    Ok(count > 0)
}

/// Create a player row after the registration dialogue completed
///
/// Returns false when the nickname or tg_id was taken concurrently;
/// the dialogue re-prompts in that case.
pub async fn create_user(pool: &PgPool, tg_id: i64, nickname: &str, game_id: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO users (tg_id, nickname, game_id) VALUES ($1, $2, $3)
         ON CONFLICT DO NOTHING",
    )
    .bind(tg_id)
    .bind(nickname)
    .bind(game_id)
    .execute(pool)
    .await
    .context("Failed to insert user")?;

    let created = result.rows_affected() > 0;
    if created {
        info!(tg_id = tg_id, nickname = %nickname, "Registered new player");
    }
    Ok(created)
}

/// Apply one game's outcome to the player's counters
///
/// ZF points move by +25 per win and -20 per loss, floored at zero.
pub async fn update_user_stats(
    pool: &PgPool,
    nickname: &str,
    won: bool,
    kills: i32,
    deaths: i32,
) -> Result<()> {
    sqlx::query(
        "UPDATE users SET
            matches = matches + 1,
            wins = wins + $2,
            losses = losses + $3,
            kills = kills + $4,
            deaths = deaths + $5,
            zf = GREATEST(zf + $6, 0)
         WHERE nickname = $1",
    )
    .bind(nickname)
    .bind(i32::from(won))
    .bind(i32::from(!won))
    .bind(kills)
    .bind(deaths)
    .bind(if won { 25 } else { -20 })
    .execute(pool)
    .await
    .context("Failed to update user stats")?;
    Ok(())
}

pub async fn top_users_by_zf(pool: &PgPool, limit: i64) -> Result<Vec<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY zf DESC, wins DESC LIMIT $1")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to read rating")
}

pub async fn count_users(pool: &PgPool) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")
}

pub async fn recent_users(pool: &PgPool, limit: i64) -> Result<Vec<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY reg_date DESC LIMIT $1")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to read recent users")
}

// ---- bans ----

pub async fn insert_ban(
    pool: &PgPool,
    nickname: &str,
    reason: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query("INSERT INTO bans (nickname, reason, expires_at) VALUES ($1, $2, $3)")
        .bind(nickname)
        .bind(reason)
        .bind(expires_at)
        .execute(pool)
        .await
        .context("Failed to insert ban")?;
    info!(nickname = %nickname, expires_at = ?expires_at, "Ban recorded");
    Ok(())
}

/// Latest ban row for a player, if any
pub async fn active_ban_for(pool: &PgPool, nickname: &str) -> Result<Option<BanRecord>> {
    sqlx::query_as::<_, BanRecord>(
        "SELECT * FROM bans WHERE nickname = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(nickname)
    .fetch_optional(pool)
    .await
    .context("Failed to read ban")
}

/// Remove all ban rows of a player; returns true when any existed
pub async fn delete_bans_for(pool: &PgPool, nickname: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM bans WHERE nickname = $1")
        .bind(nickname)
        .execute(pool)
        .await
        .context("Failed to delete bans")?;
    Ok(result.rows_affected() > 0)
}

// ---- warnings ----

pub async fn insert_warning(pool: &PgPool, nickname: &str, reason: &str) -> Result<()> {
    sqlx::query("INSERT INTO warnings (nickname, reason) VALUES ($1, $2)")
        .bind(nickname)
        .bind(reason)
        .execute(pool)
        .await
        .context("Failed to insert warning")?;
    Ok(())
}

pub async fn count_warnings_for(pool: &PgPool, nickname: &str) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM warnings WHERE nickname = $1")
        .bind(nickname)
        .fetch_one(pool)
        .await
        .context("Failed to count warnings")
}

// ---- tickets ----

pub async fn insert_ticket(pool: &PgPool, tg_id: i64, subject: &str) -> Result<i64> {
    let id: i64 =
        sqlx::query_scalar("INSERT INTO tickets (tg_id, subject) VALUES ($1, $2) RETURNING id")
            .bind(tg_id)
            .bind(subject)
            .fetch_one(pool)
            .await
            .context("Failed to insert ticket")?;
    info!(tg_id = tg_id, ticket_id = id, "Ticket created");
    Ok(id)
}

// ---- matches ----

pub async fn insert_match(
    pool: &PgPool,
    nickname: &str,
    result: &str,
    kills: i32,
    deaths: i32,
) -> Result<()> {
    sqlx::query("INSERT INTO matches (nickname, result, kills, deaths) VALUES ($1, $2, $3, $4)")
        .bind(nickname)
        .bind(result)
        .bind(kills)
        .bind(deaths)
        .execute(pool)
        .await
        .context("Failed to insert match")?;
    Ok(())
}

pub async fn recent_matches_for(
    pool: &PgPool,
    nickname: &str,
    limit: i64,
) -> Result<Vec<MatchRecord>> {
    sqlx::query_as::<_, MatchRecord>(
        "SELECT * FROM matches WHERE nickname = $1 ORDER BY played_at DESC LIMIT $2",
    )
    .bind(nickname)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to read matches")
}

// ---- lobbies ----

/// Player counts for every lobby, zero-filled for empty ones
pub async fn lobby_member_counts(pool: &PgPool) -> Result<Vec<(i32, i64)>> {
    let rows: Vec<(i32, i64)> =
        sqlx::query_as("SELECT lobby_id, COUNT(*) FROM lobby_members GROUP BY lobby_id")
            .fetch_all(pool)
            .await
            .context("Failed to count lobby members")?;

    let counts = (1..=config::lobby::COUNT)
        .map(|lobby_id| {
            let count = rows
                .iter()
                .find(|(id, _)| *id == lobby_id)
                .map_or(0, |(_, count)| *count);
            (lobby_id, count)
        })
        .collect();
    Ok(counts)
}

/// Join a lobby, bounded by capacity and duplicate membership
pub async fn join_lobby(pool: &PgPool, lobby_id: i32, tg_id: i64) -> Result<JoinOutcome> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lobby_members WHERE lobby_id = $1")
        .bind(lobby_id)
        .fetch_one(pool)
        .await
        .context("Failed to count lobby members")?;

    if count >= config::lobby::CAPACITY {
        return Ok(JoinOutcome::Full);
    }

    let result = sqlx::query(
        "INSERT INTO lobby_members (lobby_id, tg_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(lobby_id)
    .bind(tg_id)
    .execute(pool)
    .await
    .context("Failed to join lobby")?;

    if result.rows_affected() == 0 {
        Ok(JoinOutcome::AlreadyJoined)
    } else {
        info!(lobby_id = lobby_id, tg_id = tg_id, "Player joined lobby");
        Ok(JoinOutcome::Joined)
    }
}

/// Leave a lobby; returns false when the player was not a member
pub async fn leave_lobby(pool: &PgPool, lobby_id: i32, tg_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM lobby_members WHERE lobby_id = $1 AND tg_id = $2")
        .bind(lobby_id)
        .bind(tg_id)
        .execute(pool)
        .await
        .context("Failed to leave lobby")?;
    Ok(result.rows_affected() > 0)
}

// ---- friends ----

pub async fn add_friend(pool: &PgPool, tg_id: i64, friend_nickname: &str) -> Result<FriendOutcome> {
    let Some(friend) = get_user_by_nickname(pool, friend_nickname).await? else {
        return Ok(FriendOutcome::NotFound);
    };

    if friend.tg_id == tg_id {
        return Ok(FriendOutcome::SelfAdd);
    }

    let result = sqlx::query(
        "INSERT INTO friends (tg_id, friend_tg_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(tg_id)
    .bind(friend.tg_id)
    .execute(pool)
    .await
    .context("Failed to insert friend")?;

    if result.rows_affected() == 0 {
        Ok(FriendOutcome::Duplicate)
    } else {
        Ok(FriendOutcome::Added)
    }
}

pub async fn friends_of(pool: &PgPool, tg_id: i64) -> Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        "SELECT u.* FROM users u
         JOIN friends f ON f.friend_tg_id = u.tg_id
         WHERE f.tg_id = $1
         ORDER BY u.nickname",
    )
    .bind(tg_id)
    .fetch_all(pool)
    .await
    .context("Failed to read friends")
}

// ---- logs ----

pub async fn insert_log(
    pool: &PgPool,
    actor: i64,
    action: &str,
    details: serde_json::Value,
) -> Result<()> {
    sqlx::query("INSERT INTO logs (actor, action, details) VALUES ($1, $2, $3)")
        .bind(actor)
        .bind(action)
        .bind(details.to_string())
        .execute(pool)
        .await
        .context("Failed to insert log")?;
    Ok(())
}

pub async fn recent_logs(pool: &PgPool, limit: i64) -> Result<Vec<LogRecord>> {
    sqlx::query_as::<_, LogRecord>("SELECT * FROM logs ORDER BY created_at DESC LIMIT $1")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to read logs")
}
