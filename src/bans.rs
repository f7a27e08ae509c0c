//! Ban evaluation: permanent vs. timed bans checked against wall-clock time.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::postgres::PgPool;
use tracing::info;

use crate::db::{self, BanRecord};

lazy_static! {
    static ref DURATION_RE: Regex = Regex::new(r"^([0-9]+)\s*([mhd])$").unwrap();
}

/// Outcome of a ban check for one player
#[derive(Debug, Clone, PartialEq)]
pub enum BanStatus {
    NotBanned,
    Banned {
        reason: String,
        /// None means the ban is permanent
        until: Option<DateTime<Utc>>,
    },
}

impl BanStatus {
    pub fn is_banned(&self) -> bool {
        matches!(self, BanStatus::Banned { .. })
    }
}

/// Evaluate a stored ban record against the current time
///
/// A record without an expiry is permanent. A timed record is active
/// while its expiry lies in the future; an expired record evaluates to
/// `NotBanned` and the caller is expected to delete the row.
pub fn evaluate_ban(record: &BanRecord, now: DateTime<Utc>) -> BanStatus {
    match record.expires_at {
        None => BanStatus::Banned {
            reason: record.reason.clone(),
            until: None,
        },
        Some(expires_at) if expires_at > now => BanStatus::Banned {
            reason: record.reason.clone(),
            until: Some(expires_at),
        },
        Some(_) => BanStatus::NotBanned,
    }
}

/// Parse the duration argument of the /ban command
///
/// `perm`, `permanent`, `навсегда` and `forever` produce a permanent
/// ban (`None`). Timed bans use `<n>m`, `<n>h` or `<n>d`. Returns the
/// `ban-unknown-duration` localization code on anything else.
pub fn parse_ban_duration(input: &str) -> Result<Option<Duration>, &'static str> {
    let normalized = input.trim().to_lowercase();

    if matches!(normalized.as_str(), "perm" | "permanent" | "навсегда" | "forever") {
        return Ok(None);
    }

    let captures = DURATION_RE
        .captures(&normalized)
        .ok_or("ban-unknown-duration")?;

    let quantity: i64 = captures[1].parse().map_err(|_| "ban-unknown-duration")?;
    if quantity == 0 {
        return Err("ban-unknown-duration");
    }

    let duration = match &captures[2] {
        "m" => Duration::minutes(quantity),
        "h" => Duration::hours(quantity),
        "d" => Duration::days(quantity),
        _ => return Err("ban-unknown-duration"),
    };

    Ok(Some(duration))
}

/// Check whether a player is currently banned
///
/// Expired timed bans encountered here are deleted so later checks do
/// not re-evaluate them.
pub async fn check_ban(pool: &PgPool, nickname: &str, now: DateTime<Utc>) -> Result<BanStatus> {
    let Some(record) = db::active_ban_for(pool, nickname).await? else {
        return Ok(BanStatus::NotBanned);
    };

    let status = evaluate_ban(&record, now);

    if !status.is_banned() {
        info!(nickname = %nickname, ban_id = record.id, "Ban expired, removing record");
        db::delete_bans_for(pool, nickname).await?;
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_at: Option<DateTime<Utc>>) -> BanRecord {
        BanRecord {
            id: 1,
            nickname: "Zekiro".to_string(),
            reason: "toxic".to_string(),
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_permanent_ban_never_expires() {
        let now = Utc::now();
        let status = evaluate_ban(&record(None), now);
        assert_eq!(
            status,
            BanStatus::Banned {
                reason: "toxic".to_string(),
                until: None,
            }
        );

        // Still banned far in the future
        let status = evaluate_ban(&record(None), now + Duration::days(3650));
        assert!(status.is_banned());
    }

    #[test]
    fn test_timed_ban_active_until_expiry() {
        let now = Utc::now();
        let until = now + Duration::hours(2);

        let status = evaluate_ban(&record(Some(until)), now);
        assert_eq!(
            status,
            BanStatus::Banned {
                reason: "toxic".to_string(),
                until: Some(until),
            }
        );
    }

    #[test]
    fn test_timed_ban_expired() {
        let now = Utc::now();
        let status = evaluate_ban(&record(Some(now - Duration::minutes(1))), now);
        assert_eq!(status, BanStatus::NotBanned);
    }

    #[test]
    fn test_ban_exactly_at_expiry_is_over() {
        let now = Utc::now();
        let status = evaluate_ban(&record(Some(now)), now);
        assert_eq!(status, BanStatus::NotBanned);
    }

    #[test]
    fn test_parse_permanent_durations() {
        assert_eq!(parse_ban_duration("perm"), Ok(None));
        assert_eq!(parse_ban_duration("Permanent"), Ok(None));
        assert_eq!(parse_ban_duration("навсегда"), Ok(None));
        assert_eq!(parse_ban_duration(" forever "), Ok(None));
    }

    #[test]
    fn test_parse_timed_durations() {
        assert_eq!(parse_ban_duration("30m"), Ok(Some(Duration::minutes(30))));
        assert_eq!(parse_ban_duration("12h"), Ok(Some(Duration::hours(12))));
        assert_eq!(parse_ban_duration("7d"), Ok(Some(Duration::days(7))));
        assert_eq!(parse_ban_duration(" 1 d "), Ok(Some(Duration::days(1))));
    }

    #[test]
    fn test_parse_invalid_durations() {
        assert!(parse_ban_duration("").is_err());
        assert!(parse_ban_duration("tomorrow").is_err());
        assert!(parse_ban_duration("0d").is_err());
        assert!(parse_ban_duration("5w").is_err());
        assert!(parse_ban_duration("d5").is_err());
    }
}
