use std::env;
use std::sync::LazyLock;

/// Configuration constants for the bot

/// Telegram id of the head admin
/// Read once at startup from the ADMIN_ID environment variable.
/// When unset or unparsable the admin panel is effectively disabled.
pub static ADMIN_ID: LazyLock<i64> = LazyLock::new(|| {
    env::var("ADMIN_ID")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
});

/// Check whether a Telegram user id belongs to the admin
pub fn is_admin(tg_id: i64) -> bool {
    *ADMIN_ID != 0 && tg_id == *ADMIN_ID
}

/// Lobby configuration
pub mod lobby {
    /// Number of matchmaking lobbies shown in the lobby list
    pub const COUNT: i32 = 5;

    /// Maximum number of players per lobby
    pub const CAPACITY: i64 = 10;
}

/// Rating display configuration
pub mod rating {
    /// Number of players shown in the rating screen
    pub const PAGE_SIZE: i64 = 10;
}

/// Match history display configuration
pub mod matches {
    /// Number of recent games shown in the "last games" screen
    pub const PAGE_SIZE: i64 = 10;
}

/// Warning configuration
pub mod warnings {
    /// Number of warnings after which a permanent ban is applied
    pub const AUTO_BAN_THRESHOLD: i64 = 3;
}

/// Localization configuration
pub mod locale {
    /// Fallback locale used when a user's language is not supported
    pub const DEFAULT: &str = "ru";

    /// Locales shipped under ./locales/
    pub const SUPPORTED: &[&str] = &["ru", "en"];
}
