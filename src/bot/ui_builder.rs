//! UI Builder module for creating keyboards and formatting messages

use chrono::{DateTime, Utc};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::config;
use crate::db::{LogRecord, MatchRecord, User};
use crate::localization::{t_args_lang, t_lang};

/// Render a timestamp the way the bot shows it to users
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%d.%m.%Y %H:%M UTC").to_string()
}

/// Main menu keyboard; the admin gets an extra panel row
pub fn main_menu_keyboard(is_admin: bool, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut buttons = vec![
        vec![InlineKeyboardButton::callback(
            t_lang("btn-find-match", language_code),
            "find_match",
        )],
        vec![
            InlineKeyboardButton::callback(t_lang("btn-profile", language_code), "profile"),
            InlineKeyboardButton::callback(t_lang("btn-rating", language_code), "rating"),
        ],
        vec![
            InlineKeyboardButton::callback(t_lang("btn-friends", language_code), "friends"),
            InlineKeyboardButton::callback(t_lang("btn-ticket", language_code), "ticket"),
        ],
    ];

    if is_admin {
        buttons.push(vec![InlineKeyboardButton::callback(
            t_lang("btn-admin-panel", language_code),
            "admin_panel",
        )]);
    }

    InlineKeyboardMarkup::new(buttons)
}

/// Lobby list with live occupancy per lobby
pub fn lobby_list_keyboard(
    counts: &[(i32, i64)],
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = counts
        .iter()
        .map(|(lobby_id, count)| {
            let label = t_args_lang(
                "lobby-label",
                &[
                    ("number", &lobby_id.to_string()),
                    ("count", &count.to_string()),
                    ("capacity", &config::lobby::CAPACITY.to_string()),
                ],
                language_code,
            );
            vec![InlineKeyboardButton::callback(
                label,
                format!("lobby_{}", lobby_id),
            )]
        })
        .collect();

    buttons.push(vec![InlineKeyboardButton::callback(
        t_lang("btn-main-menu", language_code),
        "main_menu",
    )]);

    InlineKeyboardMarkup::new(buttons)
}

/// Keyboard attached to the lobby-joined confirmation
pub fn lobby_joined_keyboard(lobby_id: i32, language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            t_lang("btn-leave-lobby", language_code),
            format!("lobby_leave_{}", lobby_id),
        )],
        vec![InlineKeyboardButton::callback(
            t_lang("btn-main-menu", language_code),
            "main_menu",
        )],
    ])
}

/// Keyboard under the profile card
pub fn profile_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            t_lang("btn-last-games", language_code),
            "last_games",
        )],
        vec![InlineKeyboardButton::callback(
            t_lang("btn-main-menu", language_code),
            "main_menu",
        )],
    ])
}

/// Keyboard under the friends list
pub fn friends_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            t_lang("btn-add-friend", language_code),
            "friend_add",
        )],
        vec![InlineKeyboardButton::callback(
            t_lang("btn-main-menu", language_code),
            "main_menu",
        )],
    ])
}

/// Admin panel keyboard
pub fn admin_panel_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            t_lang("btn-ban-manage", language_code),
            "ban_manage",
        )],
        vec![InlineKeyboardButton::callback(
            t_lang("btn-match-manage", language_code),
            "match_manage",
        )],
        vec![InlineKeyboardButton::callback(
            t_lang("btn-logs", language_code),
            "logs",
        )],
        vec![InlineKeyboardButton::callback(
            t_lang("btn-users-info", language_code),
            "users_info",
        )],
        vec![InlineKeyboardButton::callback(
            t_lang("btn-back", language_code),
            "main_menu",
        )],
    ])
}

/// Single "back to main menu" button for sub-screens
pub fn back_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        t_lang("btn-main-menu", language_code),
        "main_menu",
    )]])
}

/// Format the profile card of a registered player
pub fn format_profile(user: &User, language_code: Option<&str>) -> String {
    t_args_lang(
        "profile-card",
        &[
            ("tg_id", &user.tg_id.to_string()),
            ("nickname", &user.nickname),
            ("zf", &user.zf.to_string()),
            ("matches", &user.matches.to_string()),
            ("wins", &user.wins.to_string()),
            ("losses", &user.losses.to_string()),
            ("wr", &format!("{:.0}", user.win_rate())),
            ("kd", &format!("{:.2}", user.kd())),
            ("avg", &format!("{:.1}", user.avg_kills())),
            ("reg_date", &format_timestamp(user.reg_date)),
        ],
        language_code,
    )
}

/// Format the rating top list
pub fn format_rating(users: &[User], language_code: Option<&str>) -> String {
    if users.is_empty() {
        return t_lang("rating-empty", language_code);
    }

    let mut result = format!("{}\n", t_lang("rating-title", language_code));
    for (i, user) in users.iter().enumerate() {
        let place = match i {
            0 => "🥇".to_string(),
            1 => "🥈".to_string(),
            2 => "🥉".to_string(),
            _ => format!("{}.", i + 1),
        };
        result.push_str(&format!(
            "{} {} — {} ZF ({}W/{}L)\n",
            place, user.nickname, user.zf, user.wins, user.losses
        ));
    }
    result
}

/// Format a player's recent games
pub fn format_matches(matches: &[MatchRecord], language_code: Option<&str>) -> String {
    if matches.is_empty() {
        return t_lang("matches-empty", language_code);
    }

    let mut result = format!("{}\n", t_lang("matches-title", language_code));
    for record in matches {
        let icon = if record.result.eq_ignore_ascii_case("w") {
            "✅"
        } else {
            "❌"
        };
        result.push_str(&format!(
            "{} {} | {}/{} | {}\n",
            icon,
            record.result.to_uppercase(),
            record.kills,
            record.deaths,
            format_timestamp(record.played_at)
        ));
    }
    result
}

/// Format the friends list
pub fn format_friends(friends: &[User], language_code: Option<&str>) -> String {
    if friends.is_empty() {
        return t_lang("friends-empty", language_code);
    }

    let mut result = format!("{}\n", t_lang("friends-title", language_code));
    for friend in friends {
        result.push_str(&format!("• {} — {} ZF\n", friend.nickname, friend.zf));
    }
    result
}

/// Format the recent admin action log
pub fn format_logs(logs: &[LogRecord], language_code: Option<&str>) -> String {
    if logs.is_empty() {
        return t_lang("logs-empty", language_code);
    }

    let mut result = format!("{}\n", t_lang("logs-title", language_code));
    for log in logs {
        result.push_str(&format!(
            "{} | {} | {}\n",
            format_timestamp(log.created_at),
            log.action,
            log.details
        ));
    }
    result
}

/// Format the admin users-info summary
pub fn format_users_info(total: i64, recent: &[User], language_code: Option<&str>) -> String {
    let mut result = t_args_lang("users-info", &[("count", &total.to_string())], language_code);

    if !recent.is_empty() {
        result.push_str(&format!(
            "\n\n{}\n",
            t_lang("users-recent-title", language_code)
        ));
        for user in recent {
            result.push_str(&format!(
                "• {} — {}\n",
                user.nickname,
                format_timestamp(user.reg_date)
            ));
        }
    }

    result
}
