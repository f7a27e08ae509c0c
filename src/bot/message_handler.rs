//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::bans::{self, BanStatus};
use crate::config;
use crate::db::{self, User};
use crate::dialogue::{ChatState, ZfDialogue};
use crate::localization::{t_args_lang, t_lang};

use super::dialogue_manager::{
    handle_friend_nickname_input, handle_game_id_input, handle_nickname_input,
    handle_ticket_subject_input,
};
use super::ui_builder::{format_timestamp, main_menu_keyboard};

/// Bot commands; the ban/warn/match commands are admin-only
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "register and open the main menu")]
    Start,
    #[command(description = "show help")]
    Help,
    #[command(description = "ban a player: /ban nickname, duration, reason")]
    Ban(String),
    #[command(description = "unban a player: /unban nickname")]
    Unban(String),
    #[command(description = "warn a player: /warn nickname, reason")]
    Warn(String),
    #[command(description = "record match results: /addmatch lines")]
    Addmatch(String),
}

/// Send the rejection message if the player is currently banned
///
/// Returns true when the update must not be processed further. The
/// admin and unregistered users are never rejected here.
pub(super) async fn reject_if_banned(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    user: Option<&User>,
    language_code: Option<&str>,
) -> Result<bool> {
    let Some(user) = user else {
        return Ok(false);
    };

    if config::is_admin(user.tg_id) {
        return Ok(false);
    }

    match bans::check_ban(pool, &user.nickname, Utc::now()).await? {
        BanStatus::NotBanned => Ok(false),
        BanStatus::Banned { reason, until } => {
            debug!(nickname = %user.nickname, "Rejected update from banned player");
            let text = match until {
                None => t_args_lang("banned-permanent", &[("reason", &reason)], language_code),
                Some(ts) => t_args_lang(
                    "banned-until",
                    &[("reason", &reason), ("until", &format_timestamp(ts))],
                    language_code,
                ),
            };
            bot.send_message(chat_id, text).await?;
            Ok(true)
        }
    }
}

/// Handle bot commands
pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: ZfDialogue,
    pool: Arc<PgPool>,
) -> Result<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let tg_id = from.id.0 as i64;
    let language_code = from.language_code.clone();
    let language_code = language_code.as_deref();

    let user = db::get_user_by_tg_id(&pool, tg_id).await?;
    if reject_if_banned(&bot, msg.chat.id, &pool, user.as_ref(), language_code).await? {
        return Ok(());
    }

    match cmd {
        Command::Start => {
            if user.is_some() {
                bot.send_message(msg.chat.id, t_lang("choose-action", language_code))
                    .reply_markup(main_menu_keyboard(config::is_admin(tg_id), language_code))
                    .await?;
            } else {
                bot.send_message(msg.chat.id, t_lang("ask-nickname", language_code))
                    .await?;
                dialogue.update(ChatState::AwaitingNickname).await?;
            }
        }
        Command::Help => {
            let text = format!(
                "{}\n\n{}",
                t_lang("help-commands", language_code),
                Command::descriptions()
            );
            bot.send_message(msg.chat.id, text).await?;
        }
        Command::Ban(args) => {
            // Admin commands are silently ignored for everyone else
            if !config::is_admin(tg_id) {
                return Ok(());
            }
            handle_ban_command(&bot, &msg, &pool, tg_id, &args, language_code).await?;
        }
        Command::Unban(args) => {
            if !config::is_admin(tg_id) {
                return Ok(());
            }
            handle_unban_command(&bot, &msg, &pool, tg_id, &args, language_code).await?;
        }
        Command::Warn(args) => {
            if !config::is_admin(tg_id) {
                return Ok(());
            }
            handle_warn_command(&bot, &msg, &pool, tg_id, &args, language_code).await?;
        }
        Command::Addmatch(args) => {
            if !config::is_admin(tg_id) {
                return Ok(());
            }
            handle_addmatch_command(&bot, &msg, &pool, tg_id, &args, language_code).await?;
        }
    }

    Ok(())
}

async fn handle_ban_command(
    bot: &Bot,
    msg: &Message,
    pool: &PgPool,
    admin_id: i64,
    args: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let parts: Vec<&str> = args.splitn(3, ',').map(str::trim).collect();
    let &[nickname, duration_input, reason] = parts.as_slice() else {
        bot.send_message(msg.chat.id, t_lang("ban-usage", language_code))
            .await?;
        return Ok(());
    };

    if db::get_user_by_nickname(pool, nickname).await?.is_none() {
        bot.send_message(
            msg.chat.id,
            t_args_lang("ban-user-not-found", &[("nickname", nickname)], language_code),
        )
        .await?;
        return Ok(());
    }

    let duration = match bans::parse_ban_duration(duration_input) {
        Ok(duration) => duration,
        Err(code) => {
            bot.send_message(msg.chat.id, t_lang(code, language_code))
                .await?;
            return Ok(());
        }
    };

    let expires_at = duration.map(|d| Utc::now() + d);
    db::insert_ban(pool, nickname, reason, expires_at).await?;
    db::insert_log(
        pool,
        admin_id,
        "ban",
        json!({ "nickname": nickname, "duration": duration_input, "reason": reason }),
    )
    .await?;

    let confirmation = match expires_at {
        None => t_args_lang(
            "ban-applied",
            &[("nickname", nickname), ("reason", reason)],
            language_code,
        ),
        Some(ts) => t_args_lang(
            "ban-applied-until",
            &[
                ("nickname", nickname),
                ("until", &format_timestamp(ts)),
                ("reason", reason),
            ],
            language_code,
        ),
    };
    bot.send_message(msg.chat.id, confirmation).await?;

    Ok(())
}

async fn handle_unban_command(
    bot: &Bot,
    msg: &Message,
    pool: &PgPool,
    admin_id: i64,
    args: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let nickname = args.trim();
    if nickname.is_empty() {
        bot.send_message(msg.chat.id, t_lang("unban-usage", language_code))
            .await?;
        return Ok(());
    }

    let removed = db::delete_bans_for(pool, nickname).await?;

    if removed {
        db::insert_log(pool, admin_id, "unban", json!({ "nickname": nickname })).await?;
        bot.send_message(
            msg.chat.id,
            t_args_lang("unban-done", &[("nickname", nickname)], language_code),
        )
        .await?;
    } else {
        bot.send_message(
            msg.chat.id,
            t_args_lang("unban-none", &[("nickname", nickname)], language_code),
        )
        .await?;
    }

    Ok(())
}

async fn handle_warn_command(
    bot: &Bot,
    msg: &Message,
    pool: &PgPool,
    admin_id: i64,
    args: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let parts: Vec<&str> = args.splitn(2, ',').map(str::trim).collect();
    let &[nickname, reason] = parts.as_slice() else {
        bot.send_message(msg.chat.id, t_lang("warn-usage", language_code))
            .await?;
        return Ok(());
    };

    if db::get_user_by_nickname(pool, nickname).await?.is_none() {
        bot.send_message(
            msg.chat.id,
            t_args_lang("ban-user-not-found", &[("nickname", nickname)], language_code),
        )
        .await?;
        return Ok(());
    }

    db::insert_warning(pool, nickname, reason).await?;
    db::insert_log(
        pool,
        admin_id,
        "warn",
        json!({ "nickname": nickname, "reason": reason }),
    )
    .await?;

    let count = db::count_warnings_for(pool, nickname).await?;
    let limit = config::warnings::AUTO_BAN_THRESHOLD;

    if count >= limit {
        // Enough warnings: permanent ban, logged as its own action
        warn!(nickname = %nickname, count = count, "Warning limit reached, applying permanent ban");
        db::insert_ban(pool, nickname, reason, None).await?;
        db::insert_log(
            pool,
            admin_id,
            "auto_ban",
            json!({ "nickname": nickname, "warnings": count }),
        )
        .await?;
        bot.send_message(
            msg.chat.id,
            t_args_lang(
                "warn-auto-ban",
                &[("nickname", nickname), ("limit", &limit.to_string())],
                language_code,
            ),
        )
        .await?;
    } else {
        bot.send_message(
            msg.chat.id,
            t_args_lang(
                "warn-added",
                &[
                    ("nickname", nickname),
                    ("count", &count.to_string()),
                    ("limit", &limit.to_string()),
                ],
                language_code,
            ),
        )
        .await?;
    }

    Ok(())
}

async fn handle_addmatch_command(
    bot: &Bot,
    msg: &Message,
    pool: &PgPool,
    admin_id: i64,
    args: &str,
    language_code: Option<&str>,
) -> Result<()> {
    if args.trim().is_empty() {
        bot.send_message(msg.chat.id, t_lang("addmatch-usage", language_code))
            .await?;
        return Ok(());
    }

    let mut added = 0u32;
    let mut skipped = 0u32;

    for line in args.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_match_line(line) {
            Some((nickname, won, kills, deaths)) => {
                if db::get_user_by_nickname(pool, nickname).await?.is_none() {
                    skipped += 1;
                    continue;
                }

                let result = if won { "W" } else { "L" };
                db::insert_match(pool, nickname, result, kills, deaths).await?;
                db::update_user_stats(pool, nickname, won, kills, deaths).await?;
                added += 1;
            }
            None => {
                debug!(line = %line, "Skipping unparsable match line");
                skipped += 1;
            }
        }
    }

    if added > 0 {
        db::insert_log(
            pool,
            admin_id,
            "addmatch",
            json!({ "added": added, "skipped": skipped }),
        )
        .await?;
    }

    info!(added = added, skipped = skipped, "Match results recorded");

    bot.send_message(
        msg.chat.id,
        t_args_lang(
            "addmatch-done",
            &[
                ("added", &added.to_string()),
                ("skipped", &skipped.to_string()),
            ],
            language_code,
        ),
    )
    .await?;

    Ok(())
}

/// Parse one `/addmatch` line: `nickname - W|L - kills - deaths`
fn parse_match_line(line: &str) -> Option<(&str, bool, i32, i32)> {
    let parts: Vec<&str> = line.split('-').map(str::trim).collect();
    let &[nickname, result, kills, deaths] = parts.as_slice() else {
        return None;
    };

    if nickname.is_empty() {
        return None;
    }

    let won = match result.to_lowercase().as_str() {
        "w" => true,
        "l" => false,
        _ => return None,
    };

    let kills: i32 = kills.parse().ok()?;
    let deaths: i32 = deaths.parse().ok()?;
    if kills < 0 || deaths < 0 {
        return None;
    }

    Some((nickname, won, kills, deaths))
}

/// Handle plain text messages, routed by dialogue state
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: ZfDialogue,
    pool: Arc<PgPool>,
) -> Result<()> {
    let Some(text) = msg.text().map(ToOwned::to_owned) else {
        return Ok(());
    };

    debug!(chat_id = %msg.chat.id, message_length = text.len(), "Received text message");

    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.clone());
    let language_code = language_code.as_deref();

    let tg_id = match msg.from.as_ref() {
        Some(user) => user.id.0 as i64,
        None => return Ok(()),
    };

    let user = db::get_user_by_tg_id(&pool, tg_id).await?;
    if reject_if_banned(&bot, msg.chat.id, &pool, user.as_ref(), language_code).await? {
        return Ok(());
    }

    let dialogue_state = dialogue.get().await?;
    match dialogue_state {
        Some(ChatState::AwaitingNickname) => {
            handle_nickname_input(&bot, &msg, dialogue, pool, &text, language_code).await?;
        }
        Some(ChatState::AwaitingGameId { nickname }) => {
            handle_game_id_input(&bot, &msg, dialogue, pool, &text, nickname, language_code)
                .await?;
        }
        Some(ChatState::AwaitingTicketSubject) => {
            handle_ticket_subject_input(&bot, &msg, dialogue, pool, &text, language_code).await?;
        }
        Some(ChatState::AwaitingFriendNickname) => {
            handle_friend_nickname_input(&bot, &msg, dialogue, pool, &text, language_code).await?;
        }
        _ => {
            // Free text outside any dialogue
            if user.is_some() {
                bot.send_message(msg.chat.id, t_lang("choose-action", language_code))
                    .reply_markup(main_menu_keyboard(config::is_admin(tg_id), language_code))
                    .await?;
            } else {
                bot.send_message(msg.chat.id, t_lang("start-hint", language_code))
                    .await?;
            }
        }
    }

    Ok(())
}
