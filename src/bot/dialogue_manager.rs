//! Dialogue Manager module for handling dialogue state transitions

use anyhow::Result;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info};

use crate::config;
use crate::db;
use crate::dialogue::{ChatState, ZfDialogue};
use crate::localization::{t_args_lang, t_lang};
use crate::validation::{validate_game_id, validate_nickname, validate_ticket_subject};

use super::ui_builder::{friends_keyboard, main_menu_keyboard};

/// True for the words users send to abandon a prompt
fn is_cancellation(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "cancel" | "stop" | "back" | "отмена" | "назад"
    )
}

/// Handle the nickname sent during registration
pub async fn handle_nickname_input(
    bot: &Bot,
    msg: &Message,
    dialogue: ZfDialogue,
    pool: Arc<PgPool>,
    input: &str,
    language_code: Option<&str>,
) -> Result<()> {
    match validate_nickname(input) {
        Ok(nickname) => {
            if db::nickname_taken(&pool, &nickname).await? {
                bot.send_message(msg.chat.id, t_lang("nickname-taken", language_code))
                    .await?;
                return Ok(());
            }

            bot.send_message(msg.chat.id, t_lang("ask-game-id", language_code))
                .await?;

            dialogue.update(ChatState::AwaitingGameId { nickname }).await?;
        }
        Err("too_long") => {
            bot.send_message(msg.chat.id, t_lang("nickname-too-long", language_code))
                .await?;
        }
        Err("invalid_chars") => {
            bot.send_message(msg.chat.id, t_lang("nickname-invalid", language_code))
                .await?;
        }
        Err(_) => {
            // "empty" and "too_short" read the same to the user
            bot.send_message(msg.chat.id, t_lang("nickname-too-short", language_code))
                .await?;
        }
    }

    Ok(())
}

/// Handle the game id sent during registration; completes the flow
pub async fn handle_game_id_input(
    bot: &Bot,
    msg: &Message,
    dialogue: ZfDialogue,
    pool: Arc<PgPool>,
    input: &str,
    nickname: String,
    language_code: Option<&str>,
) -> Result<()> {
    let tg_id = match msg.from.as_ref() {
        Some(user) => user.id.0 as i64,
        None => return Ok(()),
    };

    match validate_game_id(input) {
        Ok(game_id) => {
            let created = db::create_user(&pool, tg_id, &nickname, &game_id).await?;

            if !created {
                // Nickname got taken while this user was typing the id
                bot.send_message(msg.chat.id, t_lang("nickname-taken", language_code))
                    .await?;
                bot.send_message(msg.chat.id, t_lang("ask-nickname", language_code))
                    .await?;
                dialogue.update(ChatState::AwaitingNickname).await?;
                return Ok(());
            }

            info!(tg_id = tg_id, nickname = %nickname, "Registration completed");

            bot.send_message(
                msg.chat.id,
                t_args_lang(
                    "registration-complete",
                    &[("nickname", &nickname)],
                    language_code,
                ),
            )
            .await?;

            bot.send_message(msg.chat.id, t_lang("choose-action", language_code))
                .reply_markup(main_menu_keyboard(config::is_admin(tg_id), language_code))
                .await?;

            dialogue.exit().await?;
        }
        Err(_) => {
            bot.send_message(msg.chat.id, t_lang("game-id-invalid", language_code))
                .await?;
        }
    }

    Ok(())
}

/// Handle the subject sent after the "open a ticket" button
pub async fn handle_ticket_subject_input(
    bot: &Bot,
    msg: &Message,
    dialogue: ZfDialogue,
    pool: Arc<PgPool>,
    input: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let tg_id = match msg.from.as_ref() {
        Some(user) => user.id.0 as i64,
        None => return Ok(()),
    };

    if is_cancellation(input) {
        dialogue.exit().await?;
        bot.send_message(msg.chat.id, t_lang("choose-action", language_code))
            .reply_markup(main_menu_keyboard(config::is_admin(tg_id), language_code))
            .await?;
        return Ok(());
    }

    match validate_ticket_subject(input) {
        Ok(subject) => {
            match db::insert_ticket(&pool, tg_id, &subject).await {
                Ok(ticket_id) => {
                    bot.send_message(
                        msg.chat.id,
                        t_args_lang(
                            "ticket-created",
                            &[("id", &ticket_id.to_string())],
                            language_code,
                        ),
                    )
                    .await?;
                }
                Err(e) => {
                    error!(tg_id = tg_id, error = %e, "Failed to create ticket");
                    bot.send_message(msg.chat.id, t_lang("error-generic", language_code))
                        .await?;
                }
            }

            dialogue.exit().await?;
        }
        Err("too_long") => {
            bot.send_message(msg.chat.id, t_lang("ticket-subject-too-long", language_code))
                .await?;
        }
        Err(_) => {
            bot.send_message(msg.chat.id, t_lang("ticket-subject-invalid", language_code))
                .await?;
        }
    }

    Ok(())
}

/// Handle the nickname sent after the "add friend" button
pub async fn handle_friend_nickname_input(
    bot: &Bot,
    msg: &Message,
    dialogue: ZfDialogue,
    pool: Arc<PgPool>,
    input: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let tg_id = match msg.from.as_ref() {
        Some(user) => user.id.0 as i64,
        None => return Ok(()),
    };

    if is_cancellation(input) {
        dialogue.exit().await?;
        bot.send_message(msg.chat.id, t_lang("choose-action", language_code))
            .reply_markup(main_menu_keyboard(config::is_admin(tg_id), language_code))
            .await?;
        return Ok(());
    }

    let nickname = input.trim();

    match db::add_friend(&pool, tg_id, nickname).await? {
        db::FriendOutcome::Added => {
            bot.send_message(
                msg.chat.id,
                t_args_lang("friend-added", &[("nickname", nickname)], language_code),
            )
            .reply_markup(friends_keyboard(language_code))
            .await?;
            dialogue.exit().await?;
        }
        db::FriendOutcome::NotFound => {
            // Keep the prompt open so the user can fix a typo
            bot.send_message(
                msg.chat.id,
                t_args_lang("friend-not-found", &[("nickname", nickname)], language_code),
            )
            .await?;
        }
        db::FriendOutcome::SelfAdd => {
            bot.send_message(msg.chat.id, t_lang("friend-self", language_code))
                .await?;
        }
        db::FriendOutcome::Duplicate => {
            bot.send_message(
                msg.chat.id,
                t_args_lang("friend-duplicate", &[("nickname", nickname)], language_code),
            )
            .await?;
            dialogue.exit().await?;
        }
    }

    Ok(())
}
