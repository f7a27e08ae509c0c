//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};
use tracing::debug;

use crate::config;
use crate::db;
use crate::dialogue::{ChatState, ZfDialogue};
use crate::localization::{t_args_lang, t_lang};

use super::message_handler::reject_if_banned;
use super::ui_builder::{
    admin_panel_keyboard, back_keyboard, format_friends, format_logs, format_matches,
    format_profile, format_rating, format_users_info, friends_keyboard, lobby_joined_keyboard,
    lobby_list_keyboard, main_menu_keyboard, profile_keyboard,
};

/// Delete the tapped menu message; failures are logged and ignored
/// (the message may already be gone or too old to delete)
async fn delete_menu_message(bot: &Bot, chat_id: ChatId, message_id: MessageId) {
    if let Err(e) = bot.delete_message(chat_id, message_id).await {
        debug!(chat_id = %chat_id, error = %e, "Failed to delete menu message");
    }
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: ZfDialogue,
    pool: Arc<PgPool>,
) -> Result<()> {
    let tg_id = q.from.id.0 as i64;
    let language_code = q.from.language_code.clone();
    let language_code = language_code.as_deref();

    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query");

    // Shown as a toast when set; the query is always answered at the end
    let mut notice: Option<String> = None;

    if let (Some(data), Some(msg)) = (q.data.as_deref(), q.message.as_ref()) {
        let chat_id = msg.chat().id;
        let message_id = msg.id();

        let user = db::get_user_by_tg_id(&pool, tg_id).await?;
        let banned = reject_if_banned(&bot, chat_id, &pool, user.as_ref(), language_code).await?;

        if !banned {
            match data {
                "main_menu" => {
                    delete_menu_message(&bot, chat_id, message_id).await;
                    bot.send_message(chat_id, t_lang("choose-action", language_code))
                        .reply_markup(main_menu_keyboard(config::is_admin(tg_id), language_code))
                        .await?;
                }
                "find_match" => {
                    delete_menu_message(&bot, chat_id, message_id).await;
                    let counts = db::lobby_member_counts(&pool).await?;
                    bot.send_message(chat_id, t_lang("lobby-title", language_code))
                        .reply_markup(lobby_list_keyboard(&counts, language_code))
                        .await?;
                }
                "profile" => match user.as_ref() {
                    Some(user) => {
                        delete_menu_message(&bot, chat_id, message_id).await;
                        bot.send_message(chat_id, format_profile(user, language_code))
                            .reply_markup(profile_keyboard(language_code))
                            .await?;
                    }
                    None => notice = Some(t_lang("not-registered", language_code)),
                },
                "last_games" => match user.as_ref() {
                    Some(user) => {
                        delete_menu_message(&bot, chat_id, message_id).await;
                        let matches = db::recent_matches_for(
                            &pool,
                            &user.nickname,
                            config::matches::PAGE_SIZE,
                        )
                        .await?;
                        bot.send_message(chat_id, format_matches(&matches, language_code))
                            .reply_markup(back_keyboard(language_code))
                            .await?;
                    }
                    None => notice = Some(t_lang("not-registered", language_code)),
                },
                "rating" => {
                    delete_menu_message(&bot, chat_id, message_id).await;
                    let top = db::top_users_by_zf(&pool, config::rating::PAGE_SIZE).await?;
                    bot.send_message(chat_id, format_rating(&top, language_code))
                        .reply_markup(back_keyboard(language_code))
                        .await?;
                }
                "friends" => match user.as_ref() {
                    Some(_) => {
                        delete_menu_message(&bot, chat_id, message_id).await;
                        let friends = db::friends_of(&pool, tg_id).await?;
                        bot.send_message(chat_id, format_friends(&friends, language_code))
                            .reply_markup(friends_keyboard(language_code))
                            .await?;
                    }
                    None => notice = Some(t_lang("not-registered", language_code)),
                },
                "friend_add" => match user.as_ref() {
                    Some(_) => {
                        bot.send_message(chat_id, t_lang("friend-ask-nickname", language_code))
                            .await?;
                        dialogue.update(ChatState::AwaitingFriendNickname).await?;
                    }
                    None => notice = Some(t_lang("not-registered", language_code)),
                },
                "ticket" => match user.as_ref() {
                    Some(_) => {
                        bot.send_message(chat_id, t_lang("ticket-ask-subject", language_code))
                            .await?;
                        dialogue.update(ChatState::AwaitingTicketSubject).await?;
                    }
                    None => notice = Some(t_lang("not-registered", language_code)),
                },
                "admin_panel" => {
                    if config::is_admin(tg_id) {
                        delete_menu_message(&bot, chat_id, message_id).await;
                        bot.send_message(chat_id, t_lang("admin-panel-title", language_code))
                            .reply_markup(admin_panel_keyboard(language_code))
                            .await?;
                    } else {
                        notice = Some(t_lang("admin-denied", language_code));
                    }
                }
                "ban_manage" => {
                    if config::is_admin(tg_id) {
                        delete_menu_message(&bot, chat_id, message_id).await;
                        let text = format!(
                            "{}\n{}\n{}",
                            t_lang("ban-usage", language_code),
                            t_lang("unban-usage", language_code),
                            t_lang("warn-usage", language_code)
                        );
                        bot.send_message(chat_id, text)
                            .reply_markup(back_keyboard(language_code))
                            .await?;
                    } else {
                        notice = Some(t_lang("admin-denied", language_code));
                    }
                }
                "match_manage" => {
                    if config::is_admin(tg_id) {
                        delete_menu_message(&bot, chat_id, message_id).await;
                        bot.send_message(chat_id, t_lang("addmatch-usage", language_code))
                            .reply_markup(back_keyboard(language_code))
                            .await?;
                    } else {
                        notice = Some(t_lang("admin-denied", language_code));
                    }
                }
                "logs" => {
                    if config::is_admin(tg_id) {
                        delete_menu_message(&bot, chat_id, message_id).await;
                        let logs = db::recent_logs(&pool, 10).await?;
                        bot.send_message(chat_id, format_logs(&logs, language_code))
                            .reply_markup(back_keyboard(language_code))
                            .await?;
                    } else {
                        notice = Some(t_lang("admin-denied", language_code));
                    }
                }
                "users_info" => {
                    if config::is_admin(tg_id) {
                        delete_menu_message(&bot, chat_id, message_id).await;
                        let total = db::count_users(&pool).await?;
                        let recent = db::recent_users(&pool, 5).await?;
                        bot.send_message(chat_id, format_users_info(total, &recent, language_code))
                            .reply_markup(back_keyboard(language_code))
                            .await?;
                    } else {
                        notice = Some(t_lang("admin-denied", language_code));
                    }
                }
                _ if data.starts_with("lobby_leave_") => {
                    let lobby_id: i32 = data
                        .strip_prefix("lobby_leave_")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);

                    if (1..=config::lobby::COUNT).contains(&lobby_id) {
                        if db::leave_lobby(&pool, lobby_id, tg_id).await? {
                            delete_menu_message(&bot, chat_id, message_id).await;
                            bot.send_message(
                                chat_id,
                                t_args_lang(
                                    "lobby-left",
                                    &[("number", &lobby_id.to_string())],
                                    language_code,
                                ),
                            )
                            .reply_markup(back_keyboard(language_code))
                            .await?;
                        } else {
                            notice = Some(t_lang("lobby-not-member", language_code));
                        }
                    } else {
                        notice = Some(t_lang("under-construction", language_code));
                    }
                }
                _ if data.starts_with("lobby_") => {
                    let lobby_id: i32 = data
                        .strip_prefix("lobby_")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);

                    if !(1..=config::lobby::COUNT).contains(&lobby_id) {
                        notice = Some(t_lang("under-construction", language_code));
                    } else if user.is_none() {
                        notice = Some(t_lang("not-registered", language_code));
                    } else {
                        match db::join_lobby(&pool, lobby_id, tg_id).await? {
                            db::JoinOutcome::Joined => {
                                delete_menu_message(&bot, chat_id, message_id).await;
                                bot.send_message(
                                    chat_id,
                                    t_args_lang(
                                        "lobby-joined",
                                        &[("number", &lobby_id.to_string())],
                                        language_code,
                                    ),
                                )
                                .reply_markup(lobby_joined_keyboard(lobby_id, language_code))
                                .await?;
                            }
                            db::JoinOutcome::AlreadyJoined => {
                                notice = Some(t_lang("lobby-already-joined", language_code));
                            }
                            db::JoinOutcome::Full => {
                                notice = Some(t_lang("lobby-full", language_code));
                            }
                        }
                    }
                }
                _ => {
                    // Buttons from features that never shipped
                    notice = Some(t_lang("under-construction", language_code));
                }
            }
        }
    }

    // Answer the callback query to remove the loading state
    let answer = bot.answer_callback_query(q.id);
    match notice {
        Some(text) => answer.text(text).await?,
        None => answer.await?,
    };

    Ok(())
}
