//! # Localization Tests
//!
//! This module contains unit tests for the localization functionality,
//! testing message retrieval and formatting with various edge cases.

use std::collections::HashMap;
use zekiro_faceit::localization::LocalizationManager;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        // Create a new localization manager for each test
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("help-commands", "en", None);
        assert!(!message.is_empty());
        assert!(message.contains("Commands"));
    }

    #[test]
    fn test_get_message_russian_locale() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("choose-action", "ru", None);
        assert!(message.contains("Выберите действие"));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert!(message.starts_with("Missing translation:"));
    }

    #[test]
    fn test_get_message_unsupported_language_falls_back() {
        let manager = setup_localization();

        // Unsupported languages fall back to the community default (ru)
        let message = manager.get_message_in_language("choose-action", "de", None);
        assert!(message.contains("Выберите действие"));
    }

    #[test]
    fn test_get_message_with_arguments() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("nickname", "Zekiro");

        let message =
            manager.get_message_in_language("registration-complete", "en", Some(&args));
        assert!(message.contains("Zekiro"));

        let message =
            manager.get_message_in_language("registration-complete", "ru", Some(&args));
        assert!(message.contains("Zekiro"));
    }

    #[test]
    fn test_ban_messages_include_reason() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("reason", "toxic");
        args.insert("until", "01.01.2030 00:00 UTC");

        let permanent = manager.get_message_in_language("banned-permanent", "en", Some(&args));
        assert!(permanent.contains("toxic"));

        let timed = manager.get_message_in_language("banned-until", "en", Some(&args));
        assert!(timed.contains("toxic"));
        assert!(timed.contains("01.01.2030 00:00 UTC"));
    }

    #[test]
    fn test_lobby_label_formatting() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("number", "3");
        args.insert("count", "4");
        args.insert("capacity", "10");

        let label = manager.get_message_in_language("lobby-label", "ru", Some(&args));
        assert!(label.contains('3'));
        assert!(label.contains("4/10"));
    }

    #[test]
    fn test_profile_card_has_all_fields() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("tg_id", "12345");
        args.insert("nickname", "Zekiro");
        args.insert("zf", "150");
        args.insert("matches", "20");
        args.insert("wins", "12");
        args.insert("losses", "8");
        args.insert("wr", "60");
        args.insert("kd", "1.25");
        args.insert("avg", "14.5");
        args.insert("reg_date", "01.08.2026 12:00 UTC");

        for lang in ["ru", "en"] {
            let card = manager.get_message_in_language("profile-card", lang, Some(&args));
            assert!(card.contains("12345"));
            assert!(card.contains("Zekiro"));
            assert!(card.contains("150"));
            assert!(card.contains("60%"));
            assert!(card.contains("1.25"));
        }
    }
}
