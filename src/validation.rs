//! Input validation helpers for registration and dialogue prompts.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Latin or Cyrillic letters, digits and underscores
    static ref NICKNAME_RE: Regex = Regex::new(r"^[A-Za-zА-Яа-яЁё0-9_]+$").unwrap();
    static ref GAME_ID_RE: Regex = Regex::new(r"^[0-9]{1,10}$").unwrap();
}

/// Validates a player nickname entered during registration
///
/// Returns the trimmed nickname, or a short error code consumed by the
/// dialogue handlers: `empty`, `too_short`, `too_long`, `invalid_chars`.
pub fn validate_nickname(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if trimmed.chars().count() < 3 {
        return Err("too_short");
    }

    if trimmed.chars().count() > 32 {
        return Err("too_long");
    }

    if !NICKNAME_RE.is_match(trimmed) {
        return Err("invalid_chars");
    }

    Ok(trimmed.to_string())
}

/// Validates a numeric game id (the player's Faceit profile id)
pub fn validate_game_id(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if !GAME_ID_RE.is_match(trimmed) {
        return Err("invalid");
    }

    Ok(trimmed.to_string())
}

/// Validates a support ticket subject
pub fn validate_ticket_subject(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if trimmed.chars().count() > 255 {
        return Err("too_long");
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_validation() {
        // Valid nicknames
        assert!(validate_nickname("Zekiro").is_ok());
        assert!(validate_nickname("  player_01  ").is_ok());
        assert!(validate_nickname("Игрок_7").is_ok());

        // Invalid nicknames
        assert_eq!(validate_nickname(""), Err("empty"));
        assert_eq!(validate_nickname("   "), Err("empty"));
        assert_eq!(validate_nickname("ab"), Err("too_short"));
        assert_eq!(validate_nickname(&"a".repeat(33)), Err("too_long"));
        assert_eq!(validate_nickname("nick name"), Err("invalid_chars"));
        assert_eq!(validate_nickname("nick!"), Err("invalid_chars"));
    }

    #[test]
    fn test_nickname_trimming() {
        let result = validate_nickname("  Zekiro  ");
        assert_eq!(result.unwrap(), "Zekiro");
    }

    #[test]
    fn test_game_id_validation() {
        assert!(validate_game_id("12345").is_ok());
        assert!(validate_game_id(" 7 ").is_ok());

        assert_eq!(validate_game_id(""), Err("empty"));
        assert_eq!(validate_game_id("12a45"), Err("invalid"));
        assert_eq!(validate_game_id("12345678901"), Err("invalid"));
        assert_eq!(validate_game_id("-5"), Err("invalid"));
    }

    #[test]
    fn test_ticket_subject_validation() {
        assert!(validate_ticket_subject("Cannot join lobby").is_ok());
        assert_eq!(
            validate_ticket_subject("  match dispute  ").unwrap(),
            "match dispute"
        );

        assert_eq!(validate_ticket_subject(""), Err("empty"));
        assert_eq!(validate_ticket_subject("   "), Err("empty"));
        assert_eq!(validate_ticket_subject(&"a".repeat(256)), Err("too_long"));
    }
}
