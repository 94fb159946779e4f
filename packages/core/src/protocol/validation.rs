// Валидация данных для входа в комнату
// Ошибки валидации не доходят до транспорта и не меняют состояние

use crate::config::Config;
use std::fmt;
use thiserror::Error;

/// Диапазон CJK-иероглифов, допустимых в никнейме
const CJK_RANGE: std::ops::RangeInclusive<char> = '\u{4E00}'..='\u{9FA5}';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NicknameError {
    #[error("Nickname must be at least {min} characters")]
    TooShort { min: usize },
    #[error("Nickname must start with a letter")]
    LeadingNotLetter,
    #[error("Nickname contains illegal character '{0}'")]
    IllegalCharacter(char),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomCodeError {
    #[error("Room code must be at least {min} characters")]
    TooShort { min: usize },
    #[error("Room code must be alphanumeric, found '{0}'")]
    NotAlphanumeric(char),
}

/// Ошибки по полям формы входа; заполнено хотя бы одно поле
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryValidationError {
    pub nickname: Option<NicknameError>,
    pub room_code: Option<RoomCodeError>,
}

impl EntryValidationError {
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none() && self.room_code.is_none()
    }
}

impl fmt::Display for EntryValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.nickname, &self.room_code) {
            (Some(nickname), Some(code)) => write!(f, "{}; {}", nickname, code),
            (Some(nickname), None) => write!(f, "{}", nickname),
            (None, Some(code)) => write!(f, "{}", code),
            (None, None) => write!(f, "no validation errors"),
        }
    }
}

impl std::error::Error for EntryValidationError {}

fn is_nickname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || CJK_RANGE.contains(&c) || c == '-' || c == '_'
}

/// Валидация никнейма: не короче минимума, начинается с буквы,
/// только латиница, цифры, CJK, `-` и `_`
pub fn validate_nickname(nickname: &str) -> Result<(), NicknameError> {
    let min = Config::global().nickname_min_length;
    if nickname.chars().count() < min {
        return Err(NicknameError::TooShort { min });
    }

    match nickname.chars().next() {
        Some(first) if first.is_alphabetic() => {}
        _ => return Err(NicknameError::LeadingNotLetter),
    }

    if let Some(illegal) = nickname.chars().find(|c| !is_nickname_char(*c)) {
        return Err(NicknameError::IllegalCharacter(illegal));
    }

    Ok(())
}

/// Валидация кода комнаты: не короче минимума, только буквы и цифры
pub fn validate_room_code(room_code: &str) -> Result<(), RoomCodeError> {
    let min = Config::global().room_code_min_length;
    if room_code.chars().count() < min {
        return Err(RoomCodeError::TooShort { min });
    }

    if let Some(illegal) = room_code.chars().find(|c| !c.is_alphanumeric()) {
        return Err(RoomCodeError::NotAlphanumeric(illegal));
    }

    Ok(())
}

/// Проверить оба поля сразу, чтобы вызывающий показал все ошибки
pub fn validate_entry(nickname: &str, room_code: &str) -> Result<(), EntryValidationError> {
    let error = EntryValidationError {
        nickname: validate_nickname(nickname).err(),
        room_code: validate_room_code(room_code).err(),
    };
    if error.is_empty() {
        Ok(())
    } else {
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_nicknames() {
        for nickname in ["al", "alice", "Bob_1", "a-b", "张三", "李4_x", "z9"] {
            assert!(validate_nickname(nickname).is_ok(), "{} should be valid", nickname);
        }
    }

    #[test]
    fn test_nickname_too_short() {
        assert_eq!(validate_nickname(""), Err(NicknameError::TooShort { min: 2 }));
        assert_eq!(validate_nickname("a"), Err(NicknameError::TooShort { min: 2 }));
        assert_eq!(validate_nickname("张"), Err(NicknameError::TooShort { min: 2 }));
    }

    #[test]
    fn test_nickname_leading_character() {
        for nickname in ["1alice", "_alice", "-alice", " alice"] {
            assert_eq!(validate_nickname(nickname), Err(NicknameError::LeadingNotLetter));
        }
    }

    #[test]
    fn test_nickname_illegal_characters() {
        assert_eq!(validate_nickname("al ice"), Err(NicknameError::IllegalCharacter(' ')));
        assert_eq!(validate_nickname("alice!"), Err(NicknameError::IllegalCharacter('!')));
        assert_eq!(validate_nickname("al.ice"), Err(NicknameError::IllegalCharacter('.')));
        // буква, но вне разрешённого набора
        assert_eq!(validate_nickname("éclair"), Err(NicknameError::IllegalCharacter('é')));
    }

    #[test]
    fn test_room_codes() {
        assert!(validate_room_code("1234").is_ok());
        assert!(validate_room_code("abcd").is_ok());
        assert!(validate_room_code("Ab12cD").is_ok());
        assert_eq!(validate_room_code("123"), Err(RoomCodeError::TooShort { min: 4 }));
        assert_eq!(validate_room_code(""), Err(RoomCodeError::TooShort { min: 4 }));
        assert_eq!(validate_room_code("12 34"), Err(RoomCodeError::NotAlphanumeric(' ')));
        assert_eq!(validate_room_code("12-34"), Err(RoomCodeError::NotAlphanumeric('-')));
    }

    #[test]
    fn test_validate_entry_reports_both_fields() {
        let error = validate_entry("1", "x").unwrap_err();
        assert_eq!(error.nickname, Some(NicknameError::TooShort { min: 2 }));
        assert_eq!(error.room_code, Some(RoomCodeError::TooShort { min: 4 }));

        let error = validate_entry("alice", "x").unwrap_err();
        assert!(error.nickname.is_none());
        assert!(error.room_code.is_some());

        assert!(validate_entry("alice", "1234").is_ok());
    }
}
