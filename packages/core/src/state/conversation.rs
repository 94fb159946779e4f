// Состояние беседы
// Живёт только в памяти и только до конца сессии

use chrono::{DateTime, Utc};

/// Расшифрованное (или отправленное) сообщение для presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Локальный UUID, сервер о нём не знает
    pub id: String,
    /// Отображаемое имя отправителя
    pub sender: String,
    pub text: String,
    /// Время отправителя; не проверяется, только для показа
    pub sent_at: DateTime<Utc>,
    pub outgoing: bool,
}

/// Лента сообщений текущей сессии
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    unread_count: u32,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить сообщение в порядке получения.
    /// По `sent_at` не сортируем: время задаёт отправитель.
    pub fn add_message(&mut self, message: ChatMessage) {
        if !message.outgoing {
            self.unread_count += 1;
        }
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn unread_count(&self) -> u32 {
        self.unread_count
    }

    pub fn mark_as_read(&mut self) {
        self.unread_count = 0;
    }

    /// Очистить все сообщения
    pub fn clear(&mut self) {
        self.messages.clear();
        self.unread_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::from_millis;

    fn message(sender: &str, millis: i64, outgoing: bool) -> ChatMessage {
        ChatMessage {
            id: crate::utils::uuid::generate_v4(),
            sender: sender.to_string(),
            text: format!("at {}", millis),
            sent_at: from_millis(millis),
            outgoing,
        }
    }

    #[test]
    fn test_keeps_arrival_order() {
        let mut conversation = Conversation::new();
        conversation.add_message(message("bob", 2000, false));
        conversation.add_message(message("bob", 1000, false));

        let texts: Vec<_> = conversation.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["at 2000", "at 1000"]);
    }

    #[test]
    fn test_unread_counts_only_incoming() {
        let mut conversation = Conversation::new();
        conversation.add_message(message("alice", 1, true));
        conversation.add_message(message("bob", 2, false));
        assert_eq!(conversation.unread_count(), 1);

        conversation.mark_as_read();
        assert_eq!(conversation.unread_count(), 0);
        assert_eq!(conversation.message_count(), 2);

        conversation.clear();
        assert!(conversation.last_message().is_none());
    }
}
