// Типы событий протокола
// Соответствуют именованным событиям канала к relay-серверу

use serde::{Deserialize, Serialize};

/// Имена событий на канале
pub mod names {
    // сервер → клиент
    pub const CONNECTED: &str = "connected";
    pub const CONNECT_ERROR: &str = "connect_error";
    pub const ENTRY_NAME_OCCUPIED: &str = "entry: name occupied";
    pub const ENTRY_CODE_OCCUPIED: &str = "entry: code occupied";
    pub const ENTRY_AWAIT: &str = "entry: await";
    pub const ENTRY_SUCCESS: &str = "entry: success";
    pub const RECEIVE_KEY: &str = "receive key";
    pub const RECEIVE_MESSAGE: &str = "receive message";
    pub const USER_EXITED: &str = "user exited";

    // клиент → сервер
    pub const ENTRY: &str = "entry";
    pub const EXIT: &str = "exit";
    pub const SEND_KEY: &str = "send key";
    pub const SEND_MESSAGE: &str = "send message";
}

/// Запрос на вход в комнату
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    /// Никнейм в нижнем регистре
    pub name: String,
    pub code: String,
}

/// Сервер нашёл пару
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySuccessData {
    pub chatting_with: String,
}

/// Публичный ключ (в обе стороны)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyData {
    /// Сериализованный `PublicKeyDocument`
    #[serde(with = "crate::utils::b64::bytes")]
    pub public_key: Vec<u8>,
}

/// Входящее зашифрованное сообщение
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessageData {
    pub from: String,
    #[serde(with = "crate::utils::b64::bytes")]
    pub text: Vec<u8>,
    /// Время отправителя в миллисекундах, только для отображения
    pub time: i64,
}

/// Исходящее зашифрованное сообщение
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessageData {
    #[serde(with = "crate::utils::b64::bytes")]
    pub text: Vec<u8>,
    pub time: i64,
}

/// Событие от сервера (или транспорта) к клиенту
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Connected,
    ConnectError,
    NameOccupied,
    CodeOccupied,
    Await,
    EntrySuccess(EntrySuccessData),
    ReceiveKey(KeyData),
    ReceiveMessage(IncomingMessageData),
    UserExited,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected => names::CONNECTED,
            ServerEvent::ConnectError => names::CONNECT_ERROR,
            ServerEvent::NameOccupied => names::ENTRY_NAME_OCCUPIED,
            ServerEvent::CodeOccupied => names::ENTRY_CODE_OCCUPIED,
            ServerEvent::Await => names::ENTRY_AWAIT,
            ServerEvent::EntrySuccess(_) => names::ENTRY_SUCCESS,
            ServerEvent::ReceiveKey(_) => names::RECEIVE_KEY,
            ServerEvent::ReceiveMessage(_) => names::RECEIVE_MESSAGE,
            ServerEvent::UserExited => names::USER_EXITED,
        }
    }
}

/// Событие от клиента к серверу
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Entry(EntryData),
    Exit,
    SendKey(KeyData),
    SendMessage(OutgoingMessageData),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Entry(_) => names::ENTRY,
            ClientEvent::Exit => names::EXIT,
            ClientEvent::SendKey(_) => names::SEND_KEY,
            ClientEvent::SendMessage(_) => names::SEND_MESSAGE,
        }
    }
}
