// Wire format: (имя события, JSON payload)
// Транспорт передаёт пары как есть, фрейминг — его забота

use crate::protocol::messages::{names, ClientEvent, ServerEvent};
use crate::utils::error::{ChatError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Событие в том виде, в каком его видит транспорт
#[derive(Debug, Clone, PartialEq)]
pub struct WireEvent {
    pub name: String,
    pub payload: Option<Value>,
}

impl WireEvent {
    pub fn new(name: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Упаковать ClientEvent (клиент -> сервер)
pub fn encode_client_event(event: &ClientEvent) -> Result<WireEvent> {
    let payload = match event {
        ClientEvent::Entry(data) => Some(serde_json::to_value(data)?),
        ClientEvent::Exit => None,
        ClientEvent::SendKey(data) => Some(serde_json::to_value(data)?),
        ClientEvent::SendMessage(data) => Some(serde_json::to_value(data)?),
    };
    Ok(WireEvent::new(event.name(), payload))
}

/// Распаковать событие сервера (сервер -> клиент)
pub fn decode_server_event(wire: &WireEvent) -> Result<ServerEvent> {
    let event = match wire.name.as_str() {
        names::CONNECTED => ServerEvent::Connected,
        names::CONNECT_ERROR => ServerEvent::ConnectError,
        names::ENTRY_NAME_OCCUPIED => ServerEvent::NameOccupied,
        names::ENTRY_CODE_OCCUPIED => ServerEvent::CodeOccupied,
        names::ENTRY_AWAIT => ServerEvent::Await,
        names::ENTRY_SUCCESS => ServerEvent::EntrySuccess(payload(wire)?),
        names::RECEIVE_KEY => ServerEvent::ReceiveKey(payload(wire)?),
        names::RECEIVE_MESSAGE => ServerEvent::ReceiveMessage(payload(wire)?),
        names::USER_EXITED => ServerEvent::UserExited,
        other => {
            return Err(ChatError::Protocol(format!("Unknown event: {}", other)));
        }
    };
    Ok(event)
}

/// Распаковать событие клиента (для relay-тестов и loopback)
pub fn decode_client_event(wire: &WireEvent) -> Result<ClientEvent> {
    let event = match wire.name.as_str() {
        names::ENTRY => ClientEvent::Entry(payload(wire)?),
        names::EXIT => ClientEvent::Exit,
        names::SEND_KEY => ClientEvent::SendKey(payload(wire)?),
        names::SEND_MESSAGE => ClientEvent::SendMessage(payload(wire)?),
        other => {
            return Err(ChatError::Protocol(format!("Unknown event: {}", other)));
        }
    };
    Ok(event)
}

fn payload<T: DeserializeOwned>(wire: &WireEvent) -> Result<T> {
    let value = wire
        .payload
        .clone()
        .ok_or_else(|| ChatError::Protocol(format!("Event '{}' requires a payload", wire.name)))?;
    serde_json::from_value(value).map_err(|e| {
        ChatError::Protocol(format!("Malformed payload for '{}': {}", wire.name, e))
    })
}
