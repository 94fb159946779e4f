// Транспорт событий к relay-серверу
// Ядро требует только emit(событие) и упорядоченную доставку входящих событий

use crate::protocol::messages::ClientEvent;
use crate::protocol::wire::{encode_client_event, WireEvent};
use crate::utils::error::{ChatError, Result};
use tokio::sync::mpsc;
use tracing::trace;

/// Состояние соединения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// Двунаправленный упорядоченный канал событий.
///
/// Входящие события транспорт доставляет отдельно (через `SessionDriver`
/// или напрямую в `ChatClient::handle_server_event`), в порядке получения.
pub trait EventTransport: Send {
    /// Начать подключение; результат придёт событием `connected` / `connect_error`
    fn connect(&mut self) -> Result<()>;

    /// Отправить событие
    fn emit(&mut self, event: &ClientEvent) -> Result<()>;

    /// Закрыть соединение
    fn disconnect(&mut self) -> Result<()>;

    /// Текущее состояние соединения
    fn state(&self) -> ConnectionState;

    /// Отметить, что транспорт сообщил об успешном подключении
    fn mark_connected(&mut self);
}

/// Транспорт поверх mpsc-канала: исходящие события уходят в `UnboundedReceiver`
/// в wire-формате. Используется для loopback и тестов, а также как адаптер
/// к настоящему сокету, который читает из канала.
pub struct ChannelTransport {
    outgoing: mpsc::UnboundedSender<WireEvent>,
    state: ConnectionState,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WireEvent>) {
        let (outgoing, receiver) = mpsc::unbounded_channel();
        (
            Self {
                outgoing,
                state: ConnectionState::Disconnected,
            },
            receiver,
        )
    }
}

impl EventTransport for ChannelTransport {
    fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Err(ChatError::Transport("Already connected".to_string()));
        }
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    fn emit(&mut self, event: &ClientEvent) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(ChatError::Transport("Not connected".to_string()));
        }
        let wire = encode_client_event(event)?;
        trace!(target: "protocol::transport", event = %wire.name, "emit");
        self.outgoing
            .send(wire)
            .map_err(|_| ChatError::Transport("Outgoing channel closed".to_string()))
    }

    fn disconnect(&mut self) -> Result<()> {
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn mark_connected(&mut self) {
        self.state = ConnectionState::Connected;
    }
}
