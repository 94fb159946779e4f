use crate::api::messaging::{Delivery, MessagingPipeline};
use crate::config::Config;
use crate::crypto::CryptoProvider;
use crate::protocol::messages::ServerEvent;
use crate::protocol::transport::EventTransport;
use crate::protocol::validation::EntryValidationError;
use crate::protocol::wire::{decode_server_event, WireEvent};
use crate::state::conversation::{ChatMessage, Conversation};
use crate::state::pairing::{PairingConflict, PairingState, PairingStateMachine};
use crate::state::session::SessionContext;
use crate::utils::error::{ChatError, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Сигналы для presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Connected,
    /// `retry_in_ms` = None, если попытки исчерпаны
    ConnectFailed {
        attempt: u32,
        retry_in_ms: Option<u64>,
    },
    ValidationFailed(EntryValidationError),
    EntryRejected(PairingConflict),
    AwaitingPeer,
    Paired {
        peer: String,
    },
    SessionActive,
    MessageReceived(ChatMessage),
    MessageDropped {
        reason: String,
    },
    PeerExited,
    SessionTerminated,
    /// Фатальная ошибка ключей, сессия уже завершена
    SessionFailed {
        reason: String,
    },
}

impl Notification {
    /// Короткое имя для логов; содержимое сообщений не логируется
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Connected => "connected",
            Notification::ConnectFailed { .. } => "connect_failed",
            Notification::ValidationFailed(_) => "validation_failed",
            Notification::EntryRejected(_) => "entry_rejected",
            Notification::AwaitingPeer => "awaiting_peer",
            Notification::Paired { .. } => "paired",
            Notification::SessionActive => "session_active",
            Notification::MessageReceived(_) => "message_received",
            Notification::MessageDropped { .. } => "message_dropped",
            Notification::PeerExited => "peer_exited",
            Notification::SessionTerminated => "session_terminated",
            Notification::SessionFailed { .. } => "session_failed",
        }
    }
}

/// Состояние автоматического переподключения
#[derive(Debug, Clone)]
pub struct ReconnectState {
    /// Количество неудачных попыток подряд
    attempts: u32,
    /// Максимальное количество попыток (0 = бесконечно)
    max_attempts: u32,
    /// Текущая задержка в миллисекундах
    current_delay_ms: u64,
    initial_delay_ms: u64,
    max_delay_ms: u64,
    enabled: bool,
}

impl ReconnectState {
    pub fn new() -> Self {
        let cfg = Config::global();
        Self {
            attempts: 0,
            max_attempts: cfg.connect_retry_max_attempts,
            current_delay_ms: cfg.connect_retry_initial_ms,
            initial_delay_ms: cfg.connect_retry_initial_ms,
            max_delay_ms: cfg.connect_retry_max_ms,
            enabled: true,
        }
    }

    /// Вычислить следующую задержку с exponential backoff
    pub fn next_delay(&mut self) -> u64 {
        let delay = self.current_delay_ms;
        self.current_delay_ms = self.current_delay_ms.saturating_mul(2).min(self.max_delay_ms);
        self.attempts += 1;
        delay
    }

    /// Сбросить счётчик попыток
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current_delay_ms = self.initial_delay_ms;
    }

    /// Проверить, можно ли продолжать попытки
    pub fn can_retry(&self) -> bool {
        self.enabled && (self.max_attempts == 0 || self.attempts < self.max_attempts)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Default for ReconnectState {
    fn default() -> Self {
        Self::new()
    }
}

/// Клиент одной попытки чата на устройстве.
///
/// Связывает машину состояний, контекст сессии, конвейер сообщений и
/// транспорт. Все методы синхронные; из нескольких потоков клиентом
/// управляет `SessionDriver`.
pub struct ChatClient<P: CryptoProvider, T: EventTransport> {
    machine: PairingStateMachine,
    session: SessionContext<P>,
    pipeline: MessagingPipeline<P>,
    transport: T,
    reconnect: ReconnectState,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl<P: CryptoProvider, T: EventTransport> ChatClient<P, T> {
    pub fn new(transport: T) -> Result<(Self, mpsc::UnboundedReceiver<Notification>)> {
        let (notifications, receiver) = mpsc::unbounded_channel();
        let client = Self {
            machine: PairingStateMachine::new(),
            session: SessionContext::new()?,
            pipeline: MessagingPipeline::new(),
            transport,
            reconnect: ReconnectState::new(),
            notifications,
        };
        Ok((client, receiver))
    }

    // === Намерения пользователя ===

    pub fn connect(&mut self) -> Result<()> {
        self.machine.connect(&mut self.transport)?;
        if self.machine.state() == PairingState::Connected {
            self.notify(Notification::Connected);
        }
        Ok(())
    }

    /// Повторить подключение после `connect_error`
    pub fn retry_connect(&mut self) -> Result<()> {
        if self.machine.state() != PairingState::ConnectError {
            return Err(ChatError::InvalidState(format!(
                "cannot retry connection in state {:?}",
                self.machine.state()
            )));
        }
        self.connect()
    }

    pub fn submit_entry(&mut self, nickname: &str, room_code: &str) -> Result<()> {
        let result = self
            .machine
            .submit_entry(&mut self.session, &mut self.transport, nickname, room_code);
        if let Err(ChatError::Validation(errors)) = &result {
            self.notify(Notification::ValidationFailed(errors.clone()));
        }
        result
    }

    pub fn cancel_wait(&mut self) -> Result<()> {
        self.machine.cancel_wait(&mut self.session, &mut self.transport)
    }

    /// Выйти из текущей попытки; после входа сессия завершается и сбрасывается
    pub fn exit(&mut self) -> Result<()> {
        let before = self.machine.state();
        let result = self.machine.exit(&mut self.session, &mut self.transport);
        if self.machine.state() == PairingState::Idle && before != PairingState::Idle {
            self.pipeline.clear();
            self.notify(Notification::SessionTerminated);
        }
        result
    }

    pub fn send_text(&mut self, text: &str) -> Result<ChatMessage> {
        self.pipeline
            .send_text(self.machine.state(), &mut self.session, &mut self.transport, text)
    }

    // === События транспорта ===

    /// Декодировать и применить событие в wire-формате
    pub fn handle_wire_event(&mut self, wire: &WireEvent) -> Result<()> {
        let event = decode_server_event(wire).map_err(|e| {
            warn!(target: "state::app", event = %wire.name, error = %e, "Undecodable server event");
            e
        })?;
        self.handle_server_event(event)
    }

    pub fn handle_server_event(&mut self, event: ServerEvent) -> Result<()> {
        trace!(target: "state::app", event = event.name(), state = ?self.machine.state(), "server event");

        match event {
            ServerEvent::Connected => {
                let before = self.machine.state();
                self.machine.on_connected(&mut self.transport);
                if before != PairingState::Connected && self.machine.state() == PairingState::Connected {
                    self.reconnect.reset();
                    self.notify(Notification::Connected);
                }
                Ok(())
            }
            ServerEvent::ConnectError => {
                self.machine.on_connect_error(&mut self.transport)?;
                let retry_in_ms = if self.reconnect.can_retry() {
                    Some(self.reconnect.next_delay())
                } else {
                    None
                };
                let attempt = self.reconnect.attempts();
                info!(target: "state::app", attempt, ?retry_in_ms, "Connection failed");
                self.notify(Notification::ConnectFailed { attempt, retry_in_ms });
                Ok(())
            }
            ServerEvent::NameOccupied => self.entry_conflict(PairingConflict::NameOccupied),
            ServerEvent::CodeOccupied => self.entry_conflict(PairingConflict::CodeOccupied),
            ServerEvent::Await => {
                self.machine.on_await()?;
                self.notify(Notification::AwaitingPeer);
                Ok(())
            }
            ServerEvent::EntrySuccess(data) => {
                let peer = data.chatting_with.clone();
                let result = self
                    .machine
                    .on_entry_success(&mut self.session, &mut self.transport, data);
                match result {
                    Ok(state) => {
                        self.notify(Notification::Paired { peer });
                        if state == PairingState::Active {
                            self.activate();
                        }
                        Ok(())
                    }
                    Err(e) => Err(self.session_error(e)),
                }
            }
            ServerEvent::ReceiveKey(data) => {
                let before = self.machine.state();
                let result = self
                    .machine
                    .on_receive_key(&mut self.session, &mut self.transport, data);
                match result {
                    Ok(PairingState::Active) if before != PairingState::Active => {
                        self.activate();
                        Ok(())
                    }
                    Ok(_) => Ok(()),
                    Err(e) => Err(self.session_error(e)),
                }
            }
            ServerEvent::ReceiveMessage(data) => {
                let result = self.pipeline.on_ciphertext_received(
                    self.machine.state(),
                    &mut self.session,
                    data.into(),
                );
                match result {
                    Ok(Delivery::Delivered(message)) => {
                        self.notify(Notification::MessageReceived(message));
                        Ok(())
                    }
                    Ok(Delivery::Queued) => Ok(()),
                    Err(e) => {
                        self.notify(Notification::MessageDropped {
                            reason: e.to_string(),
                        });
                        Err(e)
                    }
                }
            }
            ServerEvent::UserExited => {
                let before = self.machine.state();
                self.machine.on_user_exited(&mut self.session, &mut self.transport)?;
                if before != PairingState::Terminated {
                    self.pipeline.clear();
                    self.notify(Notification::PeerExited);
                }
                Ok(())
            }
        }
    }

    fn entry_conflict(&mut self, conflict: PairingConflict) -> Result<()> {
        self.machine.on_entry_conflict(&mut self.session, conflict)?;
        self.notify(Notification::EntryRejected(conflict));
        Ok(())
    }

    /// Обмен ключами завершён: сигнал и расшифровка отложенных сообщений
    fn activate(&mut self) {
        self.notify(Notification::SessionActive);
        for result in self.pipeline.drain_pending(&mut self.session) {
            match result {
                Ok(message) => self.notify(Notification::MessageReceived(message)),
                Err(e) => self.notify(Notification::MessageDropped {
                    reason: e.to_string(),
                }),
            }
        }
    }

    fn session_error(&mut self, error: ChatError) -> ChatError {
        if error.is_fatal() {
            self.pipeline.clear();
            self.notify(Notification::SessionFailed {
                reason: error.to_string(),
            });
        }
        error
    }

    fn notify(&self, notification: Notification) {
        debug!(target: "state::app", kind = notification.kind(), "notify");
        if self.notifications.send(notification).is_err() {
            trace!(target: "state::app", "Notification receiver dropped");
        }
    }

    // === Геттеры ===

    pub fn state(&self) -> PairingState {
        self.machine.state()
    }

    pub fn last_conflict(&self) -> Option<PairingConflict> {
        self.machine.last_conflict()
    }

    pub fn session(&self) -> &SessionContext<P> {
        &self.session
    }

    pub fn conversation(&self) -> &Conversation {
        self.session.conversation()
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        self.session.conversation_mut()
    }

    pub fn pending_messages(&self) -> usize {
        self.pipeline.pending_count()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn reconnect_state(&self) -> &ReconnectState {
        &self.reconnect
    }

    pub fn reconnect_state_mut(&mut self) -> &mut ReconnectState {
        &mut self.reconnect
    }
}
