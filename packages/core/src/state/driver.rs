//! Асинхронный драйвер сессии
//!
//! Владеет `ChatClient` внутри одной задачи tokio. Намерения пользователя и
//! события транспорта приходят через один mpsc-канал и применяются строго
//! в порядке поступления, из какого бы потока их ни прислали.

use crate::config::Config;
use crate::crypto::CryptoProvider;
use crate::protocol::transport::EventTransport;
use crate::protocol::wire::WireEvent;
use crate::state::app::ChatClient;
use crate::state::conversation::ChatMessage;
use crate::utils::error::{ChatError, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Действие пользователя
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Connect,
    RetryConnect,
    SubmitEntry { nickname: String, room_code: String },
    CancelWait,
    Exit,
}

#[derive(Debug)]
pub enum DriverInput {
    Intent {
        intent: Intent,
        reply: oneshot::Sender<Result<()>>,
    },
    SendText {
        text: String,
        reply: oneshot::Sender<Result<ChatMessage>>,
    },
    Server(WireEvent),
    Shutdown,
}

/// Клонируемая ручка для UI и транспорта
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<DriverInput>,
}

fn driver_gone() -> ChatError {
    ChatError::InvalidState("session driver stopped".to_string())
}

impl SessionHandle {
    async fn intent(&self, intent: Intent) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(DriverInput::Intent { intent, reply })
            .await
            .map_err(|_| driver_gone())?;
        response.await.map_err(|_| driver_gone())?
    }

    pub async fn connect(&self) -> Result<()> {
        self.intent(Intent::Connect).await
    }

    pub async fn retry_connect(&self) -> Result<()> {
        self.intent(Intent::RetryConnect).await
    }

    pub async fn submit_entry(&self, nickname: &str, room_code: &str) -> Result<()> {
        self.intent(Intent::SubmitEntry {
            nickname: nickname.to_string(),
            room_code: room_code.to_string(),
        })
        .await
    }

    pub async fn cancel_wait(&self) -> Result<()> {
        self.intent(Intent::CancelWait).await
    }

    pub async fn exit(&self) -> Result<()> {
        self.intent(Intent::Exit).await
    }

    pub async fn send_text(&self, text: &str) -> Result<ChatMessage> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(DriverInput::SendText {
                text: text.to_string(),
                reply,
            })
            .await
            .map_err(|_| driver_gone())?;
        response.await.map_err(|_| driver_gone())?
    }

    /// Передать событие от сервера; ошибки обработки только логируются
    pub async fn deliver(&self, wire: WireEvent) -> Result<()> {
        self.sender
            .send(DriverInput::Server(wire))
            .await
            .map_err(|_| driver_gone())
    }

    /// Неблокирующая доставка для колбэков транспорта вне async-контекста
    pub fn try_deliver(&self, wire: WireEvent) -> Result<()> {
        self.sender.try_send(DriverInput::Server(wire)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ChatError::Transport("session driver queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => driver_gone(),
        })
    }

    pub async fn shutdown(&self) {
        if self.sender.send(DriverInput::Shutdown).await.is_err() {
            debug!(target: "state::driver", "Driver already stopped");
        }
    }
}

pub struct SessionDriver<P: CryptoProvider, T: EventTransport> {
    client: ChatClient<P, T>,
    inbox: mpsc::Receiver<DriverInput>,
}

impl<P: CryptoProvider, T: EventTransport> SessionDriver<P, T> {
    pub fn new(client: ChatClient<P, T>, capacity: usize) -> (Self, SessionHandle) {
        let (sender, inbox) = mpsc::channel(capacity.max(1));
        (Self { client, inbox }, SessionHandle { sender })
    }

    /// Обрабатывать вход, пока не придёт `Shutdown` или не закроются все ручки.
    /// Возвращает клиента, чтобы вызывающий мог забрать итоговое состояние.
    pub async fn run(mut self) -> ChatClient<P, T> {
        info!(target: "state::driver", "Session driver started");

        while let Some(input) = self.inbox.recv().await {
            match input {
                DriverInput::Intent { intent, reply } => {
                    let result = self.apply(intent);
                    if reply.send(result).is_err() {
                        debug!(target: "state::driver", "Intent caller went away");
                    }
                }
                DriverInput::SendText { text, reply } => {
                    let result = self.client.send_text(&text);
                    if reply.send(result).is_err() {
                        debug!(target: "state::driver", "Send caller went away");
                    }
                }
                DriverInput::Server(wire) => {
                    if let Err(e) = self.client.handle_wire_event(&wire) {
                        warn!(target: "state::driver", event = %wire.name, error = %e, "Server event not applied");
                    }
                }
                DriverInput::Shutdown => break,
            }
        }

        info!(target: "state::driver", state = ?self.client.state(), "Session driver stopped");
        self.client
    }

    fn apply(&mut self, intent: Intent) -> Result<()> {
        match intent {
            Intent::Connect => self.client.connect(),
            Intent::RetryConnect => self.client.retry_connect(),
            Intent::SubmitEntry {
                nickname,
                room_code,
            } => self.client.submit_entry(&nickname, &room_code),
            Intent::CancelWait => self.client.cancel_wait(),
            Intent::Exit => self.client.exit(),
        }
    }
}

/// Запустить драйвер в фоновой задаче с ёмкостью очереди из `Config`
pub fn spawn<P, T>(client: ChatClient<P, T>) -> (SessionHandle, JoinHandle<ChatClient<P, T>>)
where
    P: CryptoProvider,
    T: EventTransport + 'static,
{
    let (driver, handle) = SessionDriver::new(client, Config::global().driver_queue_capacity);
    (handle, tokio::spawn(driver.run()))
}
