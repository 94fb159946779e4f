//! Машина состояний входа в комнату и обмена ключами
//!
//! ```text
//! Idle ─connect─▶ Connecting ─connected─▶ Connected ─submit─▶ EntrySubmitted
//!                     │                     ▲   ▲                 │  │
//!               connect_error     occupied  │   │ cancel    await │  │ success
//!                     ▼                     │   │                 ▼  │
//!                ConnectError ──retry──▶ ...│   └──────────── AwaitingPeer
//!                                           │                     │ success
//!                                           │                     ▼
//!                                           │          KeyExchangePending ◀─ receive key
//!                                           │                     │ self key sent + peer key imported
//!                                           │                     ▼
//!                                 Idle ◀─finish── Terminated ◀─exit── Active
//! ```
//!
//! Машина не владеет ключами: она получает `SessionContext` и транспорт
//! по ссылке на каждый переход.

use crate::crypto::CryptoProvider;
use crate::protocol::messages::{ClientEvent, EntryData, EntrySuccessData, KeyData};
use crate::protocol::transport::{ConnectionState, EventTransport};
use crate::protocol::validation::validate_entry;
use crate::state::session::{PeerIdentity, SessionContext};
use crate::utils::error::{ChatError, Result};
use tracing::{debug, error, info, warn};

/// Где сейчас находится handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairingState {
    Idle,
    Connecting,
    Connected,
    ConnectError,
    EntrySubmitted,
    AwaitingPeer,
    KeyExchangePending,
    Active,
    Terminated,
}

impl PairingState {
    /// Пара уже найдена, ключи этой сессии в игре
    pub fn is_paired(&self) -> bool {
        matches!(self, PairingState::KeyExchangePending | PairingState::Active)
    }
}

/// Отказ сервера во входе; пользователь может отправить форму снова
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingConflict {
    NameOccupied,
    CodeOccupied,
}

#[derive(Debug)]
pub struct PairingStateMachine {
    state: PairingState,
    last_conflict: Option<PairingConflict>,
}

impl Default for PairingStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PairingStateMachine {
    pub fn new() -> Self {
        Self {
            state: PairingState::Idle,
            last_conflict: None,
        }
    }

    pub fn state(&self) -> PairingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == PairingState::Active
    }

    pub fn last_conflict(&self) -> Option<PairingConflict> {
        self.last_conflict
    }

    fn transition(&mut self, to: PairingState) {
        if self.state != to {
            debug!(target: "pairing::state", from = ?self.state, to = ?to, "transition");
            self.state = to;
        }
    }

    fn invalid(&self, action: &str) -> ChatError {
        ChatError::InvalidState(format!("cannot {} in state {:?}", action, self.state))
    }

    // ------------------------------------------------------------------
    // Намерения пользователя
    // ------------------------------------------------------------------

    /// Открыть транспорт. Повтор после `ConnectError` тоже идёт сюда.
    pub fn connect(&mut self, transport: &mut dyn EventTransport) -> Result<()> {
        match self.state {
            PairingState::Idle | PairingState::ConnectError => {}
            _ => return Err(self.invalid("connect")),
        }

        if transport.state() == ConnectionState::Connected {
            // транспорт пережил предыдущую сессию
            self.transition(PairingState::Connected);
            return Ok(());
        }

        transport.connect()?;
        self.transition(PairingState::Connecting);
        Ok(())
    }

    /// Отправить никнейм и код комнаты.
    ///
    /// Ошибки валидации возвращаются синхронно, состояние не меняется
    /// и в транспорт ничего не уходит.
    pub fn submit_entry<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
        nickname: &str,
        room_code: &str,
    ) -> Result<()> {
        if self.state != PairingState::Connected {
            return Err(self.invalid("submit entry"));
        }

        validate_entry(nickname, room_code)?;

        // ключ мог прийти от прошлой комнаты
        ctx.abandon_attempt();

        transport.emit(&ClientEvent::Entry(EntryData {
            name: nickname.to_lowercase(),
            code: room_code.to_string(),
        }))?;

        ctx.set_nickname(nickname.to_string());
        self.last_conflict = None;
        self.transition(PairingState::EntrySubmitted);
        Ok(())
    }

    /// Перестать ждать собеседника. Ключи ещё не созданы, их не трогаем.
    pub fn cancel_wait<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
    ) -> Result<()> {
        if self.state != PairingState::AwaitingPeer {
            return Err(self.invalid("cancel waiting"));
        }

        transport.emit(&ClientEvent::Exit)?;
        ctx.abandon_attempt();
        self.transition(PairingState::Connected);
        Ok(())
    }

    /// Пользователь выходит из текущей попытки.
    ///
    /// В ожидании собеседника это отмена; после входа сессия завершается
    /// (ровно один `exit`) и контекст сбрасывается.
    pub fn exit<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
    ) -> Result<()> {
        match self.state {
            PairingState::AwaitingPeer => self.cancel_wait(ctx, transport),
            PairingState::EntrySubmitted
            | PairingState::KeyExchangePending
            | PairingState::Active => {
                let terminated = self.terminate(ctx, transport);
                let finished = self.finish(ctx);
                terminated.and(finished)
            }
            PairingState::Terminated => self.finish(ctx),
            _ => Err(self.invalid("exit")),
        }
    }

    /// `Terminated → Idle`: сброс ключей и данных собеседника
    pub fn finish<P: CryptoProvider>(&mut self, ctx: &mut SessionContext<P>) -> Result<()> {
        if self.state != PairingState::Terminated {
            return Err(self.invalid("finish session"));
        }
        self.last_conflict = None;
        self.transition(PairingState::Idle);
        ctx.reset()
    }

    // ------------------------------------------------------------------
    // События транспорта
    // ------------------------------------------------------------------

    pub fn on_connected(&mut self, transport: &mut dyn EventTransport) {
        transport.mark_connected();
        match self.state {
            PairingState::Connecting | PairingState::ConnectError => {
                info!(target: "pairing::state", "Transport connected");
                self.transition(PairingState::Connected);
            }
            other => {
                debug!(target: "pairing::state", state = ?other, "Ignoring connected event");
            }
        }
    }

    pub fn on_connect_error(&mut self, transport: &mut dyn EventTransport) -> Result<()> {
        match self.state {
            PairingState::Connecting | PairingState::Connected => {
                warn!(target: "pairing::state", "Transport connect error");
                if let Err(e) = transport.disconnect() {
                    warn!(target: "pairing::state", error = %e, "Disconnect after connect error failed");
                }
                self.transition(PairingState::ConnectError);
                Ok(())
            }
            _ => Err(self.invalid("handle connect error")),
        }
    }

    pub fn on_entry_conflict<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        conflict: PairingConflict,
    ) -> Result<()> {
        if self.state != PairingState::EntrySubmitted {
            return Err(self.invalid("handle entry conflict"));
        }
        info!(target: "pairing::state", conflict = ?conflict, "Entry rejected by server");
        ctx.abandon_attempt();
        self.last_conflict = Some(conflict);
        self.transition(PairingState::Connected);
        Ok(())
    }

    pub fn on_await(&mut self) -> Result<()> {
        if self.state != PairingState::EntrySubmitted {
            return Err(self.invalid("await peer"));
        }
        self.transition(PairingState::AwaitingPeer);
        Ok(())
    }

    /// Пара найдена: свежие ключи, отправка своего публичного ключа.
    ///
    /// Сервер может сразу ответить `success` без `await`, если собеседник
    /// уже ждал, поэтому принимаем и из `EntrySubmitted`.
    pub fn on_entry_success<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
        data: EntrySuccessData,
    ) -> Result<PairingState> {
        match self.state {
            PairingState::AwaitingPeer | PairingState::EntrySubmitted => {}
            _ => return Err(self.invalid("handle entry success")),
        }

        let parked = ctx.take_parked_peer_key();

        if let Err(e) = self.share_fresh_public_key(ctx, transport) {
            error!(target: "pairing::state", error = %e, "Key exchange could not start");
            return Err(self.abort(ctx, transport, e));
        }

        info!(
            target: "pairing::state",
            peer = %data.chatting_with,
            "Paired, public key sent"
        );
        ctx.set_peer(PeerIdentity {
            display_name: data.chatting_with,
        });
        self.transition(PairingState::KeyExchangePending);

        if let Some(bytes) = parked {
            debug!(target: "pairing::state", "Importing peer key received before pairing");
            return self.import_peer_key(ctx, transport, &bytes);
        }
        Ok(self.state)
    }

    fn share_fresh_public_key<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
    ) -> Result<()> {
        ctx.keys_mut().reset()?;
        let public_key = ctx.keys().export_self_public_key()?;
        transport.emit(&ClientEvent::SendKey(KeyData { public_key }))?;
        ctx.mark_self_key_sent();
        Ok(())
    }

    /// Ключ собеседника пришёл.
    ///
    /// До `entry: success` ключ откладывается до генерации своей пары.
    /// Повторный ключ в сессии — логическая ошибка, текущий ключ остаётся.
    pub fn on_receive_key<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
        data: KeyData,
    ) -> Result<PairingState> {
        match self.state {
            PairingState::EntrySubmitted | PairingState::AwaitingPeer => {
                if ctx.park_peer_key(data.public_key) {
                    debug!(target: "pairing::state", "Peer key parked until pairing completes");
                    Ok(self.state)
                } else {
                    warn!(target: "pairing::state", "Second peer key before pairing rejected");
                    Err(ChatError::DuplicatePeerKey)
                }
            }
            PairingState::KeyExchangePending => {
                self.import_peer_key(ctx, transport, &data.public_key)
            }
            PairingState::Active => {
                warn!(target: "pairing::state", "Peer key received in active session rejected");
                Err(ChatError::DuplicatePeerKey)
            }
            _ => Err(self.invalid("import peer key")),
        }
    }

    fn import_peer_key<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
        bytes: &[u8],
    ) -> Result<PairingState> {
        match ctx.keys_mut().import_peer_public_key(bytes) {
            Ok(()) => {
                self.check_key_exchange(ctx);
                Ok(self.state)
            }
            Err(ChatError::DuplicatePeerKey) => Err(ChatError::DuplicatePeerKey),
            Err(e) => {
                error!(target: "pairing::state", error = %e, "Peer key unusable, terminating session");
                Err(self.abort(ctx, transport, e))
            }
        }
    }

    fn check_key_exchange<P: CryptoProvider>(&mut self, ctx: &SessionContext<P>) {
        if self.state == PairingState::KeyExchangePending && ctx.key_exchange_complete() {
            info!(target: "pairing::state", "Key exchange complete, session active");
            self.transition(PairingState::Active);
        }
    }

    /// Собеседник вышел
    pub fn on_user_exited<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
    ) -> Result<()> {
        match self.state {
            PairingState::KeyExchangePending | PairingState::Active => {
                info!(target: "pairing::state", "Peer left the session");
                self.terminate(ctx, transport)
            }
            PairingState::Terminated => Ok(()),
            _ => Err(self.invalid("handle user exited")),
        }
    }

    /// Завершить сессию: не более одного `exit`, затем безусловный сброс ключей
    fn terminate<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
    ) -> Result<()> {
        if !ctx.exit_sent() {
            if let Err(e) = transport.emit(&ClientEvent::Exit) {
                warn!(target: "pairing::state", error = %e, "Failed to emit exit");
            }
            ctx.mark_exit_sent();
        }
        self.transition(PairingState::Terminated);
        ctx.reset_keys()
    }

    /// Фатальная ошибка сессии: завершить и вернуть исходную ошибку
    fn abort<P: CryptoProvider>(
        &mut self,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
        cause: ChatError,
    ) -> ChatError {
        if let Err(e) = self.terminate(ctx, transport) {
            error!(target: "pairing::state", error = %e, "Key reset after abort failed");
        }
        cause
    }
}
