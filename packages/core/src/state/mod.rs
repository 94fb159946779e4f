// Состояние сессии и клиента

pub mod app;
pub mod conversation;
pub mod driver;
pub mod pairing;
pub mod session;

pub use app::{ChatClient, Notification, ReconnectState};
pub use conversation::{ChatMessage, Conversation};
pub use driver::{SessionDriver, SessionHandle};
pub use pairing::{PairingConflict, PairingState, PairingStateMachine};
pub use session::{PeerIdentity, SessionContext};
