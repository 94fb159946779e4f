// Paircode Core
// Ядро мессенджера «один на один по коду комнаты» со сквозным шифрованием

#![warn(clippy::all)]

// Модули
pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod protocol;
pub mod state;
pub mod utils;

// Re-exports для удобства
pub use crypto::suites::classic::ClassicSuiteProvider;
pub use state::{ChatClient, Notification, PairingState, SessionHandle};
pub use utils::error::{ChatError, Result};

/// Клиент с набором шифров по умолчанию
pub type ClassicChatClient<T> = ChatClient<ClassicSuiteProvider, T>;
