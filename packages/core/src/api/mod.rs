// Публичный API для работы с сообщениями

pub mod messaging;

pub use messaging::{Delivery, EncryptedEnvelope, MessagingPipeline};
