// Вспомогательные утилиты

pub mod b64;
pub mod error;
pub mod logging;
pub mod time;
pub mod uuid;
pub mod validation;
