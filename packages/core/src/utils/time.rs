// Время

use chrono::{DateTime, TimeZone, Utc};

/// Текущее время в миллисекундах с начала эпохи
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Timestamp отправителя → DateTime для отображения.
/// Значение не проверяется и используется только для показа.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}
