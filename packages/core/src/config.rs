//! Централизованная конфигурация для paircode core
//!
//! Все константы протокола и криптографии определены здесь,
//! чтобы избежать хардкода по всему проекту.

use std::sync::OnceLock;

/// Глобальная конфигурация (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // КРИПТОГРАФИЧЕСКИЕ ПАРАМЕТРЫ
    // ============================================

    /// Длина симметричного ключа ChaCha20-Poly1305 (в байтах)
    pub key_length: usize,

    /// Длина nonce для ChaCha20-Poly1305 (в байтах)
    pub chacha_nonce_length: usize,

    /// Размер Poly1305 authentication tag (в байтах)
    pub aead_tag_length: usize,

    /// Размер публичного ключа X25519 (в байтах)
    pub public_key_size: usize,

    /// ID классического криптографического набора (Classic Suite)
    pub classic_suite_id: u16,

    /// HKDF info для деривации ключа сообщения
    pub message_kdf_info: &'static [u8],

    // ============================================
    // ВАЛИДАЦИЯ ВХОДА
    // ============================================

    /// Минимальная длина никнейма (в символах)
    pub nickname_min_length: usize,

    /// Минимальная длина кода комнаты (в символах)
    pub room_code_min_length: usize,

    // ============================================
    // СЕССИЯ
    // ============================================

    /// Сколько входящих конвертов держать до завершения обмена ключами
    pub max_pending_envelopes: usize,

    /// Ёмкость входной очереди SessionDriver
    pub driver_queue_capacity: usize,

    // ============================================
    // СЕТЕВЫЕ ПАРАМЕТРЫ
    // ============================================

    /// Начальная задержка для exponential backoff при переподключении (в миллисекундах)
    pub connect_retry_initial_ms: u64,

    /// Максимальная задержка для exponential backoff (в миллисекундах)
    pub connect_retry_max_ms: u64,

    /// Максимальное количество попыток подключения (0 = бесконечно)
    pub connect_retry_max_attempts: u32,
}

impl Config {
    /// Создать конфигурацию с дефолтными значениями
    pub fn default() -> Self {
        Self {
            // Криптография
            key_length: 32,
            chacha_nonce_length: 12,
            aead_tag_length: 16,
            public_key_size: 32,
            classic_suite_id: 1,
            message_kdf_info: b"paircode-message-key-v1",

            // Валидация
            nickname_min_length: 2,
            room_code_min_length: 4,

            // Сессия
            max_pending_envelopes: 64,
            driver_queue_capacity: 256,

            // Сеть
            connect_retry_initial_ms: 1000,
            connect_retry_max_ms: 30000,
            connect_retry_max_attempts: 0,
        }
    }

    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PAIRCODE_MAX_PENDING_ENVELOPES") {
            if let Ok(parsed) = val.parse() {
                config.max_pending_envelopes = parsed;
            }
        }

        if let Ok(val) = std::env::var("PAIRCODE_DRIVER_QUEUE_CAPACITY") {
            if let Ok(parsed) = val.parse() {
                config.driver_queue_capacity = parsed;
            }
        }

        if let Ok(val) = std::env::var("PAIRCODE_CONNECT_RETRY_INITIAL_MS") {
            if let Ok(parsed) = val.parse() {
                config.connect_retry_initial_ms = parsed;
            }
        }

        if let Ok(val) = std::env::var("PAIRCODE_CONNECT_RETRY_MAX_MS") {
            if let Ok(parsed) = val.parse() {
                config.connect_retry_max_ms = parsed;
            }
        }

        if let Ok(val) = std::env::var("PAIRCODE_CONNECT_RETRY_MAX_ATTEMPTS") {
            if let Ok(parsed) = val.parse() {
                config.connect_retry_max_attempts = parsed;
            }
        }

        config
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }

    /// Проверить, инициализирована ли глобальная конфигурация
    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }
}
