// Протокол обмена с relay-сервером

pub mod messages;
pub mod transport;
pub mod validation;
pub mod wire;

pub use messages::{ClientEvent, ServerEvent};
pub use transport::{ChannelTransport, ConnectionState, EventTransport};
pub use wire::WireEvent;
