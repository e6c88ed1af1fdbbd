//! Viewer-side client for an officepulse relay hub.
//!
//! [`ConnectionManager`] keeps one WebSocket or SSE transport open with
//! exponential backoff and publishes validated events on a broadcast
//! channel. [`OfficeSession`] subscribes presence, effects, chaos and the
//! event log to that channel and exposes a combined reset and snapshot.

pub mod config;
pub mod connection;
pub mod event_log;
pub mod session;
pub mod transport;

pub use config::{load_config, Config, ConfigError};
pub use connection::{backoff_delay, ConnectionConfig, ConnectionManager};
pub use event_log::EventLog;
pub use session::{ActorAnimation, OfficeSession, SessionConfig, SessionSnapshot};
pub use transport::{Connector, NetworkConnector, SseDecoder, Transport, TransportError};
