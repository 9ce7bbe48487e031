//! Adapters behind the domain ports
pub mod memory;
pub mod nats;
pub mod postgres;

pub use memory::InMemoryStore;
pub use nats::{NatsPublisher, NoopPublisher};
pub use postgres::PgStore;
