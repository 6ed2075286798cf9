// Adapters layer: concrete implementations of the domain ports.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;
