//! Port traits the domain depends on; adapters implement them.

pub mod config_port;
pub mod object_store_port;
pub mod quote_port;
