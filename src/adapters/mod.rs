//! Concrete adapter implementations for ports.

pub mod csv_cache;
pub mod csv_price_loader;
pub mod file_config_adapter;
pub mod jquants_client;
pub mod local_store;
#[cfg(feature = "web")]
pub mod web;
