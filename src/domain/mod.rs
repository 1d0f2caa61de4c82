//! Core domain types and logic.

pub mod app_config;
pub mod datalake;
pub mod error;
pub mod indicator;
pub mod presentation;
pub mod price;
pub mod quote;
pub mod retry;
