pub mod client;
pub mod config;
pub mod error;
pub mod library;
pub mod platform;
pub mod protocol;
