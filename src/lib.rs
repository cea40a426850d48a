//! Library crate for mc-scan-rs exposing reusable modules.
pub mod config;
pub mod controller;
pub mod details;
pub mod error;
pub mod identity;
pub mod probe;
pub mod query;
pub mod scanner;
pub mod server;
pub mod session;
pub mod source;
pub mod store;
pub mod types;
