pub mod adapters;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod utils;

pub use error::types::*;
