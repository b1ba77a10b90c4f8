pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, migrate};
pub use error::{Halt, ReconcileError};
pub use service::{Poller, PollerSettings};
