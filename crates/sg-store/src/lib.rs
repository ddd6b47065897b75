//! Persistence for the gate: the SQLite address book of known peer
//! gates, plus the TOML config file and data-dir resolution.

pub mod config;
pub mod error;
pub mod schema;
pub mod store;

pub use config::{CONFIG_FILE, GateConfig, default_base_dir};
pub use error::{Result, StoreError};
pub use store::BookStore;
