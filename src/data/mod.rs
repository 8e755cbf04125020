//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations (users, projects, files)
//! - Entity models

mod database;
mod models;

pub use database::{Database, PoolOptions};
pub use models::*;
