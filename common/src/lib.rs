//! Shared building blocks for the installer.
//!
//! - `config`: installer configuration (connections, model routing, admin seed)
//! - `errors`: error taxonomy shared by every stage
//! - `models`: stored record shapes and their table schemas
//! - `enums`: lookup enumerations mirrored into reference tables
//! - `utils`: password hashing

pub mod config;
pub mod enums;
pub mod errors;
pub mod models;
pub mod utils;
