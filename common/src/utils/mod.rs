//! Utility functions and helpers.

pub mod password;

// Re-export commonly used functions
pub use password::{hash_password, verify_password};
