//! This module provides reusable test utilities:
//! - Mock HTTP backend for the HTTP handler
//! - Fake handlers, internal tasks and a recording retry scheduler
//! - Test configuration builders
//! - In-memory test databases seeded with definitions
//! - Common test data

// Allow unused code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_handlers;
pub mod mock_backend;
pub mod test_config;
pub mod test_data;
pub mod test_database;

// Re-export commonly used items
pub use fake_handlers::*;
pub use mock_backend::MockBackend;
pub use test_config::{TestConfig, TestConfigBuilder};
pub use test_data::*;
pub use test_database::TestDatabase;
