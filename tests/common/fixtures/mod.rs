//! Reusable test utilities:
//! - Mock HTTP servers (monitoring, log aggregator, notification webhook)
//! - An in-memory SQLite-backed store wrapper
//! - Shared alert/host test data

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_monitoring;
pub mod mock_webhook;
pub mod test_data;
pub mod test_database;

pub use mock_monitoring::{MockLogServer, MockMonitoringServer};
pub use mock_webhook::MockWebhookServer;
pub use test_data::*;
pub use test_database::TestDatabase;
