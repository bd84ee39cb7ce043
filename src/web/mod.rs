//! Web ingress & control surface: webhook intake, health/readiness, and the
//! administrative operations named in the external interfaces contract.
//!
//! A shared `AppState`, per-resource handler modules, and `tower-http`
//! tracing and CORS layers wired in `server::start_web_server`.

pub mod handlers;
pub mod middleware;
pub mod server;

use std::sync::Arc;

pub use server::start_web_server;

use crate::alert_queue::AlertQueue;
use crate::clock::{Clock, RandomSource};
use crate::config::ConfigManager;
use crate::host_monitor::HostMonitor;
use crate::orchestrator::Orchestrator;
use crate::traits::{AttemptStore, PatternStore};

pub struct AppState {
    pub config_manager: Arc<ConfigManager>,
    pub orchestrator: Arc<Orchestrator>,
    pub attempt_store: Arc<dyn AttemptStore>,
    pub pattern_store: Arc<dyn PatternStore>,
    pub host_monitor: Arc<HostMonitor>,
    pub alert_queue: Arc<AlertQueue>,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
    pub webhook_ingress_credentials: Option<(String, String)>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config_manager: Arc<ConfigManager>,
        orchestrator: Arc<Orchestrator>,
        attempt_store: Arc<dyn AttemptStore>,
        pattern_store: Arc<dyn PatternStore>,
        host_monitor: Arc<HostMonitor>,
        alert_queue: Arc<AlertQueue>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        webhook_ingress_credentials: Option<(String, String)>,
    ) -> Self {
        AppState {
            config_manager,
            orchestrator,
            attempt_store,
            pattern_store,
            host_monitor,
            alert_queue,
            clock,
            random,
            webhook_ingress_credentials,
        }
    }
}
