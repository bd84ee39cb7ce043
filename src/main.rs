use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use remediator::agent::provider::HttpLlmProvider;
use remediator::agent::ReasoningAgent;
use remediator::alert_queue::AlertQueue;
use remediator::clock::{SystemClock, SystemRandom};
use remediator::config::ConfigManager;
use remediator::constants::cleanup;
use remediator::host_monitor::HostMonitor;
use remediator::learning::LearningEngine;
use remediator::logs::LogClient;
use remediator::monitoring::MonitoringClient;
use remediator::notifier::WebhookNotifier;
use remediator::ssh::SshExecutor;
use remediator::suppressor::Suppressor;
use remediator::traits::{AttemptStore, Executor, LogSearch, Monitoring, Notifier, PatternStore};
use remediator::validator::Validator;
use remediator::web::{start_web_server, AppState};
use remediator::{Orchestrator, OrchestratorConfig, Store};

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("remediator=info".parse().unwrap())
        .add_directive("tower_http=warn".parse().unwrap())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap())
        .add_directive("sqlx=warn".parse().unwrap());
    fmt().with_env_filter(env_filter).init();

    info!("starting sentinel-remediator");

    let config_dir = std::env::var("REMEDIATOR_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config_manager = match ConfigManager::load(config_dir).await.context("failed to load configuration") {
        Ok(manager) => Arc::new(manager),
        Err(err) => {
            error!(%err, "configuration invalid, refusing to start");
            return ExitCode::from(2);
        }
    };

    match run(config_manager).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "remediator exited with a fatal error");
            ExitCode::from(1)
        }
    }
}

async fn run(config_manager: Arc<ConfigManager>) -> Result<()> {
    let config = config_manager.current().await;
    let secrets = config_manager.secrets();

    if config.host_list().is_empty() {
        warn!("no target hosts configured - every alert will escalate immediately");
    }
    info!(hosts = config.host_list().len(), "configuration loaded");

    let store = Arc::new(Store::new(&config.database_path).await.context("failed to initialize persistent store")?);
    let attempt_store: Arc<dyn AttemptStore> = store.clone();
    let pattern_store: Arc<dyn PatternStore> = store.clone();

    let clock = Arc::new(SystemClock);
    let random = Arc::new(SystemRandom);

    let host_monitor = Arc::new(HostMonitor::new(clock.clone()));
    let alert_queue = Arc::new(AlertQueue::new(clock.clone()));
    let suppressor = Arc::new(Suppressor::new(config.suppressor_config(), clock.clone()));
    let learning = Arc::new(LearningEngine::new(pattern_store.clone()));
    let validator = Arc::new(Validator::new(config.validator_config()));

    let executor: Arc<dyn Executor> = Arc::new(
        SshExecutor::new(config.host_list(), host_monitor.clone())
            .await
            .context("ssh key preflight failed")?,
    );
    let monitoring: Arc<dyn Monitoring> = Arc::new(MonitoringClient::new(config.monitoring_url.clone()));
    let logs: Arc<dyn LogSearch> = Arc::new(LogClient::new(config.log_aggregator_url.clone()));

    let llm_provider = Arc::new(HttpLlmProvider::new(
        config.llm_base_url.clone(),
        config.llm_model.clone(),
        secrets.llm_api_key().map(str::to_string),
    ));
    let agent = Arc::new(ReasoningAgent::new(
        llm_provider,
        validator.clone(),
        executor.clone(),
        monitoring.clone(),
        logs,
        clock.clone(),
    ));

    let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(secrets.notification_webhook_url().to_string()));

    let orchestrator_config = OrchestratorConfig {
        signature_labels: config.signature_labels.clone(),
        max_attempts_overrides: config.max_attempts_overrides.clone(),
        attempt_window: std::time::Duration::from_secs(config.attempt_window_seconds),
        escalation_cooldown: std::time::Duration::from_secs(config.escalation_cooldown_seconds),
        dedup_cooldown: std::time::Duration::from_secs(config.dedup_cooldown_seconds),
        verification_deadline: std::time::Duration::from_secs(config.verification_deadline_seconds),
    };

    let orchestrator = Arc::new(Orchestrator::new(
        orchestrator_config,
        config.host_list(),
        attempt_store.clone(),
        learning,
        suppressor,
        host_monitor.clone(),
        validator,
        executor,
        monitoring,
        agent,
        notifier,
        clock.clone(),
        random.clone(),
    ));

    spawn_queue_drain(orchestrator.clone(), alert_queue.clone());
    spawn_host_probe(host_monitor.clone(), config_manager.clone());
    spawn_attempt_cleanup(store.clone());

    let webhook_ingress_credentials = secrets.webhook_ingress_credentials().map(|(u, p)| (u.to_string(), p.to_string()));
    if webhook_ingress_credentials.is_none() {
        warn!("webhook ingress running without basic auth - set webhook_ingress_username/password in secrets.toml to enable it");
    }

    let state = Arc::new(AppState::new(
        config_manager,
        orchestrator,
        attempt_store,
        pattern_store,
        host_monitor,
        alert_queue,
        clock,
        random,
        webhook_ingress_credentials,
    ));

    start_web_server(state).await
}

fn spawn_queue_drain(orchestrator: Arc<Orchestrator>, queue: Arc<AlertQueue>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(cleanup::HOST_PROBE_INTERVAL_SECONDS));
        loop {
            interval.tick().await;
            if queue.is_empty().await {
                continue;
            }
            for alert in queue.drain().await {
                let outcome = orchestrator.handle_alert(alert).await;
                info!(?outcome, "drained queued alert");
            }
        }
    });
}

fn spawn_host_probe(host_monitor: Arc<HostMonitor>, config_manager: Arc<ConfigManager>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(cleanup::HOST_PROBE_INTERVAL_SECONDS));
        loop {
            interval.tick().await;
            let hosts = config_manager.current().await.host_list();
            host_monitor.probe_offline_hosts(&hosts).await;
        }
    });
}

fn spawn_attempt_cleanup(store: Arc<Store>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(cleanup::CLEANUP_INTERVAL_SECONDS));
        loop {
            interval.tick().await;
            match store.cleanup_old_attempts(cleanup::ATTEMPT_RETENTION_DAYS).await {
                Ok(n) if n > 0 => info!(count = n, "cleaned up attempts past retention window"),
                Ok(_) => {}
                Err(err) => warn!(%err, "attempt retention cleanup failed"),
            }
        }
    });
}
