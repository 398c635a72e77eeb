// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `feedstr serve` command implementation.
//!
//! Opens the record log, builds the network collaborators, publishes the
//! service profile and runs the controller alongside the admin gateway until
//! SIGINT or SIGTERM.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use feedstr_config::FeedstrConfig;
use feedstr_core::{unix_now, FeedstrError, RecordLog};
use feedstr_engine::{
    install_signal_handler, Collaborators, Controller, EngineSettings, PolicyGate, Whitelist,
};
use feedstr_gateway::{AuthConfig, GatewayState, ServerConfig, ServiceInfo};
use feedstr_net::{build_http_client, HttpFeedSource, HttpSiteProbe, RelayPool};
use feedstr_storage::SqliteRecordLog;
use tracing::{error, info, warn};

/// Runs the `feedstr serve` command.
pub async fn run_serve(config: FeedstrConfig) -> Result<(), FeedstrError> {
    init_tracing(&config.service.log_level);

    info!("starting feedstr serve");

    let settings = EngineSettings::from_config(&config)?;
    let service_pubkey = settings.service.public_hex();

    let log: Arc<dyn RecordLog> =
        Arc::new(SqliteRecordLog::open(&config.storage.database_path).await?);

    let client = build_http_client(&config.feeds)?;
    let source = Arc::new(HttpFeedSource::new(client.clone()));
    let probe = Arc::new(HttpSiteProbe::new(
        client,
        Duration::from_secs(config.feeds.icon_timeout_secs),
    ));
    if config.network.bootstrap_peers.is_empty() {
        warn!("no bootstrap peers configured, records stay local");
    }
    let peers = Arc::new(RelayPool::new(
        config.network.bootstrap_peers.clone(),
        Duration::from_secs(config.network.publish_timeout_secs),
    ));

    let whitelist = match &config.policy.whitelist_path {
        Some(path) => {
            let list = Whitelist::load_or_create(Path::new(path), &service_pubkey)?;
            info!(path = %path, entries = list.len(), "whitelist loaded");
            Some(list)
        }
        None => None,
    };
    let policy = Arc::new(PolicyGate::new(whitelist, config.policy.read_only));

    let (controller, handle) = Controller::new(
        settings,
        Collaborators {
            log: log.clone(),
            source,
            probe,
            peers,
        },
    );

    if let Err(e) = controller.publish_service_profile(unix_now()).await {
        warn!(error = %e, "failed to publish service profile");
    }

    let cancel = install_signal_handler();

    let controller_task = tokio::spawn(controller.run(cancel.clone()));

    let gateway_task = if config.gateway.enabled {
        if config.gateway.bearer_token.as_deref().is_none_or(str::is_empty) {
            warn!("gateway.bearer_token is not set, every /v1 request will be rejected");
        }
        let state = GatewayState {
            controller: handle,
            log,
            policy,
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            info: ServiceInfo {
                name: config.service.name.clone(),
                description: config.service.description.clone(),
                public_url: config.service.public_url.clone(),
                start_time: Instant::now(),
            },
        };
        let server_config = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
        };
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            feedstr_gateway::start_server(&server_config, state, cancel).await
        }))
    } else {
        info!("gateway disabled");
        drop(handle);
        None
    };

    if let Some(task) = gateway_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(error = %e, "gateway failed");
                // Without the gateway there is nothing left to drive registrations.
                cancel.cancel();
            }
            Err(e) => {
                error!(error = %e, "gateway task panicked");
                cancel.cancel();
            }
        }
    }

    if let Err(e) = controller_task.await {
        error!(error = %e, "controller task panicked");
        return Err(FeedstrError::Internal(format!("controller task: {e}")));
    }

    info!("feedstr stopped");
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("feedstr={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
