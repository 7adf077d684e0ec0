use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use speak_csrf_rules::CsrfRuleStore;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::LoadedConfig;
use crate::gateway::Gateway;
use crate::handlers::RuleReloader;

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Address to listen on; overrides server.bind
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Extra session tickets (JSON or YAML list) added to the configured ones
    #[arg(long, value_name = "FILE")]
    pub tickets: Option<PathBuf>,
}

pub async fn cmd_serve(args: ServeArgs, loaded: LoadedConfig) -> Result<()> {
    let gateway = Gateway::from_config(&loaded, CsrfRuleStore::global())?;
    if let Some(path) = args.tickets.as_deref() {
        gateway.seed_tickets_from_file(path)?;
    }
    let bind = match args.bind {
        Some(addr) => addr,
        None => loaded
            .config
            .server
            .bind
            .parse()
            .with_context(|| format!("invalid bind address {}", loaded.config.server.bind))?,
    };

    spawn_reload_on_hangup(Arc::clone(gateway.reloader()));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, prefix = %loaded.config.server.route_prefix, "speak gateway listening");

    axum::serve(listener, gateway.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server failed")?;
    info!("speak gateway stopped");
    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_hangup(reloader: Arc<RuleReloader>) {
    use tokio::signal::unix::{signal, SignalKind};
    use tracing::warn;

    tokio::spawn(async move {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(?err, "SIGHUP handler unavailable; csrf rules reload only via Gateway.Rules");
                return;
            }
        };
        while hangups.recv().await.is_some() {
            let worker = Arc::clone(&reloader);
            match tokio::task::spawn_blocking(move || worker.reload_or_keep()).await {
                Ok(Some(revision)) => info!(revision, "csrf rules reloaded on SIGHUP"),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "csrf rule reload task failed"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_reloader: Arc<RuleReloader>) {}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
