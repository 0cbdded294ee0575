// System
use std::path::Path;
use std::sync::Arc;
use std::thread;

// Third Party
use anyhow::Context;
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Local
use crate::counters::Counters;

#[cfg(test)]
pub mod test;

/// All generated, listed and deleted objects live here.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Read timeout of every API call, list pages included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Log to stdout. `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(crate_name: &str, level: tracing::Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={}",
            crate_name,
            level.to_string().to_lowercase()
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build a client from the kubeconfig at `kubeconfig`, or infer one from the environment
/// (in-cluster service account, `$KUBECONFIG`, `~/.kube/config`) if no path is given.
pub async fn create_client(
    kubeconfig: Option<&Path>,
    request_timeout: Duration,
) -> Result<Client, anyhow::Error> {
    let config = client_config(kubeconfig, request_timeout).await?;
    info!("Using API server {}", config.cluster_url);
    Ok(Client::try_from(config)?)
}

async fn client_config(
    kubeconfig: Option<&Path>,
    request_timeout: Duration,
) -> Result<Config, anyhow::Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => Config::infer()
            .await
            .context("Failed to infer a kubeconfig")?,
    };
    config.read_timeout = Some(request_timeout);
    Ok(config)
}

/// Log the final counts and exit on SIGINT or SIGTERM, so an interrupted run still reports how
/// far it got.
pub fn setup_exit_hooks(counters: Arc<Counters>) -> Result<(), anyhow::Error> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            warn!("Received signal {}, exiting...", signal);
            info!("{}", counters.snapshot());
            std::process::exit(128 + signal);
        }
    });
    Ok(())
}
