// System
use std::path::PathBuf;

// Third Party
use clap::Parser;
use tokio::time::Duration;

// Local
use crate::{
    driver::Action,
    reporter::DEFAULT_STATUS_INTERVAL,
    resource::{Batch, ResourceKind, DEFAULT_PAYLOAD_SIZE},
    utils::DEFAULT_REQUEST_TIMEOUT,
};

/// Generate, list or delete Events and ConfigMaps in bulk to load the control plane.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Opts {
    /// Path to the kubeconfig file. Inferred from the environment when absent.
    #[arg(long, env = "CHURN_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// What kind of resource to operate on.
    #[arg(long, value_enum, default_value_t = ResourceKind::Event, env = "CHURN_RESOURCE_TYPE")]
    pub resource_type: ResourceKind,

    /// How many resources to generate in `create` mode.
    #[arg(long, default_value_t = 100_000, env = "CHURN_RESOURCE_COUNT")]
    pub resource_count: usize,

    /// Number of concurrent workers.
    #[arg(
        long,
        default_value_t = 100,
        value_parser = clap::value_parser!(u32).range(1..),
        env = "CHURN_CONCURRENCY"
    )]
    pub concurrency: u32,

    /// Page size of every list call.
    #[arg(
        long,
        default_value_t = 10_000,
        value_parser = clap::value_parser!(u32).range(1..),
        env = "CHURN_LIST_LIMIT"
    )]
    pub list_limit: u32,

    #[arg(long, value_enum, default_value_t = Action::Create, env = "CHURN_ACTION")]
    pub action: Action,

    /// Size in bytes of the random payload carried by each generated object.
    #[arg(long, default_value_t = DEFAULT_PAYLOAD_SIZE, env = "CHURN_PAYLOAD_SIZE")]
    pub payload_size: usize,

    /// Client read timeout, in seconds.
    #[arg(
        long,
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs(),
        env = "CHURN_REQUEST_TIMEOUT"
    )]
    pub request_timeout: u64,

    /// Seconds between status reports.
    #[arg(
        long,
        default_value_t = DEFAULT_STATUS_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        env = "CHURN_STATUS_INTERVAL"
    )]
    pub status_interval: u64,
}

impl Opts {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval)
    }

    /// Only `create` needs a payload, so other actions skip generating one.
    pub fn batch(&self) -> Batch {
        match self.action {
            Action::Create => Batch::new(self.resource_count, self.payload_size),
            Action::List | Action::Clean => Batch::new(0, 0),
        }
    }
}
