//! Bulk create, list and delete Kubernetes Events and ConfigMaps to put the control plane and
//! etcd under object churn.

pub mod config;
pub mod counters;
pub mod driver;
pub mod reporter;
pub mod resource;
pub mod utils;

pub use config::Opts;
pub use counters::{Counters, Snapshot};
pub use driver::{Action, Driver};
pub use reporter::StatusReporter;
pub use resource::{Batch, ChurnResource, ResourceKind};
